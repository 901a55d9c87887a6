//! The provider registry: system definitions plus every stored module snapshot.

use std::path::Path;

use tracing::{debug, error, warn};

use super::NodeTypeRegistry;
use crate::cnd::{CndReader, ParsedDefinitions};
use crate::error::{CndError, RegistryError, Result};

/// Module id of a stored snapshot: the part of `definition_name` before `.cnd`.
pub fn system_id_for_definitions(definition_name: &str) -> &str {
	definition_name.split(".cnd").next().unwrap_or(definition_name)
}

/// Builds the provider registry.
///
/// System definitions under `nodetypes_dir` are read first, then every CND
/// snapshot in `main`'s snapshot store. Snapshots failing to parse are retried
/// until a pass makes no progress, so modules may depend on each other in any
/// order. Whatever still fails is logged.
pub fn bootstrap_provider_registry(main: &NodeTypeRegistry, nodetypes_dir: &Path) -> NodeTypeRegistry {
	let provider = NodeTypeRegistry::new().with_name("provider");
	if let Err(e) = provider.init_system_definitions(nodetypes_dir) {
		error!(dir = %nodetypes_dir.display(), error = %e, "cannot read system definitions");
	}

	let Some(store) = main.snapshot_store() else {
		return provider;
	};
	let mut remaining = match store.files_list() {
		Ok(files) => files,
		Err(e) => {
			error!(error = %e, "cannot list stored definitions");
			return provider;
		}
	};

	let mut previous = Vec::new();
	while !remaining.is_empty() && remaining != previous {
		previous = std::mem::take(&mut remaining);
		for file in previous.iter().filter(|f| f.ends_with(".cnd")) {
			let text = match store.read_cnd_file(file) {
				Ok(text) => text,
				Err(e) => {
					error!(file, error = %e, "cannot read stored definitions");
					continue;
				}
			};
			match deploy_to_provider_registry(&provider, &text, file) {
				Ok(_) => {}
				Err(RegistryError::Cnd(CndError::Parse { messages, .. })) => {
					debug!(file, ?messages, "stored definitions not ready, retrying");
					remaining.push(file.clone());
				}
				Err(e) => error!(file, error = %e, "cannot deploy stored definitions"),
			}
		}
	}
	for file in &remaining {
		warn!(file, "stored definitions could not be deployed to the provider registry");
	}
	provider
}

/// Reads `text` into `provider` under the system id derived from `definition_name`.
pub fn deploy_to_provider_registry(provider: &NodeTypeRegistry, text: &str, definition_name: &str) -> Result<ParsedDefinitions> {
	let system_id = system_id_for_definitions(definition_name);
	Ok(CndReader::new(provider, definition_name, system_id).parse(text)?)
}
