//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use cairn_config::{ConfigError, ProviderSettings, Settings};
use cairn_nodetypes::registry::bootstrap_provider_registry;
use cairn_nodetypes::{CndReader, CndWriter, DefinitionsFile, FsSnapshotStore, ModuleVersion, NodeTypeRegistry, RegistryError};
use cairn_store::naming::RepositoryFactories;
use cairn_store::repository::Repository;
use cairn_store::{DefaultValueListener, MemoryNamingContext, MemoryRepository, NamingContext, SessionFactory, StoreProvider, WorkspaceSchemaDeployer};
use tracing::{debug, info, warn};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Repository name used when no provider is configured.
const DEFAULT_REPOSITORY: &str = "java:/repository";

/// A module definitions file given as `id=path` or `id@version=path`.
#[derive(Debug, Clone)]
pub struct ModuleArg {
	pub system_id: String,
	pub version: Option<ModuleVersion>,
	pub path: PathBuf,
}

impl FromStr for ModuleArg {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (module, path) = s
			.split_once('=')
			.ok_or_else(|| format!("expected `id=path` or `id@version=path`, got '{s}'"))?;
		let (system_id, version) = match module.split_once('@') {
			Some((id, version)) => (id, Some(ModuleVersion::parse(version))),
			None => (module, None),
		};
		if system_id.is_empty() || path.is_empty() {
			return Err(format!("empty module id or path in '{s}'"));
		}
		Ok(Self {
			system_id: system_id.to_string(),
			version,
			path: PathBuf::from(path),
		})
	}
}

pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
	let settings = match path {
		Some(path) => Settings::load(path)?,
		None => Settings::default(),
	};
	for warning in &settings.warnings {
		warn!(%warning, "settings");
	}
	Ok(settings)
}

/// Registry holding the system definitions, and the given modules.
///
/// A persistent registry loads and records the deployment ledger in the
/// snapshot directory.
fn registry(settings: &Settings, modules: &[ModuleArg], persistent: bool) -> CliResult<Arc<NodeTypeRegistry>> {
	let mut registry = NodeTypeRegistry::new();
	if persistent {
		registry = registry.with_snapshot_store(Arc::new(FsSnapshotStore::new(settings.snapshot_dir.clone())));
		registry.init_properties_file();
	}
	let read = registry.init_system_definitions(&settings.nodetypes_dir())?;
	debug!(read, dir = %settings.nodetypes_dir().display(), "system definitions read");
	for module in modules {
		let file = DefinitionsFile::new(&module.path);
		if !registry.add_definitions_file(&file, &module.system_id, module.version.as_ref())? {
			warn!(system_id = %module.system_id, "newer definitions already deployed, skipped");
		}
	}
	Ok(Arc::new(registry))
}

pub fn parse(settings: &Settings, system_id: &str, files: &[PathBuf]) -> CliResult<bool> {
	let registry = registry(settings, &[], false)?;
	for path in files {
		let text = DefinitionsFile::new(path).read()?;
		let parsed = CndReader::new(&registry, path.display().to_string(), system_id).parse(&text)?;
		println!(
			"{}: {} node types, {} namespaces",
			path.display(),
			parsed.node_types.len(),
			parsed.namespaces.len()
		);
		for issue in &parsed.issues {
			println!("  warning: {issue}");
		}
	}
	Ok(true)
}

pub fn validate(settings: &Settings, system_id: &str, file: &Path) -> CliResult<bool> {
	let registry = registry(settings, &[], false)?;
	let text = DefinitionsFile::new(file).read()?;
	match registry.validate_definitions(&text, &file.display().to_string(), system_id) {
		Ok(parsed) => {
			println!("{}: ok, {} node types", file.display(), parsed.node_types.len());
			Ok(true)
		}
		Err(RegistryError::InvalidDefinitions(issues)) => {
			for issue in &issues {
				println!("{}: {issue}", file.display());
			}
			Ok(false)
		}
		Err(e) => Err(e.into()),
	}
}

pub fn print(settings: &Settings, system_id: &str, files: &[PathBuf]) -> CliResult<bool> {
	let registry = registry(settings, &[], false)?;
	let mut node_types = Vec::new();
	for path in files {
		let text = DefinitionsFile::new(path).read()?;
		let parsed = CndReader::new(&registry, path.display().to_string(), system_id).parse(&text)?;
		node_types.extend(parsed.node_types);
	}
	print!("{}", CndWriter::new(&registry.namespaces()).write(&node_types));
	Ok(true)
}

pub fn list(settings: &Settings, modules: &[ModuleArg], only: Option<&str>) -> CliResult<bool> {
	let registry = registry(settings, modules, false)?;
	for system_id in registry.system_ids() {
		if only.is_some_and(|only| only != system_id) {
			continue;
		}
		println!("{system_id}");
		for node_type in registry.node_types(&system_id) {
			let mut line = format!("  {}", registry.display_name(node_type.name()));
			if node_type.is_mixin() {
				line.push_str(" (mixin)");
			}
			if !node_type.supertypes().is_empty() {
				let supertypes: Vec<String> = node_type.supertypes().iter().map(|s| registry.display_name(s)).collect();
				line.push_str(&format!(" > {}", supertypes.join(", ")));
			}
			println!("{line}");
		}
	}
	Ok(true)
}

pub fn deploy(settings: &Settings, modules: &[ModuleArg]) -> CliResult<bool> {
	let registry = registry(settings, modules, true)?;
	let cluster = Cluster::start(settings, &registry)?;
	for provider in &cluster.providers {
		for module in modules {
			let url = DefinitionsFile::new(&module.path).url();
			let state = match registry.ledger().last_registered(&url, provider.key()) {
				Some(_) => "registered",
				None => "pending",
			};
			println!("{}: {} {} {state}", provider.key(), module.system_id, module.path.display());
		}
	}
	cluster.stop();
	Ok(true)
}

pub fn undeploy(settings: &Settings, modules: &[ModuleArg], system_id: &str) -> CliResult<bool> {
	let registry = registry(settings, modules, true)?;
	let cluster = Cluster::start(settings, &registry)?;
	let mut undeployed = false;
	for provider in &cluster.providers {
		if provider.undeploy_definitions(system_id) {
			println!("{}: {system_id} undeployed", provider.key());
			undeployed = true;
		}
	}
	cluster.stop();
	if !undeployed {
		println!("{system_id}: no definitions files known");
	}
	Ok(undeployed)
}

/// The configured providers, started over in-memory repositories.
struct Cluster {
	factory: SessionFactory,
	providers: Vec<Arc<StoreProvider>>,
}

impl Cluster {
	fn start(settings: &Settings, registry: &Arc<NodeTypeRegistry>) -> CliResult<Self> {
		let mut configured = settings.providers.clone();
		if configured.is_empty() {
			let mut default = ProviderSettings::new("default", "/");
			default.repository_name = Some(DEFAULT_REPOSITORY.to_string());
			configured.push(default);
		}
		configured.sort_by_key(ProviderSettings::depth);

		let naming = Arc::new(MemoryNamingContext::new());
		let mut factories = RepositoryFactories::new();
		for provider in &configured {
			if let Some(name) = &provider.repository_name {
				naming.rebind(name, Arc::new(MemoryRepository::new()))?;
			} else if let Some(tag) = &provider.factory
				&& !factories.tags().any(|t| t == tag)
			{
				factories = factories.register(
					tag.clone(),
					Box::new(|url: &str| {
						debug!(url, "standing in for a remote repository");
						Ok(Arc::new(MemoryRepository::new()) as Arc<dyn Repository>)
					}),
				);
			}
		}
		let factories = Arc::new(factories);
		let provider_registry = Arc::new(bootstrap_provider_registry(registry, &settings.nodetypes_dir()));

		let factory = SessionFactory::new();
		let mut providers = Vec::new();
		for provider_settings in configured {
			let is_default = provider_settings.is_default();
			let mut provider = StoreProvider::new(provider_settings, Arc::clone(registry))
				.with_naming(naming.clone())
				.with_factories(factories.clone())
				.with_provider_registry(provider_registry.clone())
				.with_deployer(Arc::new(WorkspaceSchemaDeployer))
				.with_processing_server(settings.processing_server);
			if is_default {
				provider = provider.with_skeleton(settings.skeleton.clone());
			}
			let provider = Arc::new(provider);
			if let Some(repository) = provider.repository() {
				provider.add_listener(Arc::new(DefaultValueListener::new(Arc::clone(registry), repository)));
			}
			provider.start(&factory)?;
			info!(provider = provider.key(), mount_point = provider.mount_point(), "provider started");
			providers.push(provider);
		}
		Ok(Self { factory, providers })
	}

	fn stop(self) {
		for provider in self.providers.iter().rev() {
			provider.stop(&self.factory);
		}
	}
}
