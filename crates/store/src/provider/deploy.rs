//! Deploying module definitions to a provider's repository.

use cairn_nodetypes::registry::deploy_to_provider_registry;
use cairn_nodetypes::{CndWriter, DefinitionsFile, NodeTypeRegistry};
use tracing::{debug, error, info, warn};

use super::StoreProvider;
use crate::error::{Result, StoreError};
use crate::repository::{Credentials, Workspace};

/// Modules whose ids start with this prefix ship with the platform and are
/// never snapshotted.
const SYSTEM_PREFIX: &str = "system-";

/// Registers a module's types with the repository's own type system.
pub trait SchemaDeployer: Send + Sync {
	/// False for repositories that accept no custom types; such providers
	/// skip deployment when they start.
	fn can_register_custom_node_types(&self) -> bool;

	fn register_custom_node_types(&self, system_id: &str, workspace: &dyn Workspace, registry: &NodeTypeRegistry) -> Result<()>;

	fn unregister_custom_node_types(&self, system_id: &str, workspace: &dyn Workspace, registry: &NodeTypeRegistry) -> Result<()>;
}

/// Deployer for repositories without a custom type system.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSchemaDeployer;

impl SchemaDeployer for NoopSchemaDeployer {
	fn can_register_custom_node_types(&self) -> bool {
		false
	}

	fn register_custom_node_types(&self, _: &str, _: &dyn Workspace, _: &NodeTypeRegistry) -> Result<()> {
		Ok(())
	}

	fn unregister_custom_node_types(&self, _: &str, _: &dyn Workspace, _: &NodeTypeRegistry) -> Result<()> {
		Ok(())
	}
}

/// Deployer writing a module's types as CND to the workspace schema manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkspaceSchemaDeployer;

impl SchemaDeployer for WorkspaceSchemaDeployer {
	fn can_register_custom_node_types(&self) -> bool {
		true
	}

	fn register_custom_node_types(&self, system_id: &str, workspace: &dyn Workspace, registry: &NodeTypeRegistry) -> Result<()> {
		let schema = workspace
			.schema()
			.ok_or_else(|| StoreError::RepositoryAccess(format!("workspace '{}' has no schema manager", workspace.name())))?;
		let types = registry.node_types(system_id);
		let text = CndWriter::new(&registry.namespaces()).write(&types);
		debug!(system_id, types = types.len(), "registering custom types");
		schema.register_definitions(system_id, &text)
	}

	fn unregister_custom_node_types(&self, system_id: &str, workspace: &dyn Workspace, _: &NodeTypeRegistry) -> Result<()> {
		let schema = workspace
			.schema()
			.ok_or_else(|| StoreError::RepositoryAccess(format!("workspace '{}' has no schema manager", workspace.name())))?;
		if !schema.has_definitions(system_id) {
			debug!(system_id, "no custom types registered");
			return Ok(());
		}
		schema.unregister_definitions(system_id)
	}
}

impl StoreProvider {
	/// Deploys the definitions of `system_id` when any of its files changed
	/// since this provider last registered them.
	///
	/// Returns whether an update was needed. Failures are logged; files whose
	/// registration failed keep their old timestamp and are retried next time.
	pub fn deploy_definitions(&self, system_id: &str) -> bool {
		let needs_update = self.deploy_pending(system_id);
		if needs_update && let Err(e) = self.registry.save_properties() {
			error!(provider = self.key(), system_id, error = %e, "cannot save deployment ledger");
		}
		needs_update
	}

	/// Withdraws the definitions of `system_id` from the repository, the
	/// ledger, the snapshot store and the provider registry.
	pub fn undeploy_definitions(&self, system_id: &str) -> bool {
		if let Err(e) = self.with_system_workspace(|workspace| {
			self.deployer
				.unregister_custom_node_types(system_id, workspace, &self.registry)
		}) {
			error!(provider = self.key(), system_id, error = %e, "cannot unregister custom types");
		}

		let files = self.registry.files(system_id);
		if files.is_empty() {
			return false;
		}
		let ledger = self.registry.ledger();
		for file in &files {
			ledger.remove_last_registered(&file.url(), self.key());
		}
		if let Some(store) = self.registry.snapshot_store()
			&& let Err(e) = store.save_cnd_file(&snapshot_name(system_id), None)
		{
			error!(system_id, error = %e, "cannot remove definitions snapshot");
		}
		if let Some(provider_registry) = &self.provider_registry {
			let report = provider_registry.unregister_node_types(system_id);
			if !report.is_complete() {
				warn!(system_id, retained = report.retained.len(), "types still in use in the provider registry");
			}
		}
		if let Err(e) = self.registry.save_properties() {
			error!(provider = self.key(), system_id, error = %e, "cannot save deployment ledger");
		}
		info!(provider = self.key(), system_id, "definitions undeployed");
		true
	}

	/// Deploys every module with pending files, then saves the ledger once.
	pub(super) fn init_node_types(&self) {
		if !self.deployer.can_register_custom_node_types() {
			debug!(provider = self.key(), "repository takes no custom types");
			return;
		}
		let mut updated = false;
		for system_id in self.registry.system_ids() {
			updated |= self.deploy_pending(&system_id);
		}
		if updated && let Err(e) = self.registry.save_properties() {
			error!(provider = self.key(), error = %e, "cannot save deployment ledger");
		}
	}

	/// Deploys pending files of `system_id` without saving the ledger.
	pub(super) fn deploy_pending(&self, system_id: &str) -> bool {
		let ledger = self.registry.ledger();
		let mut needs_update = false;
		let mut pending: Vec<(DefinitionsFile, i64)> = Vec::new();
		for file in self.registry.files(system_id) {
			if !file.path().exists() {
				continue;
			}
			let modified = file.last_modified();
			if modified == 0 {
				error!(file = %file.path().display(), "cannot read modification time, forcing an update");
				needs_update = true;
				continue;
			}
			if ledger.last_registered(&file.url(), self.key()) != Some(modified) {
				pending.push((file, modified));
			}
		}
		if pending.is_empty() && !needs_update {
			return false;
		}

		if !system_id.starts_with(SYSTEM_PREFIX)
			&& let Err(e) = self.snapshot_definitions(system_id)
		{
			error!(system_id, error = %e, "cannot snapshot definitions");
		}

		match self.with_system_workspace(|workspace| {
			self.deployer
				.register_custom_node_types(system_id, workspace, &self.registry)
		}) {
			Ok(()) => {
				for (file, modified) in &pending {
					ledger.set_last_registered(&file.url(), self.key(), *modified);
				}
				info!(provider = self.key(), system_id, files = pending.len(), "definitions deployed");
			}
			Err(e) => error!(provider = self.key(), system_id, error = %e, "cannot register custom types"),
		}
		true
	}

	/// Writes the module's current types to the snapshot store and the
	/// provider registry.
	fn snapshot_definitions(&self, system_id: &str) -> Result<()> {
		let types = self.registry.node_types(system_id);
		let text = CndWriter::new(&self.registry.namespaces()).write(&types);
		let name = snapshot_name(system_id);
		if let Some(store) = self.registry.snapshot_store() {
			store.save_cnd_file(&name, Some(&text))?;
		}
		if let Some(provider_registry) = &self.provider_registry {
			deploy_to_provider_registry(provider_registry, &text, &name)?;
		}
		Ok(())
	}

	/// Runs `f` on the default workspace as the system account, then saves.
	fn with_system_workspace(&self, f: impl FnOnce(&dyn Workspace) -> Result<()>) -> Result<()> {
		if !self.deployer.can_register_custom_node_types() {
			return Ok(());
		}
		let session = self.get_session(&Credentials::system(), None)?;
		let workspace = session.workspace();
		let result = f(workspace.as_ref()).and_then(|()| session.save());
		session.logout();
		result
	}
}

fn snapshot_name(system_id: &str) -> String {
	format!("{system_id}.cnd")
}
