//! Content type definitions and their registry.
//!
//! * [`model`]: node types, property and child-node definitions.
//! * [`cnd`]: reading and writing Compact Node Definition documents.
//! * [`registry`]: the [`NodeTypeRegistry`], its graph queries and the
//!   provider registry bootstrap.
//! * [`ledger`], [`snapshot`], [`version`]: what was deployed, where it is
//!   stored, and which module version it came from.

pub mod cnd;
pub mod error;
pub mod ledger;
pub mod model;
pub mod registry;
pub mod snapshot;
pub mod version;

pub use cnd::{CndReader, CndWriter, ParsedDefinitions};
pub use error::{CndError, RegistryError, Result, SnapshotError};
pub use ledger::DeploymentLedger;
pub use model::{ItemRef, NodeDefinition, NodeType, PropertyDefinition};
pub use registry::{DefinitionsFile, NodeTypeRegistry, UnregisterReport};
pub use snapshot::{FsSnapshotStore, MemorySnapshotStore, SchemaSnapshotStore};
pub use version::ModuleVersion;
