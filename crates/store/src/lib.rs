//! Store providers and content sessions.
//!
//! * [`provider`]: a [`StoreProvider`] mounts one repository into the
//!   content tree, maps application users onto repository accounts and
//!   deploys module definitions to the repository.
//! * [`session`]: the [`SessionFactory`] routing paths to providers, and the
//!   [`ContentSession`] spanning them.
//! * [`wrapper`], [`lazy`]: session-aware node and property views, with
//!   iteration across a node's translations.
//! * [`listener`], [`events`]: observation, and the listener completing new
//!   content with dynamic defaults.
//! * [`repository`], [`naming`], [`memory`]: the repository contracts, where
//!   repository handles come from, and an in-memory implementation.

pub mod error;
pub mod events;
pub mod lazy;
pub mod listener;
pub mod memory;
pub mod naming;
pub mod provider;
pub mod repository;
pub mod session;
pub mod wrapper;

pub use error::{Result, StoreError};
pub use events::{Event, EventListener, EventMask};
pub use lazy::{LazyPropertyIterator, NamePattern};
pub use listener::DefaultValueListener;
pub use memory::{MemoryRepository, MemoryUserDirectory};
pub use naming::{MemoryNamingContext, NamingContext, RepositoryFactories};
pub use provider::{NoopSchemaDeployer, SchemaDeployer, StoreProvider, WorkspaceSchemaDeployer};
pub use repository::{Credentials, Node, Property, PropertyValue, Repository, Session, UserDirectory, Value, Workspace};
pub use session::{AliasedUserGuard, ContentSession, SessionFactory};
pub use wrapper::{DecoratorRegistry, NodeWrapper, PropertyWrapper, WrapperKind};
