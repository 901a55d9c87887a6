//! Qualified names and the prefix/URI namespace table.
//!
//! Every item in the node-type catalog is keyed by a [`QualifiedName`], a
//! `(namespace URI, local name)` pair. The prefixed form (`jnt:text`) is only a
//! rendering concern: it is computed through a [`NamespaceTable`] when needed and
//! never stored, so two names are equal regardless of which prefix is bound to
//! their namespace at the time.

mod error;
mod name;
mod namespace;

pub use error::{NameError, Result};
pub use name::{QualifiedName, RESIDUAL};
pub use namespace::{NamespaceTable, ns};

#[cfg(test)]
mod tests;
