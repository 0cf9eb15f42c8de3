//! # Keel Core Container
//!
//! A small keyed service store sitting behind the [`Application`](crate::kernel::Application).
//! The lifecycle core decides *when* services get bound; this module only keeps
//! the bindings, the cached shared instances and the [`AliasTable`] that lets
//! many names resolve to one canonical identifier.
pub mod alias;
#[allow(clippy::module_inception)]
pub mod container;
pub mod error;

pub use alias::AliasTable;
pub use container::{Container, Factory, ResolvedCallback, Service};
pub use error::ContainerError;

use std::any::Any;
use std::sync::Arc;

use crate::kernel::error::Result;

/// Wrap a closure returning a concrete value into a [`Factory`].
pub fn factory<T, F>(build: F) -> Factory
where
    T: Any + Send + Sync,
    F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
{
    Arc::new(move |container: &Container| Ok(Arc::new(build(container)?) as Service))
}
