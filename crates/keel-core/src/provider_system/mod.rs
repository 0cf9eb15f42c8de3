//! # Keel Core Provider System
//!
//! Service providers are the extension units of a Keel application. Each one
//! binds services during registration and may carry a boot hook that runs
//! once every provider has been registered.
//!
//! - **[`traits`]**: [`ServiceProvider`], the optional [`BootProvider`] capability and
//!   per-provider [`ProviderCallbacks`].
//! - **[`registry`]**: [`ProviderRegistry`], the identity-indexed arena the
//!   [`Application`](crate::kernel::Application) keeps its providers in.
//! - **[`manifest`]**: [`PackageManifest`], provider and alias declarations read
//!   from `keel.json` and `vendor/installed.json`.
//! - **[`error`]**: [`ProviderSystemError`].
pub mod error;
pub mod manifest;
pub mod registry;
pub mod traits;

pub use error::ProviderSystemError;
pub use manifest::{KeelExtra, Package, PackageManifest};
pub use registry::ProviderRegistry;
pub use traits::{
    AsAny, BootProvider, ProviderCallback, ProviderCallbacks, ProviderId, ProviderQuery,
    ServiceProvider,
};
