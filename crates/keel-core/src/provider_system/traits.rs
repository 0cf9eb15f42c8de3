use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Mutex};

use log::warn;

use crate::container::Factory;
use crate::kernel::bootstrap::Application;
use crate::kernel::error::Result;

/// Upcasting support for trait objects built on top of it
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// An extension unit that binds services into the application.
///
/// Identity is the concrete type: registering a second instance of the same
/// type is a no-op unless forced.
pub trait ServiceProvider: AsAny {
    /// Fully qualified identity, used by manifests and config
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Bind services. Runs once per (non-forced) registration.
    fn register(&self, _app: &mut Application) -> Result<()> {
        Ok(())
    }

    /// Transient bindings applied right after [`register`](ServiceProvider::register)
    fn bindings(&self) -> Vec<(String, Factory)> {
        Vec::new()
    }

    /// Shared bindings applied right after [`register`](ServiceProvider::register)
    fn singletons(&self) -> Vec<(String, Factory)> {
        Vec::new()
    }

    /// Capabilities this provider advertises to [`ProviderQuery::Tag`] lookups
    fn tags(&self) -> &[&'static str] {
        &[]
    }

    /// The boot capability, if the provider has one
    fn boot_hook(&self) -> Option<&dyn BootProvider> {
        None
    }

    /// Per-provider booting/booted callbacks, if the provider keeps any
    fn callbacks(&self) -> Option<&ProviderCallbacks> {
        None
    }
}

/// Setup that runs once every provider has been registered
pub trait BootProvider: Send + Sync {
    fn boot(&self, app: &mut Application) -> Result<()>;
}

pub type ProviderCallback = Arc<dyn Fn(&mut Application) -> Result<()> + Send + Sync>;

/// Callbacks run around a single provider's boot hook
#[derive(Default)]
pub struct ProviderCallbacks {
    booting: Mutex<Vec<ProviderCallback>>,
    booted: Mutex<Vec<ProviderCallback>>,
}

impl fmt::Debug for ProviderCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |list: &Mutex<Vec<ProviderCallback>>| list.lock().map(|l| l.len()).unwrap_or(0);
        f.debug_struct("ProviderCallbacks")
            .field("booting", &count(&self.booting))
            .field("booted", &count(&self.booted))
            .finish()
    }
}

impl ProviderCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn booting(&self, callback: ProviderCallback) {
        push(&self.booting, callback);
    }

    pub fn booted(&self, callback: ProviderCallback) {
        push(&self.booted, callback);
    }

    pub fn call_booting(&self, app: &mut Application) -> Result<()> {
        call(&self.booting, app)
    }

    pub fn call_booted(&self, app: &mut Application) -> Result<()> {
        call(&self.booted, app)
    }
}

fn push(list: &Mutex<Vec<ProviderCallback>>, callback: ProviderCallback) {
    match list.lock() {
        Ok(mut list) => list.push(callback),
        Err(poisoned) => poisoned.into_inner().push(callback),
    }
}

fn call(list: &Mutex<Vec<ProviderCallback>>, app: &mut Application) -> Result<()> {
    // Snapshot so a callback may register further callbacks.
    let snapshot = match list.lock() {
        Ok(list) => list.clone(),
        Err(poisoned) => {
            warn!("Provider callback list poisoned; continuing with recovered list");
            poisoned.into_inner().clone()
        }
    };
    for callback in snapshot {
        callback(app)?;
    }
    Ok(())
}

/// Stable identity of a registered provider
#[derive(Debug, Clone)]
pub struct ProviderId {
    pub type_id: TypeId,
    pub name: String,
}

impl ProviderId {
    pub fn of(provider: &dyn ServiceProvider) -> Self {
        Self {
            type_id: provider.as_any().type_id(),
            name: provider.name().to_string(),
        }
    }
}

impl PartialEq for ProviderId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ProviderId {}

impl std::hash::Hash for ProviderId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Selects registered providers
#[derive(Debug, Clone, Copy)]
pub enum ProviderQuery<'a> {
    /// Exactly this concrete type
    Type(TypeId),
    /// By identity name
    Name(&'a str),
    /// Every provider advertising this capability tag
    Tag(&'a str),
}

impl ProviderQuery<'_> {
    pub fn of<P: ServiceProvider>() -> Self {
        ProviderQuery::Type(TypeId::of::<P>())
    }

    pub fn matches(&self, id: &ProviderId, provider: &dyn ServiceProvider) -> bool {
        match self {
            ProviderQuery::Type(type_id) => id.type_id == *type_id,
            ProviderQuery::Name(name) => id.name == *name,
            ProviderQuery::Tag(tag) => provider.tags().iter().any(|t| t == tag),
        }
    }
}
