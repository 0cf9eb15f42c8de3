use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use log::debug;

use crate::container::alias::AliasTable;
use crate::container::error::ContainerError;
use crate::kernel::error::Result;

/// A resolved service instance
pub type Service = Arc<dyn Any + Send + Sync>;

/// Builds a fresh service instance on resolution
pub type Factory = Arc<dyn Fn(&Container) -> Result<Service> + Send + Sync>;

/// Invoked with every freshly built instance of a binding
pub type ResolvedCallback = Arc<dyn Fn(&Service, &Container) -> Result<()> + Send + Sync>;

struct Binding {
    factory: Factory,
    shared: bool,
}

/// Keyed service store with alias indirection.
///
/// Bindings are registered by canonical identifier. Shared bindings are cached
/// after their first resolution until [`forget_instance`](Container::forget_instance)
/// drops the cached value, at which point the next resolution rebuilds it and
/// runs the resolution callbacks again.
pub struct Container {
    aliases: AliasTable,
    bindings: HashMap<String, Binding>,
    instances: RwLock<HashMap<String, Service>>,
    resolving: HashMap<String, Vec<ResolvedCallback>>,
    after_resolving: HashMap<String, Vec<ResolvedCallback>>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let instance_count = self.instances.read().map(|i| i.len()).unwrap_or_default();
        f.debug_struct("Container")
            .field("aliases", &self.aliases.len())
            .field("bindings", &self.bindings.len())
            .field("instances", &instance_count)
            .finish()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Self {
            aliases: AliasTable::new(),
            bindings: HashMap::new(),
            instances: RwLock::new(HashMap::new()),
            resolving: HashMap::new(),
            after_resolving: HashMap::new(),
        }
    }

    /// Register a factory that builds a new instance on every resolution.
    pub fn bind(&mut self, id: &str, factory: Factory) {
        self.insert_binding(id, factory, false);
    }

    /// Register a factory whose first result is cached.
    pub fn singleton(&mut self, id: &str, factory: Factory) {
        self.insert_binding(id, factory, true);
    }

    /// Register an already-built instance.
    pub fn instance(&mut self, id: &str, service: Service) -> Result<()> {
        let canonical = self.aliases.resolve(id).to_string();
        self.instances
            .write()
            .map_err(|_| ContainerError::Poisoned { what: "instances" })?
            .insert(canonical, service);
        Ok(())
    }

    pub fn alias(&mut self, canonical: &str, name: &str) -> Result<()> {
        self.aliases.alias(canonical, name)?;
        Ok(())
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Canonical identifier for `id`, following aliases.
    pub fn canonical<'a>(&'a self, id: &'a str) -> &'a str {
        self.aliases.resolve(id)
    }

    /// Whether `id` (or the identifier it aliases) has a binding or an instance.
    pub fn has(&self, id: &str) -> bool {
        let canonical = self.aliases.resolve(id);
        self.bindings.contains_key(canonical)
            || self
                .instances
                .read()
                .map(|i| i.contains_key(canonical))
                .unwrap_or(false)
    }

    /// Whether `id` currently has a cached instance.
    pub fn is_resolved(&self, id: &str) -> bool {
        let canonical = self.aliases.resolve(id);
        self.instances
            .read()
            .map(|i| i.contains_key(canonical))
            .unwrap_or(false)
    }

    /// Resolve `id` to a service instance.
    pub fn get(&self, id: &str) -> Result<Service> {
        let canonical = self.aliases.resolve(id);

        if let Some(service) = self
            .instances
            .read()
            .map_err(|_| ContainerError::Poisoned { what: "instances" })?
            .get(canonical)
        {
            return Ok(service.clone());
        }

        let binding = self
            .bindings
            .get(canonical)
            .ok_or_else(|| ContainerError::NotBound {
                id: id.to_string(),
            })?;

        debug!("Building '{}'", canonical);
        let service = (binding.factory)(self)?;
        if binding.shared {
            self.instances
                .write()
                .map_err(|_| ContainerError::Poisoned { what: "instances" })?
                .insert(canonical.to_string(), service.clone());
        }

        self.fire_callbacks(&self.resolving, canonical, &service)?;
        self.fire_callbacks(&self.after_resolving, canonical, &service)?;
        Ok(service)
    }

    /// Resolve `id` and downcast it to `T`.
    pub fn make<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>> {
        let service = self.get(id)?;
        service.downcast::<T>().map_err(|_| {
            ContainerError::TypeMismatch {
                id: id.to_string(),
                expected: type_name::<T>(),
            }
            .into()
        })
    }

    pub fn resolving(&mut self, id: &str, callback: ResolvedCallback) {
        let canonical = self.aliases.resolve(id).to_string();
        self.resolving.entry(canonical).or_default().push(callback);
    }

    pub fn after_resolving(&mut self, id: &str, callback: ResolvedCallback) {
        let canonical = self.aliases.resolve(id).to_string();
        self.after_resolving.entry(canonical).or_default().push(callback);
    }

    /// Drop the cached instance of `id`. Returns whether one was cached.
    pub fn forget_instance(&self, id: &str) -> Result<bool> {
        let canonical = self.aliases.resolve(id);
        let removed = self
            .instances
            .write()
            .map_err(|_| ContainerError::Poisoned { what: "instances" })?
            .remove(canonical);
        Ok(removed.is_some())
    }

    /// Remove both the binding and any cached instance of `id`.
    pub fn unbind(&mut self, id: &str) -> Result<()> {
        let canonical = self.aliases.resolve(id).to_string();
        self.bindings.remove(&canonical);
        self.forget_instance(&canonical)?;
        Ok(())
    }

    fn insert_binding(&mut self, id: &str, factory: Factory, shared: bool) {
        let canonical = self.aliases.resolve(id).to_string();
        // A rebinding invalidates whatever was cached under the old binding.
        if let Ok(mut instances) = self.instances.write() {
            instances.remove(&canonical);
        }
        self.bindings.insert(canonical, Binding { factory, shared });
    }

    fn fire_callbacks(
        &self,
        callbacks: &HashMap<String, Vec<ResolvedCallback>>,
        canonical: &str,
        service: &Service,
    ) -> Result<()> {
        if let Some(list) = callbacks.get(canonical) {
            for callback in list {
                callback(service, self)?;
            }
        }
        Ok(())
    }
}
