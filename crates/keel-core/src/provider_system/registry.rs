use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::provider_system::traits::{ProviderId, ProviderQuery, ServiceProvider};

struct ProviderEntry {
    id: ProviderId,
    provider: Arc<dyn ServiceProvider>,
    booted: bool,
}

/// Registered providers, in registration order.
///
/// Entries live in an arena indexed by provider type. A forced re-registration
/// replaces the instance in its original slot, so boot order stays the order
/// in which identities were first registered.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: Vec<ProviderEntry>,
    index: HashMap<TypeId, usize>,
    /// Every identity ever registered
    loaded: Vec<String>,
    loaded_set: HashSet<String>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.entries.iter().map(|e| e.id.name.as_str()).collect::<Vec<_>>())
            .field("loaded", &self.loaded)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `provider` under its own name, replacing any instance of the same
    /// type. Returns its slot.
    pub fn insert(&mut self, provider: Arc<dyn ServiceProvider>) -> usize {
        let id = ProviderId::of(provider.as_ref());
        self.insert_with_id(provider, id)
    }

    /// Store `provider` under `identity` instead of its own name.
    pub fn insert_as(&mut self, provider: Arc<dyn ServiceProvider>, identity: &str) -> usize {
        let id = ProviderId {
            type_id: provider.as_any().type_id(),
            name: identity.to_string(),
        };
        self.insert_with_id(provider, id)
    }

    fn insert_with_id(&mut self, provider: Arc<dyn ServiceProvider>, id: ProviderId) -> usize {
        if self.loaded_set.insert(id.name.clone()) {
            self.loaded.push(id.name.clone());
        }

        match self.index.get(&id.type_id) {
            Some(&slot) => {
                self.entries[slot] = ProviderEntry {
                    id,
                    provider,
                    booted: false,
                };
                slot
            }
            None => {
                let slot = self.entries.len();
                self.index.insert(id.type_id, slot);
                self.entries.push(ProviderEntry {
                    id,
                    provider,
                    booted: false,
                });
                slot
            }
        }
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.index.contains_key(&type_id)
    }

    pub fn get(&self, type_id: TypeId) -> Option<Arc<dyn ServiceProvider>> {
        self.index
            .get(&type_id)
            .map(|&slot| self.entries[slot].provider.clone())
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn ServiceProvider>> {
        self.entries
            .iter()
            .find(|e| e.id.name == name)
            .map(|e| e.provider.clone())
    }

    pub fn query(&self, query: ProviderQuery<'_>) -> Vec<Arc<dyn ServiceProvider>> {
        self.entries
            .iter()
            .filter(|e| query.matches(&e.id, e.provider.as_ref()))
            .map(|e| e.provider.clone())
            .collect()
    }

    pub fn provider_at(&self, slot: usize) -> Option<Arc<dyn ServiceProvider>> {
        self.entries.get(slot).map(|e| e.provider.clone())
    }

    /// Identity the provider in `slot` was registered under
    pub fn name_at(&self, slot: usize) -> Option<&str> {
        self.entries.get(slot).map(|e| e.id.name.as_str())
    }

    pub fn slot_of(&self, type_id: TypeId) -> Option<usize> {
        self.index.get(&type_id).copied()
    }

    pub fn is_booted(&self, slot: usize) -> bool {
        self.entries.get(slot).is_some_and(|e| e.booted)
    }

    pub fn mark_booted(&mut self, slot: usize) {
        if let Some(entry) = self.entries.get_mut(slot) {
            entry.booted = true;
        }
    }

    /// Registered providers in registration order
    pub fn providers(&self) -> Vec<Arc<dyn ServiceProvider>> {
        self.entries.iter().map(|e| e.provider.clone()).collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ProviderId> {
        self.entries.iter().map(|e| &e.id)
    }

    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded_set.contains(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
