use std::collections::HashMap;

use log::warn;

use crate::container::error::ContainerError;

/// Maps alternate names onto one canonical identifier.
///
/// Every alternate name points directly at its canonical identifier, so
/// [`resolve`](AliasTable::resolve) is a single map lookup no matter how the
/// aliases were chained when they were registered.
#[derive(Debug, Default, Clone)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
    abstract_aliases: HashMap<String, Vec<String>>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` as an alternate name for `canonical`.
    ///
    /// If `canonical` is itself an alias, the new name points at whatever it
    /// resolves to. Re-aliasing a name to a different canonical identifier
    /// replaces the earlier mapping.
    pub fn alias(&mut self, canonical: &str, name: &str) -> Result<(), ContainerError> {
        let canonical = self.resolve(canonical).to_string();
        if canonical == name {
            return Err(ContainerError::SelfAlias {
                name: name.to_string(),
            });
        }

        if let Some(previous) = self.aliases.get(name).cloned() {
            if previous == canonical {
                return Ok(());
            }
            warn!(
                "Alias '{}' re-pointed from '{}' to '{}'",
                name, previous, canonical
            );
            if let Some(names) = self.abstract_aliases.get_mut(&previous) {
                names.retain(|n| n != name);
            }
        }

        // Names that pointed at `name` now point at the new canonical identifier.
        if let Some(inherited) = self.abstract_aliases.remove(name) {
            for alias in &inherited {
                self.aliases.insert(alias.clone(), canonical.clone());
            }
            self.abstract_aliases
                .entry(canonical.clone())
                .or_default()
                .extend(inherited);
        }

        self.aliases.insert(name.to_string(), canonical.clone());
        self.abstract_aliases
            .entry(canonical)
            .or_default()
            .push(name.to_string());
        Ok(())
    }

    /// Canonical identifier for `name`, or `name` itself when it is not an alias.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Every alternate name currently resolving to `canonical`, in registration order.
    pub fn aliases_of(&self, canonical: &str) -> &[String] {
        self.abstract_aliases
            .get(canonical)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let canonical = self.aliases.remove(name)?;
        if let Some(names) = self.abstract_aliases.get_mut(&canonical) {
            names.retain(|n| n != name);
        }
        Some(canonical)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
