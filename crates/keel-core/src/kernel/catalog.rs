use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::console::command::Command;
use crate::kernel::error::{Error, Result};
use crate::provider_system::error::ProviderSystemError;
use crate::provider_system::traits::ServiceProvider;
use crate::utils::fs::find_files;

pub type ProviderFactory = Arc<dyn Fn() -> Arc<dyn ServiceProvider> + Send + Sync>;
pub type CommandFactory = Arc<dyn Fn() -> Arc<dyn Command> + Send + Sync>;

/// What a catalogued identity can be constructed as
#[derive(Clone)]
pub enum TypeKind {
    Provider(ProviderFactory),
    Command(CommandFactory),
    /// Known identity with no runtime capability (helpers, models, ...)
    Other,
}

impl fmt::Debug for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Provider(_) => f.write_str("Provider"),
            TypeKind::Command(_) => f.write_str("Command"),
            TypeKind::Other => f.write_str("Other"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub kind: TypeKind,
    /// Source file declaring the identity, when known
    pub source: Option<PathBuf>,
}

/// Maps fully qualified identities to constructors and source files.
///
/// Configuration and manifests name providers and commands by identity; the
/// catalog turns those names into instances. Directory scans resolve the
/// files found under a path back to the identities declared in them.
#[derive(Debug, Default, Clone)]
pub struct TypeCatalog {
    entries: HashMap<String, TypeEntry>,
    by_source: HashMap<PathBuf, Vec<String>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identity: &str, kind: TypeKind) {
        self.insert(identity, kind, None);
    }

    /// Register an identity declared in `source`
    pub fn register_at(&mut self, identity: &str, kind: TypeKind, source: impl AsRef<Path>) {
        let source = canonical(source.as_ref());
        self.by_source
            .entry(source.clone())
            .or_default()
            .push(identity.to_string());
        self.insert(identity, kind, Some(source));
    }

    pub fn provider<P, F>(&mut self, identity: &str, build: F)
    where
        P: ServiceProvider,
        F: Fn() -> P + Send + Sync + 'static,
    {
        self.register(
            identity,
            TypeKind::Provider(Arc::new(move || Arc::new(build()) as Arc<dyn ServiceProvider>)),
        );
    }

    pub fn command<C, F>(&mut self, identity: &str, build: F)
    where
        C: Command + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.register(
            identity,
            TypeKind::Command(Arc::new(move || Arc::new(build()) as Arc<dyn Command>)),
        );
    }

    pub fn get(&self, identity: &str) -> Option<&TypeEntry> {
        self.entries.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// Construct the provider registered under `identity`.
    pub fn make_provider(&self, identity: &str) -> Result<Arc<dyn ServiceProvider>> {
        match self.entries.get(identity).map(|e| &e.kind) {
            Some(TypeKind::Provider(build)) => Ok(build()),
            Some(_) => Err(Error::ProviderSystem(ProviderSystemError::NotAProvider {
                identity: identity.to_string(),
            })),
            None => Err(Error::ProviderSystem(ProviderSystemError::UnknownProvider {
                identity: identity.to_string(),
            })),
        }
    }

    /// Construct the command registered under `identity`, if it is one.
    pub fn make_command(&self, identity: &str) -> Option<Arc<dyn Command>> {
        match self.entries.get(identity).map(|e| &e.kind) {
            Some(TypeKind::Command(build)) => Some(build()),
            _ => None,
        }
    }

    /// Identities declared in files under `paths`, in path order then file name order.
    pub fn types_in(&self, paths: &[PathBuf]) -> Vec<String> {
        let mut found = Vec::new();
        for dir in paths {
            let mut files = match find_files(dir, &|p: &Path| p.is_file()) {
                Ok(files) => files,
                Err(e) => {
                    debug!("Skipping unreadable path {:?}: {}", dir, e);
                    continue;
                }
            };
            files.sort();
            for file in files {
                if let Some(identities) = self.by_source.get(&canonical(&file)) {
                    found.extend(identities.iter().cloned());
                }
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, identity: &str, kind: TypeKind, source: Option<PathBuf>) {
        self.entries
            .insert(identity.to_string(), TypeEntry { kind, source });
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
