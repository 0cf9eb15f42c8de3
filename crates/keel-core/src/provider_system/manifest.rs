use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::kernel::constants::{INSTALLED_PACKAGES, MANIFEST_EXTRA_KEY, PROJECT_MANIFEST};
use crate::kernel::error::Result;
use crate::provider_system::error::ProviderSystemError;

// --- Intermediate structs for deserialization ---

#[derive(Deserialize, Debug, Default)]
struct RawProject {
    #[serde(default)]
    autoload: Map<String, Value>,
    #[serde(default)]
    extra: Map<String, Value>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum RawInstalled {
    Wrapped { packages: Vec<RawPackage> },
    Bare(Vec<RawPackage>),
}

#[derive(Deserialize, Debug)]
struct RawPackage {
    name: String,
    #[serde(default)]
    extra: Map<String, Value>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
struct RawKeelExtra {
    #[serde(default)]
    providers: Vec<String>,
    #[serde(default)]
    aliases: Map<String, Value>,
    #[serde(default)]
    dont_discover: Vec<String>,
}

// --- End Intermediate structs ---

/// Keel metadata declared by one package (or by the project itself)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeelExtra {
    pub providers: Vec<String>,
    /// `(alias, canonical)` pairs in declaration order
    pub aliases: Vec<(String, String)>,
    pub dont_discover: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub keel: KeelExtra,
}

/// Project manifest (`keel.json`) plus installed package metadata
/// (`vendor/installed.json`), both read from the application base path.
///
/// Either file may be absent; a present but malformed file is an error.
#[derive(Debug, Clone, Default)]
pub struct PackageManifest {
    /// `(namespace, paths)` in declaration order
    pub autoload: Vec<(String, Vec<String>)>,
    pub project: KeelExtra,
    pub packages: Vec<Package>,
}

impl PackageManifest {
    pub fn load(base_path: &Path) -> Result<Self> {
        let mut manifest = PackageManifest::default();

        if let Some(raw) = read_json::<RawProject>(&base_path.join(PROJECT_MANIFEST))? {
            manifest.autoload = raw
                .autoload
                .into_iter()
                .map(|(namespace, paths)| (namespace, string_list(&paths)))
                .collect();
            manifest.project = keel_extra(&raw.extra, &base_path.join(PROJECT_MANIFEST))?;
        }

        let installed_path = base_path.join(INSTALLED_PACKAGES);
        if let Some(raw) = read_json::<RawInstalled>(&installed_path)? {
            let packages = match raw {
                RawInstalled::Wrapped { packages } | RawInstalled::Bare(packages) => packages,
            };
            for package in packages {
                manifest.packages.push(Package {
                    keel: keel_extra(&package.extra, &installed_path)?,
                    name: package.name,
                });
            }
        }

        debug!(
            "Package manifest: {} autoload mapping(s), {} package(s)",
            manifest.autoload.len(),
            manifest.packages.len()
        );
        Ok(manifest)
    }

    /// Package names (or `*`) excluded from provider discovery, from packages and project
    pub fn dont_discover(&self) -> Vec<String> {
        self.packages
            .iter()
            .flat_map(|p| p.keel.dont_discover.iter().cloned())
            .chain(self.project.dont_discover.iter().cloned())
            .collect()
    }

    /// Providers declared by installed packages that are not excluded from discovery
    pub fn package_providers(&self) -> Vec<String> {
        let ignore = self.dont_discover();
        if ignore.iter().any(|p| p == "*") {
            return Vec::new();
        }
        self.packages
            .iter()
            .filter(|p| !ignore.contains(&p.name))
            .flat_map(|p| p.keel.providers.iter().cloned())
            .collect()
    }

    /// Aliases declared by installed packages followed by the project's own
    pub fn package_aliases(&self) -> Vec<(String, String)> {
        self.packages
            .iter()
            .flat_map(|p| p.keel.aliases.iter().cloned())
            .chain(self.project.aliases.iter().cloned())
            .collect()
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| manifest_error(path, "Failed to read manifest", e))?;
    let parsed = serde_json::from_str(&content)
        .map_err(|e| manifest_error(path, "Failed to parse manifest JSON", e))?;
    Ok(Some(parsed))
}

fn keel_extra(extra: &Map<String, Value>, path: &Path) -> Result<KeelExtra> {
    let Some(value) = extra.get(MANIFEST_EXTRA_KEY) else {
        return Ok(KeelExtra::default());
    };
    let raw: RawKeelExtra = serde_json::from_value(value.clone())
        .map_err(|e| manifest_error(path, "Invalid 'extra.keel' section", e))?;
    Ok(KeelExtra {
        providers: raw.providers,
        aliases: raw
            .aliases
            .into_iter()
            .filter_map(|(alias, target)| target.as_str().map(|t| (alias, t.to_string())))
            .collect(),
        dont_discover: raw.dont_discover,
    })
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn manifest_error<E>(path: &Path, message: &str, source: E) -> ProviderSystemError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ProviderSystemError::ManifestError {
        path: PathBuf::from(path),
        message: format!("{}: {}", message, source),
        source: Some(Box::new(source)),
    }
}
