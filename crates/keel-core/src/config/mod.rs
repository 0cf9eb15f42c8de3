//! # Keel Core Configuration
//!
//! [`Repository`] is the runtime configuration source: a tree of
//! `serde_json::Value`s addressed with dotted keys (`app.locale`), loaded from
//! the files of the `config/` directory. Every file contributes one top-level key
//! named after its stem, so `config/app.toml` becomes `app.*`.
//!
//! String values may reference the environment with `${VAR}` or
//! `${VAR:-default}`. A value consisting only of such a reference takes the
//! coerced environment value (`true`, `null`, numbers); references embedded in a
//! longer string are substituted textually.
//!
//! Writes go through [`Repository::set_many`], which notifies every registered
//! after-setting callback once the new values are visible.
pub mod error;
pub mod format;
pub mod reload;

use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use log::{debug, info};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use error::ConfigError;
pub use format::ConfigFormat;
pub use reload::{MutationLog, ReloadDotenvAndConfig};

use crate::env::{EnvRepository, coerce};
use crate::kernel::error::Result;

/// Called with the `(key, value)` pairs of every write
pub type AfterSettingCallback = Arc<dyn Fn(&[(String, Value)]) + Send + Sync>;

#[derive(Default)]
pub struct Repository {
    items: RwLock<Map<String, Value>>,
    after_setting: RwLock<Vec<AfterSettingCallback>>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<String> = self
            .items
            .read()
            .map(|items| items.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("Repository").field("keys", &keys).finish_non_exhaustive()
    }
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(items: Map<String, Value>) -> Self {
        Self {
            items: RwLock::new(items),
            after_setting: RwLock::new(Vec::new()),
        }
    }

    /// Load every supported file in `dir`, interpolating environment references.
    ///
    /// A missing directory yields an empty repository.
    pub fn load(dir: &Path, env: &EnvRepository) -> Result<Self> {
        let mut items = Map::new();
        if !dir.is_dir() {
            debug!("Config directory {:?} does not exist", dir);
            return Ok(Self::from_map(items));
        }

        let mut files: Vec<_> = fs::read_dir(dir)
            .map_err(|source| ConfigError::Read {
                path: dir.to_path_buf(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        for path in files {
            let Some(format) = ConfigFormat::from_path(&path) else {
                debug!("Skipping unsupported config file {:?}", path);
                continue;
            };
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let mut value = format.parse(&content).map_err(|message| ConfigError::Parse {
                path: path.clone(),
                format: format.extension(),
                message,
            })?;
            interpolate(&mut value, env);
            items.insert(stem.to_string(), value);
        }

        info!("Loaded {} config file(s) from {:?}", items.len(), dir);
        Ok(Self::from_map(items))
    }

    /// Raw value at a dotted key
    pub fn get_value(&self, key: &str) -> Option<Value> {
        let items = self.items.read().ok()?;
        let mut parts = key.split('.');
        let mut current = items.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(list) => list.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    /// Typed value at a dotted key; `None` when absent or of another shape
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_value(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    pub fn all(&self) -> Map<String, Value> {
        self.items.read().map(|items| items.clone()).unwrap_or_default()
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| ConfigError::Serialize {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.set_many(vec![(key.to_string(), value)])
    }

    /// Write several dotted keys, then notify the after-setting callbacks.
    pub fn set_many(&self, entries: Vec<(String, Value)>) -> Result<()> {
        {
            let mut items = self.items.write().map_err(|_| poisoned("items"))?;
            for (key, value) in &entries {
                insert_dotted(&mut items, key, value.clone());
            }
        }

        let callbacks = self
            .after_setting
            .read()
            .map_err(|_| poisoned("callbacks"))?
            .clone();
        for callback in callbacks {
            callback(&entries);
        }
        Ok(())
    }

    pub fn after_setting_callback(&self, callback: AfterSettingCallback) -> Result<()> {
        self.after_setting
            .write()
            .map_err(|_| poisoned("callbacks"))?
            .push(callback);
        Ok(())
    }
}

fn poisoned(what: &'static str) -> ConfigError {
    ConfigError::Poisoned { what }
}

fn insert_dotted(items: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            items.insert(key.to_string(), value);
        }
        Some((head, rest)) => {
            let child = items
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_dotted(map, rest, value);
            }
        }
    }
}

/// Replace `${VAR}` / `${VAR:-default}` references throughout `value`.
pub fn interpolate(value: &mut Value, env: &EnvRepository) {
    match value {
        Value::String(s) => {
            if let Some(replacement) = interpolate_str(s, env) {
                *value = replacement;
            }
        }
        Value::Array(list) => list.iter_mut().for_each(|v| interpolate(v, env)),
        Value::Object(map) => map.values_mut().for_each(|v| interpolate(v, env)),
        _ => {}
    }
}

fn interpolate_str(s: &str, env: &EnvRepository) -> Option<Value> {
    if !s.contains("${") {
        return None;
    }

    // Whole-value reference keeps the coerced type.
    if let Some(inner) = s.strip_prefix("${").and_then(|r| r.strip_suffix('}')) {
        if !inner.contains('}') {
            return Some(lookup(inner, env).map(|raw| coerce(&raw)).unwrap_or(Value::Null));
        }
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                out.push_str(&lookup(&after[..end], env).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Some(Value::String(out))
}

fn lookup(reference: &str, env: &EnvRepository) -> Option<String> {
    match reference.split_once(":-") {
        Some((name, default)) => Some(env.get(name.trim()).unwrap_or_else(|| default.to_string())),
        None => env.get(reference.trim()),
    }
}
