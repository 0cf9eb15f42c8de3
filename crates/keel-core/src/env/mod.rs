//! # Keel Core Environment
//!
//! [`EnvRepository`] answers environment lookups for the rest of the runtime.
//! Values parsed from `.env` files are kept in the repository itself and never
//! written back into the process environment, so a worker can
//! [`reload`](EnvRepository::reload) them between cycles. Variables already
//! present in the process environment always take precedence over file values.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use log::{debug, info};
use serde_json::Value;

use crate::config::error::ConfigError;
use crate::kernel::constants::DOTENV_FILE;
use crate::kernel::error::Result;

#[derive(Debug, Default)]
pub struct EnvRepository {
    values: RwLock<HashMap<String, String>>,
    loaded: RwLock<Vec<PathBuf>>,
}

impl EnvRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the `.env` file of every directory in `paths` that has one.
    ///
    /// Values already known to the repository are kept, so the first file
    /// defining a key wins.
    pub fn load(&self, paths: &[PathBuf]) -> Result<usize> {
        let mut loaded = 0;
        for dir in paths {
            let file = dotenv_file(dir);
            if !file.is_file() {
                debug!("No environment file at {:?}", file);
                continue;
            }
            let parsed = parse_file(&file)?;
            let mut values = self.values.write().map_err(|_| poisoned())?;
            for (key, value) in parsed {
                values.entry(key).or_insert(value);
            }
            self.loaded.write().map_err(|_| poisoned())?.push(file.clone());
            info!("Loaded environment file {:?}", file);
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Drop every file-sourced value and load `paths` again.
    pub fn reload(&self, paths: &[PathBuf]) -> Result<usize> {
        self.values.write().map_err(|_| poisoned())?.clear();
        self.loaded.write().map_err(|_| poisoned())?.clear();
        self.load(paths)
    }

    /// Raw value of `key`; the process environment wins over file values.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Ok(value) = std::env::var(key) {
            return Some(value);
        }
        self.values.read().ok()?.get(key).cloned()
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Value of `key` coerced into a config value (`true`, `null`, numbers, ...).
    pub fn value(&self, key: &str) -> Option<Value> {
        self.get(key).map(|raw| coerce(&raw))
    }

    /// Set a file-level value, replacing any previous one.
    pub fn insert(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Environment files read since the last reload
    pub fn loaded_files(&self) -> Vec<PathBuf> {
        self.loaded.read().map(|l| l.clone()).unwrap_or_default()
    }
}

/// Coerce a raw environment string the way config files expect it.
pub fn coerce(raw: &str) -> Value {
    match raw.to_lowercase().as_str() {
        "true" | "(true)" => return Value::Bool(true),
        "false" | "(false)" => return Value::Bool(false),
        "null" | "(null)" => return Value::Null,
        "empty" | "(empty)" => return Value::String(String::new()),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        if float.is_finite() {
            return Value::from(float);
        }
    }
    Value::String(raw.to_string())
}

fn dotenv_file(dir: &Path) -> PathBuf {
    if dir.is_file() {
        dir.to_path_buf()
    } else {
        dir.join(DOTENV_FILE)
    }
}

fn parse_file(file: &Path) -> Result<Vec<(String, String)>> {
    let iter = dotenv::from_path_iter(file).map_err(|e| ConfigError::Dotenv {
        path: file.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut pairs = Vec::new();
    for item in iter {
        let pair = item.map_err(|e| ConfigError::Dotenv {
            path: file.to_path_buf(),
            message: e.to_string(),
        })?;
        pairs.push(pair);
    }
    Ok(pairs)
}

fn poisoned() -> ConfigError {
    ConfigError::Poisoned { what: "environment" }
}
