use std::sync::RwLock;

/// Holds the active and fallback locale of the application.
#[derive(Debug)]
pub struct Translator {
    locale: RwLock<String>,
    fallback: RwLock<String>,
}

impl Translator {
    pub fn new(locale: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            locale: RwLock::new(locale.into()),
            fallback: RwLock::new(fallback.into()),
        }
    }

    pub fn locale(&self) -> String {
        match self.locale.read() {
            Ok(locale) => locale.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_locale(&self, locale: &str) {
        match self.locale.write() {
            Ok(mut current) => *current = locale.to_string(),
            Err(poisoned) => *poisoned.into_inner() = locale.to_string(),
        }
    }

    pub fn fallback(&self) -> String {
        match self.fallback.read() {
            Ok(fallback) => fallback.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_fallback(&self, locale: &str) {
        match self.fallback.write() {
            Ok(mut current) => *current = locale.to_string(),
            Err(poisoned) => *poisoned.into_inner() = locale.to_string(),
        }
    }
}
