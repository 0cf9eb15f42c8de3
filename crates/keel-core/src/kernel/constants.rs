/// Application name
pub const APP_NAME: &str = "Keel";

/// Framework version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identities starting with this prefix belong to the framework itself.
pub const FRAMEWORK_NAMESPACE: &str = "keel::";

/// The provider that is always registered ahead of every other discovered provider.
pub const FOUNDATION_PROVIDER: &str = "keel::providers::FoundationServiceProvider";

/// Project manifest (autoload map, discovery opt-outs), relative to the base path
pub const PROJECT_MANIFEST: &str = "keel.json";

/// Installed package metadata, relative to the base path
pub const INSTALLED_PACKAGES: &str = "vendor/installed.json";

/// Key under `extra` holding Keel-specific package metadata
pub const MANIFEST_EXTRA_KEY: &str = "keel";

/// Configuration directory, relative to the base path
pub const CONFIG_DIR: &str = "config";

/// Application code directory, relative to the base path
pub const APP_DIR: &str = "app";

/// Resources directory, relative to the base path
pub const RESOURCES_DIR: &str = "resources";

/// Default views directory, relative to the base path
pub const VIEWS_DIR: &str = "resources/views";

/// Environment file name looked up in the base path
pub const DOTENV_FILE: &str = ".env";

/// Environment assumed when `APP_ENV` is not set
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Locale assumed when `app.locale` is not configured
pub const DEFAULT_LOCALE: &str = "en";

// Canonical container identifiers for the core services.

pub const CONFIG: &str = "keel::config::Repository";
pub const ENV: &str = "keel::env::EnvRepository";
pub const TRANSLATOR: &str = "keel::kernel::Translator";

/// Alternate names registered for the core services at construction.
pub const CORE_ALIASES: &[(&str, &[&str])] = &[
    (CONFIG, &["config", "keel::contracts::Config"]),
    (ENV, &["env", "keel::contracts::Environment"]),
    (TRANSLATOR, &["translator", "keel::contracts::Translator"]),
];
