use std::sync::Arc;

use log::{debug, info, warn};

use crate::kernel::bootstrap::Application;
use crate::kernel::constants::{DOTENV_FILE, FOUNDATION_PROVIDER};
use crate::kernel::error::Result;
use crate::provider_system::PackageManifest;

/// A one-shot setup step run by [`Application::bootstrap_with`].
pub trait Bootstrapper: Send + Sync {
    /// Name used in the `bootstrapping: ...` / `bootstrapped: ...` events
    fn name(&self) -> &'static str;

    fn bootstrap(&self, app: &mut Application) -> Result<()>;
}

/// Loads `<base>/.env` into the environment repository, if the file exists.
#[derive(Debug, Default)]
pub struct LoadEnvironmentVariables;

impl Bootstrapper for LoadEnvironmentVariables {
    fn name(&self) -> &'static str {
        "LoadEnvironmentVariables"
    }

    fn bootstrap(&self, app: &mut Application) -> Result<()> {
        if !app.base_path(DOTENV_FILE).exists() {
            debug!("No .env file in {:?}", app.base_path(""));
            return Ok(());
        }
        app.env().load(&[app.base_path("")])?;
        Ok(())
    }
}

/// Registers aliases declared by installed packages, the project manifest and
/// the `app.aliases` config key. Config entries win over manifest entries for
/// the same alias. Names that are already bound are left alone.
#[derive(Debug, Default)]
pub struct RegisterAliases;

impl Bootstrapper for RegisterAliases {
    fn name(&self) -> &'static str {
        "RegisterAliases"
    }

    fn bootstrap(&self, app: &mut Application) -> Result<()> {
        let mut aliases: Vec<(String, String)> = match PackageManifest::load(&app.base_path("")) {
            Ok(manifest) => manifest.package_aliases(),
            Err(e) => {
                warn!("Ignoring package aliases: {}", e);
                Vec::new()
            }
        };

        let configured = app
            .config()?
            .get::<serde_json::Map<String, serde_json::Value>>("app.aliases")
            .unwrap_or_default();
        for (alias, target) in configured {
            let Some(target) = target.as_str() else {
                continue;
            };
            match aliases.iter_mut().find(|(a, _)| *a == alias) {
                Some(slot) => slot.1 = target.to_string(),
                None => aliases.push((alias, target.to_string())),
            }
        }

        let mut registered = 0;
        for (alias, target) in aliases {
            if app.has(&alias) {
                debug!("Alias '{}' already bound; skipping", alias);
                continue;
            }
            app.alias(&target, &alias)?;
            registered += 1;
        }
        info!("Registered {} alias(es)", registered);
        Ok(())
    }
}

/// Registers package-declared providers (minus `dont-discover`) followed by
/// the `app.providers` config key, with the foundation provider always first.
#[derive(Debug, Default)]
pub struct RegisterProviders;

impl RegisterProviders {
    /// Provider identities in registration order.
    pub fn providers(app: &Application) -> Result<Vec<String>> {
        let manifest = PackageManifest::load(&app.base_path(""))?;
        let configured: Vec<String> = app.config()?.get("app.providers").unwrap_or_default();

        let mut providers: Vec<String> = Vec::new();
        for provider in manifest.package_providers().into_iter().chain(configured) {
            if !providers.contains(&provider) {
                providers.push(provider);
            }
        }

        if let Some(position) = providers.iter().position(|p| p == FOUNDATION_PROVIDER) {
            let foundation = providers.remove(position);
            providers.insert(0, foundation);
        }
        Ok(providers)
    }
}

impl Bootstrapper for RegisterProviders {
    fn name(&self) -> &'static str {
        "RegisterProviders"
    }

    fn bootstrap(&self, app: &mut Application) -> Result<()> {
        let providers = Self::providers(app)?;
        for identity in &providers {
            app.register_by_name(identity, false)?;
        }
        info!("Registered {} provider(s)", providers.len());
        Ok(())
    }
}

/// Boots every registered provider.
#[derive(Debug, Default)]
pub struct BootProviders;

impl Bootstrapper for BootProviders {
    fn name(&self) -> &'static str {
        "BootProviders"
    }

    fn bootstrap(&self, app: &mut Application) -> Result<()> {
        app.boot()
    }
}

/// The standard pipeline, in its required order.
pub fn standard_bootstrappers() -> Vec<Arc<dyn Bootstrapper>> {
    vec![
        Arc::new(LoadEnvironmentVariables),
        Arc::new(RegisterAliases),
        Arc::new(RegisterProviders),
        Arc::new(BootProviders),
    ]
}
