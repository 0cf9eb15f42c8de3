//! Providers shipped with the framework.
use std::sync::Arc;

use log::{debug, info};

use crate::config::ReloadDotenvAndConfig;
use crate::event::{EventResult, LocaleUpdated, sync_typed_handler};
use crate::kernel::bootstrap::Application;
use crate::kernel::constants::FOUNDATION_PROVIDER;
use crate::kernel::error::Result;
use crate::provider_system::{BootProvider, ServiceProvider};

/// Core provider registered ahead of every other provider.
///
/// Installs the per-cycle environment/config reload listener and logs locale
/// changes once booted.
#[derive(Debug, Default)]
pub struct FoundationServiceProvider;

impl FoundationServiceProvider {
    pub fn new() -> Self {
        Self
    }
}

impl ServiceProvider for FoundationServiceProvider {
    fn name(&self) -> &str {
        FOUNDATION_PROVIDER
    }

    fn register(&self, app: &mut Application) -> Result<()> {
        ReloadDotenvAndConfig::install(app)?;
        Ok(())
    }

    fn tags(&self) -> &[&'static str] {
        &["foundation"]
    }

    fn boot_hook(&self) -> Option<&dyn BootProvider> {
        Some(self)
    }
}

impl BootProvider for FoundationServiceProvider {
    fn boot(&self, app: &mut Application) -> Result<()> {
        info!(
            "Foundation booted (environment: {}, locale: {})",
            app.environment(),
            app.get_locale()?
        );
        app.events_mut()
            .register_type_handler::<LocaleUpdated>(sync_typed_handler(|event: &LocaleUpdated| {
                debug!("Locale changed to {}", event.locale);
                EventResult::Continue
            }));
        Ok(())
    }
}

/// Register the foundation provider on `app`.
pub fn register_foundation(app: &mut Application) -> Result<()> {
    app.register(Arc::new(FoundationServiceProvider::new()), false)?;
    Ok(())
}
