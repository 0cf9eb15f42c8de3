use std::any::TypeId;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use log::{debug, info};

use crate::config::Repository;
use crate::container::{Container, Factory, Service, factory};
use crate::env::EnvRepository;
use crate::event::{
    BootstrapEvent, BootstrapPhase, Event, EventDispatcher, EventHandler, EventId, EventResult,
    Listener, LocaleUpdated, SystemEvent,
};
use crate::kernel::bootstrappers::Bootstrapper;
use crate::kernel::catalog::TypeCatalog;
use crate::kernel::constants::{
    APP_DIR, APP_VERSION, CONFIG, CONFIG_DIR, CORE_ALIASES, DEFAULT_ENVIRONMENT, DEFAULT_LOCALE,
    ENV, FOUNDATION_PROVIDER, PROJECT_MANIFEST, RESOURCES_DIR, TRANSLATOR, VIEWS_DIR,
};
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::kernel::translator::Translator;
use crate::provider_system::{
    PackageManifest, ProviderId, ProviderQuery, ProviderRegistry, ServiceProvider,
};
use crate::providers::FoundationServiceProvider;
use crate::utils::fs::join_paths;

/// Callback run around the application boot
pub type AppCallback = Box<dyn FnMut(&mut Application) -> Result<()> + Send>;

/// The composition root of a Keel process.
///
/// Owns the base path, the service container (and its alias table), the
/// provider registry and the event dispatcher. Two flags track the lifecycle:
/// `has_been_bootstrapped` flips when [`bootstrap_with`](Application::bootstrap_with)
/// starts and `booted` flips once [`boot`](Application::boot) has booted every
/// registered provider. Neither is ever reset.
pub struct Application {
    base_path: PathBuf,
    has_been_bootstrapped: bool,
    booted: bool,
    container: Container,
    events: EventDispatcher,
    listeners: Vec<Arc<dyn Listener>>,
    providers: ProviderRegistry,
    catalog: TypeCatalog,
    env: Arc<EnvRepository>,
    booting_callbacks: Vec<AppCallback>,
    booted_callbacks: Vec<AppCallback>,
    namespace: OnceLock<String>,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("base_path", &self.base_path)
            .field("has_been_bootstrapped", &self.has_been_bootstrapped)
            .field("booted", &self.booted)
            .field("providers", &self.providers)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Application {
    /// Create the runtime rooted at `base_path`.
    ///
    /// The path is made absolute and stripped of trailing separators. Core
    /// services (environment, config, translator) are bound lazily; nothing is
    /// read from disk until they are first resolved.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let raw = base_path.as_ref();
        if raw.as_os_str().is_empty() {
            return Err(Error::configuration("Application base path is not set.", None));
        }
        let absolute = std::path::absolute(raw)
            .map_err(|e| Error::io(e, "resolve_base_path", raw.to_path_buf()))?;

        let mut app = Self {
            base_path: strip_trailing_separators(&absolute),
            has_been_bootstrapped: false,
            booted: false,
            container: Container::new(),
            events: EventDispatcher::new(),
            listeners: Vec::new(),
            providers: ProviderRegistry::new(),
            catalog: TypeCatalog::new(),
            env: Arc::new(EnvRepository::new()),
            booting_callbacks: Vec::new(),
            booted_callbacks: Vec::new(),
            namespace: OnceLock::new(),
        };

        app.register_base_bindings()?;
        app.register_core_container_aliases()?;
        app.catalog
            .provider(FOUNDATION_PROVIDER, FoundationServiceProvider::new);

        info!("Application created at {:?}", app.base_path);
        Ok(app)
    }

    fn register_base_bindings(&mut self) -> Result<()> {
        self.container.instance(ENV, self.env.clone() as Service)?;

        let config_dir = self.base_path.join(CONFIG_DIR);
        self.container.singleton(
            CONFIG,
            factory(move |container: &Container| {
                let env = container.make::<EnvRepository>(ENV)?;
                Repository::load(&config_dir, &env)
            }),
        );

        self.container.singleton(
            TRANSLATOR,
            factory(|container: &Container| {
                let config = container.make::<Repository>(CONFIG)?;
                Ok(Translator::new(
                    config.get_or("app.locale", DEFAULT_LOCALE.to_string()),
                    config.get_or("app.fallback_locale", DEFAULT_LOCALE.to_string()),
                ))
            }),
        );
        Ok(())
    }

    fn register_core_container_aliases(&mut self) -> Result<()> {
        for (canonical, aliases) in CORE_ALIASES {
            for alias in *aliases {
                self.container.alias(canonical, alias)?;
            }
        }
        Ok(())
    }

    /// Framework version
    pub fn version(&self) -> &'static str {
        APP_VERSION
    }

    // --- Paths -------------------------------------------------------------

    pub fn base_path(&self, path: &str) -> PathBuf {
        join_paths(&self.base_path, path)
    }

    /// Path inside the application code directory
    pub fn path(&self, path: &str) -> PathBuf {
        join_paths(&self.base_path.join(APP_DIR), path)
    }

    pub fn resource_path(&self, path: &str) -> PathBuf {
        join_paths(&self.base_path.join(RESOURCES_DIR), path)
    }

    pub fn config_path(&self, path: &str) -> PathBuf {
        join_paths(&self.base_path.join(CONFIG_DIR), path)
    }

    /// Views directory; `view.config.view_path` overrides the default location.
    pub fn view_path(&self, path: &str) -> PathBuf {
        let configured = self
            .config()
            .ok()
            .and_then(|config| config.get::<String>("view.config.view_path"))
            .filter(|p| !p.is_empty());
        let views = match configured {
            Some(p) => strip_trailing_separators(Path::new(&p)),
            None => self.base_path(VIEWS_DIR),
        };
        join_paths(&views, path)
    }

    // --- Environment -------------------------------------------------------

    /// The detected environment: `APP_ENV`, then `app.env`, then `production`.
    pub fn environment(&self) -> String {
        self.env
            .get("APP_ENV")
            .filter(|e| !e.is_empty())
            .or_else(|| self.config().ok().and_then(|c| c.get::<String>("app.env")))
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
    }

    /// Whether the detected environment is one of `environments`.
    pub fn is_environment(&self, environments: &[&str]) -> bool {
        let current = self.environment();
        environments.iter().any(|e| *e == current)
    }

    pub fn is_local(&self) -> bool {
        self.is_environment(&["local"])
    }

    pub fn is_production(&self) -> bool {
        self.is_environment(&["production"])
    }

    pub fn running_unit_tests(&self) -> bool {
        self.is_environment(&["testing"])
    }

    pub fn has_debug_mode_enabled(&self) -> bool {
        if let Some(value) = self.env.value("APP_DEBUG") {
            return value
                .as_bool()
                .or_else(|| value.as_i64().map(|n| n != 0))
                .unwrap_or(false);
        }
        self.config()
            .ok()
            .and_then(|c| c.get::<bool>("app.debug"))
            .unwrap_or(false)
    }

    // --- Locale ------------------------------------------------------------

    pub fn get_locale(&self) -> Result<String> {
        Ok(self.translator()?.locale())
    }

    pub fn current_locale(&self) -> Result<String> {
        self.get_locale()
    }

    pub fn is_locale(&self, locale: &str) -> bool {
        self.get_locale().is_ok_and(|current| current == locale)
    }

    /// Set the translator locale and announce it with [`LocaleUpdated`].
    pub fn set_locale(&mut self, locale: &str) -> Result<()> {
        self.translator()?.set_locale(locale);
        self.dispatch(&LocaleUpdated {
            locale: locale.to_string(),
        })?;
        Ok(())
    }

    pub fn get_fallback_locale(&self) -> Result<String> {
        let config = self.config()?;
        match config.get::<String>("app.fallback_locale") {
            Some(locale) => Ok(locale),
            None => Ok(self.translator()?.fallback()),
        }
    }

    pub fn set_fallback_locale(&mut self, locale: &str) -> Result<()> {
        self.config()?.set("app.fallback_locale", locale)?;
        self.translator()?.set_fallback(locale);
        Ok(())
    }

    // --- Providers ---------------------------------------------------------

    /// Register `provider`, returning the instance that ends up registered.
    ///
    /// Registering an already registered type returns the existing instance
    /// without running any hook, unless `force` is set. Providers registered
    /// after the application booted are booted immediately.
    pub fn register(
        &mut self,
        provider: Arc<dyn ServiceProvider>,
        force: bool,
    ) -> Result<Arc<dyn ServiceProvider>> {
        let name = provider.name().to_string();
        self.register_as(provider, name, force)
    }

    /// Register the provider catalogued under `identity`, keyed by that identity.
    pub fn register_by_name(&mut self, identity: &str, force: bool) -> Result<Arc<dyn ServiceProvider>> {
        if !force {
            if let Some(registered) = self.providers.get_by_name(identity) {
                return Ok(registered);
            }
        }
        let provider = self.catalog.make_provider(identity)?;
        self.register_as(provider, identity.to_string(), force)
    }

    fn register_as(
        &mut self,
        provider: Arc<dyn ServiceProvider>,
        name: String,
        force: bool,
    ) -> Result<Arc<dyn ServiceProvider>> {
        let type_id = ProviderId::of(provider.as_ref()).type_id;
        if !force {
            if let Some(registered) = self.providers.get(type_id) {
                return Ok(registered);
            }
        }

        debug!("Registering provider {}", name);
        provider.register(self)?;

        for (id, binding) in provider.bindings() {
            self.container.bind(&id, binding);
        }
        for (id, binding) in provider.singletons() {
            self.container.singleton(&id, binding);
        }

        let slot = self.providers.insert_as(provider.clone(), &name);
        self.dispatch(&SystemEvent::ProviderRegistered {
            provider: name,
        })?;

        if self.booted {
            self.boot_provider_at(slot)?;
        }
        Ok(provider)
    }

    pub fn get_provider(&self, identity: &str) -> Option<Arc<dyn ServiceProvider>> {
        self.providers.get_by_name(identity)
    }

    pub fn get_provider_of<P: ServiceProvider>(&self) -> Option<Arc<P>> {
        self.providers
            .get(TypeId::of::<P>())
            .and_then(|provider| provider.into_any_arc().downcast::<P>().ok())
    }

    pub fn get_providers(&self, query: ProviderQuery<'_>) -> Vec<Arc<dyn ServiceProvider>> {
        self.providers.query(query)
    }

    /// Every provider identity registered so far, in first-registration order.
    pub fn get_loaded_providers(&self) -> &[String] {
        self.providers.loaded()
    }

    pub fn provider_is_loaded(&self, identity: &str) -> bool {
        self.providers.is_loaded(identity)
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Boot every registered provider in registration order. No-op once booted.
    pub fn boot(&mut self) -> Result<()> {
        if self.booted {
            return Ok(());
        }

        // Booting callbacks are kept until a boot attempt succeeds, so a retry
        // after a failed provider runs them again.
        let mut booting = std::mem::take(&mut self.booting_callbacks);
        let pass = self
            .fire_app_callbacks(&mut booting)
            .and_then(|_| self.boot_pending_providers());
        if let Err(e) = pass {
            booting.append(&mut self.booting_callbacks);
            self.booting_callbacks = booting;
            return Err(e);
        }

        self.booted = true;
        info!("Application booted with {} provider(s)", self.providers.len());

        let mut booted = std::mem::take(&mut self.booted_callbacks);
        self.fire_app_callbacks(&mut booted)?;
        self.dispatch(&SystemEvent::ApplicationBooted)?;
        Ok(())
    }

    fn boot_pending_providers(&mut self) -> Result<()> {
        // Providers registered by a boot hook are appended and booted in turn.
        let mut slot = 0;
        while slot < self.providers.len() {
            if !self.providers.is_booted(slot) {
                self.boot_provider_at(slot)?;
            }
            slot += 1;
        }
        Ok(())
    }

    fn boot_provider_at(&mut self, slot: usize) -> Result<()> {
        let Some(provider) = self.providers.provider_at(slot) else {
            return Ok(());
        };

        if let Some(callbacks) = provider.callbacks() {
            callbacks.call_booting(self)?;
        }
        if let Some(hook) = provider.boot_hook() {
            hook.boot(self)?;
        }
        if let Some(callbacks) = provider.callbacks() {
            callbacks.call_booted(self)?;
        }

        self.providers.mark_booted(slot);
        let name = self
            .providers
            .name_at(slot)
            .unwrap_or_else(|| provider.name())
            .to_string();
        debug!("Booted provider {}", name);
        self.dispatch(&SystemEvent::ProviderBooted { provider: name })?;
        Ok(())
    }

    /// Run `callback` right before providers are booted.
    pub fn booting(&mut self, callback: AppCallback) {
        self.booting_callbacks.push(callback);
    }

    /// Run `callback` once the application has booted, immediately if it already has.
    pub fn booted(&mut self, mut callback: AppCallback) -> Result<()> {
        if self.booted {
            return callback(self);
        }
        self.booted_callbacks.push(callback);
        Ok(())
    }

    fn fire_app_callbacks(&mut self, callbacks: &mut [AppCallback]) -> Result<()> {
        for callback in callbacks.iter_mut() {
            callback(self)?;
        }
        Ok(())
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    // --- Bootstrap ---------------------------------------------------------

    /// Run `bootstrappers` in order, once per process.
    ///
    /// The bootstrapped flag is set before the first step so a bootstrapper
    /// that re-enters this method finds it already set and returns early.
    pub fn bootstrap_with(&mut self, bootstrappers: &[Arc<dyn Bootstrapper>]) -> Result<()> {
        if self.has_been_bootstrapped {
            debug!("Application already bootstrapped; skipping");
            return Ok(());
        }
        self.has_been_bootstrapped = true;

        for bootstrapper in bootstrappers {
            let name = bootstrapper.name();
            self.dispatch(&BootstrapEvent::new(BootstrapPhase::Bootstrapping, name))?;

            bootstrapper
                .bootstrap(self)
                .map_err(|e| Error::KernelLifecycleError {
                    phase: KernelLifecyclePhase::Bootstrap,
                    component_name: Some(name.to_string()),
                    message: format!("Bootstrapper '{}' failed: {}", name, e),
                    source: Some(Box::new(e)),
                })?;

            self.dispatch(&BootstrapEvent::new(BootstrapPhase::Bootstrapped, name))?;
        }
        Ok(())
    }

    pub fn has_been_bootstrapped(&self) -> bool {
        self.has_been_bootstrapped
    }

    /// Observe the start of the named bootstrapper
    pub fn before_bootstrapping(&mut self, bootstrapper: &str, handler: EventHandler) -> EventId {
        let event = BootstrapEvent::event_name(BootstrapPhase::Bootstrapping, bootstrapper);
        self.events.register_handler(&event, handler)
    }

    /// Observe the completion of the named bootstrapper
    pub fn after_bootstrapping(&mut self, bootstrapper: &str, handler: EventHandler) -> EventId {
        let event = BootstrapEvent::event_name(BootstrapPhase::Bootstrapped, bootstrapper);
        self.events.register_handler(&event, handler)
    }

    // --- Events ------------------------------------------------------------

    /// Dispatch `event` to observers, then to the listeners subscribed to it.
    pub fn dispatch(&mut self, event: &dyn Event) -> Result<EventResult> {
        if self.events.dispatch(event) == EventResult::Stop {
            return Ok(EventResult::Stop);
        }

        let listeners: Vec<Arc<dyn Listener>> = self
            .listeners
            .iter()
            .filter(|l| l.listen().iter().any(|name| *name == event.name()))
            .cloned()
            .collect();
        for listener in listeners {
            debug!("{} handling {}", listener.name(), event.name());
            listener.process(self, event)?;
        }
        Ok(EventResult::Continue)
    }

    pub fn listen(&mut self, event: &str, handler: EventHandler) -> EventId {
        self.events.register_handler(event, handler)
    }

    pub fn add_listener(&mut self, listener: Arc<dyn Listener>) {
        self.listeners.push(listener);
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventDispatcher {
        &mut self.events
    }

    // --- Namespace ---------------------------------------------------------

    /// Root namespace of the application code, read from the autoload map of
    /// the project manifest. The first mapping whose path is the app directory wins.
    pub fn get_namespace(&self) -> Result<String> {
        if let Some(namespace) = self.namespace.get() {
            return Ok(namespace.clone());
        }

        let manifest_path = self.base_path(PROJECT_MANIFEST);
        if !manifest_path.is_file() {
            return Err(Error::configuration(
                "Project manifest not found; unable to detect application namespace.",
                Some(manifest_path),
            ));
        }
        let manifest = PackageManifest::load(&self.base_path("")).map_err(|e| {
            Error::configuration(format!("Invalid project manifest: {}", e), Some(manifest_path.clone()))
        })?;

        // Paths that do not exist never match.
        if let Ok(app_path) = self.path("").canonicalize() {
            for (namespace, paths) in &manifest.autoload {
                let matched = paths
                    .iter()
                    .any(|p| self.base_path(p).canonicalize().is_ok_and(|p| p == app_path));
                if matched {
                    return Ok(self.namespace.get_or_init(|| namespace.clone()).clone());
                }
            }
        }

        Err(Error::configuration(
            "Unable to detect application namespace.",
            Some(manifest_path),
        ))
    }

    // --- Container ---------------------------------------------------------

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    pub fn make<T: std::any::Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>> {
        self.container.make::<T>(id)
    }

    pub fn bind(&mut self, id: &str, binding: Factory) {
        self.container.bind(id, binding);
    }

    pub fn singleton(&mut self, id: &str, binding: Factory) {
        self.container.singleton(id, binding);
    }

    pub fn instance(&mut self, id: &str, service: Service) -> Result<()> {
        self.container.instance(id, service)
    }

    pub fn alias(&mut self, canonical: &str, name: &str) -> Result<()> {
        self.container.alias(canonical, name)
    }

    pub fn has(&self, id: &str) -> bool {
        self.container.has(id)
    }

    /// The current configuration instance
    pub fn config(&self) -> Result<Arc<Repository>> {
        self.container.make::<Repository>(CONFIG)
    }

    pub fn env(&self) -> Arc<EnvRepository> {
        self.env.clone()
    }

    pub fn translator(&self) -> Result<Arc<Translator>> {
        self.container.make::<Translator>(TRANSLATOR)
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut TypeCatalog {
        &mut self.catalog
    }

    // --- HTTP --------------------------------------------------------------

    /// Abort the current request with `code`.
    pub fn abort(&self, code: u16, message: &str) -> Result<()> {
        if code == 404 {
            return Err(Error::NotFound {
                message: message.to_string(),
            });
        }
        Err(Error::Http {
            status: code,
            message: message.to_string(),
        })
    }
}

fn strip_trailing_separators(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => {
            let trimmed = s.trim_end_matches(['/', '\\']);
            if trimmed.is_empty() {
                // Filesystem root
                PathBuf::from(&s[..1])
            } else {
                PathBuf::from(trimmed)
            }
        }
        None => path.to_path_buf(),
    }
}
