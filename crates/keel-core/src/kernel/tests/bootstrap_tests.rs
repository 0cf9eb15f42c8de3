use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::{TempDir, tempdir};

use crate::config::Repository;
use crate::event::{Event, EventResult, LocaleUpdated, SystemEvent};
use crate::kernel::bootstrap::Application;
use crate::kernel::bootstrappers::Bootstrapper;
use crate::kernel::catalog::TypeKind;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::provider_system::{
    BootProvider, ProviderCallbacks, ProviderQuery, ProviderSystemError, ServiceProvider,
};

type Journal = Arc<Mutex<Vec<String>>>;

fn app() -> (TempDir, Application) {
    let dir = tempdir().unwrap();
    let app = Application::new(dir.path()).unwrap();
    (dir, app)
}

fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// Counts hook runs and writes them to a shared journal.
struct Recording {
    label: &'static str,
    journal: Journal,
    registers: AtomicUsize,
    boots: AtomicUsize,
    callbacks: ProviderCallbacks,
}

impl Recording {
    fn new(label: &'static str, journal: &Journal) -> Self {
        Self {
            label,
            journal: journal.clone(),
            registers: AtomicUsize::new(0),
            boots: AtomicUsize::new(0),
            callbacks: ProviderCallbacks::new(),
        }
    }
}

impl ServiceProvider for Recording {
    fn name(&self) -> &str {
        self.label
    }

    fn register(&self, _app: &mut Application) -> Result<()> {
        self.registers.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().unwrap().push(format!("register {}", self.label));
        Ok(())
    }

    fn tags(&self) -> &[&'static str] {
        &["recording"]
    }

    fn boot_hook(&self) -> Option<&dyn BootProvider> {
        Some(self)
    }

    fn callbacks(&self) -> Option<&ProviderCallbacks> {
        Some(&self.callbacks)
    }
}

impl BootProvider for Recording {
    fn boot(&self, _app: &mut Application) -> Result<()> {
        self.boots.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().unwrap().push(format!("boot {}", self.label));
        Ok(())
    }
}

/// Second provider type so two providers can coexist in one registry.
struct Other(Recording);

impl ServiceProvider for Other {
    fn name(&self) -> &str {
        self.0.label
    }

    fn register(&self, app: &mut Application) -> Result<()> {
        ServiceProvider::register(&self.0, app)
    }

    fn boot_hook(&self) -> Option<&dyn BootProvider> {
        Some(&self.0)
    }
}

/// Registers another provider from its boot hook.
struct Spawner(Journal);

impl ServiceProvider for Spawner {
    fn boot_hook(&self) -> Option<&dyn BootProvider> {
        Some(self)
    }
}

impl BootProvider for Spawner {
    fn boot(&self, app: &mut Application) -> Result<()> {
        app.register(Arc::new(Recording::new("spawned", &self.0)), false)?;
        Ok(())
    }
}

/// Registration only; no boot capability.
struct Plain;

impl ServiceProvider for Plain {}

struct Failing;

impl ServiceProvider for Failing {
    fn boot_hook(&self) -> Option<&dyn BootProvider> {
        Some(self)
    }
}

impl BootProvider for Failing {
    fn boot(&self, _app: &mut Application) -> Result<()> {
        Err("boot failed".into())
    }
}

fn same(a: &Arc<dyn ServiceProvider>, b: &Arc<dyn ServiceProvider>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

// --- Construction & paths ---------------------------------------------------

#[test]
fn test_empty_base_path_is_a_configuration_error() {
    assert!(matches!(
        Application::new(""),
        Err(Error::Configuration { .. })
    ));
}

#[test]
fn test_base_path_trailing_separators_are_stripped() {
    let dir = tempdir().unwrap();
    let raw = format!("{}///", dir.path().display());
    let app = Application::new(&raw).unwrap();

    assert_eq!(app.base_path(""), dir.path());
    assert_eq!(app.base_path("config"), dir.path().join("config"));
    assert_eq!(app.path(""), dir.path().join("app"));
    assert_eq!(app.path("/Models"), dir.path().join("app/Models"));
    assert_eq!(app.config_path("app.json"), dir.path().join("config/app.json"));
    assert_eq!(app.resource_path("lang"), dir.path().join("resources/lang"));
    assert_eq!(app.view_path(""), dir.path().join("resources/views"));
}

#[test]
fn test_filesystem_root_is_kept() {
    let app = Application::new("/").unwrap();
    assert_eq!(app.base_path(""), std::path::PathBuf::from("/"));
}

#[test]
fn test_view_path_override() {
    let (dir, app) = app();
    let views = dir.path().join("templates");
    fs::create_dir_all(dir.path().join("config")).unwrap();
    fs::write(
        dir.path().join("config/view.json"),
        serde_json::json!({"config": {"view_path": format!("{}/", views.display())}}).to_string(),
    )
    .unwrap();

    assert_eq!(app.view_path("home.html"), views.join("home.html"));
}

#[test]
fn test_core_aliases_resolve_to_core_services() {
    let (_dir, app) = app();
    let by_alias = app.make::<Repository>("config").unwrap();
    let by_contract = app.make::<Repository>("keel::contracts::Config").unwrap();
    assert!(Arc::ptr_eq(&by_alias, &by_contract));
    assert!(Arc::ptr_eq(&by_alias, &app.config().unwrap()));
    assert!(app.has("translator"));
    assert!(app.has("env"));
}

// --- Environment ------------------------------------------------------------

#[test]
fn test_environment_defaults_to_production() {
    let (_dir, app) = app();
    assert_eq!(app.environment(), "production");
    assert!(app.is_production());
    assert!(!app.is_local());
    assert!(!app.has_debug_mode_enabled());
}

#[test]
fn test_environment_membership() {
    let (_dir, app) = app();
    app.env().insert("APP_ENV", "local").unwrap();

    assert!(app.is_environment(&["local"]));
    assert!(app.is_environment(&["staging", "local"]));
    assert!(!app.is_environment(&["staging", "production"]));
    assert!(!app.is_environment(&[]));
    assert!(app.is_local());
    assert!(!app.running_unit_tests());
}

#[test]
fn test_environment_and_debug_from_config() {
    let (dir, app) = app();
    fs::create_dir_all(dir.path().join("config")).unwrap();
    fs::write(
        dir.path().join("config/app.json"),
        r#"{"env": "testing", "debug": true}"#,
    )
    .unwrap();

    assert!(app.running_unit_tests());
    assert!(app.has_debug_mode_enabled());

    app.env().insert("APP_DEBUG", "false").unwrap();
    assert!(!app.has_debug_mode_enabled());
}

// --- Locale -----------------------------------------------------------------

#[test]
fn test_set_locale_dispatches_event() {
    let (_dir, mut app) = app();
    let seen = journal();
    let seen_clone = seen.clone();
    app.listen(
        LocaleUpdated::NAME,
        Box::new(move |event: &dyn Event| {
            if let Some(e) = event.as_any().downcast_ref::<LocaleUpdated>() {
                seen_clone.lock().unwrap().push(e.locale.clone());
            }
            EventResult::Continue
        }),
    );

    assert_eq!(app.get_locale().unwrap(), "en");
    app.set_locale("fr").unwrap();
    assert_eq!(app.current_locale().unwrap(), "fr");
    assert!(app.is_locale("fr"));
    assert!(!app.is_locale("en"));
    assert_eq!(entries(&seen), vec!["fr".to_string()]);
}

#[test]
fn test_fallback_locale() {
    let (_dir, mut app) = app();
    assert_eq!(app.get_fallback_locale().unwrap(), "en");
    app.set_fallback_locale("de").unwrap();
    assert_eq!(app.get_fallback_locale().unwrap(), "de");
    assert_eq!(app.translator().unwrap().fallback(), "de");
}

// --- Provider registration --------------------------------------------------

#[test]
fn test_register_is_idempotent() {
    let (_dir, mut app) = app();
    let log = journal();

    let first = app.register(Arc::new(Recording::new("a", &log)), false).unwrap();
    let second = app.register(Arc::new(Recording::new("a", &log)), false).unwrap();

    assert!(same(&first, &second));
    assert_eq!(entries(&log), vec!["register a".to_string()]);
    assert_eq!(app.providers().len(), 1);
    assert_eq!(app.get_loaded_providers(), &["a".to_string()]);
    assert!(app.provider_is_loaded("a"));
}

#[test]
fn test_forced_register_replaces_instance_in_place() {
    let (_dir, mut app) = app();
    let log = journal();

    let first = app.register(Arc::new(Recording::new("a", &log)), false).unwrap();
    app.register(Arc::new(Other(Recording::new("b", &log))), false)
        .unwrap();
    let forced = app.register(Arc::new(Recording::new("a", &log)), true).unwrap();

    assert!(!same(&first, &forced));
    assert_eq!(
        entries(&log),
        vec!["register a".to_string(), "register b".to_string(), "register a".to_string()]
    );
    let current = app.get_provider("a").unwrap();
    assert!(same(&current, &forced));
    assert_eq!(app.providers().slot_of(std::any::TypeId::of::<Recording>()), Some(0));
    assert_eq!(app.get_loaded_providers().len(), 2);
}

#[test]
fn test_registration_dispatches_system_event() {
    let (_dir, mut app) = app();
    let seen = journal();
    let seen_clone = seen.clone();
    app.listen(
        "provider.registered",
        Box::new(move |event: &dyn Event| {
            if let Some(SystemEvent::ProviderRegistered { provider }) =
                event.as_any().downcast_ref::<SystemEvent>()
            {
                seen_clone.lock().unwrap().push(provider.clone());
            }
            EventResult::Continue
        }),
    );
    app.register(Arc::new(Plain), false).unwrap();
    assert_eq!(entries(&seen), vec![std::any::type_name::<Plain>().to_string()]);
}

#[test]
fn test_provider_lookups() {
    let (_dir, mut app) = app();
    let log = journal();
    app.register(Arc::new(Recording::new("a", &log)), false).unwrap();
    app.register(Arc::new(Plain), false).unwrap();

    let typed = app.get_provider_of::<Recording>().unwrap();
    assert_eq!(typed.label, "a");
    assert!(app.get_provider_of::<Failing>().is_none());
    assert_eq!(app.get_providers(ProviderQuery::Tag("recording")).len(), 1);
    assert_eq!(app.get_providers(ProviderQuery::of::<Plain>()).len(), 1);
}

#[test]
fn test_register_by_name() {
    let (_dir, mut app) = app();
    app.catalog_mut().provider("app::providers::Plain", || Plain);
    app.catalog_mut().register("app::Helper", TypeKind::Other);

    app.register_by_name("app::providers::Plain", false).unwrap();
    assert_eq!(app.providers().len(), 1);

    assert!(matches!(
        app.register_by_name("app::providers::Missing", false),
        Err(Error::ProviderSystem(ProviderSystemError::UnknownProvider { .. }))
    ));
    assert!(matches!(
        app.register_by_name("app::Helper", false),
        Err(Error::ProviderSystem(ProviderSystemError::NotAProvider { .. }))
    ));
}

// --- Boot -------------------------------------------------------------------

#[test]
fn test_boot_runs_once_in_registration_order() {
    let (_dir, mut app) = app();
    let log = journal();
    app.register(Arc::new(Recording::new("a", &log)), false).unwrap();
    app.register(Arc::new(Other(Recording::new("b", &log))), false)
        .unwrap();
    app.register(Arc::new(Plain), false).unwrap();

    app.boot().unwrap();
    app.boot().unwrap();

    assert!(app.is_booted());
    assert_eq!(
        entries(&log),
        vec![
            "register a".to_string(),
            "register b".to_string(),
            "boot a".to_string(),
            "boot b".to_string(),
        ]
    );
    let a = app.get_provider_of::<Recording>().unwrap();
    assert_eq!(a.boots.load(Ordering::SeqCst), 1);
    assert_eq!(a.registers.load(Ordering::SeqCst), 1);
}

#[test]
fn test_late_registration_boots_immediately() {
    let (_dir, mut app) = app();
    let log = journal();
    app.boot().unwrap();

    app.register(Arc::new(Recording::new("late", &log)), false)
        .unwrap();
    assert_eq!(
        entries(&log),
        vec!["register late".to_string(), "boot late".to_string()]
    );
    assert!(app.providers().is_booted(0));
}

#[test]
fn test_providers_registered_during_boot_are_booted_once() {
    let (_dir, mut app) = app();
    let log = journal();
    app.register(Arc::new(Spawner(log.clone())), false).unwrap();
    app.boot().unwrap();

    assert_eq!(
        entries(&log),
        vec!["register spawned".to_string(), "boot spawned".to_string()]
    );
    let spawned = app.get_provider_of::<Recording>().unwrap();
    assert_eq!(spawned.boots.load(Ordering::SeqCst), 1);
}

#[test]
fn test_callbacks_wrap_the_boot_pass() {
    let (_dir, mut app) = app();
    let log = journal();
    let provider = Arc::new(Recording::new("a", &log));

    let booting_log = log.clone();
    provider.callbacks.booting(Arc::new(move |_: &mut Application| {
        booting_log.lock().unwrap().push("provider booting".into());
        Ok(())
    }));
    let booted_log = log.clone();
    provider.callbacks.booted(Arc::new(move |_: &mut Application| {
        booted_log.lock().unwrap().push("provider booted".into());
        Ok(())
    }));
    app.register(provider, false).unwrap();

    let app_booting = log.clone();
    app.booting(Box::new(move |_: &mut Application| {
        app_booting.lock().unwrap().push("app booting".into());
        Ok(())
    }));
    let app_booted = log.clone();
    app.booted(Box::new(move |_: &mut Application| {
        app_booted.lock().unwrap().push("app booted".into());
        Ok(())
    }))
    .unwrap();

    app.boot().unwrap();

    let late = log.clone();
    app.booted(Box::new(move |_: &mut Application| {
        late.lock().unwrap().push("late booted".into());
        Ok(())
    }))
    .unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "register a".to_string(),
            "app booting".to_string(),
            "provider booting".to_string(),
            "boot a".to_string(),
            "provider booted".to_string(),
            "app booted".to_string(),
            "late booted".to_string(),
        ]
    );
}

#[test]
fn test_boot_failure_propagates_and_leaves_app_unbooted() {
    let (_dir, mut app) = app();
    app.register(Arc::new(Failing), false).unwrap();

    let err = app.boot().unwrap_err();
    assert!(matches!(err, Error::Other(ref m) if m == "boot failed"));
    assert!(!app.is_booted());
}

/// Fails its first boot, succeeds afterwards.
#[derive(Default)]
struct FailsOnce {
    attempts: AtomicUsize,
}

impl ServiceProvider for FailsOnce {
    fn boot_hook(&self) -> Option<&dyn BootProvider> {
        Some(self)
    }
}

impl BootProvider for FailsOnce {
    fn boot(&self, _app: &mut Application) -> Result<()> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err("first boot failed".into());
        }
        Ok(())
    }
}

#[test]
fn test_booting_callbacks_survive_a_failed_boot() {
    let (_dir, mut app) = app();
    app.register(Arc::new(FailsOnce::default()), false).unwrap();
    let log = journal();
    let booting = log.clone();
    app.booting(Box::new(move |_: &mut Application| {
        booting.lock().unwrap().push("app booting".into());
        Ok(())
    }));

    assert!(app.boot().is_err());
    assert!(!app.is_booted());
    app.boot().unwrap();

    assert!(app.is_booted());
    assert_eq!(
        entries(&log),
        vec!["app booting".to_string(), "app booting".to_string()]
    );
}

// --- Bootstrap --------------------------------------------------------------

struct Step(&'static str, Journal);

impl Bootstrapper for Step {
    fn name(&self) -> &'static str {
        self.0
    }

    fn bootstrap(&self, _app: &mut Application) -> Result<()> {
        self.1.lock().unwrap().push(format!("run {}", self.0));
        Ok(())
    }
}

struct Broken;

impl Bootstrapper for Broken {
    fn name(&self) -> &'static str {
        "Broken"
    }

    fn bootstrap(&self, _app: &mut Application) -> Result<()> {
        Err(Error::configuration("missing setting", None))
    }
}

fn observe(app: &mut Application, log: &Journal, step: &str) {
    let before = log.clone();
    app.before_bootstrapping(
        step,
        Box::new(move |event: &dyn Event| {
            before.lock().unwrap().push(event.name().to_string());
            EventResult::Continue
        }),
    );
    let after = log.clone();
    app.after_bootstrapping(
        step,
        Box::new(move |event: &dyn Event| {
            after.lock().unwrap().push(event.name().to_string());
            EventResult::Continue
        }),
    );
}

#[test]
fn test_bootstrap_with_runs_steps_between_events() {
    let (_dir, mut app) = app();
    let log = journal();
    observe(&mut app, &log, "First");
    observe(&mut app, &log, "Second");

    let steps: Vec<Arc<dyn Bootstrapper>> = vec![
        Arc::new(Step("First", log.clone())),
        Arc::new(Step("Second", log.clone())),
    ];
    app.bootstrap_with(&steps).unwrap();
    app.bootstrap_with(&steps).unwrap();

    assert!(app.has_been_bootstrapped());
    assert_eq!(
        entries(&log),
        vec![
            "bootstrapping: First".to_string(),
            "run First".to_string(),
            "bootstrapped: First".to_string(),
            "bootstrapping: Second".to_string(),
            "run Second".to_string(),
            "bootstrapped: Second".to_string(),
        ]
    );
}

#[test]
fn test_bootstrapper_failure_is_wrapped() {
    let (_dir, mut app) = app();
    let log = journal();
    let steps: Vec<Arc<dyn Bootstrapper>> =
        vec![Arc::new(Broken), Arc::new(Step("Never", log.clone()))];

    match app.bootstrap_with(&steps) {
        Err(Error::KernelLifecycleError {
            phase,
            component_name,
            source,
            ..
        }) => {
            assert_eq!(phase, KernelLifecyclePhase::Bootstrap);
            assert_eq!(component_name.as_deref(), Some("Broken"));
            assert!(matches!(source.as_deref(), Some(Error::Configuration { .. })));
        }
        other => panic!("expected a lifecycle error, got {:?}", other),
    }
    assert!(app.has_been_bootstrapped());
    assert!(entries(&log).is_empty());
}

// --- Events -----------------------------------------------------------------

struct Counter(AtomicUsize);

impl crate::event::Listener for Counter {
    fn listen(&self) -> Vec<&'static str> {
        vec![LocaleUpdated::NAME]
    }

    fn process(&self, _app: &mut Application, _event: &dyn Event) -> Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_stopping_observer_skips_listeners() {
    let (_dir, mut app) = app();
    let listener = Arc::new(Counter(AtomicUsize::new(0)));
    app.add_listener(listener.clone());

    app.dispatch(&LocaleUpdated { locale: "fr".into() }).unwrap();
    assert_eq!(listener.0.load(Ordering::SeqCst), 1);

    app.listen(LocaleUpdated::NAME, Box::new(|_: &dyn Event| EventResult::Stop));
    let result = app.dispatch(&LocaleUpdated { locale: "de".into() }).unwrap();
    assert_eq!(result, EventResult::Stop);
    assert_eq!(listener.0.load(Ordering::SeqCst), 1);
}

// --- Namespace & abort ------------------------------------------------------

#[test]
fn test_namespace_from_autoload_map() {
    let (dir, app) = app();
    fs::create_dir_all(dir.path().join("app")).unwrap();
    fs::create_dir_all(dir.path().join("database")).unwrap();
    fs::write(
        dir.path().join("keel.json"),
        r#"{"autoload": {"Database\\": "database/", "App\\": ["lib/", "app/"]}}"#,
    )
    .unwrap();

    assert_eq!(app.get_namespace().unwrap(), "App\\");

    // Cached after the first successful lookup.
    fs::remove_file(dir.path().join("keel.json")).unwrap();
    assert_eq!(app.get_namespace().unwrap(), "App\\");
}

#[test]
fn test_namespace_requires_existing_app_directory() {
    let (dir, app) = app();
    fs::write(
        dir.path().join("keel.json"),
        r#"{"autoload": {"App\\": "app/"}}"#,
    )
    .unwrap();

    match app.get_namespace() {
        Err(Error::Configuration { message, .. }) => {
            assert_eq!(message, "Unable to detect application namespace.")
        }
        other => panic!("expected a configuration error, got {:?}", other),
    }
}

#[test]
fn test_namespace_without_manifest_is_a_configuration_error() {
    let (dir, app) = app();
    fs::create_dir_all(dir.path().join("app")).unwrap();
    assert!(matches!(
        app.get_namespace(),
        Err(Error::Configuration { path: Some(path), .. }) if path.ends_with("keel.json")
    ));

    fs::write(dir.path().join("keel.json"), "{ not json").unwrap();
    assert!(matches!(app.get_namespace(), Err(Error::Configuration { .. })));
}

#[test]
fn test_abort() {
    let (_dir, app) = app();
    assert!(matches!(app.abort(404, "gone"), Err(Error::NotFound { .. })));
    assert!(matches!(
        app.abort(503, "maintenance"),
        Err(Error::Http { status: 503, .. })
    ));
}
