use crate::event::Event;
use crate::event::types::{BootstrapEvent, BootstrapPhase, SystemEvent, WorkerEvent};

#[test]
fn test_bootstrap_event_names_embed_bootstrapper() {
    let before = BootstrapEvent::new(BootstrapPhase::Bootstrapping, "LoadEnvironmentVariables");
    let after = BootstrapEvent::new(BootstrapPhase::Bootstrapped, "LoadEnvironmentVariables");
    assert_eq!(before.name(), "bootstrapping: LoadEnvironmentVariables");
    assert_eq!(after.name(), "bootstrapped: LoadEnvironmentVariables");
    assert_eq!(after.bootstrapper, "LoadEnvironmentVariables");
}

#[test]
fn test_worker_event_names() {
    assert_eq!(WorkerEvent::BeforeWorkerStart { cycle: 3 }.name(), "worker.before_start");
    assert_eq!(WorkerEvent::AfterWorkerCycle { cycle: 3 }.name(), "worker.after_cycle");
}

#[test]
fn test_system_event_downcast() {
    let event = SystemEvent::ProviderBooted { provider: "app::Provider".into() };
    let dyn_event: &dyn Event = &event;
    assert_eq!(dyn_event.name(), "provider.booted");
    assert_eq!(dyn_event.as_any().downcast_ref::<SystemEvent>(), Some(&event));
}
