use std::env;
use std::sync::Arc;

use contextual_di::{container, Container, ExecutionContext, MetricsObserver, Resolver};
use serial_test::serial;

#[test]
#[serial]
fn test_default_container_is_shared() {
    let first = container() as *const Container;
    let second = container() as *const Container;
    assert_eq!(first, second);

    ExecutionContext::root().fork().run(|| {
        container().set("default.only", 3u8);
        let value = container().get_as::<u8>("default.only", None).unwrap().unwrap();
        assert_eq!(*value, 3);
    });
}

#[test]
#[serial]
fn test_container_from_env() {
    env::set_var("CONTEXTUAL_DI_MAX_RESOLUTION_DEPTH", "8");
    env::set_var("CONTEXTUAL_DI_LOG_PREFIX", "[test]");

    let configured = Container::from_env();
    assert_eq!(configured.config().max_resolution_depth, 8);
    assert_eq!(configured.config().log_prefix, "[test]");

    env::remove_var("CONTEXTUAL_DI_MAX_RESOLUTION_DEPTH");
    env::remove_var("CONTEXTUAL_DI_LOG_PREFIX");

    assert_eq!(Container::from_env().config().max_resolution_depth, 256);
}

#[test]
fn test_metrics_observer() {
    let metrics = Arc::new(MetricsObserver::new());
    let mut container = Container::new();
    container.add_observer(metrics.clone());

    container.set("a", 1u8);
    container.get("a", None).unwrap();
    container.get("b", None).unwrap();

    assert_eq!(metrics.binding_count(), 1);
    assert_eq!(metrics.resolution_count(), 2);
    assert_eq!(metrics.failure_count(), 0);
    assert!(metrics.average_resolution_time().is_some());
}
