use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use contextual_di::{
    BindOptions, Container, DiError, DiResult, Factory, FactorySource, Id, Resolver, Token,
};
use contextual_di::metadata::{Declaration, Injectable};

#[derive(Debug, PartialEq)]
struct Config {
    port: u16,
}

#[derive(Default)]
struct Widget;

impl Injectable for Widget {
    fn declare(d: &mut Declaration<Self>) -> DiResult<()> {
        d.default_constructor();
        Ok(())
    }
}

#[test]
fn test_bind_closure() {
    let container = Container::new();
    container.bind("config", |_| Ok(Config { port: 8080 }), BindOptions::default());

    let config = container.get_as::<Config>("config", None).unwrap().unwrap();
    assert_eq!(config.port, 8080);
}

#[test]
fn test_closure_resolves_its_dependencies() {
    let container = Container::new();
    container.set("port", 9000u16);
    container.bind(
        "config",
        |r| {
            let port = r.get_as::<u16>("port", None)?.ok_or(DiError::NotFound("port".into()))?;
            Ok(Config { port: *port })
        },
        BindOptions::default(),
    );

    let config = container.get_as::<Config>("config", None).unwrap().unwrap();
    assert_eq!(*config, Config { port: 9000 });
}

#[test]
fn test_bind_value() {
    let container = Container::new();
    container.set("name", "demo".to_string());

    let a = container.get_as::<String>("name", None).unwrap().unwrap();
    let b = container.get_as::<String>("name", None).unwrap().unwrap();
    assert_eq!(a.as_str(), "demo");
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_bind_alias() {
    let container = Container::new();
    container.set("real", 5u32);
    container.bind_alias("other", "real", BindOptions::default());

    let value = container.get_as::<u32>("other", None).unwrap().unwrap();
    assert_eq!(*value, 5);
}

#[test]
fn test_singleton_and_transient_closures() {
    let calls = Arc::new(AtomicUsize::new(0));
    let container = Container::new();

    let counter = calls.clone();
    container.bind(
        "single",
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Config { port: 1 })
        },
        BindOptions::singleton(),
    );
    let counter = calls.clone();
    container.bind(
        "fresh",
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Config { port: 2 })
        },
        BindOptions::transient(),
    );

    let a = container.get_as::<Config>("single", None).unwrap().unwrap();
    let b = container.get_as::<Config>("single", None).unwrap().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let c = container.get_as::<Config>("fresh", None).unwrap().unwrap();
    let d = container.get_as::<Config>("fresh", None).unwrap().unwrap();
    assert!(!Arc::ptr_eq(&c, &d));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_singleton_class_behind_alias() {
    let container = Container::new();
    container.bind_class::<Widget>(BindOptions::singleton());
    container.bind_alias("widget", Id::of::<Widget>(), BindOptions::default());

    let a = container.get_as::<Widget>("widget", None).unwrap().unwrap();
    let b = container.resolve::<Widget>(None).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_unbound_class_is_built_per_resolution() {
    let container = Container::new();
    let a = container.resolve::<Widget>(None).unwrap();
    let b = container.resolve::<Widget>(None).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(container.is_auto_bound::<Widget>());
}

#[test]
fn test_class_with_id() {
    let container = Container::new();
    container.bind_class_with_id::<Widget>("w", BindOptions::transient());
    assert!(container.get_as::<Widget>("w", None).unwrap().is_some());
}

struct Connection {
    serial: usize,
}

struct Dialer {
    made: AtomicUsize,
}

impl Factory<Connection> for Dialer {
    fn create(&self) -> DiResult<Connection> {
        Ok(Connection {
            serial: self.made.fetch_add(1, Ordering::SeqCst),
        })
    }
}

impl Injectable for Dialer {
    fn declare(d: &mut Declaration<Self>) -> DiResult<()> {
        d.constructor(|_| {
            Ok(Dialer {
                made: AtomicUsize::new(0),
            })
        });
        Ok(())
    }
}

#[test]
fn test_factory_instance() {
    let container = Container::new();
    container.bind_factory(
        FactorySource::<Connection>::instance(Dialer {
            made: AtomicUsize::new(10),
        }),
        BindOptions::transient(),
    );

    let first = container.get_as::<Connection>(Id::of::<Connection>(), None).unwrap().unwrap();
    let second = container.get_as::<Connection>(Id::of::<Connection>(), None).unwrap().unwrap();
    assert_eq!(first.serial, 10);
    assert_eq!(second.serial, 11);
}

#[test]
fn test_factory_class_is_shared_by_default() {
    let container = Container::new();
    container.bind_factory(FactorySource::<Connection>::of::<Dialer>(), BindOptions::transient());

    let first = container.get_as::<Connection>(Id::of::<Connection>(), None).unwrap().unwrap();
    let second = container.get_as::<Connection>(Id::of::<Connection>(), None).unwrap().unwrap();
    assert_eq!(first.serial, 0);
    assert_eq!(second.serial, 1);
}

#[test]
fn test_factory_class_transient() {
    let container = Container::new();
    container.bind_factory(
        FactorySource::<Connection>::of::<Dialer>(),
        BindOptions::transient().factory_transient(),
    );

    let first = container.get_as::<Connection>(Id::of::<Connection>(), None).unwrap().unwrap();
    let second = container.get_as::<Connection>(Id::of::<Connection>(), None).unwrap().unwrap();
    assert_eq!(first.serial, 0);
    assert_eq!(second.serial, 0);
}

#[test]
fn test_factory_product_singleton() {
    let container = Container::new();
    container.bind_factory(FactorySource::<Connection>::of::<Dialer>(), BindOptions::singleton());

    let first = container.get_as::<Connection>(Id::of::<Connection>(), None).unwrap().unwrap();
    let second = container.get_as::<Connection>(Id::of::<Connection>(), None).unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_unbound_names_soft_fail() {
    let container = Container::new();
    assert!(container.get("nothing", None).unwrap().is_none());
    assert!(container.get(Token::new("nothing"), None).unwrap().is_none());
    assert!(container.get(Id::of::<Config>(), None).unwrap().is_none());
}

#[test]
fn test_tokens_are_distinct() {
    let container = Container::new();
    let first = Token::new("db");
    let second = Token::new("db");
    container.set(first, 1u8);

    assert!(container.get(first, None).unwrap().is_some());
    assert!(container.get(second, None).unwrap().is_none());
}

#[test]
fn test_type_mismatch() {
    let container = Container::new();
    container.set("n", 1u8);
    let err = container.get_as::<String>("n", None).unwrap_err();
    assert!(matches!(err, DiError::TypeMismatch(_)));
}

#[test]
fn test_failing_closure_propagates() {
    let container = Container::new();
    container.bind(
        "broken",
        |_| -> DiResult<Config> { Err(DiError::Factory("offline".into())) },
        BindOptions::default(),
    );
    assert_eq!(
        container.get("broken", None).unwrap_err(),
        DiError::Factory("offline".into())
    );
}

#[test]
fn test_containers_are_independent() {
    let a = Container::new();
    let b = Container::new();
    a.set("x", 1u8);
    assert!(b.get("x", None).unwrap().is_none());

    a.resolve::<Widget>(None).unwrap();
    assert!(a.is_auto_bound::<Widget>());
    assert!(!b.is_auto_bound::<Widget>());
}

#[test]
fn test_bind_shared_value() {
    let shared = Arc::new(Config { port: 7000 });
    let container = Container::new();
    container.bind_value_arc("shared", shared.clone(), BindOptions::transient());

    let resolved = container.get_as::<Config>("shared", None).unwrap().unwrap();
    assert!(Arc::ptr_eq(&resolved, &shared));
}
