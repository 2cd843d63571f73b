use std::sync::Arc;

use contextual_di::metadata::{Declaration, Inject, Injectable};
use contextual_di::{BindOptions, Container, ContainerConfig, DiError, DiResult, Resolver};

struct Left {
    _right: Option<Arc<Right>>,
}

struct Right {
    _left: Option<Arc<Left>>,
}

impl Injectable for Left {
    fn declare(d: &mut Declaration<Self>) -> DiResult<()> {
        d.constructor(|_| Ok(Left { _right: None }))
            .property("right", |l| &mut l._right, Inject::injectable::<Right>()?);
        Ok(())
    }
}

impl Injectable for Right {
    fn declare(d: &mut Declaration<Self>) -> DiResult<()> {
        d.constructor(|_| Ok(Right { _left: None }))
            .property("left", |r| &mut r._left, Inject::injectable::<Left>()?);
        Ok(())
    }
}

#[test]
fn test_property_cycle() {
    let container = Container::new();
    let err = container.resolve::<Left>(None).err().unwrap();

    let left = std::any::type_name::<Left>().to_string();
    let right = std::any::type_name::<Right>().to_string();
    assert_eq!(err, DiError::Circular(vec![left.clone(), right, left]));
}

struct Chicken;
struct Egg;

impl Injectable for Chicken {
    fn declare(d: &mut Declaration<Self>) -> DiResult<()> {
        d.constructor(|args| {
            args.require::<Egg>(0)?;
            Ok(Chicken)
        })
        .param(0, Inject::injectable::<Egg>()?);
        Ok(())
    }
}

impl Injectable for Egg {
    fn declare(d: &mut Declaration<Self>) -> DiResult<()> {
        d.constructor(|args| {
            args.require::<Chicken>(0)?;
            Ok(Egg)
        })
        .param(0, Inject::injectable::<Chicken>()?);
        Ok(())
    }
}

#[test]
fn test_constructor_cycle() {
    let container = Container::new();
    match container.resolve::<Egg>(None) {
        Err(DiError::Circular(path)) => {
            assert_eq!(path.len(), 3);
            assert_eq!(path.first(), path.last());
            assert!(path[0].ends_with("Egg"));
        }
        other => panic!("expected a cycle, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_self_alias() {
    let container = Container::new();
    container.bind_alias("me", "me", BindOptions::default());
    assert_eq!(
        container.get("me", None).unwrap_err(),
        DiError::Circular(vec!["me".to_string(), "me".to_string()])
    );
}

#[derive(Default)]
struct Base;

impl Injectable for Base {
    fn declare(d: &mut Declaration<Self>) -> DiResult<()> {
        d.default_constructor();
        Ok(())
    }
}

struct Diamond {
    first: Option<Arc<Base>>,
    second: Option<Arc<Base>>,
}

impl Injectable for Diamond {
    fn declare(d: &mut Declaration<Self>) -> DiResult<()> {
        d.constructor(|_| Ok(Diamond { first: None, second: None }))
            .property("first", |d| &mut d.first, Inject::injectable::<Base>()?)
            .property("second", |d| &mut d.second, Inject::injectable::<Base>()?);
        Ok(())
    }
}

#[test]
fn test_shared_dependency_is_not_a_cycle() {
    let container = Container::new();
    let diamond = container.resolve::<Diamond>(None).unwrap();
    assert!(diamond.first.is_some());
    assert!(diamond.second.is_some());
}

#[test]
fn test_same_id_in_other_scope_is_not_a_cycle() {
    use contextual_di::ExecutionContext;

    let container = Container::new();
    ExecutionContext::root().fork().run(|| {
        container.alias_scope("outer").unwrap();
        container.set("conn", 1u8);

        ExecutionContext::current().fork().run(|| {
            // Inner "conn" forwards to the outer binding of the same name
            container.bind(
                "conn",
                |r| {
                    let outer = r.get_as::<u8>("conn", Some("outer"))?.ok_or(DiError::NotFound("conn".into()))?;
                    Ok(*outer + 1)
                },
                BindOptions::default(),
            );
            assert_eq!(*container.get_as::<u8>("conn", None).unwrap().unwrap(), 2);
        });
    });
}

#[test]
fn test_long_chain_within_limit() {
    let container = Container::with_config(ContainerConfig {
        max_resolution_depth: 16,
        ..ContainerConfig::default()
    });
    let names: Vec<String> = (0..10).map(|i| format!("link{}", i)).collect();
    for pair in names.windows(2) {
        container.bind_alias(pair[0].clone(), pair[1].clone(), BindOptions::default());
    }
    container.set(names[9].clone(), "end".to_string());

    let end = container.get_as::<String>(names[0].clone(), None).unwrap().unwrap();
    assert_eq!(end.as_str(), "end");

    let shallow = Container::with_config(ContainerConfig {
        max_resolution_depth: 4,
        ..ContainerConfig::default()
    });
    for pair in names.windows(2) {
        shallow.bind_alias(pair[0].clone(), pair[1].clone(), BindOptions::default());
    }
    assert_eq!(
        shallow.get(names[0].clone(), None).unwrap_err(),
        DiError::DepthExceeded(4)
    );
}

#[test]
fn test_same_label_tokens_are_not_a_cycle() {
    use contextual_di::Token;

    let container = Container::new();
    let public = Token::new("db");
    let private = Token::new("db");
    container.bind_alias(public, private, BindOptions::default());
    container.set(private, 5u32);

    assert_eq!(*container.get_as::<u32>(public, None).unwrap().unwrap(), 5);
}

#[test]
fn test_name_matching_type_name_is_not_a_cycle() {
    use contextual_di::Id;

    let container = Container::new();
    container.bind_alias("u32", Id::of::<u32>(), BindOptions::default());
    container.set(Id::of::<u32>(), 9u32);

    assert_eq!(*container.get_as::<u32>("u32", None).unwrap().unwrap(), 9);
}

#[test]
fn test_nested_resolution_across_containers() {
    let outer = Arc::new(Container::new());
    outer.set("cfg", 3u32);

    let inner = Container::new();
    let source = outer.clone();
    inner.bind(
        "cfg",
        move |_| {
            let value = source.get_as::<u32>("cfg", None)?.ok_or(DiError::NotFound("cfg".into()))?;
            Ok(*value * 2)
        },
        BindOptions::default(),
    );

    assert_eq!(*inner.get_as::<u32>("cfg", None).unwrap().unwrap(), 6);
}

#[test]
fn test_depth_limit_is_per_container() {
    let outer = Arc::new(Container::with_config(ContainerConfig {
        max_resolution_depth: 2,
        ..ContainerConfig::default()
    }));
    outer.bind_alias("a", "b", BindOptions::default());
    outer.set("b", 1u8);

    let inner = Container::with_config(ContainerConfig {
        max_resolution_depth: 2,
        ..ContainerConfig::default()
    });
    let source = outer.clone();
    inner.bind_alias("x", "y", BindOptions::default());
    inner.bind(
        "y",
        move |_| Ok(*source.get_as::<u8>("a", None)?.ok_or(DiError::NotFound("a".into()))?),
        BindOptions::default(),
    );

    assert_eq!(*inner.get_as::<u8>("x", None).unwrap().unwrap(), 1);
}
