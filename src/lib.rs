//! # contextual-di
//!
//! Dependency injection with bindings scoped to execution contexts.
//!
//! ## Features
//!
//! - **Variant bindings**: values, closures, factories, declared classes and aliases
//! - **Lifetimes**: singleton or transient per binding
//! - **Context scopes**: bindings live in the frame of the execution context
//!   that made them and are visible to every flow forked from it
//! - **Named scopes and lazy binding**: bind into a scope before it exists;
//!   the binding is applied when the scope is named
//! - **Declarative injection**: constructor parameters and properties
//!   described once per type, with required/optional and scoped dependencies
//! - **Auto-binding**: a type's bind actions run the first time a container
//!   looks the type up
//! - **Cycle detection**: alias and dependency cycles fail with the full path
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use contextual_di::{BindOptions, Container, DiResult, Resolver};
//! use contextual_di::metadata::{Declaration, Inject, Injectable};
//!
//! struct Database {
//!     url: Arc<String>,
//! }
//!
//! impl Injectable for Database {
//!     fn declare(d: &mut Declaration<Self>) -> DiResult<()> {
//!         d.constructor(|args| Ok(Database { url: args.require::<String>(0)? }))
//!             .param(0, Inject::id("database.url"))
//!             .singleton();
//!         Ok(())
//!     }
//! }
//!
//! let container = Container::new();
//! container.set("database.url", "postgres://localhost".to_string());
//!
//! let db = container.resolve::<Database>(None).unwrap();
//! assert_eq!(db.url.as_str(), "postgres://localhost");
//!
//! // Singleton: the same instance every time
//! assert!(Arc::ptr_eq(&db, &container.resolve::<Database>(None).unwrap()));
//! ```
//!
//! ## Scopes
//!
//! Every binding lands in the frame of an [`ExecutionContext`]. Forking a
//! context creates a child flow that sees its parent's bindings; naming a
//! context with [`Container::alias_scope`] lets bindings target it from
//! anywhere below it.
//!
//! ```rust
//! use contextual_di::{BindOptions, Container, ExecutionContext, Resolver};
//!
//! let container = Container::new();
//! let request = ExecutionContext::current().fork();
//!
//! request.run(|| {
//!     // Queued: no context is named "request" yet
//!     container.bind_value("request.id", 7u64, BindOptions::default().in_scope("request"));
//!     assert!(container.get("request.id", None).unwrap().is_none());
//!
//!     container.alias_scope("request").unwrap();
//!     let id = container.get_as::<u64>("request.id", None).unwrap().unwrap();
//!     assert_eq!(*id, 7);
//! });
//! ```
//!
//! ## Async
//!
//! The active context follows the calling thread. Wrap futures with
//! [`ExecutionContext::attach`] (or use `execution::spawn` with the `async`
//! feature) so the context survives `.await` points and task hops.
//!
//! ## Feature Flags
//!
//! - `async`: `execution::spawn` on the tokio runtime
//! - `config`: serde support for [`ContainerConfig`]
//! - `diagnostics`: `Container::to_debug_string`
//! - `performance`: ahash for identifier-keyed maps

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::Lazy;

// Module declarations
pub mod collection;
pub mod config;
pub mod error;
pub mod execution;
pub mod key;
pub mod lifetime;
pub mod metadata;
pub mod observer;
pub mod provider;
pub mod traits;

mod internal;
mod registration;

// Re-exports
pub use collection::{Factory, FactorySource};
pub use config::{ConfigSource, ConfigValue, ContainerConfig, EnvironmentConfigSource};
pub use error::{DiError, DiResult};
pub use execution::{ContextGuard, ContextMap, Contextual, ExecutionContext, MapRef, ROOT_SCOPE};
pub use key::{Id, Token, TypeKey};
pub use lifetime::{BindOptions, FactoryLifetime, Lifetime};
pub use metadata::{Args, ClassRef, Declaration, Inject, Injectable};
pub use observer::{DiObserver, LoggingObserver, MetricsObserver};
pub use provider::{Container, Placement};
pub use traits::{Resolver, ResolverCore};

/// Type-erased shared instance as stored by the container.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

static DEFAULT_CONTAINER: Lazy<Container> = Lazy::new(Container::from_env);

/// The process-wide default container, created on first use.
///
/// It is configured from `CONTEXTUAL_DI_*` environment variables read at that
/// moment.
///
/// ```rust
/// use contextual_di::{container, Resolver};
///
/// container().set("app.name", "demo".to_string());
/// let name = container().get_as::<String>("app.name", None).unwrap().unwrap();
/// assert_eq!(name.as_str(), "demo");
/// ```
pub fn container() -> &'static Container {
    &DEFAULT_CONTAINER
}
