//! Error types for the dependency injection container.

use std::fmt;

/// Dependency injection errors
///
/// Every failure is fatal to the operation that raised it and is returned to
/// the caller. Resolving a name or token that has no binding is *not* an
/// error: [`Container::get`](crate::Container::get) returns `Ok(None)` and
/// callers opt into a hard failure by marking a dependency required.
///
/// # Examples
///
/// ```rust
/// use contextual_di::DiError;
///
/// let collision = DiError::ScopeCollision("request".to_string());
/// assert_eq!(collision.to_string(), "Scope name collides with an ancestor: request");
///
/// let circular = DiError::Circular(vec!["a".into(), "b".into(), "a".into()]);
/// assert_eq!(circular.to_string(), "Circular dependency: a -> b -> a");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// A declaration is invalid (e.g. an inferred dependency of a primitive type)
    Declaration(String),
    /// A required dependency could not be resolved
    Required {
        /// Type whose dependency failed
        target: &'static str,
        /// Parameter index or property name
        slot: String,
    },
    /// A scope name is already carried by an ancestor context
    ScopeCollision(String),
    /// Nothing is bound for an identifier that had to resolve
    NotFound(String),
    /// A class registration targets a type without a declared constructor
    NotConstructible(&'static str),
    /// Type downcast failed
    TypeMismatch(&'static str),
    /// Circular resolution detected (includes path)
    Circular(Vec<String>),
    /// Maximum resolution depth exceeded
    DepthExceeded(usize),
    /// A registration was asked to do something its variant never does
    InvalidRegistration(&'static str),
    /// A user supplied factory or constructor failed
    Factory(String),
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::Declaration(msg) => write!(f, "Invalid declaration: {}", msg),
            DiError::Required { target, slot } => {
                write!(f, "Cannot resolve required dependency {} of {}", slot, target)
            }
            DiError::ScopeCollision(name) => {
                write!(f, "Scope name collides with an ancestor: {}", name)
            }
            DiError::NotFound(name) => write!(f, "Service not found: {}", name),
            DiError::NotConstructible(name) => write!(f, "No constructor declared for: {}", name),
            DiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            DiError::Circular(path) => {
                write!(f, "Circular dependency: {}", path.join(" -> "))
            }
            DiError::DepthExceeded(depth) => write!(f, "Max depth {} exceeded", depth),
            DiError::InvalidRegistration(msg) => write!(f, "Invalid registration: {}", msg),
            DiError::Factory(msg) => write!(f, "Factory failed: {}", msg),
        }
    }
}

impl std::error::Error for DiError {}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_names_slot_and_target() {
        let err = DiError::Required {
            target: "app::Service",
            slot: "property `db`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot resolve required dependency property `db` of app::Service"
        );
    }

    #[test]
    fn empty_circular_path_keeps_prefix() {
        assert_eq!(DiError::Circular(vec![]).to_string(), "Circular dependency: ");
    }
}
