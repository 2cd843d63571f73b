//! Identifier types for bindings.

use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::DiResult;
use crate::metadata::{self, Injectable};

/// Identifier of a binding.
///
/// Identifiers are opaque lookup keys; uniqueness is per (scope, identifier).
///
/// # Key Types
///
/// - **Name**: a string, compared by value
/// - **Token**: a symbolic token, compared by identity
/// - **Type**: a Rust type, compared by `TypeId`
///
/// # Examples
///
/// ```rust
/// use contextual_di::{Id, Token};
///
/// struct Database;
///
/// let by_name = Id::from("database");
/// let by_type = Id::of::<Database>();
/// let by_token: Id = Token::new("database").into();
///
/// assert_eq!(by_name, Id::from("database".to_string()));
/// assert_ne!(by_token, Id::from(Token::new("database")));
/// assert_eq!(by_type, Id::of::<Database>());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Id {
    /// String identifier
    Name(Arc<str>),
    /// Symbolic token
    Token(Token),
    /// Type identifier
    Type(TypeKey),
}

impl Id {
    /// Identifier of a type. No metadata is declared on use.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Id::Type(TypeKey::of::<T>())
    }

    /// Identifier of an [`Injectable`] type; its metadata is declared on first use.
    pub fn injectable<T: ?Sized + Injectable>() -> Self {
        Id::Type(TypeKey::injectable::<T>())
    }

    /// Returns the type key for type identifiers.
    pub fn as_type(&self) -> Option<&TypeKey> {
        match self {
            Id::Type(key) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Name(name) => f.write_str(name),
            Id::Token(token) => write!(f, "{}", token),
            Id::Type(key) => f.write_str(key.name()),
        }
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Name(name) => write!(f, "Name({:?})", name),
            Id::Token(token) => write!(f, "{:?}", token),
            Id::Type(key) => write!(f, "Type({})", key.name()),
        }
    }
}

impl From<&'static str> for Id {
    fn from(name: &'static str) -> Self {
        Id::Name(Arc::from(name))
    }
}

impl From<String> for Id {
    fn from(name: String) -> Self {
        Id::Name(Arc::from(name))
    }
}

impl From<Token> for Id {
    fn from(token: Token) -> Self {
        Id::Token(token)
    }
}

impl From<TypeKey> for Id {
    fn from(key: TypeKey) -> Self {
        Id::Type(key)
    }
}

impl From<&Id> for Id {
    fn from(id: &Id) -> Self {
        id.clone()
    }
}

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Symbolic identifier, unique per call to [`Token::new`].
///
/// Two tokens with the same label are still different identifiers.
#[derive(Clone, Copy)]
pub struct Token {
    id: u64,
    label: &'static str,
}

impl Token {
    /// Creates a new unique token.
    pub fn new(label: &'static str) -> Self {
        Self {
            id: NEXT_TOKEN.fetch_add(1, Ordering::Relaxed),
            label,
        }
    }

    /// The label given at creation.
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Token {}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.label)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}#{})", self.label, self.id)
    }
}

type DeclareHook = fn() -> DiResult<()>;

/// Key of a type used as an identifier.
///
/// Equality and hashing only look at the `TypeId`; the name is kept for
/// diagnostics and the declare hook registers the type's metadata lazily.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
    declare: Option<DeclareHook>,
}

impl TypeKey {
    /// Key of any `'static` type.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            declare: None,
        }
    }

    /// Key of an [`Injectable`] type carrying its declare hook.
    pub fn injectable<T: ?Sized + Injectable>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            declare: Some(metadata::ensure_declared::<T>),
        }
    }

    /// The `TypeId` of the keyed type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// The type name, for diagnostics.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the declare hook, if any. Idempotent.
    pub fn declare(&self) -> DiResult<()> {
        match self.declare {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }
}

impl PartialEq for TypeKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeKey")
            .field("name", &self.name)
            .field("declared_lazily", &self.declare.is_some())
            .finish()
    }
}
