//! Internal implementation details.

pub(crate) mod circular;

pub(crate) use circular::ResolutionGuard;

/// Hash map used for id-keyed tables.
#[cfg(feature = "ahash")]
pub(crate) type HashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;

/// Hash map used for id-keyed tables.
#[cfg(not(feature = "ahash"))]
pub(crate) type HashMap<K, V> = std::collections::HashMap<K, V>;
