//! Deterministic cache keys for query operations.
//!
//! A key is the operation name followed by the call's significant
//! arguments in declaration order. Significance is an explicit
//! predicate: `None`, zero numbers, empty strings, and all-default
//! filters are omitted, so a default-filter call and a no-filter call
//! collapse to the same key and share one cache entry.

use fairmarket_core::types::filter::{PaginationFilter, ProductFilters};
use fairmarket_core::types::id::{CategoryId, ProductId};

/// One element of a query key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySegment {
    /// Operation name or string argument.
    Text(String),
    /// Numeric argument.
    Number(i64),
    /// Structured argument, canonicalized as JSON.
    Canonical(String),
}

/// An ordered, structurally comparable cache key.
///
/// Two calls with the same operation name and the same significant
/// argument values produce equal keys (value equality, not identity).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    /// Key containing only the operation name.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        Self(vec![KeySegment::Text(operation.to_string())])
    }

    /// Append an argument, skipping it when insignificant.
    #[must_use]
    pub fn with<A: KeyArg + ?Sized>(mut self, arg: &A) -> Self {
        if let Some(segment) = arg.segment() {
            self.0.push(segment);
        }
        self
    }

    /// The operation name (first segment).
    #[must_use]
    pub fn operation(&self) -> Option<&str> {
        match self.0.first() {
            Some(KeySegment::Text(op)) => Some(op),
            _ => None,
        }
    }

    /// True when `self` begins with every segment of `prefix`.
    ///
    /// Invalidation is prefix-based: the bare operation key matches
    /// every cached argument combination of that operation.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.len() >= prefix.0.len()
            && prefix.0.iter().zip(self.0.iter()).all(|(p, s)| p == s)
    }

    /// Number of segments, operation name included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            match segment {
                KeySegment::Text(s) | KeySegment::Canonical(s) => f.write_str(s)?,
                KeySegment::Number(n) => write!(f, "{n}")?,
            }
        }
        Ok(())
    }
}

/// An argument that can contribute a key segment.
pub trait KeyArg {
    /// Whether the value is significant enough to appear in the key.
    fn is_significant(&self) -> bool;

    /// The segment for a significant value.
    fn to_segment(&self) -> KeySegment;

    /// The segment, or `None` when the value is insignificant.
    fn segment(&self) -> Option<KeySegment> {
        self.is_significant().then(|| self.to_segment())
    }
}

impl<A: KeyArg + ?Sized> KeyArg for &A {
    fn is_significant(&self) -> bool {
        (**self).is_significant()
    }

    fn to_segment(&self) -> KeySegment {
        (**self).to_segment()
    }
}

impl<A: KeyArg> KeyArg for Option<A> {
    fn is_significant(&self) -> bool {
        self.as_ref().is_some_and(KeyArg::is_significant)
    }

    fn to_segment(&self) -> KeySegment {
        self.as_ref().map_or(KeySegment::Number(0), KeyArg::to_segment)
    }
}

impl KeyArg for str {
    fn is_significant(&self) -> bool {
        !self.is_empty()
    }

    fn to_segment(&self) -> KeySegment {
        KeySegment::Text(self.to_string())
    }
}

impl KeyArg for String {
    fn is_significant(&self) -> bool {
        !self.is_empty()
    }

    fn to_segment(&self) -> KeySegment {
        KeySegment::Text(self.clone())
    }
}

impl KeyArg for i64 {
    fn is_significant(&self) -> bool {
        *self != 0
    }

    fn to_segment(&self) -> KeySegment {
        KeySegment::Number(*self)
    }
}

impl KeyArg for u32 {
    fn is_significant(&self) -> bool {
        *self != 0
    }

    fn to_segment(&self) -> KeySegment {
        KeySegment::Number(i64::from(*self))
    }
}

impl KeyArg for ProductId {
    fn is_significant(&self) -> bool {
        self.as_i64() != 0
    }

    fn to_segment(&self) -> KeySegment {
        KeySegment::Number(self.as_i64())
    }
}

impl KeyArg for CategoryId {
    fn is_significant(&self) -> bool {
        self.as_i64() != 0
    }

    fn to_segment(&self) -> KeySegment {
        KeySegment::Number(self.as_i64())
    }
}

impl KeyArg for ProductFilters {
    fn is_significant(&self) -> bool {
        !self.is_empty()
    }

    fn to_segment(&self) -> KeySegment {
        KeySegment::Canonical(canonical_json(self))
    }
}

impl KeyArg for PaginationFilter {
    fn is_significant(&self) -> bool {
        !self.is_empty()
    }

    fn to_segment(&self) -> KeySegment {
        KeySegment::Canonical(canonical_json(self))
    }
}

/// Canonical JSON for structured key segments. Struct fields serialize
/// in declaration order, so equal values give equal strings.
fn canonical_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
