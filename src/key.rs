//! Structured query keys.
//!
//! A key is an ordered sequence of primitive parts, e.g. `["frag", "fans", 42]`.
//! Two keys name the same entry iff they have the same length and every part
//! is equal in order. Invalidation works on prefixes: `["frag"]` covers
//! `["frag", "fans", 42]` and `["frag", 7]`.

use std::fmt;

/// One primitive element of a [`QueryKey`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Str(s) => write!(f, "{:?}", s),
            KeyPart::Int(i) => write!(f, "{}", i),
            KeyPart::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::Str(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        KeyPart::Str(s)
    }
}

impl From<bool> for KeyPart {
    fn from(b: bool) -> Self {
        KeyPart::Bool(b)
    }
}

macro_rules! key_part_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for KeyPart {
                fn from(i: $t) -> Self {
                    KeyPart::Int(i as i64)
                }
            }
        )*
    };
}

key_part_from_int!(i32, i64, u32, u64, usize);

/// Structured identifier of one cached resource instance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    /// Start a key from its root segment.
    pub fn root(part: impl Into<KeyPart>) -> Self {
        QueryKey(vec![part.into()])
    }

    /// Build a key from already-converted parts.
    pub fn from_parts(parts: Vec<KeyPart>) -> Self {
        QueryKey(parts)
    }

    /// Append a segment.
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Root segment as a string, used for per-resource policies.
    pub fn resource(&self) -> Option<&str> {
        match self.0.first() {
            Some(KeyPart::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Partial key match: true when `prefix` is a leading subsequence of `self`.
    ///
    /// The empty key is a prefix of every key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        prefix.0.len() <= self.0.len() && self.0.iter().zip(&prefix.0).all(|(a, b)| a == b)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", part)?;
        }
        write!(f, "]")
    }
}

/// Build a [`QueryKey`] from a list of primitives.
///
/// ```
/// use barcode_client::query_key;
///
/// let key = query_key!["frag", "fans", 42];
/// assert_eq!(key.to_string(), r#"["frag","fans",42]"#);
/// ```
#[macro_export]
macro_rules! query_key {
    () => {
        $crate::key::QueryKey::default()
    };
    ($($part:expr),+ $(,)?) => {
        $crate::key::QueryKey::from_parts(vec![$($crate::key::KeyPart::from($part)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = QueryKey::root("frag").with("fans").with(42);
        let b = query_key!["frag", "fans", 42u64];
        assert_eq!(a, b);

        assert_ne!(query_key!["frag", "fans", 42], query_key!["frag", "fans", "42"]);
        assert_ne!(query_key!["frag", "fans"], query_key!["frag", "fans", 42]);
    }

    #[test]
    fn test_prefix_matching() {
        let fans = query_key!["frag", "fans", 42];
        assert!(fans.starts_with(&query_key!["frag"]));
        assert!(fans.starts_with(&query_key!["frag", "fans"]));
        assert!(fans.starts_with(&fans));
        assert!(fans.starts_with(&QueryKey::default()));

        assert!(!fans.starts_with(&query_key!["frag", "kids"]));
        assert!(!fans.starts_with(&query_key!["frag", "fans", 42, "extra"]));
        assert!(!query_key!["collection"].starts_with(&query_key!["frag"]));
    }

    #[test]
    fn test_display() {
        assert_eq!(query_key!["collection"].to_string(), r#"["collection"]"#);
        assert_eq!(query_key![].to_string(), "[]");
    }

    #[test]
    fn test_resource_segment() {
        assert_eq!(query_key!["tank", 3].resource(), Some("tank"));
        assert_eq!(query_key![7].resource(), None);
    }
}
