use std::fmt;

/// Stable identity of one independently animated text field.
///
/// Keys must be derived deterministically from domain identity so that a view
/// which is torn down and rebuilt finds the same timeline again. Two unrelated
/// fields sharing a key silently share their animation state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersistKey(String);

impl PersistKey {
    /// Wraps an opaque caller-chosen key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for one field of one message: `"{conversation}:{message}:{field}"`.
    pub fn for_field(conversation: &str, message: &str, field: &str) -> Self {
        Self(format!("{conversation}:{message}:{field}"))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersistKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PersistKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for PersistKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}
