//! Captured path variables.
//!
//! Captures are kept in declaration order so that handlers can read them
//! either by name or by position.

use smallvec::SmallVec;

/// Maximum number of captures stored inline.
const INLINE_PARAMS: usize = 4;

/// Path variables captured by a route match, in declaration order.
///
/// # Example
///
/// ```rust
/// use waypoint_core::Params;
///
/// let mut params = Params::new();
/// params.push("year", "2024");
/// params.push("slug", "hello");
///
/// assert_eq!(params.get("slug"), Some("hello"));
/// assert_eq!(params.at(0), Some("2024"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates a new empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a capture.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value captured under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value at declaration position `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&str> {
        self.inner.get(index).map(|(_, v)| v.as_str())
    }

    /// Returns true if there are no captures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Drops captures beyond `len`. Used when the matcher backtracks.
    pub fn truncate(&mut self, len: usize) {
        self.inner.truncate(len);
    }

    /// Iterates over `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the captured values in declaration order.
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        self.inner.iter().map(|(_, v)| v.clone()).collect()
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}
