//! Field paths for addressing locations inside Things and index documents.
//!
//! A [`FieldPath`] is an ordered sequence of object keys. The same type is used
//! for JSON-pointer style paths coming from Policies (`/features/temp`) and for
//! the dotted field paths the document store understands (`t.features.temp`).
//!
//! Array elements are never addressed by index: the visitors thread the path of
//! the enclosing array down to its elements.
//!
//! # Usage
//!
//! ```rust
//! use thingsearch::path::FieldPath;
//! use std::str::FromStr;
//!
//! // Parse a JSON pointer (empty segments are normalized away)
//! let path = FieldPath::from_str("/features//temp/")?;
//! assert_eq!(path.to_pointer(), "/features/temp");
//!
//! // Build incrementally
//! let path = FieldPath::root().push("t").push("attributes");
//! assert_eq!(path.to_dotted(), "t.attributes");
//! assert_eq!(path.byte_len(), 11);
//! # Ok::<(), std::convert::Infallible>(())
//! ```

use std::{fmt, str::FromStr};

/// Splits a JSON-pointer string into its non-empty segments.
///
/// - `""` and `"/"` → no segments (the root)
/// - Leading, trailing and repeated slashes are dropped
///
/// ```rust
/// # use thingsearch::path::normalize_pointer;
/// assert!(normalize_pointer("/").is_empty());
/// assert_eq!(normalize_pointer("/a//b/"), vec!["a", "b"]);
/// ```
pub fn normalize_pointer(input: &str) -> Vec<String> {
    input
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// An owned path made of object keys.
///
/// The root path has no segments. Paths order lexicographically by segment,
/// which keeps every map keyed by `FieldPath` deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Creates the root path.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Appends a leaf key and returns the extended path.
    pub fn push(mut self, key: impl Into<String>) -> Self {
        self.segments.push(key.into());
        self
    }

    /// Returns a new path with `key` appended, leaving `self` untouched.
    pub fn child(&self, key: impl Into<String>) -> Self {
        self.clone().push(key)
    }

    /// Joins this path with another path.
    pub fn join(mut self, other: &FieldPath) -> Self {
        self.segments.extend(other.segments.iter().cloned());
        self
    }

    /// Returns an iterator over the path segments.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// Returns the number of segments in the path.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of the UTF-8 byte lengths of all segments.
    ///
    /// This is the cost proxy used by the diff engine for addressing a field.
    pub fn byte_len(&self) -> usize {
        self.segments.iter().map(String::len).sum()
    }

    /// Returns the segment at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// Extracts the segments in `start..end` as a new path.
    ///
    /// Out-of-range bounds are clamped to the path length.
    pub fn sub_path(&self, start: usize, end: usize) -> FieldPath {
        let end = end.min(self.segments.len());
        let start = start.min(end);
        FieldPath {
            segments: self.segments[start..end].to_vec(),
        }
    }

    /// Returns the parent path, or `None` if this is the root.
    pub fn parent(&self) -> Option<FieldPath> {
        if self.segments.is_empty() {
            None
        } else {
            Some(self.sub_path(0, self.segments.len() - 1))
        }
    }

    /// Returns the last segment, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Returns `true` if `prefix` is a (non-strict) prefix of this path.
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Returns every prefix of this path from the root up to and including itself.
    pub fn ancestors_and_self(&self) -> impl Iterator<Item = FieldPath> + '_ {
        (0..=self.segments.len()).map(move |end| self.sub_path(0, end))
    }

    /// Renders the path as a JSON pointer (`/a/b`); the root renders as `/`.
    pub fn to_pointer(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::with_capacity(self.byte_len() + self.segments.len());
        for segment in &self.segments {
            out.push('/');
            out.push_str(segment);
        }
        out
    }

    /// Renders the path in the store's dotted field notation (`a.b`).
    pub fn to_dotted(&self) -> String {
        self.segments.join(".")
    }

    /// Renders the path as a store field reference (`$a.b`).
    pub fn to_field_ref(&self) -> String {
        format!("${}", self.to_dotted())
    }
}

impl FromStr for FieldPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            segments: normalize_pointer(s),
        })
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        Self {
            segments: normalize_pointer(s),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_pointer())
    }
}

/// Constructs a [`FieldPath`] from individual segments.
///
/// - `field_path!()` - the root path
/// - `field_path!("t", "attributes")` - segments given one by one
/// - `field_path!(base, "x")` - runtime values mixed with literals
///
/// Segments are taken verbatim; use [`FieldPath::from_str`] to parse a JSON pointer.
///
/// ```rust
/// # use thingsearch::field_path;
/// let path = field_path!("features", "temp");
/// assert_eq!(path.to_pointer(), "/features/temp");
/// assert!(field_path!().is_empty());
/// ```
#[macro_export]
macro_rules! field_path {
    () => {
        $crate::path::FieldPath::root()
    };

    ($($segment:expr),+ $(,)?) => {{
        let path = $crate::path::FieldPath::root();
        $(
            let path = path.push($segment.to_string());
        )+
        path
    }};
}
