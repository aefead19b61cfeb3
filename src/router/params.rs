//! Bound path parameters.
//!
//! Parameter names come from the route tree (known at startup) and are shared
//! as `Arc<str>`; values are per-request data cut from the URL.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Conventional identifier keys tried by [`Params::id`], in order.
pub const ID_KEYS: [&str; 2] = ["id", "_id"];

/// A required parameter was not bound for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// None of the listed names is bound.
    NotFound { names: Vec<String> },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::NotFound { names } if names.len() == 1 => {
                write!(f, "path parameter '{}' not found", names[0])
            }
            ParamError::NotFound { names } => {
                write!(f, "none of the path parameters [{}] found", names.join(", "))
            }
        }
    }
}

impl std::error::Error for ParamError {}

/// Path parameters bound for one request, in path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: ParamVec,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: Arc<str>, value: String) {
        self.inner.push((name, value));
    }

    /// Get a path parameter by name.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a path parameter, falling back to `default` when it is not bound.
    #[inline]
    #[must_use]
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Get a path parameter or the empty string.
    #[inline]
    #[must_use]
    pub fn value(&self, name: &str) -> &str {
        self.get_or(name, "")
    }

    /// Get a path parameter that the handler cannot do without.
    pub fn require(&self, name: &str) -> Result<&str, ParamError> {
        self.get(name).ok_or_else(|| ParamError::NotFound {
            names: vec![name.to_string()],
        })
    }

    /// Resolve the request's identifier, trying `id` then `_id`.
    ///
    /// # Errors
    ///
    /// [`ParamError::NotFound`] when neither key is bound.
    pub fn id(&self) -> Result<&str, ParamError> {
        ID_KEYS
            .iter()
            .find_map(|key| self.get(key))
            .ok_or_else(|| ParamError::NotFound {
                names: ID_KEYS.iter().map(|k| (*k).to_string()).collect(),
            })
    }

    /// Iterate over `(name, value)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Convert to a HashMap.
    /// Note: This allocates - use get() in hot paths instead
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.inner
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[(Arc<str>, String)] {
        &self.inner
    }
}

impl FromIterator<(Arc<str>, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (Arc<str>, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Params {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(k, v)| (Arc::from(k), v.to_string()))
            .collect()
    }
}
