//! Path pattern tokenizer.
//!
//! Patterns are `/`-delimited. Every part is classified once at registration
//! time so the trie never re-parses strings on the request hot path:
//!
//! | Part      | Classification                         |
//! |-----------|----------------------------------------|
//! | `users`   | static, exact match                    |
//! | `:id`     | named parameter `id`                   |
//! | `{id}`    | named parameter `id` (same as `:id`)   |
//! | `*rest`   | catch-all, remainder bound to `rest`   |
//! | `*`       | catch-all, remainder not captured      |
//!
//! Empty parts (leading, trailing or doubled `/`) are dropped, for patterns
//! and request paths alike, so `/users/` and `/users` address the same node.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

/// Parameter names accepted after `:`, `*` or inside `{}`.
#[allow(clippy::expect_used)]
static PARAM_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("parameter name regex is valid")
});

/// Inline capacity for split paths before spilling to the heap.
pub const MAX_INLINE_SEGMENTS: usize = 16;

/// Path split into its non-empty `/`-separated parts.
pub type PathParts<'a> = SmallVec<[&'a str; MAX_INLINE_SEGMENTS]>;

/// Classification of one pattern part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text matched exactly.
    Static(&'a str),
    /// `:name` or `{name}`: matches any single part.
    Param(&'a str),
    /// `*name` or `*`: matches all remaining parts.
    CatchAll(Option<&'a str>),
}

impl<'a> Segment<'a> {
    /// Name bound by this segment, if any.
    #[must_use]
    pub fn param_name(&self) -> Option<&'a str> {
        match *self {
            Segment::Static(_) => None,
            Segment::Param(name) => Some(name),
            Segment::CatchAll(name) => name,
        }
    }

    /// True for every segment that does not match literally.
    #[must_use]
    pub fn is_parametric(&self) -> bool {
        !matches!(self, Segment::Static(_))
    }

    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        matches!(self, Segment::CatchAll(_))
    }
}

/// One part of a registered pattern: the raw text as written plus its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternPart<'a> {
    pub raw: &'a str,
    pub segment: Segment<'a>,
}

/// Registration-time pattern error.
///
/// Returned by [`parse_pattern`] and by every registration entry point. A
/// pattern that fails here would otherwise produce a trie branch that can
/// never match, so callers are expected to treat it as fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// Patterns are absolute and must begin with `/`.
    MissingLeadingSlash { pattern: String },
    /// A part contains braces that do not wrap the whole part (e.g. `{id`).
    MalformedSegment { pattern: String, segment: String },
    /// `:`, `{}` used without a name.
    EmptyParamName { pattern: String, segment: String },
    /// The name contains characters outside `[A-Za-z0-9_.-]` or starts with a digit.
    InvalidParamName { pattern: String, name: String },
    /// The same name is bound twice in one pattern.
    DuplicateParamName { pattern: String, name: String },
    /// A catch-all is followed by more parts, which could never be reached.
    CatchAllNotLast { pattern: String, segment: String },
    /// A different catch-all is already registered at the same position.
    ConflictingCatchAll {
        pattern: String,
        segment: String,
        existing: String,
    },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::MissingLeadingSlash { pattern } => {
                write!(f, "invalid route pattern '{pattern}': must start with '/'")
            }
            PatternError::MalformedSegment { pattern, segment } => write!(
                f,
                "invalid route pattern '{pattern}': malformed segment '{segment}' \
                 (braces must wrap the whole segment, e.g. '{{id}}')"
            ),
            PatternError::EmptyParamName { pattern, segment } => write!(
                f,
                "invalid route pattern '{pattern}': parameter segment '{segment}' has no name"
            ),
            PatternError::InvalidParamName { pattern, name } => write!(
                f,
                "invalid route pattern '{pattern}': parameter name '{name}' is not a valid identifier"
            ),
            PatternError::DuplicateParamName { pattern, name } => write!(
                f,
                "invalid route pattern '{pattern}': parameter '{name}' is bound more than once"
            ),
            PatternError::CatchAllNotLast { pattern, segment } => write!(
                f,
                "invalid route pattern '{pattern}': catch-all '{segment}' must be the last segment"
            ),
            PatternError::ConflictingCatchAll {
                pattern,
                segment,
                existing,
            } => write!(
                f,
                "invalid route pattern '{pattern}': catch-all '{segment}' conflicts with \
                 already registered '{existing}' at the same position"
            ),
        }
    }
}

impl std::error::Error for PatternError {}

/// Split a request path into its non-empty parts.
#[must_use]
pub fn split_path(path: &str) -> PathParts<'_> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Classify a single part. `pattern` is only used for error messages.
pub fn parse_segment<'a>(pattern: &str, part: &'a str) -> Result<Segment<'a>, PatternError> {
    if let Some(rest) = part.strip_prefix('{') {
        let Some(name) = rest.strip_suffix('}') else {
            return Err(PatternError::MalformedSegment {
                pattern: pattern.to_string(),
                segment: part.to_string(),
            });
        };
        return named(pattern, part, name).map(Segment::Param);
    }
    if part.contains('{') || part.contains('}') {
        return Err(PatternError::MalformedSegment {
            pattern: pattern.to_string(),
            segment: part.to_string(),
        });
    }
    if let Some(name) = part.strip_prefix(':') {
        return named(pattern, part, name).map(Segment::Param);
    }
    if let Some(name) = part.strip_prefix('*') {
        if name.is_empty() {
            return Ok(Segment::CatchAll(None));
        }
        return named(pattern, part, name).map(|n| Segment::CatchAll(Some(n)));
    }
    Ok(Segment::Static(part))
}

fn named<'a>(pattern: &str, part: &str, name: &'a str) -> Result<&'a str, PatternError> {
    if name.is_empty() {
        return Err(PatternError::EmptyParamName {
            pattern: pattern.to_string(),
            segment: part.to_string(),
        });
    }
    if !PARAM_NAME.is_match(name) {
        return Err(PatternError::InvalidParamName {
            pattern: pattern.to_string(),
            name: name.to_string(),
        });
    }
    Ok(name)
}

/// Tokenize and validate a full pattern.
pub fn parse_pattern(pattern: &str) -> Result<Vec<PatternPart<'_>>, PatternError> {
    if !pattern.starts_with('/') {
        return Err(PatternError::MissingLeadingSlash {
            pattern: pattern.to_string(),
        });
    }

    let raw_parts = split_path(pattern);
    let count = raw_parts.len();
    let mut parts = Vec::with_capacity(count);
    let mut seen: SmallVec<[&str; 8]> = SmallVec::new();

    for (idx, raw) in raw_parts.into_iter().enumerate() {
        let segment = parse_segment(pattern, raw)?;
        if segment.is_catch_all() && idx + 1 != count {
            return Err(PatternError::CatchAllNotLast {
                pattern: pattern.to_string(),
                segment: raw.to_string(),
            });
        }
        if let Some(name) = segment.param_name() {
            if seen.contains(&name) {
                return Err(PatternError::DuplicateParamName {
                    pattern: pattern.to_string(),
                    name: name.to_string(),
                });
            }
            seen.push(name);
        }
        parts.push(PatternPart { raw, segment });
    }

    Ok(parts)
}
