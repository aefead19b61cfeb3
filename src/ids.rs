//! Request identifiers.
//!
//! Every request carries a ULID: either the one a caller sent in
//! `x-request-id` or a fresh one minted when the context is created.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Header carrying the request identifier in and out.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// ULID-backed request identifier, serialized as its 26-character string.
///
/// ULIDs sort by creation time, so log lines for consecutive requests stay in
/// order when sorted by id.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(pub Ulid);

/// An `x-request-id` value that is not a ULID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRequestId {
    pub value: String,
    pub reason: ulid::DecodeError,
}

impl fmt::Display for InvalidRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid request id '{}': {}", self.value, self.reason)
    }
}

impl std::error::Error for InvalidRequestId {}

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a raw header value, ignoring surrounding whitespace.
    pub fn from_header(value: &str) -> Result<Self, InvalidRequestId> {
        Ulid::from_string(value.trim())
            .map(Self)
            .map_err(|reason| InvalidRequestId {
                value: value.to_string(),
                reason,
            })
    }

    /// Use the header value when it is a valid ULID, otherwise mint a new id.
    #[must_use]
    pub fn from_header_or_new(value: Option<&str>) -> Self {
        value
            .and_then(|v| Self::from_header(v).ok())
            .unwrap_or_default()
    }

    /// Milliseconds since the Unix epoch encoded in the id.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = InvalidRequestId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_header(s)
    }
}

impl TryFrom<String> for RequestId {
    type Error = InvalidRequestId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_header(&value)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &str = "01ARZ3NDEKTSV4RRFFQ69G5FAV";

    #[test]
    fn test_header_value_is_trimmed_and_adopted() {
        let id = RequestId::from_header(&format!("  {KNOWN} ")).unwrap();
        assert_eq!(id.to_string(), KNOWN);
        assert_eq!(RequestId::from_header_or_new(Some(KNOWN)), id);
    }

    #[test]
    fn test_malformed_header_reports_value() {
        let err = RequestId::from_header("not-a-ulid").unwrap_err();
        assert_eq!(err.value, "not-a-ulid");
        assert!(err.to_string().starts_with("invalid request id 'not-a-ulid'"));

        let minted = RequestId::from_header_or_new(Some("not-a-ulid"));
        assert_ne!(minted, RequestId::from_header_or_new(None));
    }

    #[test]
    fn test_ids_order_by_creation_time() {
        let first = RequestId::from_header(KNOWN).unwrap();
        let later = RequestId::new();
        assert!(first < later);
        assert!(first.timestamp_ms() < later.timestamp_ms());
    }

    #[test]
    fn test_serialized_as_string() {
        let id: RequestId = serde_json::from_str(&format!("\"{KNOWN}\"")).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{KNOWN}\""));
        assert!(serde_json::from_str::<RequestId>("\"nope\"").is_err());
    }
}
