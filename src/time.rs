//! Decoding of client supplied timestamps.

use chrono::{DateTime, Utc};

/// Reports carry timestamps as RFC 3339 strings. Anything absent or
/// undecodable falls back to the time of processing.
pub fn decode_timestamp(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|x| DateTime::parse_from_rfc3339(x).ok())
        .map(|x| x.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}
