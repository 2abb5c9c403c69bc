//! Time related utils.

use chrono::NaiveDateTime;
use chrono::Utc;

use crate::Error;
use crate::Result;

/// DateTime in UTC, the signing instant consumed by the signer.
///
/// SigV4 works at second precision; fractional seconds are discarded
/// when the instant is formatted.
pub type DateTime = chrono::DateTime<Utc>;

/// Return the current time in UTC.
///
/// The signer itself never calls this; the signing instant is always
/// supplied by the caller so signing stays deterministic.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format a datetime as the SigV4 date stamp: "20150830".
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format a datetime in ISO 8601 basic format: "20150830T123600Z".
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Parse an ISO 8601 basic timestamp like "20150830T123600Z".
pub fn parse_iso8601(s: &str) -> Result<DateTime> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%SZ")
        .map_err(|e| Error::invalid_argument(format!("invalid timestamp {s:?}")).with_source(e))?;
    Ok(naive.and_utc())
}
