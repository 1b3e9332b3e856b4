//! Acquisition-timestamp extraction from image pathnames.
//!
//! Processed scenes live under a `YYYYMMDD_HHMMSS` acquisition folder;
//! that token is the image's observation time and feeds the `TIMESTAMP`
//! template parameter.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

static DATETIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{8}_[0-9]{6}").expect("datetime regex"));

/// SQL-friendly timestamp formatting.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse the acquisition datetime token out of a pathname.
pub fn datetime(pathname: &str) -> Option<NaiveDateTime> {
    let token = DATETIME_RE.find(pathname)?;
    NaiveDateTime::parse_from_str(token.as_str(), "%Y%m%d_%H%M%S").ok()
}

/// The acquisition time formatted for the `TIMESTAMP` parameter.
pub fn timestamp(pathname: &str) -> Option<String> {
    datetime(pathname).map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
}
