//! Field-level checks shared by the request handlers.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::db::models::UnknownVariant;
use crate::error::{AppError, Result};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// The trimmed value, or `None` when absent or blank.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A supplied text field must not be blank; an absent one stays `None`.
pub fn non_blank(value: &Option<String>, field: &str) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(_) => present(value)
            .map(|v| Some(v.to_string()))
            .ok_or_else(|| AppError::Validation(format!("{field} cannot be empty"))),
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .rsplit_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2)
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and
/// plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(value: &str, field: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(AppError::Validation(format!("{field} is not a valid date")))
}

pub fn parse_enum<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .trim()
        .parse()
        .map_err(|e: UnknownVariant| AppError::Validation(e.to_string()))
}

/// Rejects date ranges that do not move forward.
pub fn ensure_end_after_start(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(AppError::Validation(
            "End date must be after start date".to_string(),
        ));
    }
    Ok(())
}
