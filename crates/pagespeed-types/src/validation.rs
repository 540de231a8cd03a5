//! Input checks applied before a run may leave `Idle`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{BatchError, Result, ValidationField};

pub const MIN_ITERATIONS: u32 = 1;
pub const MAX_ITERATIONS: u32 = 20;

static TARGET_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://.+").expect("target url pattern compiles"));

/// Returns the trimmed URL when it is an http(s) address.
pub fn validate_url(raw: &str) -> Result<String> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(BatchError::validation(
            ValidationField::Url,
            "Please enter a valid URL",
        ));
    }
    if !TARGET_URL.is_match(url) {
        return Err(BatchError::validation(
            ValidationField::Url,
            "URL must start with http:// or https://",
        ));
    }
    Ok(url.to_string())
}

pub fn validate_count(count: i64) -> Result<u32> {
    if count < MIN_ITERATIONS as i64 || count > MAX_ITERATIONS as i64 {
        return Err(BatchError::validation(
            ValidationField::Count,
            format!("Number of tests must be between {MIN_ITERATIONS} and {MAX_ITERATIONS}"),
        ));
    }
    Ok(count as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: BatchError) -> ValidationField {
        match err {
            BatchError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_http_and_https() {
        assert_eq!(
            validate_url("  https://example.com/page ").unwrap(),
            "https://example.com/page"
        );
        assert!(validate_url("http://a").is_ok());
    }

    #[test]
    fn rejects_bad_urls() {
        assert_eq!(field_of(validate_url("").unwrap_err()), ValidationField::Url);
        assert_eq!(field_of(validate_url("   ").unwrap_err()), ValidationField::Url);
        assert_eq!(
            field_of(validate_url("ftp://example.com").unwrap_err()),
            ValidationField::Url
        );
        assert!(validate_url("https://").is_err());
        assert!(validate_url("example.com").is_err());
    }

    #[test]
    fn count_bounds() {
        assert_eq!(validate_count(1).unwrap(), 1);
        assert_eq!(validate_count(20).unwrap(), 20);
        assert_eq!(field_of(validate_count(0).unwrap_err()), ValidationField::Count);
        assert_eq!(field_of(validate_count(21).unwrap_err()), ValidationField::Count);
        assert!(validate_count(-3).is_err());
    }
}
