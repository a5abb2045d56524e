//! Best-effort detection of personal data in chat input.
//!
//! The patterns are deliberately loose. Both false positives and false
//! negatives are expected; the flag only drives redaction and a UI hint.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").expect("valid email pattern"));

// ###-##-#### with optional hyphens, i.e. nine digits as a standalone token.
static NATIONAL_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}-?\d{2}-?\d{4}\b").expect("valid national id pattern"));

pub fn contains_email(text: &str) -> bool {
    EMAIL_PATTERN.is_match(text)
}

pub fn contains_national_id(text: &str) -> bool {
    NATIONAL_ID_PATTERN.is_match(text)
}

pub fn contains_sensitive_data(text: &str) -> bool {
    contains_email(text) || contains_national_id(text)
}
