use lazy_static::lazy_static;
use regex::Regex;
use validator::Validate;

use crate::error::{ClientError, FieldErrors};

lazy_static! {
    pub static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    pub static ref NOT_BLANK_RE: Regex = Regex::new(r"\S").unwrap();
    pub static ref PHONE_RE: Regex = Regex::new(r"^\+?\(?[0-9][0-9 ()-]{5,18}[0-9]$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Runs the derived schema checks, reporting fields in `order`.
pub fn check<T: Validate>(value: &T, order: &[&str]) -> Result<(), ClientError> {
    value
        .validate()
        .map_err(|errs| ClientError::Validation(FieldErrors::from_validation(&errs, order)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("user@test.com"));
        assert!(!is_valid_email("user@test"));
        assert!(!is_valid_email("user test@test.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn blank_detection() {
        assert!(NOT_BLANK_RE.is_match(" a "));
        assert!(!NOT_BLANK_RE.is_match("   "));
    }

    #[test]
    fn phone_shapes() {
        assert!(is_valid_phone("+44 20 7946 0958"));
        assert!(is_valid_phone("0712345678"));
        assert!(is_valid_phone("(555) 123-4567"));
        assert!(!is_valid_phone("12"));
        assert!(!is_valid_phone("call me"));
    }
}
