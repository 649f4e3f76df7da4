//! Local checks run before any sign-up request reaches the provider.

use std::sync::LazyLock;

use regex::Regex;

pub const INVALID_EMAIL: &str = "Please enter a valid email address.";
pub const PASSWORD_MISMATCH: &str = "Passwords do not match.";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters long.";

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Quoted or dot-atom local part; bracketed IPv4 literal or hostname ending
/// in an alphabetic top-level label of at least two letters.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    )
    .unwrap()
});

/// Check that `email` looks like `local@domain.tld`, ignoring case.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(&email.to_lowercase())
}

/// Validate sign-up input, returning the first problem found.
///
/// Order: email shape, then confirmation match, then password length.
pub fn validate_sign_up(email: &str, password: &str, confirm: &str) -> Result<(), &'static str> {
    if !is_valid_email(email) {
        return Err(INVALID_EMAIL);
    }
    if password != confirm {
        return Err(PASSWORD_MISMATCH);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PASSWORD_TOO_SHORT);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        for email in [
            "user@example.com",
            "first.last@mail.example.co",
            "User+tag@Example.ORG",
            "\"odd name\"@example.com",
            "root@[192.168.0.1]",
        ] {
            assert!(is_valid_email(email), "{} should be valid", email);
        }
    }

    #[test]
    fn test_invalid_emails() {
        for email in [
            "",
            "user",
            "user@",
            "@example.com",
            "user@example",
            "user@example.c",
            "user@exa_mple.com",
            "us er@example.com",
            ".user@example.com",
            "user..name@example.com",
            "user@example.c0m",
            "user@[1.2.3]",
        ] {
            assert!(!is_valid_email(email), "{} should be invalid", email);
        }
    }

    #[test]
    fn test_sign_up_validation_order() {
        assert_eq!(validate_sign_up("bad", "a", "b"), Err(INVALID_EMAIL));
        assert_eq!(
            validate_sign_up("a@b.co", "secret1", "secret2"),
            Err(PASSWORD_MISMATCH)
        );
        assert_eq!(validate_sign_up("a@b.co", "abc", "abc"), Err(PASSWORD_TOO_SHORT));
        assert_eq!(validate_sign_up("a@b.co", "secret", "secret"), Ok(()));
    }
}
