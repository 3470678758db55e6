//! Small helpers for request inspection and account field validation.
//!
//! Validators return a fresh list of messages per call; an empty list means
//! the value is acceptable. Callers concatenate the lists of several fields.

use regex::Regex;

const SPECIAL_CHARACTERS: &str = r#"!@#$%^&*(),.?":{}|<>"#;

/// Basic email format check.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .is_ok_and(|regex| regex.is_match(email))
}

#[must_use]
pub fn validate_password_pattern(password: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if password.chars().count() < 8 {
        errors.push("Password length must be at least 8 characters.".to_string());
    }
    if !password.chars().any(char::is_uppercase) {
        errors.push("Password must contain at least one uppercase letter.".to_string());
    }
    if !password.chars().any(char::is_lowercase) {
        errors.push("Password must contain at least one lowercase letter.".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one digit.".to_string());
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        errors.push("Password must contain at least one special character.".to_string());
    }
    errors
}

#[must_use]
pub fn validate_username_pattern(username: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if username.chars().count() < 4 {
        errors.push("Username length must be at least 4 characters.".to_string());
    }
    if username.chars().any(char::is_uppercase) {
        errors.push("Username must not contain any uppercase letter.".to_string());
    }
    if username.contains(' ') {
        errors.push("Username must not contain space characters.".to_string());
    }
    if username.contains('-') {
        errors.push("Username must not contain - characters.".to_string());
    }
    // `@` is allowed in usernames.
    if username
        .chars()
        .any(|c| c != '@' && SPECIAL_CHARACTERS.contains(c))
    {
        errors.push("Username must not contain special characters.".to_string());
    }
    errors
}

#[must_use]
pub fn validate_email_pattern(email: &str) -> Vec<String> {
    if valid_email(email) {
        Vec::new()
    } else {
        vec!["Email is not valid.".to_string()]
    }
}

/// International format: a leading `+` followed by 8 to 15 digits. Spaces,
/// dashes and parentheses between digits are ignored.
#[must_use]
pub fn validate_phone_number_pattern(phone_number: &str) -> Vec<String> {
    let trimmed = phone_number.trim();
    let valid = trimmed.strip_prefix('+').is_some_and(|rest| {
        let separators_ok = rest
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));
        let digits = rest.chars().filter(char::is_ascii_digit).count();
        separators_ok && (8..=15).contains(&digits)
    });
    if valid {
        Vec::new()
    } else {
        vec!["Phone number is not valid.".to_string()]
    }
}

/// Extract a client IP from common proxy headers.
pub(crate) fn extract_client_ip(headers: &axum::http::HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
