//! Normalization of user- and provider-supplied identity strings.

use crate::error::CoreError;

/// Maximum accepted email length (RFC 5321 path limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Trim and lowercase an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Lowercase an OAuth provider name (`"Google"` -> `"google"`).
pub fn normalize_provider(provider: &str) -> String {
    provider.trim().to_ascii_lowercase()
}

/// Trim a display name and collapse internal runs of whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Minimal structural email check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<(), CoreError> {
    let invalid = || CoreError::Validation(format!("Invalid email address '{email}'"));
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}
