//! Invitation email handling.

/// Normalize an email address for storage and comparison.
///
/// Trims surrounding whitespace and lowercases. Returns `None` when the value
/// does not have a minimal `local@domain` shape.
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let (local, domain) = trimmed.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    if trimmed.chars().any(char::is_whitespace) {
        return None;
    }
    Some(trimmed.to_lowercase())
}

/// Case-insensitive comparison of two addresses.
pub fn emails_match(a: &str, b: &str) -> bool {
    match (normalize_email(a), normalize_email(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
