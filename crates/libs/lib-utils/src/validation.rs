//! # Validation Utilities
//!
//! Input validation helpers for user-supplied text.

/// Validate that a string has visible content after trimming.
pub fn validate_not_blank(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Validate maximum length in characters.
pub fn validate_max_length(value: &str, max: usize, field_name: &str) -> Result<(), String> {
    if value.chars().count() > max {
        Err(format!("{} must be at most {} characters", field_name, max))
    } else {
        Ok(())
    }
}

/// Validate a username: 3-32 characters, alphanumeric plus `_` and `-`.
pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if len < 3 || len > 32 {
        return Err("Username must be between 3 and 32 characters".to_string());
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err("Username may only contain letters, digits, '_' and '-'".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert!(validate_not_blank("   \t", "text").is_err());
        assert!(validate_not_blank("hi", "text").is_ok());
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("al").is_err());
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("ok_name-2").is_ok());
    }
}
