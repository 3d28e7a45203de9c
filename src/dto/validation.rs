//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted session name.
const MAX_SESSION_NAME_LEN: usize = 64;

/// Validates that a session name is non-blank, at most 64 characters, and
/// free of control characters.
///
/// # Examples
///
/// ```ignore
/// validate_session_name("Friday Night Draft") // Ok
/// validate_session_name("   ")                // Err - blank
/// validate_session_name("bad\nname")          // Err - control character
/// ```
pub fn validate_session_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("session_name_blank");
        err.message = Some("Session name must not be blank".into());
        return Err(err);
    }

    if name.chars().count() > MAX_SESSION_NAME_LEN {
        let mut err = ValidationError::new("session_name_length");
        err.message = Some(
            format!(
                "Session name must be at most {MAX_SESSION_NAME_LEN} characters (got {})",
                name.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    if name.chars().any(char::is_control) {
        let mut err = ValidationError::new("session_name_format");
        err.message = Some("Session name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}
