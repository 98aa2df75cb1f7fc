//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted team or player name, in characters.
pub const MAX_NAME_LEN: usize = 64;

/// Validates that a display name is non-blank and at most [`MAX_NAME_LEN`] characters.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Blue") // Ok
/// validate_display_name("   ")  // Err - blank
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Name must not be blank".into());
        return Err(err);
    }

    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        let mut err = ValidationError::new("name_length");
        err.message =
            Some(format!("Name must be at most {MAX_NAME_LEN} characters (got {len})").into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a raw team index designates one of the two teams.
pub fn validate_team_index(index: u8) -> Result<(), ValidationError> {
    if index > 1 {
        let mut err = ValidationError::new("team_index_range");
        err.message = Some(format!("Team index must be 0 or 1 (got {index})").into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_display_name_valid() {
        assert!(validate_display_name("Blue").is_ok());
        assert!(validate_display_name(" Les Bleus ").is_ok());
        assert!(validate_display_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_validate_display_name_invalid() {
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name(" \t").is_err());
        assert!(validate_display_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_team_index() {
        assert!(validate_team_index(0).is_ok());
        assert!(validate_team_index(1).is_ok());
        assert!(validate_team_index(2).is_err());
    }
}
