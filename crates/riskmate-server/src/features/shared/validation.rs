//! Input validation shared by commands

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max_length} characters")]
    TooLong { field: &'static str, max_length: usize },
}

/// Require non-blank text no longer than `max_length` characters
pub fn validate_text(
    field: &'static str,
    value: &str,
    max_length: usize,
) -> Result<(), TextValidationError> {
    if value.trim().is_empty() {
        return Err(TextValidationError::Required { field });
    }
    if value.chars().count() > max_length {
        return Err(TextValidationError::TooLong { field, max_length });
    }
    Ok(())
}

/// Length check for optional text; blank values are allowed
pub fn validate_optional_text(
    field: &'static str,
    value: Option<&str>,
    max_length: usize,
) -> Result<(), TextValidationError> {
    match value {
        Some(v) if v.chars().count() > max_length => {
            Err(TextValidationError::TooLong { field, max_length })
        },
        _ => Ok(()),
    }
}

/// Trim and turn blank strings into `None`
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text() {
        assert!(validate_text("client_name", "Acme Roofing", 200).is_ok());
        assert_eq!(
            validate_text("client_name", "   ", 200),
            Err(TextValidationError::Required { field: "client_name" })
        );
        assert_eq!(
            validate_text("client_name", &"x".repeat(201), 200),
            Err(TextValidationError::TooLong {
                field: "client_name",
                max_length: 200
            })
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        assert!(validate_text("location", &"é".repeat(10), 10).is_ok());
    }

    #[test]
    fn test_optional_text() {
        assert!(validate_optional_text("description", None, 10).is_ok());
        assert!(validate_optional_text("description", Some(""), 10).is_ok());
        assert!(validate_optional_text("description", Some("this is too long"), 10).is_err());
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  ".into())), None);
        assert_eq!(normalize_optional(Some(" note ".into())), Some("note".into()));
        assert_eq!(normalize_optional(None), None);
    }
}
