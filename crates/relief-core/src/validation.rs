//! # Validation Module
//!
//! Form-level checks run before anything reaches the database.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI argument parsing (clap)                                  │
//! │  ├── Types and enum values                                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields, lengths, numeric ranges                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE and foreign keys                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use relief_core::validation::{validate_quantity, validate_rating};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_rating(6).is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Field must be present and not blank. Returns the trimmed value.
pub fn validate_required<'a>(field: &str, value: &'a str) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(value)
}

/// Optional text: blank counts as absent.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Required, at most `max` characters.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = validate_required(field, value)?;
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Person or organization name: 1 to 200 characters.
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    validate_text(field, name, 200)
}

/// Validates an email address.
///
/// ## Rules
/// - Exactly one `@`, non-empty local part
/// - Domain contains a dot that is not at either end
/// - No whitespace, at most 254 characters
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = validate_required("email", email)?;

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing @"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must look like name@domain"));
    }

    let dot_ok = domain
        .find('.')
        .map(|i| i > 0 && !domain.ends_with('.'))
        .unwrap_or(false);
    if !dot_ok {
        return Err(invalid("domain must contain a dot"));
    }

    Ok(())
}

/// Phone numbers: digits plus `+ - ( )` and spaces, 7 to 20 characters.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = validate_required("phone", phone)?;

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '))
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces and + - ( )".to_string(),
        });
    }

    let len = phone.chars().count();
    if len < 7 {
        return Err(ValidationError::TooShort {
            field: "phone".to_string(),
            min: 7,
        });
    }
    if len > 20 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 20,
        });
    }

    Ok(())
}

/// Passwords need at least 6 characters.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::required("password"));
    }
    if password.chars().count() < 6 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        });
    }
    Ok(())
}

/// Notification / alert body: required, up to 1000 characters.
pub fn validate_message(message: &str) -> ValidationResult<()> {
    validate_text("message", message, 1000)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Allocations, transfers and stock entries move a positive number of units.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Counts that may be zero: camp capacity, inventory, occupancy.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Feedback ratings run from 1 to 5.
pub fn validate_rating(rating: i64) -> ValidationResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: 1,
            max: 5,
        });
    }
    Ok(())
}

/// Latitude within ±90, longitude within ±180. Either may be absent.
pub fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> ValidationResult<()> {
    if let Some(lat) = latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::OutOfRange {
                field: "latitude".to_string(),
                min: -90,
                max: 90,
            });
        }
    }
    if let Some(lon) = longitude {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ValidationError::OutOfRange {
                field: "longitude".to_string(),
                min: -180,
                max: 180,
            });
        }
    }
    Ok(())
}

/// Shelter occupancy can't exceed capacity.
pub fn validate_occupancy(occupancy: i64, capacity: i64) -> ValidationResult<()> {
    validate_non_negative("capacity", capacity)?;
    validate_non_negative("current_occupancy", occupancy)?;
    if occupancy > capacity {
        return Err(ValidationError::OutOfRange {
            field: "current_occupancy".to_string(),
            min: 0,
            max: capacity,
        });
    }
    Ok(())
}

/// Ages of affected people.
pub fn validate_age(age: i64) -> ValidationResult<()> {
    if !(0..=150).contains(&age) {
        return Err(ValidationError::OutOfRange {
            field: "age".to_string(),
            min: 0,
            max: 150,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required("location", "  Dhaka ").unwrap(), "Dhaka");
        assert_eq!(
            validate_required("location", "   ").unwrap_err(),
            ValidationError::required("location")
        );
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" x ")), Some("x".to_string()));
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ops@relief.org").is_ok());
        assert!(validate_email("a.b+c@sub.example.co").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.org").is_err());
        assert!(validate_email("a@b@c.org").is_err());
        assert!(validate_email("a@localhost").is_err());
        assert!(validate_email("a@example.").is_err());
        assert!(validate_email("a b@example.org").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+880 1712-345678").is_ok());
        assert!(validate_phone("(555) 123-4567").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone(&"1".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password("abc").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(10_000).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("capacity", 0).is_ok());
        assert!(validate_non_negative("capacity", -1).is_err());
    }

    #[test]
    fn test_validate_rating() {
        for r in 1..=5 {
            assert!(validate_rating(r).is_ok());
        }
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(Some(23.8), Some(90.4)).is_ok());
        assert!(validate_coordinates(None, None).is_ok());
        assert!(validate_coordinates(Some(91.0), None).is_err());
        assert!(validate_coordinates(None, Some(-180.5)).is_err());
    }

    #[test]
    fn test_validate_occupancy() {
        assert!(validate_occupancy(10, 10).is_ok());
        assert!(validate_occupancy(11, 10).is_err());
        assert!(validate_occupancy(0, -1).is_err());
    }

    #[test]
    fn test_validate_message() {
        assert!(validate_message("Flood warning for sector 4").is_ok());
        assert!(validate_message(" ").is_err());
        assert!(validate_message(&"x".repeat(1001)).is_err());
    }
}
