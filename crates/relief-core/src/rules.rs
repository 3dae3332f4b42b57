//! Workflow rules shared by the repositories and the CLI.

use crate::error::{CoreError, CoreResult};
use crate::status::{UrgencyLevel, VolunteerStatus};
use crate::validation::validate_quantity;

/// Checks that `requested` units can be taken out of a stock record.
///
/// ```rust
/// use relief_core::rules::check_stock;
///
/// assert!(check_stock("s1", 30, 30).is_ok());
/// assert!(check_stock("s1", 30, 31).is_err());
/// assert!(check_stock("s1", 30, 0).is_err());
/// ```
pub fn check_stock(stock_id: &str, available: i64, requested: i64) -> CoreResult<()> {
    validate_quantity(requested)?;
    if requested > available {
        return Err(CoreError::InsufficientStock {
            stock_id: stock_id.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

/// Volunteers can only take a task while available.
pub fn check_volunteer_available(volunteer_id: &str, status: VolunteerStatus) -> CoreResult<()> {
    if status != VolunteerStatus::Available {
        return Err(CoreError::VolunteerUnavailable {
            volunteer_id: volunteer_id.to_string(),
            status: status.to_string(),
        });
    }
    Ok(())
}

/// Text broadcast to coordinators when a victim submits a request.
pub fn sos_alert_message(
    request_id: &str,
    type_of_need: &str,
    location: &str,
    urgency: UrgencyLevel,
) -> String {
    format!(
        "NEW SOS REQUEST #{}: {} at {}. Urgency: {}",
        request_id, type_of_need, location, urgency
    )
}

/// History note written when a coordinator assigns a task.
pub fn assignment_note(assigner_name: &str) -> String {
    format!("Assigned by {}", assigner_name)
}

/// History note written when a volunteer turns a task down.
pub const DECLINE_NOTE: &str = "Volunteer declined the task.";

/// History note written when a volunteer accepts a task.
pub const ACCEPT_NOTE: &str = "Volunteer accepted the task.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_stock_reports_numbers() {
        let err = check_stock("stock-9", 4, 10).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                stock_id,
                available,
                requested,
            } => {
                assert_eq!(stock_id, "stock-9");
                assert_eq!(available, 4);
                assert_eq!(requested, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_check_stock_rejects_non_positive() {
        assert!(matches!(
            check_stock("s", 10, -1),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_check_volunteer_available() {
        assert!(check_volunteer_available("v", VolunteerStatus::Available).is_ok());
        let err = check_volunteer_available("v", VolunteerStatus::Busy).unwrap_err();
        assert_eq!(err.to_string(), "Volunteer v is busy, not available");
    }

    #[test]
    fn test_sos_alert_message() {
        assert_eq!(
            sos_alert_message("42", "water", "Sylhet", UrgencyLevel::High),
            "NEW SOS REQUEST #42: water at Sylhet. Urgency: high"
        );
    }
}
