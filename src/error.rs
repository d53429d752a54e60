//! Errors reported by the booking, cancellation and lifecycle operations.
//!
//! Every variant is local to one request. Storage failures roll the
//! enclosing transaction back before they surface as `Internal`.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Doctor {0} is not accepting appointments")]
    DoctorUnavailable(Uuid),

    #[error("Slot {date} {time} is already booked for doctor {doctor_id}")]
    SlotTaken {
        doctor_id: Uuid,
        date: NaiveDate,
        time: String,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage failure: {0}")]
    Internal(DatabaseError),
}

impl AppointmentError {
    pub(crate) fn not_found(entity_type: &str, id: &Uuid) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<DatabaseError> for AppointmentError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => Self::NotFound { entity_type, id },
            other => {
                tracing::warn!(error = %other, "Storage operation failed");
                Self::Internal(other)
            }
        }
    }
}

impl From<rusqlite::Error> for AppointmentError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_keeps_entity_and_id() {
        let err: AppointmentError = DatabaseError::NotFound {
            entity_type: "Doctor".into(),
            id: "d-1".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Doctor not found: d-1");
    }

    #[test]
    fn sqlite_errors_become_internal() {
        let err: AppointmentError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, AppointmentError::Internal(_)));
    }

    #[test]
    fn rejections_name_their_reason() {
        let doctor_id = Uuid::nil();
        let unavailable = AppointmentError::DoctorUnavailable(doctor_id).to_string();
        let taken = AppointmentError::SlotTaken {
            doctor_id,
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            time: "09:00".into(),
        }
        .to_string();
        assert!(unavailable.contains("not accepting appointments"));
        assert!(taken.contains("2025-03-10 09:00 is already booked"));
    }
}
