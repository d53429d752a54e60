//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a `&Connection`, so a `rusqlite::Transaction`
//! (which derefs to `Connection`) can group several of them into one
//! atomic unit.

mod appointment;
mod doctor;
mod event;
mod user;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use super::DatabaseError;

pub use appointment::*;
pub use doctor::*;
pub use event::*;
pub use user::*;

/// Storage format for timestamps (`created_at`, `occurred_at`).
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Storage format for slot dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid date {value}: {e}")))
}

pub(crate) fn parse_datetime(value: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid timestamp {value}: {e}")))
}

pub(crate) fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDateTime;
    use rusqlite::Connection;
    use uuid::Uuid;

    use super::*;
    use crate::models::*;

    pub fn timestamp() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-03-01 09:00:00", DATETIME_FORMAT).unwrap()
    }

    pub fn seed_user(conn: &Connection, name: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@patients.test", name.to_lowercase()),
            created_at: timestamp(),
        };
        insert_user(conn, &user).unwrap();
        user
    }

    pub fn seed_doctor(conn: &Connection, name: &str, fee: f64, available: bool) -> Doctor {
        let doctor = Doctor {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@clinic.test", name.to_lowercase().replace([' ', '.'], "")),
            speciality: "General physician".into(),
            degree: Some("MD".into()),
            experience_years: 8,
            fee,
            available,
            created_at: timestamp(),
        };
        insert_doctor(conn, &doctor).unwrap();
        doctor
    }
}
