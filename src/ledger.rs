//! Read views over the appointment ledger.
//!
//! The ledger is the single record of slot occupancy; these views never
//! consult a cached copy.

use rusqlite::Connection;
use uuid::Uuid;

use crate::authorization::{check_admin_access, Requester};
use crate::db::repository;
use crate::error::AppointmentError;
use crate::models::{AppointmentFilter, AppointmentView};

pub use crate::lifecycle::appointment_history;
pub use crate::slots::booked_slots;

/// A patient's appointments including cancelled ones, newest slot first.
pub fn list_for_user(conn: &Connection, user_id: &Uuid) -> Result<Vec<AppointmentView>, AppointmentError> {
    if repository::get_user(conn, user_id)?.is_none() {
        return Err(AppointmentError::not_found("User", user_id));
    }
    let filter = AppointmentFilter {
        user_id: Some(*user_id),
        include_cancelled: true,
        ..Default::default()
    };
    Ok(repository::list_appointment_views(conn, &filter)?)
}

/// A doctor's schedule including cancelled entries, newest slot first.
pub fn list_for_doctor(conn: &Connection, doctor_id: &Uuid) -> Result<Vec<AppointmentView>, AppointmentError> {
    if repository::get_doctor(conn, doctor_id)?.is_none() {
        return Err(AppointmentError::not_found("Doctor", doctor_id));
    }
    let filter = AppointmentFilter {
        doctor_id: Some(*doctor_id),
        include_cancelled: true,
        ..Default::default()
    };
    Ok(repository::list_appointment_views(conn, &filter)?)
}

/// Clinic-wide listing for administrators.
pub fn list_appointments(
    conn: &Connection,
    requester: &Requester,
    filter: &AppointmentFilter,
) -> Result<Vec<AppointmentView>, AppointmentError> {
    check_admin_access(requester).require("list all appointments")?;
    Ok(repository::list_appointment_views(conn, filter)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{book, BookingRequest};
    use crate::cancellation::cancel;
    use crate::db::repository::test_support::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::AppointmentStatus;
    use crate::slots::ClinicHours;
    use chrono::NaiveDate;

    #[test]
    fn patient_and_doctor_views_include_cancelled() {
        let mut conn = open_memory_database().unwrap();
        let ana = seed_user(&conn, "Ana");
        let alice = seed_doctor(&conn, "Dr. Alice", 150.0, true);
        let hours = ClinicHours::default();

        let first = book(&mut conn, &hours, ana.id, &BookingRequest::new(alice.id, "2025-03-10", "09:00")).unwrap();
        book(&mut conn, &hours, ana.id, &BookingRequest::new(alice.id, "2025-03-11", "09:00")).unwrap();
        cancel(&mut conn, &first.id, &Requester::user(ana.id)).unwrap();

        let mine = list_for_user(&conn, &ana.id).unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].appointment.slot_date, NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());
        assert_eq!(mine[1].status, AppointmentStatus::Cancelled);
        assert_eq!(mine[0].doctor_name, "Dr. Alice");

        let schedule = list_for_doctor(&conn, &alice.id).unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0].patient_email, "ana@patients.test");

        assert!(matches!(list_for_user(&conn, &Uuid::new_v4()), Err(AppointmentError::NotFound { .. })));
        assert!(matches!(list_for_doctor(&conn, &Uuid::new_v4()), Err(AppointmentError::NotFound { .. })));
    }

    #[test]
    fn admin_listing_filters_and_is_admin_only() {
        let mut conn = open_memory_database().unwrap();
        let ana = seed_user(&conn, "Ana");
        let ben = seed_user(&conn, "Ben");
        let alice = seed_doctor(&conn, "Dr. Alice", 150.0, true);
        let bob = seed_doctor(&conn, "Dr. Bob", 120.0, true);
        let hours = ClinicHours::default();

        let cancelled = book(&mut conn, &hours, ana.id, &BookingRequest::new(alice.id, "2025-03-10", "09:00")).unwrap();
        book(&mut conn, &hours, ben.id, &BookingRequest::new(alice.id, "2025-03-10", "09:30")).unwrap();
        book(&mut conn, &hours, ben.id, &BookingRequest::new(bob.id, "2025-03-10", "09:30")).unwrap();
        cancel(&mut conn, &cancelled.id, &Requester::user(ana.id)).unwrap();

        let admin = Requester::admin(Uuid::new_v4());

        let live = list_appointments(&conn, &admin, &AppointmentFilter::default()).unwrap();
        assert_eq!(live.len(), 2);

        let everything = AppointmentFilter { include_cancelled: true, ..Default::default() };
        assert_eq!(list_appointments(&conn, &admin, &everything).unwrap().len(), 3);

        let at_half_past = AppointmentFilter {
            doctor_id: Some(alice.id),
            time: Some("09:30".into()),
            ..Default::default()
        };
        let rows = list_appointments(&conn, &admin, &at_half_past).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].patient_name, "Ben");

        let err = list_appointments(&conn, &Requester::user(ana.id), &AppointmentFilter::default()).unwrap_err();
        assert!(matches!(err, AppointmentError::Forbidden(_)));
    }

    #[test]
    fn booked_slots_follow_the_ledger() {
        let mut conn = open_memory_database().unwrap();
        let ana = seed_user(&conn, "Ana");
        let alice = seed_doctor(&conn, "Dr. Alice", 150.0, true);
        let hours = ClinicHours::default();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        let appt = book(&mut conn, &hours, ana.id, &BookingRequest::new(alice.id, "2025-03-10", "11:00")).unwrap();
        book(&mut conn, &hours, ana.id, &BookingRequest::new(alice.id, "2025-03-10", "08:30")).unwrap();
        assert_eq!(booked_slots(&conn, &alice.id, date).unwrap(), vec!["08:30", "11:00"]);

        cancel(&mut conn, &appt.id, &Requester::user(ana.id)).unwrap();
        assert_eq!(booked_slots(&conn, &alice.id, date).unwrap(), vec!["08:30"]);
    }
}
