//! Booking: claim one (doctor, date, time) slot for a patient.
//!
//! Availability gate, conflict check and insert run inside a single
//! `BEGIN IMMEDIATE` transaction. The partial unique index on
//! `appointments(doctor_id, slot_date, slot_time) WHERE cancelled = 0`
//! is the final arbiter: if two requests race past the pre-check, the
//! loser's INSERT fails and is reported as `SlotTaken`.

use chrono::Local;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppointmentError;
use crate::models::enums::EventAction;
use crate::models::{Appointment, AppointmentEvent, SlotKey};
use crate::slots::{parse_slot_date, validate_slot_time, ClinicHours};

// ─── Types ────────────────────────────────────────────────────────────────────

/// Booking request as received from a client. Fields are optional so a
/// missing one can be reported as a validation error by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub doctor_id: Option<String>,
    pub slot_date: Option<String>,
    pub slot_time: Option<String>,
}

impl BookingRequest {
    pub fn new(doctor_id: Uuid, slot_date: &str, slot_time: &str) -> Self {
        Self {
            doctor_id: Some(doctor_id.to_string()),
            slot_date: Some(slot_date.into()),
            slot_time: Some(slot_time.into()),
        }
    }
}

// ─── Validation ───────────────────────────────────────────────────────────────

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, AppointmentError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppointmentError::validation(format!("{field} is required"))),
    }
}

/// Checks presence and shape of every field and canonicalizes the time.
pub fn validate_request(hours: &ClinicHours, request: &BookingRequest) -> Result<SlotKey, AppointmentError> {
    let doctor_raw = required(&request.doctor_id, "doctorId")?;
    let date_raw = required(&request.slot_date, "slotDate")?;
    let time_raw = required(&request.slot_time, "slotTime")?;

    let doctor_id = Uuid::parse_str(doctor_raw)
        .map_err(|_| AppointmentError::validation(format!("doctorId '{doctor_raw}' is not a valid id")))?;
    let date = parse_slot_date(date_raw)?;
    let time = validate_slot_time(hours, date, time_raw)?;

    Ok(SlotKey { doctor_id, date, time })
}

// ─── Booking ──────────────────────────────────────────────────────────────────

/// Book a slot for `user_id`.
///
/// On any error the transaction is dropped uncommitted, so no appointment
/// row and no history event persist for the failed attempt.
pub fn book(
    conn: &mut Connection,
    hours: &ClinicHours,
    user_id: Uuid,
    request: &BookingRequest,
) -> Result<Appointment, AppointmentError> {
    let slot = validate_request(hours, request)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let appointment = match claim_slot(&tx, user_id, &slot) {
        Ok(appointment) => appointment,
        Err(e) => {
            tracing::debug!(
                doctor_id = %slot.doctor_id,
                date = %slot.date,
                time = %slot.time,
                reason = %e,
                "Booking rejected"
            );
            return Err(e);
        }
    };
    tx.commit()?;

    tracing::info!(
        appointment_id = %appointment.id,
        doctor_id = %appointment.doctor_id,
        date = %appointment.slot_date,
        time = %appointment.slot_time,
        "Appointment booked"
    );
    Ok(appointment)
}

/// Gate, conflict check and insert. Must run inside a write transaction.
fn claim_slot(conn: &Connection, user_id: Uuid, slot: &SlotKey) -> Result<Appointment, AppointmentError> {
    if repository::get_user(conn, &user_id)?.is_none() {
        return Err(AppointmentError::not_found("User", &user_id));
    }

    let doctor = repository::get_doctor(conn, &slot.doctor_id)?
        .ok_or_else(|| AppointmentError::not_found("Doctor", &slot.doctor_id))?;

    if !doctor.available {
        return Err(AppointmentError::DoctorUnavailable(doctor.id));
    }

    if repository::find_active_by_slot(conn, slot)?.is_some() {
        return Err(slot_taken(slot));
    }

    let now = Local::now().naive_local();
    let appointment = Appointment::scheduled(user_id, slot, doctor.fee, now);

    repository::insert_appointment(conn, &appointment).map_err(|e| {
        if e.is_unique_violation() {
            slot_taken(slot)
        } else {
            e.into()
        }
    })?;

    repository::insert_event(conn, &AppointmentEvent {
        appointment_id: appointment.id,
        action: EventAction::Booked,
        actor_id: None,
        actor_role: None,
        detail: Some(format!("{} {} for user {}", slot.date, slot.time, user_id)),
        occurred_at: now,
    })?;

    Ok(appointment)
}

pub(crate) fn slot_taken(slot: &SlotKey) -> AppointmentError {
    AppointmentError::SlotTaken {
        doctor_id: slot.doctor_id,
        date: slot.date,
        time: slot.time.clone(),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::*;
    use crate::db::sqlite::open_memory_database;

    fn count_appointments(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))
            .unwrap()
    }

    fn count_all_events(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM appointment_events", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn booking_snapshots_fee_and_starts_scheduled() {
        let mut conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "Ana");
        let doctor = seed_doctor(&conn, "Dr. Alice", 150.0, true);

        let appt = book(
            &mut conn,
            &ClinicHours::default(),
            user.id,
            &BookingRequest::new(doctor.id, "2025-03-10", "09:00"),
        )
        .unwrap();

        assert_eq!(appt.amount, 150.0);
        assert!(!appt.cancelled);
        assert!(!appt.is_completed);
        assert!(!appt.payment);
        assert_eq!(appt.slot_time, "09:00");

        let stored = repository::get_appointment(&conn, &appt.id).unwrap().unwrap();
        assert_eq!(stored.user_id, user.id);

        let events = repository::list_events(&conn, &appt.id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, EventAction::Booked);
    }

    #[test]
    fn booked_event_names_the_patient_without_claiming_an_actor() {
        let mut conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "Ana");
        let doctor = seed_doctor(&conn, "Dr. Alice", 150.0, true);

        let appt = book(
            &mut conn,
            &ClinicHours::default(),
            user.id,
            &BookingRequest::new(doctor.id, "2025-03-10", "09:00"),
        )
        .unwrap();

        let events = repository::list_events(&conn, &appt.id).unwrap();
        let booked = &events[0];
        assert_eq!(booked.actor_id, None);
        assert_eq!(booked.actor_role, None);
        assert_eq!(
            booked.detail.as_deref(),
            Some(format!("2025-03-10 09:00 for user {}", user.id).as_str())
        );
    }

    #[test]
    fn repeating_a_booking_is_slot_taken() {
        let mut conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "Ana");
        let doctor = seed_doctor(&conn, "Dr. Alice", 150.0, true);
        let request = BookingRequest::new(doctor.id, "2025-03-10", "09:00");

        book(&mut conn, &ClinicHours::default(), user.id, &request).unwrap();
        let err = book(&mut conn, &ClinicHours::default(), user.id, &request).unwrap_err();

        assert!(matches!(err, AppointmentError::SlotTaken { ref time, .. } if time == "09:00"));
        assert_eq!(count_appointments(&conn), 1);
    }

    #[test]
    fn equivalent_time_spellings_hit_the_same_slot() {
        let mut conn = open_memory_database().unwrap();
        let ana = seed_user(&conn, "Ana");
        let ben = seed_user(&conn, "Ben");
        let doctor = seed_doctor(&conn, "Dr. Alice", 150.0, true);
        let hours = ClinicHours::default();

        book(&mut conn, &hours, ana.id, &BookingRequest::new(doctor.id, "2025-03-10", "10:00")).unwrap();
        let err = book(&mut conn, &hours, ben.id, &BookingRequest::new(doctor.id, "2025-03-10", "10:00 AM"))
            .unwrap_err();
        assert!(matches!(err, AppointmentError::SlotTaken { .. }));
    }

    #[test]
    fn unavailable_doctor_wins_over_free_slot() {
        let mut conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "Ana");
        let doctor = seed_doctor(&conn, "Dr. Bob", 120.0, false);

        let err = book(
            &mut conn,
            &ClinicHours::default(),
            user.id,
            &BookingRequest::new(doctor.id, "2025-03-10", "09:00"),
        )
        .unwrap_err();

        assert!(matches!(err, AppointmentError::DoctorUnavailable(id) if id == doctor.id));
        assert_eq!(count_appointments(&conn), 0);
    }

    #[test]
    fn unavailable_doctor_reported_even_when_slot_is_taken() {
        let mut conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "Ana");
        let doctor = seed_doctor(&conn, "Dr. Bob", 120.0, true);
        let hours = ClinicHours::default();
        let request = BookingRequest::new(doctor.id, "2025-03-10", "09:00");

        book(&mut conn, &hours, user.id, &request).unwrap();
        repository::update_doctor_profile(&conn, &doctor.id, None, Some(false)).unwrap();

        let err = book(&mut conn, &hours, user.id, &request).unwrap_err();
        assert!(matches!(err, AppointmentError::DoctorUnavailable(_)));
    }

    #[test]
    fn missing_fields_are_validation_errors() {
        let mut conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "Ana");
        let doctor = seed_doctor(&conn, "Dr. Alice", 150.0, true);
        let hours = ClinicHours::default();

        let mut request = BookingRequest::new(doctor.id, "2025-03-10", "09:00");
        request.slot_time = Some("   ".into());
        let err = book(&mut conn, &hours, user.id, &request).unwrap_err();
        assert!(matches!(err, AppointmentError::Validation(ref m) if m.contains("slotTime")));

        let err = book(&mut conn, &hours, user.id, &BookingRequest::default()).unwrap_err();
        assert!(matches!(err, AppointmentError::Validation(ref m) if m.contains("doctorId")));

        let bad_date = BookingRequest::new(doctor.id, "10/03/2025", "09:00");
        let err = book(&mut conn, &hours, user.id, &bad_date).unwrap_err();
        assert!(matches!(err, AppointmentError::Validation(_)));
    }

    #[test]
    fn times_outside_clinic_hours_are_rejected() {
        let mut conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "Ana");
        let doctor = seed_doctor(&conn, "Dr. Alice", 150.0, true);
        let hours = ClinicHours::default();

        for (date, time) in [("2025-03-16", "09:00"), ("2025-03-15", "12:00"), ("2025-03-10", "09:15")] {
            let err = book(&mut conn, &hours, user.id, &BookingRequest::new(doctor.id, date, time)).unwrap_err();
            assert!(matches!(err, AppointmentError::Validation(_)), "{date} {time}");
        }
        assert_eq!(count_appointments(&conn), 0);
    }

    #[test]
    fn unknown_doctor_or_user_is_not_found() {
        let mut conn = open_memory_database().unwrap();
        let user = seed_user(&conn, "Ana");
        let doctor = seed_doctor(&conn, "Dr. Alice", 150.0, true);
        let hours = ClinicHours::default();

        let err = book(&mut conn, &hours, user.id, &BookingRequest::new(Uuid::new_v4(), "2025-03-10", "09:00"))
            .unwrap_err();
        assert!(matches!(err, AppointmentError::NotFound { ref entity_type, .. } if entity_type == "Doctor"));

        let err = book(&mut conn, &hours, Uuid::new_v4(), &BookingRequest::new(doctor.id, "2025-03-10", "09:00"))
            .unwrap_err();
        assert!(matches!(err, AppointmentError::NotFound { ref entity_type, .. } if entity_type == "User"));
    }

    #[test]
    fn failed_bookings_leave_no_rows_or_events() {
        let mut conn = open_memory_database().unwrap();
        let ana = seed_user(&conn, "Ana");
        let ben = seed_user(&conn, "Ben");
        let open = seed_doctor(&conn, "Dr. Alice", 150.0, true);
        let closed = seed_doctor(&conn, "Dr. Bob", 120.0, false);
        let hours = ClinicHours::default();

        book(&mut conn, &hours, ana.id, &BookingRequest::new(open.id, "2025-03-10", "09:00")).unwrap();
        let before = (count_appointments(&conn), count_all_events(&conn));

        let attempts = [
            BookingRequest::new(open.id, "2025-03-10", "09:00"),
            BookingRequest::new(closed.id, "2025-03-10", "09:30"),
            BookingRequest::new(Uuid::new_v4(), "2025-03-10", "10:00"),
            BookingRequest::new(open.id, "2025-03-16", "10:00"),
        ];
        for request in &attempts {
            assert!(book(&mut conn, &hours, ben.id, request).is_err());
        }

        assert_eq!((count_appointments(&conn), count_all_events(&conn)), before);
    }
}
