//! Cancellation and administrative hard delete.
//!
//! Both release the slot by changing the ledger row itself (flag or
//! removal), which is the only place slot occupancy is recorded. The
//! mutation and its history event share one `BEGIN IMMEDIATE`
//! transaction, so no reader sees one without the other.

use chrono::Local;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authorization::{check_admin_access, check_cancel_access, Requester};
use crate::db::{repository, DatabaseError};
use crate::error::AppointmentError;
use crate::models::enums::EventAction;
use crate::models::AppointmentEvent;

/// Acknowledgement for a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    Cancelled,
    /// The appointment was already cancelled; nothing changed.
    AlreadyCancelled,
}

/// Cancel an appointment on behalf of its patient or an administrator.
///
/// Cancelling twice is not an error: the second call reports
/// `AlreadyCancelled` and leaves the row untouched. Completed
/// appointments cannot be cancelled.
pub fn cancel(
    conn: &mut Connection,
    appointment_id: &Uuid,
    requester: &Requester,
) -> Result<CancelOutcome, AppointmentError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let appt = repository::get_appointment(&tx, appointment_id)?
        .ok_or_else(|| AppointmentError::not_found("Appointment", appointment_id))?;

    check_cancel_access(requester, &appt).require("cancel this appointment")?;

    if appt.cancelled {
        tracing::debug!(appointment_id = %appointment_id, "Cancel on already-cancelled appointment");
        return Ok(CancelOutcome::AlreadyCancelled);
    }
    if appt.is_completed {
        return Err(AppointmentError::validation(
            "completed appointments cannot be cancelled",
        ));
    }

    if repository::mark_cancelled(&tx, appointment_id)? != 1 {
        return Err(DatabaseError::ConstraintViolation(format!(
            "appointment {appointment_id} changed during cancellation"
        ))
        .into());
    }
    repository::insert_event(&tx, &AppointmentEvent {
        appointment_id: *appointment_id,
        action: EventAction::Cancelled,
        actor_id: Some(requester.id),
        actor_role: Some(requester.role),
        detail: Some(format!("{} {}", appt.slot_date, appt.slot_time)),
        occurred_at: Local::now().naive_local(),
    })?;
    tx.commit()?;

    tracing::info!(
        appointment_id = %appointment_id,
        doctor_id = %appt.doctor_id,
        date = %appt.slot_date,
        time = %appt.slot_time,
        role = %requester.role,
        "Appointment cancelled, slot released"
    );
    Ok(CancelOutcome::Cancelled)
}

/// Permanently remove an appointment row. Administrators only.
///
/// The row removal and the `deleted` event commit together or not at all.
pub fn delete(
    conn: &mut Connection,
    appointment_id: &Uuid,
    requester: &Requester,
) -> Result<(), AppointmentError> {
    check_admin_access(requester).require("delete appointments")?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let appt = repository::get_appointment(&tx, appointment_id)?
        .ok_or_else(|| AppointmentError::not_found("Appointment", appointment_id))?;

    repository::delete_appointment(&tx, appointment_id)?;
    repository::insert_event(&tx, &AppointmentEvent {
        appointment_id: *appointment_id,
        action: EventAction::Deleted,
        actor_id: Some(requester.id),
        actor_role: Some(requester.role),
        detail: Some(format!("{} {} ({})", appt.slot_date, appt.slot_time, appt.status())),
        occurred_at: Local::now().naive_local(),
    })?;
    tx.commit()?;

    tracing::info!(
        appointment_id = %appointment_id,
        doctor_id = %appt.doctor_id,
        date = %appt.slot_date,
        time = %appt.slot_time,
        "Appointment deleted"
    );
    Ok(())
}
