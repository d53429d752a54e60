//! Post-booking transitions: completion, payment, and administrative edits.
//!
//! Scheduled → Completed is terminal and exclusive with Cancelled.
//! Rescheduling moves a live appointment to another slot under the same
//! uniqueness guarantee as a fresh booking.

use chrono::Local;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authorization::{check_admin_access, check_complete_access, Requester};
use crate::booking::slot_taken;
use crate::db::repository;
use crate::error::AppointmentError;
use crate::models::enums::EventAction;
use crate::models::{Appointment, AppointmentEvent, SlotKey};
use crate::slots::{parse_slot_date, validate_slot_time, ClinicHours};

/// Administrative edit. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentUpdate {
    pub slot_date: Option<String>,
    pub slot_time: Option<String>,
    pub amount: Option<f64>,
}

impl AppointmentUpdate {
    fn is_empty(&self) -> bool {
        self.slot_date.is_none() && self.slot_time.is_none() && self.amount.is_none()
    }

    fn moves_slot(&self) -> bool {
        self.slot_date.is_some() || self.slot_time.is_some()
    }
}

fn load(conn: &Connection, appointment_id: &Uuid) -> Result<Appointment, AppointmentError> {
    repository::get_appointment(conn, appointment_id)?
        .ok_or_else(|| AppointmentError::not_found("Appointment", appointment_id))
}

/// Mark an appointment as clinically completed. Idempotent.
pub fn complete(
    conn: &mut Connection,
    appointment_id: &Uuid,
    requester: &Requester,
) -> Result<Appointment, AppointmentError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let appt = load(&tx, appointment_id)?;

    check_complete_access(requester, &appt).require("complete this appointment")?;

    if appt.cancelled {
        return Err(AppointmentError::validation(
            "cancelled appointments cannot be completed",
        ));
    }
    if appt.is_completed {
        return Ok(appt);
    }

    repository::mark_completed(&tx, appointment_id)?;
    repository::insert_event(&tx, &AppointmentEvent {
        appointment_id: *appointment_id,
        action: EventAction::Completed,
        actor_id: Some(requester.id),
        actor_role: Some(requester.role),
        detail: None,
        occurred_at: Local::now().naive_local(),
    })?;
    let updated = load(&tx, appointment_id)?;
    tx.commit()?;

    tracing::info!(appointment_id = %appointment_id, "Appointment completed");
    Ok(updated)
}

/// Record that the appointment fee has been paid. Cancelled
/// appointments are not valid for payment.
pub fn record_payment(conn: &mut Connection, appointment_id: &Uuid) -> Result<Appointment, AppointmentError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let appt = load(&tx, appointment_id)?;

    if appt.cancelled {
        return Err(AppointmentError::validation(
            "cancelled appointments are not valid for payment",
        ));
    }
    if appt.payment {
        return Ok(appt);
    }

    repository::mark_paid(&tx, appointment_id)?;
    repository::insert_event(&tx, &AppointmentEvent {
        appointment_id: *appointment_id,
        action: EventAction::Paid,
        actor_id: None,
        actor_role: None,
        detail: Some(format!("{:.2}", appt.amount)),
        occurred_at: Local::now().naive_local(),
    })?;
    let updated = load(&tx, appointment_id)?;
    tx.commit()?;

    tracing::info!(appointment_id = %appointment_id, amount = appt.amount, "Payment recorded");
    Ok(updated)
}

/// Administrative edit of date, time and/or amount.
///
/// Moving to a slot held by another live appointment fails with
/// `SlotTaken` and changes nothing.
pub fn update_appointment(
    conn: &mut Connection,
    hours: &ClinicHours,
    appointment_id: &Uuid,
    requester: &Requester,
    update: &AppointmentUpdate,
) -> Result<Appointment, AppointmentError> {
    check_admin_access(requester).require("edit appointments")?;

    if update.is_empty() {
        return Err(AppointmentError::validation("no fields to update provided"));
    }
    if let Some(amount) = update.amount {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AppointmentError::validation(format!("amount {amount} must be positive")));
        }
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let appt = load(&tx, appointment_id)?;
    let now = Local::now().naive_local();

    if update.moves_slot() {
        if appt.cancelled || appt.is_completed {
            return Err(AppointmentError::validation(format!(
                "{} appointments cannot be rescheduled",
                appt.status()
            )));
        }

        let date = match update.slot_date.as_deref() {
            Some(raw) => parse_slot_date(raw)?,
            None => appt.slot_date,
        };
        let time = validate_slot_time(
            hours,
            date,
            update.slot_time.as_deref().unwrap_or(&appt.slot_time),
        )?;
        let target = SlotKey {
            doctor_id: appt.doctor_id,
            date,
            time,
        };

        if target != appt.slot() {
            if repository::find_active_by_slot(&tx, &target)?.is_some() {
                return Err(slot_taken(&target));
            }
            repository::update_slot(&tx, appointment_id, &target.date, &target.time).map_err(|e| {
                if e.is_unique_violation() {
                    slot_taken(&target)
                } else {
                    e.into()
                }
            })?;
            repository::insert_event(&tx, &AppointmentEvent {
                appointment_id: *appointment_id,
                action: EventAction::Rescheduled,
                actor_id: Some(requester.id),
                actor_role: Some(requester.role),
                detail: Some(format!(
                    "{} {} -> {} {}",
                    appt.slot_date, appt.slot_time, target.date, target.time
                )),
                occurred_at: now,
            })?;
        }
    }

    if let Some(amount) = update.amount {
        repository::update_amount(&tx, appointment_id, amount)?;
        repository::insert_event(&tx, &AppointmentEvent {
            appointment_id: *appointment_id,
            action: EventAction::Amended,
            actor_id: Some(requester.id),
            actor_role: Some(requester.role),
            detail: Some(format!("amount {:.2} -> {:.2}", appt.amount, amount)),
            occurred_at: now,
        })?;
    }

    let updated = load(&tx, appointment_id)?;
    tx.commit()?;

    tracing::info!(
        appointment_id = %appointment_id,
        date = %updated.slot_date,
        time = %updated.slot_time,
        amount = updated.amount,
        "Appointment updated by administrator"
    );
    Ok(updated)
}

/// History of an appointment, oldest first. Still available after a
/// hard delete.
pub fn appointment_history(conn: &Connection, appointment_id: &Uuid) -> Result<Vec<AppointmentEvent>, AppointmentError> {
    let events = repository::list_events(conn, appointment_id)?;
    if events.is_empty() && repository::get_appointment(conn, appointment_id)?.is_none() {
        return Err(AppointmentError::not_found("Appointment", appointment_id));
    }
    Ok(events)
}
