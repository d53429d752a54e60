use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_datetime, parse_date, parse_datetime, parse_uuid, DATE_FORMAT};
use crate::db::DatabaseError;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str = "a.id, a.user_id, a.doctor_id, a.slot_date, a.slot_time, a.amount,
     a.cancelled, a.is_completed, a.payment, a.created_at";

/// Inserts a new ledger row.
///
/// Fails with a UNIQUE violation (see `DatabaseError::is_unique_violation`)
/// when another live appointment already holds the same slot.
pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, user_id, doctor_id, slot_date, slot_time, amount,
         cancelled, is_completed, payment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            appt.id.to_string(),
            appt.user_id.to_string(),
            appt.doctor_id.to_string(),
            appt.slot_date.format(DATE_FORMAT).to_string(),
            appt.slot_time,
            appt.amount,
            appt.cancelled,
            appt.is_completed,
            appt.payment,
            format_datetime(&appt.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?1"),
            params![id.to_string()],
            appointment_row_from_rusqlite,
        )
        .optional()?;
    row.map(appointment_from_row).transpose()
}

/// The live (non-cancelled) appointment holding `slot`, if any.
pub fn find_active_by_slot(conn: &Connection, slot: &SlotKey) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments a
                 WHERE a.doctor_id = ?1 AND a.slot_date = ?2 AND a.slot_time = ?3 AND a.cancelled = 0"
            ),
            params![
                slot.doctor_id.to_string(),
                slot.date.format(DATE_FORMAT).to_string(),
                slot.time,
            ],
            appointment_row_from_rusqlite,
        )
        .optional()?;
    row.map(appointment_from_row).transpose()
}

/// Times already held by live appointments for a doctor on a date, ascending.
pub fn booked_times(conn: &Connection, doctor_id: &Uuid, date: &NaiveDate) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT slot_time FROM appointments
         WHERE doctor_id = ?1 AND slot_date = ?2 AND cancelled = 0
         ORDER BY slot_time ASC",
    )?;
    let rows = stmt.query_map(
        params![doctor_id.to_string(), date.format(DATE_FORMAT).to_string()],
        |row| row.get::<_, String>(0),
    )?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Sets `cancelled` on a scheduled appointment. Returns rows touched
/// (0 when already cancelled, completed, or missing).
pub fn mark_cancelled(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET cancelled = 1
         WHERE id = ?1 AND cancelled = 0 AND is_completed = 0",
        params![id.to_string()],
    )?;
    Ok(changed)
}

pub fn mark_completed(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET is_completed = 1
         WHERE id = ?1 AND cancelled = 0 AND is_completed = 0",
        params![id.to_string()],
    )?;
    Ok(changed)
}

pub fn mark_paid(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET payment = 1 WHERE id = ?1 AND cancelled = 0",
        params![id.to_string()],
    )?;
    Ok(changed)
}

/// Moves a live appointment to another slot of the same doctor.
pub fn update_slot(conn: &Connection, id: &Uuid, date: &NaiveDate, time: &str) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET slot_date = ?2, slot_time = ?3
         WHERE id = ?1 AND cancelled = 0",
        params![id.to_string(), date.format(DATE_FORMAT).to_string(), time],
    )?;
    Ok(changed)
}

pub fn update_amount(conn: &Connection, id: &Uuid, amount: f64) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET amount = ?2 WHERE id = ?1",
        params![id.to_string(), amount],
    )?;
    Ok(changed)
}

pub fn delete_appointment(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
    let deleted = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id.to_string()])?;
    Ok(deleted)
}

/// Appointments joined with doctor and patient names, newest slot first.
pub fn list_appointment_views(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<AppointmentView>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS}, d.name, d.speciality, u.name, u.email
         FROM appointments a
         JOIN doctors d ON a.doctor_id = d.id
         JOIN users u ON a.user_id = u.id
         WHERE (?1 IS NULL OR a.doctor_id = ?1)
           AND (?2 IS NULL OR a.user_id = ?2)
           AND (?3 IS NULL OR a.slot_date = ?3)
           AND (?4 IS NULL OR a.slot_time = ?4)
           AND (?5 IS NULL OR LOWER(d.speciality) = LOWER(?5))
           AND (?6 = 1 OR a.cancelled = 0)
         ORDER BY a.slot_date DESC, a.slot_time DESC"
    ))?;

    let rows = stmt.query_map(
        params![
            filter.doctor_id.map(|id| id.to_string()),
            filter.user_id.map(|id| id.to_string()),
            filter.date.map(|d| d.format(DATE_FORMAT).to_string()),
            filter.time,
            filter.speciality,
            filter.include_cancelled,
        ],
        |row| {
            Ok((
                appointment_row_from_rusqlite(row),
                row.get::<_, String>(10)?,
                row.get::<_, String>(11)?,
                row.get::<_, String>(12)?,
                row.get::<_, String>(13)?,
            ))
        },
    )?;

    let mut views = Vec::new();
    for row in rows {
        let (appt_row, doctor_name, doctor_speciality, patient_name, patient_email) = row?;
        let appointment = appointment_from_row(appt_row?)?;
        views.push(AppointmentView {
            status: appointment.status(),
            appointment,
            doctor_name,
            doctor_speciality,
            patient_name,
            patient_email,
        });
    }
    Ok(views)
}

struct AppointmentRow {
    id: String,
    user_id: String,
    doctor_id: String,
    slot_date: String,
    slot_time: String,
    amount: f64,
    cancelled: bool,
    is_completed: bool,
    payment: bool,
    created_at: String,
}

fn appointment_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<AppointmentRow, rusqlite::Error> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        doctor_id: row.get(2)?,
        slot_date: row.get(3)?,
        slot_time: row.get(4)?,
        amount: row.get(5)?,
        cancelled: row.get(6)?,
        is_completed: row.get(7)?,
        payment: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid(&row.id)?,
        user_id: parse_uuid(&row.user_id)?,
        doctor_id: parse_uuid(&row.doctor_id)?,
        slot_date: parse_date(&row.slot_date)?,
        slot_time: row.slot_time,
        amount: row.amount,
        cancelled: row.cancelled,
        is_completed: row.is_completed,
        payment: row.payment,
        created_at: parse_datetime(&row.created_at)?,
    })
}
