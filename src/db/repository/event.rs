use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::{EventAction, Role};
use crate::models::*;

/// Appends one history row. Call inside the transaction that performs
/// the mutation so the event commits or rolls back with it.
pub fn insert_event(conn: &Connection, event: &AppointmentEvent) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointment_events (appointment_id, action, actor_id, actor_role, detail, occurred_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.appointment_id.to_string(),
            event.action.as_str(),
            event.actor_id.map(|id| id.to_string()),
            event.actor_role.map(|role| role.as_str()),
            event.detail,
            format_datetime(&event.occurred_at),
        ],
    )?;
    Ok(())
}

/// History for one appointment, oldest first.
pub fn list_events(conn: &Connection, appointment_id: &Uuid) -> Result<Vec<AppointmentEvent>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT appointment_id, action, actor_id, actor_role, detail, occurred_at
         FROM appointment_events WHERE appointment_id = ?1
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![appointment_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut events = Vec::new();
    for row in rows {
        let (appointment_id, action, actor_id, actor_role, detail, occurred_at) = row?;
        events.push(AppointmentEvent {
            appointment_id: parse_uuid(&appointment_id)?,
            action: EventAction::from_str(&action)?,
            actor_id: actor_id.as_deref().map(parse_uuid).transpose()?,
            actor_role: actor_role.as_deref().map(Role::from_str).transpose()?,
            detail,
            occurred_at: parse_datetime(&occurred_at)?,
        });
    }
    Ok(events)
}

pub fn count_events(conn: &Connection, appointment_id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM appointment_events WHERE appointment_id = ?1",
        params![appointment_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}
