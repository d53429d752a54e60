use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const DOCTOR_COLUMNS: &str =
    "id, name, email, speciality, degree, experience_years, fee, available, created_at";

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, name, email, speciality, degree, experience_years, fee, available, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            doctor.id.to_string(),
            doctor.name,
            doctor.email,
            doctor.speciality,
            doctor.degree,
            doctor.experience_years,
            doctor.fee,
            doctor.available,
            format_datetime(&doctor.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Option<Doctor>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1"),
            params![id.to_string()],
            doctor_row_from_rusqlite,
        )
        .optional()?;
    row.map(doctor_from_row).transpose()
}

pub fn list_doctors(conn: &Connection, filter: &DoctorFilter) -> Result<Vec<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors
         WHERE (?1 IS NULL OR LOWER(speciality) = LOWER(?1))
           AND (?2 = 0 OR available = 1)
         ORDER BY name ASC"
    ))?;

    let rows = stmt.query_map(
        params![filter.speciality, filter.available_only],
        |row| Ok(doctor_row_from_rusqlite(row)),
    )?;

    let mut doctors = Vec::new();
    for row in rows {
        doctors.push(doctor_from_row(row??)?);
    }
    Ok(doctors)
}

pub fn doctor_email_exists(conn: &Connection, email: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM doctors WHERE LOWER(email) = LOWER(?1)",
        params![email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Applies the provided profile fields. Returns the number of rows touched.
pub fn update_doctor_profile(
    conn: &Connection,
    id: &Uuid,
    fee: Option<f64>,
    available: Option<bool>,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE doctors
         SET fee = COALESCE(?2, fee),
             available = COALESCE(?3, available)
         WHERE id = ?1",
        params![id.to_string(), fee, available],
    )?;
    Ok(changed)
}

struct DoctorRow {
    id: String,
    name: String,
    email: String,
    speciality: String,
    degree: Option<String>,
    experience_years: u32,
    fee: f64,
    available: bool,
    created_at: String,
}

fn doctor_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<DoctorRow, rusqlite::Error> {
    Ok(DoctorRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        speciality: row.get(3)?,
        degree: row.get(4)?,
        experience_years: row.get(5)?,
        fee: row.get(6)?,
        available: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn doctor_from_row(row: DoctorRow) -> Result<Doctor, DatabaseError> {
    Ok(Doctor {
        id: parse_uuid(&row.id)?,
        name: row.name,
        email: row.email,
        speciality: row.speciality,
        degree: row.degree,
        experience_years: row.experience_years,
        fee: row.fee,
        available: row.available,
        created_at: parse_datetime(&row.created_at)?,
    })
}
