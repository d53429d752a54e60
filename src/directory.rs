//! Doctor and patient directory.
//!
//! Doctors carry the consultation fee snapshotted into each booking and
//! the `available` switch that gates new bookings.

use chrono::Local;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppointmentError;
use crate::models::{Doctor, DoctorFilter, User};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    pub name: String,
    pub email: String,
    pub speciality: String,
    pub degree: Option<String>,
    #[serde(default)]
    pub experience_years: u32,
    pub fee: f64,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Partial profile edit. At least one field must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorProfileUpdate {
    pub fee: Option<f64>,
    pub available: Option<bool>,
}

fn require_text(value: &str, field: &str) -> Result<String, AppointmentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppointmentError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn require_email(value: &str) -> Result<String, AppointmentError> {
    let email = require_text(value, "email")?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppointmentError::validation(format!("'{email}' is not a valid email"))),
    }
}

fn require_fee(fee: f64) -> Result<f64, AppointmentError> {
    if fee.is_finite() && fee > 0.0 {
        Ok(fee)
    } else {
        Err(AppointmentError::validation(format!("fee {fee} must be positive")))
    }
}

pub fn add_doctor(conn: &Connection, new: &NewDoctor) -> Result<Doctor, AppointmentError> {
    let email = require_email(&new.email)?;
    let doctor = Doctor {
        id: Uuid::new_v4(),
        name: require_text(&new.name, "name")?,
        speciality: require_text(&new.speciality, "speciality")?,
        degree: new.degree.as_deref().map(str::trim).filter(|d| !d.is_empty()).map(String::from),
        experience_years: new.experience_years,
        fee: require_fee(new.fee)?,
        available: new.available,
        created_at: Local::now().naive_local(),
        email,
    };

    if repository::doctor_email_exists(conn, &doctor.email)? {
        return Err(AppointmentError::validation(format!(
            "a doctor with email {} already exists",
            doctor.email
        )));
    }
    repository::insert_doctor(conn, &doctor)?;

    tracing::info!(doctor_id = %doctor.id, speciality = %doctor.speciality, "Doctor added");
    Ok(doctor)
}

pub fn add_user(conn: &Connection, new: &NewUser) -> Result<User, AppointmentError> {
    let user = User {
        id: Uuid::new_v4(),
        name: require_text(&new.name, "name")?,
        email: require_email(&new.email)?,
        created_at: Local::now().naive_local(),
    };

    if repository::user_email_exists(conn, &user.email)? {
        return Err(AppointmentError::validation(format!(
            "a user with email {} already exists",
            user.email
        )));
    }
    repository::insert_user(conn, &user)?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok(user)
}

pub fn get_doctor(conn: &Connection, doctor_id: &Uuid) -> Result<Doctor, AppointmentError> {
    repository::get_doctor(conn, doctor_id)?.ok_or_else(|| AppointmentError::not_found("Doctor", doctor_id))
}

pub fn list_doctors(conn: &Connection, filter: &DoctorFilter) -> Result<Vec<Doctor>, AppointmentError> {
    Ok(repository::list_doctors(conn, filter)?)
}

/// Change fee and/or availability. A fee change applies to future
/// bookings only; existing appointments keep their snapshot.
pub fn update_doctor_profile(
    conn: &Connection,
    doctor_id: &Uuid,
    update: &DoctorProfileUpdate,
) -> Result<Doctor, AppointmentError> {
    if update.fee.is_none() && update.available.is_none() {
        return Err(AppointmentError::validation("no profile fields to update provided"));
    }
    let fee = update.fee.map(require_fee).transpose()?;

    if repository::update_doctor_profile(conn, doctor_id, fee, update.available)? == 0 {
        return Err(AppointmentError::not_found("Doctor", doctor_id));
    }

    let doctor = get_doctor(conn, doctor_id)?;
    tracing::info!(
        doctor_id = %doctor_id,
        fee = doctor.fee,
        available = doctor.available,
        "Doctor profile updated"
    );
    Ok(doctor)
}
