//! Shared clinic state for request handlers.
//!
//! `ClinicState` is wrapped in `Arc` and shared across request threads.
//! It holds no connection: every call opens its own, so concurrent
//! requests contend only inside SQLite, where `BEGIN IMMEDIATE` and the
//! slot uniqueness index decide the winner.

use std::path::{Path, PathBuf};

use chrono::Local;
use rusqlite::Connection;
use uuid::Uuid;

use crate::authorization::Requester;
use crate::booking::{self, BookingRequest};
use crate::cancellation::{self, CancelOutcome};
use crate::config::ClinicSettings;
use crate::db::{self, DatabaseError};
use crate::directory::{self, DoctorProfileUpdate, NewDoctor, NewUser};
use crate::error::AppointmentError;
use crate::ledger;
use crate::lifecycle::{self, AppointmentUpdate};
use crate::models::{Appointment, AppointmentEvent, AppointmentFilter, AppointmentView, Doctor, DoctorFilter, User};
use crate::slots::{self, SlotAvailability};

pub struct ClinicState {
    db_path: PathBuf,
    settings: ClinicSettings,
}

impl ClinicState {
    /// Open (creating if needed) the database file at `db_path` and bring
    /// its schema up to date. The parent directory must exist.
    pub fn open(db_path: &Path, settings: ClinicSettings) -> Result<Self, DatabaseError> {
        let conn = db::open_database(db_path, settings.busy_timeout())?;
        drop(conn);

        tracing::info!(path = %db_path.display(), "Clinic database ready");
        Ok(Self {
            db_path: db_path.to_path_buf(),
            settings,
        })
    }

    pub fn settings(&self) -> &ClinicSettings {
        &self.settings
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// One connection per unit of work.
    pub fn open_db(&self) -> Result<Connection, AppointmentError> {
        Ok(db::connect_database(&self.db_path, self.settings.busy_timeout())?)
    }

    // ── Availability ────────────────────────────────────────

    /// Slot grid for `doctor_id` on `date`, relative to the current local time.
    pub fn day_slots(&self, doctor_id: &Uuid, date: &str) -> Result<Vec<SlotAvailability>, AppointmentError> {
        let date = slots::parse_slot_date(date)?;
        let conn = self.open_db()?;
        slots::resolve_day(&conn, &self.settings.hours, doctor_id, date, Local::now().naive_local())
    }

    pub fn booked_slots(&self, doctor_id: &Uuid, date: &str) -> Result<Vec<String>, AppointmentError> {
        let date = slots::parse_slot_date(date)?;
        ledger::booked_slots(&self.open_db()?, doctor_id, date)
    }

    // ── Booking and cancellation ────────────────────────────

    pub fn book(&self, user_id: Uuid, request: &BookingRequest) -> Result<Appointment, AppointmentError> {
        booking::book(&mut self.open_db()?, &self.settings.hours, user_id, request)
    }

    pub fn cancel(&self, appointment_id: &Uuid, requester: &Requester) -> Result<CancelOutcome, AppointmentError> {
        cancellation::cancel(&mut self.open_db()?, appointment_id, requester)
    }

    pub fn delete(&self, appointment_id: &Uuid, requester: &Requester) -> Result<(), AppointmentError> {
        cancellation::delete(&mut self.open_db()?, appointment_id, requester)
    }

    // ── Lifecycle ───────────────────────────────────────────

    pub fn complete(&self, appointment_id: &Uuid, requester: &Requester) -> Result<Appointment, AppointmentError> {
        lifecycle::complete(&mut self.open_db()?, appointment_id, requester)
    }

    pub fn record_payment(&self, appointment_id: &Uuid) -> Result<Appointment, AppointmentError> {
        lifecycle::record_payment(&mut self.open_db()?, appointment_id)
    }

    pub fn update_appointment(
        &self,
        appointment_id: &Uuid,
        requester: &Requester,
        update: &AppointmentUpdate,
    ) -> Result<Appointment, AppointmentError> {
        lifecycle::update_appointment(&mut self.open_db()?, &self.settings.hours, appointment_id, requester, update)
    }

    pub fn appointment_history(&self, appointment_id: &Uuid) -> Result<Vec<AppointmentEvent>, AppointmentError> {
        ledger::appointment_history(&self.open_db()?, appointment_id)
    }

    // ── Listings ────────────────────────────────────────────

    pub fn list_for_user(&self, user_id: &Uuid) -> Result<Vec<AppointmentView>, AppointmentError> {
        ledger::list_for_user(&self.open_db()?, user_id)
    }

    pub fn list_for_doctor(&self, doctor_id: &Uuid) -> Result<Vec<AppointmentView>, AppointmentError> {
        ledger::list_for_doctor(&self.open_db()?, doctor_id)
    }

    pub fn list_appointments(
        &self,
        requester: &Requester,
        filter: &AppointmentFilter,
    ) -> Result<Vec<AppointmentView>, AppointmentError> {
        ledger::list_appointments(&self.open_db()?, requester, filter)
    }

    // ── Directory ───────────────────────────────────────────

    pub fn add_doctor(&self, new: &NewDoctor) -> Result<Doctor, AppointmentError> {
        directory::add_doctor(&self.open_db()?, new)
    }

    pub fn add_user(&self, new: &NewUser) -> Result<User, AppointmentError> {
        directory::add_user(&self.open_db()?, new)
    }

    pub fn get_doctor(&self, doctor_id: &Uuid) -> Result<Doctor, AppointmentError> {
        directory::get_doctor(&self.open_db()?, doctor_id)
    }

    pub fn list_doctors(&self, filter: &DoctorFilter) -> Result<Vec<Doctor>, AppointmentError> {
        directory::list_doctors(&self.open_db()?, filter)
    }

    pub fn update_doctor_profile(
        &self,
        doctor_id: &Uuid,
        update: &DoctorProfileUpdate,
    ) -> Result<Doctor, AppointmentError> {
        directory::update_doctor_profile(&self.open_db()?, doctor_id, update)
    }
}
