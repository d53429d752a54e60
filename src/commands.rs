//! Command-line surface over `ClinicState`.
//!
//! Each subcommand maps to one clinic operation and prints its result as
//! JSON on stdout. Identity is passed explicitly with `--as <role>` and
//! `--actor <id>`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::authorization::Requester;
use crate::booking::BookingRequest;
use crate::clinic_state::ClinicState;
use crate::directory::{DoctorProfileUpdate, NewDoctor, NewUser};
use crate::error::AppointmentError;
use crate::lifecycle::AppointmentUpdate;
use crate::models::enums::Role;
use crate::models::{AppointmentFilter, DoctorFilter};
use crate::slots::{format_slot_time, parse_slot_date, parse_slot_time};

#[derive(Debug, Parser)]
#[command(name = "orion-health")]
#[command(version, about = "Clinic appointment slots, bookings and cancellations", long_about = None)]
pub struct Cli {
    /// Database file (defaults to ~/OrionHealth/clinic.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Settings file (defaults to ~/OrionHealth/settings.json)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Who is acting, as asserted by the caller.
#[derive(Debug, Args)]
pub struct ActorArgs {
    #[arg(long = "as", default_value = "user")]
    pub role: Role,

    #[arg(long)]
    pub actor: Uuid,
}

impl ActorArgs {
    fn requester(&self) -> Requester {
        Requester {
            id: self.actor,
            role: self.role,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the slot grid for a doctor on a date
    Slots {
        #[arg(long)]
        doctor: Uuid,
        #[arg(long)]
        date: String,
        /// Only list times already held by live appointments
        #[arg(long)]
        booked: bool,
    },

    /// Book a slot for a patient
    Book {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        doctor: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: String,
    },

    /// Cancel an appointment (owning patient or admin)
    Cancel {
        appointment: Uuid,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Permanently remove an appointment (admin)
    Delete {
        appointment: Uuid,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Mark an appointment completed (assigned doctor or admin)
    Complete {
        appointment: Uuid,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Record payment for an appointment
    Pay { appointment: Uuid },

    /// Move an appointment or change its amount (admin)
    Update {
        appointment: Uuid,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// List appointments for a patient, a doctor, or the whole clinic (admin)
    Appointments {
        #[arg(long, conflicts_with = "doctor")]
        user: Option<Uuid>,
        #[arg(long)]
        doctor: Option<Uuid>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        speciality: Option<String>,
        /// Include cancelled appointments in the clinic-wide listing
        #[arg(long)]
        all: bool,
        #[arg(long = "as")]
        role: Option<Role>,
        #[arg(long)]
        actor: Option<Uuid>,
    },

    /// History of one appointment, oldest first
    History { appointment: Uuid },

    /// List doctors
    Doctors {
        #[arg(long)]
        speciality: Option<String>,
        #[arg(long)]
        available: bool,
    },

    /// Register a doctor
    AddDoctor {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        speciality: String,
        #[arg(long)]
        fee: f64,
        #[arg(long)]
        degree: Option<String>,
        #[arg(long, default_value_t = 0)]
        experience: u32,
    },

    /// Register a patient
    AddUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },

    /// Change a doctor's fee or availability
    UpdateDoctor {
        doctor: Uuid,
        #[arg(long)]
        fee: Option<f64>,
        #[arg(long)]
        available: Option<bool>,
    },
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Appointment(#[from] AppointmentError),

    #[error("Cannot encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, CommandError> {
    Ok(serde_json::to_value(value)?)
}

fn appointment_filter(
    doctor: Option<Uuid>,
    date: Option<String>,
    time: Option<String>,
    speciality: Option<String>,
    include_cancelled: bool,
) -> Result<AppointmentFilter, AppointmentError> {
    Ok(AppointmentFilter {
        doctor_id: doctor,
        user_id: None,
        date: date.as_deref().map(parse_slot_date).transpose()?,
        time: time
            .as_deref()
            .map(|raw| {
                parse_slot_time(raw)
                    .map(format_slot_time)
                    .ok_or_else(|| AppointmentError::validation(format!("slotTime '{raw}' is not a valid time")))
            })
            .transpose()?,
        speciality,
        include_cancelled,
    })
}

/// Run one command against the clinic and return its JSON result.
pub fn execute(state: &ClinicState, command: Command) -> Result<Value, CommandError> {
    match command {
        Command::Slots { doctor, date, booked } => {
            if booked {
                to_json(&state.booked_slots(&doctor, &date)?)
            } else {
                to_json(&state.day_slots(&doctor, &date)?)
            }
        }
        Command::Book { user, doctor, date, time } => {
            let request = BookingRequest {
                doctor_id: Some(doctor),
                slot_date: Some(date),
                slot_time: Some(time),
            };
            to_json(&state.book(user, &request)?)
        }
        Command::Cancel { appointment, actor } => {
            let outcome = state.cancel(&appointment, &actor.requester())?;
            Ok(json!({ "appointmentId": appointment, "outcome": outcome }))
        }
        Command::Delete { appointment, actor } => {
            state.delete(&appointment, &actor.requester())?;
            Ok(json!({ "appointmentId": appointment, "deleted": true }))
        }
        Command::Complete { appointment, actor } => to_json(&state.complete(&appointment, &actor.requester())?),
        Command::Pay { appointment } => to_json(&state.record_payment(&appointment)?),
        Command::Update { appointment, date, time, amount, actor } => {
            let update = AppointmentUpdate {
                slot_date: date,
                slot_time: time,
                amount,
            };
            to_json(&state.update_appointment(&appointment, &actor.requester(), &update)?)
        }
        Command::Appointments { user, doctor, date, time, speciality, all, role, actor } => {
            if let Some(user_id) = user {
                return to_json(&state.list_for_user(&user_id)?);
            }
            let filtered = date.is_some() || time.is_some() || speciality.is_some() || all;
            match (doctor, actor) {
                (Some(doctor_id), None) if !filtered => to_json(&state.list_for_doctor(&doctor_id)?),
                (_, Some(id)) => {
                    let requester = Requester {
                        id,
                        role: role.unwrap_or(Role::User),
                    };
                    let filter = appointment_filter(doctor, date, time, speciality, all)?;
                    to_json(&state.list_appointments(&requester, &filter)?)
                }
                _ => Err(AppointmentError::validation(
                    "clinic-wide listing requires --as admin --actor <id>",
                )
                .into()),
            }
        }
        Command::History { appointment } => to_json(&state.appointment_history(&appointment)?),
        Command::Doctors { speciality, available } => {
            let filter = DoctorFilter {
                speciality,
                available_only: available,
            };
            to_json(&state.list_doctors(&filter)?)
        }
        Command::AddDoctor { name, email, speciality, fee, degree, experience } => {
            let new = NewDoctor {
                name,
                email,
                speciality,
                degree,
                experience_years: experience,
                fee,
                available: true,
            };
            to_json(&state.add_doctor(&new)?)
        }
        Command::AddUser { name, email } => to_json(&state.add_user(&NewUser { name, email })?),
        Command::UpdateDoctor { doctor, fee, available } => {
            to_json(&state.update_doctor_profile(&doctor, &DoctorProfileUpdate { fee, available })?)
        }
    }
}
