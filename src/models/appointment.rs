use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AppointmentStatus, EventAction, Role};

/// One bookable clinic interval. `time` is always canonical `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_date: NaiveDate,
    pub slot_time: String,
    /// Doctor's fee at booking time; not re-derived later.
    pub amount: f64,
    pub cancelled: bool,
    pub is_completed: bool,
    pub payment: bool,
    pub created_at: NaiveDateTime,
}

impl Appointment {
    /// A fresh, unpaid, scheduled appointment for `slot`.
    pub fn scheduled(user_id: Uuid, slot: &SlotKey, amount: f64, created_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            doctor_id: slot.doctor_id,
            slot_date: slot.date,
            slot_time: slot.time.clone(),
            amount,
            cancelled: false,
            is_completed: false,
            payment: false,
            created_at,
        }
    }

    pub fn status(&self) -> AppointmentStatus {
        if self.cancelled {
            AppointmentStatus::Cancelled
        } else if self.is_completed {
            AppointmentStatus::Completed
        } else {
            AppointmentStatus::Scheduled
        }
    }

    pub fn slot(&self) -> SlotKey {
        SlotKey {
            doctor_id: self.doctor_id,
            date: self.slot_date,
            time: self.slot_time.clone(),
        }
    }
}

/// Appointment joined with the names a patient, doctor or admin list shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentView {
    pub appointment: Appointment,
    pub status: AppointmentStatus,
    pub doctor_name: String,
    pub doctor_speciality: String,
    pub patient_name: String,
    pub patient_email: String,
}

/// One row of an appointment's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentEvent {
    pub appointment_id: Uuid,
    pub action: EventAction,
    pub actor_id: Option<Uuid>,
    pub actor_role: Option<Role>,
    pub detail: Option<String>,
    pub occurred_at: NaiveDateTime,
}
