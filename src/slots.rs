//! Slot availability: clinic-hours policy plus the ledger's live bookings.
//!
//! Availability is always derived from the `appointments` table. There is
//! no per-doctor booked-slot cache to drift out of sync with the ledger.
//!
//! Everything here is read-only and safe to call concurrently with
//! bookings and cancellations.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository::{self, DATE_FORMAT};
use crate::error::AppointmentError;

// ═══════════════════════════════════════════════════════════
// Clinic hours
// ═══════════════════════════════════════════════════════════

/// Opening hours: closed Sunday, short day Saturday, fixed slot length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicHours {
    pub open_hour: u32,
    /// Exclusive: the last slot ends at this hour.
    pub weekday_close_hour: u32,
    pub saturday_close_hour: u32,
    pub slot_minutes: u32,
}

impl Default for ClinicHours {
    fn default() -> Self {
        Self {
            open_hour: 8,
            weekday_close_hour: 16,
            saturday_close_hour: 12,
            slot_minutes: 30,
        }
    }
}

impl ClinicHours {
    pub fn validate(&self) -> Result<(), String> {
        if self.slot_minutes == 0 || 60 % self.slot_minutes != 0 {
            return Err(format!(
                "slot length {} must be a positive divisor of 60 minutes",
                self.slot_minutes
            ));
        }
        for (label, close) in [
            ("weekday", self.weekday_close_hour),
            ("saturday", self.saturday_close_hour),
        ] {
            if close > 24 || close <= self.open_hour {
                return Err(format!(
                    "{label} closing hour {close} must be after opening hour {} and at most 24",
                    self.open_hour
                ));
            }
        }
        Ok(())
    }

    /// Opening window in minutes after midnight, `None` on closed days.
    fn window_minutes(&self, date: NaiveDate) -> Option<(u32, u32)> {
        let close_hour = match date.weekday() {
            Weekday::Sun => return None,
            Weekday::Sat => self.saturday_close_hour,
            _ => self.weekday_close_hour,
        };
        Some((self.open_hour * 60, close_hour * 60))
    }

    /// Every slot start time for `date`, ascending. Empty on closed days.
    pub fn candidate_times(&self, date: NaiveDate) -> Vec<NaiveTime> {
        let Some((open, close)) = self.window_minutes(date) else {
            return Vec::new();
        };
        if self.slot_minutes == 0 {
            return Vec::new();
        }
        (open..close)
            .step_by(self.slot_minutes as usize)
            .filter_map(|minute| NaiveTime::from_hms_opt(minute / 60, minute % 60, 0))
            .collect()
    }

    /// Whether `time` is one of the clinic's slot starts on `date`.
    pub fn is_slot_start(&self, date: NaiveDate, time: NaiveTime) -> bool {
        let Some((open, close)) = self.window_minutes(date) else {
            return false;
        };
        if self.slot_minutes == 0 || time.second() != 0 {
            return false;
        }
        let minute = time.hour() * 60 + time.minute();
        minute >= open && minute < close && (minute - open) % self.slot_minutes == 0
    }
}

// ═══════════════════════════════════════════════════════════
// Slot parsing
// ═══════════════════════════════════════════════════════════

/// Accepts `HH:MM` (24h) or `h:mm AM/PM`.
pub fn parse_slot_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&raw.to_uppercase(), "%I:%M %p"))
        .ok()
}

/// Canonical storage form of a slot time.
pub fn format_slot_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub fn parse_slot_date(raw: &str) -> Result<NaiveDate, AppointmentError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| AppointmentError::validation(format!("slotDate '{raw}' is not a YYYY-MM-DD date")))
}

/// Parses `raw` and checks it against the clinic schedule for `date`.
/// Returns the canonical `HH:MM` form.
pub fn validate_slot_time(hours: &ClinicHours, date: NaiveDate, raw: &str) -> Result<String, AppointmentError> {
    let time = parse_slot_time(raw)
        .ok_or_else(|| AppointmentError::validation(format!("slotTime '{raw}' is not a valid time")))?;
    if !hours.is_slot_start(date, time) {
        return Err(AppointmentError::validation(format!(
            "{} on {} ({}) is not a clinic slot",
            format_slot_time(time),
            date,
            date.weekday()
        )));
    }
    Ok(format_slot_time(time))
}

// ═══════════════════════════════════════════════════════════
// Resolver
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub time: String,
    pub available: bool,
}

/// Candidate slots for a doctor on `date`, each marked available or not.
///
/// A slot is unavailable when its start lies before `now` or a live
/// appointment already holds it.
pub fn resolve_day(
    conn: &Connection,
    hours: &ClinicHours,
    doctor_id: &Uuid,
    date: NaiveDate,
    now: NaiveDateTime,
) -> Result<Vec<SlotAvailability>, AppointmentError> {
    if repository::get_doctor(conn, doctor_id)?.is_none() {
        return Err(AppointmentError::not_found("Doctor", doctor_id));
    }

    let candidates = hours.candidate_times(date);
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let booked: HashSet<String> = repository::booked_times(conn, doctor_id, &date)?
        .into_iter()
        .collect();

    Ok(candidates
        .into_iter()
        .map(|time| {
            let label = format_slot_time(time);
            let past = date.and_time(time) < now;
            SlotAvailability {
                available: !past && !booked.contains(&label),
                time: label,
            }
        })
        .collect())
}

/// Times held by live appointments for a doctor on `date`.
pub fn booked_slots(conn: &Connection, doctor_id: &Uuid, date: NaiveDate) -> Result<Vec<String>, AppointmentError> {
    if repository::get_doctor(conn, doctor_id)?.is_none() {
        return Err(AppointmentError::not_found("Doctor", doctor_id));
    }
    Ok(repository::booked_times(conn, doctor_id, &date)?)
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
