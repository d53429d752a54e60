//! Appointment access rules.
//!
//! Identity and role come from the caller's auth layer as an explicit
//! `Requester` value; nothing here reads ambient state.
//!
//! Cascade, checked in order, default-deny:
//! 1. Administrator → ALLOW (any appointment)
//! 2. Owning patient → ALLOW (cancel only)
//! 3. Assigned doctor → ALLOW (complete only)
//! 4. Default → DENY

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppointmentError;
use crate::models::enums::Role;
use crate::models::Appointment;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Who is asking, as established by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: Uuid,
    pub role: Role,
}

impl Requester {
    pub fn user(id: Uuid) -> Self {
        Self { id, role: Role::User }
    }

    pub fn doctor(id: Uuid) -> Self {
        Self { id, role: Role::Doctor }
    }

    pub fn admin(id: Uuid) -> Self {
        Self { id, role: Role::Admin }
    }
}

/// Why access was granted (or denied).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    Administrator,
    OwnAppointment,
    AssignedDoctor,
    Denied,
}

/// Result of an authorization check.
#[derive(Debug, Clone, Copy)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self { allowed: true, reason }
    }

    fn deny() -> Self {
        Self {
            allowed: false,
            reason: AccessReason::Denied,
        }
    }

    /// Turn a denial into `Forbidden` naming the attempted action.
    pub fn require(self, action: &str) -> Result<AccessReason, AppointmentError> {
        if self.allowed {
            Ok(self.reason)
        } else {
            Err(AppointmentError::Forbidden(format!("not allowed to {action}")))
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Checks
// ═══════════════════════════════════════════════════════════

/// Cancel: the patient who booked it, or an administrator.
pub fn check_cancel_access(requester: &Requester, appt: &Appointment) -> AccessDecision {
    if requester.role == Role::Admin {
        return AccessDecision::allow(AccessReason::Administrator);
    }
    if requester.role == Role::User && requester.id == appt.user_id {
        return AccessDecision::allow(AccessReason::OwnAppointment);
    }
    AccessDecision::deny()
}

/// Complete: the doctor the appointment is with, or an administrator.
pub fn check_complete_access(requester: &Requester, appt: &Appointment) -> AccessDecision {
    if requester.role == Role::Admin {
        return AccessDecision::allow(AccessReason::Administrator);
    }
    if requester.role == Role::Doctor && requester.id == appt.doctor_id {
        return AccessDecision::allow(AccessReason::AssignedDoctor);
    }
    AccessDecision::deny()
}

/// Hard delete and administrative edits.
pub fn check_admin_access(requester: &Requester) -> AccessDecision {
    if requester.role == Role::Admin {
        AccessDecision::allow(AccessReason::Administrator)
    } else {
        AccessDecision::deny()
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
