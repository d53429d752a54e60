use chrono::NaiveDate;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct AppointmentFilter {
    pub doctor_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    /// Canonical `HH:MM`.
    pub time: Option<String>,
    pub speciality: Option<String>,
    pub include_cancelled: bool,
}

#[derive(Debug, Default)]
pub struct DoctorFilter {
    pub speciality: Option<String>,
    pub available_only: bool,
}
