use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub speciality: String,
    pub degree: Option<String>,
    pub experience_years: u32,
    pub fee: f64,
    /// Gates every new booking for this doctor, independent of slot state.
    pub available: bool,
    pub created_at: NaiveDateTime,
}
