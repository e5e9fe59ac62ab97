use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// How the check-in was validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValidationMethod {
    LocationOnly,
    FaceAndLocation,
}

/// Day-level outcome stored on the record. Derived once at check-in;
/// Absent and WorkFromHome are only ever set by an admin override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    HalfDay,
    Absent,
    WorkFromHome,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 1,
    "employeeId": 1000,
    "userId": 7,
    "calendarDate": "2026-01-05T18:30:00Z",
    "checkInTime": "2026-01-06T04:05:00Z",
    "checkInLatitude": 23.8103,
    "checkInLongitude": 90.4125,
    "status": "present",
    "isLate": false,
    "lateMinutes": 0,
    "workingMinutes": 0,
    "validationMethod": "location_only"
}))]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1000)]
    pub employee_id: u64,

    #[schema(example = 7)]
    pub user_id: u64,

    /// Local-midnight instant of the check-in day, stored as UTC.
    #[schema(example = "2026-01-05T18:30:00Z", value_type = String, format = "date-time")]
    pub calendar_date: DateTime<Utc>,

    #[schema(example = "2026-01-06T04:05:00Z", value_type = String, format = "date-time")]
    pub check_in_time: DateTime<Utc>,
    pub check_in_latitude: f64,
    pub check_in_longitude: f64,
    pub check_in_address: Option<String>,
    pub check_in_accuracy: Option<f64>,

    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub check_out_time: Option<DateTime<Utc>>,
    pub check_out_latitude: Option<f64>,
    pub check_out_longitude: Option<f64>,
    pub check_out_address: Option<String>,
    pub check_out_accuracy: Option<f64>,

    /// 0 until checkout.
    pub working_minutes: u32,

    #[sqlx(try_from = "String")]
    #[schema(example = "present")]
    pub status: AttendanceStatus,
    pub is_late: bool,
    pub late_minutes: u32,

    pub notes: Option<String>,
    pub approved_by: Option<u64>,
    pub device_info: Option<String>,

    #[sqlx(try_from = "String")]
    #[schema(example = "location_only")]
    pub validation_method: ValidationMethod,

    pub face_similarity: Option<f64>,
    pub face_threshold: Option<f64>,
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub face_verified_at: Option<DateTime<Utc>>,

    pub is_manual_entry: bool,
    pub manual_entry_reason: Option<String>,
}

impl TryFrom<String> for AttendanceStatus {
    type Error = strum::ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<String> for ValidationMethod {
    type Error = strum::ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_db_strings() {
        assert_eq!(AttendanceStatus::HalfDay.as_ref(), "half_day");
        assert_eq!(
            "work_from_home".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::WorkFromHome
        );
        assert_eq!(
            ValidationMethod::FaceAndLocation.as_ref(),
            "face_and_location"
        );
    }
}
