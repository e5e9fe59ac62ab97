use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 1,
        "employeeCode": "EMP-001",
        "firstName": "John",
        "lastName": "Doe",
        "email": "john.doe@company.com",
        "departmentId": 10,
        "jobTitleId": 3,
        "hireDate": "2024-01-01",
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = 10)]
    pub department_id: u64,

    #[schema(example = 3)]
    pub job_title_id: u64,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub hire_date: NaiveDate,

    #[schema(example = "active")]
    pub status: String,

    /// Registered face descriptor, JSON array of floats. Never exposed in
    /// directory responses; consumed only by the face matcher.
    #[serde(skip_serializing)]
    pub face_descriptor: Option<String>,

    #[serde(skip_serializing)]
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub face_registered_at: Option<DateTime<Utc>>,
}

impl Employee {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Parses the stored JSON descriptor. None when nothing is registered.
    pub fn registered_descriptor(&self) -> Option<Vec<f64>> {
        self.face_descriptor
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}
