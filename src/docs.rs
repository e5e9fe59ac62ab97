use crate::api::attendance::{
    CheckInRequest, CheckOutRequest, LocationDto, OverrideRequest, VerifyFaceRequest,
};
use crate::api::employee::RegisterFaceRequest;
use crate::core::geofence::GeoPoint;
use crate::core::recorder::WorkingTime;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, ValidationMethod};
use crate::model::employee::Employee;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Core API",
        version = "1.0.0",
        description = r#"
## Geofenced Attendance Service

This API records employee daily attendance through geofenced check-in and
check-out, optionally gated by face-descriptor verification.

### 🔹 Key Features
- **Geofenced Check-in / Check-out**
  - Great-circle distance against the fixed office geofence
- **Face Verification**
  - Cosine-similarity matching against the registered descriptor
- **Status Derivation**
  - Present / Late / Half Day derived once at check-in
- **One Record Per Day**
  - Duplicate prevention backed by a storage uniqueness constraint

### 🔐 Security
All endpoints are protected using **JWT Bearer authentication** issued by
the companion auth service. Administrative overrides require **Admin** or
**HR** roles.

### 📦 Response Format
- JSON-based RESTful responses with a `success` flag

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::verify_face,
        crate::api::attendance::override_record,
        crate::api::attendance::delete_record,

        crate::api::employee::get_employee,
        crate::api::employee::register_face
    ),
    components(
        schemas(
            LocationDto,
            CheckInRequest,
            CheckOutRequest,
            VerifyFaceRequest,
            OverrideRequest,
            RegisterFaceRequest,
            AttendanceRecord,
            AttendanceStatus,
            ValidationMethod,
            WorkingTime,
            GeoPoint,
            Employee
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance recording APIs"),
        (name = "Employee", description = "Employee directory APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
