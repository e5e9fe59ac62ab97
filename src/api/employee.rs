use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::core::error::AttendanceError;
use crate::core::face::{CHECK_IN_DESCRIPTOR_LEN, VERIFY_DESCRIPTOR_LEN};
use crate::utils::employee_cache;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFaceRequest {
    /// Enrolled descriptor; must be 512 (check-in contract) or 128
    /// (verify contract) values long.
    pub face_descriptor: Vec<f64>,
}

/// Employee directory lookup
#[utoipa::path(
    get,
    path = "/api/v1/employees/{id}",
    params(("id", description = "Employee ID")),
    responses(
        (status = 200, description = "Employee profile", body = Object, example = json!({
            "success": true,
            "data": {"id": 1, "employeeCode": "EMP-001", "firstName": "John", "lastName": "Doe"},
            "hasFaceDescriptor": true
        })),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    // Employees may read their own profile; HR/Admin may read anyone's.
    if auth.employee_id != Some(employee_id) {
        auth.require_hr_or_admin()?;
    }

    let employee = employee_cache::resolve(pool.get_ref(), employee_id).await?;
    let has_descriptor = employee.face_descriptor.is_some();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": employee,
        "hasFaceDescriptor": has_descriptor,
    })))
}

/// Register or replace an employee's face descriptor
#[utoipa::path(
    put,
    path = "/api/v1/employees/{id}/face",
    request_body = RegisterFaceRequest,
    params(("id", description = "Employee ID")),
    responses(
        (status = 200, description = "Descriptor registered"),
        (status = 400, description = "Malformed descriptor"),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn register_face(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<RegisterFaceRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    if auth.employee_id != Some(employee_id) {
        auth.require_hr_or_admin()?;
    }

    let descriptor = &payload.face_descriptor;
    let len = descriptor.len();
    if len != CHECK_IN_DESCRIPTOR_LEN && len != VERIFY_DESCRIPTOR_LEN {
        return Err(AttendanceError::Validation(format!(
            "descriptor must have {CHECK_IN_DESCRIPTOR_LEN} or {VERIFY_DESCRIPTOR_LEN} values, got {len}"
        ))
        .into());
    }
    if descriptor.iter().any(|v| !v.is_finite()) {
        return Err(
            AttendanceError::Validation("descriptor contains non-finite values".to_string())
                .into(),
        );
    }
    if descriptor.iter().all(|v| *v == 0.0) {
        return Err(
            AttendanceError::Validation("descriptor has zero magnitude".to_string()).into(),
        );
    }

    let raw = serde_json::to_string(descriptor).map_err(|e| {
        error!(error = %e, employee_id, "Failed to serialize descriptor");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let affected = sqlx::query(
        r#"
        UPDATE employees
        SET face_descriptor = ?, face_registered_at = NOW()
        WHERE id = ?
        "#,
    )
    .bind(&raw)
    .bind(employee_id)
    .execute(pool.get_ref())
    .await
    .map_err(AttendanceError::from)?
    .rows_affected();

    if affected == 0 {
        return Err(AttendanceError::NotFound("Employee".to_string()).into());
    }

    // Cached profile now carries a stale descriptor.
    employee_cache::invalidate(employee_id).await;

    info!(employee_id, dimension = len, "Face descriptor registered");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Face descriptor registered"
    })))
}
