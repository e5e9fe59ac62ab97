use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::core::error::AttendanceError;
use crate::core::face::FaceMatcher;
use crate::core::geofence::{GeoPoint, GeofenceValidator};
use crate::core::recorder::{self, AdminOverride, CheckInEvent, CheckOutEvent};
use crate::core::workday::WorkdayRules;
use crate::model::attendance::AttendanceStatus;
use crate::utils::{employee_cache, notify};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationDto {
    #[schema(example = 23.8103)]
    pub latitude: f64,
    #[schema(example = 90.4125)]
    pub longitude: f64,
    #[schema(example = "Head office, Gulshan-1")]
    pub address: Option<String>,
    /// GPS accuracy in meters as reported by the device.
    #[schema(example = 12.5)]
    pub accuracy: Option<f64>,
}

impl LocationDto {
    /// Type/shape errors are serde's job; this only rejects out-of-range
    /// or non-finite coordinates.
    fn validated(&self) -> Result<GeoPoint, AttendanceError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AttendanceError::Validation(
                "latitude must be between -90 and 90".to_string(),
            ));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AttendanceError::Validation(
                "longitude must be between -180 and 180".to_string(),
            ));
        }
        Ok(GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub location: LocationDto,
    #[schema(example = "android/13; app 2.4.1")]
    pub device_info: Option<String>,
    pub notes: Option<String>,
    /// 512-value descriptor; presence selects the face-and-location flow.
    pub face_descriptor: Option<Vec<f64>>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutRequest {
    pub location: LocationDto,
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyFaceRequest {
    /// 128-value descriptor; this contract is not interchangeable with the
    /// 512-value check-in one.
    pub face_descriptor: Vec<f64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
    #[schema(example = "work_from_home")]
    pub status: Option<AttendanceStatus>,
    pub notes: Option<String>,
    pub is_manual_entry: Option<bool>,
    pub manual_entry_reason: Option<String>,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Checked in successfully", body = Object, example = json!({
            "success": true,
            "message": "Checked in successfully",
            "validation": {"location": true, "face": true, "distanceMeters": 34.2, "similarity": "0.8317"}
        })),
        (status = 400, description = "Outside geofence, face mismatch, or already marked"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "attendance_check_in", skip(auth, pool, config, payload), fields(user_id = auth.user_id))]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CheckInRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_id()?;
    let point = payload.location.validated()?;

    // 1. Geofence
    let fence = GeofenceValidator::from_config(&config).check(point);
    if !fence.within_radius {
        return Err(AttendanceError::Geofence {
            distance_meters: fence.distance_meters,
            radius_meters: fence.radius_meters,
        }
        .into());
    }

    let employee = employee_cache::resolve(pool.get_ref(), employee_id).await?;

    // 2. Face verification, only for the biometric flow
    let verification = match &payload.face_descriptor {
        Some(submitted) => {
            let registered = employee
                .registered_descriptor()
                .ok_or(AttendanceError::NoFaceRegistered)?;

            let outcome = FaceMatcher::for_check_in(&config).compare(submitted, &registered)?;
            if !outcome.matched {
                return Err(AttendanceError::FaceMismatch {
                    similarity: outcome.similarity,
                    threshold: outcome.threshold,
                }
                .into());
            }
            Some(outcome)
        }
        None => None,
    };

    // 3. Duplicate guard + persist
    let rules = WorkdayRules::from_config(&config);
    let event = CheckInEvent {
        employee_id,
        user_id: auth.user_id,
        at: chrono::Utc::now(),
        location: point,
        address: payload.location.address.clone(),
        accuracy: payload.location.accuracy,
        device_info: payload.device_info.clone(),
        notes: payload.notes.clone(),
        verification,
    };
    let record = recorder::check_in(pool.get_ref(), &rules, event).await?;

    info!(employee_id, record_id = record.id, status = %record.status, "Checked in");

    // 4. Fire-and-forget notification
    notify::emit(
        pool.get_ref(),
        notify::Notification::check_in(
            auth.user_id,
            record.id,
            &employee.display_name(),
            record.check_in_time,
        ),
    );

    let mut validation = json!({
        "location": true,
        "distanceMeters": (fence.distance_meters * 100.0).round() / 100.0,
    });
    if let Some(v) = verification {
        validation["face"] = json!(true);
        validation["similarity"] = json!(format!("{:.4}", v.similarity));
    }

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Checked in successfully",
        "data": record,
        "validation": validation,
    })))
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/v1/attendance/check-out",
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "success": true,
            "message": "Checked out successfully",
            "workingTime": {"hours": 8, "minutes": 45, "total": "08:45", "totalMinutes": 525}
        })),
        (status = 400, description = "Outside geofence or already checked out"),
        (status = 404, description = "No open check-in found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "attendance_check_out", skip(auth, pool, config, payload), fields(user_id = auth.user_id))]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CheckOutRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_id()?;
    let point = payload.location.validated()?;

    let fence = GeofenceValidator::from_config(&config).check(point);
    if !fence.within_radius {
        return Err(AttendanceError::Geofence {
            distance_meters: fence.distance_meters,
            radius_meters: fence.radius_meters,
        }
        .into());
    }

    let rules = WorkdayRules::from_config(&config);
    let event = CheckOutEvent {
        employee_id,
        at: chrono::Utc::now(),
        location: point,
        address: payload.location.address.clone(),
        accuracy: payload.location.accuracy,
        notes: payload.notes.clone(),
    };
    let (record, working_time) =
        recorder::check_out(pool.get_ref(), &rules, config.checkout_lookback_hours, event).await?;

    info!(
        employee_id,
        record_id = record.id,
        total_minutes = working_time.total_minutes,
        "Checked out"
    );

    if let Ok(employee) = employee_cache::resolve(pool.get_ref(), employee_id).await {
        notify::emit(
            pool.get_ref(),
            notify::Notification::check_out(
                auth.user_id,
                record.id,
                &employee.display_name(),
                &working_time.total,
            ),
        );
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Checked out successfully",
        "data": record,
        "workingTime": working_time,
    })))
}

/// Today's attendance state for the calling employee
#[utoipa::path(
    get,
    path = "/api/v1/attendance/today",
    responses(
        (status = 200, description = "Today's state", body = Object, example = json!({
            "success": true,
            "hasCheckedIn": true,
            "hasCheckedOut": false
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_id()?;

    let rules = WorkdayRules::from_config(&config);
    let record = recorder::today(pool.get_ref(), &rules, employee_id, chrono::Utc::now()).await?;

    let (has_in, has_out) = match &record {
        Some(r) => (true, r.check_out_time.is_some()),
        None => (false, false),
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "hasCheckedIn": has_in,
        "hasCheckedOut": has_out,
        "data": record,
    })))
}

/// Standalone face verification (no attendance side effects)
#[utoipa::path(
    post,
    path = "/api/v1/attendance/verify-face",
    request_body = VerifyFaceRequest,
    responses(
        (status = 200, description = "Verification outcome", body = Object, example = json!({
            "match": true,
            "similarity": "0.8317"
        })),
        (status = 400, description = "Malformed descriptor or none registered"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn verify_face(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<VerifyFaceRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_id()?;

    let employee = employee_cache::resolve(pool.get_ref(), employee_id).await?;
    let registered = employee
        .registered_descriptor()
        .ok_or(AttendanceError::NoFaceRegistered)?;

    let outcome =
        FaceMatcher::for_verify(&config).compare(&payload.face_descriptor, &registered)?;

    // Verify-only reports the result; a miss is not an error here.
    Ok(HttpResponse::Ok().json(json!({
        "match": outcome.matched,
        "similarity": format!("{:.4}", outcome.similarity),
    })))
}

/// Administrative override of a record's status, notes or manual-entry flag
#[utoipa::path(
    patch,
    path = "/api/v1/attendance/{id}",
    request_body = OverrideRequest,
    params(("id", description = "Attendance record ID")),
    responses(
        (status = 200, description = "Record updated"),
        (status = 404, description = "Record not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn override_record(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<OverrideRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let record = recorder::apply_override(
        pool.get_ref(),
        path.into_inner(),
        AdminOverride {
            status: payload.status,
            notes: payload.notes.clone(),
            is_manual_entry: payload.is_manual_entry,
            manual_entry_reason: payload.manual_entry_reason.clone(),
            approved_by: auth.user_id,
        },
    )
    .await?;

    info!(record_id = record.id, approved_by = auth.user_id, "Attendance record overridden");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Attendance record updated",
        "data": record,
    })))
}

/// Administrative delete of an attendance record
#[utoipa::path(
    delete,
    path = "/api/v1/attendance/{id}",
    params(("id", description = "Attendance record ID")),
    responses(
        (status = 200, description = "Record deleted"),
        (status = 404, description = "Record not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn delete_record(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let record_id = path.into_inner();
    recorder::delete_record(pool.get_ref(), record_id).await?;

    info!(record_id, deleted_by = auth.user_id, "Attendance record deleted");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Attendance record deleted"
    })))
}
