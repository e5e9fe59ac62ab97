use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::model::attendance::AttendanceRecord;

/// Everything the attendance core can refuse to do, with the payload the
/// boundary needs to explain itself. Converted to a structured
/// `{"success": false, ...}` body by the ResponseError impl below.
#[derive(Debug, Display)]
pub enum AttendanceError {
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(
        fmt = "You are {:.0}m away from the office. Allowed radius is {:.0}m",
        distance_meters,
        radius_meters
    )]
    Geofence {
        distance_meters: f64,
        radius_meters: f64,
    },

    #[display(
        fmt = "Face verification failed: similarity {:.4} below threshold {:.2}",
        similarity,
        threshold
    )]
    FaceMismatch { similarity: f64, threshold: f64 },

    #[display(fmt = "No face descriptor registered for this employee")]
    NoFaceRegistered,

    #[display(fmt = "Attendance already marked for today")]
    AlreadyMarked { existing: Box<AttendanceRecord> },

    #[display(fmt = "Already checked out for today")]
    AlreadyCheckedOut,

    #[display(fmt = "No open check-in found to check out from")]
    NoOpenRecord,

    #[display(fmt = "{} not found", _0)]
    NotFound(String),

    #[display(fmt = "Not authorized for this operation")]
    Authorization,

    #[display(fmt = "Internal Server Error")]
    Persistence(sqlx::Error),
}

impl From<sqlx::Error> for AttendanceError {
    fn from(e: sqlx::Error) -> Self {
        AttendanceError::Persistence(e)
    }
}

impl AttendanceError {
    /// MySQL signals a duplicate key as SQLSTATE 23000. A losing racer on
    /// the (employee_id, calendar_date) unique key must surface as the same
    /// AlreadyMarked the pre-check produces, never as a 500.
    pub fn is_duplicate_key(e: &sqlx::Error) -> bool {
        matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23000"))
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::Validation(_)
            | AttendanceError::Geofence { .. }
            | AttendanceError::FaceMismatch { .. }
            | AttendanceError::NoFaceRegistered
            | AttendanceError::AlreadyMarked { .. }
            | AttendanceError::AlreadyCheckedOut => StatusCode::BAD_REQUEST,
            AttendanceError::NoOpenRecord | AttendanceError::NotFound(_) => StatusCode::NOT_FOUND,
            AttendanceError::Authorization => StatusCode::FORBIDDEN,
            AttendanceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "success": false,
            "message": self.to_string(),
        });

        match self {
            AttendanceError::Geofence {
                distance_meters,
                radius_meters,
            } => {
                body["distanceMeters"] = json!((distance_meters * 100.0).round() / 100.0);
                body["allowedRadiusMeters"] = json!(radius_meters);
            }
            AttendanceError::FaceMismatch {
                similarity,
                threshold,
            } => {
                body["similarity"] = json!(format!("{similarity:.4}"));
                body["threshold"] = json!(threshold);
            }
            AttendanceError::AlreadyMarked { existing } => {
                body["existingRecord"] = json!(existing);
            }
            AttendanceError::Persistence(e) => {
                // Internal detail stays in the log, never in the response.
                tracing::error!(error = %e, "attendance persistence failure");
            }
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    /// Minimal driver error carrying just a SQLSTATE, enough to exercise
    /// the duplicate-key remap without a live database.
    #[derive(Debug)]
    struct StubDbError(&'static str);

    impl fmt::Display for StubDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "SQLSTATE {}", self.0)
        }
    }

    impl StdError for StubDbError {}

    impl sqlx::error::DatabaseError for StubDbError {
        fn message(&self) -> &str {
            "stub database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    fn db_error(sqlstate: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(StubDbError(sqlstate)))
    }

    #[test]
    fn duplicate_key_predicate_matches_only_sqlstate_23000() {
        // The losing side of two concurrent check-ins hits the unique key
        // and must be remapped to AlreadyMarked, never surfaced as a 500.
        assert!(AttendanceError::is_duplicate_key(&db_error("23000")));

        // Any other SQLSTATE or error variant stays a persistence failure.
        assert!(!AttendanceError::is_duplicate_key(&db_error("42S02")));
        assert!(!AttendanceError::is_duplicate_key(&db_error("40001")));
        assert!(!AttendanceError::is_duplicate_key(&sqlx::Error::PoolClosed));
        assert!(!AttendanceError::is_duplicate_key(
            &sqlx::Error::RowNotFound
        ));
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            AttendanceError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AttendanceError::Geofence {
                distance_meters: 512.3,
                radius_meters: 200.0
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AttendanceError::NoOpenRecord.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AttendanceError::NotFound("Employee".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AttendanceError::Authorization.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AttendanceError::Persistence(sqlx::Error::PoolClosed).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn geofence_message_carries_distance() {
        let e = AttendanceError::Geofence {
            distance_meters: 512.3,
            radius_meters: 200.0,
        };
        let msg = e.to_string();
        assert!(msg.contains("512"), "{msg}");
        assert!(msg.contains("200"), "{msg}");
    }

    #[test]
    fn persistence_message_never_leaks_detail() {
        let e = AttendanceError::Persistence(sqlx::Error::RowNotFound);
        assert_eq!(e.to_string(), "Internal Server Error");
    }
}
