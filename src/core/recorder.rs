use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::core::error::AttendanceError;
use crate::core::face::FaceMatch;
use crate::core::geofence::GeoPoint;
use crate::core::workday::{
    EARLY_DEPARTURE_NOTE, WorkdayRules, format_working_time, worked_minutes,
};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, ValidationMethod};
use crate::utils::day_filter;

/// Everything known at the moment an employee checks in. Immutable; the
/// draft record is derived from it in one step and then persisted.
#[derive(Debug, Clone)]
pub struct CheckInEvent {
    pub employee_id: u64,
    pub user_id: u64,
    pub at: DateTime<Utc>,
    pub location: GeoPoint,
    pub address: Option<String>,
    pub accuracy: Option<f64>,
    pub device_info: Option<String>,
    pub notes: Option<String>,
    /// Present only for the face-and-location flow, already validated.
    pub verification: Option<FaceMatch>,
}

#[derive(Debug, Clone)]
pub struct CheckOutEvent {
    pub employee_id: u64,
    pub at: DateTime<Utc>,
    pub location: GeoPoint,
    pub address: Option<String>,
    pub accuracy: Option<f64>,
    pub notes: Option<String>,
}

/// A not-yet-persisted attendance record. Status, lateness and the
/// calendar date are fixed here, exactly once, from the check-in instant.
#[derive(Debug, Clone)]
pub struct DraftRecord {
    pub employee_id: u64,
    pub user_id: u64,
    pub calendar_date: DateTime<Utc>,
    pub check_in_time: DateTime<Utc>,
    pub check_in_latitude: f64,
    pub check_in_longitude: f64,
    pub check_in_address: Option<String>,
    pub check_in_accuracy: Option<f64>,
    pub status: AttendanceStatus,
    pub is_late: bool,
    pub late_minutes: u32,
    pub notes: Option<String>,
    pub device_info: Option<String>,
    pub validation_method: ValidationMethod,
    pub face_similarity: Option<f64>,
    pub face_threshold: Option<f64>,
    pub face_verified_at: Option<DateTime<Utc>>,
}

pub fn draft_record(event: &CheckInEvent, rules: &WorkdayRules) -> DraftRecord {
    let (status, is_late, late_minutes) = rules.derive_status(event.at);

    DraftRecord {
        employee_id: event.employee_id,
        user_id: event.user_id,
        calendar_date: rules.local_midnight_utc(event.at),
        check_in_time: event.at,
        check_in_latitude: event.location.latitude,
        check_in_longitude: event.location.longitude,
        check_in_address: event.address.clone(),
        check_in_accuracy: event.accuracy,
        status,
        is_late,
        late_minutes,
        notes: event.notes.clone(),
        device_info: event.device_info.clone(),
        validation_method: if event.verification.is_some() {
            ValidationMethod::FaceAndLocation
        } else {
            ValidationMethod::LocationOnly
        },
        face_similarity: event.verification.map(|v| v.similarity),
        face_threshold: event.verification.map(|v| v.threshold),
        face_verified_at: event.verification.map(|_| event.at),
    }
}

/// The fields a checkout writes. Derived purely from the open record and
/// the checkout event; the UPDATE applies it verbatim.
#[derive(Debug, Clone)]
pub struct CheckOutUpdate {
    pub check_out_time: DateTime<Utc>,
    pub working_minutes: u32,
    pub appended_note: Option<String>,
}

pub fn close_record(
    open: &AttendanceRecord,
    event: &CheckOutEvent,
    rules: &WorkdayRules,
) -> Result<CheckOutUpdate, AttendanceError> {
    if event.at <= open.check_in_time {
        return Err(AttendanceError::Validation(
            "check-out must be later than check-in".to_string(),
        ));
    }

    // Checkout never rewrites history: anything new is appended to the
    // notes the record already carries.
    let mut additions: Vec<&str> = Vec::new();
    if let Some(n) = event.notes.as_deref() {
        additions.push(n);
    }
    if rules.is_early_departure(event.at) {
        additions.push(EARLY_DEPARTURE_NOTE);
    }

    let appended_note = if additions.is_empty() {
        None
    } else {
        Some(match open.notes.as_deref() {
            Some(existing) => format!("{existing}; {}", additions.join("; ")),
            None => additions.join("; "),
        })
    };

    Ok(CheckOutUpdate {
        check_out_time: event.at,
        working_minutes: worked_minutes(open.check_in_time, event.at),
        appended_note,
    })
}

/// Worked-duration summary returned to the checkout caller.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkingTime {
    #[schema(example = 8)]
    pub hours: u32,
    #[schema(example = 45)]
    pub minutes: u32,
    #[schema(example = "08:45")]
    pub total: String,
    #[schema(example = 525)]
    pub total_minutes: u32,
}

impl WorkingTime {
    pub fn from_minutes(total_minutes: u32) -> Self {
        Self {
            hours: total_minutes / 60,
            minutes: total_minutes % 60,
            total: format_working_time(total_minutes),
            total_minutes,
        }
    }
}

/// Any record for the employee on the given local day, matched against both
/// the calendar_date column and the check_in_time column (defense against
/// rows written with inconsistent date semantics).
async fn find_record_for_day(
    pool: &MySqlPool,
    employee_id: u64,
    day_start: DateTime<Utc>,
) -> Result<Option<AttendanceRecord>, AttendanceError> {
    let day_end = day_start + Duration::hours(24);

    let record = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT * FROM attendance
        WHERE employee_id = ?
          AND (
                (calendar_date >= ? AND calendar_date < ?)
             OR (check_in_time >= ? AND check_in_time < ?)
          )
        ORDER BY check_in_time DESC
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .bind(day_start)
    .bind(day_end)
    .bind(day_start)
    .bind(day_end)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Pre-insert duplicate check. The unique key on (employee_id, calendar_date)
/// remains the authoritative backstop for races past this point.
pub async fn guard_duplicate_day(
    pool: &MySqlPool,
    employee_id: u64,
    day_start: DateTime<Utc>,
) -> Result<(), AttendanceError> {
    // Definite-negative from the in-memory filter skips the SELECT on the
    // common first-check-in-of-the-day path.
    if !day_filter::might_be_marked(employee_id, day_start) {
        return Ok(());
    }

    match find_record_for_day(pool, employee_id, day_start).await? {
        Some(existing) => Err(AttendanceError::AlreadyMarked {
            existing: Box::new(existing),
        }),
        None => Ok(()),
    }
}

async fn fetch_by_id(pool: &MySqlPool, id: u64) -> Result<AttendanceRecord, AttendanceError> {
    sqlx::query_as::<_, AttendanceRecord>("SELECT * FROM attendance WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AttendanceError::NotFound("Attendance record".to_string()))
}

/// NoRecordToday -> CheckedIn. The caller has already passed geofence and
/// (optionally) face verification.
pub async fn check_in(
    pool: &MySqlPool,
    rules: &WorkdayRules,
    event: CheckInEvent,
) -> Result<AttendanceRecord, AttendanceError> {
    let draft = draft_record(&event, rules);

    guard_duplicate_day(pool, draft.employee_id, draft.calendar_date).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO attendance
            (employee_id, user_id, calendar_date, check_in_time,
             check_in_latitude, check_in_longitude, check_in_address, check_in_accuracy,
             working_minutes, status, is_late, late_minutes,
             notes, device_info, validation_method,
             face_similarity, face_threshold, face_verified_at,
             is_manual_entry, manual_entry_reason)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?, ?, ?, ?, FALSE, NULL)
        "#,
    )
    .bind(draft.employee_id)
    .bind(draft.user_id)
    .bind(draft.calendar_date)
    .bind(draft.check_in_time)
    .bind(draft.check_in_latitude)
    .bind(draft.check_in_longitude)
    .bind(&draft.check_in_address)
    .bind(draft.check_in_accuracy)
    .bind(draft.status.as_ref())
    .bind(draft.is_late)
    .bind(draft.late_minutes)
    .bind(&draft.notes)
    .bind(&draft.device_info)
    .bind(draft.validation_method.as_ref())
    .bind(draft.face_similarity)
    .bind(draft.face_threshold)
    .bind(draft.face_verified_at)
    .execute(pool)
    .await;

    let inserted = match result {
        Ok(r) => r,
        Err(e) if AttendanceError::is_duplicate_key(&e) => {
            // Lost an insert race: the other request's row is the record.
            let existing = find_record_for_day(pool, draft.employee_id, draft.calendar_date)
                .await?
                .ok_or(AttendanceError::Persistence(e))?;
            return Err(AttendanceError::AlreadyMarked {
                existing: Box::new(existing),
            });
        }
        Err(e) => return Err(e.into()),
    };

    day_filter::mark(draft.employee_id, draft.calendar_date);

    fetch_by_id(pool, inserted.last_insert_id()).await
}

/// CheckedIn -> CheckedOut. One deterministic lookup: the most recent open
/// record within the lookback window, newest first.
pub async fn check_out(
    pool: &MySqlPool,
    rules: &WorkdayRules,
    lookback_hours: i64,
    event: CheckOutEvent,
) -> Result<(AttendanceRecord, WorkingTime), AttendanceError> {
    let since = event.at - Duration::hours(lookback_hours);

    let open = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT * FROM attendance
        WHERE employee_id = ?
          AND check_out_time IS NULL
          AND check_in_time >= ?
        ORDER BY check_in_time DESC
        LIMIT 1
        "#,
    )
    .bind(event.employee_id)
    .bind(since)
    .fetch_optional(pool)
    .await?;

    let open = match open {
        Some(r) => r,
        None => {
            // Distinguish "never checked in" from "already closed today".
            let today = rules.local_midnight_utc(event.at);
            return match find_record_for_day(pool, event.employee_id, today).await? {
                Some(r) if r.check_out_time.is_some() => Err(AttendanceError::AlreadyCheckedOut),
                _ => Err(AttendanceError::NoOpenRecord),
            };
        }
    };

    let update = close_record(&open, &event, rules)?;

    let affected = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out_time = ?,
            check_out_latitude = ?,
            check_out_longitude = ?,
            check_out_address = ?,
            check_out_accuracy = ?,
            working_minutes = ?,
            notes = COALESCE(?, notes)
        WHERE id = ? AND check_out_time IS NULL
        "#,
    )
    .bind(update.check_out_time)
    .bind(event.location.latitude)
    .bind(event.location.longitude)
    .bind(&event.address)
    .bind(event.accuracy)
    .bind(update.working_minutes)
    .bind(&update.appended_note)
    .bind(open.id)
    .execute(pool)
    .await?
    .rows_affected();

    // A concurrent checkout can win between the SELECT and the UPDATE.
    if affected == 0 {
        return Err(AttendanceError::AlreadyCheckedOut);
    }

    let record = fetch_by_id(pool, open.id).await?;
    let working_time = WorkingTime::from_minutes(update.working_minutes);
    Ok((record, working_time))
}

/// Today's record (local day containing `now`), if any.
pub async fn today(
    pool: &MySqlPool,
    rules: &WorkdayRules,
    employee_id: u64,
    now: DateTime<Utc>,
) -> Result<Option<AttendanceRecord>, AttendanceError> {
    find_record_for_day(pool, employee_id, rules.local_midnight_utc(now)).await
}

/// Administrative override. The only writer of status/notes after creation;
/// it never recomputes lateness.
pub struct AdminOverride {
    pub status: Option<AttendanceStatus>,
    pub notes: Option<String>,
    pub is_manual_entry: Option<bool>,
    pub manual_entry_reason: Option<String>,
    pub approved_by: u64,
}

pub async fn apply_override(
    pool: &MySqlPool,
    record_id: u64,
    patch: AdminOverride,
) -> Result<AttendanceRecord, AttendanceError> {
    // Ensure the row exists before patching, so a bad id is a clean 404.
    let current = fetch_by_id(pool, record_id).await?;

    sqlx::query(
        r#"
        UPDATE attendance
        SET status = COALESCE(?, status),
            notes = COALESCE(?, notes),
            is_manual_entry = COALESCE(?, is_manual_entry),
            manual_entry_reason = COALESCE(?, manual_entry_reason),
            approved_by = ?
        WHERE id = ?
        "#,
    )
    .bind(patch.status.map(|s| s.as_ref().to_string()))
    .bind(&patch.notes)
    .bind(patch.is_manual_entry)
    .bind(&patch.manual_entry_reason)
    .bind(patch.approved_by)
    .bind(current.id)
    .execute(pool)
    .await?;

    fetch_by_id(pool, record_id).await
}

pub async fn delete_record(pool: &MySqlPool, record_id: u64) -> Result<(), AttendanceError> {
    let record = fetch_by_id(pool, record_id).await?;

    sqlx::query("DELETE FROM attendance WHERE id = ?")
        .bind(record.id)
        .execute(pool)
        .await?;

    // Allow a fresh check-in for the freed day.
    day_filter::unmark(record.employee_id, record.calendar_date);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::workday::test_rules;
    use chrono::{FixedOffset, TimeZone};

    fn local(h: u32, mi: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(330 * 60)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 6, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn event_at(at: DateTime<Utc>) -> CheckInEvent {
        CheckInEvent {
            employee_id: 1000,
            user_id: 7,
            at,
            location: GeoPoint {
                latitude: 23.8103,
                longitude: 90.4125,
            },
            address: Some("Head office".to_string()),
            accuracy: Some(12.5),
            device_info: Some("android/13".to_string()),
            notes: None,
            verification: None,
        }
    }

    fn open_record(draft: DraftRecord) -> AttendanceRecord {
        AttendanceRecord {
            id: 1,
            employee_id: draft.employee_id,
            user_id: draft.user_id,
            calendar_date: draft.calendar_date,
            check_in_time: draft.check_in_time,
            check_in_latitude: draft.check_in_latitude,
            check_in_longitude: draft.check_in_longitude,
            check_in_address: draft.check_in_address,
            check_in_accuracy: draft.check_in_accuracy,
            check_out_time: None,
            check_out_latitude: None,
            check_out_longitude: None,
            check_out_address: None,
            check_out_accuracy: None,
            working_minutes: 0,
            status: draft.status,
            is_late: draft.is_late,
            late_minutes: draft.late_minutes,
            notes: draft.notes,
            approved_by: None,
            device_info: draft.device_info,
            validation_method: draft.validation_method,
            face_similarity: draft.face_similarity,
            face_threshold: draft.face_threshold,
            face_verified_at: draft.face_verified_at,
            is_manual_entry: false,
            manual_entry_reason: None,
        }
    }

    #[test]
    fn draft_fixes_status_and_calendar_date_once() {
        let rules = test_rules();
        let draft = draft_record(&event_at(local(10, 1)), &rules);

        assert_eq!(draft.status, AttendanceStatus::Late);
        assert!(draft.is_late);
        assert_eq!(draft.late_minutes, 1);
        assert_eq!(draft.calendar_date, rules.local_midnight_utc(draft.check_in_time));
        assert_eq!(draft.validation_method, ValidationMethod::LocationOnly);
        assert!(draft.face_similarity.is_none());
    }

    #[test]
    fn draft_records_face_verification_detail() {
        let mut event = event_at(local(9, 0));
        event.verification = Some(FaceMatch {
            similarity: 0.83,
            threshold: 0.6,
            matched: true,
        });
        let draft = draft_record(&event, &test_rules());

        assert_eq!(draft.validation_method, ValidationMethod::FaceAndLocation);
        assert_eq!(draft.face_similarity, Some(0.83));
        assert_eq!(draft.face_threshold, Some(0.6));
        assert_eq!(draft.face_verified_at, Some(event.at));
    }

    #[test]
    fn closing_computes_minutes_and_flags_early_departure() {
        let rules = test_rules();
        let open = open_record(draft_record(&event_at(local(9, 0)), &rules));

        let out = CheckOutEvent {
            employee_id: 1000,
            at: local(17, 45),
            location: open_location(),
            address: None,
            accuracy: None,
            notes: None,
        };
        let update = close_record(&open, &out, &rules).unwrap();

        assert_eq!(update.working_minutes, 525); // 09:00 -> 17:45
        assert_eq!(update.appended_note.as_deref(), Some(EARLY_DEPARTURE_NOTE));
    }

    #[test]
    fn closing_at_or_after_day_end_adds_no_note() {
        let rules = test_rules();
        let open = open_record(draft_record(&event_at(local(9, 0)), &rules));

        let out = CheckOutEvent {
            employee_id: 1000,
            at: local(19, 0),
            location: open_location(),
            address: None,
            accuracy: None,
            notes: None,
        };
        let update = close_record(&open, &out, &rules).unwrap();
        assert!(update.appended_note.is_none());
        assert_eq!(update.working_minutes, 600);
    }

    #[test]
    fn early_note_is_appended_to_caller_notes() {
        let rules = test_rules();
        let open = open_record(draft_record(&event_at(local(9, 0)), &rules));

        let out = CheckOutEvent {
            employee_id: 1000,
            at: local(16, 0),
            location: open_location(),
            address: None,
            accuracy: None,
            notes: Some("doctor appointment".to_string()),
        };
        let update = close_record(&open, &out, &rules).unwrap();
        let note = update.appended_note.unwrap();
        assert!(note.starts_with("doctor appointment"));
        assert!(note.ends_with(EARLY_DEPARTURE_NOTE));
    }

    #[test]
    fn check_in_notes_survive_checkout() {
        let rules = test_rules();
        let mut event = event_at(local(9, 0));
        event.notes = Some("client visit first".to_string());
        let open = open_record(draft_record(&event, &rules));

        let out = CheckOutEvent {
            employee_id: 1000,
            at: local(16, 0),
            location: open_location(),
            address: None,
            accuracy: None,
            notes: None,
        };
        let note = close_record(&open, &out, &rules)
            .unwrap()
            .appended_note
            .unwrap();
        assert_eq!(note, format!("client visit first; {EARLY_DEPARTURE_NOTE}"));
    }

    #[test]
    fn checkout_before_checkin_is_rejected() {
        let rules = test_rules();
        let open = open_record(draft_record(&event_at(local(9, 0)), &rules));

        let out = CheckOutEvent {
            employee_id: 1000,
            at: local(8, 0),
            location: open_location(),
            address: None,
            accuracy: None,
            notes: None,
        };
        assert!(matches!(
            close_record(&open, &out, &rules),
            Err(AttendanceError::Validation(_))
        ));
    }

    #[test]
    fn working_time_breaks_down_minutes() {
        let wt = WorkingTime::from_minutes(525);
        assert_eq!(wt.hours, 8);
        assert_eq!(wt.minutes, 45);
        assert_eq!(wt.total, "08:45");
        assert_eq!(wt.total_minutes, 525);
    }

    fn open_location() -> GeoPoint {
        GeoPoint {
            latitude: 23.8103,
            longitude: 90.4125,
        }
    }
}
