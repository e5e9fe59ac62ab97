use chrono::{DateTime, FixedOffset, NaiveTime, Timelike, Utc};

use crate::config::Config;
use crate::model::attendance::AttendanceStatus;

/// Fixed text appended when an employee checks out before the workday ends.
pub const EARLY_DEPARTURE_NOTE: &str = "Early departure before office closing time";

/// The lateness/half-day rule set as named values, built once from Config.
#[derive(Debug, Clone, Copy)]
pub struct WorkdayRules {
    /// Fixed local offset from UTC, in minutes (330 = UTC+5:30).
    pub tz_offset_minutes: i32,
    /// Minutes from local midnight after which a check-in counts as late.
    pub work_start_minutes: u32,
    /// Lateness beyond this many minutes downgrades the day to HalfDay.
    pub half_day_late_minutes: u32,
    /// Minutes from local midnight; checking out earlier earns a note.
    pub workday_end_minutes: u32,
}

impl WorkdayRules {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tz_offset_minutes: config.tz_offset_minutes,
            work_start_minutes: config.work_start_minutes,
            half_day_late_minutes: config.half_day_late_minutes,
            workday_end_minutes: config.workday_end_minutes,
        }
    }

    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.tz_offset_minutes * 60)
            .expect("tz offset out of range")
    }

    /// Minutes elapsed since local midnight at the given instant.
    fn local_minutes(&self, at: DateTime<Utc>) -> u32 {
        let local = at.with_timezone(&self.offset());
        local.hour() * 60 + local.minute()
    }

    /// The local-midnight instant of `at`'s local calendar day, as UTC.
    /// This is what the `calendar_date` column stores.
    pub fn local_midnight_utc(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let local = at.with_timezone(&self.offset());
        local
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_local_timezone(self.offset())
            .unwrap()
            .with_timezone(&Utc)
    }

    /// Status, is_late and late_minutes from the check-in instant alone.
    /// Applied exactly once, when the record is created.
    pub fn derive_status(&self, check_in: DateTime<Utc>) -> (AttendanceStatus, bool, u32) {
        let minutes = self.local_minutes(check_in);
        if minutes <= self.work_start_minutes {
            return (AttendanceStatus::Present, false, 0);
        }
        let late_minutes = minutes - self.work_start_minutes;
        if late_minutes > self.half_day_late_minutes {
            (AttendanceStatus::HalfDay, true, late_minutes)
        } else {
            (AttendanceStatus::Late, true, late_minutes)
        }
    }

    pub fn is_early_departure(&self, check_out: DateTime<Utc>) -> bool {
        self.local_minutes(check_out) < self.workday_end_minutes
    }
}

/// Worked duration in whole minutes, rounded to nearest.
pub fn worked_minutes(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> u32 {
    let seconds = (check_out - check_in).num_seconds().max(0);
    ((seconds as f64) / 60.0).round() as u32
}

/// "HH:MM" rendering of a minute total, for checkout responses.
pub fn format_working_time(total_minutes: u32) -> String {
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

#[cfg(test)]
pub(crate) fn test_rules() -> WorkdayRules {
    WorkdayRules {
        tz_offset_minutes: 330,
        work_start_minutes: 600,
        half_day_late_minutes: 240,
        workday_end_minutes: 1140,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    /// Build the UTC instant for a given local (+5:30) wall-clock time.
    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(330 * 60)
            .unwrap()
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn on_time_at_0959() {
        let (status, is_late, late) = test_rules().derive_status(local(2026, 1, 6, 9, 59));
        assert_eq!(status, AttendanceStatus::Present);
        assert!(!is_late);
        assert_eq!(late, 0);
    }

    #[test]
    fn exactly_1000_is_still_on_time() {
        let (status, is_late, _) = test_rules().derive_status(local(2026, 1, 6, 10, 0));
        assert_eq!(status, AttendanceStatus::Present);
        assert!(!is_late);
    }

    #[test]
    fn one_minute_late_at_1001() {
        let (status, is_late, late) = test_rules().derive_status(local(2026, 1, 6, 10, 1));
        assert_eq!(status, AttendanceStatus::Late);
        assert!(is_late);
        assert_eq!(late, 1);
    }

    #[test]
    fn late_by_240_is_still_late_not_half_day() {
        let (status, _, late) = test_rules().derive_status(local(2026, 1, 6, 14, 0));
        assert_eq!(status, AttendanceStatus::Late);
        assert_eq!(late, 240);
    }

    #[test]
    fn late_by_241_is_half_day() {
        let (status, _, late) = test_rules().derive_status(local(2026, 1, 6, 14, 1));
        assert_eq!(status, AttendanceStatus::HalfDay);
        assert_eq!(late, 241);
    }

    #[test]
    fn calendar_date_is_local_midnight_as_utc() {
        // Local 2026-01-06 midnight is 2026-01-05T18:30:00Z.
        let midnight = test_rules().local_midnight_utc(local(2026, 1, 6, 9, 0));
        assert_eq!(midnight, Utc.with_ymd_and_hms(2026, 1, 5, 18, 30, 0).unwrap());
    }

    #[test]
    fn utc_evening_lands_on_next_local_day() {
        // 2026-01-05T20:00:00Z is already 01:30 on Jan 6 locally.
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 20, 0, 0).unwrap();
        let midnight = test_rules().local_midnight_utc(at);
        assert_eq!(midnight, Utc.with_ymd_and_hms(2026, 1, 5, 18, 30, 0).unwrap());
    }

    #[test]
    fn early_departure_boundary() {
        let rules = test_rules();
        assert!(rules.is_early_departure(local(2026, 1, 6, 18, 59)));
        assert!(!rules.is_early_departure(local(2026, 1, 6, 19, 0)));
    }

    #[test]
    fn worked_minutes_rounds_to_nearest() {
        let start = local(2026, 1, 6, 9, 0);
        assert_eq!(worked_minutes(start, start + Duration::seconds(90)), 2);
        assert_eq!(worked_minutes(start, start + Duration::seconds(89)), 1);
        assert_eq!(worked_minutes(start, start), 0);
    }

    #[test]
    fn working_time_formats_as_hh_mm() {
        assert_eq!(format_working_time(0), "00:00");
        assert_eq!(format_working_time(61), "01:01");
        assert_eq!(format_working_time(545), "09:05");
    }
}
