use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};

/// The property is in Argentina (UTC-03:00, no daylight saving).
pub const DEFAULT_OFFSET_MINUTES: i32 = -180;

/// Time zone every "today" and every bare calendar date is interpreted in.
///
/// Client and server must agree on this value, otherwise a booking made late in the
/// evening can land on different days on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceZone {
    offset: FixedOffset,
}

impl ReferenceZone {
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(|offset| Self { offset })
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.to_utc(date.and_time(NaiveTime::MIN))
    }

    pub fn today_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.start_of_day(self.local_date(now))
    }

    /// Accepts RFC 3339 timestamps, `YYYY-MM-DD` dates and offset-less `YYYY-MM-DDTHH:MM[:SS]`
    /// local times. Returns `None` for anything else.
    pub fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(self.start_of_day(date));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|local| self.to_utc(local))
    }

    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        (local - Duration::seconds(self.offset.local_minus_utc() as i64)).and_utc()
    }
}

impl Default for ReferenceZone {
    fn default() -> Self {
        Self::from_offset_minutes(DEFAULT_OFFSET_MINUTES).unwrap_or_else(Self::utc)
    }
}

/// Range handed over by the calendar grid when the user clicks or drags across slots.
///
/// Grid widgets report the end as the boundary of the day *after* the last selected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SlotRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// End of the stay as stored on a booking: the last occupied night.
    ///
    /// A single-point selection (`start == end`) is kept as is; any other range loses one
    /// day, never moving before `start`.
    pub fn stay_end(&self) -> DateTime<Utc> {
        if self.start == self.end {
            return self.end;
        }
        (self.end - Duration::days(1)).max(self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 3, 0, 0).unwrap()
    }

    #[test]
    fn test_drag_over_three_days_ends_on_last_night() {
        let range = SlotRange::new(day(2026, 3, 6), day(2026, 3, 9));
        assert_eq!(range.stay_end(), day(2026, 3, 8));
    }

    #[test]
    fn test_single_point_selection_is_unchanged() {
        let range = SlotRange::new(day(2026, 3, 6), day(2026, 3, 6));
        assert_eq!(range.stay_end(), day(2026, 3, 6));
    }

    #[test]
    fn test_one_day_click_collapses_to_start() {
        let range = SlotRange::new(day(2026, 3, 6), day(2026, 3, 7));
        assert_eq!(range.stay_end(), day(2026, 3, 6));
    }

    #[test]
    fn test_parse_bare_date_uses_reference_zone() {
        let zone = ReferenceZone::default();
        let parsed = zone.parse("2026-03-06").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 3, 6, 3, 0, 0).unwrap());
        assert_eq!(zone.local_date(parsed), NaiveDate::from_ymd_opt(2026, 3, 6).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let zone = ReferenceZone::default();
        assert!(zone.parse("").is_none());
        assert!(zone.parse("mañana").is_none());
        assert!(zone.parse("2026-02-30").is_none());
    }

    #[test]
    fn test_today_start_late_evening() {
        let zone = ReferenceZone::default();
        // 01:30 UTC on the 7th is still the 6th in Argentina.
        let now = Utc.with_ymd_and_hms(2026, 3, 7, 1, 30, 0).unwrap();
        assert_eq!(zone.today_start(now), day(2026, 3, 6));
    }
}
