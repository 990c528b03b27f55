use crate::authorization::authorize_booking_type;
use crate::booking::{BookingDraft, BookingType, ValidBooking};
use crate::calendar::ReferenceZone;
use crate::error::{BookingError, CoreResult, Field};
use crate::identity::Session;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub const MAX_PARTY_SIZE: u8 = 25;

/// Parameters shared by every validation run. Client and server must be configured alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub zone: ReferenceZone,
    pub max_party_size: u8,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            zone: ReferenceZone::default(),
            max_party_size: MAX_PARTY_SIZE,
        }
    }
}

/// Turns raw form values into a [`ValidBooking`] or the first failing rule.
///
/// Checks run in a fixed order: title, date parsing, date range, past start, booking type
/// (including its capability), party size. `now` is injected so the "today" boundary is
/// decided by the caller's clock.
pub fn validate_draft(
    draft: &BookingDraft,
    requester: &Session,
    rules: &ValidationRules,
    now: DateTime<Utc>,
) -> CoreResult<ValidBooking> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(BookingError::validation(
            Field::Title,
            "title is required and cannot be empty",
        ));
    }

    let start = parse_date(rules, draft.start.as_deref());
    let end = parse_date(rules, draft.end.as_deref());
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(BookingError::validation(
                Field::Dates,
                format!(
                    "valid start and end dates are required (start={:?}, end={:?})",
                    draft.start, draft.end
                ),
            ))
        }
    };

    if end < start {
        return Err(BookingError::validation(
            Field::DateRange,
            format!("end {end} is before start {start}"),
        ));
    }

    let today = rules.zone.today_start(now);
    if start < today {
        return Err(BookingError::validation(
            Field::PastDate,
            format!("start {start} is before today ({today})"),
        ));
    }

    let booking_type: BookingType = draft.booking_type.as_deref().unwrap_or_default().parse()?;
    authorize_booking_type(booking_type, requester)?;

    let party_size = parse_party_size(draft.party_size.as_ref(), rules.max_party_size)?;

    let notes = draft
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_owned);

    Ok(ValidBooking {
        title: title.to_owned(),
        notes,
        booking_type,
        party_size,
        start,
        end,
    })
}

fn parse_date(rules: &ValidationRules, raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|raw| rules.zone.parse(raw))
}

fn parse_party_size(raw: Option<&Value>, max: u8) -> CoreResult<Option<u8>> {
    let reject = |detail: String| BookingError::validation(Field::PartySize, detail);

    let number = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| reject(format!("'{s}' is not a whole number")))?,
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| reject(format!("{n} is not a positive whole number")))?,
        Some(other) => return Err(reject(format!("unexpected party size value {other}"))),
    };

    if number == 0 || number > max as u64 {
        return Err(reject(format!("{number} is outside 1..={max}")));
    }
    Ok(Some(number as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::identity::Capability;
    use crate::ids::ObjectId;
    use chrono::TimeZone;
    use serde_json::json;

    // Friday 2026-03-06 10:00 in Argentina.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 6, 13, 0, 0).unwrap()
    }

    fn requester() -> Session {
        Session::new(ObjectId::parse("65f000000000000000000001").unwrap(), "Ana")
    }

    fn draft(title: &str, start: &str, end: &str, code: &str) -> BookingDraft {
        BookingDraft {
            title: title.into(),
            notes: None,
            start: Some(start.into()),
            end: Some(end.into()),
            booking_type: Some(code.into()),
            party_size: None,
        }
    }

    fn run(draft: &BookingDraft) -> CoreResult<ValidBooking> {
        validate_draft(draft, &requester(), &ValidationRules::default(), now())
    }

    fn failed_field(draft: &BookingDraft) -> Option<Field> {
        run(draft).unwrap_err().field()
    }

    #[test]
    fn test_weekend_booking_is_normalized() {
        let mut d = draft("  Fin de semana ", "2026-03-06", "2026-03-08", "CT");
        d.notes = Some("   ".into());
        d.party_size = Some(json!(6));
        let valid = run(&d).unwrap();
        assert_eq!(valid.title(), "Fin de semana");
        assert_eq!(valid.notes(), None);
        assert_eq!(valid.party_size(), Some(6));
        assert_eq!(valid.booking_type(), BookingType::FullCapacity);
        assert_eq!(valid.start(), Utc.with_ymd_and_hms(2026, 3, 6, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_blank_title() {
        let d = draft("   ", "2026-03-06", "2026-03-08", "CT");
        assert_eq!(failed_field(&d), Some(Field::Title));
    }

    #[test]
    fn test_unparseable_or_missing_dates() {
        assert_eq!(failed_field(&draft("x", "pronto", "2026-03-08", "CT")), Some(Field::Dates));
        let mut d = draft("x", "2026-03-06", "2026-03-08", "CT");
        d.end = None;
        assert_eq!(failed_field(&d), Some(Field::Dates));
    }

    #[test]
    fn test_inverted_range_but_same_day_allowed() {
        let inverted = draft("x", "2026-03-08", "2026-03-07", "CT");
        assert_eq!(failed_field(&inverted), Some(Field::DateRange));
        let same_day = draft("x", "2026-03-07", "2026-03-07", "CT");
        assert!(run(&same_day).is_ok());
    }

    #[test]
    fn test_yesterday_is_past_but_today_is_not() {
        assert_eq!(
            failed_field(&draft("x", "2026-03-05", "2026-03-06", "CT")),
            Some(Field::PastDate)
        );
        assert!(run(&draft("x", "2026-03-06", "2026-03-06", "CT")).is_ok());
    }

    #[test]
    fn test_unknown_or_missing_type() {
        assert_eq!(failed_field(&draft("x", "2026-03-07", "2026-03-07", "ZZ")), Some(Field::BookingType));
        let mut d = draft("x", "2026-03-07", "2026-03-07", "CT");
        d.booking_type = None;
        assert_eq!(failed_field(&d), Some(Field::BookingType));
    }

    #[test]
    fn test_vacation_needs_admin_capability() {
        let d = draft("Vacaciones", "2026-03-07", "2026-03-10", "VC");
        let err = run(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let admin = requester().with_capability(Capability::CanCreateAdminEvents);
        assert!(validate_draft(&d, &admin, &ValidationRules::default(), now()).is_ok());
    }

    #[test]
    fn test_party_size_bounds() {
        let mut d = draft("x", "2026-03-07", "2026-03-07", "PA");
        for ok in [json!(1), json!(25), json!("12"), json!(""), Value::Null] {
            d.party_size = Some(ok.clone());
            assert!(run(&d).is_ok(), "{ok} should be accepted");
        }
        for bad in [json!(0), json!(26), json!(-1), json!(2.5), json!("muchos"), json!(true)] {
            d.party_size = Some(bad.clone());
            assert_eq!(failed_field(&d), Some(Field::PartySize), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_checks_run_in_documented_order() {
        // Title wins over everything else that is also wrong.
        let mut d = draft("", "2026-03-01", "2026-02-01", "ZZ");
        d.party_size = Some(json!(99));
        assert_eq!(failed_field(&d), Some(Field::Title));
        d.title = "x".into();
        assert_eq!(failed_field(&d), Some(Field::DateRange));
        d.end = Some("2026-03-02".into());
        assert_eq!(failed_field(&d), Some(Field::PastDate));
        d.start = Some("2026-03-02".into());
        d.end = Some("2026-03-09".into());
        assert_eq!(failed_field(&d), Some(Field::PastDate));
        d.start = Some("2026-03-07".into());
        assert_eq!(failed_field(&d), Some(Field::BookingType));
        d.booking_type = Some("FL".into());
        assert_eq!(failed_field(&d), Some(Field::PartySize));
    }
}
