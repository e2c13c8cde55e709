//! Lenient per-field time parsing for extracted schedule records.

use std::sync::LazyLock;

use chrono::NaiveTime;
use outletdb_core::{DayHours, ScheduleDay, WeeklySchedule};
use outletdb_extract::ExtractedHours;
use regex::Regex;
use uuid::Uuid;

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})[:.](\d{2})(?::(\d{2}))?\s*(a\.?m\.?|p\.?m\.?)?$")
        .expect("valid regex")
});

/// Parses `HH:MM`, `H:MM`, `HH:MM:SS`, optionally followed by AM/PM.
///
/// Returns `None` for anything else, including out-of-range values and
/// `24:00`.
#[must_use]
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let caps = TIME_RE.captures(raw.trim())?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let second: u32 = match caps.get(3) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };

    if let Some(meridiem) = caps.get(4) {
        if !(1..=12).contains(&hour) {
            return None;
        }
        let pm = meridiem.as_str().starts_with(['p', 'P']);
        hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
    }

    NaiveTime::from_hms_opt(hour, minute, second)
}

/// One record turned into a schedule, with the damage it took on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub schedule: WeeklySchedule,
    pub unparsed_fields: usize,
    pub rejected_pairs: usize,
}

/// Parses all 16 fields of `record` independently.
///
/// A present but unparseable field becomes `None` and is counted. A day whose
/// open is not strictly before its close has both fields cleared and counts
/// as one rejected pair.
#[must_use]
pub fn parse_record(outlet_id: Uuid, record: &ExtractedHours) -> ParsedRecord {
    let mut schedule = WeeklySchedule::empty(outlet_id);
    let mut unparsed_fields = 0;
    let mut rejected_pairs = 0;

    for day in ScheduleDay::ALL {
        let (raw_open, raw_close) = record.raw(day);
        let mut field = |raw: Option<&str>| {
            let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
            let parsed = parse_time(raw);
            if parsed.is_none() {
                unparsed_fields += 1;
            }
            parsed
        };
        let hours = DayHours::new(field(raw_open), field(raw_close));

        if hours.is_ordered() {
            schedule.set_day(day, hours);
        } else {
            rejected_pairs += 1;
        }
    }

    ParsedRecord {
        schedule,
        unparsed_fields,
        rejected_pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    #[test]
    fn parses_24_hour_forms() {
        assert_eq!(parse_time("08:00"), Some(t(8, 0)));
        assert_eq!(parse_time("8:05"), Some(t(8, 5)));
        assert_eq!(parse_time(" 22:30 "), Some(t(22, 30)));
        assert_eq!(
            parse_time("07:15:30"),
            NaiveTime::from_hms_opt(7, 15, 30)
        );
        assert_eq!(parse_time("00:00"), Some(t(0, 0)));
    }

    #[test]
    fn parses_meridiem_forms() {
        assert_eq!(parse_time("8:00 AM"), Some(t(8, 0)));
        assert_eq!(parse_time("10:30pm"), Some(t(22, 30)));
        assert_eq!(parse_time("12:00 a.m."), Some(t(0, 0)));
        assert_eq!(parse_time("12:15 PM"), Some(t(12, 15)));
    }

    #[test]
    fn rejects_garbage_and_out_of_range() {
        for raw in ["", "noon", "25:00", "24:00", "08:60", "13:00 PM", "0:30 AM", "8", "08:00-22:00"] {
            assert_eq!(parse_time(raw), None, "{raw:?} should not parse");
        }
    }

    #[test]
    fn monday_only_record_fills_only_monday() {
        let id = Uuid::new_v4();
        let record = ExtractedHours {
            outlet_id: id,
            mon_open: Some("08:00".into()),
            mon_close: Some("22:00".into()),
            ..ExtractedHours::default()
        };

        let parsed = parse_record(id, &record);

        assert_eq!(parsed.schedule.outlet_id, id);
        assert_eq!(
            parsed.schedule.day(ScheduleDay::Mon),
            DayHours::new(Some(t(8, 0)), Some(t(22, 0)))
        );
        for day in ScheduleDay::ALL.into_iter().skip(1) {
            assert!(parsed.schedule.day(day).is_empty(), "{day} should be empty");
        }
        assert_eq!(parsed.unparsed_fields, 0);
        assert_eq!(parsed.rejected_pairs, 0);
    }

    #[test]
    fn bad_fields_are_nulled_independently() {
        let id = Uuid::new_v4();
        let record = ExtractedHours {
            outlet_id: id,
            tue_open: Some("around nine".into()),
            tue_close: Some("18:00".into()),
            wed_open: Some("   ".into()),
            ..ExtractedHours::default()
        };

        let parsed = parse_record(id, &record);
        assert_eq!(
            parsed.schedule.day(ScheduleDay::Tue),
            DayHours::new(None, Some(t(18, 0)))
        );
        assert!(parsed.schedule.day(ScheduleDay::Wed).is_empty());
        assert_eq!(parsed.unparsed_fields, 1, "blank is absent, not unparsed");
    }

    #[test]
    fn non_string_value_from_the_service_counts_as_unparsed() {
        let id = Uuid::new_v4();
        let record: ExtractedHours = serde_json::from_value(serde_json::json!({
            "outlet_id": id,
            "mon_open": 800,
            "mon_close": "22:00",
            "sat_open": false
        }))
        .expect("record decodes");

        let parsed = parse_record(id, &record);

        assert_eq!(
            parsed.schedule.day(ScheduleDay::Mon),
            DayHours::new(None, Some(t(22, 0)))
        );
        assert!(parsed.schedule.day(ScheduleDay::Sat).is_empty());
        assert_eq!(parsed.unparsed_fields, 2);
    }

    #[test]
    fn inverted_pair_is_rejected_whole() {
        let id = Uuid::new_v4();
        let record = ExtractedHours {
            outlet_id: id,
            fri_open: Some("22:00".into()),
            fri_close: Some("02:00".into()),
            sat_open: Some("10:00".into()),
            sat_close: Some("10:00".into()),
            sun_open: Some("10:00".into()),
            sun_close: Some("20:00".into()),
            ..ExtractedHours::default()
        };

        let parsed = parse_record(id, &record);
        assert!(parsed.schedule.day(ScheduleDay::Fri).is_empty());
        assert!(parsed.schedule.day(ScheduleDay::Sat).is_empty());
        assert!(!parsed.schedule.day(ScheduleDay::Sun).is_empty());
        assert_eq!(parsed.rejected_pairs, 2);
    }
}
