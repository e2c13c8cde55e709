//! Normalized weekly operating schedules.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A schedule slot: the seven weekdays plus public holidays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleDay {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
    PublicHoliday,
}

impl ScheduleDay {
    pub const ALL: [ScheduleDay; 8] = [
        ScheduleDay::Mon,
        ScheduleDay::Tue,
        ScheduleDay::Wed,
        ScheduleDay::Thu,
        ScheduleDay::Fri,
        ScheduleDay::Sat,
        ScheduleDay::Sun,
        ScheduleDay::PublicHoliday,
    ];

    /// Column / wire-field prefix, e.g. `"mon"` for `mon_open` and `mon_close`.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            ScheduleDay::Mon => "mon",
            ScheduleDay::Tue => "tue",
            ScheduleDay::Wed => "wed",
            ScheduleDay::Thu => "thu",
            ScheduleDay::Fri => "fri",
            ScheduleDay::Sat => "sat",
            ScheduleDay::Sun => "sun",
            ScheduleDay::PublicHoliday => "public_holiday",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for ScheduleDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Open/close pair for one slot. Either side may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open: Option<NaiveTime>,
    pub close: Option<NaiveTime>,
}

impl DayHours {
    #[must_use]
    pub fn new(open: Option<NaiveTime>, close: Option<NaiveTime>) -> Self {
        Self { open, close }
    }

    /// `false` only when both times are present and open does not precede close.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        match (self.open, self.close) {
            (Some(open), Some(close)) => open < close,
            _ => true,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_none() && self.close.is_none()
    }
}

/// Structured weekly schedule for one outlet: 8 slots × open/close, each of
/// the 16 values independently nullable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub outlet_id: Uuid,
    hours: [DayHours; 8],
}

impl WeeklySchedule {
    /// A schedule with every field unknown.
    #[must_use]
    pub fn empty(outlet_id: Uuid) -> Self {
        Self {
            outlet_id,
            hours: [DayHours::default(); 8],
        }
    }

    #[must_use]
    pub fn day(&self, day: ScheduleDay) -> DayHours {
        self.hours[day.index()]
    }

    pub fn set_day(&mut self, day: ScheduleDay, hours: DayHours) {
        self.hours[day.index()] = hours;
    }

    /// Builder-style variant of [`WeeklySchedule::set_day`].
    #[must_use]
    pub fn with_day(mut self, day: ScheduleDay, hours: DayHours) -> Self {
        self.set_day(day, hours);
        self
    }

    /// Iterates slots in [`ScheduleDay::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (ScheduleDay, DayHours)> + '_ {
        ScheduleDay::ALL.iter().map(|&d| (d, self.day(d)))
    }

    /// `true` when all 16 fields are null.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hours.iter().all(DayHours::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    #[test]
    fn empty_schedule_has_all_fields_null() {
        let s = WeeklySchedule::empty(Uuid::new_v4());
        assert!(s.is_empty());
        assert_eq!(s.iter().count(), 8);
    }

    #[test]
    fn set_day_only_touches_that_slot() {
        let s = WeeklySchedule::empty(Uuid::new_v4())
            .with_day(ScheduleDay::Mon, DayHours::new(Some(t(8, 0)), Some(t(22, 0))));
        assert_eq!(s.day(ScheduleDay::Mon).open, Some(t(8, 0)));
        assert_eq!(s.day(ScheduleDay::Mon).close, Some(t(22, 0)));
        for (day, hours) in s.iter().filter(|(d, _)| *d != ScheduleDay::Mon) {
            assert!(hours.is_empty(), "{day} should be empty");
        }
        assert!(!s.is_empty());
    }

    #[test]
    fn day_hours_ordering() {
        assert!(DayHours::new(Some(t(8, 0)), Some(t(22, 0))).is_ordered());
        assert!(!DayHours::new(Some(t(22, 0)), Some(t(8, 0))).is_ordered());
        assert!(!DayHours::new(Some(t(8, 0)), Some(t(8, 0))).is_ordered());
        assert!(DayHours::new(Some(t(8, 0)), None).is_ordered());
        assert!(DayHours::default().is_ordered());
    }

    #[test]
    fn prefixes_match_column_names() {
        let prefixes: Vec<&str> = ScheduleDay::ALL.iter().map(|d| d.prefix()).collect();
        assert_eq!(
            prefixes,
            ["mon", "tue", "wed", "thu", "fri", "sat", "sun", "public_holiday"]
        );
    }
}
