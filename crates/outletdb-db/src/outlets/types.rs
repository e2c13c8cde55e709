//! Row types for the outlet dataset tables.

use chrono::NaiveTime;
use outletdb_core::{DayHours, Outlet, OverlapEdge, ScheduleDay, WeeklySchedule};
use uuid::Uuid;

/// One complete dataset produced by an ingestion run, written as a unit by
/// [`super::replace_dataset`].
#[derive(Debug, Clone, Copy)]
pub struct NewDataset<'a> {
    pub outlets: &'a [Outlet],
    pub edges: &'a [OverlapEdge],
    pub schedules: &'a [WeeklySchedule],
}

/// Row counts written by a successful replace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceCounts {
    pub outlets: u64,
    pub edges: u64,
    pub schedules: u64,
    /// Rows removed from the previous dataset (all three tables).
    pub deleted: u64,
}

/// A row from the `outlets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutletRow {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: f64,
    pub operating_hours: Option<String>,
    pub waze_link: String,
}

impl From<OutletRow> for Outlet {
    fn from(row: OutletRow) -> Self {
        Outlet {
            id: row.id,
            name: row.name,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            operating_hours: row.operating_hours,
            waze_link: row.waze_link,
        }
    }
}

/// An overlap edge joined with both endpoint names.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OverlapRow {
    pub id: i64,
    pub outlet1_id: Uuid,
    pub outlet1_name: String,
    pub outlet2_id: Uuid,
    pub outlet2_name: String,
    pub distance: f64,
}

impl OverlapRow {
    #[must_use]
    pub fn edge(&self) -> OverlapEdge {
        OverlapEdge {
            outlet1_id: self.outlet1_id,
            outlet2_id: self.outlet2_id,
            distance_km: self.distance,
        }
    }
}

/// A row from the `outlet_operating_hours` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OperatingHoursRow {
    pub outlet_id: Uuid,
    pub mon_open: Option<NaiveTime>,
    pub mon_close: Option<NaiveTime>,
    pub tue_open: Option<NaiveTime>,
    pub tue_close: Option<NaiveTime>,
    pub wed_open: Option<NaiveTime>,
    pub wed_close: Option<NaiveTime>,
    pub thu_open: Option<NaiveTime>,
    pub thu_close: Option<NaiveTime>,
    pub fri_open: Option<NaiveTime>,
    pub fri_close: Option<NaiveTime>,
    pub sat_open: Option<NaiveTime>,
    pub sat_close: Option<NaiveTime>,
    pub sun_open: Option<NaiveTime>,
    pub sun_close: Option<NaiveTime>,
    pub public_holiday_open: Option<NaiveTime>,
    pub public_holiday_close: Option<NaiveTime>,
}

impl From<OperatingHoursRow> for WeeklySchedule {
    fn from(row: OperatingHoursRow) -> Self {
        let pairs = [
            (ScheduleDay::Mon, row.mon_open, row.mon_close),
            (ScheduleDay::Tue, row.tue_open, row.tue_close),
            (ScheduleDay::Wed, row.wed_open, row.wed_close),
            (ScheduleDay::Thu, row.thu_open, row.thu_close),
            (ScheduleDay::Fri, row.fri_open, row.fri_close),
            (ScheduleDay::Sat, row.sat_open, row.sat_close),
            (ScheduleDay::Sun, row.sun_open, row.sun_close),
            (
                ScheduleDay::PublicHoliday,
                row.public_holiday_open,
                row.public_holiday_close,
            ),
        ];
        pairs
            .into_iter()
            .fold(WeeklySchedule::empty(row.outlet_id), |s, (day, open, close)| {
                s.with_day(day, DayHours::new(open, close))
            })
    }
}

/// Column list for `outlet_operating_hours` in [`ScheduleDay::ALL`] order,
/// open before close.
pub(super) fn hours_columns() -> Vec<String> {
    ScheduleDay::ALL
        .iter()
        .flat_map(|d| [format!("{d}_open"), format!("{d}_close")])
        .collect()
}
