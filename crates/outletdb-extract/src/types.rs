//! Wire types for `POST /v1/extract/operating-hours`.
//!
//! Field names mirror the `outlet_operating_hours` columns so a record maps
//! onto a [`outletdb_core::WeeklySchedule`] slot by slot. Times stay as raw
//! strings here; parsing is the caller's concern.

use outletdb_core::ScheduleDay;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One outlet's free-text hours, as sent to the service. Outlets with no
/// published hours are still sent, with `operating_hours: null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoursInput {
    pub outlet_id: Uuid,
    pub operating_hours: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExtractionRequest<'a> {
    pub outlets: &'a [HoursInput],
}

/// The envelope is decoded strictly; records stay raw so that one bad record
/// cannot take the rest of the batch down with it.
#[derive(Debug, Deserialize)]
pub(crate) struct ExtractionResponse {
    #[serde(default)]
    pub outlets: Vec<Value>,
}

/// One structured record returned by the service.
///
/// Every time field is optional; the service omits days it could not find.
/// A time that arrives as a non-string JSON value is kept as its JSON text,
/// so it fails per-field parsing downstream instead of failing the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtractedHours {
    pub outlet_id: Uuid,
    #[serde(default, deserialize_with = "lenient_time")]
    pub mon_open: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub mon_close: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub tue_open: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub tue_close: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub wed_open: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub wed_close: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub thu_open: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub thu_close: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub fri_open: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub fri_close: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub sat_open: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub sat_close: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub sun_open: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub sun_close: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub public_holiday_open: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub public_holiday_close: Option<String>,
}

impl ExtractedHours {
    /// Raw `(open, close)` strings for one day.
    #[must_use]
    pub fn raw(&self, day: ScheduleDay) -> (Option<&str>, Option<&str>) {
        let (open, close) = match day {
            ScheduleDay::Mon => (&self.mon_open, &self.mon_close),
            ScheduleDay::Tue => (&self.tue_open, &self.tue_close),
            ScheduleDay::Wed => (&self.wed_open, &self.wed_close),
            ScheduleDay::Thu => (&self.thu_open, &self.thu_close),
            ScheduleDay::Fri => (&self.fri_open, &self.fri_close),
            ScheduleDay::Sat => (&self.sat_open, &self.sat_close),
            ScheduleDay::Sun => (&self.sun_open, &self.sun_close),
            ScheduleDay::PublicHoliday => (&self.public_holiday_open, &self.public_holiday_close),
        };
        (open.as_deref(), close.as_deref())
    }
}

fn lenient_time<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Decodes each raw record on its own, dropping (and logging) records whose
/// `outlet_id` is missing or malformed.
pub(crate) fn decode_records(raw: Vec<Value>) -> Vec<ExtractedHours> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(index, error = %e, "extract: dropping undecodable record");
                None
            }
        })
        .collect()
}
