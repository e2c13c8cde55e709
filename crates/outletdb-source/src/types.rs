//! Raw record shapes as published by the outlet feed.
//!
//! The feed is loosely typed: coordinates arrive as numbers or numeric
//! strings, and operating hours as a single string or one line per entry.
//! Everything is optional here; [`crate::normalize`] decides what is usable.

use serde::Deserialize;

/// The feed body: either a bare array or `{"outlets": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FeedBody {
    Bare(Vec<serde_json::Value>),
    Wrapped { outlets: Vec<serde_json::Value> },
}

impl FeedBody {
    pub(crate) fn into_values(self) -> Vec<serde_json::Value> {
        match self {
            FeedBody::Bare(values) | FeedBody::Wrapped { outlets: values } => values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawOutletRecord {
    /// Upstream identifier, used only for diagnostics.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub operating_hours: Option<RawHours>,
    #[serde(default)]
    pub waze_link: Option<String>,
    #[serde(default)]
    pub latitude: Option<RawCoordinate>,
    #[serde(default)]
    pub longitude: Option<RawCoordinate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawCoordinate {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawHours {
    Text(String),
    Lines(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_accept_numbers_and_strings() {
        let json = serde_json::json!({
            "name": "Subway Bangsar",
            "waze_link": "https://waze.com/ul?ll=3.13,101.67",
            "latitude": "3.1299",
            "longitude": 101.67
        });
        let record: RawOutletRecord = serde_json::from_value(json).unwrap();
        assert_eq!(
            record.latitude,
            Some(RawCoordinate::Text("3.1299".to_string()))
        );
        assert_eq!(record.longitude, Some(RawCoordinate::Number(101.67)));
        assert!(record.operating_hours.is_none());
    }

    #[test]
    fn hours_accept_string_or_lines() {
        let text: RawHours = serde_json::from_value(serde_json::json!("Daily 8am-10pm")).unwrap();
        assert_eq!(text, RawHours::Text("Daily 8am-10pm".to_string()));

        let lines: RawHours =
            serde_json::from_value(serde_json::json!(["Monday 08:00 - 22:00", "Sunday closed"]))
                .unwrap();
        assert!(matches!(lines, RawHours::Lines(ref l) if l.len() == 2));
    }

    #[test]
    fn feed_body_accepts_bare_and_wrapped() {
        let bare: FeedBody = serde_json::from_str(r#"[{"name":"a"}]"#).unwrap();
        assert_eq!(bare.into_values().len(), 1);

        let wrapped: FeedBody = serde_json::from_str(r#"{"outlets":[{},{}]}"#).unwrap();
        assert_eq!(wrapped.into_values().len(), 2);
    }
}
