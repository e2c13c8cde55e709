//! Validation from [`RawOutletRecord`] to [`outletdb_core::OutletRecord`].
//!
//! Problems are per record: a malformed record becomes a [`SkippedRecord`]
//! and the rest of the feed is still usable.

use outletdb_core::OutletRecord;

use crate::types::{RawCoordinate, RawHours, RawOutletRecord};

const LINK_PREFIXES: [&str; 3] = ["http://", "https://", "www."];

/// A feed entry that could not be turned into an outlet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Position in the feed, zero-based.
    pub index: usize,
    /// Upstream id or name, whichever was present.
    pub label: Option<String>,
    pub reason: String,
}

/// Normalizes one raw feed entry.
///
/// # Errors
///
/// Returns a [`SkippedRecord`] when the name, direction link, or longitude is
/// missing, or when a coordinate is present but unusable. An absent or blank
/// latitude is allowed and yields `None`.
pub fn normalize_record(index: usize, raw: RawOutletRecord) -> Result<OutletRecord, SkippedRecord> {
    let label = raw
        .id
        .as_ref()
        .map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .or_else(|| raw.name.clone());
    let skip = |reason: String| SkippedRecord {
        index,
        label: label.clone(),
        reason,
    };

    let name = non_blank(raw.name).ok_or_else(|| skip("missing name".into()))?;
    let waze_link = non_blank(raw.waze_link)
        .map(|link| fix_duplicated_link(&link).to_owned())
        .ok_or_else(|| skip("missing direction link".into()))?;

    let longitude = match raw.longitude {
        None => return Err(skip("missing longitude".into())),
        Some(c) => parse_coordinate(&c, 180.0)
            .map_err(|reason| skip(format!("longitude: {reason}")))?
            .ok_or_else(|| skip("missing longitude".into()))?,
    };
    let latitude = match raw.latitude {
        None => None,
        Some(c) => parse_coordinate(&c, 90.0).map_err(|reason| skip(format!("latitude: {reason}")))?,
    };

    Ok(OutletRecord {
        name,
        address: non_blank(raw.address),
        latitude,
        longitude,
        operating_hours: raw.operating_hours.and_then(join_hours),
        waze_link,
    })
}

/// Cuts a direction link at the second occurrence of a URL prefix.
///
/// The feed sometimes concatenates the same link twice
/// (`https://waze.com/ul?q=xhttps://waze.com/ul?q=x`). Prefixes are tried in
/// the order `http://`, `https://`, `www.`; the first one that occurs twice
/// decides the cut. Links without a repeat are returned unchanged.
#[must_use]
pub fn fix_duplicated_link(url: &str) -> &str {
    for prefix in LINK_PREFIXES {
        if let Some(first) = url.find(prefix) {
            let from = first + 1;
            if let Some(rel) = url[from..].find(prefix) {
                return &url[..from + rel];
            }
        }
    }
    url
}

/// `Ok(None)` for a blank string, `Err` for garbage or out-of-range values.
fn parse_coordinate(raw: &RawCoordinate, limit: f64) -> Result<Option<f64>, String> {
    let value = match raw {
        RawCoordinate::Number(n) => *n,
        RawCoordinate::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map_err(|_| format!("not a number: {trimmed:?}"))?
        }
    };
    if !value.is_finite() || value.abs() > limit {
        return Err(format!("{value} outside ±{limit}"));
    }
    Ok(Some(value))
}

fn join_hours(hours: RawHours) -> Option<String> {
    let joined = match hours {
        RawHours::Text(text) => text,
        RawHours::Lines(lines) => lines
            .into_iter()
            .map(|l| l.trim().to_owned())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
    };
    non_blank(Some(joined))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
