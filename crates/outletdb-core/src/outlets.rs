//! Outlet records and the overlap edges computed between them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One ingested point-of-interest record.
///
/// `id` is assigned fresh on every ingestion run and is only stable within
/// that run; nothing downstream may assume an outlet keeps its id across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlet {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: f64,
    /// Free-text operating hours as published by the source, possibly
    /// spanning several lines.
    pub operating_hours: Option<String>,
    pub waze_link: String,
}

impl Outlet {
    /// Returns `(latitude, longitude)` when both coordinates are known.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.map(|lat| (lat, self.longitude))
    }
}

/// A validated record from the raw source, before the run assigns it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutletRecord {
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: f64,
    pub operating_hours: Option<String>,
    pub waze_link: String,
}

impl OutletRecord {
    /// Attaches a run-scoped id.
    #[must_use]
    pub fn into_outlet(self, id: Uuid) -> Outlet {
        Outlet {
            id,
            name: self.name,
            address: self.address,
            latitude: self.latitude,
            longitude: self.longitude,
            operating_hours: self.operating_hours,
            waze_link: self.waze_link,
        }
    }
}

/// An unordered pair of outlets closer than the overlap threshold.
///
/// `outlet1_id` is always the outlet that came first in the run's input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapEdge {
    pub outlet1_id: Uuid,
    pub outlet2_id: Uuid,
    pub distance_km: f64,
}

impl OverlapEdge {
    /// Returns `true` if `outlet_id` is either endpoint of this edge.
    #[must_use]
    pub fn touches(&self, outlet_id: Uuid) -> bool {
        self.outlet1_id == outlet_id || self.outlet2_id == outlet_id
    }

    /// Returns the endpoint opposite `outlet_id`, or `None` if the edge does
    /// not touch it.
    #[must_use]
    pub fn other(&self, outlet_id: Uuid) -> Option<Uuid> {
        if self.outlet1_id == outlet_id {
            Some(self.outlet2_id)
        } else if self.outlet2_id == outlet_id {
            Some(self.outlet1_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outlet(latitude: Option<f64>) -> Outlet {
        Outlet {
            id: Uuid::new_v4(),
            name: "Subway Bangsar".to_string(),
            address: None,
            latitude,
            longitude: 101.67,
            operating_hours: None,
            waze_link: "https://waze.com/ul?ll=3.13,101.67".to_string(),
        }
    }

    #[test]
    fn coordinates_require_latitude() {
        assert_eq!(outlet(Some(3.13)).coordinates(), Some((3.13, 101.67)));
        assert_eq!(outlet(None).coordinates(), None);
    }

    #[test]
    fn edge_other_returns_opposite_endpoint() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let edge = OverlapEdge {
            outlet1_id: a,
            outlet2_id: b,
            distance_km: 1.2,
        };
        assert_eq!(edge.other(a), Some(b));
        assert_eq!(edge.other(b), Some(a));
        assert_eq!(edge.other(Uuid::new_v4()), None);
        assert!(edge.touches(a));
        assert!(!edge.touches(Uuid::new_v4()));
    }

    #[test]
    fn record_into_outlet_keeps_fields() {
        let record = OutletRecord {
            name: "Subway KLCC".to_string(),
            address: Some("Suria KLCC".to_string()),
            latitude: Some(3.158),
            longitude: 101.712,
            operating_hours: None,
            waze_link: "https://waze.com/ul/hw283".to_string(),
        };
        let id = Uuid::new_v4();
        let outlet = record.clone().into_outlet(id);
        assert_eq!(outlet.id, id);
        assert_eq!(outlet.name, record.name);
        assert_eq!(outlet.coordinates(), Some((3.158, 101.712)));
    }

    #[test]
    fn outlet_roundtrips_through_json() {
        let o = outlet(Some(3.13));
        let json = serde_json::to_string(&o).expect("serialize");
        let back: Outlet = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, o);
    }
}
