//! Pairwise geodesic distances and overlap detection.
//!
//! Distances are WGS-84 ellipsoidal geodesics (Karney's algorithm) in
//! kilometers. Every unordered pair `i < j` is evaluated once, in input order,
//! so edge output is deterministic for a given input.

use std::collections::HashMap;
use std::sync::Arc;

use geographiclib_rs::{Geodesic, InverseGeodesic};
use outletdb_core::{Outlet, OverlapEdge};
use uuid::Uuid;

use crate::error::IngestError;

pub const DEFAULT_OVERLAP_THRESHOLD_KM: f64 = 5.0;

/// Above this many outlets, [`compute_overlaps_blocking_pool`] spreads rows
/// over `spawn_blocking` workers.
pub const GEO_PARALLEL_THRESHOLD: usize = 512;

/// Symmetric `n × n` kilometer matrix with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    ids: Vec<Uuid>,
    index: HashMap<Uuid, usize>,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Builds a matrix from row-major `values`.
    ///
    /// Returns `None` unless `values.len() == ids.len()²`.
    #[must_use]
    pub fn from_parts(ids: Vec<Uuid>, values: Vec<f64>) -> Option<Self> {
        (values.len() == ids.len() * ids.len()).then(|| Self {
            index: index_of(&ids),
            ids,
            values,
        })
    }

    fn zeroed(ids: Vec<Uuid>) -> Self {
        let n = ids.len();
        Self {
            index: index_of(&ids),
            ids,
            values: vec![0.0; n * n],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> &[Uuid] {
        &self.ids
    }

    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.len();
        &self.values[i * n..(i + 1) * n]
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.len() + j]
    }

    fn set_pair(&mut self, i: usize, j: usize, km: f64) {
        let n = self.len();
        self.values[i * n + j] = km;
        self.values[j * n + i] = km;
    }

    /// Distance between two outlets by id, if both are in the matrix.
    #[must_use]
    pub fn distance(&self, a: Uuid, b: Uuid) -> Option<f64> {
        let i = *self.index.get(&a)?;
        let j = *self.index.get(&b)?;
        Some(self.get(i, j))
    }
}

fn index_of(ids: &[Uuid]) -> HashMap<Uuid, usize> {
    ids.iter().enumerate().map(|(i, id)| (*id, i)).collect()
}

/// Output of one geo computation.
#[derive(Debug, Clone)]
pub struct GeoResult {
    pub matrix: DistanceMatrix,
    pub edges: Vec<OverlapEdge>,
    /// Outlets left out of every pair because their latitude is unknown.
    pub excluded: Vec<Uuid>,
}

/// Geodesic distance in kilometers between two `(latitude, longitude)` points.
#[must_use]
pub fn geodesic_km(geod: &Geodesic, a: (f64, f64), b: (f64, f64)) -> f64 {
    let meters: f64 = geod.inverse(a.0, a.1, b.0, b.1);
    meters / 1000.0
}

/// Computes the distance matrix and overlap edges on the current thread.
///
/// Outlets without a latitude are excluded from the matrix and from every
/// pair, and reported in [`GeoResult::excluded`].
#[must_use]
pub fn compute_overlaps(outlets: &[Outlet], threshold_km: f64) -> GeoResult {
    let (ids, points, excluded) = split_located(outlets);
    let geod = Geodesic::wgs84();
    let rows: Vec<(usize, Vec<f64>)> = (0..points.len())
        .map(|i| (i, upper_row(&geod, &points, i)))
        .collect();
    assemble(ids, rows, excluded, threshold_km)
}

/// Same result as [`compute_overlaps`], with rows spread across `workers`
/// blocking tasks once the input exceeds [`GEO_PARALLEL_THRESHOLD`].
///
/// # Errors
///
/// Returns [`IngestError::Compute`] if a worker task panics or is cancelled.
pub async fn compute_overlaps_blocking_pool(
    outlets: &[Outlet],
    threshold_km: f64,
    workers: usize,
) -> Result<GeoResult, IngestError> {
    if outlets.len() <= GEO_PARALLEL_THRESHOLD {
        return Ok(compute_overlaps(outlets, threshold_km));
    }

    let (ids, points, excluded) = split_located(outlets);
    let points: Arc<[(f64, f64)]> = points.into();
    let workers = workers.clamp(1, points.len().max(1));

    // Row i costs n - i - 1 pairs; striding keeps the workers balanced.
    let handles: Vec<_> = (0..workers)
        .map(|w| {
            let points = Arc::clone(&points);
            tokio::task::spawn_blocking(move || {
                let geod = Geodesic::wgs84();
                (w..points.len())
                    .step_by(workers)
                    .map(|i| (i, upper_row(&geod, &points, i)))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut rows = Vec::with_capacity(points.len());
    for joined in futures::future::join_all(handles).await {
        rows.extend(joined.map_err(|e| IngestError::Compute(e.to_string()))?);
    }
    Ok(assemble(ids, rows, excluded, threshold_km))
}

type Located = (Vec<Uuid>, Vec<(f64, f64)>, Vec<Uuid>);

fn split_located(outlets: &[Outlet]) -> Located {
    let mut ids = Vec::with_capacity(outlets.len());
    let mut points = Vec::with_capacity(outlets.len());
    let mut excluded = Vec::new();
    for outlet in outlets {
        match outlet.coordinates() {
            Some(point) => {
                ids.push(outlet.id);
                points.push(point);
            }
            None => excluded.push(outlet.id),
        }
    }
    (ids, points, excluded)
}

/// Distances from point `i` to every point after it.
fn upper_row(geod: &Geodesic, points: &[(f64, f64)], i: usize) -> Vec<f64> {
    points[i + 1..]
        .iter()
        .map(|&p| geodesic_km(geod, points[i], p))
        .collect()
}

fn assemble(
    ids: Vec<Uuid>,
    mut rows: Vec<(usize, Vec<f64>)>,
    excluded: Vec<Uuid>,
    threshold_km: f64,
) -> GeoResult {
    rows.sort_unstable_by_key(|(i, _)| *i);
    let mut matrix = DistanceMatrix::zeroed(ids);
    let mut edges = Vec::new();

    for (i, row) in rows {
        for (offset, km) in row.into_iter().enumerate() {
            let j = i + 1 + offset;
            matrix.set_pair(i, j, km);
            if km < threshold_km {
                edges.push(OverlapEdge {
                    outlet1_id: matrix.ids[i],
                    outlet2_id: matrix.ids[j],
                    distance_km: km,
                });
            }
        }
    }

    GeoResult {
        matrix,
        edges,
        excluded,
    }
}
