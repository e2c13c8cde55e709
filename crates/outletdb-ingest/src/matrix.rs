//! The distance-matrix CSV artifact.
//!
//! Layout: the header row is an empty cell followed by outlet ids; each data
//! row is an outlet id followed by kilometer distances in header order. The
//! file is written to a sibling temp path and renamed into place, so readers
//! see either the previous matrix or the new one.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use uuid::Uuid;

use crate::error::ArtifactError;
use crate::geo::DistanceMatrix;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `matrix` to `path` atomically, creating parent directories.
///
/// # Errors
///
/// Returns [`ArtifactError`] if the directory, temp file, or rename fails.
pub fn write_matrix(path: &Path, matrix: &DistanceMatrix) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let tmp = temp_path(path);
    let written = write_csv(&tmp, matrix);
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).map_err(io_err(path))
}

fn write_csv(path: &Path, matrix: &DistanceMatrix) -> Result<(), ArtifactError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = Vec::with_capacity(matrix.len() + 1);
    header.push(String::new());
    header.extend(matrix.ids().iter().map(Uuid::to_string));
    writer.write_record(&header)?;

    for (i, id) in matrix.ids().iter().enumerate() {
        let mut record = Vec::with_capacity(matrix.len() + 1);
        record.push(id.to_string());
        record.extend(matrix.row(i).iter().map(f64::to_string));
        writer.write_record(&record)?;
    }

    writer.flush().map_err(io_err(path))
}

/// Reads a matrix previously written by [`write_matrix`].
///
/// # Errors
///
/// Returns [`ArtifactError`] if the file cannot be read, is not valid CSV,
/// or is not a square matrix whose row ids match the header.
pub fn read_matrix(path: &Path) -> Result<DistanceMatrix, ArtifactError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let header = reader.headers()?.clone();
    let mut cells = header.iter();
    if cells.next().is_some_and(|corner| !corner.is_empty()) {
        return Err(ArtifactError::Malformed(
            "top-left header cell must be empty".into(),
        ));
    }
    let ids = cells.map(parse_id).collect::<Result<Vec<_>, _>>()?;

    let mut values = Vec::with_capacity(ids.len() * ids.len());
    let mut rows = 0usize;
    for record in reader.records() {
        let record = record?;
        let row_id = record
            .get(0)
            .ok_or_else(|| ArtifactError::Malformed("empty row".into()))
            .and_then(parse_id)?;
        if ids.get(rows) != Some(&row_id) {
            return Err(ArtifactError::Malformed(format!(
                "row {rows} id {row_id} does not match header"
            )));
        }
        if record.len() != ids.len() + 1 {
            return Err(ArtifactError::Malformed(format!(
                "row {row_id} has {} cells, expected {}",
                record.len() - 1,
                ids.len()
            )));
        }
        for cell in record.iter().skip(1) {
            let km = cell
                .parse::<f64>()
                .map_err(|_| ArtifactError::Malformed(format!("non-numeric cell {cell:?}")))?;
            values.push(km);
        }
        rows += 1;
    }

    DistanceMatrix::from_parts(ids, values)
        .ok_or_else(|| ArtifactError::Malformed(format!("expected a square matrix, got {rows} rows")))
}

/// Point lookup used by the read API and the Q&A agent.
///
/// Returns `Ok(None)` when either id is not in the matrix.
///
/// # Errors
///
/// Returns [`ArtifactError`] if the artifact cannot be read.
pub fn lookup_distance(path: &Path, a: Uuid, b: Uuid) -> Result<Option<f64>, ArtifactError> {
    Ok(read_matrix(path)?.distance(a, b))
}

/// Keeps the last parsed matrix in memory and re-reads the artifact only when
/// its modification time or size changes.
///
/// Loading does blocking file I/O; async callers go through
/// `spawn_blocking`.
#[derive(Debug)]
pub struct MatrixCache {
    path: PathBuf,
    loaded: Mutex<Option<Loaded>>,
}

#[derive(Debug)]
struct Loaded {
    fingerprint: Fingerprint,
    matrix: Arc<DistanceMatrix>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

impl MatrixCache {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current matrix, parsed at most once per artifact version.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] if the artifact is missing or unreadable.
    /// A previously cached matrix is not served once the file is gone.
    pub fn load(&self) -> Result<Arc<DistanceMatrix>, ArtifactError> {
        let meta = fs::metadata(&self.path).map_err(io_err(&self.path))?;
        let fingerprint = Fingerprint {
            modified: meta.modified().ok(),
            len: meta.len(),
        };

        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = loaded.as_ref() {
            if current.fingerprint == fingerprint && fingerprint.modified.is_some() {
                return Ok(Arc::clone(&current.matrix));
            }
        }

        let matrix = Arc::new(read_matrix(&self.path)?);
        tracing::debug!(
            path = %self.path.display(),
            outlets = matrix.len(),
            "matrix: loaded distance matrix artifact"
        );
        *loaded = Some(Loaded {
            fingerprint,
            matrix: Arc::clone(&matrix),
        });
        Ok(matrix)
    }

    /// Like [`lookup_distance`], against the cached matrix.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] if the artifact cannot be loaded.
    pub fn lookup(&self, a: Uuid, b: Uuid) -> Result<Option<f64>, ArtifactError> {
        Ok(self.load()?.distance(a, b))
    }
}

fn parse_id(cell: &str) -> Result<Uuid, ArtifactError> {
    Uuid::parse_str(cell.trim())
        .map_err(|e| ArtifactError::Malformed(format!("bad outlet id {cell:?}: {e}")))
}
