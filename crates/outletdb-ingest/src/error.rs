use thiserror::Error;

/// Errors that abort an ingestion run. Degraded normalization and a failed
/// artifact write are reported, not raised.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("source fetch failed: {0}")]
    SourceFetch(#[from] outletdb_source::SourceError),

    #[error("distance computation failed: {0}")]
    Compute(String),

    #[error("persistence failed: {0}")]
    Persistence(#[from] outletdb_db::DbError),

    #[error("persistence timed out after {secs}s")]
    PersistTimeout { secs: u64 },
}

/// Errors reading or writing the distance-matrix CSV.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed distance matrix: {0}")]
    Malformed(String),
}
