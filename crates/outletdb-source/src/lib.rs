pub mod client;
pub mod error;
pub mod normalize;
pub mod types;

pub use client::{SourceBatch, SourceClient};
pub use error::SourceError;
pub use normalize::{fix_duplicated_link, normalize_record, SkippedRecord};
pub use types::{RawCoordinate, RawHours, RawOutletRecord};
