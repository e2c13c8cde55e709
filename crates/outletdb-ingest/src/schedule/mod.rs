//! Batched schedule normalization through a [`crate::ScheduleExtractor`].

mod normalizer;
pub mod parse;

pub use normalizer::{normalize_schedules, NormalizedSchedules, NormalizerConfig};
pub use parse::{parse_record, parse_time, ParsedRecord};
