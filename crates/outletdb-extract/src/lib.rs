//! Client for the structured-extraction service that turns free-text
//! operating hours into per-day `HH:MM` fields.

pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use client::{ExtractionClient, RetryPolicy};
pub use error::ExtractError;
pub use types::{ExtractedHours, HoursInput};
