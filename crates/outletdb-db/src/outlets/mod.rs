//! Database operations for the outlet dataset: `outlets`,
//! `overlapping_outlets`, and `outlet_operating_hours`.

mod read;
mod types;
mod write;

pub use read::{
    get_operating_hours, get_outlet, list_operating_hours, list_outlets, list_overlaps,
    list_overlaps_for_outlet, load_snapshot, DatasetSnapshot,
};
pub use types::{NewDataset, OperatingHoursRow, OutletRow, OverlapRow, ReplaceCounts};
pub use write::replace_dataset;
