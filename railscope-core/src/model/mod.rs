//! Data model for passenger-flow analytics
//!
//! Rows are typed once at the ingestion boundary; all aggregation code
//! operates on these records, never on string-keyed lookups.

pub mod filter;
pub mod names;
pub mod records;

pub use filter::{DayType, Direction, FilterSpec, Thresholds};
pub use names::{NameDirectory, NameResolver};
pub use records::{DailyTotal, FlowRow, RouteStationEdge, SegmentRow, TripKey};
