pub mod loader;
pub mod series;
pub mod timestamp;

pub use series::{Channel, SeriesError, TimeSeries};
pub use timestamp::{parse_timestamp, TIMESTAMP_FORMAT};
