pub mod interim;
pub mod rainfall_totals;
pub mod workbook;

pub use interim::{build_report, InterimReport, MonitorType};
pub use rainfall_totals::{build_totals, RainfallTotals};
pub use workbook::{write_final_report, write_interim_files, write_rainfall_totals};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Series error: {0}")]
    Series(#[from] crate::timeseries::SeriesError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("No usable samples in the monitored column")]
    EmptySeries,

    #[error("Could not determine the sample interval")]
    NoInterval,
}
