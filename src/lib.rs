pub mod config;
pub mod credentials;
pub mod download;
pub mod fdv;
pub mod fetch_error;
pub mod fetcher;
pub mod geometry;
pub mod reports;
pub mod timeseries;
