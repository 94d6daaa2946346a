pub mod flow;
pub mod rainfall;

pub use flow::FdvFlowWriter;
pub use rainfall::FdvRainfallWriter;

#[derive(Debug, thiserror::Error)]
pub enum FdvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rainfall column not specified")]
    MissingRainfallColumn,
}

/// FDV identifiers are uppercase and at most 15 characters.
pub(crate) fn identifier(site_name: &str) -> String {
    site_name.chars().take(15).collect::<String>().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_short_name() {
        assert_eq!(identifier("Shuttertown"), "SHUTTERTOWN");
    }

    #[test]
    fn test_identifier_truncates_to_15() {
        assert_eq!(identifier("Shuttertown Main Outfall"), "SHUTTERTOWN MAI");
    }
}
