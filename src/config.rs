use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub max_retries: usize,
    pub output_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            api_base_url: env::var("FDV_API_BASE_URL")?,
            request_timeout_secs: env::var("FDV_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            max_retries: env::var("FDV_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            output_dir: env::var("FDV_OUTPUT_DIR").unwrap_or_else(|_| ".".to_string()),
        })
    }
}
