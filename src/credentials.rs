//! Stored login details for the telemetry API.
//!
//! Credentials live in a TOML file under the user's home directory
//! (`~/.fdv-converter/credentials.toml`), overridable with the
//! `FDV_CONVERTER_DIR` environment variable.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Could not find home directory")]
    NoHomeDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse credential file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize credentials: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Username and password must not be empty")]
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Base directory for stored state (~/.fdv-converter/), overridable
    /// with FDV_CONVERTER_DIR.
    fn store_dir() -> Result<PathBuf, CredentialError> {
        if let Ok(custom_dir) = std::env::var("FDV_CONVERTER_DIR") {
            return Ok(PathBuf::from(custom_dir));
        }

        let home = dirs::home_dir().ok_or(CredentialError::NoHomeDir)?;
        Ok(home.join(".fdv-converter"))
    }

    pub fn store_path() -> Result<PathBuf, CredentialError> {
        Ok(Self::store_dir()?.join("credentials.toml"))
    }

    /// Load saved credentials, if any.
    pub fn load() -> Result<Option<Self>, CredentialError> {
        let path = Self::store_path()?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        let creds: Credentials = toml::from_str(&contents)?;
        Ok(Some(creds))
    }

    /// Persist the credentials, creating the store directory if needed.
    pub fn save(&self) -> Result<(), CredentialError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(CredentialError::Empty);
        }

        let path = Self::store_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!("Credentials saved to {}", path.display());
        Ok(())
    }

    /// Remove stored credentials. Succeeds if none exist.
    pub fn clear() -> Result<(), CredentialError> {
        let path = Self::store_path()?;
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Login details cleared");
        }
        Ok(())
    }
}

/// Prompt for any missing login details on the terminal. The password is
/// read without echo.
pub fn prompt_for_credentials(username: Option<String>) -> Result<Credentials, CredentialError> {
    let username = match username {
        Some(u) => u,
        None => {
            print!("Username: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            line.trim().to_string()
        }
    };

    let password = rpassword::prompt_password("Password: ")?;
    let password = password.trim().to_string();

    if username.is_empty() || password.is_empty() {
        return Err(CredentialError::Empty);
    }

    Ok(Credentials::new(username, password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // FDV_CONVERTER_DIR is process-global; serialize the tests that set it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_store_dir<T>(f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("FDV_CONVERTER_DIR", dir.path());
        let out = f();
        std::env::remove_var("FDV_CONVERTER_DIR");
        out
    }

    #[test]
    fn test_save_load_clear_round_trip() {
        with_store_dir(|| {
            let creds = Credentials::new("surveyor", "hunter2");
            creds.save().unwrap();

            let loaded = Credentials::load().unwrap().expect("credentials saved");
            assert_eq!(loaded.username, "surveyor");
            assert_eq!(loaded.password, "hunter2");

            Credentials::clear().unwrap();
            assert!(Credentials::load().unwrap().is_none());
        });
    }

    #[test]
    fn test_empty_credentials_rejected() {
        with_store_dir(|| {
            let creds = Credentials::new("", "");
            assert!(matches!(creds.save(), Err(CredentialError::Empty)));
        });
    }

    #[test]
    fn test_clear_without_saved_credentials() {
        with_store_dir(|| {
            assert!(Credentials::clear().is_ok());
        });
    }
}
