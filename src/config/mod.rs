use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_port: default_api_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Username of the admin account created on first start
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    /// Initial admin password, only used when no admin exists yet
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    /// Lifetime of a login session in hours
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_username: default_admin_username(),
            admin_password: default_admin_password(),
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "admin123".to_string()
}

fn default_session_ttl_hours() -> i64 {
    12
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Interval between doctor roster refreshes in seconds (default: 5)
    #[serde(default = "default_roster_refresh_secs")]
    pub roster_refresh_secs: u64,
    /// Seed sample doctors, medicines and tests into an empty database
    #[serde(default = "default_seed_sample_data")]
    pub seed_sample_data: bool,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            roster_refresh_secs: default_roster_refresh_secs(),
            seed_sample_data: default_seed_sample_data(),
        }
    }
}

fn default_roster_refresh_secs() -> u64 {
    5
}

fn default_seed_sample_data() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            booking: BookingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            config.validate()?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.auth.session_ttl_hours <= 0
            || chrono::TimeDelta::try_hours(self.auth.session_ttl_hours).is_none()
        {
            anyhow::bail!(
                "auth.session_ttl_hours must be a positive number of hours, got {}",
                self.auth.session_ttl_hours
            );
        }
        if self.booking.roster_refresh_secs == 0 {
            anyhow::bail!("booking.roster_refresh_secs must be at least 1");
        }
        Ok(())
    }

    /// Path of the SQLite database file inside the data directory
    pub fn database_path(&self) -> PathBuf {
        self.server.data_dir.join("frontdesk.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(&temp_dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.server.api_port, 8080);
        assert_eq!(config.auth.admin_username, "admin");
        assert_eq!(config.booking.roster_refresh_secs, 5);
        assert!(config.booking.seed_sample_data);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("frontdesk.toml");
        std::fs::write(
            &path,
            r#"
[server]
api_port = 9090
data_dir = "/var/lib/frontdesk"

[booking]
roster_refresh_secs = 30
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.api_port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/frontdesk/frontdesk.db")
        );
        assert_eq!(config.booking.roster_refresh_secs, 30);
        assert_eq!(config.auth.session_ttl_hours, 12);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("frontdesk.toml");
        std::fs::write(&path, "[server\napi_port = ").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_session_ttl_must_be_usable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("frontdesk.toml");

        for ttl in ["0", "-3", "9223372036854775807"] {
            std::fs::write(&path, format!("[auth]\nsession_ttl_hours = {}\n", ttl)).unwrap();
            let err = Config::load(&path).unwrap_err();
            assert!(err.to_string().contains("session_ttl_hours"), "ttl {}", ttl);
        }

        std::fs::write(&path, "[auth]\nsession_ttl_hours = 48\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().auth.session_ttl_hours, 48);
    }

    #[test]
    fn test_zero_roster_interval_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("frontdesk.toml");
        std::fs::write(&path, "[booking]\nroster_refresh_secs = 0\n").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
