//! Application configuration
//!
//! Loaded from a TOML file (default `~/.config/carelist-auth/config.toml`).
//! A missing file is created with default values on first start.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_DIR: &str = "carelist-auth";
const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CARELIST_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Path of the config file: `$CARELIST_CONFIG` or the per-user default.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    /// `development` or `production`. Development adds internal error
    /// details to 500 responses.
    pub environment: String,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout: u64,
    /// Allowed CORS origins; empty allows any origin without credentials
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 5000,
            environment: "development".to_string(),
            shutdown_timeout: 30,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
}

impl DatabaseSettings {
    /// Connection URL; a relative SQLite path resolves inside the config directory.
    pub fn connection_url(&self) -> String {
        if let Some(path) = self.url.strip_prefix("sqlite://") {
            let file = path.split('?').next().unwrap_or(path);
            if !file.is_empty() && file != ":memory:" && Path::new(file).is_relative() {
                if let Some(dir) = default_config_path().parent() {
                    let mut url = format!("sqlite://{}", dir.join(path).display());
                    if !path.contains('?') {
                        url.push_str("?mode=rwc");
                    }
                    return url;
                }
            }
        }
        self.url.clone()
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://carelist.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub jwt_issuer: String,
    pub otp_ttl_minutes: i64,
    /// Adds `Secure` to the session cookie
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("otp_ttl_minutes", &self.otp_ttl_minutes)
            .field("cookie_secure", &self.cookie_secure)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_hours: 168,
            jwt_issuer: "carelist-auth".to_string(),
            otp_ttl_minutes: 10,
            cookie_secure: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// HTTP mail relay endpoint. When unset, messages are only logged in
    /// development and refused in every other environment.
    pub relay_url: Option<String>,
    pub api_key: String,
    pub from_address: String,
    pub from_name: String,
    /// Deliver every message to this address instead of the real recipient
    pub test_recipient: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("relay_url", &self.relay_url)
            .field("api_key", &"<redacted>")
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .field("test_recipient", &self.test_recipient)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            api_key: String::new(),
            from_address: "noreply@carelist.local".to_string(),
            from_name: "Hospital Management System".to_string(),
            test_recipient: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: "admin@carelist.local".to_string(),
            full_name: "System Administrator".to_string(),
            password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub security: SecurityConfig,
    pub email: EmailConfig,
    pub logging: LoggingConfig,
    pub admin: AdminConfig,
}

impl AppConfig {
    /// Load config from `path`, writing defaults there if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let raw = toml::to_string_pretty(self)?;
        fs::write(path, raw).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("security.jwt_secret is empty".into()));
        }
        if self.security.jwt_expiration_hours <= 0 {
            return Err(ConfigError::Invalid(
                "security.jwt_expiration_hours must be positive".into(),
            ));
        }
        if self.security.otp_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "security.otp_ttl_minutes must be positive".into(),
            ));
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Invalid(
                "security.bcrypt_cost must be between 4 and 31".into(),
            ));
        }
        if !matches!(self.logging.format.to_lowercase().as_str(), "text" | "json") {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be 'text' or 'json', got '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            api_port = 8080

            [security]
            jwt_secret = "s3cret"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.api_port, 8080);
        assert_eq!(cfg.server.api_host, "0.0.0.0");
        assert_eq!(cfg.security.jwt_secret, "s3cret");
        assert_eq!(cfg.security.jwt_expiration_hours, 168);
        assert_eq!(cfg.security.otp_ttl_minutes, 10);
        assert!(cfg.email.relay_url.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.security.jwt_secret = "  ".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let mut cfg = AppConfig::default();
        cfg.logging.format = "xml".into();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.security.otp_ttl_minutes = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_writes_defaults_when_missing() {
        let dir = std::env::temp_dir().join(format!("carelist-cfg-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        let cfg = AppConfig::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.server.api_port, 5000);

        let reloaded = AppConfig::load(&path).unwrap();
        assert_eq!(reloaded.admin.email, cfg.admin.email);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn absolute_and_memory_urls_are_untouched() {
        let db = DatabaseSettings {
            url: "sqlite::memory:".into(),
        };
        assert_eq!(db.connection_url(), "sqlite::memory:");

        let db = DatabaseSettings {
            url: "sqlite:///var/lib/carelist.db?mode=rwc".into(),
        };
        assert_eq!(db.connection_url(), "sqlite:///var/lib/carelist.db?mode=rwc");
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let cfg = AppConfig::default();
        let out = format!("{:?}", cfg);
        assert!(!out.contains("change-me-in-production"));
        assert!(!out.contains("admin123"));
    }
}
