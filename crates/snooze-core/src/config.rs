use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Top-level config (snooze.toml + SNOOZE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnoozeConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl Default for SnoozeConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            auth: AuthConfig {
                api_key: "change-me".to_string(),
                dashboard_user: "admin".to_string(),
                dashboard_password: "change-me".to_string(),
            },
            database: DatabaseConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Only used for the human-readable startup hint.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            public_url: default_public_url(),
        }
    }
}

/// Secrets for the two HTTP gates: the API key protecting the job endpoints
/// and the Basic-auth pair protecting the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub api_key: String,
    pub dashboard_user: String,
    pub dashboard_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on a single outbound call so a hung target cannot pin a
    /// dispatcher slot.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_public_url() -> String {
    format!("http://localhost:{}", DEFAULT_PORT)
}
fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}
fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.snooze/snooze.db", home)
}

impl SnoozeConfig {
    /// Load config from a TOML file with SNOOZE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. SNOOZE_CONFIG env var (handled by the caller)
    ///   3. ~/.snooze/snooze.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: SnoozeConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SNOOZE_").split("_"))
            .extract()
            .map_err(|e| crate::error::SnoozeError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.snooze/snooze.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_wired() {
        let cfg = SnoozeConfig::default();
        assert_eq!(cfg.gateway.port, DEFAULT_PORT);
        assert_eq!(cfg.gateway.bind, DEFAULT_BIND);
        assert_eq!(cfg.dispatch.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
        assert!(cfg.database.path.ends_with("snooze.db"));
    }
}
