use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub wheel: WheelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub store_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_path: ".wheel-session.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    /// Whole turns added before the target angle.
    pub full_turns: u32,
    pub duration_ms: u64,
    /// Margin kept between the jitter and the segment edges, in degrees.
    pub jitter_epsilon_deg: f64,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            full_turns: 5,
            duration_ms: 5000,
            jitter_epsilon_deg: 1.0,
        }
    }
}

impl WheelConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "prize-wheel-client".to_string()
}

impl Config {
    pub fn from_toml() -> AppResult<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // No file: everything comes from the environment
                let base_url = env::var("WHEEL_API_BASE_URL").map_err(|_| {
                    AppError::ConfigError(
                        "WHEEL_API_BASE_URL is not set and config.toml was not found".into(),
                    )
                })?;
                Config {
                    api: ApiConfig {
                        base_url,
                        timeout_secs: default_timeout_secs(),
                        user_agent: default_user_agent(),
                    },
                    session: SessionConfig::default(),
                    wheel: WheelConfig::default(),
                }
            }
            Err(e) => {
                return Err(AppError::ConfigError(format!(
                    "Cannot read config file {config_path}: {e}"
                )));
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn parse(config_str: &str) -> AppResult<Self> {
        toml::from_str(config_str)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse config file: {e}")))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("WHEEL_API_BASE_URL") {
            self.api.base_url = v;
        }
        if let Ok(v) = env::var("WHEEL_API_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            self.api.timeout_secs = n;
        }
        if let Ok(v) = env::var("WHEEL_SESSION_PATH") {
            self.session.store_path = v;
        }
        if let Ok(v) = env::var("WHEEL_DURATION_MS")
            && let Ok(n) = v.parse()
        {
            self.wheel.duration_ms = n;
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::ConfigError("api.base_url must not be empty".into()));
        }
        if self.wheel.full_turns == 0 {
            return Err(AppError::ConfigError("wheel.full_turns must be at least 1".into()));
        }
        if self.wheel.duration_ms == 0 {
            return Err(AppError::ConfigError("wheel.duration_ms must be positive".into()));
        }
        if !(self.wheel.jitter_epsilon_deg > 0.0) {
            return Err(AppError::ConfigError(
                "wheel.jitter_epsilon_deg must be positive".into(),
            ));
        }
        Ok(())
    }
}
