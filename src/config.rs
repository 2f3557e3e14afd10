//! Configuration types.
//!
//! Everything is read from the environment. Missing credentials are fatal:
//! the bot refuses to start rather than run with a broken collaborator.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default cron expression for the daily reset (local midnight).
pub const DEFAULT_RESET_SCHEDULE: &str = "0 0 0 * * *";

/// Default YandexGPT model used for calorie estimation.
pub const DEFAULT_YANDEX_MODEL: &str = "yandexgpt-lite";

/// Tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Telegram Bot API token.
    pub bot_token: SecretString,
    /// Telegram usernames or numeric IDs allowed to talk to the bot (`*` = everyone).
    pub allowed_users: Vec<String>,
    /// OpenWeatherMap API key (geocoding + current weather).
    pub weather_api_key: SecretString,
    /// Yandex Cloud API key for the Foundation Models API.
    pub yandex_api_key: SecretString,
    /// Yandex Cloud folder (catalog) ID.
    pub yandex_folder_id: String,
    /// Yandex Cloud service key ID. Read for parity with the deployment env; not sent.
    pub yandex_key_id: Option<String>,
    /// YandexGPT model name.
    pub yandex_model: String,
    /// Append-only event log file.
    pub event_log_path: PathBuf,
    /// Directory where progress charts are written.
    pub charts_dir: PathBuf,
    /// Directory for rolling tracing output. Console only when unset.
    pub trace_dir: Option<PathBuf>,
    /// Port for the read-only HTTP API.
    pub http_port: u16,
    /// Cron expression for the daily counter reset.
    pub reset_schedule: String,
    /// Whether to also read commands from stdin.
    pub enable_cli: bool,
}

impl TrackerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let bot_token = required("BOT_TOKEN")?;
        let weather_api_key = required("OPEN_WEATHER_API_KEY")?;
        let yandex_api_key = required("YANDEX_API_KEY")?;
        let yandex_folder_id = required("YANDEX_CLOUD_CAT_ID")?;

        let http_port = match lookup("TRACKER_HTTP_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "TRACKER_HTTP_PORT".to_string(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            None => 8080,
        };

        let reset_schedule =
            lookup("TRACKER_RESET_SCHEDULE").unwrap_or_else(|| DEFAULT_RESET_SCHEDULE.to_string());
        if let Err(e) = crate::scheduler::next_reset_after(&reset_schedule, chrono::Local::now()) {
            return Err(ConfigError::InvalidValue {
                key: "TRACKER_RESET_SCHEDULE".to_string(),
                message: e,
            });
        }

        let allowed_users: Vec<String> = lookup("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            allowed_users,
            weather_api_key: SecretString::from(weather_api_key),
            yandex_api_key: SecretString::from(yandex_api_key),
            yandex_folder_id,
            yandex_key_id: lookup("YANDEX_KEY_ID"),
            yandex_model: lookup("YANDEX_MODEL")
                .unwrap_or_else(|| DEFAULT_YANDEX_MODEL.to_string()),
            event_log_path: lookup("TRACKER_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./bot.log")),
            charts_dir: lookup("TRACKER_CHARTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./graphs")),
            trace_dir: lookup("TRACKER_TRACE_DIR")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            http_port,
            reset_schedule,
            enable_cli: lookup("TRACKER_CLI")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}
