//! Error types for the daily tracker.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Weather error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Estimator error: {0}")]
    Estimator(#[from] EstimatorError),

    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors. These abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Geolocation and current-weather lookup failures.
///
/// The `Display` text of each variant is what the user sees when a city
/// cannot be resolved during onboarding.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("City not found")]
    CityNotFound,

    #[error("Weather service returned status {status}")]
    BadStatus { status: u16 },

    #[error("Malformed weather response: {0}")]
    MalformedResponse(String),

    /// Transport failure. Holds the error with its request URL removed,
    /// since the URL carries the API key.
    #[error("Network error: {0}")]
    Network(reqwest::Error),
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.without_url())
    }
}

/// Calorie estimation service failures.
#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    #[error("Estimator returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("Unexpected estimator response format")]
    UnexpectedFormat,

    #[error("Network error: {0}")]
    Network(reqwest::Error),
}

impl From<reqwest::Error> for EstimatorError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.without_url())
    }
}

/// Chart rendering failures.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Failed to write chart to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for the tracker.
pub type Result<T> = std::result::Result<T, Error>;
