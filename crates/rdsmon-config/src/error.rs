/// Errors raised while loading run configuration. All of these are
/// fatal: the run must not start with a broken threshold set.
///
/// # Examples
///
/// ```
/// use rdsmon_config::ConfigError;
///
/// let err = ConfigError::MissingKey("TEAMS_WEBHOOK".to_string());
/// assert!(err.to_string().contains("TEAMS_WEBHOOK"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required key is absent from the environment.
    #[error("Config: required key {0} is not set")]
    MissingKey(String),

    /// A numeric key holds a value that does not parse.
    #[error("Config: {key} is not a valid number: {value:?}")]
    InvalidNumber { key: String, value: String },

    /// A warn/alert pair where the warn value already represents a
    /// worse condition than the alert value.
    #[error("Config: {check} thresholds inverted: warn={warn}, alert={alert}")]
    InvertedPair {
        check: &'static str,
        warn: f64,
        alert: f64,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
