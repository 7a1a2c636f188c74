/// Errors raised while querying the cloud account.
///
/// A listing failure is fatal for the run (the caller logs and exits
/// that invocation); per-metric failures never surface here, they
/// degrade to "no data" on the snapshot instead.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The account/region cannot be queried at all.
    #[error("cloud source unavailable: {0}")]
    Unavailable(String),

    /// Credentials are not present in the environment.
    #[error("AWS credentials missing: {0} is not set")]
    MissingCredentials(&'static str),

    /// Non-2xx status from the cloud API.
    #[error("{service} API HTTP error: status={status}, body={body}")]
    HttpError {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Underlying HTTP transport error from `reqwest`.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response parsed as JSON but did not have the expected shape.
    #[error("unexpected {service} response shape: {detail}")]
    Malformed {
        service: &'static str,
        detail: String,
    },

    /// JSON deserialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HMAC signing failed while building the request signature.
    #[error("request signing error: {0}")]
    Signing(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;
