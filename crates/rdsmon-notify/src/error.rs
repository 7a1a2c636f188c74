/// Errors that can occur while delivering a rendered report.
///
/// Delivery failures are non-fatal for the run: the boundary logs them
/// and carries on with the other channel.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// HTTP transport failure when posting to the webhook.
    #[error("Notify: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook endpoint answered with a non-success status.
    #[error("Notify: webhook returned status={status}, body={body}")]
    WebhookRejected { status: u16, body: String },

    /// A sender or recipient address did not parse.
    #[error("Notify: invalid mail address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),

    /// The mail message could not be assembled.
    #[error("Notify: mail build error: {0}")]
    MailBuild(#[from] lettre::error::Error),

    /// SMTP transport failure.
    #[error("Notify: SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Channel is not configured well enough to send.
    #[error("Notify: channel misconfigured: {0}")]
    Misconfigured(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
