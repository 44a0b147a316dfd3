use std::time::Duration;

/// Errors raised inside the email channel.
///
/// These never leave [`crate::EmailChannel::send`]; they are logged and turned into `false`.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// Simple email service (SES) errors.
    #[error("AWS SES error: {0}")]
    SesError(String),

    /// Any other mail transport failure.
    #[error("Mail transport error: {0}")]
    Transport(String),

    /// The transport did not answer in time.
    #[error("Mail transport timed out after {0:?}")]
    Timeout(Duration),

    /// The recipient directory could not be queried.
    #[error("User directory error: {0}")]
    Directory(String),

    /// Invalid email format.
    #[error("Invalid email format")]
    InvalidEmail,
}

impl From<sqlx::Error> for EmailError {
    fn from(e: sqlx::Error) -> Self {
        EmailError::Directory(e.to_string())
    }
}

/// A fully rendered message ready for a mail transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html_body: String,
    /// Plain-text body
    pub text_body: String,
}

/// Email channel settings.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Sender address (default: noreply@bookswap.local)
    pub from_email: String,

    /// Upper bound on a single hand-off to the transport (default: 10 seconds)
    pub send_timeout: Duration,

    /// Base URL for links in email bodies (default: https://bookswap.local)
    pub base_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from_email: "noreply@bookswap.local".to_string(),
            send_timeout: Duration::from_secs(10),
            base_url: "https://bookswap.local".to_string(),
        }
    }
}
