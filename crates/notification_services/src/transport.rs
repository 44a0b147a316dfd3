use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ses::Client as SesClient;

use crate::types::{EmailError, OutboundEmail};

/// Trait for mail transport implementations
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Hands a message to the transport, returning the transport's message id.
    async fn deliver(&self, email: &OutboundEmail) -> Result<String, EmailError>;

    /// Checks that the transport is configured and reachable.
    async fn verify(&self) -> Result<(), EmailError>;
}

/// AWS SES mail transport.
#[derive(Debug, Clone)]
pub struct SesMailTransport {
    ses_client: SesClient,
}

impl SesMailTransport {
    /// Creates a transport from the default AWS configuration chain.
    pub async fn new() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;

        Self {
            ses_client: SesClient::new(&config),
        }
    }
}

#[async_trait]
impl MailTransport for SesMailTransport {
    async fn deliver(&self, email: &OutboundEmail) -> Result<String, EmailError> {
        log::info!("📧 Sending '{}' to {} via AWS SES", email.subject, email.to);

        let subject_content = aws_sdk_ses::types::Content::builder()
            .data(&email.subject)
            .build()
            .map_err(|e| EmailError::SesError(format!("Failed to build subject: {}", e)))?;

        let html_content = aws_sdk_ses::types::Content::builder()
            .data(&email.html_body)
            .build()
            .map_err(|e| EmailError::SesError(format!("Failed to build HTML body: {}", e)))?;

        let text_content = aws_sdk_ses::types::Content::builder()
            .data(&email.text_body)
            .build()
            .map_err(|e| EmailError::SesError(format!("Failed to build text body: {}", e)))?;

        let body = aws_sdk_ses::types::Body::builder()
            .html(html_content)
            .text(text_content)
            .build();

        let message = aws_sdk_ses::types::Message::builder()
            .subject(subject_content)
            .body(body)
            .build();

        let destination = aws_sdk_ses::types::Destination::builder()
            .to_addresses(&email.to)
            .build();

        let result = self
            .ses_client
            .send_email()
            .source(&email.from)
            .destination(destination)
            .message(message)
            .send()
            .await;

        match result {
            Ok(output) => {
                let message_id = output.message_id().to_string();
                log::info!("📧 SES Message ID: {}", message_id);
                Ok(message_id)
            }
            Err(e) => {
                let error_msg = if let Some(service_error) = e.as_service_error() {
                    format!("AWS SES service error: {:?}", service_error)
                } else {
                    format!("AWS SES error: {}", e)
                };
                Err(EmailError::SesError(error_msg))
            }
        }
    }

    async fn verify(&self) -> Result<(), EmailError> {
        let quota = self
            .ses_client
            .get_send_quota()
            .send()
            .await
            .map_err(|e| EmailError::SesError(format!("Failed to read send quota: {}", e)))?;

        log::info!(
            "📧 SES quota: {:?} sent of {:?} in the last 24h",
            quota.sent_last24_hours(),
            quota.max24_hour_send()
        );
        Ok(())
    }
}

/// Development transport that only logs outgoing mail.
pub struct LogMailTransport;

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn deliver(&self, email: &OutboundEmail) -> Result<String, EmailError> {
        log::info!("📧 [LOG EMAIL] From: {}", email.from);
        log::info!("📧 [LOG EMAIL] To: {}", email.to);
        log::info!("📧 [LOG EMAIL] Subject: {}", email.subject);
        log::debug!("📧 [LOG EMAIL] Body:\n{}", email.text_body);

        Ok(format!("log-email-{}", uuid::Uuid::new_v4()))
    }

    async fn verify(&self) -> Result<(), EmailError> {
        log::warn!("📧 Using log-only mail transport; no email will leave this process");
        Ok(())
    }
}
