use std::sync::Arc;

use async_trait::async_trait;
use notification_store::NotificationType;

use crate::templates::render_email;
use crate::transport::MailTransport;
use crate::types::{EmailConfig, EmailError, OutboundEmail};

/// Resolves a recipient's email address.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `None` when the user is unknown, inactive or has no address on file.
    async fn resolve_email(&self, user_id: &str) -> Result<Option<String>, EmailError>;
}

/// Anything that can email a notification to a user.
///
/// Implementations never fail loudly: `true` means the message was handed
/// off, `false` covers every failure.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Emails one notification to `user_id`.
    async fn send(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        notification_type: NotificationType,
    ) -> bool;
}

/// Best-effort email delivery built from a directory and a transport.
pub struct EmailChannel {
    directory: Arc<dyn UserDirectory>,
    transport: Arc<dyn MailTransport>,
    config: EmailConfig,
}

impl EmailChannel {
    /// Create a new email channel
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        transport: Arc<dyn MailTransport>,
        config: Option<EmailConfig>,
    ) -> Self {
        Self {
            directory,
            transport,
            config: config.unwrap_or_default(),
        }
    }

    /// Startup check of the transport. Failure is logged, not fatal.
    pub async fn verify(&self) -> bool {
        match tokio::time::timeout(self.config.send_timeout, self.transport.verify()).await {
            Ok(Ok(())) => {
                log::info!("✅ Email transport is ready");
                true
            }
            Ok(Err(e)) => {
                log::error!("❌ Email transport verification failed: {}", e);
                false
            }
            Err(_) => {
                log::error!(
                    "❌ Email transport verification timed out after {:?}",
                    self.config.send_timeout
                );
                false
            }
        }
    }

    async fn try_send(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        notification_type: NotificationType,
    ) -> Result<Option<String>, EmailError> {
        let Some(to) = self.directory.resolve_email(user_id).await? else {
            return Ok(None);
        };
        if !to.contains('@') {
            return Err(EmailError::InvalidEmail);
        }

        let rendered = render_email(title, message, notification_type, &self.config.base_url);
        let email = OutboundEmail {
            from: self.config.from_email.clone(),
            to,
            subject: rendered.subject,
            html_body: rendered.html,
            text_body: rendered.text,
        };

        let message_id = self.transport.deliver(&email).await?;
        Ok(Some(message_id))
    }
}

#[async_trait]
impl EmailSender for EmailChannel {
    async fn send(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        notification_type: NotificationType,
    ) -> bool {
        // The bound covers the address lookup as well as delivery.
        let outcome = tokio::time::timeout(
            self.config.send_timeout,
            self.try_send(user_id, title, message, notification_type),
        )
        .await
        .unwrap_or(Err(EmailError::Timeout(self.config.send_timeout)));

        match outcome {
            Ok(Some(message_id)) => {
                log::info!(
                    "📧 Email '{}' sent to user {} (message id {})",
                    title,
                    user_id,
                    message_id
                );
                true
            }
            Ok(None) => {
                log::warn!("No email address found for user {}", user_id);
                false
            }
            Err(e) => {
                log::error!("Failed to send email to user {}: {}", user_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::directory::StaticUserDirectory;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Transport that records deliveries and can be told to fail or hang.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        pub(crate) delivered: Mutex<Vec<OutboundEmail>>,
        pub(crate) fail: bool,
        pub(crate) hang: bool,
    }

    #[async_trait]
    impl MailTransport for MockTransport {
        async fn deliver(&self, email: &OutboundEmail) -> Result<String, EmailError> {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail {
                return Err(EmailError::Transport("connection refused".to_string()));
            }
            self.delivered.lock().push(email.clone());
            Ok("mock-1".to_string())
        }

        async fn verify(&self) -> Result<(), EmailError> {
            if self.fail {
                Err(EmailError::Transport("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    /// Email sender that counts calls and answers with a fixed outcome.
    pub(crate) struct SpyEmailSender {
        pub(crate) calls: AtomicUsize,
        pub(crate) succeed: bool,
    }

    impl SpyEmailSender {
        pub(crate) fn new(succeed: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                succeed,
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmailSender for SpyEmailSender {
        async fn send(&self, _: &str, _: &str, _: &str, _: NotificationType) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.succeed
        }
    }

    fn channel(transport: Arc<MockTransport>, timeout: Duration) -> EmailChannel {
        let directory = StaticUserDirectory::new([("user-42", "reader@example.com")]);
        EmailChannel::new(
            Arc::new(directory),
            transport,
            Some(EmailConfig {
                send_timeout: timeout,
                ..EmailConfig::default()
            }),
        )
    }

    #[tokio::test]
    async fn test_send_renders_and_delivers() {
        let transport = Arc::new(MockTransport::default());
        let channel = channel(Arc::clone(&transport), Duration::from_secs(5));

        let sent = channel
            .send("user-42", "Request Approved", "Yes!", NotificationType::RequestApproved)
            .await;

        assert!(sent);
        let delivered = transport.delivered.lock();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].to, "reader@example.com");
        assert_eq!(delivered[0].from, "noreply@bookswap.local");
        assert_eq!(delivered[0].subject, "Request Approved");
        assert!(delivered[0].html_body.contains("/my-library"));
    }

    #[tokio::test]
    async fn test_unresolvable_user_returns_false() {
        let transport = Arc::new(MockTransport::default());
        let channel = channel(Arc::clone(&transport), Duration::from_secs(5));

        assert!(!channel.send("ghost", "t", "m", NotificationType::General).await);
        assert!(transport.delivered.lock().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_returns_false() {
        let transport = Arc::new(MockTransport {
            fail: true,
            ..MockTransport::default()
        });
        let channel = channel(transport, Duration::from_secs(5));

        assert!(!channel.send("user-42", "t", "m", NotificationType::General).await);
        assert!(!channel.verify().await);
    }

    #[tokio::test]
    async fn test_slow_transport_times_out() {
        let transport = Arc::new(MockTransport {
            hang: true,
            ..MockTransport::default()
        });
        let channel = channel(transport, Duration::from_millis(50));

        assert!(!channel.send("user-42", "t", "m", NotificationType::General).await);
    }

    struct StalledDirectory;

    #[async_trait]
    impl UserDirectory for StalledDirectory {
        async fn resolve_email(&self, _: &str) -> Result<Option<String>, EmailError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Some("reader@example.com".to_string()))
        }
    }

    #[tokio::test]
    async fn test_stalled_directory_lookup_times_out() {
        let transport = Arc::new(MockTransport::default());
        let channel = EmailChannel::new(
            Arc::new(StalledDirectory),
            transport.clone(),
            Some(EmailConfig {
                send_timeout: Duration::from_millis(50),
                ..EmailConfig::default()
            }),
        );

        let sent = tokio::time::timeout(
            Duration::from_secs(5),
            channel.send("user-42", "t", "m", NotificationType::General),
        )
        .await
        .unwrap();

        assert!(!sent);
        assert!(transport.delivered.lock().is_empty());
    }
}
