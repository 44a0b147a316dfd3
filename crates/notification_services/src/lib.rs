//! # Notification Services
//!
//! Delivery side of the notification system: the email channel (templates,
//! mail transports, recipient directories) and the [`Dispatcher`] that stores a
//! notification and fans it out to realtime push and email.

/// Fan-out of new notifications and the typed domain triggers.
pub mod dispatcher;
/// Recipient address lookup.
pub mod directory;
/// Best-effort email channel.
pub mod email;
/// Email subject and body rendering.
pub mod templates;
/// Mail transports.
pub mod transport;
/// Types and structures used by the email channel.
pub mod types;

pub use directory::{PgUserDirectory, StaticUserDirectory};
pub use dispatcher::Dispatcher;
pub use email::{EmailChannel, EmailSender, UserDirectory};
pub use templates::{RenderedEmail, render_email};
pub use transport::{LogMailTransport, MailTransport, SesMailTransport};
pub use types::{EmailConfig, EmailError, OutboundEmail};
