use std::str::FromStr;
use std::time::Duration;

use notification_jobs::SchedulerConfig;
use notification_services::EmailConfig;
use realtime_push::PushConfig;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Upper bound for `*_DAYS` settings whose seconds would overflow.
const MAX_DAYS: u64 = 36_500;

/// Which mail transport to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTransportKind {
    /// Log emails instead of sending them
    Log,
    /// Send through AWS SES
    Ses,
}

/// Process configuration, read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to (default: 0.0.0.0:5000)
    pub bind_address: String,

    /// PostgreSQL URL; without one notifications are kept in memory
    pub database_url: Option<String>,

    /// Pool size for PostgreSQL (default: 5)
    pub database_max_connections: u32,

    /// Mail transport (default: log)
    pub email_transport: EmailTransportKind,

    /// `user=email` pairs used as the directory when no database is configured
    pub static_user_emails: String,

    /// Email channel settings
    pub email: EmailConfig,

    /// Realtime push settings
    pub push: PushConfig,

    /// Background sweep settings
    pub scheduler: SchedulerConfig,
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let parsed = |key: &str, default: u64| parse_or(key, value(key), default);
        let secs = |key: &str, default: u64| Duration::from_secs(parsed(key, default).max(1));
        let days = |key: &str, default: u64| {
            let days = parsed(key, default).max(1);
            days.checked_mul(SECS_PER_DAY).map(Duration::from_secs).unwrap_or_else(|| {
                log::warn!("{} of {} days is too large, using {}", key, days, MAX_DAYS);
                Duration::from_secs(MAX_DAYS * SECS_PER_DAY)
            })
        };

        let send_timeout = secs("EMAIL_SEND_TIMEOUT_SECS", 10);
        let email_defaults = EmailConfig::default();
        let scheduler_defaults = SchedulerConfig::default();

        let email_transport = match value("EMAIL_TRANSPORT").as_deref() {
            Some("ses") => EmailTransportKind::Ses,
            Some("log") | None => EmailTransportKind::Log,
            Some(other) => {
                log::warn!("Unknown EMAIL_TRANSPORT '{}', falling back to log", other);
                EmailTransportKind::Log
            }
        };

        Self {
            bind_address: value("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:5000".to_string()),
            database_url: value("DATABASE_URL"),
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", 5).max(1) as u32,
            email_transport,
            static_user_emails: value("STATIC_USER_EMAILS").unwrap_or_default(),
            email: EmailConfig {
                from_email: value("FROM_EMAIL").unwrap_or(email_defaults.from_email),
                send_timeout,
                base_url: value("APP_BASE_URL").unwrap_or(email_defaults.base_url),
            },
            push: PushConfig {
                session_buffer: parsed("PUSH_SESSION_BUFFER", 32).max(1) as usize,
            },
            scheduler: SchedulerConfig {
                retry_interval: secs("RETRY_INTERVAL_SECS", 3600),
                retry_lookback: days("RETRY_LOOKBACK_DAYS", 7),
                retry_batch_limit: parsed("RETRY_BATCH_LIMIT", 100).max(1) as u32,
                retry_min_age: send_timeout,
                cleanup_interval: secs("CLEANUP_INTERVAL_SECS", 86_400),
                cleanup_max_age: days("CLEANUP_MAX_AGE_DAYS", 30),
                retry_on_startup: value("RETRY_ON_STARTUP")
                    .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                    .unwrap_or(scheduler_defaults.retry_on_startup),
            },
        }
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Invalid value '{}' for {}, using {}", raw, key, default);
            default
        }),
        None => default,
    }
}
