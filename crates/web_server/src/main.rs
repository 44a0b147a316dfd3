//! Main entry point for the Book Swap notification server.
//! Wires the store, delivery channels, dispatcher and background sweeps
//! together and serves the notification API.

use std::sync::Arc;

use actix_web::{App, HttpServer, middleware::Logger, web};
use notification_jobs::NotificationScheduler;
use notification_services::{
    Dispatcher, EmailChannel, EmailSender, LogMailTransport, MailTransport, PgUserDirectory,
    SesMailTransport, StaticUserDirectory, UserDirectory,
};
use notification_store::{InMemoryNotificationStore, NotificationStore, PgNotificationStore};
use postgres::database::*;
use postgres::schema::ensure_schema;
use realtime_push::PushRegistry;
use sqlx::PgPool;
use web_handlers::configure_routes;

mod config;
use config::{EmailTransportKind, ServerConfig};

async fn connect_database(config: &ServerConfig) -> Option<PgPool> {
    let database_url = config.database_url.as_deref()?;

    let pool = match create_connection_pool(database_url, config.database_max_connections).await {
        Ok(pool) => {
            log::info!("🗃️ Database pool created successfully");
            pool
        }
        Err(e) => {
            log::error!("❌ Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = test_connection(&pool).await {
        log::error!("❌ Database connection test failed: {}", e);
    }
    if let Err(e) = ensure_schema(&pool).await {
        log::error!("❌ Failed to create notification schema: {}", e);
        std::process::exit(1);
    }

    Some(pool)
}

async fn build_email_channel(config: &ServerConfig, pool: Option<&PgPool>) -> Arc<EmailChannel> {
    let transport: Arc<dyn MailTransport> = match config.email_transport {
        EmailTransportKind::Ses => {
            log::info!("📧 Using AWS SES mail transport");
            Arc::new(SesMailTransport::new().await)
        }
        EmailTransportKind::Log => {
            log::info!("📧 Using log-only mail transport");
            Arc::new(LogMailTransport)
        }
    };

    let directory: Arc<dyn UserDirectory> = match pool {
        Some(pool) => Arc::new(PgUserDirectory::new(pool.clone())),
        None => Arc::new(StaticUserDirectory::from_pairs(&config.static_user_emails)),
    };

    let channel = EmailChannel::new(directory, transport, Some(config.email.clone()));
    if !channel.verify().await {
        log::warn!("🔧 Email delivery may fail; unsent emails will be retried");
    }
    Arc::new(channel)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    log::info!("🚀 Starting book swap notification server...");

    let config = ServerConfig::from_env();
    let pool = connect_database(&config).await;

    let store: Arc<dyn NotificationStore> = match &pool {
        Some(pool) => Arc::new(PgNotificationStore::new(pool.clone())),
        None => {
            log::warn!("💾 DATABASE_URL not set, keeping notifications in memory");
            Arc::new(InMemoryNotificationStore::new())
        }
    };

    let email = build_email_channel(&config, pool.as_ref()).await;
    let email: Arc<dyn EmailSender> = email;
    let push = Arc::new(PushRegistry::new(Some(config.push.clone())));
    let dispatcher = web::Data::new(Dispatcher::new(
        Arc::clone(&store),
        Arc::clone(&push),
        Some(Arc::clone(&email)),
    ));

    let scheduler = Arc::new(NotificationScheduler::new(
        Arc::clone(&store),
        email,
        Some(config.scheduler.clone()),
    ));
    let scheduler_handle = scheduler.start();

    let store = web::Data::from(store);
    let push = web::Data::from(push);

    log::info!("🌐 Server will be available at: http://{}", config.bind_address);

    let result = HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .app_data(push.clone())
            .app_data(dispatcher.clone())
            .wrap(Logger::default())
            .configure(configure_routes)
    })
    .bind(&config.bind_address)?
    .run()
    .await;

    scheduler_handle.stop().await;
    log::info!("👋 Server stopped");
    result
}
