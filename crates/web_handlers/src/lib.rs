//! # Web Handlers for the Book Swap notification service
//!
//! This crate provides the HTTP surface over the notification store, the
//! dispatcher triggers and the realtime stream.

use actix_web::web;

/// Query and mutation handlers for stored notifications
mod notification_handlers;
pub use notification_handlers::*;

/// Request and response bodies
mod notification_types;
pub use notification_types::*;

/// Server-sent events stream for realtime push
mod stream_handlers;
pub use stream_handlers::*;

/// Handlers that fire the domain notification triggers
mod trigger_handlers;
pub use trigger_handlers::*;

/// Registers every notification route under `/api`.
///
/// Expects `web::Data<dyn NotificationStore>`, `web::Data<Dispatcher>` and
/// `web::Data<PushRegistry>` to be registered on the app.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health))
            .service(
                web::scope("/notifications")
                    .route("/stats", web::get().to(get_notification_stats))
                    .route("/bulk", web::post().to(send_bulk_notification))
                    .route("/stream/{user_id}", web::get().to(notification_stream))
                    .service(
                        web::scope("/trigger")
                            .route("/request-received", web::post().to(trigger_request_received))
                            .route("/approved", web::post().to(trigger_request_approved))
                            .route("/rejected", web::post().to(trigger_request_rejected))
                            .route("/returned", web::post().to(trigger_book_returned))
                            .route("/due-date", web::post().to(trigger_due_date_reminder)),
                    )
                    .service(
                        web::scope("/user/{user_id}")
                            .route("", web::get().to(get_user_notifications))
                            .route("/unread-count", web::get().to(get_unread_count))
                            .route("/type/{type}", web::get().to(get_notifications_by_type))
                            .route("/mark-all-read", web::put().to(mark_all_as_read))
                            .route("/clear-all", web::delete().to(clear_all_notifications)),
                    )
                    .route("/{id}/read", web::put().to(mark_as_read))
                    .route("/{id}", web::delete().to(delete_notification)),
            ),
    );
}
