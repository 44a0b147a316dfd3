use std::convert::Infallible;

use actix_web::{HttpResponse, http::header, web};
use futures_util::{StreamExt, future, stream};
use notification_store::NotificationError;
use realtime_push::PushRegistry;
use serde::Serialize;

/// Formats one server-sent event.
fn sse_event<T: Serialize>(event: &str, payload: &T) -> web::Bytes {
    match serde_json::to_string(payload) {
        Ok(json) => web::Bytes::from(format!("event: {}\ndata: {}\n\n", event, json)),
        Err(e) => {
            log::error!("Failed to serialize {} event: {}", event, e);
            web::Bytes::new()
        }
    }
}

/// Opens a realtime notification stream for a user.
///
/// The connection is registered as a push session bound to the user for as
/// long as the client keeps the stream open.
pub async fn notification_stream(
    push: web::Data<PushRegistry>,
    path: web::Path<String>,
) -> Result<HttpResponse, NotificationError> {
    let user_id = path.into_inner();
    if user_id.trim().is_empty() {
        return Err(NotificationError::Validation("userId is required".to_string()));
    }

    let registry = push.into_inner();
    let session = registry.open_session(&user_id);
    log::info!(
        "🔌 Realtime stream {} opened for user {}",
        session.session_id(),
        user_id
    );

    let joined = sse_event(
        "connected",
        &serde_json::json!({
            "sessionId": session.session_id(),
            "userId": session.user_id(),
        }),
    );

    let notifications = stream::unfold(session, |mut session| async move {
        let payload = session.recv().await?;
        Some((sse_event("notification", &payload), session))
    });

    let body = stream::once(future::ready(joined))
        .chain(notifications)
        .map(Ok::<_, Infallible>);

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configure_routes;
    use actix_web::{App, body::MessageBody, test as actix_test};
    use chrono::Utc;
    use notification_store::NotificationType;
    use realtime_push::PushPayload;
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn test_sse_event_framing() {
        let bytes = sse_event("notification", &serde_json::json!({"id": 1}));
        assert_eq!(&bytes[..], b"event: notification\ndata: {\"id\":1}\n\n");
    }

    #[actix_web::test]
    async fn test_stream_binds_session_until_dropped() {
        let push = Arc::new(PushRegistry::new(None));
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::from(Arc::clone(&push)))
                .configure(configure_routes),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/api/notifications/stream/user1")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        assert_eq!(push.connected_session_count("user1"), 1);

        let payload = PushPayload {
            id: Uuid::new_v4(),
            title: "Book Returned".to_string(),
            message: "Sam has returned your book \"Dune\"".to_string(),
            notification_type: NotificationType::BookReturned,
            created_at: Utc::now(),
        };
        assert_eq!(push.publish("user1", &payload), 1);

        let mut body = resp.into_body();
        let joined = std::future::poll_fn(|cx| std::pin::Pin::new(&mut body).poll_next(cx))
            .await
            .unwrap()
            .unwrap();
        assert!(joined.starts_with(b"event: connected\n"));

        let pushed = std::future::poll_fn(|cx| std::pin::Pin::new(&mut body).poll_next(cx))
            .await
            .unwrap()
            .unwrap();
        let text = String::from_utf8(pushed.to_vec()).unwrap();
        assert!(text.starts_with("event: notification\ndata: "));
        assert!(text.contains("\"type\":\"book_returned\""));

        drop(body);
        assert_eq!(push.connected_session_count("user1"), 0);
    }
}
