use actix_web::{HttpResponse, web};
use notification_services::Dispatcher;
use notification_store::NotificationError;

use crate::notification_types::*;

/// Notifies a book owner about a new borrow or swap request
pub async fn trigger_request_received(
    dispatcher: web::Data<Dispatcher>,
    request: web::Json<RequestReceivedRequest>,
) -> Result<HttpResponse, NotificationError> {
    let request = validated(request.into_inner())?;

    let notification = dispatcher
        .request_received(
            &request.owner_id,
            &request.requester_name,
            &request.book_title,
            &request.request_type,
            with_request_id(request.data, request.request_id),
        )
        .await?;

    Ok(HttpResponse::Created().json(notification))
}

/// Notifies a requester that their request was approved
pub async fn trigger_request_approved(
    dispatcher: web::Data<Dispatcher>,
    request: web::Json<RequestDecisionRequest>,
) -> Result<HttpResponse, NotificationError> {
    let request = validated(request.into_inner())?;

    let notification = dispatcher
        .request_approved(
            &request.requester_id,
            &request.book_title,
            &request.request_type,
            with_request_id(request.data, request.request_id),
        )
        .await?;

    Ok(HttpResponse::Created().json(notification))
}

/// Notifies a requester that their request was rejected
pub async fn trigger_request_rejected(
    dispatcher: web::Data<Dispatcher>,
    request: web::Json<RequestDecisionRequest>,
) -> Result<HttpResponse, NotificationError> {
    let request = validated(request.into_inner())?;

    let notification = dispatcher
        .request_rejected(
            &request.requester_id,
            &request.book_title,
            &request.request_type,
            with_request_id(request.data, request.request_id),
        )
        .await?;

    Ok(HttpResponse::Created().json(notification))
}

/// Notifies a book owner that their book was returned
pub async fn trigger_book_returned(
    dispatcher: web::Data<Dispatcher>,
    request: web::Json<BookReturnedRequest>,
) -> Result<HttpResponse, NotificationError> {
    let request = validated(request.into_inner())?;

    let notification = dispatcher
        .book_returned(
            &request.owner_id,
            &request.returner_name,
            &request.book_title,
            with_request_id(request.data, request.request_id),
        )
        .await?;

    Ok(HttpResponse::Created().json(notification))
}

/// Reminds a borrower of an upcoming due date
pub async fn trigger_due_date_reminder(
    dispatcher: web::Data<Dispatcher>,
    request: web::Json<DueDateReminderRequest>,
) -> Result<HttpResponse, NotificationError> {
    let request = validated(request.into_inner())?;

    let notification = dispatcher
        .due_date_reminder(
            &request.borrower_id,
            &request.book_title,
            &request.due_date,
            with_request_id(request.data, request.request_id),
        )
        .await?;

    Ok(HttpResponse::Created().json(notification))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configure_routes;
    use actix_web::{App, http::StatusCode, test};
    use notification_store::{InMemoryNotificationStore, NotificationStore};
    use realtime_push::PushRegistry;
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_approved_trigger_stores_and_pushes() {
        let store = Arc::new(InMemoryNotificationStore::new());
        let push = Arc::new(PushRegistry::new(None));
        let mut session = push.open_session("user-42");
        let dispatcher = Dispatcher::new(store.clone(), Arc::clone(&push), None);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(dispatcher))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/notifications/trigger/approved")
            .set_json(serde_json::json!({
                "requesterId": "user-42",
                "bookTitle": "Dune",
                "requestType": "borrow",
                "requestId": "r9"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["type"], "request_approved");
        assert_eq!(body["message"], "Your borrow request for \"Dune\" has been approved!");
        assert_eq!(body["data"]["requestId"], "r9");
        assert_eq!(body["pushSent"], true);

        assert_eq!(session.recv().await.unwrap().title, "Request Approved");
        assert_eq!(store.unread_count("user-42").await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn test_missing_field_is_rejected_before_storing() {
        let store = Arc::new(InMemoryNotificationStore::new());
        let push = Arc::new(PushRegistry::new(None));
        let dispatcher = Dispatcher::new(store.clone(), push, None);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(dispatcher))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/notifications/trigger/request-received")
            .set_json(serde_json::json!({
                "requesterName": "Alice",
                "bookTitle": "Dune",
                "requestType": "swap"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "ownerId is required");
        assert!(store.snapshot().await.is_empty());
    }
}
