use actix_web::{HttpResponse, Result, web};
use chrono::Utc;
use notification_services::Dispatcher;
use notification_store::{NotificationError, NotificationStore, NotificationType};
use uuid::Uuid;

use crate::notification_types::*;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 20;

fn parse_id(raw: &str) -> Result<Uuid, NotificationError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| NotificationError::Validation(format!("Invalid notification id: {}", raw)))
}

/// Lists a user's notifications, newest first, one page at a time
pub async fn get_user_notifications(
    store: web::Data<dyn NotificationStore>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, NotificationError> {
    let user_id = path.into_inner();
    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    let result = store.list_for_user(&user_id, page, limit).await?;
    let pages = result.pages();

    Ok(HttpResponse::Ok().json(NotificationListResponse {
        data: result.items,
        pagination: Pagination {
            total: result.total,
            page,
            limit,
            pages,
        },
    }))
}

/// Returns the unread badge count for a user
pub async fn get_unread_count(
    store: web::Data<dyn NotificationStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, NotificationError> {
    let unread_count = store.unread_count(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UnreadCountResponse { unread_count }))
}

/// Lists a user's notifications of one type
pub async fn get_notifications_by_type(
    store: web::Data<dyn NotificationStore>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, NotificationError> {
    let (user_id, raw_type) = path.into_inner();
    let notification_type = raw_type.parse::<NotificationType>()?;

    let data = store.list_by_type(&user_id, notification_type).await?;
    Ok(HttpResponse::Ok().json(DataResponse { data }))
}

/// Marks one notification as read
pub async fn mark_as_read(
    store: web::Data<dyn NotificationStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, NotificationError> {
    let id = parse_id(&path.into_inner())?;
    let notification = store.mark_read(&id).await?;
    Ok(HttpResponse::Ok().json(notification))
}

/// Marks every notification of a user as read
pub async fn mark_all_as_read(
    store: web::Data<dyn NotificationStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, NotificationError> {
    let updated = store.mark_all_read(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}

/// Deletes one notification
pub async fn delete_notification(
    store: web::Data<dyn NotificationStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, NotificationError> {
    let id = parse_id(&path.into_inner())?;
    store.delete(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Deletes every notification of a user
pub async fn clear_all_notifications(
    store: web::Data<dyn NotificationStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, NotificationError> {
    let deleted = store.delete_all_for_user(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": deleted })))
}

/// Store-wide counters
pub async fn get_notification_stats(
    store: web::Data<dyn NotificationStore>,
) -> Result<HttpResponse, NotificationError> {
    let stats = store.stats(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// Sends one announcement to many users
pub async fn send_bulk_notification(
    dispatcher: web::Data<Dispatcher>,
    request: web::Json<BulkNotificationRequest>,
) -> Result<HttpResponse, NotificationError> {
    let request = validated(request.into_inner())?;
    let notification_type = request.notification_type.parse::<NotificationType>()?;

    let data = dispatcher
        .notify_many(
            &request.user_ids,
            &request.title,
            &request.message,
            notification_type,
        )
        .await?;

    Ok(HttpResponse::Created().json(BulkNotificationResponse {
        created: data.len(),
        data,
    }))
}

/// Liveness probe
pub async fn health() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "OK",
        "timestamp": Utc::now(),
    })))
}
