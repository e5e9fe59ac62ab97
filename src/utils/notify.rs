use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::MySqlPool;
use strum::{AsRefStr, Display};
use uuid::Uuid;

/// What kind of attendance event a notification describes.
#[derive(Debug, Clone, Copy, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    CheckIn,
    CheckOut,
}

#[derive(Debug, Clone, Copy, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

/// Payload accepted by the notification sink.
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
    pub category: String,
    pub target_users: Vec<u64>,
    pub sender_user_id: u64,
    pub priority: NotificationPriority,
    pub related_entity_kind: Option<String>,
    pub related_entity_id: Option<u64>,
    pub metadata: Option<serde_json::Value>,
}

impl Notification {
    pub fn check_in(user_id: u64, record_id: u64, employee_name: &str, at: DateTime<Utc>) -> Self {
        Self {
            title: "Checked in".to_string(),
            message: format!("{employee_name} checked in at {}", at.format("%H:%M UTC")),
            kind: NotificationType::CheckIn,
            category: "attendance".to_string(),
            target_users: vec![user_id],
            sender_user_id: user_id,
            priority: NotificationPriority::Normal,
            related_entity_kind: Some("attendance".to_string()),
            related_entity_id: Some(record_id),
            metadata: None,
        }
    }

    pub fn check_out(
        user_id: u64,
        record_id: u64,
        employee_name: &str,
        working_time: &str,
    ) -> Self {
        Self {
            title: "Checked out".to_string(),
            message: format!("{employee_name} checked out after {working_time}"),
            kind: NotificationType::CheckOut,
            category: "attendance".to_string(),
            target_users: vec![user_id],
            sender_user_id: user_id,
            priority: NotificationPriority::Normal,
            related_entity_kind: Some("attendance".to_string()),
            related_entity_id: Some(record_id),
            metadata: None,
        }
    }
}

/// Fire-and-forget dispatch. Spawned off the request task; any failure is
/// logged and swallowed so it can never affect the attendance write.
pub fn emit(pool: &MySqlPool, notification: Notification) {
    let pool = pool.clone();

    actix_web::rt::spawn(async move {
        if let Err(e) = insert(&pool, &notification).await {
            tracing::error!(
                error = %e,
                kind = notification.kind.as_ref(),
                targets = notification.target_users.len(),
                "Failed to deliver notification"
            );
        }
    });
}

async fn insert(pool: &MySqlPool, n: &Notification) -> Result<(), sqlx::Error> {
    // One row per target user, all under the same idempotency key.
    let key = Uuid::new_v4().to_string();

    for target in &n.target_users {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (idempotency_key, title, message, type, category,
                 target_user_id, sender_user_id, priority,
                 related_entity_kind, related_entity_id, metadata)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&key)
        .bind(&n.title)
        .bind(&n.message)
        .bind(n.kind.as_ref())
        .bind(&n.category)
        .bind(target)
        .bind(n.sender_user_id)
        .bind(n.priority.as_ref())
        .bind(&n.related_entity_kind)
        .bind(n.related_entity_id)
        .bind(n.metadata.as_ref().map(|m| m.to_string()))
        .execute(pool)
        .await?;
    }

    Ok(())
}
