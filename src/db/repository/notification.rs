use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Notification Repository
// ============================================================================

/// CRUD + query over notification rows. Every operation is scoped to one
/// `user_id`; rows are never visible across users.
pub struct NotificationRepository;

impl NotificationRepository {
    /// Insert a notification for `user_id` and return the stored row.
    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        input: CreateNotification,
    ) -> AppResult<Notification> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (
                id, user_id, notification_type, title, content,
                entity_type, entity_id, action_url, action_text,
                is_read, is_dismissed, priority, metadata,
                delivery_status, retry_count, created_at, expires_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?, 'delivered', 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(input.notification_type)
        .bind(input.title)
        .bind(input.content)
        .bind(input.entity_type)
        .bind(input.entity_id)
        .bind(input.action_url)
        .bind(input.action_text)
        .bind(input.priority)
        .bind(Json(input.metadata))
        .bind(now)
        .bind(input.expires_at)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// List notifications with conjunctive optional filters, newest first.
    ///
    /// An unset `is_dismissed` filter defaults the listing to non-dismissed
    /// rows; `from` is inclusive, `to` exclusive on `created_at`.
    pub async fn list(
        pool: &SqlitePool,
        user_id: &str,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Notification>> {
        let dismissed = filter.is_dismissed.unwrap_or(false);

        sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = ?
            AND is_dismissed = ?
            AND (? IS NULL OR notification_type = ?)
            AND (? IS NULL OR is_read = ?)
            AND (? IS NULL OR priority = ?)
            AND (? IS NULL OR entity_type = ?)
            AND (? IS NULL OR entity_id = ?)
            AND (? IS NULL OR created_at >= ?)
            AND (? IS NULL OR created_at < ?)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(dismissed)
        .bind(filter.notification_type)
        .bind(filter.notification_type)
        .bind(filter.is_read)
        .bind(filter.is_read)
        .bind(filter.priority)
        .bind(filter.priority)
        .bind(filter.entity_type.as_deref())
        .bind(filter.entity_type.as_deref())
        .bind(filter.entity_id.as_deref())
        .bind(filter.entity_id.as_deref())
        .bind(filter.from)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Count of rows where `is_read = 0 AND is_dismissed = 0`.
    pub async fn unread_count(pool: &SqlitePool, user_id: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0 AND is_dismissed = 0",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Idempotent point update; returns whether a row for this user matched.
    /// Marking an already-read notification succeeds and is a no-op.
    pub async fn mark_read(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    /// Transition every unread notification; returns how many changed.
    pub async fn mark_all_read(pool: &SqlitePool, user_id: &str) -> AppResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
                .bind(user_id)
                .execute(pool)
                .await
                .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    /// Idempotent dismiss; same contract as `mark_read`.
    pub async fn dismiss(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET is_dismissed = 1 WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(user_id)
                .execute(pool)
                .await
                .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    /// Dismiss every non-dismissed notification; returns how many changed.
    pub async fn dismiss_all(pool: &SqlitePool, user_id: &str) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_dismissed = 1 WHERE user_id = ? AND is_dismissed = 0",
        )
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<Notification>> {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn seed(pool: &SqlitePool, user: &str, ty: NotificationType, title: &str) -> Notification {
        NotificationRepository::create(pool, user, CreateNotification::new(ty, title, "body"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_and_list_newest_first() {
        let pool = test_pool().await;
        let a = seed(&pool, "u1", NotificationType::System, "first").await;
        let b = seed(&pool, "u1", NotificationType::Mention, "second").await;

        let listed =
            NotificationRepository::list(&pool, "u1", &NotificationFilter::default(), 50, 0)
                .await
                .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[1].id, a.id);
        assert_eq!(listed[0].priority, Priority::Normal);
        assert!(!listed[0].is_read);
    }

    #[tokio::test]
    async fn rows_are_scoped_per_user() {
        let pool = test_pool().await;
        let theirs = seed(&pool, "u2", NotificationType::System, "not yours").await;
        seed(&pool, "u1", NotificationType::System, "mine").await;

        let listed =
            NotificationRepository::list(&pool, "u1", &NotificationFilter::default(), 50, 0)
                .await
                .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "mine");

        // A cross-user point update must not match.
        assert!(!NotificationRepository::mark_read(&pool, "u1", &theirs.id)
            .await
            .unwrap());
        assert_eq!(NotificationRepository::unread_count(&pool, "u2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let pool = test_pool().await;
        let n = seed(&pool, "u1", NotificationType::TaskReminder, "todo").await;

        assert!(NotificationRepository::mark_read(&pool, "u1", &n.id).await.unwrap());
        assert_eq!(NotificationRepository::unread_count(&pool, "u1").await.unwrap(), 0);

        // Second call is not an error and the count does not move again.
        assert!(NotificationRepository::mark_read(&pool, "u1", &n.id).await.unwrap());
        assert_eq!(NotificationRepository::unread_count(&pool, "u1").await.unwrap(), 0);

        assert!(!NotificationRepository::mark_read(&pool, "u1", "missing").await.unwrap());
    }

    #[tokio::test]
    async fn unread_count_matches_direct_computation() {
        let pool = test_pool().await;
        let a = seed(&pool, "u1", NotificationType::System, "a").await;
        let b = seed(&pool, "u1", NotificationType::System, "b").await;
        seed(&pool, "u1", NotificationType::System, "c").await;

        NotificationRepository::mark_read(&pool, "u1", &a.id).await.unwrap();
        // Dismissed-but-unread must not count.
        NotificationRepository::dismiss(&pool, "u1", &b.id).await.unwrap();

        let all = NotificationRepository::list(
            &pool,
            "u1",
            &NotificationFilter {
                is_dismissed: Some(false),
                ..Default::default()
            },
            50,
            0,
        )
        .await
        .unwrap();
        let direct = all.iter().filter(|n| n.counts_toward_unread()).count() as i64;

        assert_eq!(
            NotificationRepository::unread_count(&pool, "u1").await.unwrap(),
            direct
        );
        assert_eq!(direct, 1);
    }

    #[tokio::test]
    async fn filters_are_conjunctive() {
        let pool = test_pool().await;
        let target = seed(&pool, "u1", NotificationType::Mention, "match").await;
        let read = seed(&pool, "u1", NotificationType::Mention, "read mention").await;
        seed(&pool, "u1", NotificationType::System, "unread system").await;
        NotificationRepository::mark_read(&pool, "u1", &read.id).await.unwrap();

        let filter = NotificationFilter {
            notification_type: Some(NotificationType::Mention),
            is_read: Some(false),
            ..Default::default()
        };
        let listed = NotificationRepository::list(&pool, "u1", &filter, 50, 0)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, target.id);
    }

    #[tokio::test]
    async fn default_listing_excludes_dismissed() {
        let pool = test_pool().await;
        let gone = seed(&pool, "u1", NotificationType::System, "dismissed").await;
        seed(&pool, "u1", NotificationType::System, "kept").await;
        NotificationRepository::dismiss(&pool, "u1", &gone.id).await.unwrap();

        let listed =
            NotificationRepository::list(&pool, "u1", &NotificationFilter::default(), 50, 0)
                .await
                .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "kept");

        // Asking for dismissed rows explicitly flips the listing.
        let dismissed = NotificationRepository::list(
            &pool,
            "u1",
            &NotificationFilter {
                is_dismissed: Some(true),
                ..Default::default()
            },
            50,
            0,
        )
        .await
        .unwrap();
        assert_eq!(dismissed.len(), 1);
        assert_eq!(dismissed[0].id, gone.id);
    }

    #[tokio::test]
    async fn bulk_operations_report_transition_counts() {
        let pool = test_pool().await;
        let a = seed(&pool, "u1", NotificationType::System, "a").await;
        seed(&pool, "u1", NotificationType::System, "b").await;
        NotificationRepository::mark_read(&pool, "u1", &a.id).await.unwrap();

        assert_eq!(NotificationRepository::mark_all_read(&pool, "u1").await.unwrap(), 1);
        assert_eq!(NotificationRepository::mark_all_read(&pool, "u1").await.unwrap(), 0);

        assert_eq!(NotificationRepository::dismiss_all(&pool, "u1").await.unwrap(), 2);
        assert_eq!(NotificationRepository::dismiss_all(&pool, "u1").await.unwrap(), 0);
        assert_eq!(NotificationRepository::unread_count(&pool, "u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn metadata_round_trips() {
        let pool = test_pool().await;
        let mut input = CreateNotification::new(NotificationType::DealStageChange, "deal", "moved");
        input.metadata = serde_json::json!({"deal_id": "d-42", "stage": "won"});
        input.entity_type = Some("deal".to_string());
        input.entity_id = Some("d-42".to_string());

        let created = NotificationRepository::create(&pool, "u1", input).await.unwrap();
        let loaded = NotificationRepository::find_by_id(&pool, "u1", &created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.metadata.0["stage"], "won");
        assert_eq!(loaded.entity_id.as_deref(), Some("d-42"));
        assert_eq!(loaded.delivery_status, "delivered");
        assert_eq!(loaded.retry_count, 0);
    }
}
