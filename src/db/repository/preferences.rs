use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

// ============================================================================
// Notification Preferences Repository
// ============================================================================

/// Preferences are lazily created: reads return `None` until the first write,
/// and callers apply `NotificationPreferences::default_for` in the meantime.
pub struct NotificationPreferencesRepository;

impl NotificationPreferencesRepository {
    pub async fn find_by_user(
        pool: &SqlitePool,
        user_id: &str,
    ) -> AppResult<Option<NotificationPreferences>> {
        sqlx::query_as::<_, NotificationPreferences>(
            "SELECT * FROM notification_preferences WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Merge `update` into the stored preferences (read-modify-write) and
    /// upsert. Fields absent from the partial keep their stored value; the
    /// `notification_types` map merges per key, `quiet_hours` replaces as a
    /// whole.
    pub async fn update(
        pool: &SqlitePool,
        user_id: &str,
        update: UpdateNotificationPreferences,
    ) -> AppResult<NotificationPreferences> {
        let current = Self::find_by_user(pool, user_id).await?;
        let existed = current.is_some();
        let mut prefs =
            current.unwrap_or_else(|| NotificationPreferences::default_for(user_id));

        if let Some(v) = update.email_notifications {
            prefs.email_notifications = v;
        }
        if let Some(v) = update.push_notifications {
            prefs.push_notifications = v;
        }
        if let Some(v) = update.sound_enabled {
            prefs.sound_enabled = v;
        }
        if let Some(types) = update.notification_types {
            for (ty, enabled) in types {
                prefs.notification_types.0.insert(ty, enabled);
            }
        }
        if let Some(quiet) = update.quiet_hours {
            prefs.quiet_hours = quiet;
        }
        if let Some(freq) = update.frequency {
            prefs.frequency = freq;
        }

        let now = Utc::now().naive_utc();
        prefs.updated_at = now;

        if existed {
            sqlx::query_as::<_, NotificationPreferences>(
                r#"
                UPDATE notification_preferences
                SET email_notifications = ?,
                    push_notifications = ?,
                    sound_enabled = ?,
                    notification_types = ?,
                    quiet_enabled = ?,
                    quiet_start = ?,
                    quiet_end = ?,
                    quiet_timezone = ?,
                    frequency = ?,
                    updated_at = ?
                WHERE user_id = ?
                RETURNING *
                "#,
            )
            .bind(prefs.email_notifications)
            .bind(prefs.push_notifications)
            .bind(prefs.sound_enabled)
            .bind(prefs.notification_types)
            .bind(prefs.quiet_hours.enabled)
            .bind(prefs.quiet_hours.start)
            .bind(prefs.quiet_hours.end)
            .bind(prefs.quiet_hours.timezone)
            .bind(prefs.frequency)
            .bind(now)
            .bind(user_id)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
        } else {
            let id = Uuid::new_v4().to_string();
            sqlx::query_as::<_, NotificationPreferences>(
                r#"
                INSERT INTO notification_preferences (
                    id, user_id, email_notifications, push_notifications,
                    sound_enabled, notification_types,
                    quiet_enabled, quiet_start, quiet_end, quiet_timezone,
                    frequency, created_at, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(user_id)
            .bind(prefs.email_notifications)
            .bind(prefs.push_notifications)
            .bind(prefs.sound_enabled)
            .bind(prefs.notification_types)
            .bind(prefs.quiet_hours.enabled)
            .bind(prefs.quiet_hours.start)
            .bind(prefs.quiet_hours.end)
            .bind(prefs.quiet_hours.timezone)
            .bind(prefs.frequency)
            .bind(now)
            .bind(now)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
        }
    }
}
