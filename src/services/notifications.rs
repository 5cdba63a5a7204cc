use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::models::*;
use crate::db::repository::{NotificationPreferencesRepository, NotificationRepository};
use crate::error::{AppError, AppResult};
use crate::services::auth::AuthProvider;
use crate::services::events::EventHub;
use crate::services::quiet_hours;

/// User-facing surface over the repositories: resolves the current user
/// through the ambient identity and publishes producer inserts to the
/// in-process event hub.
///
/// Every write is fire-and-confirm — nothing here waits for the dispatcher
/// to observe a change, and consumers reconcile through idempotent patches.
pub struct NotificationService {
    pool: SqlitePool,
    hub: Arc<EventHub>,
    auth: Arc<dyn AuthProvider>,
}

impl NotificationService {
    pub fn new(pool: SqlitePool, hub: Arc<EventHub>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { pool, hub, auth }
    }

    fn current_user(&self) -> AppResult<String> {
        self.auth.current_user_id().ok_or(AppError::Unauthorized)
    }

    /// Producer side: insert a notification for `user_id` and fan it out to
    /// that user's live streams. Takes an explicit owner because producers
    /// (triggers, workflow engines) act on behalf of other users.
    pub async fn publish(
        &self,
        user_id: &str,
        input: CreateNotification,
    ) -> AppResult<Notification> {
        let notification = NotificationRepository::create(&self.pool, user_id, input).await?;
        self.hub.publish(&notification);
        tracing::debug!(
            user_id,
            notification_id = %notification.id,
            notification_type = notification.notification_type.as_str(),
            "Published notification"
        );
        Ok(notification)
    }

    pub async fn list(
        &self,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Notification>> {
        let user = self.current_user()?;
        NotificationRepository::list(&self.pool, &user, filter, limit, offset).await
    }

    pub async fn unread_count(&self) -> AppResult<i64> {
        let user = self.current_user()?;
        NotificationRepository::unread_count(&self.pool, &user).await
    }

    pub async fn mark_read(&self, id: &str) -> AppResult<bool> {
        let user = self.current_user()?;
        NotificationRepository::mark_read(&self.pool, &user, id).await
    }

    pub async fn mark_all_read(&self) -> AppResult<u64> {
        let user = self.current_user()?;
        NotificationRepository::mark_all_read(&self.pool, &user).await
    }

    pub async fn dismiss(&self, id: &str) -> AppResult<bool> {
        let user = self.current_user()?;
        NotificationRepository::dismiss(&self.pool, &user, id).await
    }

    pub async fn dismiss_all(&self) -> AppResult<u64> {
        let user = self.current_user()?;
        NotificationRepository::dismiss_all(&self.pool, &user).await
    }

    /// `None` means no record yet; the caller applies defaults.
    pub async fn preferences(&self) -> AppResult<Option<NotificationPreferences>> {
        let user = self.current_user()?;
        NotificationPreferencesRepository::find_by_user(&self.pool, &user).await
    }

    /// The stored preferences, or the documented defaults when absent.
    pub async fn effective_preferences(&self) -> AppResult<NotificationPreferences> {
        let user = self.current_user()?;
        let stored = NotificationPreferencesRepository::find_by_user(&self.pool, &user).await?;
        Ok(stored.unwrap_or_else(|| NotificationPreferences::default_for(&user)))
    }

    pub async fn update_preferences(
        &self,
        update: UpdateNotificationPreferences,
    ) -> AppResult<NotificationPreferences> {
        let user = self.current_user()?;
        NotificationPreferencesRepository::update(&self.pool, &user, update).await
    }
}

/// Consumer policy: whether a freshly delivered notification should alert
/// (toast, sound) right now, or land silently in the list. The dispatcher
/// delivers regardless; this only gates the noisy surfaces.
pub fn should_alert(
    prefs: &NotificationPreferences,
    notification: &Notification,
    at: DateTime<Utc>,
) -> bool {
    if !prefs.push_notifications {
        return false;
    }
    if !prefs.type_enabled(notification.notification_type) {
        return false;
    }
    !quiet_hours::is_suppressed(&prefs.quiet_hours, at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToastConfig;
    use crate::db::test_pool;
    use crate::services::auth::SessionAuth;
    use crate::services::badge::UnreadBadge;
    use crate::services::dispatcher::RealtimeDispatcher;
    use crate::services::toasts::ToastStack;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;

    async fn service(user: Option<&str>) -> NotificationService {
        let pool = test_pool().await;
        let hub = Arc::new(EventHub::new(16));
        let auth: Arc<dyn AuthProvider> = match user {
            Some(u) => Arc::new(SessionAuth::signed_in(u)),
            None => Arc::new(SessionAuth::signed_out()),
        };
        NotificationService::new(pool, hub, auth)
    }

    #[tokio::test]
    async fn operations_require_an_identity() {
        let svc = service(None).await;
        assert!(matches!(
            svc.unread_count().await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            svc.mark_read("n1").await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            svc.preferences().await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn absent_preferences_fall_back_to_defaults() {
        let svc = service(Some("u1")).await;
        assert!(svc.preferences().await.unwrap().is_none());

        let effective = svc.effective_preferences().await.unwrap();
        assert!(effective.sound_enabled);
        assert!(!effective.quiet_hours.enabled);
        assert_eq!(effective.frequency, Frequency::Realtime);
        for ty in NotificationType::ALL {
            assert!(effective.type_enabled(ty));
        }
    }

    #[tokio::test]
    async fn should_alert_honors_type_flags_and_quiet_hours() {
        let svc = service(Some("u1")).await;
        let n = svc
            .publish(
                "u1",
                CreateNotification::new(NotificationType::Mention, "hi", "you were mentioned"),
            )
            .await
            .unwrap();

        use chrono::TimeZone;
        let defaults = svc.effective_preferences().await.unwrap();
        let noon = chrono::Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        assert!(should_alert(&defaults, &n, noon));

        let mut off = BTreeMap::new();
        off.insert(NotificationType::Mention, false);
        let muted_type = svc
            .update_preferences(UpdateNotificationPreferences {
                notification_types: Some(off),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!should_alert(&muted_type, &n, noon));

        let quiet_all_day = svc
            .update_preferences(UpdateNotificationPreferences {
                notification_types: Some(BTreeMap::from([(NotificationType::Mention, true)])),
                quiet_hours: Some(QuietHours {
                    enabled: true,
                    start: "00:00".to_string(),
                    end: "23:59".to_string(),
                    timezone: "UTC".to_string(),
                }),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!should_alert(&quiet_all_day, &n, noon));
    }

    /// End-to-end: one insert event reaches the bell and the toast stack,
    /// and a mark-read from either side converges on the next repository
    /// read without the consumers resyncing each other.
    #[tokio::test]
    async fn bell_and_toasts_converge_after_mark_read() {
        let pool = test_pool().await;
        let hub = Arc::new(EventHub::new(16));
        let auth = Arc::new(SessionAuth::signed_in("u1"));
        let svc = NotificationService::new(pool.clone(), hub.clone(), auth.clone());
        let dispatcher = RealtimeDispatcher::new(hub.clone(), auth);

        let badge = Arc::new(UnreadBadge::new());
        let toasts = Arc::new(Mutex::new(ToastStack::new(&ToastConfig {
            dismiss_after_ms: 5000,
            exit_grace_ms: 300,
            max_visible: 3,
        })));

        let bell = badge.clone();
        let _bell_guard = dispatcher.subscribe(move |n| bell.observe_insert(n)).await;
        let stack = toasts.clone();
        let _toast_guard = dispatcher
            .subscribe(move |n| {
                stack
                    .lock()
                    .unwrap()
                    .push(n.clone(), tokio::time::Instant::now());
            })
            .await;

        let n = svc
            .publish(
                "u1",
                CreateNotification::new(NotificationType::DealAssignment, "New deal", "Acme"),
            )
            .await
            .unwrap();

        for _ in 0..200 {
            if badge.count() == 1 && toasts.lock().unwrap().len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(badge.count(), 1);
        assert_eq!(toasts.lock().unwrap().len(), 1);

        // Toast consumer marks it read; bell applies its own local patch.
        assert!(svc.mark_read(&n.id).await.unwrap());
        badge.observe_read(&n.id);
        assert_eq!(badge.count(), 0);

        // Both consumers agree with the repository on the next read.
        assert_eq!(svc.unread_count().await.unwrap(), 0);
        let listed = svc
            .list(&NotificationFilter::default(), 10, 0)
            .await
            .unwrap();
        assert!(listed[0].is_read);
        badge.refresh(&listed);
        assert_eq!(badge.count(), 0);
    }
}
