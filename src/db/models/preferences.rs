use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use super::notification::NotificationType;

/// Delivery batching granularity. Stored as a preference; the dispatcher
/// itself always delivers in real time, batching is a producer-side concern.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Realtime,
    Hourly,
    Daily,
}

/// Wall-clock suppression window, possibly wrapping midnight.
///
/// `start` and `end` are "HH:MM" strings; `timezone` is a UTC-offset string
/// ("UTC", "Z", "+05:30", "-08:00").
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct QuietHours {
    #[sqlx(rename = "quiet_enabled")]
    pub enabled: bool,
    #[sqlx(rename = "quiet_start")]
    pub start: String,
    #[sqlx(rename = "quiet_end")]
    pub end: String,
    #[sqlx(rename = "quiet_timezone")]
    pub timezone: String,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "22:00".to_string(),
            end: "08:00".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

/// Singleton-per-user notification settings, created lazily on first write.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub id: String,
    pub user_id: String,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub sound_enabled: bool,
    /// Per-type enable flags; types missing from the map count as enabled.
    pub notification_types: Json<BTreeMap<NotificationType, bool>>,
    #[sqlx(flatten)]
    pub quiet_hours: QuietHours,
    pub frequency: Frequency,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NotificationPreferences {
    /// The defaults a consumer applies when no record exists yet: every
    /// channel on, sound on, all types enabled, quiet hours off, realtime.
    pub fn default_for(user_id: &str) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: String::new(),
            user_id: user_id.to_string(),
            email_notifications: true,
            push_notifications: true,
            sound_enabled: true,
            notification_types: Json(
                NotificationType::ALL.iter().map(|ty| (*ty, true)).collect(),
            ),
            quiet_hours: QuietHours::default(),
            frequency: Frequency::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn type_enabled(&self, ty: NotificationType) -> bool {
        self.notification_types.get(&ty).copied().unwrap_or(true)
    }
}

/// Partial update; absent fields keep their stored value and the
/// `notification_types` map merges per key. Unknown JSON keys are ignored
/// rather than rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNotificationPreferences {
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
    pub sound_enabled: Option<bool>,
    pub notification_types: Option<BTreeMap<NotificationType, bool>>,
    pub quiet_hours: Option<QuietHours>,
    pub frequency: Option<Frequency>,
}
