use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Closed set of notification kinds produced by the CRM.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NotificationType {
    DealAssignment,
    TaskReminder,
    AiSuggestion,
    EmailTracking,
    CalendarReminder,
    WorkflowUpdate,
    Mention,
    LeadEngagement,
    DealStageChange,
    System,
}

impl NotificationType {
    pub const ALL: [NotificationType; 10] = [
        NotificationType::DealAssignment,
        NotificationType::TaskReminder,
        NotificationType::AiSuggestion,
        NotificationType::EmailTracking,
        NotificationType::CalendarReminder,
        NotificationType::WorkflowUpdate,
        NotificationType::Mention,
        NotificationType::LeadEngagement,
        NotificationType::DealStageChange,
        NotificationType::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::DealAssignment => "deal_assignment",
            NotificationType::TaskReminder => "task_reminder",
            NotificationType::AiSuggestion => "ai_suggestion",
            NotificationType::EmailTracking => "email_tracking",
            NotificationType::CalendarReminder => "calendar_reminder",
            NotificationType::WorkflowUpdate => "workflow_update",
            NotificationType::Mention => "mention",
            NotificationType::LeadEngagement => "lead_engagement",
            NotificationType::DealStageChange => "deal_stage_change",
            NotificationType::System => "system",
        }
    }
}

/// Visual weight only; delivery order is always `created_at` descending.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    Normal,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// A single user-facing event record. Visible only to its owner; `is_read`
/// and `is_dismissed` are independent booleans that only ever move
/// false -> true.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub content: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub action_url: Option<String>,
    pub action_text: Option<String>,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub priority: Priority,
    pub metadata: Json<serde_json::Value>,
    /// Maintained by the producing service; read-only here.
    pub delivery_status: String,
    pub retry_count: i64,
    pub created_at: NaiveDateTime,
    pub expires_at: Option<NaiveDateTime>,
}

impl Notification {
    /// Whether this notification counts toward the unread badge.
    pub fn counts_toward_unread(&self) -> bool {
        !self.is_read && !self.is_dismissed
    }

    /// Expiry is a presentation policy: the repository keeps expired rows,
    /// consumers decide whether to surface them.
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }
}

/// Producer-side input for inserting a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotification {
    pub notification_type: NotificationType,
    pub title: String,
    pub content: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub action_url: Option<String>,
    pub action_text: Option<String>,
    pub priority: Priority,
    pub metadata: serde_json::Value,
    pub expires_at: Option<NaiveDateTime>,
}

impl CreateNotification {
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            notification_type,
            title: title.into(),
            content: content.into(),
            entity_type: None,
            entity_id: None,
            action_url: None,
            action_text: None,
            priority: Priority::default(),
            metadata: serde_json::json!({}),
            expires_at: None,
        }
    }
}

/// Conjunctive listing filters; every field is independently optional.
///
/// When `is_dismissed` is left unset, listings default to non-dismissed rows.
/// `from` is inclusive and `to` exclusive on `created_at`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationFilter {
    pub notification_type: Option<NotificationType>,
    pub is_read: Option<bool>,
    pub is_dismissed: Option<bool>,
    pub priority: Option<Priority>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}
