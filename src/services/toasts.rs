use tokio::time::{Duration, Instant};

use crate::config::ToastConfig;
use crate::db::models::Notification;

/// Lifecycle of one toast: Visible until its timer fires or the user acts,
/// then Closing while the exit animation plays, then purged from the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastState {
    Visible,
    Closing,
}

#[derive(Debug)]
pub struct Toast {
    pub toast_id: u64,
    pub notification: Notification,
    pub state: ToastState,
    created_at: Instant,
    closing_at: Option<Instant>,
}

/// What the host should do after a toast was clicked: mark the notification
/// read through the repository, and navigate if a URL is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastAction {
    pub notification_id: String,
    pub action_url: Option<String>,
}

/// Ephemeral presentation queue for insert events.
///
/// All created toasts stay in the backing list until removed; only the first
/// `max_visible` are rendered, and overflow toasts wait their turn. The stack
/// is advanced explicitly via `tick`, so hosts drive it from their own event
/// loop (`next_deadline` says when the next transition is due).
pub struct ToastStack {
    toasts: Vec<Toast>,
    next_id: u64,
    dismiss_after: Duration,
    exit_grace: Duration,
    max_visible: usize,
}

impl ToastStack {
    pub fn new(config: &ToastConfig) -> Self {
        Self {
            toasts: Vec::new(),
            next_id: 0,
            dismiss_after: Duration::from_millis(config.dismiss_after_ms),
            exit_grace: Duration::from_millis(config.exit_grace_ms),
            max_visible: config.max_visible,
        }
    }

    /// Track a new toast for an insert event. Its auto-close timer starts
    /// now, whether or not it is currently within the render window.
    pub fn push(&mut self, notification: Notification, now: Instant) -> u64 {
        let toast_id = self.next_id;
        self.next_id += 1;
        self.toasts.push(Toast {
            toast_id,
            notification,
            state: ToastState::Visible,
            created_at: now,
            closing_at: None,
        });
        toast_id
    }

    /// Advance timers: Visible toasts past `dismiss_after` start Closing,
    /// Closing toasts past `exit_grace` are purged.
    pub fn tick(&mut self, now: Instant) {
        for toast in &mut self.toasts {
            if toast.state == ToastState::Visible
                && now >= toast.created_at + self.dismiss_after
            {
                toast.state = ToastState::Closing;
                toast.closing_at = Some(now);
            }
        }

        let grace = self.exit_grace;
        self.toasts.retain(|t| match (t.state, t.closing_at) {
            (ToastState::Closing, Some(at)) => now < at + grace,
            _ => true,
        });
    }

    /// Explicit user dismissal; starts the exit animation immediately.
    pub fn dismiss(&mut self, toast_id: u64, now: Instant) -> bool {
        match self.visible_toast_mut(toast_id) {
            Some(toast) => {
                toast.state = ToastState::Closing;
                toast.closing_at = Some(now);
                true
            }
            None => false,
        }
    }

    /// Click-through: yields what the host must do (mark read, navigate) and
    /// starts Closing. Returns `None` for unknown or already-closing toasts.
    pub fn activate(&mut self, toast_id: u64, now: Instant) -> Option<ToastAction> {
        let toast = self.visible_toast_mut(toast_id)?;
        let action = ToastAction {
            notification_id: toast.notification.id.clone(),
            action_url: toast.notification.action_url.clone(),
        };
        toast.state = ToastState::Closing;
        toast.closing_at = Some(now);
        Some(action)
    }

    /// The rendered slice: at most `max_visible` toasts, oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter().take(self.max_visible)
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    /// Earliest pending transition, for hosts scheduling their next tick.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.toasts
            .iter()
            .map(|t| match (t.state, t.closing_at) {
                (ToastState::Closing, Some(at)) => at + self.exit_grace,
                _ => t.created_at + self.dismiss_after,
            })
            .min()
    }

    fn visible_toast_mut(&mut self, toast_id: u64) -> Option<&mut Toast> {
        self.toasts
            .iter_mut()
            .find(|t| t.toast_id == toast_id && t.state == ToastState::Visible)
    }
}
