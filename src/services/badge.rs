use std::collections::HashSet;
use std::sync::Mutex;

use crate::db::models::Notification;

/// Local unread counter for the bell consumer.
///
/// Holds the set of unread, undismissed notification ids rather than a bare
/// number, so every patch is an idempotent function of the previous state: a
/// duplicate insert echo, a repeated mark-read, or an out-of-order mix of
/// both converges to the same set. `refresh` reconciles against a repository
/// read whenever the consumer wants the authoritative view.
#[derive(Debug, Default)]
pub struct UnreadBadge {
    unread_ids: Mutex<HashSet<String>>,
}

impl UnreadBadge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.unread_ids.lock().expect("badge lock poisoned").len()
    }

    /// Patch for a dispatcher insert event.
    pub fn observe_insert(&self, notification: &Notification) {
        if notification.counts_toward_unread() {
            self.unread_ids
                .lock()
                .expect("badge lock poisoned")
                .insert(notification.id.clone());
        }
    }

    /// Patch for a local (or echoed) mark-read.
    pub fn observe_read(&self, id: &str) {
        self.unread_ids.lock().expect("badge lock poisoned").remove(id);
    }

    /// Dismissed notifications stop counting even while unread.
    pub fn observe_dismiss(&self, id: &str) {
        self.unread_ids.lock().expect("badge lock poisoned").remove(id);
    }

    pub fn observe_all_read(&self) {
        self.unread_ids.lock().expect("badge lock poisoned").clear();
    }

    /// Replace local state with a repository listing.
    pub fn refresh(&self, notifications: &[Notification]) {
        let mut ids = self.unread_ids.lock().expect("badge lock poisoned");
        ids.clear();
        ids.extend(
            notifications
                .iter()
                .filter(|n| n.counts_toward_unread())
                .map(|n| n.id.clone()),
        );
    }
}
