use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::db::models::Notification;
use crate::error::AppResult;

/// Backend event-subscription contract: a server-pushed stream of insert
/// events scoped to one user, carrying the full inserted record. Dropping the
/// receiver closes the stream.
#[async_trait]
pub trait InsertStream: Send + Sync + 'static {
    async fn open(&self, user_id: &str) -> AppResult<mpsc::Receiver<Notification>>;
}

/// In-process implementation of the insert-event feed.
///
/// Producers publish here right after the repository insert; each open stream
/// for the matching user receives its own copy. Streams whose receiver fell
/// `capacity` events behind are considered stuck and lose newer events with a
/// warning rather than blocking the producer.
pub struct EventHub {
    capacity: usize,
    senders: Mutex<HashMap<String, Vec<mpsc::Sender<Notification>>>>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            senders: Mutex::new(HashMap::new()),
        }
    }

    /// Fan a freshly inserted notification out to every open stream for its
    /// owner. Closed streams are pruned as a side effect.
    pub fn publish(&self, notification: &Notification) {
        let mut senders = self.senders.lock().expect("event hub lock poisoned");
        let Some(user_senders) = senders.get_mut(&notification.user_id) else {
            return;
        };

        user_senders.retain(|tx| {
            if tx.is_closed() {
                return false;
            }
            match tx.try_send(notification.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        user_id = %notification.user_id,
                        notification_id = %notification.id,
                        "Insert-event stream full, dropping event for lagging consumer"
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });

        if user_senders.is_empty() {
            senders.remove(&notification.user_id);
        }
    }

    /// Number of open streams, across all users.
    pub fn open_streams(&self) -> usize {
        self.senders
            .lock()
            .expect("event hub lock poisoned")
            .values()
            .map(|v| v.iter().filter(|tx| !tx.is_closed()).count())
            .sum()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl InsertStream for EventHub {
    async fn open(&self, user_id: &str) -> AppResult<mpsc::Receiver<Notification>> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.senders
            .lock()
            .expect("event hub lock poisoned")
            .entry(user_id.to_string())
            .or_default()
            .push(tx);
        tracing::debug!(user_id, "Opened insert-event stream");
        Ok(rx)
    }
}
