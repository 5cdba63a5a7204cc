use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::db::models::Notification;
use crate::services::auth::AuthProvider;
use crate::services::events::InsertStream;

/// In-process callback invoked for every insert event. Callbacks must be
/// quick and must not re-enter the dispatcher; heavy work belongs on a task.
pub type Listener = Arc<dyn Fn(&Notification) + Send + Sync>;

struct ListenerSet {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

struct Connection {
    user_id: String,
    task: JoinHandle<()>,
}

/// Fan-out hub between the single upstream insert-event stream and all
/// interested in-process consumers.
///
/// State machine per instance: Idle (no upstream stream, zero listeners) and
/// Active (exactly one upstream stream, one or more listeners). The first
/// `subscribe` opens the stream, the last unsubscribe closes it, and an async
/// mutex makes connection setup single-flight so concurrent subscribes from
/// Idle never open two upstream streams.
pub struct RealtimeDispatcher {
    source: Arc<dyn InsertStream>,
    auth: Arc<dyn AuthProvider>,
    listeners: Arc<Mutex<ListenerSet>>,
    connection: Arc<Mutex<Option<Connection>>>,
    init_lock: tokio::sync::Mutex<()>,
}

impl RealtimeDispatcher {
    pub fn new(source: Arc<dyn InsertStream>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            source,
            auth,
            listeners: Arc::new(Mutex::new(ListenerSet {
                next_id: 0,
                entries: Vec::new(),
            })),
            connection: Arc::new(Mutex::new(None)),
            init_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Register `callback` for every future insert event.
    ///
    /// Opens the upstream stream first when none is live. If it cannot be
    /// opened (no authenticated user, backend unreachable) the callback stays
    /// registered, the failure is logged, and the next `subscribe` retries;
    /// consumers degrade to manual refresh instead of crashing.
    pub async fn subscribe<F>(&self, callback: F) -> ListenerGuard
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = {
            let mut set = self.listeners.lock().expect("listener lock poisoned");
            let id = set.next_id;
            set.next_id += 1;
            set.entries.push((id, Arc::new(callback)));
            id
        };

        self.ensure_connected().await;

        ListenerGuard {
            id,
            active: AtomicBool::new(true),
            listeners: self.listeners.clone(),
            connection: self.connection.clone(),
        }
    }

    /// Open the upstream stream if there is none live. Serialized by
    /// `init_lock` so concurrent callers share one attempt.
    async fn ensure_connected(&self) {
        let _guard = self.init_lock.lock().await;

        let current = self.auth.current_user_id();

        {
            let mut conn = self.connection.lock().expect("connection lock poisoned");
            if let Some(existing) = conn.as_ref() {
                if !existing.task.is_finished()
                    && current.as_deref() == Some(existing.user_id.as_str())
                {
                    return;
                }
            }
            // The stream belongs to a previous identity or already died;
            // drop it before opening a fresh one.
            if let Some(stale) = conn.take() {
                stale.task.abort();
                tracing::debug!(user_id = %stale.user_id, "Dropping stale realtime subscription");
            }
        }

        let Some(user_id) = current else {
            tracing::warn!("No authenticated user; realtime delivery disabled until sign-in");
            return;
        };

        match self.source.open(&user_id).await {
            Ok(mut rx) => {
                let listeners = self.listeners.clone();
                let task_user = user_id.clone();
                let task = tokio::spawn(async move {
                    while let Some(notification) = rx.recv().await {
                        dispatch(&listeners, &notification);
                    }
                    tracing::debug!(user_id = %task_user, "Insert-event stream ended");
                });

                tracing::info!(user_id = %user_id, "Realtime subscription established");
                *self.connection.lock().expect("connection lock poisoned") =
                    Some(Connection { user_id, task });
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to open insert-event stream");
            }
        }
    }

    /// Drop every listener and close the upstream stream. Same locking
    /// discipline as `ListenerGuard::unsubscribe`.
    pub fn shutdown(&self) {
        let mut set = self.listeners.lock().expect("listener lock poisoned");
        set.entries.clear();
        if let Some(conn) = self
            .connection
            .lock()
            .expect("connection lock poisoned")
            .take()
        {
            conn.task.abort();
            tracing::info!(user_id = %conn.user_id, "Realtime subscription closed");
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .expect("listener lock poisoned")
            .entries
            .len()
    }

    pub fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .expect("connection lock poisoned")
            .as_ref()
            .map(|c| !c.task.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for RealtimeDispatcher {
    fn drop(&mut self) {
        if let Some(conn) = self
            .connection
            .lock()
            .expect("connection lock poisoned")
            .take()
        {
            conn.task.abort();
        }
    }
}

/// Invoke every registered callback in registration order. A panicking
/// callback is isolated and logged; siblings still receive the event. The
/// lock is held across the loop so that an unsubscribe that has returned is
/// guaranteed to never see another invocation.
fn dispatch(listeners: &Mutex<ListenerSet>, notification: &Notification) {
    let set = listeners.lock().expect("listener lock poisoned");
    for (id, callback) in &set.entries {
        let result = catch_unwind(AssertUnwindSafe(|| callback(notification)));
        if result.is_err() {
            tracing::warn!(
                listener_id = id,
                notification_id = %notification.id,
                "Notification listener panicked; continuing with remaining listeners"
            );
        }
    }
}

/// Removes its callback on `unsubscribe` or `Drop`. When the last listener
/// leaves, the upstream stream is closed and the dispatcher returns to Idle;
/// a later subscribe opens a fresh stream with no event replay.
pub struct ListenerGuard {
    id: u64,
    active: AtomicBool,
    listeners: Arc<Mutex<ListenerSet>>,
    connection: Arc<Mutex<Option<Connection>>>,
}

impl ListenerGuard {
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }

        // Teardown stays under the listener lock: a racing subscribe either
        // registers before the emptiness check and keeps the stream alive, or
        // finds the connection already cleared and opens a fresh one.
        let mut set = self.listeners.lock().expect("listener lock poisoned");
        set.entries.retain(|(id, _)| *id != self.id);
        if set.entries.is_empty() {
            if let Some(conn) = self
                .connection
                .lock()
                .expect("connection lock poisoned")
                .take()
            {
                conn.task.abort();
                tracing::debug!(user_id = %conn.user_id, "Last listener left, closing realtime subscription");
            }
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
