pub mod auth;
pub mod badge;
pub mod dispatcher;
pub mod events;
pub mod notifications;
pub mod quiet_hours;
pub mod toasts;

pub use auth::{AuthProvider, SessionAuth};
pub use badge::UnreadBadge;
pub use dispatcher::{ListenerGuard, RealtimeDispatcher};
pub use events::{EventHub, InsertStream};
pub use notifications::{should_alert, NotificationService};
pub use toasts::{Toast, ToastAction, ToastStack, ToastState};
