pub mod notification;
pub mod preferences;

pub use notification::NotificationRepository;
pub use preferences::NotificationPreferencesRepository;
