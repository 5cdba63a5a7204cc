//! Database models split into separate files.

pub mod notification;
pub mod preferences;

pub use self::notification::*;
pub use self::preferences::*;
