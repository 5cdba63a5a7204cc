use std::sync::RwLock;

/// Ambient identity boundary. Session management itself lives elsewhere; the
/// notification core only needs the current user id, synchronously, at call
/// time. Absence of an identity is a valid, non-fatal state.
pub trait AuthProvider: Send + Sync + 'static {
    fn current_user_id(&self) -> Option<String>;
}

/// Identity that can be signed in and out at runtime, for embedding hosts and
/// tests.
#[derive(Debug, Default)]
pub struct SessionAuth {
    user_id: RwLock<Option<String>>,
}

impl SessionAuth {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: RwLock::new(Some(user_id.into())),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        *self.user_id.write().expect("auth lock poisoned") = Some(user_id.into());
    }

    pub fn sign_out(&self) {
        *self.user_id.write().expect("auth lock poisoned") = None;
    }
}

impl AuthProvider for SessionAuth {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.read().expect("auth lock poisoned").clone()
    }
}
