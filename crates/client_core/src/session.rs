use shared::domain::UserId;

/// Placeholder identity used while no sign-in provider is wired in.
pub const ANONYMOUS_USER_ID: &str = "CURRENT_USER_ID";

/// Acting user, created at the app root and handed to every operation that
/// needs an identity. No token is carried; the API does not check one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: UserId,
    display_name: Option<String>,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: None,
        }
    }

    pub fn anonymous() -> Self {
        Self::new(UserId::new(ANONYMOUS_USER_ID))
    }

    /// Uses `user_id` when configured and non-blank, the placeholder otherwise.
    pub fn from_config(user_id: Option<&str>) -> Self {
        match user_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => Self::new(UserId::new(id)),
            None => Self::anonymous(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.as_str() == ANONYMOUS_USER_ID
    }
}
