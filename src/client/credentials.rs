use std::sync::{PoisonError, RwLock};

/// Snapshot of the app's authentication store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub is_authenticated: bool,
}

impl Credentials {
    pub fn authenticated(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            is_authenticated: true,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Token usable for a connect attempt: present, non-empty, and the store
    /// still considers the user logged in.
    pub fn usable_token(&self) -> Option<&str> {
        if !self.is_authenticated {
            return None;
        }
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Read-only view of the external authentication store.
///
/// Polled at `connect()` and before every reconnect attempt; the session never
/// subscribes to changes.
pub trait CredentialsProvider: Send + Sync + 'static {
    fn credentials(&self) -> Credentials;
}

impl CredentialsProvider for Credentials {
    fn credentials(&self) -> Credentials {
        self.clone()
    }
}

/// In-memory provider the host app can update on login, refresh and logout
#[derive(Debug, Default)]
pub struct SharedCredentials {
    inner: RwLock<Credentials>,
}

impl SharedCredentials {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            inner: RwLock::new(credentials),
        }
    }

    pub fn set(&self, credentials: Credentials) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = credentials;
    }

    pub fn clear(&self) {
        self.set(Credentials::anonymous());
    }
}

impl CredentialsProvider for SharedCredentials {
    fn credentials(&self) -> Credentials {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_token() {
        assert_eq!(Credentials::authenticated("t").usable_token(), Some("t"));
        assert_eq!(Credentials::anonymous().usable_token(), None);
        assert_eq!(Credentials::authenticated("").usable_token(), None);

        let logged_out = Credentials {
            access_token: Some("stale".into()),
            is_authenticated: false,
        };
        assert_eq!(logged_out.usable_token(), None);
    }

    #[test]
    fn test_shared_credentials_update() {
        let shared = SharedCredentials::new(Credentials::authenticated("a"));
        shared.set(Credentials::authenticated("b"));
        assert_eq!(shared.credentials().usable_token(), Some("b"));

        shared.clear();
        assert_eq!(shared.credentials().usable_token(), None);
    }
}
