//! Session registry
//!
//! Maps bearer tokens issued by the identity provider to user profiles.
//! Tokens are loaded from configuration at startup and read-only afterwards.

use serde::Deserialize;
use std::collections::HashMap;

use super::{AuthHandle, User};

/// A configured session: token plus the profile it resolves to
#[derive(Debug, Clone, Deserialize)]
pub struct SessionUser {
    pub token: String,
    pub uid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl SessionUser {
    fn to_user(&self) -> User {
        User {
            uid: self.uid.clone(),
            photo_url: self.photo_url.clone(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Token to user lookup
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, User>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(sessions: &[SessionUser]) -> Self {
        let mut registry = Self::new();
        for session in sessions {
            if session.token.is_empty() {
                tracing::warn!(uid = %session.uid, "Session with empty token ignored");
                continue;
            }
            registry.insert(session.token.clone(), session.to_user());
        }
        registry
    }

    pub fn insert(&mut self, token: impl Into<String>, user: User) {
        self.sessions.insert(token.into(), user);
    }

    pub fn lookup(&self, token: &str) -> Option<&User> {
        self.sessions.get(token)
    }

    /// Resolve an `Authorization` header value (`Bearer <token>`)
    pub fn resolve_bearer(&self, header: Option<&str>) -> Option<User> {
        let token = header?.strip_prefix("Bearer ")?.trim();
        self.lookup(token).cloned()
    }

    /// Auth provider for one request: resolved, never loading
    pub fn request_auth(&self, header: Option<&str>) -> AuthHandle {
        match self.resolve_bearer(header) {
            Some(user) => AuthHandle::signed_in(user),
            None => AuthHandle::signed_out(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthProvider;

    fn registry() -> SessionRegistry {
        SessionRegistry::from_config(&[
            SessionUser {
                token: "secret".to_string(),
                uid: "u1".to_string(),
                display_name: Some("Ada".to_string()),
                photo_url: None,
                email: Some("ada@example.com".to_string()),
            },
            SessionUser {
                token: String::new(),
                uid: "u2".to_string(),
                display_name: None,
                photo_url: None,
                email: None,
            },
        ])
    }

    #[test]
    fn test_empty_tokens_skipped() {
        assert_eq!(registry().len(), 1);
    }

    #[test]
    fn test_resolve_bearer() {
        let registry = registry();
        let user = registry.resolve_bearer(Some("Bearer secret")).unwrap();
        assert_eq!(user.uid, "u1");

        assert!(registry.resolve_bearer(Some("secret")).is_none());
        assert!(registry.resolve_bearer(Some("Bearer nope")).is_none());
        assert!(registry.resolve_bearer(None).is_none());
    }

    #[test]
    fn test_request_auth() {
        let registry = registry();
        let auth = registry.request_auth(Some("Bearer secret"));
        assert!(!auth.state().loading);
        assert!(auth.current_user().is_some());

        let anonymous = registry.request_auth(None);
        assert!(anonymous.current_user().is_none());
    }
}
