//! Authentication State
//!
//! The identity provider itself lives outside this crate. Pages only see
//! its observable state: whether it is still loading and who, if anyone,
//! is signed in.
//!
//! - **AuthProvider**: read and watch the current `AuthState`
//! - **AuthHandle**: watch-channel backed provider the host updates
//! - **SessionRegistry**: bearer tokens issued by the provider, for HTTP

mod sessions;

pub use sessions::{SessionRegistry, SessionUser};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Public profile of a signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            photo_url: None,
            display_name: None,
            email: None,
        }
    }

    /// Builder method: set display name
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Builder method: set photo URL
    pub fn photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    /// Builder method: set email
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Observable authentication state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthState {
    /// Provider has not yet determined the user
    pub loading: bool,
    pub user: Option<User>,
}

impl AuthState {
    pub fn loading() -> Self {
        Self {
            loading: true,
            user: None,
        }
    }

    pub fn signed_in(user: User) -> Self {
        Self {
            loading: false,
            user: Some(user),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            loading: false,
            user: None,
        }
    }
}

/// Source of authentication state
pub trait AuthProvider: Send + Sync {
    /// Current state
    fn state(&self) -> AuthState;

    /// Receiver that wakes on every state change
    fn watch(&self) -> watch::Receiver<AuthState>;

    /// Signed-in user, if any
    fn current_user(&self) -> Option<User> {
        self.state().user
    }
}

/// Provider whose state the host pushes in
pub struct AuthHandle {
    sender: watch::Sender<AuthState>,
}

impl AuthHandle {
    pub fn new(initial: AuthState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Provider that is still resolving the user
    pub fn loading() -> Self {
        Self::new(AuthState::loading())
    }

    pub fn signed_in(user: User) -> Self {
        Self::new(AuthState::signed_in(user))
    }

    pub fn signed_out() -> Self {
        Self::new(AuthState::signed_out())
    }

    /// Finish loading with the given user (or none)
    pub fn set_user(&self, user: Option<User>) {
        self.sender.send_replace(AuthState {
            loading: false,
            user,
        });
    }

    pub fn set_state(&self, state: AuthState) {
        self.sender.send_replace(state);
    }
}

impl AuthProvider for AuthHandle {
    fn state(&self) -> AuthState {
        self.sender.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<AuthState> {
        self.sender.subscribe()
    }
}
