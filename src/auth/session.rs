use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use super::dto::{Role, User};
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Stored token not yet checked; routes wait instead of rendering.
    Loading,
    Anonymous,
    Authenticated(User),
}

/// Shared session cell. The bearer token lives in [`Settings`] and is
/// read before every authorized request.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<watch::Sender<SessionState>>,
    settings: Settings,
}

impl SessionHandle {
    pub fn new(settings: Settings) -> Self {
        let (tx, _rx) = watch::channel(SessionState::Loading);
        Self {
            state: Arc::new(tx),
            settings,
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            handle: self.clone(),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.settings.token()
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub(crate) fn authenticate(&self, token: Option<&str>, user: User) {
        if let Some(token) = token {
            self.settings.set_token(token);
        }
        info!(user_id = %user.id, "session authenticated");
        self.state.send_replace(SessionState::Authenticated(user));
    }

    pub(crate) fn replace_user(&self, user: User) {
        self.state.send_modify(|state| {
            if let SessionState::Authenticated(current) = state {
                *current = user;
            }
        });
    }

    pub(crate) fn clear(&self) {
        self.settings.clear_token();
        self.state.send_replace(SessionState::Anonymous);
    }

    /// Called by the HTTP layer when an authorized request answers 401.
    pub(crate) fn expire(&self) {
        if self.token().is_some() || self.view().is_authenticated() {
            info!("session expired; clearing stored token");
        }
        self.clear();
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

/// Read-only view handed to pages and route guards.
#[derive(Clone)]
pub struct SessionView {
    handle: SessionHandle,
}

impl SessionView {
    pub fn state(&self) -> SessionState {
        self.handle.state()
    }

    pub fn current_user(&self) -> Option<User> {
        match &*self.handle.state.borrow() {
            SessionState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.handle.state.borrow(), SessionState::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.handle.state.borrow(), SessionState::Authenticated(_))
    }

    pub fn role(&self) -> Option<Role> {
        match &*self.handle.state.borrow() {
            SessionState::Authenticated(user) => Some(user.role),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.handle.token()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.handle.subscribe()
    }
}
