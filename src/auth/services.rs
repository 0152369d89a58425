use tracing::{info, instrument, warn};

use super::dto::{AuthResponse, LoginRequest, MeResponse, ProfileUpdate, RegisterRequest, User};
use super::session::{SessionHandle, SessionState, SessionView};
use super::validation::check;
use crate::error::ClientError;
use crate::http::{unwrap_field, ApiClient};

/// Owns the login/logout boundary. Everything else reads the session
/// through [`SessionView`].
#[derive(Clone)]
pub struct SessionStore {
    handle: SessionHandle,
    api: ApiClient,
}

impl SessionStore {
    pub fn new(handle: SessionHandle, api: ApiClient) -> Self {
        Self { handle, api }
    }

    pub fn view(&self) -> SessionView {
        self.handle.view()
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let payload = LoginRequest::new(email, password);
        check(&payload, LoginRequest::FIELDS)?;

        let resp: AuthResponse = self.api.post("/api/auth/login", &payload).await?;
        info!(user_id = %resp.user.id, "user logged in");
        self.handle.authenticate(Some(&resp.token), resp.user.clone());
        Ok(resp.user)
    }

    #[instrument(skip(self, payload), fields(email = %payload.email))]
    pub async fn register(&self, payload: RegisterRequest) -> Result<User, ClientError> {
        let payload = payload.normalized();
        check(&payload, RegisterRequest::FIELDS)?;

        let resp: AuthResponse = self.api.post("/api/auth/register", &payload).await?;
        info!(user_id = %resp.user.id, "user registered");
        self.handle.authenticate(Some(&resp.token), resp.user.clone());
        Ok(resp.user)
    }

    /// Clears the token and the in-memory user. No network call.
    pub fn logout(&self) {
        info!("user logged out");
        self.handle.clear();
    }

    /// Resolves the initial `Loading` state from the stored token.
    ///
    /// Any failure drops the token and leaves the app anonymous.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> SessionState {
        if self.handle.token().is_none() {
            self.handle.clear();
            return SessionState::Anonymous;
        }

        match self.api.get::<MeResponse>("/api/users/me").await {
            Ok(me) => {
                let user = me.into_user();
                self.handle.authenticate(None, user);
            }
            Err(e) => {
                warn!(error = %e, "stored session rejected; continuing anonymously");
                self.handle.clear();
            }
        }
        self.handle.state()
    }

    /// Replaces the cached user after a local profile edit.
    pub fn update_user(&self, user: User) {
        self.handle.replace_user(user);
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        let value: serde_json::Value = self.api.patch("/api/users/me", update).await?;
        let user: User = unwrap_field(value, "user")?;
        self.update_user(user.clone());
        Ok(user)
    }
}
