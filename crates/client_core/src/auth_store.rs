use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use shared::{
    domain::UserRole,
    protocol::{AuthResponse, LoginRequest, RegisterRequest, User},
};

use crate::{
    http::{ApiClient, ClientError, TokenPair},
    services::AuthService,
    session::{PersistedSession, SessionPersistence},
};

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_authenticated: bool,
}

impl AuthState {
    /// Advisory UI gates only; the backend re-validates the role on every
    /// request.
    pub fn is_admin(&self) -> bool {
        matches!(self.role(), Some(UserRole::Admin))
    }

    pub fn is_editor(&self) -> bool {
        matches!(self.role(), Some(UserRole::Admin) | Some(UserRole::Editor))
    }

    fn role(&self) -> Option<UserRole> {
        self.user.as_ref().map(|user| user.role)
    }
}

/// Session state plus its durable mirror. Login and register persist the
/// token pair and user; logout clears both no matter what the server says.
pub struct AuthStore {
    service: AuthService,
    api: Arc<ApiClient>,
    persistence: Arc<dyn SessionPersistence>,
    state: Mutex<AuthState>,
}

impl AuthStore {
    pub fn new(
        service: AuthService,
        api: Arc<ApiClient>,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Self {
        Self {
            service,
            api,
            persistence,
            state: Mutex::new(AuthState::default()),
        }
    }

    pub async fn snapshot(&self) -> AuthState {
        self.state.lock().await.clone()
    }

    pub async fn is_admin(&self) -> bool {
        self.state.lock().await.is_admin()
    }

    pub async fn is_editor(&self) -> bool {
        self.state.lock().await.is_editor()
    }

    /// Rehydrates a previously persisted session, if any.
    pub async fn restore(&self) -> anyhow::Result<bool> {
        let Some(session) = self.persistence.load().await? else {
            return Ok(false);
        };

        self.api
            .set_tokens(TokenPair {
                access_token: session.access_token.clone(),
                refresh_token: session.refresh_token.clone(),
            })
            .await;

        let mut state = self.state.lock().await;
        info!(email = %session.user.email, "restored persisted session");
        state.user = Some(session.user);
        state.is_authenticated = true;
        Ok(true)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let response = self
            .service
            .login(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        self.install_session(response).await
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> Result<User, ClientError> {
        let response = self
            .service
            .register(&RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
                full_name,
            })
            .await?;
        self.install_session(response).await
    }

    /// Local cleanup is guaranteed: the durable session, the client tokens,
    /// and the in-memory user are cleared before any server failure is
    /// re-raised.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.service.logout().await;

        if let Err(err) = self.persistence.clear().await {
            warn!("failed to clear persisted session: {err}");
        }
        self.api.clear_tokens().await;
        {
            let mut state = self.state.lock().await;
            *state = AuthState::default();
        }
        info!("session cleared");

        result
    }

    async fn install_session(&self, response: AuthResponse) -> Result<User, ClientError> {
        self.api
            .set_tokens(TokenPair {
                access_token: response.access_token.clone(),
                refresh_token: response.refresh_token.clone(),
            })
            .await;

        if let Err(err) = self
            .persistence
            .save(&PersistedSession {
                access_token: response.access_token,
                refresh_token: response.refresh_token,
                user: response.user.clone(),
            })
            .await
        {
            warn!("failed to persist session: {err}");
        }

        let mut state = self.state.lock().await;
        info!(email = %response.user.email, role = ?response.user.role, "signed in");
        state.user = Some(response.user.clone());
        state.is_authenticated = true;
        Ok(response.user)
    }
}

#[cfg(test)]
#[path = "tests/auth_store_tests.rs"]
mod tests;
