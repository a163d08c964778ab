use std::{sync::Arc, time::Duration};

use anyhow::Result;

pub mod auth_store;
pub mod config;
pub mod draft_store;
pub mod http;
pub mod services;
pub mod session;
pub mod template_store;

pub use auth_store::{AuthState, AuthStore};
pub use config::{load_settings, normalize_database_url, Settings};
pub use draft_store::{DraftState, DraftStore};
pub use http::{ApiClient, ClientError, TokenPair};
pub use services::{AuthService, DraftService, TemplateFilter, TemplateService};
pub use session::{DurableSessionStore, MemorySessionStore, PersistedSession, SessionPersistence};
pub use template_store::{TemplateState, TemplateStore};

/// Top-level application context owning the client state stores. Views hold
/// a reference to this and read store snapshots; there are no ambient
/// singletons anywhere in the crate.
pub struct AppContext {
    pub auth: AuthStore,
    pub drafts: DraftStore,
    pub templates: TemplateStore,
}

impl AppContext {
    /// Wires the full stack: sqlite-backed session persistence, the
    /// authenticated HTTP client, one service per resource, one store per
    /// service. Restores a persisted session when one exists.
    pub async fn new(settings: &Settings) -> Result<Self> {
        let database_url = normalize_database_url(&settings.database_url);
        let store = storage::SessionStore::new(&database_url).await?;
        Self::with_persistence(settings, Arc::new(DurableSessionStore::new(store))).await
    }

    pub async fn with_persistence(
        settings: &Settings,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Result<Self> {
        let api = Arc::new(ApiClient::new(
            &settings.server_url,
            Duration::from_secs(settings.request_timeout_secs),
            persistence.clone(),
        )?);

        let auth = AuthStore::new(AuthService::new(api.clone()), api.clone(), persistence);
        auth.restore().await?;

        Ok(Self {
            auth,
            drafts: DraftStore::new(DraftService::new(api.clone())),
            templates: TemplateStore::new(TemplateService::new(api)),
        })
    }
}
