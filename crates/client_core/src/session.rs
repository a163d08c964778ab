use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

pub use storage::PersistedSession;

/// Seam between the client and whatever holds the session durably. The
/// desktop build uses the sqlite-backed [`DurableSessionStore`]; tests use
/// [`MemorySessionStore`].
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn save(&self, session: &PersistedSession) -> Result<()>;
    async fn update_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()>;
    async fn load(&self) -> Result<Option<PersistedSession>>;
    async fn clear(&self) -> Result<()>;
}

pub struct DurableSessionStore {
    store: storage::SessionStore,
}

impl DurableSessionStore {
    pub fn new(store: storage::SessionStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SessionPersistence for DurableSessionStore {
    async fn save(&self, session: &PersistedSession) -> Result<()> {
        self.store.save(session).await
    }

    async fn update_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        self.store.update_tokens(access_token, refresh_token).await
    }

    async fn load(&self) -> Result<Option<PersistedSession>> {
        Ok(self.store.load().await?.map(|stored| stored.session))
    }

    async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<PersistedSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seeded(session: PersistedSession) -> Self {
        let store = Self::default();
        *store.inner.lock().await = Some(session);
        store
    }

    pub async fn current(&self) -> Option<PersistedSession> {
        self.inner.lock().await.clone()
    }
}

#[async_trait]
impl SessionPersistence for MemorySessionStore {
    async fn save(&self, session: &PersistedSession) -> Result<()> {
        *self.inner.lock().await = Some(session.clone());
        Ok(())
    }

    async fn update_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        if let Some(session) = self.inner.lock().await.as_mut() {
            session.access_token = access_token.to_string();
            session.refresh_token = refresh_token.to_string();
        }
        Ok(())
    }

    async fn load(&self) -> Result<Option<PersistedSession>> {
        Ok(self.inner.lock().await.clone())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.lock().await = None;
        Ok(())
    }
}
