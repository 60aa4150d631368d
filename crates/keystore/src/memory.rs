use async_trait::async_trait;
use spotdesk_core::{CredentialStore, Credentials, TradeError};
use tokio::sync::RwLock;

/// Keeps credentials in process memory only.
#[derive(Default)]
pub struct MemoryKeyStore {
    credentials: RwLock<Option<Credentials>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: RwLock::new(Some(credentials)),
        }
    }

    pub async fn clear(&self) {
        *self.credentials.write().await = None;
    }
}

#[async_trait]
impl CredentialStore for MemoryKeyStore {
    async fn get_api_keys(&self) -> Result<Option<Credentials>, TradeError> {
        Ok(self.credentials.read().await.clone())
    }

    async fn store_api_keys(&self, credentials: Credentials) -> Result<(), TradeError> {
        *self.credentials.write().await = Some(credentials);
        Ok(())
    }
}
