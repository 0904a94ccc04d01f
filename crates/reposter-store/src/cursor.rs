//! Upload cursor persistence.

use async_trait::async_trait;
use tracing::info;

use reposter_models::UploadCursor;

use crate::env_file::{keys, EnvStore};
use crate::error::{StoreError, StoreResult};

/// Durable home of the upload cursor.
#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn load(&self) -> StoreResult<UploadCursor>;

    /// Persist `cursor`; returns once it is durable.
    async fn save(&self, cursor: UploadCursor) -> StoreResult<()>;
}

#[async_trait]
impl CursorStore for EnvStore {
    async fn load(&self) -> StoreResult<UploadCursor> {
        let store = self.clone();
        let raw = tokio::task::spawn_blocking(move || store.require(keys::UPLOAD_CURSOR)).await??;
        raw.parse()
            .map_err(|_| StoreError::invalid_value(keys::UPLOAD_CURSOR, raw))
    }

    async fn save(&self, cursor: UploadCursor) -> StoreResult<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            store.set_key(keys::UPLOAD_CURSOR, &cursor.to_string())
        })
        .await??;
        info!(cursor = cursor.value(), "Persisted upload cursor");
        Ok(())
    }
}
