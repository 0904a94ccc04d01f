//! Single owner of the session credential.
//!
//! The poll loop and the operator bot never share the credential directly.
//! They send requests to one task that holds the current value and persists
//! every replacement before acknowledging it.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use reposter_models::SessionCredential;

use crate::env_file::{keys, EnvStore};
use crate::error::{StoreError, StoreResult};

const CHANNEL_CAPACITY: usize = 16;

enum Request {
    Get(oneshot::Sender<SessionCredential>),
    Set(SessionCredential, oneshot::Sender<StoreResult<()>>),
}

/// Cloneable handle for reading and replacing the credential.
#[derive(Clone)]
pub struct CredentialHandle {
    tx: mpsc::Sender<Request>,
}

impl CredentialHandle {
    /// Current credential.
    pub async fn get(&self) -> StoreResult<SessionCredential> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Get(reply))
            .await
            .map_err(|_| StoreError::OwnerStopped)?;
        rx.await.map_err(|_| StoreError::OwnerStopped)
    }

    /// Replace and persist the credential.
    pub async fn set(&self, credential: SessionCredential) -> StoreResult<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Set(credential, reply))
            .await
            .map_err(|_| StoreError::OwnerStopped)?;
        rx.await.map_err(|_| StoreError::OwnerStopped)?
    }
}

/// Spawn the owner task. It runs until every handle is dropped.
pub fn spawn_credential_owner(
    initial: SessionCredential,
    store: EnvStore,
) -> (CredentialHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let task = tokio::spawn(run_owner(initial, store, rx));
    (CredentialHandle { tx }, task)
}

async fn run_owner(
    mut current: SessionCredential,
    store: EnvStore,
    mut rx: mpsc::Receiver<Request>,
) {
    while let Some(request) = rx.recv().await {
        match request {
            Request::Get(reply) => {
                let _ = reply.send(current.clone());
            }
            Request::Set(credential, reply) => {
                let store = store.clone();
                let value = credential.expose().to_string();
                let persisted =
                    tokio::task::spawn_blocking(move || store.set_key(keys::SESSION_ID, &value))
                        .await
                        .map_err(StoreError::from)
                        .and_then(|r| r);

                match &persisted {
                    Ok(()) => {
                        info!(credential = %credential.masked(), "Session credential replaced");
                        current = credential;
                    }
                    Err(e) => warn!("Failed to persist session credential: {}", e),
                }
                let _ = reply.send(persisted);
            }
        }
    }
}
