use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("auth context: {0}")]
    AuthContext(String),
    #[error("snapshot store i/o: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot encoding: {0}")]
    Encoding(#[from] base64::DecodeError),
}

/// A prior wallet session state, normalized to one canonical byte sequence.
///
/// Backing stores hold the blob either as raw bytes or as base64 text;
/// both forms converge here, and the wallet manager only ever sees the
/// normalized bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Vec<u8>);

impl Snapshot {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_base64(text: &str) -> Result<Self, SnapshotError> {
        Ok(Self(STANDARD.decode(text.trim())?))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

/// How a backing store represents the blob at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotEncoding {
    Raw,
    Base64,
}

/// External contract for the device's snapshot storage layer.
#[async_trait]
pub trait SnapshotGateway: Send + Sync {
    /// Establish the prerequisite local-auth context. Idempotent; must be
    /// called before any snapshot read.
    async fn establish_auth_context(&self, persist: bool) -> Result<(), SnapshotError>;

    /// The persisted snapshot, already normalized, or `None` when no prior
    /// session exists. Never partially populated.
    async fn snapshot(&self) -> Result<Option<Snapshot>, SnapshotError>;
}

/// In-memory store, used by tests and demos.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    blob: RwLock<Option<Snapshot>>,
    authed: AtomicBool,
}

impl InMemorySnapshotStore {
    pub fn seeded(snapshot: Snapshot) -> Self {
        Self {
            blob: RwLock::new(Some(snapshot)),
            authed: AtomicBool::new(false),
        }
    }

    pub async fn seed(&self, snapshot: Snapshot) {
        *self.blob.write().await = Some(snapshot);
    }

    pub async fn clear(&self) {
        *self.blob.write().await = None;
    }
}

#[async_trait]
impl SnapshotGateway for InMemorySnapshotStore {
    async fn establish_auth_context(&self, _persist: bool) -> Result<(), SnapshotError> {
        self.authed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn snapshot(&self) -> Result<Option<Snapshot>, SnapshotError> {
        if !self.authed.load(Ordering::SeqCst) {
            return Err(SnapshotError::AuthContext("not established".to_owned()));
        }
        Ok(self.blob.read().await.clone())
    }
}

/// Single-blob file store.
///
/// `encoding` describes the at-rest representation; reads normalize either
/// form to the same `Snapshot`.
pub struct FsSnapshotStore {
    path: PathBuf,
    encoding: SnapshotEncoding,
    authed: AtomicBool,
}

impl FsSnapshotStore {
    pub fn new(path: impl Into<PathBuf>, encoding: SnapshotEncoding) -> Self {
        Self {
            path: path.into(),
            encoding,
            authed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Persist a snapshot in this store's at-rest encoding. Enrollment
    /// writes through here once the wallet manager hands back a session
    /// blob.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match self.encoding {
            SnapshotEncoding::Raw => tokio::fs::write(&self.path, snapshot.bytes()).await?,
            SnapshotEncoding::Base64 => {
                tokio::fs::write(&self.path, snapshot.to_base64()).await?;
            }
        }
        Ok(())
    }

    pub async fn remove(&self) -> Result<(), SnapshotError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl SnapshotGateway for FsSnapshotStore {
    async fn establish_auth_context(&self, persist: bool) -> Result<(), SnapshotError> {
        // The file store's only scoped resource is its cache directory.
        if persist {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        self.authed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn snapshot(&self) -> Result<Option<Snapshot>, SnapshotError> {
        if !self.authed.load(Ordering::SeqCst) {
            return Err(SnapshotError::AuthContext("not established".to_owned()));
        }

        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot on disk");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let snapshot = match self.encoding {
            SnapshotEncoding::Raw => Snapshot::from_bytes(raw),
            SnapshotEncoding::Base64 => {
                let text = String::from_utf8_lossy(&raw);
                Snapshot::from_base64(&text)?
            }
        };

        Ok(Some(snapshot))
    }
}
