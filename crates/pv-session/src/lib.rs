mod bootstrap;
mod status;

pub use bootstrap::{
    BootstrapError, BootstrapTrigger, SessionBootstrapper, SessionOutcome, TriggerSource,
};
pub use status::{BootstrapPhase, BootstrapStatus};

use async_trait::async_trait;
use pv_api_types::Network;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("wallet manager rejected snapshot: {0}")]
pub struct SinkError(pub String);

/// Live authenticated session handle produced by the wallet manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSession {
    pub session_id: String,
    pub network: Network,
}

/// External contract for the wallet manager.
///
/// Fails with a typed error on corrupt or version-incompatible snapshots;
/// never panics.
#[async_trait]
pub trait WalletSessionSink: Send + Sync {
    async fn load_snapshot(&self, snapshot: &[u8]) -> Result<WalletSession, SinkError>;
}
