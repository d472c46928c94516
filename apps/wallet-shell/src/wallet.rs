use async_trait::async_trait;
use pv_api_types::Network;
use pv_session::{SinkError, WalletSession, WalletSessionSink};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The shell's on-disk session record. A real wallet manager owns its own
/// snapshot format; this one keeps a small JSON envelope so restoration and
/// corruption are observable end to end.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub network: Network,
}

/// Demonstration wallet-manager adapter: parses a snapshot blob as a
/// [`SessionRecord`] and rejects corrupt or incompatible ones.
pub struct JsonWalletSink {
    network: Network,
}

impl JsonWalletSink {
    pub fn new(network: Network) -> Self {
        Self { network }
    }
}

#[async_trait]
impl WalletSessionSink for JsonWalletSink {
    async fn load_snapshot(&self, snapshot: &[u8]) -> Result<WalletSession, SinkError> {
        let record: SessionRecord = serde_json::from_slice(snapshot)
            .map_err(|err| SinkError(format!("unparseable session record: {err}")))?;

        Uuid::parse_str(&record.session_id)
            .map_err(|_| SinkError(format!("invalid session id {:?}", record.session_id)))?;

        if record.network != self.network {
            return Err(SinkError(format!(
                "snapshot targets network {} but the wallet is configured for {}",
                record.network, self.network
            )));
        }

        Ok(WalletSession {
            session_id: record.session_id,
            network: record.network,
        })
    }
}
