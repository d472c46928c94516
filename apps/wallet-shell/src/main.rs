use anyhow::Result;
use pv_config::{ConfigStore, ProviderSelection};
use pv_session::{BootstrapTrigger, SessionBootstrapper, SessionOutcome};
use pv_snapshot::{FsSnapshotStore, SnapshotEncoding};
use pv_wab_client::HttpWabClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

mod wallet;

use wallet::JsonWalletSink;

fn selection_from_env() -> ProviderSelection {
    let mut selection = ProviderSelection::default();

    if let Ok(url) = std::env::var("PALMVAULT_WAB_URL") {
        selection.wab_url = url;
    }
    if let Ok(url) = std::env::var("PALMVAULT_STORAGE_URL") {
        selection.storage_url = url;
    }
    if let Ok(method) = std::env::var("PALMVAULT_METHOD") {
        if !method.trim().is_empty() {
            selection.method = Some(method);
        }
    }
    if let Ok(network) = std::env::var("PALMVAULT_NETWORK") {
        match network.parse() {
            Ok(parsed) => selection.network = parsed,
            Err(err) => warn!(%err, "ignoring PALMVAULT_NETWORK"),
        }
    }

    selection
}

fn snapshot_store_from_env() -> FsSnapshotStore {
    let path = std::env::var("PALMVAULT_SNAPSHOT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".palmvault/snapshot"));

    let encoding = match std::env::var("PALMVAULT_SNAPSHOT_ENCODING").as_deref() {
        Ok("raw") => SnapshotEncoding::Raw,
        Ok("base64") | Err(_) => SnapshotEncoding::Base64,
        Ok(other) => {
            warn!(encoding = other, "unknown PALMVAULT_SNAPSHOT_ENCODING, using base64");
            SnapshotEncoding::Base64
        }
    };

    FsSnapshotStore::new(path, encoding)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let selection = selection_from_env();
    info!(wab_url = %selection.wab_url, network = %selection.network, "wallet-shell bootstrapping");

    let config = Arc::new(ConfigStore::new(selection));
    let network = config.selection().network;

    let mut bootstrapper = SessionBootstrapper::new(
        Arc::clone(&config),
        HttpWabClient::new(),
        snapshot_store_from_env(),
        JsonWalletSink::new(network),
    );

    match bootstrapper.bootstrap(BootstrapTrigger::launch()).await {
        SessionOutcome::Restored(session) => {
            info!(session_id = %session.session_id, "entering authenticated area");
            Ok(())
        }
        SessionOutcome::NeedsEnrollment => {
            // Routing target for the out-of-band flow comes from the
            // configuration committed during this attempt.
            let method = config
                .active()
                .map(|active| active.method.clone())
                .unwrap_or_default();
            info!(%method, "no prior session; entering enrollment flow");
            Ok(())
        }
        SessionOutcome::Failed(err) => {
            error!(error = %err, "bootstrap failed; staying on bootstrap screen");
            Err(err.into())
        }
    }
}
