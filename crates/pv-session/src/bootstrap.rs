use pv_config::{ConfigError, ConfigStore};
use pv_snapshot::{SnapshotError, SnapshotGateway};
use pv_wab_client::{WabClient, WabError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::status::{BootstrapPhase, BootstrapStatus};
use crate::{SinkError, WalletSession, WalletSessionSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Launch,
    Reconfigure,
}

#[derive(Debug, Clone)]
pub struct BootstrapTrigger {
    pub source: TriggerSource,
    pub requested_method: Option<String>,
}

impl BootstrapTrigger {
    pub fn launch() -> Self {
        Self {
            source: TriggerSource::Launch,
            requested_method: None,
        }
    }

    pub fn reconfigure() -> Self {
        Self {
            source: TriggerSource::Reconfigure,
            requested_method: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.requested_method = Some(method.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("provider info fetch: {0}")]
    Fetch(#[source] WabError),
    #[error("malformed provider info: {0}")]
    MalformedResponse(#[source] WabError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("auth context: {0}")]
    AuthContext(#[source] SnapshotError),
    #[error("snapshot store: {0}")]
    SnapshotStore(#[source] SnapshotError),
    #[error("snapshot load: {0}")]
    SnapshotLoad(#[source] SinkError),
}

impl From<WabError> for BootstrapError {
    fn from(err: WabError) -> Self {
        match err {
            WabError::Malformed { .. } => BootstrapError::MalformedResponse(err),
            WabError::Transport { .. } | WabError::Status { .. } => BootstrapError::Fetch(err),
        }
    }
}

/// Terminal result of one bootstrap attempt. Consumed immediately by the
/// caller to pick a navigation target: authenticated area, enrollment flow,
/// or an error surface on the bootstrap screen.
#[derive(Debug)]
pub enum SessionOutcome {
    Restored(WalletSession),
    NeedsEnrollment,
    Failed(BootstrapError),
}

impl SessionOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionOutcome::Restored(_) => "restored",
            SessionOutcome::NeedsEnrollment => "needs_enrollment",
            SessionOutcome::Failed(_) => "failed",
        }
    }
}

/// Orchestrates one launch- or reconfigure-time bootstrap attempt:
/// fetch provider info, finalize the configuration, establish the local
/// auth context, then restore from snapshot or route to enrollment.
///
/// `bootstrap` takes `&mut self`, so a second overlapping attempt on the
/// same bootstrapper is unrepresentable; the presentation layer observes
/// progress through the cloneable [`BootstrapStatus`] handle instead.
pub struct SessionBootstrapper<W, G, S> {
    wab: W,
    gateway: G,
    sink: S,
    config: Arc<ConfigStore>,
    status: BootstrapStatus,
}

impl<W, G, S> SessionBootstrapper<W, G, S>
where
    W: WabClient,
    G: SnapshotGateway,
    S: WalletSessionSink,
{
    pub fn new(config: Arc<ConfigStore>, wab: W, gateway: G, sink: S) -> Self {
        Self {
            wab,
            gateway,
            sink,
            config,
            status: BootstrapStatus::default(),
        }
    }

    /// A read-only handle for loading indicators. Cloneable and cheap.
    pub fn status(&self) -> BootstrapStatus {
        self.status.clone()
    }

    pub async fn bootstrap(&mut self, trigger: BootstrapTrigger) -> SessionOutcome {
        let guard = self.status.begin();

        let outcome = match self.run(&trigger).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(source = ?trigger.source, error = %err, "bootstrap attempt failed");
                SessionOutcome::Failed(err)
            }
        };

        drop(guard);
        info!(outcome = outcome.kind(), "bootstrap finished");
        outcome
    }

    async fn run(&self, trigger: &BootstrapTrigger) -> Result<SessionOutcome, BootstrapError> {
        let mut selection = self.config.selection();
        if let Some(method) = &trigger.requested_method {
            selection.method = Some(method.clone());
        }

        self.status.set_phase(BootstrapPhase::FetchingInfo);
        let wab_info = self.wab.fetch_info(&selection.wab_url).await?;

        self.status.set_phase(BootstrapPhase::Finalizing);
        let config = self
            .config
            .finalize(selection.with_capabilities(Some(wab_info)))?;
        debug!(method = %config.method, network = %config.network, "configuration finalized");

        // From here on the committed config stays committed even if
        // restoration fails: configuration and session restoration are
        // separate failure domains.
        self.status.set_phase(BootstrapPhase::EstablishingAuthContext);
        self.gateway
            .establish_auth_context(true)
            .await
            .map_err(BootstrapError::AuthContext)?;

        self.status.set_phase(BootstrapPhase::CheckingSnapshot);
        let snapshot = self
            .gateway
            .snapshot()
            .await
            .map_err(BootstrapError::SnapshotStore)?;

        let Some(snapshot) = snapshot else {
            info!("no snapshot cached; routing to enrollment");
            return Ok(SessionOutcome::NeedsEnrollment);
        };

        self.status.set_phase(BootstrapPhase::Restoring);
        let session = self
            .sink
            .load_snapshot(snapshot.bytes())
            .await
            .map_err(BootstrapError::SnapshotLoad)?;

        info!(session_id = %session.session_id, "session restored from snapshot");
        Ok(SessionOutcome::Restored(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pv_api_types::{Network, ProviderCapabilities};
    use pv_snapshot::{InMemorySnapshotStore, Snapshot};

    enum FakeWab {
        Methods(Vec<&'static str>),
        Status(u16),
        Malformed,
    }

    #[async_trait]
    impl WabClient for FakeWab {
        async fn fetch_info(&self, wab_url: &str) -> Result<ProviderCapabilities, WabError> {
            let url = format!("{wab_url}/info");
            match self {
                FakeWab::Methods(methods) => Ok(ProviderCapabilities {
                    supported_auth_methods: methods.iter().map(|m| (*m).to_owned()).collect(),
                }),
                FakeWab::Status(status) => Err(WabError::Status {
                    url,
                    status: *status,
                }),
                FakeWab::Malformed => Err(WabError::Malformed {
                    url,
                    detail: "not json".to_owned(),
                }),
            }
        }
    }

    struct FailingGateway;

    #[async_trait]
    impl SnapshotGateway for FailingGateway {
        async fn establish_auth_context(&self, _persist: bool) -> Result<(), SnapshotError> {
            Err(SnapshotError::AuthContext("keystore locked".to_owned()))
        }

        async fn snapshot(&self) -> Result<Option<Snapshot>, SnapshotError> {
            Ok(None)
        }
    }

    struct AcceptSink;

    #[async_trait]
    impl WalletSessionSink for AcceptSink {
        async fn load_snapshot(&self, _snapshot: &[u8]) -> Result<WalletSession, SinkError> {
            Ok(WalletSession {
                session_id: "session-1".to_owned(),
                network: Network::Main,
            })
        }
    }

    struct RejectSink;

    #[async_trait]
    impl WalletSessionSink for RejectSink {
        async fn load_snapshot(&self, _snapshot: &[u8]) -> Result<WalletSession, SinkError> {
            Err(SinkError("unreadable snapshot version".to_owned()))
        }
    }

    fn bootstrapper<G, S>(
        wab: FakeWab,
        gateway: G,
        sink: S,
    ) -> SessionBootstrapper<FakeWab, G, S>
    where
        G: SnapshotGateway,
        S: WalletSessionSink,
    {
        SessionBootstrapper::new(Arc::new(ConfigStore::default()), wab, gateway, sink)
    }

    #[tokio::test]
    async fn no_snapshot_routes_to_enrollment() {
        let mut boot = bootstrapper(
            FakeWab::Methods(vec!["phone"]),
            InMemorySnapshotStore::default(),
            AcceptSink,
        );

        let outcome = boot.bootstrap(BootstrapTrigger::launch()).await;
        assert!(matches!(outcome, SessionOutcome::NeedsEnrollment));

        // The configuration was still committed.
        let active = boot.config.active().unwrap();
        assert_eq!(active.method, "phone");
    }

    #[tokio::test]
    async fn cached_snapshot_restores_session() {
        let store = InMemorySnapshotStore::seeded(Snapshot::from_bytes(b"state".to_vec()));
        let mut boot = bootstrapper(FakeWab::Methods(vec!["phone"]), store, AcceptSink);

        let outcome = boot.bootstrap(BootstrapTrigger::launch()).await;
        match outcome {
            SessionOutcome::Restored(session) => assert_eq!(session.session_id, "session-1"),
            other => panic!("expected restored, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_failure_is_fetch_error_and_config_is_untouched() {
        let config = Arc::new(ConfigStore::default());
        let committed = config
            .finalize(
                config
                    .selection()
                    .with_capabilities(Some(ProviderCapabilities {
                        supported_auth_methods: vec!["phone".to_owned()],
                    })),
            )
            .unwrap();

        let mut boot = SessionBootstrapper::new(
            Arc::clone(&config),
            FakeWab::Status(500),
            InMemorySnapshotStore::default(),
            AcceptSink,
        );

        let outcome = boot.bootstrap(BootstrapTrigger::launch()).await;
        assert!(matches!(
            outcome,
            SessionOutcome::Failed(BootstrapError::Fetch(_))
        ));
        assert_eq!(config.active().unwrap(), committed);
    }

    #[tokio::test]
    async fn empty_method_list_is_invalid_capabilities() {
        let mut boot = bootstrapper(
            FakeWab::Methods(vec![]),
            InMemorySnapshotStore::default(),
            AcceptSink,
        );

        let outcome = boot.bootstrap(BootstrapTrigger::launch()).await;
        assert!(matches!(
            outcome,
            SessionOutcome::Failed(BootstrapError::Config(ConfigError::InvalidCapabilities))
        ));
        assert!(boot.config.active().is_none());
    }

    #[tokio::test]
    async fn malformed_info_body_is_its_own_failure_kind() {
        let mut boot = bootstrapper(
            FakeWab::Malformed,
            InMemorySnapshotStore::default(),
            AcceptSink,
        );

        let outcome = boot.bootstrap(BootstrapTrigger::launch()).await;
        assert!(matches!(
            outcome,
            SessionOutcome::Failed(BootstrapError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn corrupt_snapshot_never_masquerades_as_enrollment() {
        let store = InMemorySnapshotStore::seeded(Snapshot::from_bytes(b"garbage".to_vec()));
        let mut boot = bootstrapper(FakeWab::Methods(vec!["phone"]), store, RejectSink);

        let outcome = boot.bootstrap(BootstrapTrigger::launch()).await;
        assert!(matches!(
            outcome,
            SessionOutcome::Failed(BootstrapError::SnapshotLoad(_))
        ));
    }

    #[tokio::test]
    async fn auth_context_failure_stops_before_snapshot_lookup() {
        let mut boot = bootstrapper(FakeWab::Methods(vec!["phone"]), FailingGateway, AcceptSink);

        let outcome = boot.bootstrap(BootstrapTrigger::launch()).await;
        assert!(matches!(
            outcome,
            SessionOutcome::Failed(BootstrapError::AuthContext(_))
        ));
        // Config was already committed; restoration failure does not roll
        // it back.
        assert!(boot.config.active().is_some());
    }

    #[tokio::test]
    async fn requested_method_overrides_selection_when_supported() {
        let mut boot = bootstrapper(
            FakeWab::Methods(vec!["phone", "email"]),
            InMemorySnapshotStore::default(),
            AcceptSink,
        );

        let outcome = boot
            .bootstrap(BootstrapTrigger::reconfigure().with_method("email"))
            .await;
        assert!(matches!(outcome, SessionOutcome::NeedsEnrollment));
        assert_eq!(boot.config.active().unwrap().method, "email");
    }

    #[tokio::test]
    async fn unsupported_requested_method_is_a_config_failure() {
        let mut boot = bootstrapper(
            FakeWab::Methods(vec!["phone"]),
            InMemorySnapshotStore::default(),
            AcceptSink,
        );

        let outcome = boot
            .bootstrap(BootstrapTrigger::reconfigure().with_method("email"))
            .await;
        assert!(matches!(
            outcome,
            SessionOutcome::Failed(BootstrapError::Config(ConfigError::UnsupportedMethod(_)))
        ));
    }

    #[tokio::test]
    async fn outcome_classification_is_idempotent() {
        let mut boot = bootstrapper(
            FakeWab::Methods(vec!["phone"]),
            InMemorySnapshotStore::default(),
            AcceptSink,
        );

        let first = boot.bootstrap(BootstrapTrigger::launch()).await;
        let second = boot.bootstrap(BootstrapTrigger::launch()).await;
        assert_eq!(first.kind(), second.kind());
    }

    #[tokio::test]
    async fn busy_flag_clears_on_every_exit_path() {
        let mut boot = bootstrapper(
            FakeWab::Status(500),
            InMemorySnapshotStore::default(),
            AcceptSink,
        );
        let status = boot.status();

        assert!(!status.busy());
        let _ = boot.bootstrap(BootstrapTrigger::launch()).await;
        assert!(!status.busy());
        assert_eq!(status.phase(), BootstrapPhase::Idle);

        let store = InMemorySnapshotStore::seeded(Snapshot::from_bytes(b"state".to_vec()));
        let mut boot = bootstrapper(FakeWab::Methods(vec!["phone"]), store, AcceptSink);
        let status = boot.status();

        let _ = boot.bootstrap(BootstrapTrigger::launch()).await;
        assert!(!status.busy());
        assert_eq!(status.phase(), BootstrapPhase::Idle);
    }
}
