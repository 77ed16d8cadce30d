use std::sync::Arc;

use shared::{
    domain::AxonId,
    protocol::{Action, AxonInfo},
};
use tokio::sync::{broadcast, watch};
use tracing::info;

pub mod actions;
pub mod backend;
pub mod cache;
pub mod debounce;
pub mod disburse_form;
pub mod modal;
pub mod poller;
pub mod proposal_options;
pub mod query;

pub use actions::{AllActionsQuery, ExecutionState, InfoQuery, PendingActionsQuery};
pub use backend::{
    GovernanceBackend, GovernanceContext, HttpGovernanceBackend, MissingGovernanceBackend,
};
pub use cache::QueryCache;
pub use disburse_form::{derive_disburse, DisburseForm, DisburseOutcome};
pub use poller::{ActiveContext, PollerConfig, PollerHandle};
pub use query::{QueryError, QueryKey, QueryResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    ContextChanged { axon_id: AxonId },
    QueryUpdated { key: QueryKey },
    QueryFailed { key: QueryKey, reason: String },
    ExecutionStateChanged { executing: bool },
}

/// Application root: owns the query cache, the current governance context
/// and the pollers that keep the action and info queries fresh.
pub struct AxonClient {
    cache: Arc<QueryCache>,
    context: watch::Sender<Option<ActiveContext>>,
    events: broadcast::Sender<ClientEvent>,
    pending_actions: PollerHandle,
    all_actions: PollerHandle,
    info: PollerHandle,
}

impl AxonClient {
    /// Spawns the pollers on the current tokio runtime. Nothing is fetched
    /// until a context is set with [`AxonClient::switch_context`].
    pub fn start(config: PollerConfig) -> Self {
        let cache = Arc::new(QueryCache::new());
        let (context, _) = watch::channel(None);
        let (events, _) = broadcast::channel(256);

        let pending_actions = poller::spawn_poller(
            PendingActionsQuery::new(config.executing_poll_delay),
            cache.clone(),
            context.subscribe(),
            events.clone(),
            config,
        );
        let all_actions = poller::spawn_poller(
            AllActionsQuery::new(),
            cache.clone(),
            context.subscribe(),
            events.clone(),
            config,
        );
        let info = poller::spawn_poller(
            InfoQuery,
            cache.clone(),
            context.subscribe(),
            events.clone(),
            config,
        );

        Self {
            cache,
            context,
            events,
            pending_actions,
            all_actions,
            info,
        }
    }

    /// Points every query at another Axon. Cached data from the previous one
    /// is dropped and its in-flight results are ignored when they land.
    pub async fn switch_context(&self, context: GovernanceContext) {
        let unchanged = self
            .context
            .borrow()
            .as_ref()
            .is_some_and(|current| current.context.axon_id == context.axon_id);
        if unchanged {
            return;
        }

        let axon_id = context.axon_id;
        let epoch = self.cache.reset_context().await;
        self.context.send_replace(Some(ActiveContext { epoch, context }));
        info!(axon_id = axon_id.0, epoch, "governance context switched");
        let _ = self.events.send(ClientEvent::ContextChanged { axon_id });
    }

    pub fn current_axon(&self) -> Option<AxonId> {
        self.context
            .borrow()
            .as_ref()
            .map(|active| active.context.axon_id)
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn pending_actions(&self) -> QueryResult<Vec<Action>> {
        self.cache.actions(QueryKey::PendingActions).await
    }

    pub async fn all_actions(&self) -> QueryResult<Vec<Action>> {
        self.cache.actions(QueryKey::AllActions).await
    }

    pub async fn info(&self) -> QueryResult<Option<AxonInfo>> {
        self.cache.info().await
    }

    pub fn poller(&self, key: QueryKey) -> &PollerHandle {
        match key {
            QueryKey::PendingActions => &self.pending_actions,
            QueryKey::AllActions => &self.all_actions,
            QueryKey::Info => &self.info,
        }
    }

    pub fn refetch(&self, key: QueryKey) {
        self.poller(key).refetch();
    }

    pub async fn shutdown(self) {
        self.pending_actions.shutdown().await;
        self.all_actions.shutdown().await;
        self.info.shutdown().await;
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
