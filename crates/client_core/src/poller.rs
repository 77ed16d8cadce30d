use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    backend::{GovernanceBackend, GovernanceContext},
    cache::QueryCache,
    query::{QueryData, QueryError, QueryKey, QueryResult},
    ClientEvent,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_EXECUTING_POLL_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Regular refetch cadence.
    pub interval: Duration,
    /// Extra refetch delay while any action is executing.
    pub executing_poll_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            executing_poll_delay: DEFAULT_EXECUTING_POLL_DELAY,
        }
    }
}

/// Governance context as published to the pollers, paired with the cache
/// epoch it was installed under. Fetches are ticketed with this epoch, so a
/// fetch that started from an older snapshot always lands as stale.
#[derive(Debug, Clone)]
pub struct ActiveContext {
    pub epoch: u64,
    pub context: GovernanceContext,
}

/// Work a query asks for after fresh data has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    /// Refetch this query once after the delay, replacing any earlier request.
    RefetchAfter(Duration),
    Invalidate(QueryKey),
    Emit(ClientEvent),
}

/// What a poller fetches and how it reacts to new data.
#[async_trait]
pub trait PolledQuery: Send + 'static {
    fn key(&self) -> QueryKey;

    async fn fetch(&self, backend: &dyn GovernanceBackend) -> Result<QueryData, QueryError>;

    fn on_data(&mut self, _data: &QueryData) -> Vec<FollowUp> {
        Vec::new()
    }

    /// Forget derived state; called when the governance context changes.
    fn reset(&mut self) {}
}

pub struct PollerHandle {
    key: QueryKey,
    cache: Arc<QueryCache>,
    refetch: mpsc::UnboundedSender<()>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn key(&self) -> QueryKey {
        self.key
    }

    /// Fetch now, outside the regular cadence.
    pub fn refetch(&self) {
        let _ = self.refetch.send(());
    }

    pub async fn result(&self) -> QueryResult<Option<QueryData>> {
        self.cache.get(self.key).await
    }

    pub async fn remove(&self) {
        self.cache.remove(self.key).await;
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

pub fn spawn_poller<Q: PolledQuery>(
    query: Q,
    cache: Arc<QueryCache>,
    context: watch::Receiver<Option<ActiveContext>>,
    events: broadcast::Sender<ClientEvent>,
    config: PollerConfig,
) -> PollerHandle {
    let key = query.key();
    let (refetch_tx, refetch_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let invalidations = cache.subscribe(key);

    let task = tokio::spawn(run_poller(
        query,
        cache.clone(),
        context,
        invalidations,
        refetch_rx,
        shutdown_rx,
        events,
        config,
    ));

    PollerHandle {
        key,
        cache,
        refetch: refetch_tx,
        shutdown: Some(shutdown_tx),
        task,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_poller<Q: PolledQuery>(
    mut query: Q,
    cache: Arc<QueryCache>,
    mut context: watch::Receiver<Option<ActiveContext>>,
    mut invalidations: watch::Receiver<u64>,
    mut refetch_rx: mpsc::UnboundedReceiver<()>,
    mut shutdown_rx: oneshot::Receiver<()>,
    events: broadcast::Sender<ClientEvent>,
    config: PollerConfig,
) {
    let key = query.key();
    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut follow_up: Option<Instant> = None;
    info!(query = key.name(), interval_secs = config.interval.as_secs(), "poller started");

    loop {
        let follow_up_at = follow_up;
        tokio::select! {
            _ = &mut shutdown_rx => break,
            changed = context.changed() => {
                if changed.is_err() {
                    break;
                }
                query.reset();
                follow_up = None;
                interval.reset();
                debug!(query = key.name(), "governance context changed");
            }
            _ = interval.tick() => {}
            Some(()) = refetch_rx.recv() => {
                debug!(query = key.name(), "manual refetch");
            }
            changed = invalidations.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!(query = key.name(), "refetching after invalidation");
            }
            _ = tokio::time::sleep_until(follow_up_at.unwrap_or_else(Instant::now)), if follow_up_at.is_some() => {
                follow_up = None;
                debug!(query = key.name(), "follow-up refetch");
            }
        }

        // Requests queued while we were waiting are served by this fetch.
        while refetch_rx.try_recv().is_ok() {}
        if context.has_changed().unwrap_or(false) {
            query.reset();
            follow_up = None;
        }
        let Some(active) = context.borrow_and_update().clone() else {
            debug!(query = key.name(), "no governance context; skipping fetch");
            continue;
        };
        let ctx = active.context;

        let ticket = cache.begin_fetch(key, active.epoch).await;
        let result = tokio::select! {
            _ = &mut shutdown_rx => break,
            result = query.fetch(ctx.backend.as_ref()) => result,
        };

        match result {
            Ok(data) => {
                if !cache.complete_fetch(ticket, Ok(data.clone())).await.is_applied() {
                    continue;
                }
                follow_up = None;
                for action in query.on_data(&data) {
                    match action {
                        FollowUp::RefetchAfter(delay) => {
                            follow_up = Some(Instant::now() + delay);
                        }
                        FollowUp::Invalidate(target) => {
                            cache.invalidate(target);
                        }
                        FollowUp::Emit(event) => {
                            let _ = events.send(event);
                        }
                    }
                }
                let _ = events.send(ClientEvent::QueryUpdated { key });
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(query = key.name(), axon_id = ctx.axon_id.0, %reason, "query failed");
                if cache.complete_fetch(ticket, Err(err)).await.is_applied() {
                    let _ = events.send(ClientEvent::QueryFailed { key, reason });
                }
            }
        }
    }

    info!(query = key.name(), "poller stopped");
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
