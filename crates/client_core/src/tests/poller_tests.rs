use std::sync::Arc;

use shared::{
    domain::AxonId,
    error::{BackendError, ErrorCode},
    protocol::BackendReply,
};
use tokio::{
    sync::{broadcast, watch},
    time::sleep,
};

use super::*;
use crate::{
    actions::{AllActionsQuery, InfoQuery, PendingActionsQuery},
    backend::MissingGovernanceBackend,
    test_support::{executing, ok, sample_info, ScriptedBackend},
};

struct Harness {
    cache: Arc<QueryCache>,
    context: watch::Sender<Option<ActiveContext>>,
    events: broadcast::Receiver<ClientEvent>,
    handle: PollerHandle,
}

fn spawn_with<Q: PolledQuery>(query: Q, context: Option<GovernanceContext>) -> Harness {
    let cache = Arc::new(QueryCache::new());
    let context = context.map(|context| ActiveContext { epoch: 0, context });
    let (context_tx, context_rx) = watch::channel(context);
    let (events_tx, events) = broadcast::channel(64);
    let handle = spawn_poller(
        query,
        cache.clone(),
        context_rx,
        events_tx,
        PollerConfig::default(),
    );
    Harness {
        cache,
        context: context_tx,
        events,
        handle,
    }
}

fn scripted_context(backend: &Arc<ScriptedBackend>, axon_id: AxonId) -> GovernanceContext {
    GovernanceContext::new(axon_id, backend.clone())
}

fn drain(events: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

#[tokio::test(start_paused = true)]
async fn executing_action_triggers_one_fast_refetch_then_invalidates_all_actions() {
    let backend = Arc::new(ScriptedBackend::new(AxonId(1)));
    backend.script_pending(vec![ok(vec![executing(1)]), ok(vec![])]);
    let harness = spawn_with(
        PendingActionsQuery::default(),
        Some(scripted_context(&backend, AxonId(1))),
    );
    let all_actions = harness.cache.subscribe(QueryKey::AllActions);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.pending_calls(), 1);
    assert_eq!(*all_actions.borrow(), 0);

    sleep(Duration::from_millis(1_800)).await;
    assert_eq!(backend.pending_calls(), 1);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.pending_calls(), 2);
    assert_eq!(*all_actions.borrow(), 1);

    sleep(Duration::from_secs(28)).await;
    assert_eq!(backend.pending_calls(), 2);
    assert_eq!(*all_actions.borrow(), 1);

    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn keeps_polling_fast_while_an_action_stays_executing() {
    let backend = Arc::new(ScriptedBackend::new(AxonId(1)));
    backend.script_pending(vec![ok(vec![executing(7)])]);
    let harness = spawn_with(
        PendingActionsQuery::default(),
        Some(scripted_context(&backend, AxonId(1))),
    );
    let all_actions = harness.cache.subscribe(QueryKey::AllActions);

    sleep(Duration::from_millis(6_100)).await;
    assert_eq!(backend.pending_calls(), 4);
    assert_eq!(*all_actions.borrow(), 0);

    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn idle_query_waits_for_the_regular_interval() {
    let backend = Arc::new(ScriptedBackend::new(AxonId(1)));
    let harness = spawn_with(
        PendingActionsQuery::default(),
        Some(scripted_context(&backend, AxonId(1))),
    );

    sleep(Duration::from_secs(59)).await;
    assert_eq!(backend.pending_calls(), 1);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(backend.pending_calls(), 2);

    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn invalidation_refetches_once_per_burst() {
    let backend = Arc::new(ScriptedBackend::new(AxonId(1)));
    let harness = spawn_with(
        AllActionsQuery::new(),
        Some(scripted_context(&backend, AxonId(1))),
    );

    sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.all_calls(), 1);

    assert!(harness.cache.invalidate(QueryKey::AllActions));
    assert!(harness.cache.invalidate(QueryKey::AllActions));
    assert!(harness.cache.invalidate(QueryKey::AllActions));

    sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.all_calls(), 2);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(backend.all_calls(), 2);

    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn manual_refetch_fetches_immediately() {
    let backend = Arc::new(ScriptedBackend::new(AxonId(1)));
    let harness = spawn_with(InfoQuery, Some(scripted_context(&backend, AxonId(1))));

    sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.info_calls(), 1);

    harness.handle.refetch();
    harness.handle.refetch();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.info_calls(), 2);

    let result = harness.handle.result().await;
    assert_eq!(result.data, Some(QueryData::Info(sample_info(AxonId(1)))));

    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn transport_failure_is_normalized_to_its_message() {
    let mut harness = spawn_with(
        InfoQuery,
        Some(GovernanceContext::new(
            AxonId(1),
            Arc::new(MissingGovernanceBackend),
        )),
    );

    sleep(Duration::from_millis(100)).await;
    let result = harness.cache.info().await;
    assert!(result.data.is_none());
    assert_eq!(
        result.error.as_deref(),
        Some("governance backend is unavailable")
    );
    assert_eq!(
        drain(&mut harness.events),
        vec![ClientEvent::QueryFailed {
            key: QueryKey::Info,
            reason: "governance backend is unavailable".into(),
        }]
    );

    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn backend_error_is_normalized_and_keeps_previous_data() {
    let backend = Arc::new(ScriptedBackend::new(AxonId(9)));
    backend.script_info(vec![
        ok(sample_info(AxonId(9))),
        Ok(BackendReply::Err(BackendError::new(
            ErrorCode::NotFound,
            "axon 9",
        ))),
    ]);
    let harness = spawn_with(InfoQuery, Some(scripted_context(&backend, AxonId(9))));

    sleep(Duration::from_millis(100)).await;
    assert!(harness.cache.info().await.error.is_none());

    harness.handle.refetch();
    sleep(Duration::from_millis(100)).await;

    let result = harness.cache.info().await;
    assert_eq!(result.error.as_deref(), Some("Not found: axon 9"));
    assert_eq!(result.data, Some(sample_info(AxonId(9))));

    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn waits_for_a_context_before_fetching() {
    let backend = Arc::new(ScriptedBackend::new(AxonId(4)));
    let harness = spawn_with(InfoQuery, None);

    sleep(Duration::from_secs(1)).await;
    let result = harness.cache.info().await;
    assert!(result.data.is_none());
    assert!(!result.is_fetching);

    harness.context.send_replace(Some(ActiveContext {
        epoch: 0,
        context: scripted_context(&backend, AxonId(4)),
    }));
    sleep(Duration::from_millis(100)).await;

    assert_eq!(backend.info_calls(), 1);
    assert_eq!(
        harness.cache.info().await.data,
        Some(sample_info(AxonId(4)))
    );

    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn removed_entry_refills_on_next_fetch() {
    let backend = Arc::new(ScriptedBackend::new(AxonId(2)));
    let harness = spawn_with(InfoQuery, Some(scripted_context(&backend, AxonId(2))));

    sleep(Duration::from_millis(100)).await;
    harness.handle.remove().await;
    assert!(harness.cache.info().await.data.is_none());

    harness.handle.refetch();
    sleep(Duration::from_millis(100)).await;
    assert!(harness.cache.info().await.data.is_some());

    harness.handle.shutdown().await;
}
