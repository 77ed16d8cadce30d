use std::{collections::HashSet, time::Duration};

use async_trait::async_trait;
use shared::{
    domain::ActionId,
    protocol::{Action, ActionFilter},
};
use tracing::{debug, info};

use crate::{
    backend::GovernanceBackend,
    poller::{FollowUp, PolledQuery, DEFAULT_EXECUTING_POLL_DELAY},
    query::{normalize_reply, QueryData, QueryError, QueryKey},
    ClientEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Nothing fetched yet in this context.
    Uninitialized,
    Idle,
    Executing,
}

/// Tracks whether any pending action is executing and derives the
/// executing-poll and cache-invalidation follow-ups from each snapshot.
#[derive(Debug, Clone)]
pub struct ExecutionTracker {
    state: ExecutionState,
    executing_poll_delay: Duration,
}

impl ExecutionTracker {
    pub fn new(executing_poll_delay: Duration) -> Self {
        Self {
            state: ExecutionState::Uninitialized,
            executing_poll_delay,
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn observe(&mut self, actions: &[Action]) -> Vec<FollowUp> {
        let any_executing = actions.iter().any(|action| action.status.is_executing());
        let previous = self.state;
        let mut follow_ups = Vec::new();

        if any_executing {
            self.state = ExecutionState::Executing;
            follow_ups.push(FollowUp::RefetchAfter(self.executing_poll_delay));
            if previous != ExecutionState::Executing {
                info!(
                    executing = actions.iter().filter(|a| a.status.is_executing()).count(),
                    "actions started executing"
                );
                follow_ups.push(FollowUp::Emit(ClientEvent::ExecutionStateChanged {
                    executing: true,
                }));
            }
        } else {
            self.state = ExecutionState::Idle;
            if previous == ExecutionState::Executing {
                info!("executing actions settled; refreshing all actions");
                follow_ups.push(FollowUp::Invalidate(QueryKey::AllActions));
                follow_ups.push(FollowUp::Emit(ClientEvent::ExecutionStateChanged {
                    executing: false,
                }));
            }
        }

        follow_ups
    }

    pub fn reset(&mut self) {
        self.state = ExecutionState::Uninitialized;
    }
}

/// Remembers the previous action list and reports whether a newly appeared
/// action is an Axon command.
#[derive(Debug, Clone, Default)]
pub struct NewActionDetector {
    previous: Option<Vec<ActionId>>,
}

impl NewActionDetector {
    pub fn observe(&mut self, actions: &[Action]) -> bool {
        let mut new_axon_command = false;
        if let Some(previous) = &self.previous {
            if actions.len() > previous.len() {
                let known: HashSet<ActionId> = previous.iter().copied().collect();
                let newcomers: Vec<&Action> = actions
                    .iter()
                    .filter(|action| !known.contains(&action.id))
                    .collect();
                new_axon_command = newcomers
                    .iter()
                    .any(|action| action.action.is_axon_command());
                debug!(
                    newcomers = newcomers.len(),
                    new_axon_command, "action list grew"
                );
            }
        }

        self.previous = Some(actions.iter().map(|action| action.id).collect());
        new_axon_command
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// In-flight actions; polls fast while any of them is executing.
pub struct PendingActionsQuery {
    tracker: ExecutionTracker,
}

impl PendingActionsQuery {
    pub fn new(executing_poll_delay: Duration) -> Self {
        Self {
            tracker: ExecutionTracker::new(executing_poll_delay),
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.tracker.state()
    }
}

impl Default for PendingActionsQuery {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTING_POLL_DELAY)
    }
}

#[async_trait]
impl PolledQuery for PendingActionsQuery {
    fn key(&self) -> QueryKey {
        QueryKey::PendingActions
    }

    async fn fetch(&self, backend: &dyn GovernanceBackend) -> Result<QueryData, QueryError> {
        normalize_reply(backend.get_pending_actions().await).map(QueryData::Actions)
    }

    fn on_data(&mut self, data: &QueryData) -> Vec<FollowUp> {
        data.actions()
            .map(|actions| self.tracker.observe(actions))
            .unwrap_or_default()
    }

    fn reset(&mut self) {
        self.tracker.reset();
    }
}

/// Full action history; refreshes the info query when new Axon commands show up.
#[derive(Default)]
pub struct AllActionsQuery {
    filter: Vec<ActionFilter>,
    detector: NewActionDetector,
}

impl AllActionsQuery {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolledQuery for AllActionsQuery {
    fn key(&self) -> QueryKey {
        QueryKey::AllActions
    }

    async fn fetch(&self, backend: &dyn GovernanceBackend) -> Result<QueryData, QueryError> {
        normalize_reply(backend.get_all_actions(self.filter.clone()).await)
            .map(QueryData::Actions)
    }

    fn on_data(&mut self, data: &QueryData) -> Vec<FollowUp> {
        match data.actions() {
            Some(actions) if self.detector.observe(actions) => {
                info!("new axon command observed; refreshing info");
                vec![FollowUp::Invalidate(QueryKey::Info)]
            }
            _ => Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.detector.reset();
    }
}

#[derive(Default)]
pub struct InfoQuery;

#[async_trait]
impl PolledQuery for InfoQuery {
    fn key(&self) -> QueryKey {
        QueryKey::Info
    }

    async fn fetch(&self, backend: &dyn GovernanceBackend) -> Result<QueryData, QueryError> {
        normalize_reply(backend.get_info().await).map(QueryData::Info)
    }
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
