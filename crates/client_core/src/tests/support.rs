//! Scripted backend and action builders shared by the in-crate tests.

use std::{collections::VecDeque, sync::Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::{
    domain::{ActionId, AxonId},
    protocol::{
        Action, ActionFilter, ActionKind, ActionStatus, AxonCommand, AxonInfo, BackendReply,
        Command,
    },
};
use tokio::sync::Semaphore;

use crate::backend::GovernanceBackend;

/// `Err` is a transport failure.
pub(crate) type Scripted<T> = std::result::Result<BackendReply<T>, String>;

/// Replies in order; the last one repeats once the script runs out.
struct Script<T> {
    replies: VecDeque<Scripted<T>>,
    calls: usize,
}

impl<T: Clone> Script<T> {
    fn new(default: T) -> Self {
        Self {
            replies: VecDeque::from([Ok(BackendReply::Ok(default))]),
            calls: 0,
        }
    }

    fn next(&mut self) -> Result<BackendReply<T>> {
        self.calls += 1;
        let reply = if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        };
        match reply {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(reason)) => Err(anyhow!(reason)),
            None => Err(anyhow!("script exhausted")),
        }
    }
}

pub(crate) struct ScriptedBackend {
    pending: Mutex<Script<Vec<Action>>>,
    all: Mutex<Script<Vec<Action>>>,
    info: Mutex<Script<AxonInfo>>,
    gate: Option<Semaphore>,
}

impl ScriptedBackend {
    pub(crate) fn new(axon_id: AxonId) -> Self {
        Self {
            pending: Mutex::new(Script::new(Vec::new())),
            all: Mutex::new(Script::new(Vec::new())),
            info: Mutex::new(Script::new(sample_info(axon_id))),
            gate: None,
        }
    }

    /// Every call waits until [`ScriptedBackend::open_gate`] is called.
    pub(crate) fn gated(axon_id: AxonId) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(axon_id)
        }
    }

    pub(crate) fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub(crate) fn script_pending(&self, replies: Vec<Scripted<Vec<Action>>>) {
        self.pending.lock().expect("lock").replies = replies.into();
    }

    pub(crate) fn script_all(&self, replies: Vec<Scripted<Vec<Action>>>) {
        self.all.lock().expect("lock").replies = replies.into();
    }

    pub(crate) fn script_info(&self, replies: Vec<Scripted<AxonInfo>>) {
        self.info.lock().expect("lock").replies = replies.into();
    }

    pub(crate) fn pending_calls(&self) -> usize {
        self.pending.lock().expect("lock").calls
    }

    pub(crate) fn all_calls(&self) -> usize {
        self.all.lock().expect("lock").calls
    }

    pub(crate) fn info_calls(&self) -> usize {
        self.info.lock().expect("lock").calls
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate closed");
        }
    }
}

#[async_trait]
impl GovernanceBackend for ScriptedBackend {
    async fn get_pending_actions(&self) -> Result<BackendReply<Vec<Action>>> {
        self.pass_gate().await;
        self.pending.lock().expect("lock").next()
    }

    async fn get_all_actions(
        &self,
        _filter: Vec<ActionFilter>,
    ) -> Result<BackendReply<Vec<Action>>> {
        self.pass_gate().await;
        self.all.lock().expect("lock").next()
    }

    async fn get_info(&self) -> Result<BackendReply<AxonInfo>> {
        self.pass_gate().await;
        self.info.lock().expect("lock").next()
    }
}

pub(crate) fn ok<T>(value: T) -> Scripted<T> {
    Ok(BackendReply::Ok(value))
}

pub(crate) fn sample_info(axon_id: AxonId) -> AxonInfo {
    AxonInfo {
        id: axon_id,
        name: format!("axon-{}", axon_id.0),
        total_supply: 1_000,
        member_count: 3,
        neuron_count: 1,
    }
}

fn at(minute: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0)
        .single()
        .expect("valid timestamp")
}

fn action(id: u64, status: ActionStatus, kind: ActionKind) -> Action {
    Action {
        id: ActionId(id),
        creator: "aaaaa-aa".into(),
        time_created: at(0),
        status,
        action: kind,
    }
}

fn neuron_kind() -> ActionKind {
    ActionKind::NeuronCommand {
        neuron_ids: None,
        command: Command::StartDissolving,
    }
}

fn axon_kind() -> ActionKind {
    ActionKind::AxonCommand {
        command: AxonCommand::AddMember {
            principal: "bbbbb-bb".into(),
        },
    }
}

pub(crate) fn executing(id: u64) -> Action {
    action(id, ActionStatus::Executing { since: at(1) }, neuron_kind())
}

pub(crate) fn queued(id: u64) -> Action {
    action(id, ActionStatus::Queued { since: at(1) }, neuron_kind())
}

pub(crate) fn completed_neuron_command(id: u64) -> Action {
    action(id, ActionStatus::Completed { at: at(2) }, neuron_kind())
}

pub(crate) fn completed_axon_command(id: u64) -> Action {
    action(id, ActionStatus::Completed { at: at(2) }, axon_kind())
}
