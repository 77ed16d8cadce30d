use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{AccountId, ActionId, AxonId, NeuronId, TokenAmount},
    error::BackendError,
};

/// Minimum proposal duration the options panel declares.
pub const FOUR_HOUR_SEC: u64 = 4 * 60 * 60;

/// Reply envelope of every backend call: `{"ok": ..}` or `{"err": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendReply<T> {
    Ok(T),
    Err(BackendError),
}

impl<T> BackendReply<T> {
    pub fn into_result(self) -> Result<T, BackendError> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Err(err) => Err(err),
        }
    }
}

impl<T> From<Result<T, BackendError>> for BackendReply<T> {
    fn from(value: Result<T, BackendError>) -> Self {
        match value {
            Ok(value) => Self::Ok(value),
            Err(err) => Self::Err(err),
        }
    }
}

/// Filter entry forwarded untouched to `get_all_actions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionFilter(pub serde_json::Value);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ActionStatus {
    Pending { since: DateTime<Utc> },
    Queued { since: DateTime<Utc> },
    Executing { since: DateTime<Utc> },
    Completed { at: DateTime<Utc> },
    ExecutionFailed { at: DateTime<Utc>, reason: String },
    Cancelled { at: DateTime<Utc> },
    Expired { at: DateTime<Utc> },
    Rejected { at: DateTime<Utc> },
}

impl ActionStatus {
    pub fn is_executing(&self) -> bool {
        matches!(self, Self::Executing { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. }
                | Self::ExecutionFailed { .. }
                | Self::Cancelled { .. }
                | Self::Expired { .. }
                | Self::Rejected { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "pending",
            Self::Queued { .. } => "queued",
            Self::Executing { .. } => "executing",
            Self::Completed { .. } => "completed",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::Cancelled { .. } => "cancelled",
            Self::Expired { .. } => "expired",
            Self::Rejected { .. } => "rejected",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disburse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_account: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<TokenAmount>,
}

/// Neuron command an action executes against the governance ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Command {
    Disburse(Disburse),
    Spawn {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_controller: Option<String>,
    },
    Split {
        amount: TokenAmount,
    },
    StartDissolving,
    StopDissolving,
}

/// Command an action executes against the Axon itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum AxonCommand {
    AddMember { principal: String },
    RemoveMember { principal: String },
    Mint { recipient: String, amount: u64 },
    Transfer { recipient: String, amount: u64 },
    Redenominate { from: u64, to: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ActionKind {
    AxonCommand {
        command: AxonCommand,
    },
    NeuronCommand {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        neuron_ids: Option<Vec<NeuronId>>,
        command: Command,
    },
}

impl ActionKind {
    pub fn is_axon_command(&self) -> bool {
        matches!(self, Self::AxonCommand { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub creator: String,
    pub time_created: DateTime<Utc>,
    pub status: ActionStatus,
    pub action: ActionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxonInfo {
    pub id: AxonId,
    pub name: String,
    pub total_supply: u64,
    pub member_count: u32,
    pub neuron_count: u32,
}

/// Raw proposal settings exactly as the options inputs hold them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalOptions {
    pub time_start: String,
    pub duration_seconds: String,
    pub execute: bool,
}

impl Default for ProposalOptions {
    fn default() -> Self {
        Self {
            time_start: String::new(),
            duration_seconds: String::new(),
            execute: true,
        }
    }
}

impl ProposalOptions {
    /// Start time in epoch seconds, `None` when blank or not a whole number.
    pub fn time_start_secs(&self) -> Option<u64> {
        parse_optional_secs(&self.time_start)
    }

    pub fn duration_secs(&self) -> Option<u64> {
        parse_optional_secs(&self.duration_seconds)
    }

    /// Whether filled-in numeric fields respect the inputs' declared minimums.
    pub fn meets_declared_minimums(&self) -> bool {
        let duration_ok = self.duration_seconds.trim().is_empty()
            || self.duration_secs().is_some_and(|d| d >= FOUR_HOUR_SEC);
        let start_ok = self.time_start.trim().is_empty() || self.time_start_secs().is_some();
        duration_ok && start_ok
    }
}

fn parse_optional_secs(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
