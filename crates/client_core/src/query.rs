use std::fmt;

use chrono::{DateTime, Utc};
use shared::{
    error::BackendError,
    protocol::{Action, AxonInfo, BackendReply},
};
use thiserror::Error;

/// Logical query names shared by every consumer of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    PendingActions,
    AllActions,
    Info,
}

impl QueryKey {
    pub const ALL: [QueryKey; 3] = [Self::PendingActions, Self::AllActions, Self::Info];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PendingActions => "pendingActions",
            Self::AllActions => "allActions",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Actions(Vec<Action>),
    Info(AxonInfo),
}

impl QueryData {
    pub fn actions(&self) -> Option<&[Action]> {
        match self {
            Self::Actions(actions) => Some(actions),
            Self::Info(_) => None,
        }
    }
}

/// Both ways a fetch can fail, flattened to one displayable reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Backend(BackendError),
}

pub fn normalize_reply<T>(reply: anyhow::Result<BackendReply<T>>) -> Result<T, QueryError> {
    match reply {
        Ok(reply) => reply.into_result().map_err(QueryError::Backend),
        Err(err) => Err(QueryError::Transport(format!("{err:#}"))),
    }
}

/// Point-in-time view of one query, with a placeholder standing in for data
/// that has not arrived yet.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub data: T,
    /// A fetch is in flight and nothing has been applied yet.
    pub is_loading: bool,
    pub is_fetching: bool,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> QueryResult<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryResult<U> {
        QueryResult {
            data: f(self.data),
            is_loading: self.is_loading,
            is_fetching: self.is_fetching,
            error: self.error,
            updated_at: self.updated_at,
        }
    }
}
