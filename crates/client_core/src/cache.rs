use std::collections::HashMap;

use chrono::{DateTime, Utc};
use shared::protocol::{Action, AxonInfo};
use tokio::sync::{watch, RwLock};
use tracing::debug;

use crate::query::{QueryData, QueryError, QueryKey, QueryResult};

/// Issued by [`QueryCache::begin_fetch`]; a completion is only applied while
/// its epoch is current and no newer completion has landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: QueryKey,
    pub epoch: u64,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Stale,
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Default)]
struct CacheEntry {
    data: Option<QueryData>,
    error: Option<String>,
    last_issued: u64,
    last_settled: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn tombstone(seq: u64) -> Self {
        Self {
            last_issued: seq,
            last_settled: seq,
            ..Self::default()
        }
    }

    fn snapshot(&self) -> QueryResult<Option<QueryData>> {
        let is_fetching = self.last_issued > self.last_settled;
        QueryResult {
            data: self.data.clone(),
            is_loading: is_fetching && self.data.is_none(),
            is_fetching,
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    epoch: u64,
    seq: u64,
    entries: HashMap<QueryKey, CacheEntry>,
}

/// Query cache owned by the application root and shared by every poller.
///
/// Entries are scoped to the current governance context: [`reset_context`]
/// drops them all and bumps the epoch so in-flight fetches land as stale.
/// Pollers never write each other's entries; they only [`invalidate`] them.
///
/// [`reset_context`]: QueryCache::reset_context
/// [`invalidate`]: QueryCache::invalidate
pub struct QueryCache {
    state: RwLock<CacheState>,
    invalidations: HashMap<QueryKey, watch::Sender<u64>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        let invalidations = QueryKey::ALL
            .into_iter()
            .map(|key| (key, watch::channel(0u64).0))
            .collect();
        Self {
            state: RwLock::new(CacheState::default()),
            invalidations,
        }
    }

    pub async fn get(&self, key: QueryKey) -> QueryResult<Option<QueryData>> {
        let state = self.state.read().await;
        state
            .entries
            .get(&key)
            .map(CacheEntry::snapshot)
            .unwrap_or_else(|| CacheEntry::default().snapshot())
    }

    /// Action list for `key`, empty until the first fetch lands.
    pub async fn actions(&self, key: QueryKey) -> QueryResult<Vec<Action>> {
        self.get(key).await.map(|data| match data {
            Some(QueryData::Actions(actions)) => actions,
            _ => Vec::new(),
        })
    }

    pub async fn info(&self) -> QueryResult<Option<AxonInfo>> {
        self.get(QueryKey::Info).await.map(|data| match data {
            Some(QueryData::Info(info)) => Some(info),
            _ => None,
        })
    }

    /// Writes data directly, superseding any fetch already in flight.
    pub async fn set(&self, key: QueryKey, data: QueryData) {
        let mut state = self.state.write().await;
        state.seq += 1;
        let seq = state.seq;
        let entry = state.entries.entry(key).or_default();
        entry.data = Some(data);
        entry.error = None;
        entry.last_issued = entry.last_issued.max(seq);
        entry.last_settled = seq;
        entry.updated_at = Some(Utc::now());
    }

    /// Starts a fetch for the context installed under `epoch`. A ticket from
    /// an outdated epoch is still issued but leaves the entries untouched, and
    /// its completion lands as [`FetchOutcome::Stale`].
    pub async fn begin_fetch(&self, key: QueryKey, epoch: u64) -> FetchTicket {
        let mut state = self.state.write().await;
        state.seq += 1;
        let seq = state.seq;
        if epoch == state.epoch {
            state.entries.entry(key).or_default().last_issued = seq;
        } else {
            debug!(
                query = key.name(),
                ticket_epoch = epoch,
                current_epoch = state.epoch,
                "fetch started from an outdated context"
            );
        }
        FetchTicket { key, epoch, seq }
    }

    pub async fn complete_fetch(
        &self,
        ticket: FetchTicket,
        result: Result<QueryData, QueryError>,
    ) -> FetchOutcome {
        let mut state = self.state.write().await;
        if ticket.epoch != state.epoch {
            debug!(
                query = ticket.key.name(),
                ticket_epoch = ticket.epoch,
                current_epoch = state.epoch,
                "dropping fetch result from a previous context"
            );
            return FetchOutcome::Stale;
        }

        let entry = state.entries.entry(ticket.key).or_default();
        if ticket.seq <= entry.last_settled {
            debug!(
                query = ticket.key.name(),
                seq = ticket.seq,
                last_settled = entry.last_settled,
                "dropping out-of-order fetch result"
            );
            return FetchOutcome::Stale;
        }

        entry.last_settled = ticket.seq;
        match result {
            Ok(data) => {
                entry.data = Some(data);
                entry.error = None;
                entry.updated_at = Some(Utc::now());
            }
            // Previous data stays visible next to the error.
            Err(err) => entry.error = Some(err.to_string()),
        }
        FetchOutcome::Applied
    }

    /// Drops the entry; fetches already in flight for it become stale.
    pub async fn remove(&self, key: QueryKey) {
        let mut state = self.state.write().await;
        let seq = state.seq;
        state.entries.insert(key, CacheEntry::tombstone(seq));
    }

    /// Drops every entry and starts a new context epoch.
    pub async fn reset_context(&self) -> u64 {
        let mut state = self.state.write().await;
        state.epoch += 1;
        state.entries.clear();
        state.epoch
    }

    pub async fn epoch(&self) -> u64 {
        self.state.read().await.epoch
    }

    /// Invalidation generations for `key`; each change asks for a refetch.
    pub fn subscribe(&self, key: QueryKey) -> watch::Receiver<u64> {
        self.sender(key).subscribe()
    }

    /// Marks `key` stale. Repeated invalidations before the subscriber reacts
    /// coalesce into one refetch. Returns `false` when nobody is subscribed,
    /// in which case nothing happens.
    pub fn invalidate(&self, key: QueryKey) -> bool {
        let sender = self.sender(key);
        if sender.receiver_count() == 0 {
            debug!(query = key.name(), "invalidation without subscribers ignored");
            return false;
        }
        sender.send_modify(|generation| *generation += 1);
        debug!(query = key.name(), "query invalidated");
        true
    }

    fn sender(&self, key: QueryKey) -> &watch::Sender<u64> {
        // Populated for every key in `new`.
        &self.invalidations[&key]
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
