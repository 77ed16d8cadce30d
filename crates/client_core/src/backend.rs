use std::{fmt, sync::Arc};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::AxonId,
    protocol::{Action, ActionFilter, AxonInfo, BackendReply},
};
use url::Url;

/// Remote governance canister as seen by the client.
///
/// An `Err` from any method is a transport failure (network, status, decode).
/// Failures the backend itself reports arrive as [`BackendReply::Err`].
#[async_trait]
pub trait GovernanceBackend: Send + Sync {
    async fn get_pending_actions(&self) -> Result<BackendReply<Vec<Action>>>;
    async fn get_all_actions(&self, filter: Vec<ActionFilter>)
        -> Result<BackendReply<Vec<Action>>>;
    async fn get_info(&self) -> Result<BackendReply<AxonInfo>>;
}

pub struct MissingGovernanceBackend;

#[async_trait]
impl GovernanceBackend for MissingGovernanceBackend {
    async fn get_pending_actions(&self) -> Result<BackendReply<Vec<Action>>> {
        Err(anyhow!("governance backend is unavailable"))
    }

    async fn get_all_actions(
        &self,
        _filter: Vec<ActionFilter>,
    ) -> Result<BackendReply<Vec<Action>>> {
        Err(anyhow!("governance backend is unavailable"))
    }

    async fn get_info(&self) -> Result<BackendReply<AxonInfo>> {
        Err(anyhow!("governance backend is unavailable"))
    }
}

/// The Axon a session is currently looking at, together with the backend
/// handle bound to it. Switching context means switching this value.
#[derive(Clone)]
pub struct GovernanceContext {
    pub axon_id: AxonId,
    pub backend: Arc<dyn GovernanceBackend>,
}

impl GovernanceContext {
    pub fn new(axon_id: AxonId, backend: Arc<dyn GovernanceBackend>) -> Self {
        Self { axon_id, backend }
    }

    pub fn http(base_url: &str, axon_id: AxonId) -> Result<Self> {
        let backend = HttpGovernanceBackend::new(base_url, axon_id)?;
        Ok(Self::new(axon_id, Arc::new(backend)))
    }
}

impl fmt::Debug for GovernanceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GovernanceContext")
            .field("axon_id", &self.axon_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct AllActionsRequest {
    filter: Vec<ActionFilter>,
}

pub struct HttpGovernanceBackend {
    http: Client,
    axon_url: Url,
}

impl HttpGovernanceBackend {
    pub fn new(base_url: &str, axon_id: AxonId) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .with_context(|| format!("invalid governance backend url '{base_url}'"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let axon_url = base
            .join(&format!("axons/{}/", axon_id.0))
            .context("failed to build axon url")?;

        Ok(Self {
            http: Client::new(),
            axon_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.axon_url
            .join(path)
            .with_context(|| format!("failed to build url for '{path}'"))
    }

    async fn decode<T: DeserializeOwned>(
        res: reqwest::Response,
        what: &str,
    ) -> Result<BackendReply<T>> {
        let res = res
            .error_for_status()
            .with_context(|| format!("{what} request rejected"))?;
        res.json()
            .await
            .with_context(|| format!("failed to decode {what} reply"))
    }
}

#[async_trait]
impl GovernanceBackend for HttpGovernanceBackend {
    async fn get_pending_actions(&self) -> Result<BackendReply<Vec<Action>>> {
        let res = self
            .http
            .get(self.endpoint("pending_actions")?)
            .send()
            .await
            .context("failed to request pending actions")?;
        Self::decode(res, "pending actions").await
    }

    async fn get_all_actions(
        &self,
        filter: Vec<ActionFilter>,
    ) -> Result<BackendReply<Vec<Action>>> {
        let res = self
            .http
            .post(self.endpoint("actions")?)
            .json(&AllActionsRequest { filter })
            .send()
            .await
            .context("failed to request actions")?;
        Self::decode(res, "actions").await
    }

    async fn get_info(&self) -> Result<BackendReply<AxonInfo>> {
        let res = self
            .http
            .get(self.endpoint("info")?)
            .send()
            .await
            .context("failed to request axon info")?;
        Self::decode(res, "axon info").await
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
