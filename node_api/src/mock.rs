use core::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};
use std::{collections::HashMap, sync::Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::node_api::{Error, NodeRpc};

/// In-memory stand-in for the node, used by tests across the
/// workspace. Commands without a configured response answer 404, which
/// mirrors the node's behavior for absent sub-resources.
#[derive(Default)]
pub struct MockNode {
    responses: HashMap<String, String>,
    latency: Option<Duration>,
    rejecting: AtomicBool,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockNode {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn respond(mut self, command: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.insert(command.into(), body.into());
        self
    }

    /// Makes every call take this long, so tests can observe the
    /// concurrency bound.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Flips the rejecting flag, like `NodeApi::shutdown`.
    pub fn reject(&self) {
        self.rejecting.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("mock node call log mutex is poisoned")
            .clone()
    }

    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::Acquire)
    }

    async fn answer(&self, command: &str) -> Result<String> {
        if self.rejecting.load(Ordering::Acquire) {
            bail!(Error::Shutdown);
        }

        self.calls
            .lock()
            .expect("mock node call log mutex is poisoned")
            .push(command.to_owned());

        let in_flight = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::AcqRel);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::AcqRel);

        match self.responses.get(command) {
            Some(body) => Ok(body.clone()),
            None => bail!(Error::UnexpectedStatus {
                command: command.to_owned(),
                status: StatusCode::NOT_FOUND,
            }),
        }
    }
}

#[async_trait]
impl NodeRpc for MockNode {
    async fn get(&self, command: &str) -> Result<String> {
        self.answer(command).await
    }

    async fn post(&self, command: &str, _payload: Option<String>) -> Result<String> {
        self.answer(command).await
    }
}
