use core::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use thiserror::Error as ThisError;
use url::Url;

const DEFAULT_GET_RESPONSE_ENTITY_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_POST_RESPONSE_ENTITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("transport failure for {command}")]
    Transport {
        command: String,
        source: reqwest::Error,
    },
    #[error("response body for {command} did not arrive within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("node gateway is rejecting new requests")]
    Shutdown,
    #[error("node returned status {status} for {command}")]
    UnexpectedStatus {
        command: String,
        status: StatusCode,
    },
}

impl Error {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::UnexpectedStatus { status, .. } => *status == StatusCode::NOT_FOUND,
            _ => false,
        }
    }
}

/// The capability the fetchers consume: two operations over JSON
/// strings, nothing more.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn get(&self, command: &str) -> Result<String>;

    async fn post(&self, command: &str, payload: Option<String>) -> Result<String>;
}

#[async_trait]
impl<N: NodeRpc> NodeRpc for &N {
    async fn get(&self, command: &str) -> Result<String> {
        (*self).get(command).await
    }

    async fn post(&self, command: &str, payload: Option<String>) -> Result<String> {
        (*self).post(command, payload).await
    }
}

#[async_trait]
impl<N: NodeRpc> NodeRpc for std::sync::Arc<N> {
    async fn get(&self, command: &str) -> Result<String> {
        self.as_ref().get(command).await
    }

    async fn post(&self, command: &str, payload: Option<String>) -> Result<String> {
        self.as_ref().post(command, payload).await
    }
}

pub struct NodeConnection {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub path_prefix: String,
    pub get_response_entity_timeout: Duration,
    pub post_response_entity_timeout: Duration,
}

impl Default for NodeConnection {
    fn default() -> Self {
        Self {
            protocol: "http".to_owned(),
            host: "localhost".to_owned(),
            port: 8732,
            path_prefix: String::new(),
            get_response_entity_timeout: DEFAULT_GET_RESPONSE_ENTITY_TIMEOUT,
            post_response_entity_timeout: DEFAULT_POST_RESPONSE_ENTITY_TIMEOUT,
        }
    }
}

impl NodeConnection {
    fn command_url(&self, command: &str) -> Result<Url> {
        let Self {
            protocol,
            host,
            port,
            path_prefix,
            ..
        } = self;

        format!("{protocol}://{host}:{port}/{path_prefix}chains/main/{command}")
            .parse()
            .with_context(|| format!("failed to build URL for command {command}"))
    }
}

/// Production gateway to the node. The rejecting flag is the only piece
/// of shared mutable state; once flipped, every subsequent call fails
/// with [`Error::Shutdown`] without touching the network.
pub struct NodeApi {
    client: Client,
    connection: NodeConnection,
    rejecting: AtomicBool,
}

impl NodeApi {
    #[must_use]
    pub fn new(connection: NodeConnection, client: Client) -> Self {
        Self {
            client,
            connection,
            rejecting: AtomicBool::new(false),
        }
    }

    /// Starts rejecting new calls. In-flight requests complete or time
    /// out naturally; pooled connections close when the client drops.
    /// Returns whether this call performed the transition.
    pub fn shutdown(&self) -> bool {
        let transitioned = self
            .rejecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if transitioned {
            debug!("node gateway now rejecting new requests");
        }

        transitioned
    }

    #[must_use]
    pub fn is_rejecting(&self) -> bool {
        self.rejecting.load(Ordering::Acquire)
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.is_rejecting() {
            bail!(Error::Shutdown);
        }

        Ok(())
    }

    async fn execute(
        &self,
        command: &str,
        request: RequestBuilder,
        entity_timeout: Duration,
    ) -> Result<String> {
        let response = request.send().await.map_err(|source| Error::Transport {
            command: command.to_owned(),
            source,
        })?;

        let status = response.status();

        if !status.is_success() {
            bail!(Error::UnexpectedStatus {
                command: command.to_owned(),
                status,
            });
        }

        let body = tokio::time::timeout(entity_timeout, response.text())
            .await
            .map_err(|_elapsed| Error::Timeout {
                command: command.to_owned(),
                timeout: entity_timeout,
            })?
            .map_err(|source| Error::Transport {
                command: command.to_owned(),
                source,
            })?;

        Ok(sanitize(&body))
    }
}

#[async_trait]
impl NodeRpc for NodeApi {
    async fn get(&self, command: &str) -> Result<String> {
        self.ensure_accepting()?;

        let url = self.connection.command_url(command)?;
        let request = self.client.get(url);

        self.execute(command, request, self.connection.get_response_entity_timeout)
            .await
    }

    async fn post(&self, command: &str, payload: Option<String>) -> Result<String> {
        self.ensure_accepting()?;

        let url = self.connection.command_url(command)?;
        let mut request = self.client.post(url);

        if let Some(payload) = payload {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload);
        }

        self.execute(
            command,
            request,
            self.connection.post_response_entity_timeout,
        )
        .await
    }
}

// The node occasionally embeds raw control characters in script
// annotations, which breaks downstream JSON parsing.
fn sanitize(body: &str) -> String {
    body.chars()
        .filter(|character| !character.is_ascii_control())
        .collect()
}

#[cfg(test)]
mod tests {
    use httpmock::{Method, MockServer};

    use super::*;

    fn connection_to(server: &MockServer) -> NodeConnection {
        NodeConnection {
            host: server.host(),
            port: server.port(),
            ..NodeConnection::default()
        }
    }

    #[tokio::test]
    async fn get_returns_sanitized_body() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::GET).path("/chains/main/blocks/head");
            then.status(200).body("{\"hash\":\u{1} \"BMa\"}");
        });

        let api = NodeApi::new(connection_to(&server), Client::new());

        assert_eq!(api.get("blocks/head").await?, "{\"hash\": \"BMa\"}");

        Ok(())
    }

    #[tokio::test]
    async fn missing_resource_surfaces_as_not_found() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::GET);
            then.status(404).body("not found");
        });

        let api = NodeApi::new(connection_to(&server), Client::new());

        let error = api
            .get("blocks/head/operations")
            .await
            .expect_err("a 404 should fail the call")
            .downcast::<Error>()?;

        assert!(error.is_not_found());

        Ok(())
    }

    #[tokio::test]
    async fn post_sends_payload_with_json_content_type() -> Result<()> {
        let server = MockServer::start();

        let mock = server.mock(|when, then| {
            when.method(Method::POST)
                .path("/chains/main/injection/operation")
                .header("content-type", "application/json")
                .body("\"deadbeef\"");
            then.status(200).body("\"ooYfbD\"");
        });

        let api = NodeApi::new(connection_to(&server), Client::new());

        let response = api
            .post("injection/operation", Some("\"deadbeef\"".to_owned()))
            .await?;

        mock.assert();
        assert_eq!(response, "\"ooYfbD\"");

        Ok(())
    }

    #[tokio::test]
    async fn shutdown_rejects_without_touching_the_network() -> Result<()> {
        let server = MockServer::start();

        let mock = server.mock(|when, then| {
            when.method(Method::GET);
            then.status(200).body("{}");
        });

        let api = NodeApi::new(connection_to(&server), Client::new());

        assert!(api.shutdown(), "first shutdown performs the transition");
        assert!(!api.shutdown(), "second shutdown is a no-op");

        let error = api
            .get("blocks/head")
            .await
            .expect_err("calls after shutdown should fail")
            .downcast::<Error>()?;

        assert!(matches!(error, Error::Shutdown));
        assert_eq!(mock.hits(), 0);

        Ok(())
    }
}
