//! Job store RPC over HTTP/2.
//!
//! One `reqwest::Client` per node multiplexes every call over a single
//! connection. Channel state is tracked from call outcomes, so reading it never
//! touches the network.

use super::channel::{
    AtomicConnectivityState, ChannelDialer, ConnectivityState, DialedChannel, RpcChannel,
};
use super::client::{Job, JobStoreClient};
use super::config::ConnectionConfig;
use crate::core::{ClusterError, NodeId, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Dials nodes over plain-text HTTP/2.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpDialer;

#[async_trait]
impl ChannelDialer for HttpDialer {
    async fn dial(
        &self,
        node_id: &NodeId,
        address: &str,
        config: &ConnectionConfig,
    ) -> Result<DialedChannel> {
        let dial_error = |reason: String| ClusterError::Dial {
            node_id: node_id.clone(),
            address: address.to_string(),
            reason,
        };

        let authority = authority_of(address);
        let base_url = Url::parse(&format!("http://{}/", authority))
            .map_err(|e| dial_error(format!("invalid address: {}", e)))?;

        // Block until the node accepts connections, like a blocking gRPC dial.
        TcpStream::connect(authority)
            .await
            .map_err(|e| dial_error(e.to_string()))?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.dial_timeout)
            .timeout(config.rpc_timeout);
        if config.http2_prior_knowledge {
            builder = builder.http2_prior_knowledge();
        }
        let http = builder.build().map_err(|e| dial_error(e.to_string()))?;

        debug!(node_id = %node_id, address, "http channel established");

        let channel = Arc::new(HttpChannel::new(address, config.idle_timeout));
        let client = Arc::new(HttpJobStoreClient {
            http,
            base_url,
            channel: Arc::clone(&channel),
        });
        Ok(DialedChannel { channel, client })
    }
}

/// Strips an optional `http://` scheme and trailing slashes.
fn authority_of(address: &str) -> &str {
    address
        .strip_prefix("http://")
        .unwrap_or(address)
        .trim_end_matches('/')
}

/// Connectivity bookkeeping for one HTTP/2 node connection.
#[derive(Debug)]
pub struct HttpChannel {
    address: String,
    state: AtomicConnectivityState,
    opened_at: Instant,
    last_activity_ms: AtomicU64,
    idle_timeout: Option<Duration>,
}

impl HttpChannel {
    fn new(address: &str, idle_timeout: Option<Duration>) -> Self {
        Self {
            address: address.to_string(),
            state: AtomicConnectivityState::new(ConnectivityState::Ready),
            opened_at: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            idle_timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn elapsed_ms(&self) -> u64 {
        self.opened_at.elapsed().as_millis() as u64
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.load() == ConnectivityState::Shutdown {
            return Err(ClusterError::Rpc(format!(
                "channel to {} is shut down",
                self.address
            )));
        }
        Ok(())
    }

    fn record_success(&self) {
        self.last_activity_ms
            .store(self.elapsed_ms(), Ordering::Release);
        self.state.transition(ConnectivityState::Ready);
    }

    fn record_failure(&self) {
        self.state.transition(ConnectivityState::TransientFailure);
    }
}

impl RpcChannel for HttpChannel {
    fn state(&self) -> ConnectivityState {
        let state = self.state.load();
        if state != ConnectivityState::Ready {
            return state;
        }
        match self.idle_timeout {
            Some(idle) => {
                let quiet_ms = self
                    .elapsed_ms()
                    .saturating_sub(self.last_activity_ms.load(Ordering::Acquire));
                if quiet_ms >= idle.as_millis() as u64 {
                    ConnectivityState::Idle
                } else {
                    ConnectivityState::Ready
                }
            }
            None => ConnectivityState::Ready,
        }
    }

    fn close(&self) {
        self.state.shutdown();
    }
}

/// Job store client issuing JSON calls to `/v1/collections/{collection}/jobs/{id}`.
pub struct HttpJobStoreClient {
    http: reqwest::Client,
    base_url: Url,
    channel: Arc<HttpChannel>,
}

impl HttpJobStoreClient {
    fn job_url(&self, collection: &str, job_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClusterError::Rpc(format!("cannot build job url on {}", self.base_url)))?
            .clear()
            .extend(["v1", "collections", collection, "jobs", job_id]);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.channel.ensure_open()?;
        match request.send().await {
            Ok(response) => {
                self.channel.record_success();
                Ok(response)
            }
            Err(err) => {
                self.channel.record_failure();
                warn!(address = %self.channel.address, error = %err, "job store rpc failed");
                Err(ClusterError::Rpc(err.to_string()))
            }
        }
    }

    fn status_error(&self, call: &str, status: StatusCode) -> ClusterError {
        ClusterError::Rpc(format!(
            "{} failed: node={} status={}",
            call, self.channel.address, status
        ))
    }
}

#[async_trait]
impl JobStoreClient for HttpJobStoreClient {
    async fn get_job(&self, collection: &str, job_id: &str) -> Result<Option<Job>> {
        let url = self.job_url(collection, job_id)?;
        let response = self.send(self.http.get(url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(self.status_error("get_job", response.status()));
        }

        response
            .json::<Job>()
            .await
            .map(Some)
            .map_err(|e| ClusterError::Rpc(e.to_string()))
    }

    async fn set_job(&self, collection: &str, job: &Job) -> Result<()> {
        let url = self.job_url(collection, &job.id)?;
        let response = self.send(self.http.put(url).json(job)).await?;

        if !response.status().is_success() {
            return Err(self.status_error("set_job", response.status()));
        }
        Ok(())
    }

    async fn delete_job(&self, collection: &str, job_id: &str) -> Result<()> {
        let url = self.job_url(collection, job_id)?;
        let response = self.send(self.http.delete(url)).await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(self.status_error("delete_job", status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authority_of() {
        assert_eq!(authority_of("127.0.0.1:7001"), "127.0.0.1:7001");
        assert_eq!(authority_of("http://node-a:7001/"), "node-a:7001");
    }

    #[test]
    fn test_channel_goes_idle_and_recovers() {
        let channel = HttpChannel::new("127.0.0.1:1", Some(Duration::from_millis(20)));
        assert_eq!(channel.state(), ConnectivityState::Ready);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(channel.state(), ConnectivityState::Idle);

        channel.record_success();
        assert_eq!(channel.state(), ConnectivityState::Ready);
    }

    #[test]
    fn test_channel_failure_and_shutdown() {
        let channel = HttpChannel::new("127.0.0.1:1", None);
        channel.record_failure();
        assert_eq!(channel.state(), ConnectivityState::TransientFailure);

        channel.record_success();
        assert_eq!(channel.state(), ConnectivityState::Ready);

        channel.close();
        channel.record_success();
        assert_eq!(channel.state(), ConnectivityState::Shutdown);
        assert!(channel.ensure_open().is_err());
    }

    #[test]
    fn test_job_url_escapes_segments() {
        let client = HttpJobStoreClient {
            http: reqwest::Client::new(),
            base_url: Url::parse("http://127.0.0.1:7001/").unwrap(),
            channel: Arc::new(HttpChannel::new("127.0.0.1:7001", None)),
        };

        let url = client.job_url("billing", "job/1").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:7001/v1/collections/billing/jobs/job%2F1"
        );
    }
}
