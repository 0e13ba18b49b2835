//! In-process transport for tests and embedded clusters.
//!
//! Simulates the network by keeping one job table per registered address and
//! handing out channels whose state tests can flip.

use super::channel::{
    AtomicConnectivityState, ChannelDialer, ConnectivityState, DialedChannel, RpcChannel,
};
use super::client::{Job, JobStoreClient};
use super::config::ConnectionConfig;
use crate::core::{ClusterError, NodeId, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

type JobTable = HashMap<String, HashMap<String, Job>>;

/// One simulated node reachable at an address.
#[derive(Default)]
struct InMemoryEndpoint {
    jobs: RwLock<JobTable>,
    channels: Mutex<Vec<Arc<InMemoryChannel>>>,
    dials: AtomicUsize,
}

/// Registry of reachable in-memory addresses.
#[derive(Clone, Default)]
pub struct InMemoryNetwork {
    endpoints: Arc<Mutex<HashMap<String, Arc<InMemoryEndpoint>>>>,
}

impl InMemoryNetwork {
    /// Creates a new, empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `address` reachable. Registering twice keeps the existing jobs.
    pub fn register(&self, address: impl Into<String>) -> Result<()> {
        let address = address.into();
        if address.trim().is_empty() {
            return Err(ClusterError::Config(
                "address must not be empty".to_string(),
            ));
        }
        self.endpoints.lock()?.entry(address).or_default();
        Ok(())
    }

    /// Makes `address` unreachable for new dials and fails its open channels.
    pub fn unregister(&self, address: &str) -> Result<bool> {
        let removed = self.endpoints.lock()?.remove(address);
        match removed {
            Some(endpoint) => {
                for channel in endpoint.channels.lock()?.iter() {
                    channel.set_state(ConnectivityState::TransientFailure);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Forces the state of every channel dialed to `address`.
    pub fn set_link_state(&self, address: &str, state: ConnectivityState) -> Result<()> {
        let endpoint = self.endpoint(address)?;
        for channel in endpoint.channels.lock()?.iter() {
            channel.set_state(state);
        }
        Ok(())
    }

    /// Number of successful dials to `address`.
    pub fn dial_count(&self, address: &str) -> Result<usize> {
        Ok(self.endpoint(address)?.dials.load(Ordering::SeqCst))
    }

    /// Jobs currently stored at `address` in `collection`.
    pub fn jobs(&self, address: &str, collection: &str) -> Result<Vec<Job>> {
        let endpoint = self.endpoint(address)?;
        let jobs = endpoint.jobs.read()?;
        let mut listed = jobs
            .get(collection)
            .map(|table| table.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        listed.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listed)
    }

    fn endpoint(&self, address: &str) -> Result<Arc<InMemoryEndpoint>> {
        self.endpoints
            .lock()?
            .get(address)
            .cloned()
            .ok_or_else(|| {
                ClusterError::Config(format!("address '{}' is not registered", address))
            })
    }
}

/// Dialer over an [`InMemoryNetwork`].
///
/// Counts every dial attempt; an optional delay simulates slow handshakes.
pub struct InMemoryDialer {
    network: InMemoryNetwork,
    attempts: AtomicUsize,
    delay: Option<Duration>,
}

impl InMemoryDialer {
    pub fn new(network: InMemoryNetwork) -> Self {
        Self {
            network,
            attempts: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Dial attempts so far, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelDialer for InMemoryDialer {
    async fn dial(
        &self,
        node_id: &NodeId,
        address: &str,
        _config: &ConnectionConfig,
    ) -> Result<DialedChannel> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let endpoint = self
            .network
            .endpoint(address)
            .map_err(|_| ClusterError::Dial {
                node_id: node_id.clone(),
                address: address.to_string(),
                reason: "connection refused".to_string(),
            })?;

        let channel = Arc::new(InMemoryChannel {
            address: address.to_string(),
            state: AtomicConnectivityState::new(ConnectivityState::Ready),
        });
        endpoint.channels.lock()?.push(Arc::clone(&channel));
        endpoint.dials.fetch_add(1, Ordering::SeqCst);

        let client = Arc::new(InMemoryJobStoreClient {
            endpoint,
            channel: Arc::clone(&channel),
        });
        Ok(DialedChannel { channel, client })
    }
}

/// Channel whose state is driven by the test through [`InMemoryNetwork`].
#[derive(Debug)]
pub struct InMemoryChannel {
    address: String,
    state: AtomicConnectivityState,
}

impl InMemoryChannel {
    fn set_state(&self, state: ConnectivityState) {
        if state == ConnectivityState::Shutdown {
            self.state.shutdown();
        } else {
            self.state.transition(state);
        }
    }

    fn ensure_usable(&self) -> Result<()> {
        match self.state.load() {
            ConnectivityState::Ready | ConnectivityState::Idle => Ok(()),
            state => Err(ClusterError::Rpc(format!(
                "channel to {} is {}",
                self.address, state
            ))),
        }
    }
}

impl RpcChannel for InMemoryChannel {
    fn state(&self) -> ConnectivityState {
        self.state.load()
    }

    fn close(&self) {
        self.state.shutdown();
    }
}

/// Job store client operating directly on the endpoint's table.
struct InMemoryJobStoreClient {
    endpoint: Arc<InMemoryEndpoint>,
    channel: Arc<InMemoryChannel>,
}

#[async_trait]
impl JobStoreClient for InMemoryJobStoreClient {
    async fn get_job(&self, collection: &str, job_id: &str) -> Result<Option<Job>> {
        self.channel.ensure_usable()?;
        let jobs = self.endpoint.jobs.read()?;
        Ok(jobs
            .get(collection)
            .and_then(|table| table.get(job_id))
            .cloned())
    }

    async fn set_job(&self, collection: &str, job: &Job) -> Result<()> {
        self.channel.ensure_usable()?;
        let mut jobs = self.endpoint.jobs.write()?;
        jobs.entry(collection.to_string())
            .or_default()
            .insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn delete_job(&self, collection: &str, job_id: &str) -> Result<()> {
        self.channel.ensure_usable()?;
        let mut jobs = self.endpoint.jobs.write()?;
        if let Some(table) = jobs.get_mut(collection) {
            table.remove(job_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dial_unregistered_address_is_refused() {
        let dialer = InMemoryDialer::new(InMemoryNetwork::new());
        let result = dialer
            .dial(&NodeId::from("n1"), "mem:1", &ConnectionConfig::default())
            .await;

        assert!(matches!(result, Err(ClusterError::Dial { .. })));
        assert_eq!(dialer.attempts(), 1);
    }

    #[tokio::test]
    async fn test_client_reads_its_endpoint_jobs() {
        let network = InMemoryNetwork::new();
        network.register("mem:1").unwrap();
        let dialer = InMemoryDialer::new(network.clone());

        let dialed = dialer
            .dial(&NodeId::from("n1"), "mem:1", &ConnectionConfig::default())
            .await
            .unwrap();
        dialed
            .client
            .set_job("c", &Job::new("j1", 1_000))
            .await
            .unwrap();

        assert_eq!(network.jobs("mem:1", "c").unwrap().len(), 1);
        assert_eq!(network.dial_count("mem:1").unwrap(), 1);

        network
            .set_link_state("mem:1", ConnectivityState::TransientFailure)
            .unwrap();
        assert_eq!(
            dialed.channel.state(),
            ConnectivityState::TransientFailure
        );
        assert!(dialed.client.get_job("c", "j1").await.is_err());
    }

    #[tokio::test]
    async fn test_unregister_fails_open_channels() {
        let network = InMemoryNetwork::new();
        network.register("mem:1").unwrap();
        let dialer = InMemoryDialer::new(network.clone());
        let dialed = dialer
            .dial(&NodeId::from("n1"), "mem:1", &ConnectionConfig::default())
            .await
            .unwrap();

        assert!(network.unregister("mem:1").unwrap());
        assert!(!network.unregister("mem:1").unwrap());
        assert_eq!(
            dialed.channel.state(),
            ConnectivityState::TransientFailure
        );
    }
}
