use crate::core::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A scheduled job as exchanged between job store nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    /// Unix epoch milliseconds at which the job fires
    pub trigger_time_ms: i64,
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub meta: serde_json::Value,
}

impl Job {
    pub fn new(id: impl Into<String>, trigger_time_ms: i64) -> Self {
        Self {
            id: id.into(),
            trigger_time_ms,
            route: String::new(),
            meta: serde_json::Value::Null,
        }
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = meta;
        self
    }
}

/// Typed stub for the job store service of a remote node.
///
/// The connection manager hands these out bound to a live channel; tests
/// substitute in-memory implementations.
#[async_trait]
pub trait JobStoreClient: Send + Sync {
    /// Fetches a job, `None` when the remote has no such job.
    async fn get_job(&self, collection: &str, job_id: &str) -> Result<Option<Job>>;

    /// Creates or replaces a job.
    async fn set_job(&self, collection: &str, job: &Job) -> Result<()>;

    /// Deletes a job; deleting a missing job succeeds.
    async fn delete_job(&self, collection: &str, job_id: &str) -> Result<()>;
}
