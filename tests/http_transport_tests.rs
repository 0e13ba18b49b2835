use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tmcluster::{ClusterError, ConnectionConfig, ConnectionManager, ConnectivityState, Job};
use tokio::net::TcpListener;

type Store = Arc<Mutex<HashMap<(String, String), Job>>>;

async fn get_job(
    State(store): State<Store>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Job>, StatusCode> {
    let store = store.lock().unwrap();
    store
        .get(&(collection, id))
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn put_job(
    State(store): State<Store>,
    Path((collection, id)): Path<(String, String)>,
    Json(job): Json<Job>,
) -> StatusCode {
    if job.id != id {
        return StatusCode::BAD_REQUEST;
    }
    store.lock().unwrap().insert((collection, id), job);
    StatusCode::NO_CONTENT
}

async fn delete_job(
    State(store): State<Store>,
    Path((collection, id)): Path<(String, String)>,
) -> StatusCode {
    match store.lock().unwrap().remove(&(collection, id)) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// Starts a job store node on an ephemeral port and returns its address.
async fn spawn_job_store() -> (String, Store) {
    let store: Store = Arc::new(Mutex::new(HashMap::new()));
    let app = Router::new()
        .route(
            "/v1/collections/:collection/jobs/:id",
            get(get_job).put(put_job).delete(delete_job),
        )
        .with_state(store.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (address, store)
}

#[tokio::test]
async fn jobs_round_trip_over_http2() {
    let (address, store) = spawn_job_store().await;
    let manager = ConnectionManager::with_http(ConnectionConfig::default()).unwrap();

    manager.add("node-a", address.as_str()).await.unwrap();
    assert!(manager.check_health("node-a").await);

    let client = manager.get_client("node-a").await.unwrap();
    let job = Job::new("job/1", 1_700_000_000_000)
        .with_route("invoice")
        .with_meta(serde_json::json!({ "customer": 42 }));
    client.set_job("billing", &job).await.unwrap();

    assert_eq!(
        store
            .lock()
            .unwrap()
            .get(&("billing".to_string(), "job/1".to_string())),
        Some(&job)
    );
    assert_eq!(client.get_job("billing", "job/1").await.unwrap(), Some(job));
    assert_eq!(client.get_job("billing", "missing").await.unwrap(), None);

    client.delete_job("billing", "job/1").await.unwrap();
    client.delete_job("billing", "job/1").await.unwrap();
    assert!(store.lock().unwrap().is_empty());

    assert_eq!(
        manager.state_of("node-a").await,
        Some(ConnectivityState::Ready)
    );
    manager.close().await;
}

#[tokio::test]
async fn address_may_carry_a_scheme() {
    let (address, _store) = spawn_job_store().await;
    let manager = ConnectionManager::with_http(ConnectionConfig::default()).unwrap();

    manager
        .add("node-a", format!("http://{}/", address))
        .await
        .unwrap();
    let client = manager.get_client("node-a").await.unwrap();
    assert_eq!(client.get_job("c", "j").await.unwrap(), None);
}

#[tokio::test]
async fn dial_to_closed_port_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let manager = ConnectionManager::with_http(ConnectionConfig::default()).unwrap();
    let result = manager.add("node-b", address).await;

    assert!(matches!(result, Err(ClusterError::Dial { .. })));
    assert!(!manager.check_health("node-b").await);
    assert!(manager.nodes().await.is_empty());
}

#[tokio::test]
async fn idle_channel_stays_healthy() {
    let (address, _store) = spawn_job_store().await;
    let manager = ConnectionManager::with_http(
        ConnectionConfig::new().idle_timeout(Duration::from_millis(30)),
    )
    .unwrap();
    manager.add("node-a", address).await.unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(manager.state_of("node-a").await, Some(ConnectivityState::Idle));
    assert!(manager.check_health("node-a").await);

    let client = manager.get_client("node-a").await.unwrap();
    client.get_job("c", "j").await.unwrap();
    assert_eq!(manager.state_of("node-a").await, Some(ConnectivityState::Ready));
}

#[tokio::test]
async fn closed_manager_rejects_stale_clients() {
    let (address, _store) = spawn_job_store().await;
    let manager = ConnectionManager::with_http(ConnectionConfig::default()).unwrap();
    manager.add("node-a", address).await.unwrap();
    let client = manager.get_client("node-a").await.unwrap();

    manager.close().await;

    assert!(matches!(
        client.get_job("c", "j").await,
        Err(ClusterError::Rpc(_))
    ));
}
