//! Integration tests for the task API.
//!
//! Each test spins up an Axum server on a random port over an in-memory
//! broker, optionally with a worker, and exercises the real HTTP contract.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use magnit_calc::api::api_routes;
use magnit_calc::broker::{Broker, InMemoryBroker};
use magnit_calc::config::{KeyConfig, WorkerConfig};
use magnit_calc::tasks::{QueryService, TaskRegistry};
use magnit_calc::worker::Worker;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

struct TestServer {
    base: String,
    broker: Arc<InMemoryBroker>,
    cancel: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start an Axum server on a random port. With `with_worker`, a worker runs
/// against the same broker.
async fn start_server(with_worker: bool) -> TestServer {
    let broker = InMemoryBroker::new();
    let keys = KeyConfig::default();
    let cancel = CancellationToken::new();

    let app = api_routes(
        TaskRegistry::new(broker.clone(), keys.clone()),
        QueryService::new(broker.clone(), keys.clone()),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .unwrap();
    });

    if with_worker {
        let config = WorkerConfig {
            claim_timeout: Duration::from_millis(50),
        };
        Worker::new(broker.clone(), keys, config).spawn(cancel.clone());
    }

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        broker,
        cancel,
    }
}

async fn register(server: &TestServer, body: Value) -> Uuid {
    let response = reqwest::Client::new()
        .post(format!("{}/register", server.base))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    response.json::<Uuid>().await.unwrap()
}

async fn get(server: &TestServer, path: &str) -> (u16, Value) {
    let response = reqwest::get(format!("{}{path}", server.base)).await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

/// Poll `/task/{id}` until it returns something other than `null`.
async fn wait_for_outcome(server: &TestServer, id: Uuid) -> Value {
    loop {
        let (status, body) = get(server, &format!("/task/{id}")).await;
        assert_eq!(status, 200);
        if !body.is_null() {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ── End-to-end ───────────────────────────────────────────────────────

#[tokio::test]
async fn divide_end_to_end() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(true).await;
        let id = register(&server, json!({"x": 4, "y": 2, "operand": "/"})).await;

        assert_eq!(wait_for_outcome(&server, id).await, json!(2.0));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn divide_by_zero_end_to_end() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(true).await;
        let id = register(&server, json!({"x": 4, "y": 0, "operand": "/"})).await;

        let body = wait_for_outcome(&server, id).await;
        assert_eq!(body["error"], "task_error");
        assert!(!body["msg"].as_str().unwrap().is_empty());

        // The worker survived the fault and keeps serving.
        let next = register(&server, json!({"x": 3, "y": 4, "operand": "*"})).await;
        assert_eq!(wait_for_outcome(&server, next).await, json!(12.0));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn all_operands_end_to_end() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(true).await;
        let cases = [("+", 9.0), ("-", 5.0), ("*", 14.0), ("/", 3.5)];

        let mut ids = Vec::new();
        for (operand, _) in cases {
            ids.push(register(&server, json!({"x": 7, "y": 2, "operand": operand})).await);
        }
        for (id, (_, expected)) in ids.into_iter().zip(cases) {
            assert_eq!(wait_for_outcome(&server, id).await, json!(expected));
        }

        let (_, list) = get(&server, "/task_list").await;
        assert!(list["new"].as_array().unwrap().is_empty());
        assert_eq!(list["done"].as_array().unwrap().len(), 4);
        assert!(list["fail"].as_array().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

// ── Without a worker ─────────────────────────────────────────────────

#[tokio::test]
async fn pending_task_reads_as_null() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;
        let id = register(&server, json!({"x": 1, "y": 1, "operand": "+"})).await;

        let (status, body) = get(&server, &format!("/task/{id}")).await;
        assert_eq!(status, 200);
        assert!(body.is_null());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_task_reads_as_null() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;
        let (status, body) = get(&server, &format!("/task/{}", Uuid::new_v4())).await;
        assert_eq!(status, 200);
        assert!(body.is_null());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn list_shows_unprocessed_tasks_in_order() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;

        let mut ids = Vec::new();
        for x in 0..5 {
            ids.push(register(&server, json!({"x": x, "y": 2, "operand": "-"})).await);
        }

        let (status, list) = get(&server, "/task_list").await;
        assert_eq!(status, 200);
        let expected: Vec<Value> = ids.iter().map(|id| json!(id.to_string())).collect();
        assert_eq!(list["new"], Value::Array(expected));
        assert_eq!(list["done"], json!([]));
        assert_eq!(list["fail"], json!([]));

        // Listing is a read; the queue is untouched.
        let queued = server.broker.range("MAGNIT:NEW", 0, -1).await.unwrap();
        assert_eq!(queued.len(), 5);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/register", server.base))
            .json(&json!({"x": 1, "y": 2, "operand": "^"}))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_client_error());

        let response = client
            .post(format!("{}/register", server.base))
            .json(&json!({"x": "one", "y": 2, "operand": "+"}))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_client_error());

        let (status, _) = get(&server, "/task/12345").await;
        assert_eq!(status, 422);

        assert!(server.broker.range("MAGNIT:NEW", 0, -1).await.unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false).await;
        let (status, body) = get(&server, "/health").await;
        assert_eq!(status, 200);
        assert_eq!(body["service"], "magnit-calc");
    })
    .await
    .expect("test timed out");
}
