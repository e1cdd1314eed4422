//! End-to-end execution tests against a local mock backend.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rq_client::transport::{InterceptorTransport, ReqwestTransport};
use rq_client::{validation, Client, Error, RetryPolicy};
use tokio_util::sync::CancellationToken;

mod common;

use common::{Captured, Reply};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(max_attempts)
        .with_base_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_millis(20))
}

/// Backend answering with `statuses` in order, repeating the last one.
async fn scripted_backend(statuses: &'static [u16], calls: Arc<AtomicU32>) -> String {
    let addr = common::start_programmable_backend(move |_req| {
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) as usize;
            let status = statuses[n.min(statuses.len() - 1)];
            let body = if status == 200 { "Success" } else { "Service Unavailable" };
            Reply::new(status, body)
        }
    })
    .await;
    format!("http://{addr}")
}

#[tokio::test]
async fn test_retry_on_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let base = scripted_backend(&[503, 503, 200], calls.clone()).await;

    let res = Client::new()
        .get(format!("{base}/items"))
        .send_with_retry(&CancellationToken::new(), &fast_policy(3))
        .await;

    assert!(res.error().is_none(), "{:?}", res.error());
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.attempts(), 3);
    assert_eq!(res.text().unwrap(), "Success");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retries_exhausted_keep_last_status() {
    let calls = Arc::new(AtomicU32::new(0));
    let base = scripted_backend(&[502], calls.clone()).await;

    let res = Client::new()
        .get(base)
        .send_with_retry(&CancellationToken::new(), &fast_policy(4))
        .await;

    assert!(res.error().is_none());
    assert_eq!(res.status_code(), 502);
    assert_eq!(res.attempts(), 4);
    assert!(res.is_error());
}

#[tokio::test]
async fn test_post_body_replayed() {
    let seen = Arc::new(Mutex::new(Vec::<Captured>::new()));
    let log = seen.clone();
    let addr = common::start_programmable_backend(move |req| {
        let log = log.clone();
        async move {
            let mut log = log.lock().unwrap();
            log.push(req);
            if log.len() < 3 {
                Reply::new(500, "retry me")
            } else {
                Reply::new(201, r#"{"id":42}"#).header("Content-Type", "application/json")
            }
        }
    })
    .await;

    let res = Client::new()
        .post(format!("http://{addr}/orders"))
        .body_json(&serde_json::json!({ "sku": "A-1", "qty": 2 }))
        .send_with_retry(&CancellationToken::new(), &fast_policy(3))
        .await;

    assert_eq!(res.status_code(), 201);
    let created: serde_json::Value = res.json().unwrap();
    assert_eq!(created["id"], 42);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    for req in seen.iter() {
        assert_eq!(req.method, "POST");
        assert_eq!(req.target, "/orders");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body_str(), r#"{"qty":2,"sku":"A-1"}"#);
    }
}

#[tokio::test]
async fn test_headers_and_query_reach_backend() {
    let seen = Arc::new(Mutex::new(None::<Captured>));
    let slot = seen.clone();
    let addr = common::start_programmable_backend(move |req| {
        let slot = slot.clone();
        async move {
            *slot.lock().unwrap() = Some(req);
            Reply::new(200, "ok")
        }
    })
    .await;

    let res = Client::new()
        .user_agent("rq-it/1.0")
        .get(format!("http://{addr}/search"))
        .query_param("q", "rust")
        .query_param("page", "2")
        .bearer_token("secret")
        .send(&CancellationToken::new())
        .await;
    assert!(res.is_ok());

    let req = seen.lock().unwrap().take().unwrap();
    assert_eq!(req.target, "/search?q=rust&page=2");
    assert_eq!(req.header("authorization"), Some("Bearer secret"));
    assert_eq!(req.header("user-agent"), Some("rq-it/1.0"));
}

#[tokio::test]
async fn test_timeout_is_retried_then_reported() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let addr = common::start_programmable_backend(move |_req| {
        cc.fetch_add(1, Ordering::SeqCst);
        async { Reply::new(200, "late").delayed(Duration::from_secs(2)) }
    })
    .await;

    let res = Client::new()
        .get(format!("http://{addr}/slow"))
        .timeout(Duration::from_millis(100))
        .send_with_retry(&CancellationToken::new(), &fast_policy(2))
        .await;

    assert!(matches!(res.error(), Some(Error::Timeout(_))));
    assert_eq!(res.attempts(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_connection_refused_is_retried() {
    let addr = common::closed_port().await;

    let res = Client::new()
        .get(format!("http://{addr}/"))
        .send_with_retry(&CancellationToken::new(), &fast_policy(3))
        .await;

    assert!(matches!(res.error(), Some(Error::Transport(_))));
    assert_eq!(res.attempts(), 3);
    assert_eq!(res.status_code(), 0);
}

#[tokio::test]
async fn test_validation_runs_on_final_response() {
    let calls = Arc::new(AtomicU32::new(0));
    let base = scripted_backend(&[503, 200], calls.clone()).await;

    let res = Client::new()
        .get(base.clone())
        .validate([validation::ok(), validation::body_contains("Success")])
        .send_with_retry(&CancellationToken::new(), &fast_policy(3))
        .await;
    assert!(res.error().is_none(), "{:?}", res.error());
    assert_eq!(res.attempts(), 2);

    let res = Client::new()
        .get(base)
        .validate([validation::status_code(201)])
        .send_with_retry(&CancellationToken::new(), &fast_policy(3))
        .await;
    assert!(matches!(res.error(), Some(Error::Validation(_))));
    assert_eq!(res.status_code(), 200);
}

#[tokio::test]
async fn test_interceptor_over_real_transport() {
    let addr = common::start_programmable_backend(|req| async move {
        let token = req.header("x-signed").unwrap_or("missing").to_string();
        Reply::new(200, token)
    })
    .await;

    let transport = InterceptorTransport::default()
        .on_request(|_cancel, req| {
            req.headers_mut().insert("x-signed", "sig-123".parse()?);
            Ok(())
        })
        .on_response(|_cancel, res| {
            res.headers_mut().insert("x-intercepted", "yes".parse()?);
            Ok(())
        });

    let res = Client::with_transport(transport)
        .get(format!("http://{addr}/"))
        .send(&CancellationToken::new())
        .await;

    assert_eq!(res.text().unwrap(), "sig-123");
    assert_eq!(res.header("x-intercepted"), Some("yes"));
}

#[tokio::test]
async fn test_reqwest_transport_retries() {
    let calls = Arc::new(AtomicU32::new(0));
    let base = scripted_backend(&[429, 200], calls.clone()).await;

    let res = Client::with_transport(ReqwestTransport::new(reqwest::Client::new()))
        .get(base)
        .send_with_retry(&CancellationToken::new(), &fast_policy(3))
        .await;

    assert_eq!(res.status_code(), 200);
    assert_eq!(res.attempts(), 2);
    assert_eq!(res.text().unwrap(), "Success");
}

#[tokio::test]
async fn test_client_from_config_file() {
    use std::io::Write;

    let addr = common::start_mock_backend("configured").await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        user_agent = "rq-config/2.0"

        [timeouts]
        request_secs = 5

        [retries]
        max_attempts = 2
        base_delay_ms = 10
        max_delay_ms = 50
        "#
    )
    .unwrap();

    let config = rq_client::config::load_config(file.path()).unwrap();
    let client = Client::from_config(&config).unwrap();
    assert_eq!(client.retry_policy().max_attempts, 2);

    let res = client
        .get(format!("http://{addr}/"))
        .send_with_default_retry(&CancellationToken::new())
        .await;
    assert_eq!(res.text().unwrap(), "configured");
}
