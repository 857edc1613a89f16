//! End-to-end tests: ServiceA against scripted and real downstreams.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use product_gateway::catalog::CatalogOptions;
use product_gateway::resilience::PolicyChoice;
use product_gateway::Product;
use serde_json::Value;

mod common;

fn product_json(id: i32) -> String {
    serde_json::to_string(&Product::sample(id)).unwrap()
}

/// Backend that counts calls and answers with `status` every time.
async fn counting_backend(status: u16) -> (SocketAddr, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let addr = common::start_programmable_backend(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            (status, "Not Found".to_string())
        }
    })
    .await;
    (addr, calls)
}

#[tokio::test]
async fn test_fetch_product_through_gateway() {
    let catalog = common::start_catalog(CatalogOptions::default()).await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(catalog)).await;

    let res = common::client()
        .get(format!("http://{}/api/products/42", gateway))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let product: Product = res.json().await.unwrap();
    assert_eq!(
        product,
        Product {
            id: 42,
            name: "Kalem".into(),
            price: 100.0,
            stock: 200,
            category: "Kalemler".into(),
        }
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_breaker_opens_after_three_not_found() {
    let (backend, calls) = counting_backend(404).await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(backend)).await;
    let client = common::client();
    let url = format!("http://{}/api/products/42", gateway);

    for _ in 0..3 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["kind"], "treated-as-failure");
    }

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let retry_after: u64 = res.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!(retry_after > 0 && retry_after <= 30);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["kind"], "circuit-open");

    assert_eq!(calls.load(Ordering::SeqCst), 3, "open circuit must not reach the backend");

    shutdown.trigger();
}

#[tokio::test]
async fn test_half_open_trial_closes_circuit() {
    let healthy = Arc::new(AtomicBool::new(false));
    let flag = healthy.clone();
    let backend = common::start_programmable_backend(move || {
        let flag = flag.clone();
        async move {
            if flag.load(Ordering::SeqCst) {
                (200, product_json(7))
            } else {
                (503, "down".to_string())
            }
        }
    })
    .await;

    let mut config = common::gateway_config(backend);
    config.resilience.advanced_circuit_breaker.break_duration_ms = 300;
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();
    let url = format!("http://{}/api/products/7", gateway);

    for _ in 0..3 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    healthy.store(true, Ordering::SeqCst);
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE, "still within the break");

    tokio::time::sleep(Duration::from_millis(400)).await;
    for _ in 0..3 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_retry_recovers_from_transient_errors() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let backend = common::start_programmable_backend(move || {
        let counter = counter.clone();
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                (503, "Service Unavailable".to_string())
            } else {
                (200, product_json(5))
            }
        }
    })
    .await;

    let mut config = common::gateway_config(backend);
    config.resilience.policy = PolicyChoice::Retry;
    config.resilience.retry.delay_ms = 50;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{}/api/products/5", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK, "should succeed after retries");
    assert_eq!(res.json::<Product>().await.unwrap(), Product::sample(5));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    shutdown.trigger();
}

#[tokio::test]
async fn test_retry_gives_up_after_max_attempts() {
    let (backend, calls) = counting_backend(500).await;

    let mut config = common::gateway_config(backend);
    config.resilience.policy = PolicyChoice::Retry;
    config.resilience.retry.max_attempts = 2;
    config.resilience.retry.delay_ms = 20;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let res = common::client()
        .get(format!("http://{}/api/products/1", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["kind"], "server-error");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_downstream_trips_consecutive_breaker() {
    // Bind then drop to get a port nobody listens on.
    let probe = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = probe.local_addr().unwrap();
    drop(probe);

    let mut config = common::gateway_config(dead);
    config.resilience.policy = PolicyChoice::CircuitBreaker;
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();
    let url = format!("http://{}/api/products/1", gateway);

    for _ in 0..3 {
        let body: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
        assert_eq!(body["kind"], "transient");
    }
    let body: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["kind"], "circuit-open");

    shutdown.trigger();
}

#[tokio::test]
async fn test_non_numeric_id_is_bad_request() {
    let (backend, calls) = counting_backend(200).await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(backend)).await;

    let res = common::client()
        .get(format!("http://{}/api/products/pen", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    shutdown.trigger();
}
