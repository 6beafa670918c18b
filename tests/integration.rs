//! Integration tests for the shieldpay library.
//!
//! These drive the payment gate end to end: a tower stack wrapping an axum
//! router, a recording settler, and in the last test a live resource server,
//! facilitator and client talking over TCP.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use shieldpay::client::{self, ClientConfig};
use shieldpay::facilitator::{self, FacilitatorConfig, FacilitatorState};
use shieldpay::routes::{RouteConfig, RoutesConfig};
use shieldpay::server::payment_middleware;
use shieldpay::settlement::{FacilitatorSettler, Settler, TxId};
use shieldpay::types::SettlementReceipt;
use shieldpay::utils::decode_receipt_header;
use shieldpay::{Result, ShieldPayError};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::util::BoxCloneService;
use tower::{ServiceBuilder, ServiceExt};

const PAY_TO: &str = "aleo1payeeaddress";

/// Settler that records every call and answers with a fixed outcome.
#[derive(Clone)]
struct RecordingSettler {
    outcome: std::result::Result<&'static str, &'static str>,
    calls: Arc<Mutex<Vec<(String, u64)>>>,
}

impl RecordingSettler {
    fn succeeding(tx: &'static str) -> Self {
        Self {
            outcome: Ok(tx),
            calls: Arc::default(),
        }
    }

    fn failing(reason: &'static str) -> Self {
        Self {
            outcome: Err(reason),
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> Vec<(String, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Settler for RecordingSettler {
    async fn settle(&self, pay_to: &str, amount: u64) -> Result<TxId> {
        self.calls.lock().unwrap().push((pay_to.to_string(), amount));
        match self.outcome {
            Ok(tx) => Ok(TxId::new(tx)),
            Err(reason) => Err(ShieldPayError::SettlementError(reason.to_string())),
        }
    }
}

/// Counters observed by the tests.
#[derive(Clone, Default)]
struct Counters {
    handler_calls: Arc<AtomicUsize>,
    flushes: Arc<AtomicUsize>,
}

fn routes() -> RoutesConfig {
    RoutesConfig::new()
        .with_route("GET /weather", RouteConfig::new(100000, "ALEO").unwrap())
        .unwrap()
        .with_route("GET /broken", RouteConfig::new(5000, "ALEO").unwrap())
        .unwrap()
        .with_route("POST /missing-handler", RouteConfig::new(1, "ALEO").unwrap())
        .unwrap()
}

fn downstream(counters: &Counters) -> Router {
    let weather_calls = counters.handler_calls.clone();
    let broken_calls = counters.handler_calls.clone();
    let free_calls = counters.handler_calls.clone();
    Router::new()
        .route(
            "/weather",
            get(move || {
                weather_calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Json(json!({"report": {"weather": "sunny", "temperature": 70}}))
                }
            }),
        )
        .route(
            "/broken",
            get(move || {
                broken_calls.fetch_add(1, Ordering::SeqCst);
                async {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"error": "sensor offline"})),
                    )
                }
            }),
        )
        .route(
            "/free",
            get(move || {
                free_calls.fetch_add(1, Ordering::SeqCst);
                async { "free" }
            }),
        )
}

/// The gate in front of the downstream router, with every released response counted.
fn gated(
    settler: RecordingSettler,
    counters: &Counters,
) -> BoxCloneService<Request, Response, Infallible> {
    let flushes = counters.flushes.clone();
    let service = ServiceBuilder::new()
        .map_response(move |response: Response| {
            flushes.fetch_add(1, Ordering::SeqCst);
            response
        })
        .layer(payment_middleware(PAY_TO, routes(), settler))
        .service(downstream(counters));
    BoxCloneService::new(service)
}

async fn send(
    service: BoxCloneService<Request, Response, Infallible>,
    method: &str,
    uri: &str,
    proof: Option<&str>,
) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(proof) = proof {
        request = request.header("X-PAYMENT", proof);
    }
    service
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn receipt_of(response: &Response) -> Option<SettlementReceipt> {
    response
        .headers()
        .get("X-PAYMENT-RESPONSE")
        .map(|value| decode_receipt_header(value.to_str().unwrap()).unwrap())
}

#[tokio::test]
async fn test_unpriced_route_is_404_without_settlement() {
    let counters = Counters::default();
    let settler = RecordingSettler::succeeding("tx");
    let service = gated(settler.clone(), &counters);

    for proof in [None, Some("test")] {
        let response = send(service.clone(), "GET", "/free", proof).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Route not configured for payments"})
        );
    }

    // Method is part of the key.
    let response = send(service, "POST", "/weather", Some("test")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert!(settler.calls().is_empty());
    assert_eq!(counters.handler_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_proof_is_402_with_price_and_recipient() {
    let counters = Counters::default();
    let settler = RecordingSettler::succeeding("tx");
    let response = send(gated(settler.clone(), &counters), "GET", "/weather", None).await;

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert!(receipt_of(&response).is_none());
    assert_eq!(
        body_json(response).await,
        json!({
            "error": "X-PAYMENT header is required",
            "amount": 100000,
            "recipient": PAY_TO
        })
    );
    assert!(settler.calls().is_empty());
    assert_eq!(counters.handler_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_downstream_error_passes_through_unbilled() {
    let counters = Counters::default();
    let settler = RecordingSettler::succeeding("tx");
    let response = send(gated(settler.clone(), &counters), "GET", "/broken", Some("test")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(receipt_of(&response).is_none());
    assert_eq!(body_json(response).await, json!({"error": "sensor offline"}));
    assert!(settler.calls().is_empty());
    assert_eq!(counters.handler_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_priced_route_without_handler_is_not_billed() {
    // The router answers 405/404 on its own; either way it is an error status.
    let counters = Counters::default();
    let settler = RecordingSettler::succeeding("tx");
    let response = send(
        gated(settler.clone(), &counters),
        "POST",
        "/missing-handler",
        Some("test"),
    )
    .await;

    assert!(response.status().as_u16() >= 400);
    assert!(receipt_of(&response).is_none());
    assert!(settler.calls().is_empty());
}

#[tokio::test]
async fn test_settlement_success_attaches_receipt() {
    let counters = Counters::default();
    let settler = RecordingSettler::succeeding("tx123");
    let response = send(gated(settler.clone(), &counters), "GET", "/weather", Some("test")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        receipt_of(&response),
        Some(SettlementReceipt {
            success: true,
            transaction: "tx123".to_string(),
            network: "ALEO".to_string(),
        })
    );
    assert_eq!(
        body_json(response).await,
        json!({"report": {"weather": "sunny", "temperature": 70}})
    );
    assert_eq!(settler.calls(), vec![(PAY_TO.to_string(), 100000)]);
}

#[tokio::test]
async fn test_settlement_failure_is_402_and_withholds_body() {
    let counters = Counters::default();
    let settler = RecordingSettler::failing("insufficient balance");
    let response = send(gated(settler.clone(), &counters), "GET", "/weather", Some("test")).await;

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert!(receipt_of(&response).is_none());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!text.contains("sunny"));
    assert_eq!(
        serde_json::from_str::<Value>(&text).unwrap(),
        json!({"error": "Settlement failed: insufficient balance"})
    );

    // Handler ran once, settlement was attempted once, never retried.
    assert_eq!(counters.handler_calls.load(Ordering::SeqCst), 1);
    assert_eq!(settler.calls().len(), 1);
}

#[tokio::test]
async fn test_exactly_one_flush_per_request_on_every_branch() {
    let cases: [(RecordingSettler, &str, &str, Option<&str>, StatusCode); 5] = [
        (RecordingSettler::succeeding("tx"), "GET", "/free", Some("test"), StatusCode::NOT_FOUND),
        (RecordingSettler::succeeding("tx"), "GET", "/weather", None, StatusCode::PAYMENT_REQUIRED),
        (RecordingSettler::succeeding("tx"), "GET", "/broken", Some("test"), StatusCode::INTERNAL_SERVER_ERROR),
        (RecordingSettler::succeeding("tx"), "GET", "/weather", Some("test"), StatusCode::OK),
        (RecordingSettler::failing("down"), "GET", "/weather", Some("test"), StatusCode::PAYMENT_REQUIRED),
    ];

    for (settler, method, uri, proof, expected) in cases {
        let counters = Counters::default();
        let response = send(gated(settler.clone(), &counters), method, uri, proof).await;
        assert_eq!(response.status(), expected, "{method} {uri}");
        assert_eq!(counters.flushes.load(Ordering::SeqCst), 1, "{method} {uri}");
        assert!(settler.calls().len() <= 1);
    }
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let counters = Counters::default();
    let settler = RecordingSettler::succeeding("tx-concurrent");
    let service = gated(settler.clone(), &counters);

    let mut handles = Vec::new();
    for i in 0..16 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let proof = if i % 2 == 0 { Some("test") } else { None };
            send(service, "GET", "/weather", proof).await.status()
        }));
    }

    let mut paid = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => paid += 1,
            status => assert_eq!(status, StatusCode::PAYMENT_REQUIRED),
        }
    }
    assert_eq!(paid, 8);
    assert_eq!(settler.calls().len(), 8);
    assert_eq!(counters.flushes.load(Ordering::SeqCst), 16);
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_weather_scenario_over_the_wire() {
    // Facilitator backed by a recording ledger settler.
    let ledger = RecordingSettler::succeeding("tx123");
    let facilitator_url = spawn(facilitator::router(FacilitatorState::new(
        FacilitatorConfig::new("ALEO"),
        ledger.clone(),
    )))
    .await;

    // Resource server gated through the facilitator.
    let settler = FacilitatorSettler::try_new(&facilitator_url, "ALEO").unwrap();
    let weather_routes = RoutesConfig::new()
        .with_route("GET /weather", RouteConfig::new(100000, "ALEO").unwrap())
        .unwrap();
    let app = Router::new()
        .route(
            "/weather",
            get(|| async { Json(json!({"report": {"weather": "sunny", "temperature": 70}})) }),
        )
        .route("/echo", post(|Json(body): Json<Value>| async move { Json(body).into_response() }))
        .layer(payment_middleware(PAY_TO, weather_routes, settler));
    let server_url = spawn(app).await;

    // Without a token the client sees the 402 challenge.
    let unpaid = ClientConfig::new(server_url.clone(), "");
    let response = client::get(&unpaid, "/weather").await.unwrap();
    assert_eq!(response.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(response.body["amount"], json!(100000));
    assert_eq!(response.body["recipient"], json!(PAY_TO));
    assert!(ledger.calls().is_empty());

    // With a token the payment settles and the body is released with a receipt.
    let paid = ClientConfig::new(server_url.clone(), "test");
    let response = client::get(&paid, "/weather").await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({"report": {"weather": "sunny", "temperature": 70}})
    );
    assert_eq!(
        response.receipt,
        Some(SettlementReceipt::settled("tx123", "ALEO"))
    );
    assert_eq!(ledger.calls(), vec![(PAY_TO.to_string(), 100000)]);

    // Unpriced routes are refused even with a token.
    let response = client::post(&paid, "/echo", json!({"a": 1})).await.unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(ledger.calls().len(), 1);

    let output = client::fetch_tool_output(&paid, "/weather").await;
    assert!(output.starts_with("Response: {"));
    assert!(output.contains("\"weather\": \"sunny\""));
}

#[tokio::test]
async fn test_facilitator_failure_reaches_caller_as_402() {
    let facilitator_url = spawn(facilitator::router(FacilitatorState::new(
        FacilitatorConfig::new("ALEO"),
        RecordingSettler::failing("no spendable record"),
    )))
    .await;

    let settler = FacilitatorSettler::try_new(&facilitator_url, "ALEO").unwrap();
    let weather_routes = RoutesConfig::new()
        .with_route("GET /weather", RouteConfig::new(100000, "ALEO").unwrap())
        .unwrap();
    let app = Router::new()
        .route("/weather", get(|| async { "sunny" }))
        .layer(payment_middleware(PAY_TO, weather_routes, settler));
    let server_url = spawn(app).await;

    let response = client::get(&ClientConfig::new(server_url, "test"), "/weather")
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(
        response.body,
        json!({"error": "Settlement failed: no spendable record"})
    );
    assert!(response.receipt.is_none());
}
