use super::*;
use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct PinServerState {
    received: Arc<Mutex<Vec<Value>>>,
}

async fn pin_json_handler(
    State(state): State<PinServerState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some("Bearer test-jwt");
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid token" })),
        );
    }
    state.received.lock().await.push(body);
    (
        StatusCode::OK,
        Json(json!({ "IpfsHash": "QmBatchCertificate", "PinSize": 120 })),
    )
}

async fn spawn_pin_server() -> Result<(String, PinServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = PinServerState::default();
    let app = Router::new()
        .route("/pinning/pinJSONToIPFS", post(pin_json_handler))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/pinning/pinJSONToIPFS"), state))
}

fn certificate() -> Value {
    json!({
        "name": "Lô PARA-2024-001",
        "attributes": [{ "trait_type": "manufacturer", "value": "Dược Hậu Giang" }]
    })
}

#[tokio::test]
async fn pins_with_bearer_token_and_wraps_metadata() {
    let (endpoint, state) = spawn_pin_server().await.expect("spawn server");
    let client = PinningClient::new(&endpoint, Some("test-jwt".into())).expect("client");
    assert!(client.has_credentials());

    let pinned = client
        .pin_json("batch-PARA-2024-001", &certificate())
        .await
        .expect("pin");

    assert_eq!(
        pinned,
        PinnedContent {
            cid: "QmBatchCertificate".into(),
            mocked: false
        }
    );
    assert_eq!(pinned.uri(), "ipfs://QmBatchCertificate");

    let received = state.received.lock().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["pinataContent"], certificate());
    assert_eq!(
        received[0]["pinataMetadata"]["name"],
        "batch-PARA-2024-001"
    );
}

#[tokio::test]
async fn missing_credentials_return_deterministic_mock() {
    let client = PinningClient::new(DEFAULT_PINNING_ENDPOINT, Some("   ".into())).expect("client");
    assert!(!client.has_credentials());

    let first = client.pin_json("cert", &certificate()).await.expect("mock");
    let second = client.pin_json("cert", &certificate()).await.expect("mock");

    assert!(first.mocked);
    assert!(first.cid.starts_with(MOCK_CID_PREFIX));
    assert_eq!(first, second);
    assert_ne!(first, mock_pin(&json!({ "name": "other" })));
}

#[tokio::test]
async fn rejected_upload_falls_back_to_mock_unless_disabled() {
    let (endpoint, state) = spawn_pin_server().await.expect("spawn server");

    let lenient = PinningClient::new(&endpoint, Some("wrong-jwt".into())).expect("client");
    let pinned = lenient.pin_json("cert", &certificate()).await.expect("fallback");
    assert_eq!(pinned, mock_pin(&certificate()));

    let strict = PinningClient::new(&endpoint, Some("wrong-jwt".into()))
        .expect("client")
        .with_mock_fallback(false);
    let err = strict
        .pin_json("cert", &certificate())
        .await
        .expect_err("strict client must fail");
    assert!(matches!(err, PinningError::Rejected { status: 401, .. }));
    assert!(state.received.lock().await.is_empty());
}

#[test]
fn invalid_endpoint_is_reported() {
    assert!(matches!(
        PinningClient::new("::not-a-url::", None),
        Err(PinningError::InvalidEndpoint { .. })
    ));
}
