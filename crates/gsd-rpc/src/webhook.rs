use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

use gsd_core::notification::{EnhancedTransaction, NotificationBatch};
use gsd_indexer::{DispatchStats, Dispatcher};

/// State shared by the webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub dispatcher: Arc<Dispatcher>,
    /// Expected `Authorization` header. Deliveries are refused when unset.
    pub auth: Option<String>,
    /// Bounds how many notifications are dispatched at once.
    pub workers: Arc<Semaphore>,
}

impl WebhookState {
    pub fn new(dispatcher: Arc<Dispatcher>, auth: Option<String>, workers: usize) -> Self {
        Self { dispatcher, auth, workers: Arc::new(Semaphore::new(workers.max(1))) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub received: bool,
    /// Instructions applied across the batch.
    pub processed: u64,
    /// Notifications in the batch.
    pub total: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

fn reject(status: StatusCode, msg: &str) -> Response {
    (status, Json(serde_json::json!({ "error": msg }))).into_response()
}

pub fn router(state: WebhookState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/webhooks/helius", post(receive))
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
}

async fn health() -> &'static str {
    "ok"
}

async fn receive(State(state): State<WebhookState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(secret) = state.auth.as_deref() else {
        error!("webhook secret not configured; refusing delivery");
        return reject(StatusCode::INTERNAL_SERVER_ERROR, "webhook secret not configured");
    };
    let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if presented != Some(secret) {
        warn!("webhook delivery with bad authorization");
        return reject(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    let batch: NotificationBatch = match serde_json::from_slice(&body) {
        Ok(batch) => batch,
        Err(e) => {
            debug!(error = %e, "webhook body is not a notification payload");
            return reject(StatusCode::BAD_REQUEST, "invalid JSON body");
        }
    };
    let notifications = batch.into_vec();
    let total = notifications.len();

    let outcomes =
        futures::future::join_all(notifications.into_iter().map(|tx| dispatch(state.clone(), tx))).await;

    let mut totals = DispatchStats::default();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(stats) => totals.merge(&stats),
            Err(e) => errors.push(e),
        }
    }
    info!(total, processed = totals.processed, errors = errors.len(), "webhook batch handled");

    Json(WebhookResponse { received: true, processed: totals.processed, total, errors }).into_response()
}

/// Run one notification on a worker slot. Sled access is blocking, so the
/// dispatch itself runs on the blocking pool.
async fn dispatch(state: WebhookState, tx: EnhancedTransaction) -> Result<DispatchStats, String> {
    let signature = match tx.signature.as_deref() {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => {
            warn!("notification without a signature");
            return Err("notification without a signature".into());
        }
    };

    let _permit = state.workers.acquire_owned().await.map_err(|e| format!("{signature}: {e}"))?;
    let dispatcher = Arc::clone(&state.dispatcher);
    match tokio::task::spawn_blocking(move || dispatcher.process_transaction(&tx)).await {
        Ok(Ok(stats)) => Ok(stats),
        Ok(Err(e)) => {
            warn!(%signature, error = %e, "notification failed");
            Err(format!("{signature}: {e}"))
        }
        Err(e) => {
            error!(%signature, error = %e, "dispatch worker aborted");
            Err(format!("{signature}: worker aborted"))
        }
    }
}

/// The webhook HTTP listener.
pub struct WebhookServer {
    state: WebhookState,
}

impl WebhookServer {
    pub fn new(state: WebhookState) -> Self {
        Self { state }
    }

    /// Bind `addr` and serve in the background.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<JoinHandle<()>> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding webhook listener on {addr}"))?;
        let app = router(self.state);
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "webhook server stopped");
            }
        });
        info!(%addr, "webhook server started");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use axum::http::Request;
    use gsd_codec::encode_instruction_data;
    use gsd_core::constants::GSD_PROGRAM_ID;
    use gsd_indexer::IndexerConfig;
    use gsd_state::StateDb;
    use tower::ServiceExt;

    fn state(auth: Option<&str>) -> (WebhookState, Arc<StateDb>) {
        let db = Arc::new(StateDb::temporary().unwrap());
        let dispatcher = Arc::new(Dispatcher::new(db.clone(), IndexerConfig::default()));
        (WebhookState::new(dispatcher, auth.map(String::from), 2), db)
    }

    fn deposit(signature: &str, wallet: &str, amount: u64) -> serde_json::Value {
        serde_json::json!({
            "signature": signature,
            "timestamp": 1_700_000_000,
            "instructions": [{
                "programId": GSD_PROGRAM_ID,
                "accounts": ["config", "vault", wallet],
                "data": encode_instruction_data("deposit_tokens", &amount.to_le_bytes()),
            }],
        })
    }

    async fn post(app: Router, auth: Option<&str>, body: String) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder()
            .method("POST")
            .uri("/webhooks/helius")
            .header(CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            req = req.header(AUTHORIZATION, auth);
        }
        let res = app.oneshot(req.body(Body::from(body)).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn indexes_a_batch() {
        let (state, db) = state(Some("secret"));
        let body = serde_json::json!([deposit("sig-1", "alice", 500), deposit("sig-2", "bob", 70)]);
        let (status, json) = post(router(state), Some("secret"), body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        let res: WebhookResponse = serde_json::from_value(json).unwrap();
        assert_eq!(res, WebhookResponse { received: true, processed: 2, total: 2, errors: vec![] });
        assert_eq!(db.get_deposit("alice").unwrap().unwrap().deposited_amount, 500);
        assert_eq!(db.get_deposit("bob").unwrap().unwrap().deposited_amount, 70);
    }

    #[tokio::test]
    async fn single_notification_and_missing_signature() {
        let (state, db) = state(Some("secret"));
        let app = router(state);

        let (status, json) = post(app.clone(), Some("secret"), deposit("sig-1", "alice", 5).to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 1);
        assert!(json.get("errors").is_none());

        let mut unsigned = deposit("", "carol", 5);
        unsigned.as_object_mut().unwrap().remove("signature");
        let (status, json) = post(app, Some("secret"), serde_json::json!([unsigned]).to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["processed"], 0);
        assert_eq!(json["errors"].as_array().unwrap().len(), 1);
        assert!(db.get_deposit("carol").unwrap().is_none());
    }

    #[tokio::test]
    async fn redelivery_is_idempotent() {
        let (state, db) = state(Some("secret"));
        let app = router(state);
        let body = deposit("sig-1", "alice", 500).to_string();
        post(app.clone(), Some("secret"), body.clone()).await;
        post(app, Some("secret"), body).await;
        assert_eq!(db.get_deposit("alice").unwrap().unwrap().deposited_amount, 500);
    }

    #[tokio::test]
    async fn auth_and_body_errors() {
        let (configured, _db) = state(Some("secret"));
        let app = router(configured);
        let body = deposit("sig-1", "alice", 1).to_string();

        assert_eq!(post(app.clone(), None, body.clone()).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(post(app.clone(), Some("Bearer secret"), body.clone()).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(post(app, Some("secret"), "{not json".into()).await.0, StatusCode::BAD_REQUEST);

        let (unconfigured, _db) = state(None);
        assert_eq!(
            post(router(unconfigured), Some("secret"), body).await.0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn health_is_open() {
        let (state, _db) = state(None);
        let res = router(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }
}
