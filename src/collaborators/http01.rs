//! Default HTTP-01 collaborator pieces (spec §11): an HMAC-signed
//! registration call against an external token responder, and the
//! in-process responder service itself for single-host deployments
//! and integration tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use poem::http::StatusCode;
use poem::listener::TcpListener;
use poem::web::{Data, Path as PoemPath};
use poem::{EndpointExt, Route, Server, handler};
use ring::hmac;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::ChallengeKindConfig;
use crate::collaborators::challenge::ChallengePublisher;
use crate::error::{AcmeError, AcmeResult};

const HEADER_TIMESTAMP: &str = "x-acme-engine-timestamp";
const HEADER_SIGNATURE: &str = "x-acme-engine-signature";
const ADMIN_PATH: &str = "/admin/http01";

fn signature_payload(timestamp: i64, token: &str, key_authorization: &str) -> String {
    format!("{timestamp}.{token}.{key_authorization}")
}

fn sign(secret: &str, payload: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    STANDARD.encode(hmac::sign(&key, payload.as_bytes()).as_ref())
}

/// Registers HTTP-01 tokens with a remote responder over an
/// HMAC-signed admin call, the way a fleet of proxies behind a single
/// externally-reachable responder would need to.
pub struct RemoteHttp01Publisher {
    client: reqwest::Client,
    base_url: String,
    hmac_secret: String,
}

impl RemoteHttp01Publisher {
    #[must_use]
    pub fn new(base_url: impl Into<String>, hmac_secret: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            hmac_secret: hmac_secret.into(),
        }
    }
}

#[async_trait]
impl ChallengePublisher for RemoteHttp01Publisher {
    async fn publish(
        &self,
        kind: ChallengeKindConfig,
        _identifier: &str,
        token: &str,
        key_authorization: &str,
    ) -> AcmeResult<()> {
        if kind != ChallengeKindConfig::Http01 {
            return Err(AcmeError::Configuration(
                "RemoteHttp01Publisher only handles HTTP-01".to_string(),
            ));
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AcmeError::Transient(format!("system clock error: {e}")))?
            .as_secs();
        let timestamp = i64::try_from(timestamp)
            .map_err(|_| AcmeError::Transient("timestamp overflow".to_string()))?;

        let payload = signature_payload(timestamp, token, key_authorization);
        let signature = sign(&self.hmac_secret, &payload);

        let endpoint = format!("{}{ADMIN_PATH}", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(endpoint)
            .header(HEADER_TIMESTAMP, timestamp.to_string())
            .header(HEADER_SIGNATURE, signature)
            .json(&serde_json::json!({
                "token": token,
                "keyAuthorization": key_authorization,
            }))
            .send()
            .await
            .map_err(|e| AcmeError::Transient(format!("responder request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AcmeError::Transient(format!("responder returned {status}: {body}")));
        }
        Ok(())
    }
}

pub type ChallengeStore = Arc<Mutex<HashMap<String, String>>>;

async fn resolve(token: &str, store: &ChallengeStore) -> (StatusCode, String) {
    match store.lock().await.get(token) {
        Some(key_authorization) => (StatusCode::OK, key_authorization.clone()),
        None => (StatusCode::NOT_FOUND, "not found".to_string()),
    }
}

#[handler]
async fn serve_challenge(
    PoemPath(token): PoemPath<String>,
    Data(store): Data<&ChallengeStore>,
) -> (StatusCode, String) {
    resolve(&token, store).await
}

/// Starts the in-process HTTP-01 token responder on `port`, serving
/// `/.well-known/acme-challenge/:token` from `store`. A publisher that
/// inserts into `store` directly (rather than over the network) is the
/// simplest `ChallengePublisher` for a single-host deployment.
pub fn spawn_http01_responder(store: ChallengeStore, port: u16) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = Route::new()
            .at("/.well-known/acme-challenge/:token", poem::get(serve_challenge))
            .data(store);
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!("starting HTTP-01 responder on {addr}");
        if let Err(err) = Server::new(TcpListener::bind(addr)).run(app).await {
            error!("HTTP-01 responder failed: {err}");
        }
    })
}

#[derive(Clone)]
struct AdminState {
    store: ChallengeStore,
    hmac_secret: Arc<str>,
}

#[derive(serde::Deserialize)]
struct RegisterBody {
    token: String,
    #[serde(rename = "keyAuthorization")]
    key_authorization: String,
}

#[handler]
async fn register_challenge(
    req: &poem::Request,
    body: poem::web::Json<RegisterBody>,
    Data(state): Data<&AdminState>,
) -> poem::Result<StatusCode> {
    let timestamp = req
        .header(HEADER_TIMESTAMP)
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| poem::Error::from_status(StatusCode::BAD_REQUEST))?;
    let signature = req
        .header(HEADER_SIGNATURE)
        .ok_or_else(|| poem::Error::from_status(StatusCode::BAD_REQUEST))?;

    let expected = signature_payload(timestamp, &body.token, &body.key_authorization);
    let expected_signature = sign(&state.hmac_secret, &expected);
    if expected_signature != signature {
        return Err(poem::Error::from_status(StatusCode::UNAUTHORIZED));
    }

    state.store.lock().await.insert(body.token.clone(), body.key_authorization.clone());
    Ok(StatusCode::NO_CONTENT)
}

/// Starts the standalone responder including the HMAC-verified
/// `/admin/http01` registration route used by `RemoteHttp01Publisher`.
pub fn spawn_admin_http01_responder(
    store: ChallengeStore,
    hmac_secret: String,
    port: u16,
) -> tokio::task::JoinHandle<()> {
    let state = AdminState { store: Arc::clone(&store), hmac_secret: Arc::from(hmac_secret) };
    tokio::spawn(async move {
        let app = Route::new()
            .at("/.well-known/acme-challenge/:token", poem::get(serve_challenge))
            .at(ADMIN_PATH, poem::post(register_challenge))
            .data(store)
            .data(state);
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!("starting admin HTTP-01 responder on {addr}");
        if let Err(err) = Server::new(TcpListener::bind(addr)).run(app).await {
            error!("HTTP-01 responder failed: {err}");
        }
    })
}

/// A `ChallengePublisher` that writes directly into the in-process
/// responder's shared map instead of making a network call.
pub struct LocalHttp01Publisher {
    store: ChallengeStore,
}

impl LocalHttp01Publisher {
    #[must_use]
    pub fn new(store: ChallengeStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ChallengePublisher for LocalHttp01Publisher {
    async fn publish(
        &self,
        kind: ChallengeKindConfig,
        _identifier: &str,
        token: &str,
        key_authorization: &str,
    ) -> AcmeResult<()> {
        if kind != ChallengeKindConfig::Http01 {
            return Err(AcmeError::Configuration(
                "LocalHttp01Publisher only handles HTTP-01".to_string(),
            ));
        }
        self.store
            .lock()
            .await
            .insert(token.to_string(), key_authorization.to_string());
        Ok(())
    }
}
