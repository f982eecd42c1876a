//! Chat gateway route.
//!
//! `POST /chat`: validate the request, attach merchant catalog context,
//! resolve the agent handle for the caller's credential, delegate to the
//! agent platform, and shape the reply:
//! - `200 {"session_id", "reply"}` on success
//! - `422` malformed or incomplete body (field-level detail)
//! - `404` unknown merchant
//! - `503` no credential resolvable
//! - `502` agent platform failure (not retried)

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use kirana_agent::{AgentError, AgentResolver, ResolveError};
use kirana_core::{MerchantProfile, MerchantRegistry};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Caller-supplied platform credential.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Optional existing external agent id; only honored when the credential
/// is seen for the first time.
pub const AGENT_ID_HEADER: &str = "x-agent-id";

#[derive(Clone)]
pub struct ChatState {
    registry: Arc<MerchantRegistry>,
    resolver: Arc<AgentResolver>,
}

impl ChatState {
    pub fn new(registry: Arc<MerchantRegistry>, resolver: Arc<AgentResolver>) -> Self {
        Self { registry, resolver }
    }

    pub fn has_default_agent(&self) -> bool {
        self.resolver.has_default_handle()
    }
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub merchant_id: String,
    /// Customer phone number.
    pub sender: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{detail}")]
    InvalidBody { detail: String },
    #[error("Merchant '{merchant_id}' not found")]
    MerchantNotFound { merchant_id: String },
    #[error("Agent API key not configured. Provide the x-api-key header.")]
    MissingCredential,
    #[error("agent exchange failed: {0}")]
    Agent(#[source] AgentError),
}

impl ChatError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::MerchantNotFound { .. } => StatusCode::NOT_FOUND,
            Self::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
            Self::Agent(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<ResolveError> for ChatError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::MissingCredential => Self::MissingCredential,
            ResolveError::Agent(error) => Self::Agent(error),
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: ChatState) -> Router {
    Router::new().route("/chat", post(chat)).with_state(state)
}

/// Session key binding a merchant and a customer. The agent platform keys
/// its conversation memory on it; this gateway never persists it.
fn session_id(merchant_id: &str, sender: &str) -> String {
    format!("{merchant_id}:{sender}")
}

/// Prefix the raw customer message with a context line so the agent always
/// sees the merchant's current catalog, pricing, and hours.
fn contextualize(merchant: &MerchantProfile, message: &str) -> String {
    format!(
        "[Merchant: {} | Catalog: {}]\n{}",
        merchant.name,
        merchant.catalog_summary(),
        message
    )
}

fn validate(request: &ChatRequest) -> Result<(), ChatError> {
    for (field, value) in [
        ("merchant_id", &request.merchant_id),
        ("sender", &request.sender),
        ("message", &request.message),
    ] {
        if value.trim().is_empty() {
            return Err(ChatError::InvalidBody {
                detail: format!("field `{field}` must not be blank"),
            });
        }
    }
    Ok(())
}

pub async fn chat(
    State(state): State<ChatState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ChatError> {
    let correlation_id = Uuid::new_v4().to_string();

    let Json(request) = payload
        .map_err(|rejection| ChatError::InvalidBody { detail: rejection.body_text() })?;
    validate(&request)?;

    let api_key = header_value(&headers, API_KEY_HEADER);
    let agent_hint = header_value(&headers, AGENT_ID_HEADER);

    let merchant = state.registry.get(&request.merchant_id).ok_or_else(|| {
        ChatError::MerchantNotFound { merchant_id: request.merchant_id.clone() }
    })?;

    let session = session_id(&merchant.id, &request.sender);
    info!(
        event_name = "chat.request.received",
        correlation_id = %correlation_id,
        merchant_id = %merchant.id,
        session_id = %session,
        "chat request accepted"
    );

    let (handle, via) =
        match state.resolver.resolve(api_key.as_deref(), agent_hint.as_deref()).await {
            Ok(resolved) => resolved,
            Err(resolve_error) => {
                error!(
                    event_name = "chat.request.failed",
                    correlation_id = %correlation_id,
                    merchant_id = %merchant.id,
                    session_id = %session,
                    stage = "resolve",
                    error = %resolve_error,
                    "agent resolution failed"
                );
                return Err(resolve_error.into());
            }
        };

    let outbound = contextualize(merchant, &request.message);
    let reply = match state.resolver.platform().run(&handle, &outbound, &session).await {
        Ok(reply) => reply,
        Err(agent_error) => {
            error!(
                event_name = "chat.request.failed",
                correlation_id = %correlation_id,
                merchant_id = %merchant.id,
                session_id = %session,
                stage = "run",
                error = %agent_error,
                "agent exchange failed"
            );
            return Err(ChatError::Agent(agent_error));
        }
    };

    info!(
        event_name = "chat.request.completed",
        correlation_id = %correlation_id,
        merchant_id = %merchant.id,
        session_id = %session,
        resolved_via = via.as_str(),
        "chat exchange completed"
    );

    Ok(Json(ChatResponse { session_id: session, reply }))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use kirana_agent::{AgentCache, AgentError, AgentHandle, AgentPlatform, AgentResolver};
    use kirana_core::MerchantRegistry;
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::chat::{contextualize, router, session_id, ChatState};

    const STUB_REPLY: &str = "Sure! We have Chocolate (₹500) and Vanilla (₹400).";

    #[derive(Default)]
    struct StubPlatform {
        creations: AtomicUsize,
        runs: Mutex<Vec<(String, String)>>,
        fail_runs: bool,
    }

    #[async_trait]
    impl AgentPlatform for StubPlatform {
        async fn create_or_fetch(
            &self,
            credential: &SecretString,
            external_agent_id: Option<&str>,
        ) -> Result<AgentHandle, AgentError> {
            self.creations.fetch_add(1, Ordering::SeqCst);
            Ok(AgentHandle::new(credential.clone(), external_agent_id.unwrap_or("agent-stub")))
        }

        async fn run(
            &self,
            _handle: &AgentHandle,
            message: &str,
            session_id: &str,
        ) -> Result<String, AgentError> {
            if self.fail_runs {
                return Err(AgentError::MalformedReply);
            }
            self.runs
                .lock()
                .expect("runs lock")
                .push((message.to_string(), session_id.to_string()));
            Ok(STUB_REPLY.to_string())
        }
    }

    fn state_with_default(platform: Arc<StubPlatform>) -> ChatState {
        let resolver = AgentResolver::new(platform, AgentCache::new()).with_default_handle(
            AgentHandle::new("default-key".to_string().into(), "agent-default"),
        );
        ChatState::new(Arc::new(MerchantRegistry::with_fixtures()), Arc::new(resolver))
    }

    fn state_without_default(platform: Arc<StubPlatform>) -> ChatState {
        let resolver = AgentResolver::new(platform, AgentCache::new());
        ChatState::new(Arc::new(MerchantRegistry::with_fixtures()), Arc::new(resolver))
    }

    async fn post_chat(state: ChatState, body: Value) -> (StatusCode, Value) {
        post_chat_with_headers(state, body, &[]).await
    }

    async fn post_chat_with_headers(
        state: ChatState,
        body: Value,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::from(body.to_string())).expect("request");

        let response = router(state).oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload = serde_json::from_slice(&bytes).expect("json body");
        (status, payload)
    }

    #[tokio::test]
    async fn chat_returns_reply_and_derived_session_id() {
        let platform = Arc::new(StubPlatform::default());
        let (status, payload) = post_chat(
            state_with_default(platform),
            json!({
                "merchant_id": "merchant_001",
                "sender": "+919876543210",
                "message": "Show me your cakes",
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["reply"], STUB_REPLY);
        assert_eq!(payload["session_id"], "merchant_001:+919876543210");
    }

    #[tokio::test]
    async fn chat_prefixes_merchant_context_on_the_outbound_message() {
        let platform = Arc::new(StubPlatform::default());
        let (status, _) = post_chat(
            state_with_default(Arc::clone(&platform)),
            json!({
                "merchant_id": "merchant_002",
                "sender": "+911234567890",
                "message": "What thalis do you have?",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let runs = platform.runs.lock().expect("runs lock");
        let (message, session) = runs.first().expect("one run recorded");
        assert!(message.starts_with("[Merchant: Priya's Thali House | Catalog: "));
        assert!(message.contains("Veg Thali (₹120)"));
        assert!(message.ends_with("]\nWhat thalis do you have?"));
        assert_eq!(session, "merchant_002:+911234567890");
    }

    #[tokio::test]
    async fn chat_unknown_merchant_returns_not_found() {
        let platform = Arc::new(StubPlatform::default());
        let (status, payload) = post_chat(
            state_with_default(platform),
            json!({
                "merchant_id": "ghost_merchant",
                "sender": "+919999999999",
                "message": "Hello",
            }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let detail = payload["detail"].as_str().expect("detail");
        assert!(detail.contains("not found"));
        assert!(detail.contains("ghost_merchant"));
    }

    #[tokio::test]
    async fn chat_missing_fields_returns_unprocessable() {
        let platform = Arc::new(StubPlatform::default());
        let (status, payload) = post_chat(
            state_with_default(platform),
            json!({ "merchant_id": "merchant_001" }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(payload["detail"].as_str().expect("detail").contains("sender"));
    }

    #[tokio::test]
    async fn chat_blank_sender_returns_unprocessable() {
        let platform = Arc::new(StubPlatform::default());
        let (status, payload) = post_chat(
            state_with_default(platform),
            json!({
                "merchant_id": "merchant_001",
                "sender": "   ",
                "message": "Hello",
            }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(payload["detail"].as_str().expect("detail").contains("sender"));
    }

    #[tokio::test]
    async fn chat_without_any_credential_returns_service_unavailable() {
        let platform = Arc::new(StubPlatform::default());
        let (status, payload) = post_chat(
            state_without_default(platform),
            json!({
                "merchant_id": "merchant_001",
                "sender": "+919876543210",
                "message": "Hello",
            }),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(payload["detail"].as_str().expect("detail").contains("x-api-key"));
    }

    #[tokio::test]
    async fn chat_header_credential_creates_the_agent_once_across_requests() {
        let platform = Arc::new(StubPlatform::default());
        let state = state_without_default(Arc::clone(&platform));
        let body = json!({
            "merchant_id": "merchant_001",
            "sender": "+919876543210",
            "message": "Hello",
        });

        let (first_status, _) = post_chat_with_headers(
            state.clone(),
            body.clone(),
            &[("x-api-key", "sk-demo-1"), ("x-agent-id", "agent-42")],
        )
        .await;
        let (second_status, _) =
            post_chat_with_headers(state, body, &[("x-api-key", "sk-demo-1")]).await;

        assert_eq!(first_status, StatusCode::OK);
        assert_eq!(second_status, StatusCode::OK);
        assert_eq!(platform.creations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn chat_agent_failure_maps_to_bad_gateway() {
        let platform =
            Arc::new(StubPlatform { fail_runs: true, ..StubPlatform::default() });
        let (status, payload) = post_chat(
            state_with_default(platform),
            json!({
                "merchant_id": "merchant_001",
                "sender": "+919876543210",
                "message": "Hello",
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(payload["detail"].as_str().expect("detail").contains("agent exchange failed"));
    }

    #[test]
    fn session_id_composes_merchant_and_sender() {
        assert_eq!(
            session_id("merchant_001", "+919876543210"),
            "merchant_001:+919876543210"
        );
    }

    #[test]
    fn contextualize_reflects_current_availability() {
        let registry = MerchantRegistry::with_fixtures();
        let mut merchant = registry.get("merchant_001").expect("merchant_001").clone();

        let before = contextualize(&merchant, "Show me your cakes");
        assert!(before.contains("Chocolate Cake (₹500)"));

        merchant.catalog[0].is_available = false;
        let after = contextualize(&merchant, "Show me your cakes");
        assert!(!after.contains("Chocolate Cake"));
        assert!(after.ends_with("\nShow me your cakes"));
    }
}
