use std::sync::Arc;
use std::time::Duration;

use kirana_agent::{AgentCache, AgentError, AgentPlatform, AgentResolver, StudioClient};
use kirana_core::config::AppConfig;
use kirana_core::MerchantRegistry;
use thiserror::Error;
use tracing::info;

use crate::chat::ChatState;

pub struct Application {
    pub config: AppConfig,
    pub chat_state: ChatState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("agent platform client construction failed: {0}")]
    PlatformClient(#[source] AgentError),
    #[error("default agent pre-warm failed: {0}")]
    PreWarm(#[source] AgentError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let platform = Arc::new(
        StudioClient::new(&config.agent.base_url, Duration::from_secs(config.agent.timeout_secs))
            .map_err(BootstrapError::PlatformClient)?,
    );

    // A configured default credential pre-warms its handle here; a broken
    // one stops the process instead of degrading to per-request keys.
    let default_handle = match &config.agent.api_key {
        Some(api_key) => {
            let handle = platform
                .create_or_fetch(api_key, config.agent.agent_id.as_deref())
                .await
                .map_err(BootstrapError::PreWarm)?;
            info!(
                event_name = "system.bootstrap.default_agent_ready",
                correlation_id = "bootstrap",
                agent_id = %handle.agent_id(),
                reused_external_id = config.agent.agent_id.is_some(),
                "default agent handle pre-warmed"
            );
            Some(handle)
        }
        None => None,
    };

    let mut resolver = AgentResolver::new(platform, AgentCache::new());
    if let Some(handle) = default_handle {
        resolver = resolver.with_default_handle(handle);
    }

    let registry = Arc::new(MerchantRegistry::with_fixtures());
    info!(
        event_name = "system.bootstrap.registry_loaded",
        correlation_id = "bootstrap",
        merchant_count = registry.len(),
        "merchant registry loaded"
    );

    Ok(Application { chat_state: ChatState::new(registry, Arc::new(resolver)), config })
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use kirana_core::config::AppConfig;
    use tower::ServiceExt;

    use crate::bootstrap::bootstrap_with_config;
    use crate::chat;

    #[tokio::test]
    async fn bootstrap_without_default_credential_skips_pre_warm() {
        let app = bootstrap_with_config(AppConfig::default())
            .await
            .expect("bootstrap should succeed without a default credential");

        assert!(!app.chat_state.has_default_agent());
        assert_eq!(app.config.server.port, 8000);
    }

    #[tokio::test]
    async fn integration_smoke_covers_routing_registry_and_credential_gate() {
        let app = bootstrap_with_config(AppConfig::default())
            .await
            .expect("bootstrap should succeed");
        let router = chat::router(app.chat_state);

        // Unknown merchant fails on registry lookup, before any agent work.
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"merchant_id":"ghost_merchant","sender":"+911","message":"hi"}"#,
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Known merchant without any credential stops at resolution; no
        // network call is ever attempted.
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"merchant_id":"merchant_001","sender":"+911","message":"hi"}"#,
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert!(payload["detail"].as_str().expect("detail").contains("x-api-key"));
    }
}
