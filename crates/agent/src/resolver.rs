use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;
use tracing::info;

use crate::cache::AgentCache;
use crate::platform::{AgentError, AgentHandle, AgentPlatform};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no agent credential configured; supply the x-api-key header")]
    MissingCredential,
    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Which arm of the resolution chain produced the handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedVia {
    RequestCredential,
    DefaultAgent,
}

impl ResolvedVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestCredential => "request_credential",
            Self::DefaultAgent => "default_agent",
        }
    }
}

/// Ordered agent resolution for inbound requests.
///
/// First match wins: explicit request credential (cached per credential
/// value), then the default handle pre-warmed at startup, then failure.
pub struct AgentResolver {
    platform: Arc<dyn AgentPlatform>,
    cache: AgentCache,
    default_handle: Option<Arc<AgentHandle>>,
}

impl AgentResolver {
    pub fn new(platform: Arc<dyn AgentPlatform>, cache: AgentCache) -> Self {
        Self { platform, cache, default_handle: None }
    }

    pub fn with_default_handle(mut self, handle: AgentHandle) -> Self {
        self.default_handle = Some(Arc::new(handle));
        self
    }

    pub fn platform(&self) -> &Arc<dyn AgentPlatform> {
        &self.platform
    }

    pub fn has_default_handle(&self) -> bool {
        self.default_handle.is_some()
    }

    /// Resolve the handle for one request.
    ///
    /// The `agent_hint` only takes effect when a cache miss forces agent
    /// creation; on a cache hit it is ignored. Creation runs outside the
    /// cache lock, so concurrent first use of one credential may create
    /// duplicate external agents; the last insert wins.
    pub async fn resolve(
        &self,
        credential: Option<&str>,
        agent_hint: Option<&str>,
    ) -> Result<(Arc<AgentHandle>, ResolvedVia), ResolveError> {
        if let Some(credential) = credential {
            if let Some(handle) = self.cache.get(credential) {
                return Ok((handle, ResolvedVia::RequestCredential));
            }

            let secret: SecretString = credential.to_string().into();
            let created = self.platform.create_or_fetch(&secret, agent_hint).await?;
            let handle = self.cache.insert(credential, Arc::new(created));
            info!(
                event_name = "agent.resolver.handle_created",
                agent_id = %handle.agent_id(),
                reused_external_id = agent_hint.is_some(),
                "agent handle created for request credential"
            );
            return Ok((handle, ResolvedVia::RequestCredential));
        }

        if let Some(handle) = &self.default_handle {
            return Ok((Arc::clone(handle), ResolvedVia::DefaultAgent));
        }

        Err(ResolveError::MissingCredential)
    }
}
