use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::SecretString;
use thiserror::Error;

/// Opaque reference to an external agent identity.
///
/// Bound to exactly one credential. Created lazily on first use per
/// distinct credential, cached for the process lifetime, never refreshed.
#[derive(Clone)]
pub struct AgentHandle {
    credential: SecretString,
    agent_id: String,
}

impl AgentHandle {
    pub fn new(credential: SecretString, agent_id: impl Into<String>) -> Self {
        Self { credential, agent_id: agent_id.into() }
    }

    pub fn credential(&self) -> &SecretString {
        &self.credential
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }
}

impl fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentHandle")
            .field("credential", &"<redacted>")
            .field("agent_id", &self.agent_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent platform request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("agent platform returned {status}: {detail}")]
    Platform { status: StatusCode, detail: String },
    #[error("agent platform reply did not contain a text response")]
    MalformedReply,
}

/// The two capabilities the gateway needs from the platform.
///
/// The real network implementation is `StudioClient`; tests swap in
/// recording stubs without touching gateway logic.
#[async_trait]
pub trait AgentPlatform: Send + Sync {
    /// Fetch the agent identified by `external_agent_id`, or create a new
    /// one with the fixed ordering-assistant profile when no id is given.
    /// Blocking network call; the resolver cache ensures it runs once per
    /// distinct credential.
    async fn create_or_fetch(
        &self,
        credential: &SecretString,
        external_agent_id: Option<&str>,
    ) -> Result<AgentHandle, AgentError>;

    /// Send `message` under `session_id` and return the reply text.
    /// Errors propagate unmodified; there is no local retry.
    async fn run(
        &self,
        handle: &AgentHandle,
        message: &str,
        session_id: &str,
    ) -> Result<String, AgentError>;
}
