use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::platform::{AgentError, AgentHandle, AgentPlatform};

// Fixed profile for agents this gateway creates. The platform owns the
// model; the gateway only pins the persona.
const AGENT_NAME: &str = "Kirana Ordering Agent";
const AGENT_DESCRIPTION: &str = "Conversational ordering assistant for WhatsApp commerce";
const AGENT_PROVIDER: &str = "anthropic/claude-sonnet-4-5";
const AGENT_ROLE: &str = "WhatsApp commerce assistant for Indian SMB merchants";
const AGENT_GOAL: &str =
    "Help customers browse the catalog, place orders, and answer questions in Hinglish";
const AGENT_INSTRUCTIONS: &str = "Respond in Hinglish (mix of Hindi and English). \
     Be warm, concise, and helpful. \
     Guide customers through ordering step by step. \
     Always reference the merchant's catalog when answering product questions.";

const API_KEY_HEADER: &str = "x-api-key";

/// HTTP client for the agent studio platform.
pub struct StudioClient {
    http: Client,
    base_url: String,
}

impl StudioClient {
    /// `timeout` bounds every platform call; there is no retry on top.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AgentError> {
        let http = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    fn agents_url(&self) -> String {
        format!("{}/v3/agents/", self.base_url)
    }

    fn agent_url(&self, agent_id: &str) -> String {
        format!("{}/v3/agents/{agent_id}", self.base_url)
    }

    fn inference_url(&self) -> String {
        format!("{}/v3/inference/chat/", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct CreateAgentBody<'a> {
    name: &'a str,
    description: &'a str,
    provider_id: &'a str,
    agent_role: &'a str,
    agent_goal: &'a str,
    agent_instructions: &'a str,
}

impl Default for CreateAgentBody<'_> {
    fn default() -> Self {
        Self {
            name: AGENT_NAME,
            description: AGENT_DESCRIPTION,
            provider_id: AGENT_PROVIDER,
            agent_role: AGENT_ROLE,
            agent_goal: AGENT_GOAL,
            agent_instructions: AGENT_INSTRUCTIONS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateAgentReply {
    agent_id: String,
}

#[derive(Debug, Serialize)]
struct InferenceBody<'a> {
    user_id: &'a str,
    agent_id: &'a str,
    session_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct InferenceReply {
    response: Option<String>,
}

#[async_trait]
impl AgentPlatform for StudioClient {
    async fn create_or_fetch(
        &self,
        credential: &SecretString,
        external_agent_id: Option<&str>,
    ) -> Result<AgentHandle, AgentError> {
        if let Some(agent_id) = external_agent_id {
            let response = self
                .http
                .get(self.agent_url(agent_id))
                .header(API_KEY_HEADER, credential.expose_secret())
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(platform_error(response).await);
            }

            return Ok(AgentHandle::new(credential.clone(), agent_id));
        }

        let response = self
            .http
            .post(self.agents_url())
            .header(API_KEY_HEADER, credential.expose_secret())
            .json(&CreateAgentBody::default())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(platform_error(response).await);
        }

        let reply: CreateAgentReply =
            response.json().await.map_err(|_| AgentError::MalformedReply)?;
        Ok(AgentHandle::new(credential.clone(), reply.agent_id))
    }

    async fn run(
        &self,
        handle: &AgentHandle,
        message: &str,
        session_id: &str,
    ) -> Result<String, AgentError> {
        let body = InferenceBody {
            // The platform partitions memory by caller identity as well as
            // session; the session key serves as both.
            user_id: session_id,
            agent_id: handle.agent_id(),
            session_id,
            message,
        };

        let response = self
            .http
            .post(self.inference_url())
            .header(API_KEY_HEADER, handle.credential().expose_secret())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(platform_error(response).await);
        }

        let reply: InferenceReply =
            response.json().await.map_err(|_| AgentError::MalformedReply)?;
        reply.response.ok_or(AgentError::MalformedReply)
    }
}

async fn platform_error(response: reqwest::Response) -> AgentError {
    let status = response.status();
    let detail = response.text().await.unwrap_or_else(|_| "<unreadable body>".to_string());
    AgentError::Platform { status, detail }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::studio::{CreateAgentBody, StudioClient};

    #[test]
    fn endpoint_urls_normalize_trailing_slash() {
        let client = StudioClient::new("https://studio.example.com/", Duration::from_secs(5))
            .expect("client should build");

        assert_eq!(client.agents_url(), "https://studio.example.com/v3/agents/");
        assert_eq!(client.agent_url("ag-1"), "https://studio.example.com/v3/agents/ag-1");
        assert_eq!(client.inference_url(), "https://studio.example.com/v3/inference/chat/");
    }

    #[test]
    fn creation_profile_is_the_fixed_ordering_assistant() {
        let body = CreateAgentBody::default();

        assert_eq!(body.name, "Kirana Ordering Agent");
        assert!(body.agent_role.contains("WhatsApp commerce"));
        assert!(body.agent_instructions.contains("Hinglish"));
        assert!(body.agent_instructions.contains("catalog"));
    }
}
