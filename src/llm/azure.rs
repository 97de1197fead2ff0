//! Azure OpenAI chat-completions client with `json_schema` response format.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{CompletionClient, JsonSchema};
use crate::error::{ProviderError, ProviderResult};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    response_format: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for one chat deployment on an Azure OpenAI resource.
#[derive(Debug, Clone)]
pub struct AzureOpenAiClient {
    client: Client,
    url: String,
    api_key: String,
    temperature: Option<f32>,
    timeout: Duration,
}

impl AzureOpenAiClient {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        api_version: &str,
        deployment: &str,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        if endpoint.is_empty() || api_key.is_empty() || deployment.is_empty() {
            return Err(ProviderError::Config(
                "Azure OpenAI needs an endpoint, an API key and a chat deployment".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: chat_url(endpoint, deployment, api_version),
            api_key: api_key.to_string(),
            temperature: None,
            timeout,
        })
    }

    /// Sampling temperature sent with every request.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

fn chat_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{deployment}/chat/completions?api-version={api_version}",
        endpoint.trim_end_matches('/')
    )
}

fn response_format(schema: &JsonSchema) -> serde_json::Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": schema.name,
            "schema": schema.schema,
        }
    })
}

#[async_trait]
impl CompletionClient for AzureOpenAiClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: &JsonSchema,
    ) -> ProviderResult<String> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            response_format: response_format(schema),
            temperature: self.temperature,
        };

        tracing::debug!(target: "llm", "requesting '{}' ({} prompt chars)", schema.name, user_prompt.len());

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest("language model", self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                service: "language model",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Protocol {
                service: "language model",
                reason: e.to_string(),
            })?;

        // An empty choice list or null content is handed to the caller as an
        // empty string; decoding it fails and the caller's fallback applies.
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}
