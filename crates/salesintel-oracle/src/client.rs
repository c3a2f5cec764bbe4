use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use salesintel_core::config::OracleSettings;
use salesintel_core::traits::{CompletionRequest, TextGenerator};
use salesintel_core::types::ChatTurn;
use salesintel_core::{Error, Result};

use crate::SAFETY_PREAMBLE;

/// Chat completions client for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn from_settings(oracle: &OracleSettings) -> Result<Self> {
        if oracle.api_key.trim().is_empty() {
            return Err(Error::InvalidConfig("oracle.api_key is required for the chat client".into()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(oracle.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: oracle.base_url.trim_end_matches('/').to_string(),
            api_key: oracle.api_key.clone(),
            model: oracle.chat_model.clone(),
        })
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(WireMessage { role: "system", content: SAFETY_PREAMBLE });
        messages.extend(request.messages.iter().map(WireMessage::from));
        ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = self.build_body(&request);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Oracle(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(target: "oracle", %status, body = %text, "chat completion rejected");
            return Err(map_http_error(status));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Oracle(format!("failed to parse chat response: {e}")))?;
        extract_text(parsed)
    }
}

fn map_http_error(status: StatusCode) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Oracle(format!("oracle refused credentials ({status})")),
        StatusCode::TOO_MANY_REQUESTS => Error::Oracle("oracle rate limit exceeded".into()),
        s if s.is_server_error() => Error::Oracle(format!("oracle unavailable ({s})")),
        s => Error::Oracle(format!("oracle returned {s}")),
    }
}

fn extract_text(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| Error::Oracle("oracle returned no content".into()))
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ChatTurn> for WireMessage<'a> {
    fn from(turn: &'a ChatTurn) -> Self {
        let role = match turn.role {
            salesintel_core::types::Role::System => "system",
            salesintel_core::types::Role::User => "user",
            salesintel_core::types::Role::Assistant => "assistant",
        };
        Self { role, content: &turn.content }
    }
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ChatClient {
        let settings = OracleSettings { api_key: "sk-test".into(), ..OracleSettings::default() };
        ChatClient::from_settings(&settings).expect("client")
    }

    #[test]
    fn body_starts_with_safety_preamble_and_keeps_turn_order() {
        let c = client();
        let req = CompletionRequest::new(vec![ChatTurn::system("schema"), ChatTurn::user("q")], 0.1, 500);
        let body = serde_json::to_value(c.build_body(&req)).expect("json");
        let msgs = body["messages"].as_array().expect("messages");
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0]["content"], SAFETY_PREAMBLE);
        assert_eq!(msgs[1]["content"], "schema");
        assert_eq!(msgs[2]["role"], "user");
        assert!(body.get("response_format").is_none());
        assert_eq!(body["max_tokens"], 500);
    }

    #[test]
    fn json_mode_sets_response_format() {
        let c = client();
        let req = CompletionRequest::new(vec![ChatTurn::user("q")], 0.5, 2000).json();
        let body = serde_json::to_value(c.build_body(&req)).expect("json");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        assert!(matches!(ChatClient::from_settings(&OracleSettings::default()), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn empty_choice_is_absent_output() {
        let resp = ChatCompletionResponse { choices: vec![Choice { message: ResponseMessage { content: Some("  ".into()) } }] };
        assert!(matches!(extract_text(resp), Err(Error::Oracle(_))));
    }
}
