use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::constants;
use crate::location::Location;

/// A structured function call emitted by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub name: String,
    pub arguments: Value,
}

/// Raw model reply: free text plus at most one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub text: String,
    pub invocation: Option<Invocation>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            invocation: None,
        }
    }

    pub fn with_invocation(mut self, name: impl Into<String>, arguments: Value) -> Self {
        self.invocation = Some(Invocation {
            name: name.into(),
            arguments,
        });
        self
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("failed to reach the model API: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("model API request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode model API response: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("credential variable {0} is not set")]
    Configuration(String),
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Failure class reported to the turn boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    Remote,
}

impl GatewayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GatewayError::Configuration(_) | GatewayError::EmptyPrompt => FailureKind::Configuration,
            GatewayError::Remote(_) => FailureKind::Remote,
        }
    }
}

/// The remote assistant, as seen by the turn controller.
#[async_trait]
pub trait AssistantGateway: Send + Sync {
    async fn send(&self, prompt: &str, location: Option<Location>) -> Result<Reply, GatewayError>;
}

#[derive(Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Explicit key. Takes precedence over `api_key_env` when set.
    pub api_key: Option<String>,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: constants::GEMINI_BASE_URL.clone(),
            model: constants::NOVA_MODEL.clone(),
            api_key_env: constants::DEFAULT_API_KEY_ENV.to_string(),
            api_key: None,
        }
    }
}

// Structures matching Gemini's models/{model}:generateContent endpoint
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    tools: Vec<Value>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
}

#[derive(Serialize, Deserialize, Debug)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<Content>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            function_call: None,
        }
    }
}

pub fn system_instruction(location: Option<Location>) -> String {
    let place = location
        .map(|loc| loc.to_string())
        .unwrap_or_else(|| "未知".to_string());
    format!(
        "你是一个名为 Nova 的手机助手。\n\
         核心能力：一句话点外卖。\n\
         当用户提出点餐需求时，你必须调用 '{}' 函数，并自动补全合理的菜单项和配送地址。\n\
         当前地理位置：{}。\n\
         回复语言：中文。风格：极简、科幻感。",
        constants::PLACE_FOOD_ORDER,
        place
    )
}

/// Declaration of the single callable the model may invoke.
pub fn place_food_order_declaration() -> Value {
    json!({
        "name": constants::PLACE_FOOD_ORDER,
        "description": "Place a food order from a specific restaurant with items.",
        "parameters": {
            "type": "OBJECT",
            "properties": {
                "restaurantName": {
                    "type": "STRING",
                    "description": "The name of the restaurant."
                },
                "items": {
                    "type": "ARRAY",
                    "description": "List of items to order.",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "name": { "type": "STRING" },
                            "price": { "type": "NUMBER" },
                            "quantity": { "type": "INTEGER" }
                        },
                        "required": ["name", "price", "quantity"]
                    }
                },
                "deliveryAddress": {
                    "type": "STRING",
                    "description": "Where the food should be delivered."
                }
            },
            "required": ["restaurantName", "items", "deliveryAddress"]
        }
    })
}

impl From<GenerateContentResponse> for Reply {
    fn from(response: GenerateContentResponse) -> Self {
        let parts = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        let mut reply = Reply::default();
        for part in parts {
            if let Some(text) = part.text {
                reply.text.push_str(&text);
            }
            if reply.invocation.is_some() {
                continue;
            }
            if let Some(call) = part.function_call {
                reply.invocation = Some(Invocation {
                    name: call.name,
                    arguments: call.args,
                });
            }
        }
        reply
    }
}

/// Gemini-backed gateway. One instance is built at startup and shared across turns.
pub struct GeminiGateway {
    client: Client,
    config: GatewayConfig,
}

impl GeminiGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn api_key(&self) -> Result<String, GatewayError> {
        let key = match &self.config.api_key {
            Some(key) => Some(key.clone()),
            None => std::env::var(&self.config.api_key_env).ok(),
        };
        match key {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(GatewayError::Configuration(self.config.api_key_env.clone())),
        }
    }
}

#[async_trait]
impl AssistantGateway for GeminiGateway {
    #[instrument(skip(self, prompt), fields(model = %self.config.model, has_location = location.is_some()))]
    async fn send(&self, prompt: &str, location: Option<Location>) -> Result<Reply, GatewayError> {
        if prompt.trim().is_empty() {
            return Err(GatewayError::EmptyPrompt);
        }
        let api_key = self.api_key()?;

        let request_payload = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(prompt.to_string())],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part::text(system_instruction(location))],
            },
            tools: vec![json!({ "functionDeclarations": [place_food_order_declaration()] })],
        };

        let url = self.endpoint();
        debug!(%url, "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request_payload)
            .send()
            .await
            .map_err(RemoteError::Transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %body, "Gemini API request failed");
            return Err(RemoteError::Status { status, body }.into());
        }

        let decoded = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(RemoteError::Decode)?;

        let reply = Reply::from(decoded);
        info!(
            text_len = reply.text.len(),
            invocation = reply.invocation.as_ref().map(|i| i.name.as_str()),
            "Received model reply"
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_instruction_with_location() {
        let loc = Location {
            latitude: 31.23,
            longitude: 121.47,
        };
        let text = system_instruction(Some(loc));
        assert!(text.contains("当前地理位置：纬度 31.23, 经度 121.47。"));
        assert!(text.contains("placeFoodOrder"));
    }

    #[test]
    fn test_system_instruction_without_location() {
        assert!(system_instruction(None).contains("当前地理位置：未知。"));
    }

    #[test]
    fn test_declaration_requires_all_fields() {
        let decl = place_food_order_declaration();
        assert_eq!(decl["name"], "placeFoodOrder");
        assert_eq!(
            decl["parameters"]["required"],
            json!(["restaurantName", "items", "deliveryAddress"])
        );
        assert_eq!(decl["parameters"]["properties"]["items"]["items"]["properties"]["quantity"]["type"], "INTEGER");
    }

    #[test]
    fn test_reply_from_response_takes_first_call() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "好的，" },
                        { "functionCall": { "name": "placeFoodOrder", "args": { "restaurantName": "A" } } },
                        { "text": "已下单。" },
                        { "functionCall": { "name": "other", "args": {} } }
                    ]
                }
            }]
        }))
        .unwrap();

        let reply = Reply::from(response);
        assert_eq!(reply.text, "好的，已下单。");
        let invocation = reply.invocation.unwrap();
        assert_eq!(invocation.name, "placeFoodOrder");
        assert_eq!(invocation.arguments["restaurantName"], "A");
    }

    #[test]
    fn test_reply_from_empty_response() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(Reply::from(response), Reply::default());
    }

    #[tokio::test]
    async fn test_missing_credential_is_configuration_error() {
        let gateway = GeminiGateway::new(GatewayConfig {
            // Unroutable address: the call must fail before any connection attempt.
            base_url: "http://127.0.0.1:9".to_string(),
            model: "m".to_string(),
            api_key_env: "NOVA_TEST_UNSET_CREDENTIAL_VAR".to_string(),
            api_key: None,
        });
        let err = gateway.send("hello", None).await.unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(ref var) if var == "NOVA_TEST_UNSET_CREDENTIAL_VAR"));
        assert_eq!(err.kind(), FailureKind::Configuration);
    }

    #[test]
    fn test_explicit_key_wins_and_blank_is_missing() {
        let mut config = GatewayConfig {
            api_key_env: "NOVA_TEST_UNSET_CREDENTIAL_VAR".to_string(),
            api_key: Some("secret-key".to_string()),
            ..GatewayConfig::default()
        };
        assert_eq!(GeminiGateway::new(config.clone()).api_key().unwrap(), "secret-key");
        assert!(!format!("{:?}", config).contains("secret-key"));

        config.api_key = Some(" \t".to_string());
        let err = GeminiGateway::new(config).api_key().unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(ref var) if var == "NOVA_TEST_UNSET_CREDENTIAL_VAR"));
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let gateway = GeminiGateway::new(GatewayConfig::default());
        let err = gateway.send("   ", None).await.unwrap_err();
        assert!(matches!(err, GatewayError::EmptyPrompt));
    }
}
