use serde::{Deserialize, Serialize};

// OpenRouter chat completion request format
#[derive(Serialize, Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// OpenRouter chat completion response format (only the parts we read)
#[derive(Deserialize, Debug)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    // OpenRouter sometimes reports failures inside a 200 body
    pub error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    pub error: ApiError,
}

// One outbound generation, built per cache miss and dropped afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
}

impl From<&GenerationRequest> for ChatRequest {
    fn from(req: &GenerationRequest) -> Self {
        Self {
            model: req.model.clone(),
            messages: vec![ChatMessage::user(req.prompt.clone())],
        }
    }
}
