use crate::{config::TextApi, log_internal};
use anyhow::{anyhow, Result};
use serde_json::Value;

#[derive(serde::Serialize)]
pub struct ChatRequest {
    /// Chat conversation to continue.
    messages: Vec<ChatMessage>,
}

#[derive(serde::Serialize)]
struct ChatMessage {
    role: ChatMessageRole,
    content: String,
}

#[allow(non_camel_case_types)] // Serialized literally; case matters
#[derive(serde::Serialize)]
enum ChatMessageRole {
    user,
}

/// The text API does not commit to a response shape.  Variants are tried in declaration order.
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum ChatResponse {
    Choices {
        choices: Vec<Choice>,
        /// Consulted only when `choices` is empty, and only if it is a string
        #[serde(default)]
        response: Option<Value>,
    },
    Direct { response: String },
    Text(String),
    Other(Value),
}

#[derive(Debug, serde::Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, serde::Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatRequest {
    /// Single-turn conversation
    pub fn new(content: &str) -> Self {
        Self {
            messages: vec![ChatMessage {
                role: ChatMessageRole::user,
                content: content.to_owned(),
            }],
        }
    }

    pub async fn post(&self, settings: &TextApi) -> Result<String> {
        log_internal!("Sending request to chat endpoint {}... ", settings.url);
        let client = reqwest::Client::new();
        let body = client
            .post(&settings.url)
            .json(self)
            .timeout(settings.timeout())
            .send()
            .await
            .map_err(|e| anyhow!("Text API request failed: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow!("Text API returned an error: {}", e))?
            .text()
            .await
            .map_err(|e| anyhow!("Text API body could not be read: {}", e))?;
        log_internal!("Sending request to chat endpoint {}... done", settings.url);

        let reply = reply_text(&body);
        if reply.trim().is_empty() {
            return Err(anyhow!("Text API returned an empty reply"));
        }
        Ok(reply)
    }
}

/// Extract the reply from whatever the API sent back.  Plain text is used as-is; JSON is
/// searched for a known field, falling back to the whole document.
pub fn reply_text(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_owned();
    };

    let shape = serde_json::from_value(value.clone()).unwrap_or(ChatResponse::Other(Value::Null));
    let text = match shape {
        ChatResponse::Choices { choices, response } => match choices.into_iter().next() {
            Some(Choice { message }) => message
                .and_then(|message| message.content)
                .filter(|content| !content.is_empty()),
            None => match response {
                Some(Value::String(response)) if !response.is_empty() => Some(response),
                _ => None,
            },
        },
        ChatResponse::Direct { response } if !response.is_empty() => Some(response),
        ChatResponse::Text(text) => Some(text),
        _ => None,
    };

    text.unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn plain_text_is_used_verbatim() {
        assert_eq!(reply_text("Hello there!"), "Hello there!");
    }

    #[test]
    fn choices_take_precedence() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"from choices"}}],"response":"ignored"}"#;
        assert_eq!(reply_text(body), "from choices");
    }

    #[test]
    fn choices_without_content_serialize_whole_body() {
        let body = r#"{"choices":[{"finish_reason":"length"}]}"#;
        assert_eq!(reply_text(body), r#"{"choices":[{"finish_reason":"length"}]}"#);
    }

    #[test]
    fn empty_choices_fall_back_to_response() {
        assert_eq!(reply_text(r#"{"choices":[],"response":"direct"}"#), "direct");
    }

    #[test]
    fn choices_win_over_non_string_response() {
        assert_eq!(
            reply_text(r#"{"choices":[{"message":{"content":"hi"}}],"response":{"x":1}}"#),
            "hi"
        );
    }

    #[test]
    fn empty_choices_ignore_non_string_response() {
        let body = r#"{"choices":[],"response":42}"#;
        assert_eq!(reply_text(body), r#"{"choices":[],"response":42}"#);
    }

    #[test]
    fn direct_response_field() {
        assert_eq!(reply_text(r#"{"response":"direct"}"#), "direct");
    }

    #[test]
    fn json_string_is_unwrapped() {
        assert_eq!(reply_text(r#""quoted""#), "quoted");
    }

    #[test]
    fn unknown_shapes_serialize_compactly() {
        assert_eq!(reply_text("{ \"answer\": 42 }"), r#"{"answer":42}"#);
    }

    #[test]
    fn request_is_a_single_user_turn() {
        let json = serde_json::to_value(ChatRequest::new("hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "messages": [{ "role": "user", "content": "hi" }] })
        );
    }

    #[tokio::test]
    async fn posts_conversation_and_reads_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({
                "messages": [{ "role": "user", "content": "ping?" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong!"))
            .expect(1)
            .mount(&server)
            .await;
        let settings = TextApi {
            url: server.uri(),
            timeout_seconds: 5,
        };

        let reply = ChatRequest::new("ping?").post(&settings).await.unwrap();

        assert_eq!(reply, "pong!");
    }

    #[tokio::test]
    async fn empty_replies_are_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  "))
            .mount(&server)
            .await;
        let settings = TextApi {
            url: server.uri(),
            timeout_seconds: 5,
        };

        assert!(ChatRequest::new("hello").post(&settings).await.is_err());
    }
}
