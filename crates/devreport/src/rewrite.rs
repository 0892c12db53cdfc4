//! Best-effort rephrasing of roll-up bullet lists.
//!
//! A [`TextRewriter`] never fails: on any problem it hands back the lines it
//! was given.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::http::{HttpRequest, HttpTransport};

/// Default local Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gemma3";

/// Default timeout for one rewrite call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const PROMPT: &str = "Rephrase each bullet point below to be concise and professional using verbs. \
Keep the bullet point format (•). Return exactly one line per input, in the same order:\n\n";

/// Rewrites a batch of lines.
#[async_trait]
pub trait TextRewriter: Send + Sync {
    /// Return the rewritten lines, or `lines` unchanged on any failure.
    async fn rewrite_lines(&self, lines: Vec<String>) -> Vec<String>;
}

/// Returns its input untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl TextRewriter for PassThrough {
    async fn rewrite_lines(&self, lines: Vec<String>) -> Vec<String> {
        lines
    }
}

/// Settings for [`OllamaRewriter`].
#[derive(Debug, Clone)]
pub struct RewriteOptions {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: ChatResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

/// Rephrases lines through an Ollama-style `/api/chat` endpoint.
#[derive(Clone)]
pub struct OllamaRewriter {
    transport: Arc<dyn HttpTransport>,
    options: RewriteOptions,
}

impl OllamaRewriter {
    pub fn new(transport: Arc<dyn HttpTransport>, options: RewriteOptions) -> Self {
        Self { transport, options }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.options.base_url.trim_end_matches('/'))
    }

    async fn try_rewrite(&self, lines: &[String]) -> Result<Vec<String>, String> {
        let prompt = format!("{PROMPT}{}", lines.join("\n"));
        let body = serde_json::to_vec(&ChatRequest {
            model: &self.options.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            stream: false,
        })
        .map_err(|e| format!("failed to encode request: {e}"))?;

        let request = HttpRequest::post_json(self.chat_url(), body);
        let response = tokio::time::timeout(self.options.timeout, self.transport.send(request))
            .await
            .map_err(|_| format!("timed out after {:?}", self.options.timeout))?
            .map_err(|e| e.to_string())?;

        if response.status != 200 {
            return Err(format!("status {}", response.status));
        }

        let parsed: ChatResponse = serde_json::from_slice(&response.body)
            .map_err(|e| format!("failed to decode response: {e}"))?;

        let rewritten: Vec<String> = parsed
            .message
            .content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        if rewritten.is_empty() {
            return Err("empty content".to_string());
        }
        Ok(rewritten)
    }
}

#[async_trait]
impl TextRewriter for OllamaRewriter {
    async fn rewrite_lines(&self, lines: Vec<String>) -> Vec<String> {
        if lines.is_empty() {
            return lines;
        }

        match self.try_rewrite(&lines).await {
            Ok(rewritten) => {
                tracing::debug!(count = rewritten.len(), "Rephrased lines");
                rewritten
            }
            Err(reason) => {
                tracing::warn!(%reason, "Rewrite unavailable, keeping original lines");
                lines
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpError, HttpMethod, HttpResponse, MockTransport};
    use serde_json::json;

    const CHAT: &str = "http://ollama.test/api/chat";

    fn rewriter(mock: &MockTransport) -> OllamaRewriter {
        OllamaRewriter::new(
            Arc::new(mock.clone()),
            RewriteOptions {
                base_url: "http://ollama.test/".to_string(),
                ..RewriteOptions::default()
            },
        )
    }

    fn input() -> Vec<String> {
        vec!["• fix login".to_string(), "• add export".to_string()]
    }

    #[tokio::test]
    async fn pass_through_is_identity() {
        assert_eq!(PassThrough.rewrite_lines(input()).await, input());
    }

    #[tokio::test]
    async fn splits_content_into_trimmed_lines() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Post,
            CHAT,
            json!({"message": {"role": "assistant", "content": "• Fixed login\n\n  • Added export  \n"}}),
        );

        let out = rewriter(&mock).rewrite_lines(input()).await;
        assert_eq!(out, vec!["• Fixed login", "• Added export"]);

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent["model"], "gemma3");
        assert_eq!(sent["stream"], false);
        assert!(
            sent["messages"][0]["content"]
                .as_str()
                .unwrap()
                .ends_with("• fix login\n• add export")
        );
    }

    #[tokio::test]
    async fn falls_back_on_error_status() {
        let mock = MockTransport::new();
        mock.push_status(HttpMethod::Post, CHAT, 500);
        assert_eq!(rewriter(&mock).rewrite_lines(input()).await, input());
    }

    #[tokio::test]
    async fn falls_back_on_malformed_or_empty_body() {
        let mock = MockTransport::new();
        mock.push_response(
            HttpMethod::Post,
            CHAT,
            HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: b"not json".to_vec(),
            },
        );
        mock.push_json(HttpMethod::Post, CHAT, json!({"message": {"content": "   "}}));

        let rw = rewriter(&mock);
        assert_eq!(rw.rewrite_lines(input()).await, input());
        assert_eq!(rw.rewrite_lines(input()).await, input());
    }

    #[tokio::test]
    async fn falls_back_on_transport_error() {
        let mock = MockTransport::new();
        mock.push_error(
            HttpMethod::Post,
            CHAT,
            HttpError::Transport("connection refused".to_string()),
        );
        assert_eq!(rewriter(&mock).rewrite_lines(input()).await, input());
    }

    #[tokio::test]
    async fn empty_input_makes_no_request() {
        let mock = MockTransport::new();
        assert!(rewriter(&mock).rewrite_lines(Vec::new()).await.is_empty());
        assert!(mock.requests().is_empty());
    }
}
