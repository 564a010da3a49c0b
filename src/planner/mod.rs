//! LLM planner: turns a free-text request into an ordered list of task
//! identifiers.
//!
//! The orchestrator only depends on the [`Planner`] capability; the HTTP
//! client below talks to any OpenAI-compatible chat-completions endpoint.
//! The planner prompt is rendered from the task registry, which is the
//! single source of truth for the available tools.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PlanningError;
use crate::registry::TaskRegistry;

const PLANNER_PROMPT_TEMPLATE: &str = "System Task:\n\
You are a planning assistant. Analyze the user's request and determine the \
sequence of tools needed.\n\
Respond ONLY with a valid JSON list containing the names of the tools in the \
correct order.\n\
Do not include any other text, explanations, or markdown formatting around \
the JSON list.\n\n\
Available Tools:\n\
{tools}\n\
User Request: {request}\n\n\
Your Plan (JSON list only):";

/// Capability for producing an ordered plan from a request string.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Returns the ordered list of task identifiers for the request.
    async fn plan(&self, request: &str) -> Result<Vec<String>, PlanningError>;
}

/// A message in a chat-completions conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

impl Message {
    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Planner backed by an OpenAI-compatible chat-completions API.
pub struct LlmPlanner {
    api_base: String,
    api_key: Option<String>,
    model: String,
    tools_block: String,
    http_client: Client,
}

impl LlmPlanner {
    /// Creates a planner with explicit configuration.
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        registry: &TaskRegistry,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key,
            model: model.into(),
            tools_block: render_tools_block(registry),
            http_client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Creates a planner from environment variables.
    ///
    /// Reads:
    /// - `LLM_API_BASE`: base URL for the API (required)
    /// - `LLM_API_KEY`: API key for authentication (optional)
    /// - `LLM_PLANNER_MODEL`: model id (defaults to "google/gemini-2.0-flash")
    ///
    /// # Errors
    ///
    /// Returns `PlanningError::MissingApiBase` if `LLM_API_BASE` is not set.
    pub fn from_env(registry: &TaskRegistry) -> Result<Self, PlanningError> {
        let api_base = env::var("LLM_API_BASE").map_err(|_| PlanningError::MissingApiBase)?;
        let api_key = env::var("LLM_API_KEY").ok();
        let model = env::var("LLM_PLANNER_MODEL")
            .unwrap_or_else(|_| "google/gemini-2.0-flash".to_string());

        Ok(Self::new(api_base, api_key, model, registry))
    }

    fn render_prompt(&self, request: &str) -> String {
        PLANNER_PROMPT_TEMPLATE
            .replace("{tools}", &self.tools_block)
            .replace("{request}", request)
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(&self, request: &str) -> Result<Vec<String>, PlanningError> {
        debug!(model = %self.model, "Requesting plan");

        let body = ChatRequest {
            model: self.model.clone(),
            // Deterministic planning
            temperature: 0.0,
            messages: vec![Message::user(self.render_prompt(request))],
        };

        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let mut http_request = self.http_client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| PlanningError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PlanningError::ApiError {
                code: status.as_u16(),
                message,
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| PlanningError::ParseError(e.to_string()))?;

        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or(PlanningError::EmptyResponse)?;

        let plan = parse_plan(content)?;
        debug!(?plan, "Planner returned plan");
        Ok(plan)
    }
}

fn render_tools_block(registry: &TaskRegistry) -> String {
    registry
        .descriptors()
        .iter()
        .map(|d| format!("- '{}': {}", d.id, d.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses a JSON list of strings out of a completion, tolerating markdown
/// fences and surrounding prose.
fn parse_plan(content: &str) -> Result<Vec<String>, PlanningError> {
    let json = extract_json_array(content).ok_or_else(|| {
        PlanningError::ParseError(format!(
            "No JSON list found in planner response: '{}'",
            preview(content)
        ))
    })?;

    serde_json::from_str::<Vec<String>>(json).map_err(|e| {
        PlanningError::ParseError(format!("Planner response is not a list of strings: {e}"))
    })
}

/// Finds the first balanced JSON array in the content.
fn extract_json_array(content: &str) -> Option<&str> {
    let start = content.find('[')?;
    let bytes = content.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

fn preview(content: &str) -> &str {
    let end = content
        .char_indices()
        .take(80)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    &content[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_plain_json() {
        let plan = parse_plan(r#"["summarizer-service", "translator-service"]"#).unwrap();
        assert_eq!(plan, vec!["summarizer-service", "translator-service"]);
    }

    #[test]
    fn test_parse_plan_markdown_fenced() {
        let content = "```json\n[\"summarizer-service\"]\n```";
        let plan = parse_plan(content).unwrap();
        assert_eq!(plan, vec!["summarizer-service"]);
    }

    #[test]
    fn test_parse_plan_with_surrounding_prose() {
        let content = "Here is the plan: [\"pdf-reader-service\", \"summarizer-service\"] done.";
        let plan = parse_plan(content).unwrap();
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_parse_plan_empty_list() {
        let plan = parse_plan("[]").unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_parse_plan_not_a_list() {
        let err = parse_plan(r#"{"plan": "summarizer-service"}"#).unwrap_err();
        assert!(matches!(err, PlanningError::ParseError(_)));
    }

    #[test]
    fn test_parse_plan_wrong_element_type() {
        let err = parse_plan("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, PlanningError::ParseError(_)));
    }

    #[test]
    fn test_extract_json_array_handles_brackets_in_strings() {
        let content = r#"["a]b", "c"]"#;
        assert_eq!(extract_json_array(content), Some(content));
    }

    #[test]
    fn test_render_tools_block_lists_registry() {
        let block = render_tools_block(&TaskRegistry::builtin());
        assert!(block.contains("- 'summarizer-service':"));
        assert!(block.contains("- 'translator-service':"));
        assert!(block.lines().count() >= 5);
    }

    #[test]
    fn test_render_prompt_contains_request() {
        let planner = LlmPlanner::new(
            "http://localhost:4000",
            None,
            "test-model",
            &TaskRegistry::builtin(),
        );
        let prompt = planner.render_prompt("Summarize this and translate to German");
        assert!(prompt.contains("translate to German"));
        assert!(prompt.contains("JSON list"));
        assert!(prompt.contains("summarizer-service"));
    }
}
