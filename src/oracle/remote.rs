use serde::{Deserialize, Serialize};

use crate::model::action::{ActionDescriptor, ActionKind, BoundingBox};
use crate::model::ui_tree::UiNode;
use crate::oracle::oracle::{DecisionOracle, OracleError, OracleRequest};

/// Oracle backed by an LLM endpoint with an Ollama-style generate API.
pub struct RemoteOracle {
    pub endpoint: String,
    pub model: String,
}

impl Default for RemoteOracle {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "qwen2.5:1.5b".to_string(),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    format: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct SuggestedAction {
    action: String,
    #[serde(default)]
    target_identifier: Option<String>,
    #[serde(default)]
    input_text: Option<String>,
    #[serde(default)]
    target_bounding_box: Option<BoundingBox>,
    #[serde(default)]
    reasoning: Option<String>,
}

impl RemoteOracle {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
        }
    }

    fn summarize_tree(tree: &UiNode) -> String {
        let mut lines = Vec::new();
        for node in tree.flatten() {
            if !node.clickable && !node.editable && node.text.is_none() {
                continue;
            }
            let mut parts = Vec::new();
            if let Some(id) = &node.resource_id {
                parts.push(format!("id={}", id));
            }
            if let Some(text) = &node.text {
                parts.push(format!("text=\"{}\"", text));
            }
            if let Some(desc) = &node.content_desc {
                parts.push(format!("desc=\"{}\"", desc));
            }
            if node.editable {
                parts.push("editable".into());
            } else if node.clickable {
                parts.push("clickable".into());
            }
            if !parts.is_empty() {
                lines.push(format!("  - {}", parts.join(", ")));
            }
            if lines.len() >= 40 {
                break;
            }
        }
        lines.join("\n")
    }

    fn build_prompt(&self, request: &OracleRequest) -> String {
        let elements = Self::summarize_tree(request.ui_tree);
        let history = if request.previous_actions.is_empty() {
            "(none)".to_string()
        } else {
            request.previous_actions.join("; ")
        };
        let feedback = request.last_feedback.unwrap_or("(none)");

        format!(
            r#"You are a mobile UI exploration agent. Decide the next action for the current screen.

SCREEN (visited {} times this run):
{}

PREVIOUS ACTIONS ON THIS SCREEN: {}
LAST ACTION FEEDBACK: {}

AVAILABLE ACTIONS (respond with exactly one as JSON):
{{"action":"tap","target_identifier":"..."}}
{{"action":"input","target_identifier":"...","input_text":"..."}}
{{"action":"scroll_down"}} / {{"action":"scroll_up"}}
{{"action":"swipe_left"}} / {{"action":"swipe_right"}}
{{"action":"back"}}
{{"action":"long_press","target_identifier":"..."}}

Prefer elements not yet tried. Respond with ONLY valid JSON, no explanation."#,
            request.visit_count, elements, history, feedback
        )
    }

    fn parse_response(&self, response: &str) -> Result<ActionDescriptor, OracleError> {
        let parsed: SuggestedAction = serde_json::from_str(response)
            .map_err(|e| OracleError::InvalidResponse(format!("bad JSON: {}", e)))?;

        let kind = match parsed.action.as_str() {
            "tap" | "click" => ActionKind::Tap,
            "input" => ActionKind::Input,
            "scroll_down" => ActionKind::ScrollDown,
            "scroll_up" => ActionKind::ScrollUp,
            "swipe_left" => ActionKind::SwipeLeft,
            "swipe_right" => ActionKind::SwipeRight,
            "back" => ActionKind::Back,
            "long_press" => ActionKind::LongPress,
            other => {
                return Err(OracleError::InvalidResponse(format!(
                    "unknown action '{}'",
                    other
                )));
            }
        };

        if kind.needs_target() && parsed.target_identifier.is_none() && parsed.target_bounding_box.is_none()
        {
            return Err(OracleError::InvalidResponse(format!(
                "action '{}' needs a target",
                parsed.action
            )));
        }
        if kind == ActionKind::Input && parsed.input_text.is_none() {
            return Err(OracleError::InvalidResponse("input without input_text".into()));
        }
        if let Some(reasoning) = &parsed.reasoning {
            println!("Oracle reasoning: {}", reasoning);
        }

        Ok(ActionDescriptor {
            kind,
            target_identifier: parsed.target_identifier,
            bounding_box: parsed.target_bounding_box,
            input_text: parsed.input_text,
        })
    }
}

impl DecisionOracle for RemoteOracle {
    fn suggest(&mut self, request: &OracleRequest) -> Result<ActionDescriptor, OracleError> {
        let body = GenerateRequest {
            model: self.model.clone(),
            prompt: self.build_prompt(request),
            stream: false,
            format: "json",
        };

        let client = reqwest::blocking::Client::new();
        let response = client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        let generated: GenerateResponse = response
            .json()
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

        self.parse_response(&generated.response)
    }
}
