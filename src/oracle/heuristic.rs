use crate::model::action::{ActionDescriptor, ActionKind};
use crate::model::ui_tree::UiNode;
use crate::oracle::oracle::{DecisionOracle, OracleError, OracleRequest};

/// Rule-based oracle: fills the first untouched editable field, then taps
/// the first untouched clickable element, then scrolls. Deterministic, so
/// crawls against the simulated device are reproducible without any AI
/// provider.
pub struct HeuristicOracle;

/// Derive a plausible input value from an element's label or hint.
pub fn guess_value(label: &str) -> String {
    let l = label.to_lowercase();

    if l.contains("email") {
        return "user@example.com".into();
    }
    if l.contains("password") {
        return "TestPass123!".into();
    }
    if l.contains("phone") || l.contains("tel") {
        return "555-0100".into();
    }
    if l.contains("zip") || l.contains("postal") {
        return "90210".into();
    }
    if l.contains("username") || l.contains("user") {
        return "testuser".into();
    }
    if l.contains("name") {
        return "Jane Doe".into();
    }
    if l.contains("search") || l.contains("query") {
        return "test query".into();
    }
    if l.contains("date") {
        return "2025-01-15".into();
    }
    if l.contains("number") || l.contains("amount") || l.contains("quantity") {
        return "42".into();
    }

    "test".into()
}

fn identifier_of(node: &UiNode) -> Option<String> {
    node.resource_id
        .clone()
        .or_else(|| node.content_desc.clone())
        .or_else(|| node.text.clone())
}

impl DecisionOracle for HeuristicOracle {
    fn suggest(&mut self, request: &OracleRequest) -> Result<ActionDescriptor, OracleError> {
        let already_tried = |identifier: &str| {
            request
                .previous_actions
                .iter()
                .any(|a| a.contains(identifier))
        };

        let nodes = request.ui_tree.flatten();

        // Editable fields first: filling before tapping mirrors how a user
        // completes a form.
        for node in &nodes {
            if node.editable && node.enabled {
                if let Some(identifier) = identifier_of(node) {
                    if !already_tried(&identifier) {
                        let label = node
                            .text
                            .as_deref()
                            .or(node.content_desc.as_deref())
                            .unwrap_or(&identifier)
                            .to_string();
                        let value = guess_value(&label);
                        return Ok(ActionDescriptor::input(identifier, value));
                    }
                }
            }
        }

        for node in &nodes {
            if node.clickable && node.enabled && !node.editable {
                if let Some(identifier) = identifier_of(node) {
                    if !already_tried(&identifier) {
                        return Ok(ActionDescriptor::tap(identifier));
                    }
                }
            }
        }

        // Everything on this screen has been tried: scroll for new content,
        // alternating direction on repeat visits.
        let kind = if request.visit_count % 2 == 0 {
            ActionKind::ScrollUp
        } else {
            ActionKind::ScrollDown
        };
        Ok(ActionDescriptor::gesture(kind))
    }
}
