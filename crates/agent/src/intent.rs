//! Intent parsing: user text to an ordered list of raw actions.
//!
//! Two tiers:
//! 1. **Model tier**: when the model is reachable, ask it for a JSON plan
//!    and pull the outermost `{ ... }` out of whatever it returns.
//! 2. **Rule tier**: a deterministic keyword table ([`crate::rules`]).
//!
//! Any failure in the model tier (unreachable, timeout, malformed JSON,
//! wrong shape) degrades to the rule tier. Parsing never fails.

use std::fmt::Write as _;
use std::sync::Arc;

use codeclaw_core::action::{RawAction, ToolKind};
use codeclaw_core::session::SessionState;
use serde_json::Value;
use tracing::{debug, info};

use crate::model::ModelClient;
use crate::rules;

const CACHE_ROLE: &str = "intent";

const SYSTEM_PROMPT: &str = "You route requests for a local coding assistant. \
Reply with a single JSON object and nothing else: no prose, no markdown.";

/// Where a parsed intent came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentSource {
    Model,
    Rules,
}

/// A short message for the user plus the actions to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedIntent {
    pub message: String,
    pub actions: Vec<RawAction>,
    pub source: IntentSource,
}

pub struct IntentParser {
    model: Arc<ModelClient>,
}

impl IntentParser {
    pub fn new(model: Arc<ModelClient>) -> Self {
        Self { model }
    }

    pub async fn parse(&self, text: &str, session: &SessionState) -> ParsedIntent {
        if !self.model.is_available().await {
            debug!("Model unavailable, using rules");
            return rules::parse(text);
        }

        let prompt = build_prompt(text, session);
        let raw = match self
            .model
            .complete(CACHE_ROLE, &prompt, Some(SYSTEM_PROMPT), &session.paths())
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                info!(error = %e, "Model call failed, using rules");
                return rules::parse(text);
            }
        };

        match from_model_output(&raw) {
            Some(intent) => intent,
            None => {
                info!(output_len = raw.len(), "Unusable model output, using rules");
                rules::parse(text)
            }
        }
    }
}

/// Prompt embedding the tool catalogue, a session summary and the request.
pub fn build_prompt(text: &str, session: &SessionState) -> String {
    let mut prompt = String::from("Turn the user's request into tool actions.\n\nTOOLS:\n");
    for kind in ToolKind::ALL {
        let _ = writeln!(prompt, "- {}: {}", kind.name(), kind.description());
    }

    let tracked: Vec<&str> = session.files().iter().take(10).map(|f| f.basename()).collect();
    prompt.push_str("\nSESSION:\n");
    if tracked.is_empty() {
        prompt.push_str("- tracked files: none\n");
    } else {
        let _ = writeln!(prompt, "- tracked files ({}): {}", session.files().len(), tracked.join(", "));
    }
    let _ = writeln!(prompt, "- history entries: {}", session.history().len());

    prompt.push_str(
        "\nFORMAT:\n{\"response\": \"brief message\", \"actions\": [{\"tool\": \"tool_name\", \"params\": {\"key\": \"value\"}}]}\n",
    );
    let _ = write!(prompt, "\nUSER REQUEST: {text}");
    prompt
}

/// The substring from the first `{` to the last `}`, parsed as JSON.
pub fn extract_json(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

/// Interpret model output; `None` means "use the rule tier".
pub fn from_model_output(raw: &str) -> Option<ParsedIntent> {
    let value = extract_json(raw)?;
    let actions = value.get("actions")?.as_array()?;
    let actions = actions
        .iter()
        .map(|item| serde_json::from_value::<RawAction>(item.clone()).ok())
        .collect::<Option<Vec<_>>>()?;

    let message = value
        .get("response")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("Processing request")
        .to_string();

    Some(ParsedIntent {
        message,
        actions,
        source: IntentSource::Model,
    })
}
