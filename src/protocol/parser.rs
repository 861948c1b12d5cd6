//! Classification of decoded JSONL lines into [`StreamEvent`]s.
//!
//! The parser is pure with respect to I/O: it takes one complete line and
//! produces zero or more events, preserving the order of items inside an
//! assistant content array. It is tolerant by construction — unknown
//! fields are ignored, unknown top-level types are skipped with a `DEBUG`
//! log, and a malformed line yields exactly one
//! [`StreamEvent::ParseFailure`] instead of an error.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::protocol::event::{StreamEvent, TokenUsage, ToolKind};

// ── Wire shapes ──────────────────────────────────────────────────────────────

/// Top-level JSONL envelope emitted by the assistant CLI.
///
/// Only the fields referenced by the bridge are named; everything else on
/// the wire is ignored.
#[derive(Debug, Deserialize)]
struct Envelope {
    /// Top-level discriminator (`system`, `assistant`, `user`, `result`).
    #[serde(rename = "type")]
    kind: String,
    subtype: Option<String>,
    session_id: Option<String>,
    model: Option<String>,
    #[serde(rename = "permissionMode")]
    permission_mode: Option<String>,
    message: Option<WireMessage>,
    is_error: Option<bool>,
    result: Option<Value>,
    error: Option<String>,
    cost_usd: Option<f64>,
    total_cost_usd: Option<f64>,
    duration_ms: Option<u64>,
    usage: Option<TokenUsage>,
}

/// Inner `message` object carried by `assistant` and `user` envelopes.
#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: WireContent,
}

/// Message content: either a structured item array or a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireContent {
    Items(Vec<ContentItem>),
    Text(String),
}

impl Default for WireContent {
    fn default() -> Self {
        Self::Items(Vec::new())
    }
}

/// One element of a structured content array.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentItem {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: bool,
    },
    /// Any content type this bridge does not render.
    #[serde(other)]
    Other,
}

// ── Parser ───────────────────────────────────────────────────────────────────

/// Stateful line classifier for one subprocess invocation.
///
/// The only state is the set of tool-invocation identifiers seen so far,
/// used to flag tool results that reference an unknown invocation
/// (a protocol violation that is delivered flagged, not dropped).
#[derive(Debug, Default)]
pub struct StreamParser {
    seen_tool_ids: HashSet<String>,
}

impl StreamParser {
    /// Create a parser with no recorded tool invocations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one complete line into its ordered events.
    ///
    /// Empty and whitespace-only lines produce no events. A line that is
    /// not valid protocol JSON produces exactly one
    /// [`StreamEvent::ParseFailure`].
    pub fn parse_line(&mut self, line: &str) -> Vec<StreamEvent> {
        if line.trim().is_empty() {
            return Vec::new();
        }

        let envelope: Envelope = match serde_json::from_str(line) {
            Ok(envelope) => envelope,
            Err(err) => {
                return vec![StreamEvent::ParseFailure {
                    line: line.to_owned(),
                    error: err.to_string(),
                }];
            }
        };

        match envelope.kind.as_str() {
            "system" => parse_system(&envelope),
            "assistant" => self.parse_assistant(envelope),
            "user" => self.parse_user(envelope),
            "result" => vec![parse_result(envelope)],
            other => {
                debug!(kind = other, "skipping unknown stream envelope type");
                Vec::new()
            }
        }
    }

    /// Events for an `assistant` envelope: one per content item, in order.
    fn parse_assistant(&mut self, envelope: Envelope) -> Vec<StreamEvent> {
        let Some(message) = envelope.message else {
            return Vec::new();
        };

        match message.content {
            WireContent::Text(text) => vec![StreamEvent::AssistantText { text }],
            WireContent::Items(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    ContentItem::Text { text } => Some(StreamEvent::AssistantText { text }),
                    ContentItem::Thinking { thinking } => {
                        Some(StreamEvent::AssistantThinking { text: thinking })
                    }
                    ContentItem::ToolUse { id, name, input } => {
                        self.seen_tool_ids.insert(id.clone());
                        Some(StreamEvent::ToolInvoked {
                            tool_use_id: id,
                            kind: ToolKind::classify(&name),
                            input,
                        })
                    }
                    ContentItem::ToolResult { .. } | ContentItem::Other => None,
                })
                .collect(),
        }
    }

    /// Events for a `user` envelope: tool results only.
    fn parse_user(&mut self, envelope: Envelope) -> Vec<StreamEvent> {
        let Some(message) = envelope.message else {
            return Vec::new();
        };

        let WireContent::Items(items) = message.content else {
            return Vec::new();
        };

        items
            .into_iter()
            .filter_map(|item| match item {
                ContentItem::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => {
                    let unmatched = !self.seen_tool_ids.contains(&tool_use_id);
                    if unmatched {
                        debug!(tool_use_id, "tool result references unknown invocation");
                    }
                    Some(StreamEvent::ToolResult {
                        tool_use_id,
                        is_error,
                        content: flatten_content(&content),
                        unmatched,
                    })
                }
                _ => None,
            })
            .collect()
    }
}

/// Event for a `system` envelope; only the `init` subtype carries data.
fn parse_system(envelope: &Envelope) -> Vec<StreamEvent> {
    if envelope.subtype.as_deref() != Some("init") {
        return Vec::new();
    }
    let Some(session_id) = envelope.session_id.clone() else {
        return Vec::new();
    };
    vec![StreamEvent::SessionInit {
        session_id,
        model: envelope.model.clone(),
        permission_mode: envelope.permission_mode.clone(),
    }]
}

/// Event for the terminal `result` envelope.
fn parse_result(envelope: Envelope) -> StreamEvent {
    let result_text = envelope.result.as_ref().map(flatten_content);
    StreamEvent::TurnCompleted {
        is_error: envelope.is_error.unwrap_or(false),
        result: result_text,
        error: envelope.error,
        // Older CLI builds report `cost_usd`, newer ones `total_cost_usd`.
        cost_usd: envelope.cost_usd.or(envelope.total_cost_usd),
        duration_ms: envelope.duration_ms,
        usage: envelope.usage.unwrap_or_default(),
    }
}

/// Flatten a wire content value into plain text.
///
/// Strings pass through; arrays of `{type: "text", text: …}` items are
/// concatenated; anything else falls back to compact JSON.
fn flatten_content(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
