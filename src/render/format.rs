//! Stream-event rendering into chat-facing HTML.
//!
//! Pure helpers mapping each [`StreamEvent`] to the text shown to the
//! user, or `None` when the event is bookkeeping-only. Untrusted content
//! (assistant output, tool input, stderr) is always HTML-escaped.

use serde_json::Value;

use crate::protocol::event::{StreamEvent, TokenUsage, ToolKind};

/// Escape text for inclusion in HTML-formatted chat messages.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

/// Render one stream event as outbound HTML, or `None` for events that
/// produce no user-visible message.
#[must_use]
pub fn render_event(event: &StreamEvent) -> Option<String> {
    match event {
        StreamEvent::SessionInit { model, .. } => {
            let model = model.as_deref().unwrap_or("default");
            Some(format!("\u{1f680} Session started ({})", escape_html(model)))
        }
        StreamEvent::AssistantText { text } => Some(escape_html(text)),
        StreamEvent::AssistantThinking { text } => {
            Some(format!("\u{1f4ad} <i>{}</i>", escape_html(text)))
        }
        StreamEvent::ToolInvoked { kind, input, .. } => render_tool(kind, input),
        StreamEvent::ToolResult {
            is_error, content, ..
        } => {
            if *is_error {
                Some(format!(
                    "\u{26a0} Tool failed:\n<pre>{}</pre>",
                    escape_html(content)
                ))
            } else {
                None
            }
        }
        StreamEvent::TurnCompleted {
            is_error,
            result,
            error,
            cost_usd,
            duration_ms,
            usage,
        } => Some(render_result(
            *is_error,
            result.as_deref(),
            error.as_deref(),
            *cost_usd,
            *duration_ms,
            usage,
        )),
        StreamEvent::ParseFailure { error, .. } => Some(format!(
            "\u{26a0} Skipped one unreadable line from the assistant ({})",
            escape_html(error)
        )),
        StreamEvent::StderrLine { text } => Some(format!(
            "\u{26a0} <code>{}</code>",
            escape_html(text)
        )),
        StreamEvent::ProcessExited { saw_result, .. } => {
            if *saw_result {
                None
            } else {
                Some("\u{26a0} Assistant exited without producing a result".to_owned())
            }
        }
    }
}

/// Headline for a tool invocation, specialized by kind.
fn render_tool(kind: &ToolKind, input: &Value) -> Option<String> {
    let path = input.get("file_path").and_then(Value::as_str);
    match kind {
        ToolKind::TodoWrite => render_todo_list(input),
        ToolKind::EditFile => Some(format!(
            "\u{270f} Editing <code>{}</code>",
            escape_html(path.unwrap_or("file"))
        )),
        ToolKind::WriteFile => Some(format!(
            "\u{1f4dd} Writing <code>{}</code>",
            escape_html(path.unwrap_or("file"))
        )),
        ToolKind::ReadFile => Some(format!(
            "\u{1f4d6} Reading <code>{}</code>",
            escape_html(path.unwrap_or("file"))
        )),
        ToolKind::Shell => {
            let command = input.get("command").and_then(Value::as_str).unwrap_or("");
            Some(format!("\u{1f5a5} <pre>{}</pre>", escape_html(command)))
        }
        ToolKind::Subtask => {
            let description = input
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("subtask");
            Some(format!("\u{1f500} Subtask: {}", escape_html(description)))
        }
        ToolKind::External(name) | ToolKind::Unknown(name) => {
            Some(format!("\u{1f527} <code>{}</code>", escape_html(name)))
        }
    }
}

/// Render a todo-list replacement as a checklist.
///
/// Returns `None` when the input carries no todo items.
#[must_use]
pub fn render_todo_list(input: &Value) -> Option<String> {
    let todos = input.get("todos").and_then(Value::as_array)?;
    if todos.is_empty() {
        return None;
    }

    let mut lines = vec!["\u{1f4cb} <b>Todo</b>".to_owned()];
    for todo in todos {
        let content = todo.get("content").and_then(Value::as_str).unwrap_or("");
        let status = todo.get("status").and_then(Value::as_str).unwrap_or("");
        let marker = match status {
            "completed" => "\u{2611}",
            "in_progress" => "\u{25b6}",
            _ => "\u{2610}",
        };
        lines.push(format!("{marker} {}", escape_html(content)));
    }
    Some(lines.join("\n"))
}

/// Summary line for the terminal result of a turn.
fn render_result(
    is_error: bool,
    result: Option<&str>,
    error: Option<&str>,
    cost_usd: Option<f64>,
    duration_ms: Option<u64>,
    usage: &TokenUsage,
) -> String {
    let mut out = String::new();

    if is_error {
        out.push_str("\u{274c} <b>Error</b>");
        if let Some(error) = error {
            out.push('\n');
            out.push_str(&escape_html(error));
        }
    } else {
        out.push_str("\u{2705} <b>Done</b>");
        if let Some(result) = result {
            if !result.is_empty() {
                out.push('\n');
                out.push_str(&escape_html(result));
            }
        }
    }

    let mut meta = Vec::new();
    if let Some(cost) = cost_usd {
        meta.push(format!("${cost:.4}"));
    }
    if let Some(ms) = duration_ms {
        meta.push(format!("{:.1}s", f64_from_ms(ms)));
    }
    if usage.total() > 0 {
        meta.push(format!(
            "{}+{} tokens",
            usage.input_tokens, usage.output_tokens
        ));
    }
    if !meta.is_empty() {
        out.push('\n');
        out.push_str(&format!("<i>{}</i>", meta.join(" \u{b7} ")));
    }

    out
}

#[allow(clippy::cast_precision_loss)]
fn f64_from_ms(ms: u64) -> f64 {
    ms as f64 / 1000.0
}
