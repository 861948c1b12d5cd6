//! Event rendering into chat-facing HTML.

use serde_json::json;

use agent_courier::protocol::event::{StreamEvent, TokenUsage, ToolKind};
use agent_courier::render::format::{escape_html, render_event, render_todo_list};

#[test]
fn escapes_html_metacharacters() {
    assert_eq!(
        escape_html("if a < b && b > c { \"quote\" }"),
        "if a &lt; b &amp;&amp; b &gt; c { \"quote\" }"
    );
    assert_eq!(escape_html("plain"), "plain");
}

#[test]
fn assistant_text_is_escaped() {
    let rendered = render_event(&StreamEvent::AssistantText {
        text: "<script>alert(1)</script>".into(),
    });
    assert_eq!(
        rendered.as_deref(),
        Some("&lt;script&gt;alert(1)&lt;/script&gt;")
    );
}

#[test]
fn session_init_names_the_model() {
    let rendered = render_event(&StreamEvent::SessionInit {
        session_id: "s".into(),
        model: Some("opus".into()),
        permission_mode: None,
    });
    assert!(rendered.expect("rendered").contains("opus"));
}

#[test]
fn shell_tool_renders_the_command() {
    let rendered = render_event(&StreamEvent::ToolInvoked {
        tool_use_id: "t".into(),
        kind: ToolKind::Shell,
        input: json!({"command": "cargo fmt"}),
    });
    assert_eq!(
        rendered.as_deref(),
        Some("\u{1f5a5} <pre>cargo fmt</pre>")
    );
}

#[test]
fn file_tools_render_the_path() {
    let rendered = render_event(&StreamEvent::ToolInvoked {
        tool_use_id: "t".into(),
        kind: ToolKind::EditFile,
        input: json!({"file_path": "src/lib.rs"}),
    });
    assert!(rendered.expect("rendered").contains("src/lib.rs"));
}

#[test]
fn successful_tool_results_are_silent() {
    let rendered = render_event(&StreamEvent::ToolResult {
        tool_use_id: "t".into(),
        is_error: false,
        content: "ok".into(),
        unmatched: false,
    });
    assert_eq!(rendered, None);
}

#[test]
fn failed_tool_results_are_surfaced() {
    let rendered = render_event(&StreamEvent::ToolResult {
        tool_use_id: "t".into(),
        is_error: true,
        content: "command exited 1".into(),
        unmatched: false,
    });
    let text = rendered.expect("rendered");
    assert!(text.contains("Tool failed"));
    assert!(text.contains("command exited 1"));
}

#[test]
fn todo_list_renders_status_markers() {
    let input = json!({"todos": [
        {"content": "done step", "status": "completed"},
        {"content": "current step", "status": "in_progress"},
        {"content": "future step", "status": "pending"},
    ]});
    let rendered = render_todo_list(&input).expect("rendered");
    let lines: Vec<&str> = rendered.lines().collect();
    assert!(lines[0].contains("Todo"));
    assert_eq!(lines[1], "\u{2611} done step");
    assert_eq!(lines[2], "\u{25b6} current step");
    assert_eq!(lines[3], "\u{2610} future step");
}

#[test]
fn empty_todo_list_renders_nothing() {
    assert_eq!(render_todo_list(&json!({"todos": []})), None);
    assert_eq!(render_todo_list(&json!({})), None);
}

#[test]
fn success_result_shows_summary_and_meta() {
    let rendered = render_event(&StreamEvent::TurnCompleted {
        is_error: false,
        result: Some("all tasks finished".into()),
        error: None,
        cost_usd: Some(0.1234),
        duration_ms: Some(2500),
        usage: TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
            ..TokenUsage::default()
        },
    })
    .expect("rendered");

    assert!(rendered.contains("Done"));
    assert!(rendered.contains("all tasks finished"));
    assert!(rendered.contains("$0.1234"));
    assert!(rendered.contains("2.5s"));
    assert!(rendered.contains("100+50 tokens"));
}

#[test]
fn error_result_shows_the_error_text() {
    let rendered = render_event(&StreamEvent::TurnCompleted {
        is_error: true,
        result: None,
        error: Some("context limit reached".into()),
        cost_usd: None,
        duration_ms: None,
        usage: TokenUsage::default(),
    })
    .expect("rendered");

    assert!(rendered.contains("Error"));
    assert!(rendered.contains("context limit reached"));
}

#[test]
fn process_exit_is_silent_after_a_result() {
    assert_eq!(
        render_event(&StreamEvent::ProcessExited {
            exit_code: Some(0),
            saw_result: true
        }),
        None
    );
    assert!(render_event(&StreamEvent::ProcessExited {
        exit_code: Some(1),
        saw_result: false
    })
    .expect("rendered")
    .contains("without producing a result"));
}
