//! Todo checklist delivery: in-place edits, dedup, and edit fallback.

use std::sync::Arc;

use agent_courier::delivery::{Cleanup, Delivery};
use agent_courier::orchestrator::Orchestrator;
use agent_courier::runner::launcher::ProcessLauncher;
use agent_courier::store::{db, session_store::SessionStore};

use super::test_helpers::{
    test_config, wait_until, FakeLauncher, FakeScript, RecordingCleanup, RecordingDelivery,
    SentMessage,
};

async fn build_with_delivery(
    script: &str,
    delivery: Arc<RecordingDelivery>,
) -> (Arc<Orchestrator>, Arc<RecordingDelivery>) {
    let pool = db::connect_memory().await.expect("memory db");
    let launcher: Arc<dyn ProcessLauncher> =
        Arc::new(FakeLauncher::new(FakeScript::Output(script.to_owned())));
    let delivery_dyn: Arc<dyn Delivery> = delivery.clone();
    let cleanup: Arc<dyn Cleanup> = Arc::new(RecordingCleanup::default());
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(test_config()),
        SessionStore::new(pool),
        delivery_dyn,
        cleanup,
        launcher,
    ));
    (orchestrator, delivery)
}

fn todo_event(id: &str, todos: &str) -> String {
    format!(
        "{{\"type\":\"assistant\",\"message\":{{\"content\":[{{\"type\":\"tool_use\",\
         \"id\":\"{id}\",\"name\":\"TodoWrite\",\"input\":{{\"todos\":{todos}}}}}]}}}}\n"
    )
}

fn todo_messages(messages: &[SentMessage]) -> Vec<SentMessage> {
    messages
        .iter()
        .filter(|m| m.text.contains("Todo"))
        .cloned()
        .collect()
}

/// A changed todo list edits the previously delivered checklist rather
/// than posting a second one.
#[tokio::test]
async fn changed_todo_list_edits_in_place() {
    let mut script = String::new();
    script.push_str("{\"type\":\"system\",\"subtype\":\"init\",\"session_id\":\"s\"}\n");
    script.push_str(&todo_event(
        "t1",
        r#"[{"content":"plan","status":"in_progress"},{"content":"build","status":"pending"}]"#,
    ));
    script.push_str(&todo_event(
        "t2",
        r#"[{"content":"plan","status":"completed"},{"content":"build","status":"in_progress"}]"#,
    ));
    script.push_str("{\"type\":\"result\",\"is_error\":false,\"result\":\"ok\"}\n");

    let (orchestrator, delivery) =
        build_with_delivery(&script, Arc::new(RecordingDelivery::new())).await;
    orchestrator
        .send("u1", "chat-1", "go")
        .await
        .expect("send accepted");

    let probe = Arc::clone(&delivery);
    wait_until(move || todo_messages(&probe.messages()).len() >= 2).await;

    let todos = todo_messages(&delivery.messages());
    assert_eq!(todos.len(), 2);
    assert_eq!(todos[0].edit_of, None);
    assert_eq!(
        todos[1].edit_of.as_deref(),
        Some(todos[0].message_ref.as_str()),
        "second checklist must edit the first"
    );
    assert!(todos[1].text.contains('\u{2611}'), "completed marker");
}

/// An identical todo replacement produces no redelivery at all.
#[tokio::test]
async fn identical_todo_list_is_not_redelivered() {
    let todos = r#"[{"content":"only step","status":"in_progress"}]"#;
    let mut script = String::new();
    script.push_str("{\"type\":\"system\",\"subtype\":\"init\",\"session_id\":\"s\"}\n");
    script.push_str(&todo_event("t1", todos));
    script.push_str(&todo_event("t2", todos));
    script.push_str("{\"type\":\"result\",\"is_error\":false,\"result\":\"ok\"}\n");

    let (orchestrator, delivery) =
        build_with_delivery(&script, Arc::new(RecordingDelivery::new())).await;
    orchestrator
        .send("u1", "chat-1", "go")
        .await
        .expect("send accepted");

    // Wait for the terminal result so all events have been handled.
    let probe = Arc::clone(&delivery);
    wait_until(move || probe.messages().iter().any(|m| m.text.contains("Done"))).await;

    assert_eq!(todo_messages(&delivery.messages()).len(), 1);
}

/// When the transport rejects the edit, the updated checklist is sent
/// fresh instead of being dropped.
#[tokio::test]
async fn failed_edit_falls_back_to_fresh_send() {
    let mut script = String::new();
    script.push_str("{\"type\":\"system\",\"subtype\":\"init\",\"session_id\":\"s\"}\n");
    script.push_str(&todo_event(
        "t1",
        r#"[{"content":"step","status":"pending"}]"#,
    ));
    script.push_str(&todo_event(
        "t2",
        r#"[{"content":"step","status":"completed"}]"#,
    ));
    script.push_str("{\"type\":\"result\",\"is_error\":false,\"result\":\"ok\"}\n");

    let (orchestrator, delivery) =
        build_with_delivery(&script, Arc::new(RecordingDelivery::failing_edits())).await;
    orchestrator
        .send("u1", "chat-1", "go")
        .await
        .expect("send accepted");

    let probe = Arc::clone(&delivery);
    wait_until(move || todo_messages(&probe.messages()).len() >= 2).await;

    let todos = todo_messages(&delivery.messages());
    assert_eq!(todos.len(), 2);
    // Both deliveries are fresh sends; the rejected edit never lands.
    assert_eq!(todos[0].edit_of, None);
    assert_eq!(todos[1].edit_of, None);
    assert!(todos[1].text.contains('\u{2611}'));
}
