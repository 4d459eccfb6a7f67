//! End-to-end turns through `AgentRuntime` with a scripted engine.

use tiller_agent::{
    AgentRuntime, BlockingGenerator, GenerationError, GenerationRequest, ScriptedGenerator,
    UnavailableGenerator,
};
use tiller_core::config::AppConfig;
use tiller_core::errors::{ExtractionError, TurnError};

const RIVERLITE: &str = "RiverLite 2–6hp (portable)";

const SCENARIO_ONE_OUTPUT: &str = "<think>\nThe user has a kayak, so a portable line fits.\n</think>\n\
{\"reply\":\"Got it — the RiverLite should work. What's your email?\",\"selected_lines\":[\"RiverLite 2–6hp (portable)\"],\"ask_email\":true,\"email\":null,\"done\":false}";

fn runtime(outputs: &[&str]) -> AgentRuntime<ScriptedGenerator> {
    AgentRuntime::new(ScriptedGenerator::new(outputs.iter().copied()), &AppConfig::default())
}

#[tokio::test]
async fn scenario_small_motor_for_kayak_selects_one_line() {
    let mut runtime = runtime(&[SCENARIO_ONE_OUTPUT]);

    let turn = runtime.handle_user_turn("I want a small motor for my kayak").await;

    assert_eq!(turn.reply, "Got it — the RiverLite should work. What's your email?");
    assert!(turn.changed);
    assert!(turn.failure.is_none());

    let snapshot = runtime.snapshot();
    assert_eq!(snapshot.selected_items, vec![RIVERLITE.to_string()]);
    assert_eq!(snapshot.contact_address, None);
    assert!(!snapshot.is_complete);
}

#[tokio::test]
async fn scenario_email_completes_the_conversation() {
    let mut runtime = runtime(&[
        SCENARIO_ONE_OUTPUT,
        r#"{"reply":"Thanks Jane, a specialist will be in touch.","selected_lines":["RiverLite 2–6hp (portable)"],"ask_email":false,"email":"jane@example.com","done":true}"#,
    ]);

    runtime.handle_user_turn("I want a small motor for my kayak").await;
    let turn = runtime.handle_user_turn("it's jane@example.com").await;

    assert!(turn.changed);
    let snapshot = runtime.snapshot();
    assert_eq!(snapshot.contact_address.as_deref(), Some("jane@example.com"));
    assert_eq!(snapshot.selected_items.len(), 1);
    assert!(snapshot.is_complete);
}

#[tokio::test]
async fn scenario_prose_output_reports_non_json_and_keeps_state() {
    let mut runtime = runtime(&[
        SCENARIO_ONE_OUTPUT,
        "Sure! The RiverLite is a great little motor for kayaks.",
    ]);
    runtime.handle_user_turn("I want a small motor for my kayak").await;
    let before = runtime.snapshot();

    let turn = runtime.handle_user_turn("tell me more").await;

    assert!(turn.reply.starts_with("The model did not return JSON."));
    assert!(turn.reply.contains("great little motor"));
    assert!(!turn.changed);
    assert!(matches!(
        turn.failure,
        Some(TurnError::ExtractionFailed { source: ExtractionError::NoObject, .. })
    ));
    assert_eq!(runtime.snapshot(), before);
}

#[tokio::test]
async fn scenario_invalid_email_and_empty_lines_change_nothing() {
    let mut runtime = runtime(&[
        r#"{"reply":"ok","selected_lines":[],"ask_email":false,"email":"not-an-email","done":false}"#,
    ]);

    let turn = runtime.handle_user_turn("my email is not-an-email").await;

    assert_eq!(turn.reply, "ok");
    assert!(!turn.changed);
    assert!(turn.failure.is_none());
    assert_eq!(runtime.snapshot().contact_address, None);
}

#[tokio::test]
async fn repeated_response_is_idempotent() {
    let mut runtime = runtime(&[SCENARIO_ONE_OUTPUT, SCENARIO_ONE_OUTPUT]);

    let first = runtime.handle_user_turn("kayak motor").await;
    let second = runtime.handle_user_turn("kayak motor again").await;

    assert!(first.changed);
    assert!(!second.changed);
    assert_eq!(runtime.snapshot().selected_items, vec![RIVERLITE.to_string()]);
}

#[tokio::test]
async fn long_prose_preview_is_truncated() {
    let long_output = "x".repeat(600);
    let mut runtime = runtime(&[long_output.as_str()]);

    let turn = runtime.handle_user_turn("hello").await;

    let preview = turn
        .reply
        .strip_prefix("The model did not return JSON. Raw output: ")
        .expect("diagnostic prefix");
    assert_eq!(preview.chars().count(), 501);
    assert!(preview.ends_with('…'));
}

#[tokio::test]
async fn malformed_object_yields_apology() {
    let mut runtime = runtime(&[r#"Here you go: {"reply": "ok", "selected_lines": "RiverLite"}"#]);

    let turn = runtime.handle_user_turn("hello").await;

    assert_eq!(turn.reply, AppConfig::default().replies.parse_failure);
    assert!(!turn.changed);
    assert!(matches!(turn.failure, Some(TurnError::ParseFailed(_))));
}

#[tokio::test]
async fn unavailable_engine_surfaces_message() {
    let mut runtime =
        AgentRuntime::new(UnavailableGenerator::new("model not loaded"), &AppConfig::default());

    let turn = runtime.handle_user_turn("hello").await;

    assert!(turn.reply.contains("model not loaded"));
    assert!(!turn.changed);
    assert_eq!(turn.failure, Some(TurnError::GenerationUnavailable("model not loaded".to_string())));
    assert_eq!(runtime.snapshot(), Default::default());
}

#[tokio::test]
async fn failed_turn_does_not_block_the_next_one() {
    let generator = ScriptedGenerator::default();
    generator.push_failure(GenerationError::Failed("out of memory".to_string()));
    generator.push_output(SCENARIO_ONE_OUTPUT);
    let mut runtime = AgentRuntime::new(generator, &AppConfig::default());

    let failed = runtime.handle_user_turn("kayak motor").await;
    let retried = runtime.handle_user_turn("kayak motor").await;

    assert_eq!(failed.failure, Some(TurnError::Generation("out of memory".to_string())));
    assert!(failed.reply.contains("out of memory"));
    assert!(retried.changed);
    assert_eq!(runtime.snapshot().selected_items, vec![RIVERLITE.to_string()]);
}

#[tokio::test]
async fn blocking_engine_drives_a_full_turn() {
    let generator = BlockingGenerator::new(|request: &GenerationRequest| {
        let reply = if request.prompt.contains("/no_think kayak") {
            r#"{"reply":"RiverLite.","selected_lines":["RiverLite 2–6hp (portable)"]}"#
        } else {
            r#"{"reply":"Which boat?"}"#
        };
        Ok(reply.to_string())
    });
    let mut runtime = AgentRuntime::new(generator, &AppConfig::default());

    let turn = runtime.handle_user_turn("kayak").await;

    assert_eq!(turn.reply, "RiverLite.");
    assert!(turn.changed);
}

#[tokio::test]
async fn snapshot_serializes_for_display() {
    let mut runtime = runtime(&[SCENARIO_ONE_OUTPUT]);
    runtime.handle_user_turn("kayak").await;

    let json = serde_json::to_value(runtime.snapshot()).expect("snapshot serializes");

    assert_eq!(json["selected_items"][0], RIVERLITE);
    assert_eq!(json["contact_address"], serde_json::Value::Null);
    assert_eq!(json["is_complete"], false);
}
