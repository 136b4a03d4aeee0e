//! Coaching conversations driven end to end through a session.

use chrono::Utc;
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use vitals_conversation::testing::ScriptedModel;
use vitals_conversation::{
    Entry, EntryKind, GenerationError, GenerationRequest, ModelEvent, ResponseUpdate, Session,
    SessionError, SessionState, ToolCallError, ToolError,
};
use vitals_health::{BloodPressureTool, CorrelatedRecord, InMemoryHealthStore};

const INSTRUCTIONS: &str = "You're a health coach. You help users manage their health by \
providing personalized recommendations based on their blood pressure data.";
const PROMPT: &str = "Check my last blood pressure and suggest recommendations";

/// Answers from the latest tool output, the way a coach model would.
fn coach_reply(request: &GenerationRequest) -> Vec<Result<ModelEvent, GenerationError>> {
    let output = request
        .transcript
        .iter()
        .rev()
        .find(|e| e.kind() == EntryKind::ToolOutput);

    let text = match output {
        Some(Entry::ToolOutput { error: None, segments, .. }) => {
            let reading = segments[0].as_structure().expect("structured reading");
            format!(
                "Your last reading was {}/{} mmHg. Keep up regular walks and watch your salt intake.",
                reading["systolic"], reading["diastolic"]
            )
        }
        Some(Entry::ToolOutput { error: Some(_), .. }) => {
            "I couldn't find any blood pressure readings. Try recording one first.".to_string()
        }
        _ => "I need a reading first.".to_string(),
    };
    text.split_inclusive(' ')
        .map(|word| Ok(ModelEvent::text(word)))
        .collect()
}

fn coach_session(store: InMemoryHealthStore, model: ScriptedModel) -> Session {
    Session::builder(Arc::new(model))
        .instructions(INSTRUCTIONS)
        .tool(BloodPressureTool::new(Arc::new(store)))
        .build()
        .expect("build session")
}

fn reading_model() -> ScriptedModel {
    ScriptedModel::new()
        .with_turn(vec![ModelEvent::tool_call("blood_pressure", json!({}))])
        .with_reply(coach_reply)
}

#[tokio::test]
async fn reports_latest_reading() {
    let store = InMemoryHealthStore::with_records(vec![CorrelatedRecord::blood_pressure(
        Utc::now(),
        128.0,
        82.0,
    )]);
    let session = coach_session(store, reading_model());

    let text = session
        .submit(PROMPT)
        .expect("submit")
        .collect_text()
        .await
        .expect("response");
    assert!(text.contains("128/82"), "response was {text:?}");

    let transcript = session.transcript();
    let entries = transcript.entries();
    assert_eq!(
        transcript.kinds(),
        vec![
            EntryKind::Instructions,
            EntryKind::Prompt,
            EntryKind::ToolCall,
            EntryKind::ToolOutput,
            EntryKind::Response,
        ]
    );
    let output = entries[3].segments()[0].as_structure().expect("reading");
    assert_eq!(
        serde_json::Value::Object(output.clone()),
        json!({"systolic": 128, "diastolic": 82})
    );
    assert!(entries[4].text().contains("128/82"));
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn acknowledges_missing_reading() {
    let session = coach_session(InMemoryHealthStore::new(), reading_model());

    let text = session
        .submit(PROMPT)
        .expect("submit")
        .collect_text()
        .await
        .expect("response");
    assert!(text.contains("couldn't find"));
    assert!(!text.chars().any(|c| c.is_ascii_digit()));

    let transcript = session.transcript();
    let output = &transcript.entries()[3];
    match output {
        Entry::ToolOutput { error, .. } => assert_eq!(
            error,
            &Some(ToolError::MissingData {
                description: "Missing blood pressure data".to_string()
            })
        ),
        other => panic!("expected tool output, got {other:?}"),
    }
    assert_eq!(transcript.last().map(Entry::kind), Some(EntryKind::Response));
}

#[tokio::test]
async fn unknown_tool_fails_the_cycle() {
    let model = ScriptedModel::new()
        .with_turn(vec![ModelEvent::tool_call("unknown_tool", json!({}))]);
    let session = coach_session(InMemoryHealthStore::new(), model);

    let updates: Vec<_> = session.submit(PROMPT).expect("submit").collect().await;
    assert!(matches!(
        &updates[..],
        [Ok(ResponseUpdate::ToolCalled { name, .. }), Err(_)] if name == "unknown_tool"
    ));
    assert_eq!(
        updates[1],
        Err(SessionError::ToolCall(ToolCallError::UnknownTool {
            name: "unknown_tool".to_string()
        }))
    );
    assert_eq!(session.state(), SessionState::Error);
    assert_eq!(session.transcript().last().map(Entry::kind), Some(EntryKind::ToolCall));
}

#[tokio::test]
async fn denied_access_is_reported_to_the_model() {
    let store = InMemoryHealthStore::with_records(vec![CorrelatedRecord::blood_pressure(
        Utc::now(),
        128.0,
        82.0,
    )])
    .deny_authorization("user declined");
    let session = coach_session(store, reading_model());

    let text = session
        .submit(PROMPT)
        .expect("submit")
        .collect_text()
        .await
        .expect("response");
    assert!(!text.contains("128"));

    let transcript = session.transcript();
    match &transcript.entries()[3] {
        Entry::ToolOutput { error, .. } => {
            assert!(matches!(error, Some(ToolError::AuthorizationDenied { .. })));
        }
        other => panic!("expected tool output, got {other:?}"),
    }
}
