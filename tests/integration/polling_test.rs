//! Polling Fallback Integration Tests
//!
//! Resuming a conversation whose invocation is still running, automatic
//! poll termination, the single-timer invariant, and stopping a polled
//! invocation.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use deep_research_client::models::{GraphStep, InvocationStatus};
use deep_research_client::{ChatSession, SessionStatus};

use crate::support::MockBackend;

const TEST_POLL_INTERVAL: Duration = Duration::from_millis(20);

fn polling_session(backend: &Arc<MockBackend>) -> Arc<ChatSession> {
    Arc::new(ChatSession::with_poll_interval(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        TEST_POLL_INTERVAL,
    ))
}

fn seed_running_conversation(backend: &MockBackend) -> String {
    backend.seed_conversation(vec![
        MockBackend::human_turn("t-1", "why is the sky blue"),
        MockBackend::ai_turn("t-2", Some("inv-1")),
    ])
}

async fn eventually<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_resume_running_conversation_starts_polling() {
    let backend = MockBackend::new();
    backend.set_invocation("running", vec![GraphStep::new("research")], None);
    let conversation_id = seed_running_conversation(&backend);

    let session = polling_session(&backend);
    session
        .load_conversation(&conversation_id, "p-1")
        .await
        .unwrap();

    assert_eq!(session.status(), SessionStatus::Running);
    assert!(session.is_polling().await);
    // No stream is (re)opened for a resumed invocation
    assert_eq!(backend.streams_opened.load(Ordering::SeqCst), 0);

    // Polling stops by itself once the invocation turns terminal
    backend.set_invocation(
        "completed",
        vec![GraphStep::new("research"), GraphStep::new("synthesize")],
        Some("Rayleigh scattering."),
    );
    {
        let session = session.clone();
        eventually(move || session.status() == SessionStatus::Idle).await;
    }

    let message = session.store().get("t-2").await.unwrap();
    let content = message.ai_content().unwrap();
    assert_eq!(content.status, InvocationStatus::Completed);
    assert_eq!(
        content.final_result.as_deref(),
        Some("Rayleigh scattering.")
    );

    for _ in 0..200 {
        if !session.is_polling().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!session.is_polling().await);

    // No orphaned timer keeps fetching after terminal state
    let fetches = backend.invocation_fetches.load(Ordering::SeqCst);
    tokio::time::sleep(TEST_POLL_INTERVAL * 4).await;
    assert_eq!(backend.invocation_fetches.load(Ordering::SeqCst), fetches);
}

#[tokio::test]
async fn test_reload_does_not_stack_timers() {
    let backend = MockBackend::new();
    backend.set_invocation("running", vec![], None);
    let conversation_id = seed_running_conversation(&backend);

    let session = polling_session(&backend);
    session
        .load_conversation(&conversation_id, "p-1")
        .await
        .unwrap();
    session
        .load_conversation(&conversation_id, "p-1")
        .await
        .unwrap();

    assert!(session.is_polling().await);

    // With one timer at a 20ms interval, a 200ms window sees roughly ten
    // fetches; stacked timers would double that.
    let baseline = backend.invocation_fetches.load(Ordering::SeqCst);
    tokio::time::sleep(TEST_POLL_INTERVAL * 10).await;
    let fetched = backend.invocation_fetches.load(Ordering::SeqCst) - baseline;
    assert!(fetched <= 14, "expected a single poll timer, saw {} fetches", fetched);

    session.clear().await;
    assert!(!session.is_polling().await);
}

#[tokio::test]
async fn test_resume_without_invocation_id_stays_idle() {
    let backend = MockBackend::new();
    let conversation_id = backend.seed_conversation(vec![
        MockBackend::human_turn("t-1", "hello"),
        MockBackend::ai_turn("t-2", None),
    ]);

    let session = polling_session(&backend);
    session
        .load_conversation(&conversation_id, "p-1")
        .await
        .unwrap();

    // Running but unpollable: no invocation id was ever persisted
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(!session.is_polling().await);
}

#[tokio::test]
async fn test_stop_during_polling_finalizes_session() {
    let backend = MockBackend::new();
    backend.set_invocation("running", vec![], None);
    let conversation_id = seed_running_conversation(&backend);

    let session = polling_session(&backend);
    session
        .load_conversation(&conversation_id, "p-1")
        .await
        .unwrap();
    assert_eq!(session.status(), SessionStatus::Running);

    session.stop().await;

    let content = session.store().ai_content("t-2").await.unwrap();
    assert_eq!(content.status, InvocationStatus::Stopped);
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(!session.is_polling().await);
    assert_eq!(backend.stop_calls.load(Ordering::SeqCst), 1);

    // Idempotent
    session.stop().await;
    assert_eq!(backend.stop_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_clear_kills_poll_timer() {
    let backend = MockBackend::new();
    backend.set_invocation("running", vec![], None);
    let conversation_id = seed_running_conversation(&backend);

    let session = polling_session(&backend);
    session
        .load_conversation(&conversation_id, "p-1")
        .await
        .unwrap();
    assert!(session.is_polling().await);

    session.clear().await;
    assert!(!session.is_polling().await);
    assert_eq!(session.status(), SessionStatus::Idle);

    let fetches = backend.invocation_fetches.load(Ordering::SeqCst);
    tokio::time::sleep(TEST_POLL_INTERVAL * 4).await;
    assert_eq!(backend.invocation_fetches.load(Ordering::SeqCst), fetches);
}
