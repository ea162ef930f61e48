use crate::error::ErrorKind;
use crate::types::Event;
use crate::unlocker::test_helpers::{
    create_test_unlocker, pdf_file, wait_for_batch_complete,
};

#[tokio::test]
async fn multiple_subscribers_each_receive_all_events() {
    let harness = create_test_unlocker();
    let mut first = harness.unlocker.subscribe();
    let mut second = harness.unlocker.subscribe();

    harness.unlocker.submit(vec![pdf_file("a.pdf")]).await.unwrap();

    let a = wait_for_batch_complete(&mut first).await;
    let b = wait_for_batch_complete(&mut second).await;
    assert_eq!(a, b);
}

#[tokio::test]
async fn stats_snapshot_reflects_idle_state_after_batch() {
    let harness = create_test_unlocker();
    let mut events = harness.unlocker.subscribe();

    harness
        .unlocker
        .submit(vec![pdf_file("a.pdf"), pdf_file("b.pdf")])
        .await
        .unwrap();
    wait_for_batch_complete(&mut events).await;

    // The drain task may still be between finish and permit release; poll
    // briefly for the settled idle state.
    for _ in 0..50 {
        let stats = harness.unlocker.stats().await;
        if !stats.draining && stats.queued == 0 {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("orchestrator did not settle to idle");
}

#[test]
fn events_serialize_with_snake_case_tags() {
    let event = Event::FileFailed {
        name: "bad.pdf".to_string(),
        kind: ErrorKind::InvalidPdfSignature,
        message: "missing %PDF signature: bad.pdf".to_string(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "file_failed");
    assert_eq!(json["kind"], "invalid_pdf_signature");

    let event = Event::BatchComplete {
        succeeded: 2,
        failed: 1,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "batch_complete");
    assert_eq!(json["succeeded"], 2);

    let json = serde_json::to_value(Event::IdleReset).unwrap();
    assert_eq!(json["type"], "idle_reset");
}
