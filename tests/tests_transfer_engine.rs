// Engine behaviour against the in-process queue

use std::sync::{Arc, Mutex};

use queue_tools::transfer::{
    Envelope, EnvelopeCodec, JsonCodec, MemoryQueue, MessageId, ProgressReporter, Summary,
    TransferEngine, TransferError, TransferMode, TransferPolicy,
};

fn envelope(message_type: &str) -> Envelope {
    Envelope::new(message_type, format!("{{\"type\":\"{message_type}\"}}").into_bytes())
}

fn push(queue: &MemoryQueue, env: &Envelope) {
    queue.push(JsonCodec.encode(env).unwrap());
}

fn decoded(queue: &MemoryQueue) -> Vec<Envelope> {
    queue.messages().iter().map(|raw| JsonCodec.decode(raw).unwrap()).collect()
}

fn ids(envelopes: &[Envelope]) -> Vec<MessageId> {
    envelopes.iter().map(|e| e.message_id).collect()
}

fn engine(mode: TransferMode, max_count: i64, clear: bool) -> TransferEngine {
    TransferEngine::new(TransferPolicy::new(mode, max_count, clear).unwrap(), Box::new(JsonCodec))
}

async fn run(
    engine: TransferEngine,
    source: &MemoryQueue,
    destination: &MemoryQueue,
) -> Result<Summary, queue_tools::transfer::RunFailure> {
    engine.run(Box::new(source.clone()), Box::new(destination.clone())).await
}

#[derive(Clone, Default)]
struct RecordingProgress {
    progress: Arc<Mutex<Vec<u64>>>,
    completed: Arc<Mutex<Vec<Summary>>>,
}

impl ProgressReporter for RecordingProgress {
    fn on_progress(&mut self, processed: u64) {
        self.progress.lock().unwrap().push(processed);
    }

    fn on_complete(&mut self, summary: &Summary) {
        self.completed.lock().unwrap().push(*summary);
    }
}

#[tokio::test]
async fn test_move_three_messages_in_order() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    let messages = vec![envelope("A"), envelope("B"), envelope("C")];
    for env in &messages {
        push(&source, env);
    }

    let summary = run(engine(TransferMode::Move, 0, false), &source, &destination).await.unwrap();

    assert_eq!(summary, Summary { processed: 3, skipped_duplicates: 0 });
    assert_eq!(decoded(&destination), messages);
    assert!(source.is_empty());
    assert_eq!(source.inflight_len(), 0);
}

#[tokio::test]
async fn test_duplicate_identity_is_skipped_but_consumed() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    let a = envelope("A");
    let b = envelope("B");
    push(&source, &a);
    push(&source, &a);
    push(&source, &b);

    let summary = run(engine(TransferMode::Move, 0, false), &source, &destination).await.unwrap();

    assert_eq!(summary, Summary { processed: 3, skipped_duplicates: 1 });
    assert_eq!(summary.delivered(), 2);
    assert_eq!(ids(&decoded(&destination)), vec![a.message_id, b.message_id]);
    assert!(source.is_empty());
}

#[tokio::test]
async fn test_duplicate_with_different_payload_is_still_a_duplicate() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    let a = envelope("A");
    let mut a_again = a.clone();
    a_again.message = b"changed".to_vec();
    push(&source, &a);
    push(&source, &a_again);

    let summary = run(engine(TransferMode::Move, 0, false), &source, &destination).await.unwrap();

    assert_eq!(summary.skipped_duplicates, 1);
    assert_eq!(decoded(&destination), vec![a]);
}

#[tokio::test]
async fn test_max_count_stops_early() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    let messages = vec![envelope("A"), envelope("B"), envelope("C")];
    for env in &messages {
        push(&source, env);
    }

    let summary = run(engine(TransferMode::Move, 2, false), &source, &destination).await.unwrap();

    assert_eq!(summary, Summary { processed: 2, skipped_duplicates: 0 });
    assert_eq!(ids(&decoded(&destination)), ids(&messages[..2]));
    assert_eq!(ids(&decoded(&source)), vec![messages[2].message_id]);
    assert_eq!(source.inflight_len(), 0);
}

#[tokio::test]
async fn test_max_count_larger_than_available() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    push(&source, &envelope("A"));
    push(&source, &envelope("B"));

    let summary = run(engine(TransferMode::Move, 10, false), &source, &destination).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert!(source.is_empty());
}

#[tokio::test]
async fn test_copy_leaves_source_intact() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    let messages = vec![envelope("A"), envelope("A2"), envelope("B")];
    for env in &messages {
        push(&source, env);
    }
    let before = source.messages();

    let summary = run(engine(TransferMode::Copy, 0, false), &source, &destination).await.unwrap();

    assert_eq!(summary, Summary { processed: 3, skipped_duplicates: 0 });
    assert_eq!(source.messages(), before);
    assert_eq!(source.inflight_len(), 0);
    assert_eq!(decoded(&destination), messages);
}

#[tokio::test]
async fn test_copy_releases_duplicates() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    let a = envelope("A");
    push(&source, &a);
    push(&source, &a);

    let summary = run(engine(TransferMode::Copy, 0, false), &source, &destination).await.unwrap();

    assert_eq!(summary, Summary { processed: 2, skipped_duplicates: 1 });
    assert_eq!(source.len(), 2);
    assert_eq!(destination.len(), 1);
}

#[tokio::test]
async fn test_clear_failure_history() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    let mut failed = envelope("Failed");
    failed.record_failure("handler threw");
    failed.record_failure("handler threw again");
    let clean = envelope("Clean");
    push(&source, &failed);
    push(&source, &clean);

    run(engine(TransferMode::Move, 0, true), &source, &destination).await.unwrap();

    let delivered = decoded(&destination);
    assert_eq!(ids(&delivered), vec![failed.message_id, clean.message_id]);
    assert!(delivered.iter().all(|e| e.failure_messages.is_empty()));
    assert_eq!(delivered[0].message, failed.message);
}

#[tokio::test]
async fn test_failure_history_kept_without_clear() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    let mut failed = envelope("Failed");
    failed.record_failure("handler threw");
    push(&source, &failed);

    run(engine(TransferMode::Move, 0, false), &source, &destination).await.unwrap();

    assert_eq!(decoded(&destination), vec![failed]);
}

#[tokio::test]
async fn test_raw_bytes_forwarded_unchanged_without_clear() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    let mut failed = envelope("Failed");
    failed.record_failure("handler threw");
    // Whitespace a re-encode would not reproduce
    let raw = format!(" {} ", String::from_utf8(JsonCodec.encode(&failed).unwrap()).unwrap()).into_bytes();
    source.push(raw.clone());
    let before = source.messages();

    run(engine(TransferMode::Move, 0, false), &source, &destination).await.unwrap();

    assert_eq!(destination.messages(), before);
    assert_eq!(destination.messages(), vec![raw]);
}

#[tokio::test]
async fn test_clear_without_history_does_not_reencode() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    let clean = envelope("Clean");
    let raw = format!(" {} ", String::from_utf8(JsonCodec.encode(&clean).unwrap()).unwrap()).into_bytes();
    source.push(raw.clone());

    run(engine(TransferMode::Move, 0, true), &source, &destination).await.unwrap();

    assert_eq!(destination.messages(), vec![raw]);
}

#[tokio::test]
async fn test_clear_with_history_reencodes() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    let mut failed = envelope("Failed");
    failed.record_failure("handler threw");
    let raw = JsonCodec.encode(&failed).unwrap();
    source.push(raw.clone());

    run(engine(TransferMode::Move, 0, true), &source, &destination).await.unwrap();

    let delivered = destination.messages();
    assert_ne!(delivered, vec![raw]);
    assert_eq!(delivered, vec![JsonCodec.encode(&failed.without_failures()).unwrap()]);
}

#[tokio::test]
async fn test_delivery_failure_reports_partial_summary() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    destination.fail_deliveries_after(2);
    for name in ["A", "B", "C", "D"] {
        push(&source, &envelope(name));
    }

    let failure = run(engine(TransferMode::Move, 0, false), &source, &destination).await.unwrap_err();

    assert!(matches!(failure.error, TransferError::Delivery { .. }));
    assert_eq!(failure.summary, Summary { processed: 2, skipped_duplicates: 0 });
    assert_eq!(destination.len(), 2);
    // C was claimed but never finalized; D was never fetched
    assert_eq!(source.inflight_len(), 1);
    assert_eq!(source.len(), 1);
    assert_eq!(source.close_count(), 1);
    assert_eq!(destination.close_count(), 1);

    // Queue-side recovery makes C available to the next run
    assert_eq!(source.recover_inflight(), 1);
    assert_eq!(source.len(), 2);
}

#[tokio::test]
async fn test_transport_failure_aborts_run() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    source.fail_fetches_after(1);
    push(&source, &envelope("A"));
    push(&source, &envelope("B"));

    let failure = run(engine(TransferMode::Move, 0, false), &source, &destination).await.unwrap_err();

    assert!(matches!(failure.error, TransferError::Transport(_)));
    assert_eq!(failure.summary.processed, 1);
    assert_eq!(source.close_count(), 1);
}

#[tokio::test]
async fn test_resumed_run_may_redeliver() {
    // Dedup is run-scoped: a message redelivered after an aborted run reaches
    // the destination twice.
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    let a = envelope("A");
    push(&source, &a);

    run(engine(TransferMode::Copy, 0, false), &source, &destination).await.unwrap();
    run(engine(TransferMode::Copy, 0, false), &source, &destination).await.unwrap();

    assert_eq!(ids(&decoded(&destination)), vec![a.message_id, a.message_id]);
}

#[tokio::test]
async fn test_progress_every_hundred() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    for _ in 0..250 {
        push(&source, &envelope("Bulk"));
    }
    let progress = RecordingProgress::default();

    let summary = engine(TransferMode::Move, 0, false)
        .with_progress(Box::new(progress.clone()))
        .run(Box::new(source.clone()), Box::new(destination.clone()))
        .await
        .unwrap();

    assert_eq!(summary.processed, 250);
    assert_eq!(*progress.progress.lock().unwrap(), vec![100, 200]);
    assert_eq!(*progress.completed.lock().unwrap(), vec![summary]);
}

#[tokio::test]
async fn test_completion_reported_on_failure() {
    let source = MemoryQueue::new("source");
    let destination = MemoryQueue::new("destination");
    destination.fail_deliveries_after(0);
    push(&source, &envelope("A"));
    let progress = RecordingProgress::default();

    let failure = engine(TransferMode::Move, 0, false)
        .with_progress(Box::new(progress.clone()))
        .run(Box::new(source.clone()), Box::new(destination.clone()))
        .await
        .unwrap_err();

    assert_eq!(*progress.completed.lock().unwrap(), vec![failure.summary]);
}
