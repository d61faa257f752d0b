use std::time::Duration;

use tokio_util::sync::CancellationToken;

use pitwall::config::SpeechConfig;
use pitwall::services::speech::{Enqueued, SpeechQueue, SpeechWorker};

async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[test]
fn test_queue_is_bounded() {
    let queue = SpeechQueue::new(2);

    assert_eq!(queue.speak("one", false), Enqueued::Queued);
    assert_eq!(queue.speak("two", false), Enqueued::Queued);
    assert_eq!(queue.speak("three", false), Enqueued::DroppedFull);
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_priority_clears_the_queue() {
    let queue = SpeechQueue::new(5);
    queue.speak("lap update", false);
    queue.speak("gap update", false);

    assert_eq!(queue.speak("Box now!", true), Enqueued::Preempted);
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_next_returns_in_order() {
    let queue = SpeechQueue::new(5);
    queue.speak("first", false);
    queue.speak("second", false);

    assert_eq!(queue.next().await, "first");
    assert_eq!(queue.next().await, "second");
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_next_wakes_on_new_message() {
    let queue = SpeechQueue::new(5);
    let waiter = queue.clone();
    let handle = tokio::spawn(async move { waiter.next().await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.speak("hello", false);

    let text = tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    assert_eq!(text, "hello");
}

#[cfg(unix)]
#[tokio::test]
async fn test_worker_drops_routine_while_speaking_and_preempts_on_priority() {
    let queue = SpeechQueue::new(5);
    // `sleep <n>` stands in for a speech program: it "speaks" for n seconds.
    let config = SpeechConfig {
        program: "sleep".to_string(),
        ..Default::default()
    };
    let cancel = CancellationToken::new();
    let worker = tokio::spawn(SpeechWorker::new(queue.clone(), &config).run(cancel.clone()));

    queue.speak("30", false);
    assert!(wait_until(|| queue.is_speaking()).await);

    assert_eq!(queue.speak("0", false), Enqueued::DroppedBusy);
    assert!(queue.is_empty());

    // Preempting kills the long playback; the short one finishes on its own.
    assert_eq!(queue.speak("0", true), Enqueued::Preempted);
    assert!(wait_until(|| !queue.is_speaking() && queue.is_empty()).await);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), worker).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_worker_survives_missing_program() {
    let queue = SpeechQueue::new(5);
    let config = SpeechConfig {
        program: "pitwall-no-such-speech-program".to_string(),
        ..Default::default()
    };
    let cancel = CancellationToken::new();
    let worker = tokio::spawn(SpeechWorker::new(queue.clone(), &config).run(cancel.clone()));

    queue.speak("hello", false);
    assert!(wait_until(|| queue.is_empty()).await);
    assert!(!queue.is_speaking());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), worker).await.unwrap().unwrap();
}
