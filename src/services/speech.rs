//! Spoken output.
//!
//! A bounded queue in front of a single playback task. Routine messages are
//! dropped rather than queued behind ongoing speech; priority messages clear
//! the queue and cut off whatever is playing.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SpeechConfig;

#[derive(Debug)]
struct Shared {
    queue: Mutex<VecDeque<String>>,
    capacity: usize,
    speaking: AtomicBool,
    available: Notify,
    interrupt: Notify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Queued,
    /// Queue cleared and current playback interrupted.
    Preempted,
    DroppedBusy,
    DroppedFull,
}

#[derive(Debug, Clone)]
pub struct SpeechQueue {
    shared: Arc<Shared>,
}

impl SpeechQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity: capacity.max(1),
                speaking: AtomicBool::new(false),
                available: Notify::new(),
                interrupt: Notify::new(),
            }),
        }
    }

    /// Never blocks.
    pub fn speak(&self, text: impl Into<String>, priority: bool) -> Enqueued {
        let text = text.into();
        if priority {
            {
                let mut queue = self.shared.queue.lock();
                queue.clear();
                queue.push_back(text);
            }
            self.shared.interrupt.notify_waiters();
            self.shared.available.notify_one();
            return Enqueued::Preempted;
        }

        if self.is_speaking() {
            return Enqueued::DroppedBusy;
        }
        {
            let mut queue = self.shared.queue.lock();
            if queue.len() >= self.shared.capacity {
                return Enqueued::DroppedFull;
            }
            queue.push_back(text);
        }
        self.shared.available.notify_one();
        Enqueued::Queued
    }

    pub fn is_speaking(&self) -> bool {
        self.shared.speaking.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.shared.queue.lock().clear();
    }

    /// Waits for the next message.
    pub async fn next(&self) -> String {
        loop {
            let notified = self.shared.available.notified();
            if let Some(text) = self.shared.queue.lock().pop_front() {
                return text;
            }
            notified.await;
        }
    }

    fn set_speaking(&self, speaking: bool) {
        self.shared.speaking.store(speaking, Ordering::Release);
    }
}

/// Plays queued messages through an external program, one at a time.
pub struct SpeechWorker {
    queue: SpeechQueue,
    program: String,
    args: Vec<String>,
}

impl SpeechWorker {
    pub fn new(queue: SpeechQueue, config: &SpeechConfig) -> Self {
        Self {
            queue,
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        loop {
            let text = tokio::select! {
                _ = cancel.cancelled() => break,
                text = self.queue.next() => text,
            };

            debug!("speaking: '{}'", text);
            let mut child = match Command::new(&self.program)
                .args(&self.args)
                .arg(&text)
                .kill_on_drop(true)
                .spawn()
            {
                Ok(child) => child,
                Err(e) => {
                    warn!("failed to spawn '{}': {}", self.program, e);
                    continue;
                }
            };

            // Registered before the speaking flag goes up so a preempting
            // message cannot slip in between.
            let interrupted = self.queue.shared.interrupt.notified();
            tokio::pin!(interrupted);
            interrupted.as_mut().enable();
            self.queue.set_speaking(true);

            let stop = tokio::select! {
                _ = child.wait() => false,
                _ = &mut interrupted => { let _ = child.kill().await; false }
                _ = cancel.cancelled() => { let _ = child.kill().await; true }
            };
            self.queue.set_speaking(false);

            if stop {
                break;
            }
        }
        self.queue.clear();
    }
}
