//! Advisory lifecycle counters.
//!
//! Read-only bookkeeping for the shutdown summary. Nothing in the decision
//! path reads it.

use serde::Serialize;
use std::collections::VecDeque;

const MAX_RECORDS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryOutcome {
    Responded,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryRecord {
    pub outcome: AdvisoryOutcome,
    pub latency_ms: f64,
    pub bypassed_cooldown: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdvisoryStats {
    pub dispatched: u64,
    pub responded: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub critical_bypasses: u64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
}

impl AdvisoryStats {
    pub fn fallbacks(&self) -> u64 {
        self.failed + self.timed_out
    }
}

#[derive(Debug, Default)]
pub struct AdvisoryRecorder {
    buffer: VecDeque<AdvisoryRecord>,
}

impl AdvisoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: AdvisoryRecord) {
        if self.buffer.len() >= MAX_RECORDS {
            self.buffer.pop_front();
        }
        self.buffer.push_back(record);
    }

    pub fn stats(&self) -> AdvisoryStats {
        compute_stats(&self.buffer)
    }
}

pub fn compute_stats(records: &VecDeque<AdvisoryRecord>) -> AdvisoryStats {
    let mut stats = AdvisoryStats::default();
    let mut latency_total = 0.0;

    for record in records {
        stats.dispatched += 1;
        if record.bypassed_cooldown {
            stats.critical_bypasses += 1;
        }
        match record.outcome {
            AdvisoryOutcome::Responded => {
                stats.responded += 1;
                latency_total += record.latency_ms;
                stats.max_latency_ms = stats.max_latency_ms.max(record.latency_ms);
            }
            AdvisoryOutcome::Failed => stats.failed += 1,
            AdvisoryOutcome::TimedOut => stats.timed_out += 1,
        }
    }

    // Latency only means something for answered calls.
    if stats.responded > 0 {
        stats.avg_latency_ms = latency_total / stats.responded as f64;
    }
    stats
}
