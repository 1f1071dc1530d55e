// src/engine/session.rs
use super::events::ProgressStats;
use crate::models::{ExtractionOptions, Record, SessionStats};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation flag. Suspendable steps receive it and check it
/// between units of work; an in-flight wait is never interrupted, so the
/// source site's request/response cycle stays in step.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Running counters of one session. `estimated_total` starts as the
/// pagination estimate and is replaced by the discovered count as pages are
/// actually visited.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub extracted: usize,
    pub phones: usize,
    pub estimated_total: usize,
}

/// Transient state of one extraction run. Created on start, dropped at the
/// terminal state; the record list is append-only.
pub struct ExtractionSession {
    pub options: ExtractionOptions,
    pub records: Vec<Record>,
    pub counters: Counters,
    pub started_at: Instant,
}

impl ExtractionSession {
    pub fn new(options: ExtractionOptions) -> Self {
        Self {
            options,
            records: Vec::new(),
            counters: Counters::default(),
            started_at: Instant::now(),
        }
    }

    pub fn push(&mut self, record: Record) {
        if record.phone.is_some() {
            self.counters.phones += 1;
        }
        self.records.push(record);
        self.counters.extracted += 1;
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            extracted: self.counters.extracted,
            phones: self.counters.phones,
            total: self.counters.estimated_total,
        }
    }

    pub fn progress(&self) -> ProgressStats {
        progress_stats(&self.counters, self.started_at.elapsed())
    }
}

/// Derives the progress snapshot from the counters and the elapsed time.
/// Everything is recomputed from scratch on each call, so a revised total
/// immediately corrects the remaining-time estimate.
pub fn progress_stats(counters: &Counters, elapsed: Duration) -> ProgressStats {
    let elapsed_secs = elapsed.as_secs_f64();
    let mut remaining_secs = 0.0;
    let mut total_secs = 0.0;

    if counters.extracted > 0 && counters.estimated_total > 0 {
        let per_record = elapsed_secs / counters.extracted as f64;
        let remaining = counters.estimated_total.saturating_sub(counters.extracted);
        remaining_secs = remaining as f64 * per_record;
        total_secs = counters.estimated_total as f64 * per_record;
    }

    let progress = if counters.estimated_total > 0 {
        (100.0 * counters.extracted as f64 / counters.estimated_total as f64).round() as u8
    } else {
        0
    };

    ProgressStats {
        extracted: counters.extracted,
        total: counters.estimated_total,
        phones: counters.phones,
        elapsed_time: elapsed_secs.round() as u64,
        estimated_time_remaining: remaining_secs.round() as u64,
        estimated_total_time: total_secs.round() as u64,
        progress,
    }
}
