//! Rolling sample window for failure-rate breaking.
//!
//! The sampling duration is split into a fixed number of buckets. A bucket
//! is evicted once its start is a full sampling duration in the past, so
//! counts always cover roughly the last `sampling_duration`.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

const NUMBER_OF_BUCKETS: u32 = 10;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    started_at: Instant,
    successes: u32,
    failures: u32,
}

/// Aggregate counts over the live buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowCounts {
    pub failures: u32,
    pub total: u32,
}

impl WindowCounts {
    pub fn failure_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.failures as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleWindow {
    sampling_duration: Duration,
    bucket_width: Duration,
    buckets: VecDeque<Bucket>,
}

impl SampleWindow {
    pub fn new(sampling_duration: Duration) -> Self {
        let bucket_width = (sampling_duration / NUMBER_OF_BUCKETS).max(Duration::from_millis(1));
        Self {
            sampling_duration,
            bucket_width,
            buckets: VecDeque::with_capacity(NUMBER_OF_BUCKETS as usize + 1),
        }
    }

    pub fn record_success(&mut self, now: Instant) {
        self.current_bucket(now).successes += 1;
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.current_bucket(now).failures += 1;
    }

    pub fn counts(&mut self, now: Instant) -> WindowCounts {
        self.evict(now);
        self.buckets.iter().fold(WindowCounts::default(), |acc, b| WindowCounts {
            failures: acc.failures + b.failures,
            total: acc.total + b.successes + b.failures,
        })
    }

    pub fn reset(&mut self) {
        self.buckets.clear();
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.buckets.front() {
            if now.duration_since(front.started_at) >= self.sampling_duration {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }

    fn current_bucket(&mut self, now: Instant) -> &mut Bucket {
        self.evict(now);
        let needs_new = match self.buckets.back() {
            Some(last) => now.duration_since(last.started_at) >= self.bucket_width,
            None => true,
        };
        if needs_new {
            self.buckets.push_back(Bucket {
                started_at: now,
                successes: 0,
                failures: 0,
            });
        }
        // A bucket was just pushed if none existed.
        let last = self.buckets.len() - 1;
        &mut self.buckets[last]
    }
}
