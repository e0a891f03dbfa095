use std::time::Instant;

/// Tracks emission instants: time of first token, the largest
/// inter-emission gap, and stalls at or above an optional threshold.
///
/// Takes instants as arguments rather than sampling the clock itself, so
/// gap handling is testable with synthetic timelines.
#[derive(Debug)]
pub(crate) struct EmissionTiming {
    stall_threshold: Option<f64>,
    first: Option<Instant>,
    last: Option<Instant>,
    stall_count: u64,
    max_gap_seconds: f64,
}

impl EmissionTiming {
    pub fn new(stall_threshold: Option<f64>) -> Self {
        Self {
            stall_threshold,
            first: None,
            last: None,
            stall_count: 0,
            max_gap_seconds: 0.0,
        }
    }

    /// Records one emission instant.
    pub fn record(&mut self, now: Instant) {
        if self.first.is_none() {
            self.first = Some(now);
        }
        if let Some(last) = self.last {
            let gap = now.duration_since(last).as_secs_f64();
            if gap > self.max_gap_seconds {
                self.max_gap_seconds = gap;
            }
            if let Some(threshold) = self.stall_threshold
                && gap >= threshold
            {
                self.stall_count += 1;
            }
        }
        self.last = Some(now);
    }

    pub fn first_emission(&self) -> Option<Instant> {
        self.first
    }

    pub fn stall_count(&self) -> u64 {
        self.stall_count
    }

    pub fn max_gap_seconds(&self) -> f64 {
        self.max_gap_seconds
    }
}
