//! Bounded-cadence progress reporting for streamed transfer phases.

use std::time::Instant;

use tracing::info;

/// Log a progress line at most this often.
const REPORT_INTERVAL_SECS: u64 = 10;

/// Accumulates item counts for one streamed phase and logs throughput at a
/// bounded cadence instead of per frame.
pub struct StreamProgressReporter {
    item_name: &'static str,
    processed: u64,
    started: Instant,
    last_report: Instant,
    last_reported_count: u64,
}

impl StreamProgressReporter {
    pub fn new(item_name: &'static str) -> Self {
        let now = Instant::now();
        Self {
            item_name,
            processed: 0,
            started: now,
            last_report: now,
            last_reported_count: 0,
        }
    }

    /// Records `count` processed items, emitting a progress line when the
    /// report interval has elapsed.
    pub fn add(&mut self, count: u64) {
        self.processed += count;
        if self.last_report.elapsed().as_secs() >= REPORT_INTERVAL_SECS {
            let window = self.processed - self.last_reported_count;
            let rate = window as f64 / self.last_report.elapsed().as_secs_f64();
            info!("Processed {} {} ({:.0}/s)", self.processed, self.item_name, rate);
            self.last_report = Instant::now();
            self.last_reported_count = self.processed;
        }
    }

    /// Total items processed so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Logs the final count for the phase.
    pub fn finish(self) {
        info!(
            "Processed {} {} in {:.1}s",
            self.processed,
            self.item_name,
            self.started.elapsed().as_secs_f64()
        );
    }
}
