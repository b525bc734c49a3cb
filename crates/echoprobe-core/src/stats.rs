use crate::probe::ProbeResult;
use std::time::Duration;

/// Aggregate statistics for a probing run.
///
/// Derived on demand from the list of emitted results, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatistics {
    sent: usize,
    received: usize,
    total_time: Duration,
    best: Option<Duration>,
    worst: Option<Duration>,
}

impl RunStatistics {
    /// Compute statistics over the results of a run.
    #[must_use]
    pub fn from_results(results: &[ProbeResult]) -> Self {
        let mut stats = Self {
            sent: results.len(),
            received: 0,
            total_time: Duration::ZERO,
            best: None,
            worst: None,
        };
        for rtt in results
            .iter()
            .filter(|result| result.success)
            .filter_map(|result| result.round_trip)
        {
            stats.received += 1;
            stats.total_time += rtt;
            stats.best = Some(stats.best.map_or(rtt, |best| best.min(rtt)));
            stats.worst = Some(stats.worst.map_or(rtt, |worst| worst.max(rtt)));
        }
        stats
    }

    /// The number of probes with a result.
    #[must_use]
    pub const fn sent(&self) -> usize {
        self.sent
    }

    /// The number of probes which received a reply.
    #[must_use]
    pub const fn received(&self) -> usize {
        self.received
    }

    /// The number of probes which did not receive a reply.
    #[must_use]
    pub const fn lost(&self) -> usize {
        self.sent - self.received
    }

    /// The % of probes which did not receive a reply.
    #[must_use]
    pub fn loss_pct(&self) -> f64 {
        if self.sent > 0 {
            self.lost() as f64 / self.sent as f64 * 100_f64
        } else {
            0_f64
        }
    }

    /// The best round-trip time in fractional milliseconds.
    #[must_use]
    pub fn best_ms(&self) -> Option<f64> {
        self.best.map(|best| best.as_secs_f64() * 1000_f64)
    }

    /// The worst round-trip time in fractional milliseconds.
    #[must_use]
    pub fn worst_ms(&self) -> Option<f64> {
        self.worst.map(|worst| worst.as_secs_f64() * 1000_f64)
    }

    /// The average round-trip time in fractional milliseconds.
    #[must_use]
    pub fn avg_ms(&self) -> f64 {
        if self.received > 0 {
            (self.total_time.as_secs_f64() * 1000_f64) / self.received as f64
        } else {
            0_f64
        }
    }
}
