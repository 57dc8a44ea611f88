//! Refresh cycle statistics
//!
//! A [`CycleReport`] is built while a cycle fans in; [`RefreshStats`] keeps
//! running totals across cycles and is shared with the health endpoint.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fetch::LocationOutcome;
use crate::errors::{RefreshError, RefreshResult};

/// Outcome counts of one refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// When the cycle was started
    pub started_at: DateTime<Utc>,
    /// Wall time from fan-out to the last task finishing
    pub duration: Duration,
    /// Number of location tasks spawned
    pub locations: usize,
    /// Locations whose weather snapshot was written
    pub succeeded: usize,
    /// Locations the provider rejected; an error record was written
    pub rejected: usize,
    /// Locations that failed every attempt
    pub exhausted: usize,
    /// Locations that hit a cache error, an invariant violation or a panic
    pub failed: usize,
    /// Locations aborted by shutdown
    pub cancelled: usize,
}

impl CycleReport {
    /// Start a report for a cycle over `locations` tasks
    pub fn begin(locations: usize) -> Self {
        Self {
            started_at: Utc::now(),
            duration: Duration::ZERO,
            locations,
            succeeded: 0,
            rejected: 0,
            exhausted: 0,
            failed: 0,
            cancelled: 0,
        }
    }

    /// Count one location's terminal result
    pub fn record(&mut self, result: &RefreshResult<LocationOutcome>) {
        match result {
            Ok(LocationOutcome::Updated { .. }) => self.succeeded += 1,
            Ok(LocationOutcome::Rejected { .. }) => self.rejected += 1,
            Err(RefreshError::RetriesExhausted { .. }) => self.exhausted += 1,
            Err(RefreshError::Cache { .. }) | Err(RefreshError::InvariantViolation { .. }) => {
                self.failed += 1
            }
        }
    }

    /// Number of tasks that reached a terminal state or were cancelled
    pub fn total_processed(&self) -> usize {
        self.succeeded + self.rejected + self.exhausted + self.failed + self.cancelled
    }

    /// Every location produced a fresh snapshot
    pub fn is_clean(&self) -> bool {
        self.succeeded == self.locations
    }
}

/// Running totals across refresh cycles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshStats {
    /// When the engine was created
    pub running_since: DateTime<Utc>,
    /// Cycles that finished fan-in
    pub cycles_completed: u64,
    /// Snapshots written over all cycles
    pub total_succeeded: u64,
    /// Provider rejections over all cycles
    pub total_rejected: u64,
    /// Exhausted locations over all cycles
    pub total_exhausted: u64,
    /// Other failures over all cycles
    pub total_failed: u64,
    /// Most recent cycle
    pub last_cycle: Option<CycleReport>,
}

impl Default for RefreshStats {
    fn default() -> Self {
        Self {
            running_since: Utc::now(),
            cycles_completed: 0,
            total_succeeded: 0,
            total_rejected: 0,
            total_exhausted: 0,
            total_failed: 0,
            last_cycle: None,
        }
    }
}

impl RefreshStats {
    /// Fold a finished cycle into the totals
    pub fn record_cycle(&mut self, report: CycleReport) {
        self.cycles_completed += 1;
        self.total_succeeded += report.succeeded as u64;
        self.total_rejected += report.rejected as u64;
        self.total_exhausted += report.exhausted as u64;
        self.total_failed += report.failed as u64;
        self.last_cycle = Some(report);
    }

    /// Fraction of location refreshes that produced a snapshot
    pub fn success_rate(&self) -> f64 {
        let total =
            self.total_succeeded + self.total_rejected + self.total_exhausted + self.total_failed;
        if total == 0 {
            return 0.0;
        }
        self.total_succeeded as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;

    fn exhausted() -> RefreshResult<LocationOutcome> {
        Err(RefreshError::RetriesExhausted {
            location: "Lima".to_string(),
            attempts: 3,
            source: ProviderError::Simulated {
                location: "lim".to_string(),
            },
        })
    }

    #[test]
    fn test_record_counts_each_outcome() {
        let mut report = CycleReport::begin(4);
        report.record(&Ok(LocationOutcome::Updated { attempts: 1 }));
        report.record(&Ok(LocationOutcome::Rejected {
            attempts: 1,
            message: "\"rate limited\"".to_string(),
        }));
        report.record(&exhausted());
        report.record(&Err(RefreshError::InvariantViolation {
            location: "Quito".to_string(),
            attempts: 0,
        }));

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.exhausted, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total_processed(), 4);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_stats_accumulate_cycles() {
        let mut stats = RefreshStats::default();
        assert_eq!(stats.success_rate(), 0.0);

        let mut first = CycleReport::begin(2);
        first.record(&Ok(LocationOutcome::Updated { attempts: 2 }));
        first.record(&exhausted());
        stats.record_cycle(first);

        let mut second = CycleReport::begin(2);
        second.record(&Ok(LocationOutcome::Updated { attempts: 1 }));
        second.record(&Ok(LocationOutcome::Updated { attempts: 1 }));
        stats.record_cycle(second.clone());

        assert_eq!(stats.cycles_completed, 2);
        assert_eq!(stats.total_succeeded, 3);
        assert_eq!(stats.total_exhausted, 1);
        assert_eq!(stats.success_rate(), 0.75);
        assert_eq!(stats.last_cycle, Some(second));
    }
}
