//! Background scheduler that drives the turn accrual clock.
//!
//! [`run_scheduler`] wakes on a fixed period, asks the store for every
//! province whose next turn has passed, and ticks each one. It stops
//! cleanly when the shutdown signal flips to `true` or its sender is
//! dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::accrual::TurnClock;
use crate::store::ProvinceStore;

/// Totals over a scheduler's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerSummary {
    /// Passes run.
    pub passes: u64,
    /// Province ticks committed.
    pub committed: u64,
    /// Passes that could not list due provinces.
    pub failed_passes: u64,
}

/// Run accrual passes every `every` until `shutdown` signals.
pub async fn run_scheduler<S: ProvinceStore>(
    clock: Arc<TurnClock<S>>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> SchedulerSummary {
    let mut summary = SchedulerSummary::default();
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        every_ms = u64::try_from(every.as_millis()).unwrap_or(u64::MAX),
        turn_interval_secs = clock.interval().num_seconds(),
        "Accrual scheduler starting"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                summary.passes = summary.passes.saturating_add(1);
                match clock.tick_due(Utc::now()).await {
                    Ok(report) => {
                        let committed = u64::try_from(report.committed).unwrap_or(u64::MAX);
                        summary.committed = summary.committed.saturating_add(committed);
                    }
                    Err(e) => {
                        warn!(error = %e, "Accrual pass failed");
                        summary.failed_passes = summary.failed_passes.saturating_add(1);
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(
        passes = summary.passes,
        committed = summary.committed,
        failed_passes = summary.failed_passes,
        "Accrual scheduler stopped"
    );
    summary
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::TimeDelta;
    use realm_economy::Economy;

    use super::*;
    use crate::config::ClockConfig;
    use crate::memory_store::MemoryProvinceStore;
    use crate::testing::sample_snapshot;

    #[tokio::test]
    async fn scheduler_ticks_due_provinces_until_shutdown() {
        let store = Arc::new(MemoryProvinceStore::new());
        let mut snapshot = sample_snapshot(Utc::now());
        snapshot.next_turn_at = Utc::now() - TimeDelta::seconds(1);
        store.insert(snapshot.clone()).await.unwrap();

        let clock = Arc::new(
            TurnClock::new(
                Arc::clone(&store),
                Arc::new(Economy::default()),
                &ClockConfig::default(),
            )
            .unwrap(),
        );
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_scheduler(clock, Duration::from_millis(10), rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        let summary = handle.await.unwrap();

        assert!(summary.passes >= 1);
        assert_eq!(summary.committed, 1);
        let stored = store.get(snapshot.id).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.resources.turns, snapshot.resources.turns + 1);
    }

    #[tokio::test]
    async fn dropped_sender_stops_the_scheduler() {
        let store = Arc::new(MemoryProvinceStore::new());
        let clock = Arc::new(
            TurnClock::new(store, Arc::new(Economy::default()), &ClockConfig::default()).unwrap(),
        );
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_scheduler(clock, Duration::from_secs(3600), rx));
        drop(tx);
        let summary = handle.await.unwrap();
        // The first interval tick fires immediately.
        assert!(summary.passes <= 1);
        assert_eq!(summary.failed_passes, 0);
    }
}
