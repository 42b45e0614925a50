//! Background sweeper that garbage-collects expired cart lines.
//!
//! Correctness never depends on it: expired lines are already invisible to
//! availability math and cart listings through their cutoff predicates. The
//! sweeper just keeps the table from accumulating dead rows.

use crate::db::Repository;
use crate::domain::TimeMs;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub struct Sweeper {
    repo: Arc<Repository>,
    ttl_seconds: i64,
    interval: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl Sweeper {
    pub fn new(
        repo: Arc<Repository>,
        ttl_seconds: i64,
        interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            repo,
            ttl_seconds,
            interval,
            shutdown,
        }
    }

    /// Spawn the sweep loop. The returned handle resolves once a shutdown
    /// signal is received.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                interval_seconds = self.interval.as_secs(),
                ttl_seconds = self.ttl_seconds,
                "Cart sweeper started"
            );

            loop {
                tokio::select! {
                    _ = self.shutdown.recv() => {
                        info!("Cart sweeper received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let cutoff = TimeMs::now().minus_seconds(self.ttl_seconds);
                        match self.repo.sweep_expired(cutoff).await {
                            Ok(0) => debug!("Sweep found nothing to evict"),
                            Ok(evicted) => info!(evicted, "Swept expired cart lines"),
                            Err(e) => warn!(error = %e, "Sweep failed; will retry next tick"),
                        }
                    }
                }
            }
        })
    }
}
