//! Streaming round coordinator.
//!
//! Consumes summaries as they arrive and keeps a running aggregate. The
//! round ends on the first of, checked in this order every iteration:
//! 1. the hard timeout since the round started,
//! 2. the grace period of silence after the most recent arrival,
//! 3. every expected client having reported (checked right after an arrival).

use crate::client::ClientConfig;
use crate::coordinator::result::{RoundMode, RoundProgress, RoundResult, Termination};
use crate::coordinator::{join_with_grace, launch_clients, validate_clients, DEFAULT_JOIN_GRACE};
use crate::core::{now, Result, RoundId};
use crate::stats::{merge_summaries, SummaryAggregator};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use tracing::info;

/// Default bound on a single receive attempt.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(200);

/// Streaming coordinator with a hard timeout and a grace period.
#[derive(Clone, Debug)]
pub struct AsyncCoordinator {
    timeout: Duration,
    grace_period: Duration,
    recv_timeout: Duration,
    join_grace: Duration,
}

impl AsyncCoordinator {
    /// Create a coordinator.
    pub fn new(timeout: Duration, grace_period: Duration) -> Self {
        Self {
            timeout,
            grace_period,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            join_grace: DEFAULT_JOIN_GRACE,
        }
    }

    /// Set the bound on one receive attempt.
    ///
    /// This bounds how late the two time-based exits are noticed.
    pub fn with_recv_timeout(mut self, recv_timeout: Duration) -> Self {
        self.recv_timeout = recv_timeout;
        self
    }

    /// Set the best-effort join bound applied at round end.
    pub fn with_join_grace(mut self, join_grace: Duration) -> Self {
        self.join_grace = join_grace;
        self
    }

    /// Hard round timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Silence after the last arrival that closes the round.
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Run one round without observing progress.
    pub async fn run_round(&self, clients: Vec<ClientConfig>) -> Result<RoundResult> {
        self.run_round_with_progress(clients, |_| {}).await
    }

    /// Run one round, reporting the running aggregate after every arrival.
    pub async fn run_round_with_progress<F>(
        &self,
        clients: Vec<ClientConfig>,
        mut on_progress: F,
    ) -> Result<RoundResult>
    where
        F: FnMut(&RoundProgress) + Send,
    {
        validate_clients(&clients)?;

        let round_id = RoundId::generate();
        let expected = clients.len();
        let started_at = now();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handles = launch_clients(clients, &tx);
        let start = Instant::now();
        info!(
            %round_id,
            expected,
            timeout_s = self.timeout.as_secs_f64(),
            grace_s = self.grace_period.as_secs_f64(),
            "Async round started"
        );

        let mut running = SummaryAggregator::new();
        let mut last_arrival: Option<Instant> = None;

        let termination = loop {
            let current = Instant::now();
            let elapsed = current - start;
            if elapsed >= self.timeout {
                break Termination::Timeout;
            }

            let mut wait = self.recv_timeout.min(self.timeout - elapsed);
            if let Some(last) = last_arrival {
                let silence = current - last;
                if silence >= self.grace_period {
                    break Termination::GraceElapsed;
                }
                wait = wait.min(self.grace_period - silence);
            }

            let summary = match timeout(wait, rx.recv()).await {
                Ok(Some(summary)) => summary,
                Ok(None) => {
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Err(_) => continue,
            };

            let arrived = Instant::now();
            last_arrival = Some(arrived);

            let client_id = summary.client_id;
            let aggregate = running.push(summary)?;
            info!(
                client_id,
                received = running.len(),
                expected,
                mean = aggregate.mean,
                variance = aggregate.variance,
                "Running aggregate updated"
            );
            on_progress(&RoundProgress {
                client_id,
                received: running.len(),
                expected,
                elapsed: arrived - start,
                aggregate,
            });

            if running.len() == expected {
                break Termination::AllResponded;
            }
        };
        let duration = start.elapsed();
        drop(rx);
        drop(tx);

        join_with_grace(handles, self.join_grace).await;

        let summaries = running.into_summaries();
        let aggregate = merge_summaries(&summaries)?;
        let dropped = expected - summaries.len();

        info!(
            %round_id,
            received = summaries.len(),
            dropped,
            duration_s = duration.as_secs_f64(),
            reason = %termination,
            "Async round complete"
        );

        Ok(RoundResult {
            round_id,
            mode: RoundMode::Async,
            started_at,
            expected,
            summaries,
            dropped,
            duration,
            termination,
            aggregate,
        })
    }
}

impl Default for AsyncCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{DataSource, InMemorySource};
    use crate::fault::FaultConfig;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Source that takes a fixed time to load.
    #[derive(Debug)]
    struct SlowSource {
        delay: Duration,
        values: Vec<f64>,
    }

    #[async_trait]
    impl DataSource for SlowSource {
        async fn load(&self) -> Result<Vec<f64>> {
            tokio::time::sleep(self.delay).await;
            Ok(self.values.clone())
        }

        fn describe(&self) -> String {
            format!("slow[{:?}]", self.delay)
        }
    }

    fn client(id: u32, delay: Duration, values: Vec<f64>) -> ClientConfig {
        ClientConfig::new(id, Arc::new(SlowSource { delay, values }))
            .with_bins(4)
            .with_hist_range(-10.0, 10.0)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stops_when_everyone_responded() {
        let clients = (1..=5)
            .map(|id| {
                ClientConfig::new(id, Arc::new(InMemorySource::new(vec![id as f64])))
                    .with_bins(4)
                    .with_hist_range(-10.0, 10.0)
            })
            .collect();

        let coordinator = AsyncCoordinator::new(Duration::from_secs(5), Duration::from_secs(1));
        let result = coordinator.run_round(clients).await.unwrap();

        assert_eq!(result.received(), 5);
        assert_eq!(result.dropped, 0);
        assert_eq!(result.termination, Termination::AllResponded);
        assert_eq!(result.aggregate.n, 5);
        assert_eq!(result.aggregate.mean, 3.0);
        assert!(result.duration < Duration::from_secs(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_hard_timeout_excludes_straggler() {
        let clients = vec![
            client(1, Duration::ZERO, vec![1.0]),
            client(2, Duration::from_millis(900), vec![2.0]),
        ];

        // The grace period is longer than the timeout, so only the timeout can fire.
        let coordinator = AsyncCoordinator::new(Duration::from_millis(600), Duration::from_secs(5));
        let result = coordinator.run_round(clients).await.unwrap();

        assert_eq!(result.termination, Termination::Timeout);
        assert_eq!(result.received_ids(), vec![1]);
        assert_eq!(result.dropped, 1);
        assert!(result.duration >= Duration::from_millis(600));
        assert!(result.duration < Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_wins_over_simultaneous_grace() {
        let faults = FaultConfig::new(1.0, Duration::ZERO).unwrap();
        let clients = vec![
            client(1, Duration::ZERO, vec![1.0]),
            client(2, Duration::ZERO, vec![2.0]).with_faults(faults),
        ];

        // Client 1 arrives at the start, so grace and timeout expire together.
        let window = Duration::from_millis(500);
        let coordinator = AsyncCoordinator::new(window, window);
        let result = coordinator.run_round(clients).await.unwrap();

        assert_eq!(result.termination, Termination::Timeout);
        assert_eq!(result.received_ids(), vec![1]);
        assert_eq!(result.dropped, 1);
        assert_eq!(result.duration, window);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_grace_period_closes_round_early() {
        let clients = vec![
            client(1, Duration::ZERO, vec![1.0]),
            client(2, Duration::from_millis(100), vec![3.0]),
            client(3, Duration::from_secs(10), vec![5.0]),
        ];

        let coordinator = AsyncCoordinator::new(Duration::from_secs(5), Duration::from_millis(400));
        let result = coordinator.run_round(clients).await.unwrap();

        assert_eq!(result.termination, Termination::GraceElapsed);
        assert_eq!(result.received(), 2);
        assert_eq!(result.dropped, 1);
        assert_eq!(result.aggregate.mean, 2.0);
        assert!(result.duration < Duration::from_secs(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_arrivals_waits_for_timeout() {
        let faults = FaultConfig::new(1.0, Duration::ZERO).unwrap();
        let clients = vec![
            client(1, Duration::ZERO, vec![1.0]).with_faults(faults.clone()),
            client(2, Duration::ZERO, vec![2.0]).with_faults(faults),
        ];

        let coordinator = AsyncCoordinator::new(Duration::from_millis(300), Duration::from_millis(50));
        let result = coordinator.run_round(clients).await.unwrap();

        // Grace only applies after a first arrival.
        assert_eq!(result.termination, Termination::Timeout);
        assert_eq!(result.received(), 0);
        assert_eq!(result.dropped, 2);
        assert!(result.aggregate.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_progress_reported_per_arrival() {
        let clients = vec![
            client(1, Duration::ZERO, vec![2.0]),
            client(2, Duration::from_millis(150), vec![4.0]),
            client(3, Duration::from_millis(300), vec![6.0]),
        ];

        let mut reports = Vec::new();
        let coordinator = AsyncCoordinator::new(Duration::from_secs(3), Duration::from_secs(1));
        let result = coordinator
            .run_round_with_progress(clients, |p| {
                reports.push((p.client_id, p.received, p.aggregate.n, p.aggregate.mean))
            })
            .await
            .unwrap();

        assert_eq!(result.termination, Termination::AllResponded);
        assert_eq!(
            reports,
            vec![(1, 1, 1, 2.0), (2, 2, 2, 3.0), (3, 3, 3, 4.0)]
        );
    }
}
