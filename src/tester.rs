//! Probe orchestration.
//!
//! Names are loaded into a queue sized to the input, then a fixed number
//! of workers drain it. For each name a worker runs the plain and tor
//! probes as two tasks and waits for both before taking the next name.
//! Results arrive in completion order.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info};

use crate::error::SetupError;
use crate::paths::PathFactory;
use crate::probe::probe;
use crate::results::{CombinedResult, PathOutcome};
use crate::stats::{RunStats, StatsSnapshot};

type NameQueue = Arc<Mutex<mpsc::Receiver<String>>>;

/// Runs dual-path probes for a list of names.
pub struct Tester<P> {
    paths: Arc<P>,
    stats: Arc<RunStats>,
}

impl<P> Clone for Tester<P> {
    fn clone(&self) -> Self {
        Self {
            paths: Arc::clone(&self.paths),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<P: PathFactory> Tester<P> {
    pub fn new(paths: P) -> Self {
        Self {
            paths: Arc::new(paths),
            stats: Arc::new(RunStats::new()),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Probe every name with `workers` concurrent workers.
    ///
    /// Returns one result per input name, duplicates included, once all
    /// workers have finished. A setup fault in any worker aborts the run.
    pub async fn run(
        &self,
        names: Vec<String>,
        workers: NonZeroUsize,
    ) -> Result<Vec<CombinedResult>, SetupError> {
        let capacity = names.len().max(1);

        let (name_tx, name_rx) = mpsc::channel(capacity);
        for name in names {
            name_tx
                .send(name)
                .await
                .map_err(|_| SetupError::QueueClosed)?;
        }
        drop(name_tx);
        let queue: NameQueue = Arc::new(Mutex::new(name_rx));

        let (result_tx, mut result_rx) = mpsc::channel(capacity);
        let mut pool = JoinSet::new();
        for id in 0..workers.get() {
            pool.spawn(self.clone().work(id, queue.clone(), result_tx.clone()));
        }
        drop(result_tx);

        // Dropping the set on an early return aborts the remaining workers.
        while let Some(joined) = pool.join_next().await {
            let handled = joined??;
            debug!(handled, "worker finished");
        }

        let mut results = Vec::with_capacity(capacity);
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }

        info!(results = results.len(), "all workers finished");
        Ok(results)
    }

    /// Pull names until the queue is closed and empty.
    async fn work(
        self,
        id: usize,
        queue: NameQueue,
        results: mpsc::Sender<CombinedResult>,
    ) -> Result<usize, SetupError> {
        let mut handled = 0;
        loop {
            let next = queue.lock().await.recv().await;
            let Some(name) = next else {
                break;
            };
            debug!(worker = id, %name, "probing");

            let result = self.run_name(name).await?;
            results
                .send(result)
                .await
                .map_err(|_| SetupError::QueueClosed)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Probe one name over both paths concurrently and join the outcomes.
    pub async fn run_name(&self, name: String) -> Result<CombinedResult, SetupError> {
        let tor = self.paths.isolated()?;
        let plain = self.paths.plain();

        let plain_name = name.clone();
        let plain_task = tokio::spawn(async move {
            probe(&plain_name, &plain.resolver, &plain.fetcher, false).await
        });

        // The tor path is moved into its task and dropped when the probe ends.
        let tor_name = name.clone();
        let tor_task =
            tokio::spawn(async move { probe(&tor_name, &tor.resolver, &tor.fetcher, true).await });

        let (plain, tor) = tokio::join!(plain_task, tor_task);
        let result = CombinedResult {
            name,
            plain: settle(plain),
            tor: settle(tor),
        };

        match &result.tor.error {
            Some(error) => println!(":( {error}"),
            None => println!(":)"),
        }
        self.stats.record(&result);

        Ok(result)
    }
}

/// A probe task that panicked still yields an outcome.
fn settle(joined: Result<PathOutcome, JoinError>) -> PathOutcome {
    joined.unwrap_or_else(|e| PathOutcome::failed(format!("probe task failed: {e}")))
}
