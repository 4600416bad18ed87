//! Outbox delivery worker with retry and backoff.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use stockforge_events::EventPublisher;

use super::store::{OutboxRecord, OutboxStore};

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct OutboxDispatcherConfig {
    /// How often to poll when no records are due.
    pub poll_interval: Duration,
    /// Maximum records drained per poll.
    pub batch_size: usize,
    /// Attempts before a record is marked exhausted.
    pub max_attempts: u32,
    /// Base of the exponential retry backoff.
    pub retry_backoff: Duration,
    /// Name for logging.
    pub name: String,
}

impl Default for OutboxDispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            batch_size: 32,
            max_attempts: 5,
            retry_backoff: Duration::from_millis(100),
            name: "outbox-dispatcher".to_string(),
        }
    }
}

impl OutboxDispatcherConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

/// Dispatcher runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DispatcherStats {
    pub dispatched: u64,
    pub retried: u64,
    pub exhausted: u64,
}

/// Handle to control a running dispatcher.
#[derive(Debug)]
pub struct DispatcherHandle {
    shutdown: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
    stats: Arc<Mutex<DispatcherStats>>,
}

impl DispatcherHandle {
    /// Request graceful shutdown and wait for the loop to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }

    /// Current dispatcher statistics.
    pub fn stats(&self) -> DispatcherStats {
        self.stats.lock().unwrap().clone()
    }
}

/// Background worker delivering committed outbox records to the bus.
///
/// Polls the outbox for due pending records, publishes each through the
/// `EventPublisher`, marks success, and schedules failed records for retry
/// with exponential backoff. After `max_attempts` failures a record is marked
/// exhausted and kept for inspection; delivery to consumers is therefore
/// at-least-once up to the attempt budget.
pub struct OutboxDispatcher<O, P> {
    store: O,
    publisher: P,
    config: OutboxDispatcherConfig,
}

impl<O, P> OutboxDispatcher<O, P>
where
    O: OutboxStore + 'static,
    P: EventPublisher + 'static,
{
    pub fn new(store: O, publisher: P) -> Self {
        Self::with_config(store, publisher, OutboxDispatcherConfig::default())
    }

    pub fn with_config(store: O, publisher: P, config: OutboxDispatcherConfig) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    /// Spawn the dispatch loop on the current runtime.
    pub fn spawn(self) -> DispatcherHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(Mutex::new(DispatcherStats::default()));
        let stats_clone = stats.clone();

        let join = tokio::spawn(dispatch_loop(
            self.store,
            self.publisher,
            self.config,
            shutdown_rx,
            stats_clone,
        ));

        DispatcherHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        }
    }
}

async fn dispatch_loop<O, P>(
    store: O,
    publisher: P,
    config: OutboxDispatcherConfig,
    mut shutdown: watch::Receiver<bool>,
    stats: Arc<Mutex<DispatcherStats>>,
) where
    O: OutboxStore,
    P: EventPublisher,
{
    info!(name = %config.name, "outbox dispatcher started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let due = match store.fetch_due(Utc::now(), config.batch_size).await {
            Ok(records) => records,
            Err(e) => {
                error!(name = %config.name, error = %e, "failed to fetch due outbox records");
                Vec::new()
            }
        };

        let drained = due.len();
        for record in due {
            process_record(&store, &publisher, &config, &stats, record).await;
        }

        if drained == 0 {
            tokio::select! {
                _ = tokio::time::sleep(config.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
        }
    }

    info!(name = %config.name, "outbox dispatcher stopped");
}

async fn process_record<O, P>(
    store: &O,
    publisher: &P,
    config: &OutboxDispatcherConfig,
    stats: &Arc<Mutex<DispatcherStats>>,
    record: OutboxRecord,
) where
    O: OutboxStore,
    P: EventPublisher,
{
    match publisher
        .publish(&record.topic, &record.key, &record.payload)
        .await
    {
        Ok(()) => {
            debug!(record_id = %record.id, topic = %record.topic, key = %record.key, "outbox record dispatched");
            if let Err(e) = store.mark_dispatched(record.id).await {
                // The publish succeeded; on restart this record is re-sent
                // (at-least-once, consumers are idempotent).
                error!(record_id = %record.id, error = %e, "failed to mark record dispatched");
            } else {
                stats.lock().unwrap().dispatched += 1;
            }
        }
        Err(e) => {
            let attempts = record.attempts + 1;
            if attempts >= config.max_attempts {
                error!(
                    record_id = %record.id,
                    topic = %record.topic,
                    attempts,
                    error = %e,
                    "outbox record exhausted its attempt budget"
                );
                if store
                    .mark_exhausted(record.id, attempts, e.to_string())
                    .await
                    .is_ok()
                {
                    stats.lock().unwrap().exhausted += 1;
                }
            } else {
                let backoff = config.retry_backoff * 2u32.saturating_pow(attempts - 1).min(1024);
                let next_attempt_at = Utc::now()
                    + ChronoDuration::from_std(backoff).unwrap_or_else(|_| ChronoDuration::seconds(60));
                warn!(
                    record_id = %record.id,
                    topic = %record.topic,
                    attempts,
                    error = %e,
                    "publish failed, retry scheduled"
                );
                if store
                    .mark_retry(record.id, attempts, next_attempt_at, e.to_string())
                    .await
                    .is_ok()
                {
                    stats.lock().unwrap().retried += 1;
                }
            }
        }
    }
}
