use crate::entity::EntityId;
use crate::format;
use crate::runtime::{BotRuntime, DedupStore};
use crate::sink::Notifier;
use crate::upstream::{FetchError, FlightSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time as tok_time;
use tracing::{debug, error, info, warn};

/// What happened to one entity during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A changed record was delivered and stored.
    Notified,
    /// Same record as the last one sent.
    Unchanged,
    /// The provider had nothing for the entity.
    NoData,
    /// Fetch failed or timed out; the store was left alone.
    Failed,
    /// Delivery failed; the record stays unsent and is retried next tick.
    SendFailed,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub outcomes: Vec<(EntityId, Outcome)>,
}

impl CycleReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }
}

/// The fetch / compare / notify loop.
pub struct Poller {
    entities: Vec<EntityId>,
    source: Arc<dyn FlightSource>,
    notifier: Arc<dyn Notifier>,
    store: DedupStore,
    interval: Duration,
    fetch_timeout: Duration,
}

impl Poller {
    pub fn new(
        rt: &BotRuntime,
        source: Arc<dyn FlightSource>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            entities: rt.entities().to_vec(),
            source,
            notifier,
            store: rt.store.clone(),
            interval,
            fetch_timeout,
        }
    }

    async fn poll_entity(&self, entity: &EntityId) -> Outcome {
        let fetched = tok_time::timeout(self.fetch_timeout, self.source.fetch(entity))
            .await
            .unwrap_or_else(|_| Err(FetchError::Timeout(self.fetch_timeout)));

        let record = match fetched {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("{} has no data for {}", self.source.name(), entity);
                return Outcome::NoData;
            }
            Err(e) => {
                warn!("fail to fetch {} from {}: {}", entity, self.source.name(), e);
                return Outcome::Failed;
            }
        };

        if self.store.get(entity).as_ref() == Some(&record) {
            return Outcome::Unchanged;
        }

        let notification = format::notification(entity, &record);
        match self.notifier.send(&notification).await {
            Ok(()) => {
                self.store.set(entity.clone(), record);
                info!("sent new data for {}", entity);
                Outcome::Notified
            }
            Err(e) => {
                error!("fail to notify about {}: {:#}", entity, e);
                Outcome::SendFailed
            }
        }
    }

    /// Run one cycle over every entity, in configured order.
    pub async fn poll_once(&self) -> CycleReport {
        let mut report = CycleReport::default();
        for entity in &self.entities {
            let outcome = self.poll_entity(entity).await;
            report.outcomes.push((entity.clone(), outcome));
        }
        report
    }

    /// Poll until the shutdown signal arrives. The first cycle starts
    /// immediately and each sleep starts when the previous cycle ends. The
    /// signal is only observed between cycles so a send and its store update
    /// are never split.
    pub async fn run(self, mut shutdown: broadcast::Receiver<u8>) {
        info!(
            "polling {} aircraft from {} every {:?}",
            self.entities.len(),
            self.source.name(),
            self.interval
        );

        loop {
            let report = self.poll_once().await;
            info!(
                "cycle done: {} sent, {} unchanged, {} without data, {} failed",
                report.count(Outcome::Notified),
                report.count(Outcome::Unchanged),
                report.count(Outcome::NoData),
                report.count(Outcome::Failed) + report.count(Outcome::SendFailed),
            );

            tokio::select! {
                // receive shutdown signal
                _ = shutdown.recv() => {
                    info!("poll loop stopped");
                    return;
                }

                _ = tok_time::sleep(self.interval) => {}
            }
        }
    }

    pub fn spawn(self, shutdown: broadcast::Receiver<u8>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
