use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::engine::TrainReport;
use crate::tree::NodeCreated;
use crate::types::{PriceBar, Synthesis};

/// Everything the engine tells its observers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEvent {
    EngineInitialized { config: EngineConfig },
    DataLoaded { source: String, bars: usize },
    NodeCreated(NodeCreated),
    TrainComplete { report: TrainReport },
    DecisionTriggered {
        decision: Synthesis,
        data: PriceBar,
        timestamp: DateTime<Utc>,
    },
    Error { message: String },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::EngineInitialized { .. } => "ENGINE_INITIALIZED",
            EngineEvent::DataLoaded { .. } => "DATA_LOADED",
            EngineEvent::NodeCreated(_) => "NODE_CREATED",
            EngineEvent::TrainComplete { .. } => "TRAIN_COMPLETE",
            EngineEvent::DecisionTriggered { .. } => "DECISION_TRIGGERED",
            EngineEvent::Error { .. } => "ERROR",
        }
    }
}

/// Fan-out of engine events over a bounded broadcast channel.
///
/// Publishing never waits. A subscriber that falls more than `capacity`
/// events behind loses the oldest ones and is told how many it missed.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns how many subscribers were handed the event.
    pub fn publish(&self, event: EngineEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(event)) => {
                debug!("No subscribers for {}", event.name());
                0
            }
        }
    }

    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
            missed: 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

pub struct EventSubscription {
    rx: broadcast::Receiver<EngineEvent>,
    missed: u64,
}

impl EventSubscription {
    /// Next event, skipping past any that were dropped for lag.
    /// `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<EngineEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.missed += n;
                    warn!("Event subscriber lagged, dropped {} oldest events", n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant; `None` when nothing is queued.
    #[cfg(test)]
    pub fn try_next(&mut self) -> Option<EngineEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    self.missed += n;
                }
                Err(_) => return None,
            }
        }
    }

    /// Total events this subscriber lost to lag.
    pub fn missed(&self) -> u64 {
        self.missed
    }
}
