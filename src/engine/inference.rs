use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use super::error::EngineError;
use crate::tree::{Binner, SequenceTree};
use crate::types::{PriceBar, Synthesis};

/// Rolling window of the most recent live bins.
#[derive(Debug, Clone)]
pub struct LiveInference {
    window: VecDeque<usize>,
    capacity: usize,
    last_close: Option<f64>,
    last_timestamp: Option<DateTime<Utc>>,
    bars_seen: u64,
}

impl LiveInference {
    pub fn new(sequence_length: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(sequence_length),
            capacity: sequence_length,
            last_close: None,
            last_timestamp: None,
            bars_seen: 0,
        }
    }

    /// Uses `close` as the reference for the first live return, unless live
    /// bars have already supplied one.
    pub fn seed(&mut self, close: f64) {
        if self.last_close.is_none() {
            self.last_close = Some(close);
        }
    }

    /// Folds `bar` into the window. `None` when there was no earlier close to
    /// take a return against.
    pub fn push(&mut self, bar: &PriceBar, binner: &Binner) -> Result<Option<usize>, EngineError> {
        bar.check()
            .map_err(|reason| EngineError::MalformedBar { reason })?;
        if let Some(prev) = self.last_timestamp {
            if bar.timestamp <= prev {
                return Err(EngineError::MalformedBar {
                    reason: format!("timestamp {} is not after {}", bar.timestamp, prev),
                });
            }
        }

        let bin = self.last_close.map(|prev| binner.bin(bar.return_from(prev)));
        if let Some(bin) = bin {
            if self.window.len() == self.capacity {
                self.window.pop_front();
            }
            self.window.push_back(bin);
        }

        self.last_close = Some(bar.close);
        self.last_timestamp = Some(bar.timestamp);
        self.bars_seen += 1;
        Ok(bin)
    }

    /// The full window, or the warmup shortfall.
    pub fn sequence(&self) -> Result<Vec<usize>, EngineError> {
        if self.window.len() < self.capacity {
            return Err(EngineError::InsufficientWarmup {
                have: self.window.len(),
                need: self.capacity,
            });
        }
        Ok(self.window.iter().copied().collect())
    }

    /// Pushes `bar` and matches the window against `tree`. Warmup and broken
    /// paths both come back as NONE; only malformed bars are errors.
    pub fn decide(
        &mut self,
        bar: &PriceBar,
        binner: &Binner,
        tree: &SequenceTree,
    ) -> Result<Synthesis, EngineError> {
        self.push(bar, binner)?;
        match self.sequence() {
            Ok(sequence) => Ok(tree.query(&sequence)),
            Err(EngineError::InsufficientWarmup { .. }) => Ok(Synthesis::None),
            Err(e) => Err(e),
        }
    }

    #[cfg(test)]
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn bars_seen(&self) -> u64 {
        self.bars_seen
    }
}
