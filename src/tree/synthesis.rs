use serde::{Deserialize, Serialize};

use crate::types::{Outcome, Synthesis};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    pub buy_wins: u64,
    pub sell_wins: u64,
    pub hold_count: u64,
}

impl NodeStats {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Buy => self.buy_wins += 1,
            Outcome::Sell => self.sell_wins += 1,
            Outcome::Hold => self.hold_count += 1,
        }
    }

    #[cfg(test)]
    pub fn total(&self) -> u64 {
        self.buy_wins + self.sell_wins + self.hold_count
    }
}

impl std::ops::Add for NodeStats {
    type Output = NodeStats;

    fn add(self, rhs: NodeStats) -> NodeStats {
        NodeStats {
            buy_wins: self.buy_wins + rhs.buy_wins,
            sell_wins: self.sell_wins + rhs.sell_wins,
            hold_count: self.hold_count + rhs.hold_count,
        }
    }
}

/// Turns a node's outcome counts into a recommendation.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisEngine {
    confidence_threshold: f64,
}

impl SynthesisEngine {
    pub fn new(confidence_threshold: f64) -> Self {
        Self {
            confidence_threshold,
        }
    }

    pub fn compute(&self, weight: u64, stats: &NodeStats) -> Synthesis {
        if weight == 0 {
            return Synthesis::None;
        }

        let w = weight as f64;
        let buy_rate = stats.buy_wins as f64 / w;
        let sell_rate = stats.sell_wins as f64 / w;

        if buy_rate >= self.confidence_threshold && buy_rate >= sell_rate {
            Synthesis::Buy
        } else if sell_rate >= self.confidence_threshold && sell_rate > buy_rate {
            Synthesis::Sell
        } else {
            Synthesis::Hold
        }
    }
}
