use serde::{Deserialize, Serialize};

/// Parameters of one engine instance. Frozen once the engine is initialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub num_bins: usize,
    pub sequence_length: usize,
    pub confidence_threshold: f64,
    pub lookahead_days: usize,
    pub take_profit_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_bins: 10,
            sequence_length: 5,
            confidence_threshold: 0.70,
            lookahead_days: 5,
            take_profit_threshold: 0.02,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.num_bins < 2 {
            errors.push("numBins must be > 1".to_string());
        }
        if self.sequence_length == 0 {
            errors.push("sequenceLength must be >= 1".to_string());
        }
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold <= 1.0) {
            errors.push("confidenceThreshold must be in (0, 1]".to_string());
        }
        if self.lookahead_days == 0 {
            errors.push("lookaheadDays must be >= 1".to_string());
        }
        // NaN fails this comparison too
        if !(self.take_profit_threshold > 0.0 && self.take_profit_threshold.is_finite()) {
            errors.push("takeProfitThreshold must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Fewest bars a training batch needs: one more than the returns required.
    pub fn min_bars(&self) -> usize {
        self.sequence_length + self.lookahead_days + 1
    }
}
