use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Checks the fields a bar needs before it can take part in return math.
    pub fn check(&self) -> Result<(), String> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(format!("{} is not a finite number", name));
            }
        }
        if self.close <= 0.0 {
            return Err(format!("close must be positive, got {}", self.close));
        }
        Ok(())
    }

    pub fn return_from(&self, prev_close: f64) -> f64 {
        simple_return(prev_close, self.close)
    }
}

/// `(curr - prev) / prev`
pub fn simple_return(prev_close: f64, curr_close: f64) -> f64 {
    (curr_close - prev_close) / prev_close
}

/// Validates a loaded series: every bar well formed, timestamps strictly increasing.
pub fn validate_series(bars: &[PriceBar]) -> Result<(), String> {
    if bars.is_empty() {
        return Err("no bars".to_string());
    }
    for (i, bar) in bars.iter().enumerate() {
        bar.check().map_err(|e| format!("bar {}: {}", i, e))?;
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(format!(
                "bar {}: timestamp {} is not after {}",
                i,
                bar.timestamp,
                bars[i - 1].timestamp
            ));
        }
    }
    Ok(())
}

/// One return per adjacent pair of bars; length is `bars.len() - 1`.
pub fn return_series(bars: &[PriceBar]) -> Vec<f64> {
    bars.windows(2)
        .map(|pair| simple_return(pair[0].close, pair[1].close))
        .collect()
}
