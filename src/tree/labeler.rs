use crate::types::{simple_return, Outcome};

/// Would a take-profit exit have fired inside the lookahead window?
#[derive(Debug, Clone, Copy)]
pub struct OutcomeLabeler {
    take_profit: f64,
}

impl OutcomeLabeler {
    pub fn new(take_profit: f64) -> Self {
        Self { take_profit }
    }

    /// BUY is checked first, so a window that reaches both targets is BUY.
    pub fn label(&self, reference_close: f64, window: &[f64]) -> Outcome {
        let (best, worst) = window
            .iter()
            .map(|&close| simple_return(reference_close, close))
            .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), r| {
                (hi.max(r), lo.min(r))
            });

        if best >= self.take_profit {
            Outcome::Buy
        } else if worst <= -self.take_profit {
            Outcome::Sell
        } else {
            Outcome::Hold
        }
    }
}
