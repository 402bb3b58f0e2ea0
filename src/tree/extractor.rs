use crate::engine::EngineError;

/// One training window: the bins of `sequence_length` consecutive returns,
/// the close of the bar that ends them, and the closes that follow.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSequence<'a> {
    pub bins: &'a [usize],
    pub reference_close: f64,
    pub outcome_window: &'a [f64],
}

#[derive(Debug, Clone, Copy)]
pub struct SequenceExtractor {
    sequence_length: usize,
    lookahead: usize,
}

impl SequenceExtractor {
    pub fn new(sequence_length: usize, lookahead: usize) -> Self {
        Self {
            sequence_length,
            lookahead,
        }
    }

    /// Slides over `bins` (one per return) with `closes` aligned so that
    /// `bins[i]` is the move into `closes[i + 1]`.
    ///
    /// Yields `bins.len() - sequence_length - lookahead + 1` windows.
    pub fn extract<'a>(
        &self,
        bins: &'a [usize],
        closes: &'a [f64],
    ) -> Result<Vec<ExtractedSequence<'a>>, EngineError> {
        let needed = self.sequence_length + self.lookahead;
        if bins.len() < needed || closes.len() != bins.len() + 1 {
            return Err(EngineError::InsufficientData {
                bars: closes.len(),
                required: needed + 1,
            });
        }

        let count = bins.len() - needed + 1;
        let sequences = (0..count)
            .map(|k| {
                let end = k + self.sequence_length;
                ExtractedSequence {
                    bins: &bins[k..end],
                    reference_close: closes[end],
                    outcome_window: &closes[end + 1..end + 1 + self.lookahead],
                }
            })
            .collect();

        Ok(sequences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_count_and_alignment() {
        let closes = [100.0, 102.0, 101.0, 104.0, 99.0];
        let bins = [3, 1, 3, 0];
        let extractor = SequenceExtractor::new(2, 1);

        let seqs = extractor.extract(&bins, &closes).unwrap();
        assert_eq!(seqs.len(), 2);

        assert_eq!(seqs[0].bins, &[3, 1]);
        assert_eq!(seqs[0].reference_close, 101.0);
        assert_eq!(seqs[0].outcome_window, &[104.0]);

        assert_eq!(seqs[1].bins, &[1, 3]);
        assert_eq!(seqs[1].reference_close, 104.0);
        assert_eq!(seqs[1].outcome_window, &[99.0]);
    }

    #[test]
    fn test_exact_minimum_yields_one() {
        let closes = [1.0, 2.0, 3.0, 4.0];
        let bins = [0, 1, 2];
        let seqs = SequenceExtractor::new(2, 1).extract(&bins, &closes).unwrap();
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs[0].outcome_window, &[4.0]);
    }

    #[test]
    fn test_insufficient_data() {
        let closes = [1.0, 2.0, 3.0];
        let bins = [0, 1];
        let err = SequenceExtractor::new(2, 1).extract(&bins, &closes).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientData {
                bars: 3,
                required: 4
            }
        );
    }
}
