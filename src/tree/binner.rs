use serde::Serialize;

/// Equal-width partition of the training return range into `num_bins`
/// buckets. Values outside the fitted range clamp to the edge bins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binner {
    num_bins: usize,
    min: f64,
    max: f64,
    width: f64,
}

impl Binner {
    /// Fits boundaries to the min/max of `returns`. Non-finite values are ignored;
    /// `None` when nothing finite remains.
    pub fn fit(returns: &[f64], num_bins: usize) -> Option<Self> {
        let mut finite = returns.iter().copied().filter(|r| r.is_finite());
        let first = finite.next()?;
        let (min, max) = finite.fold((first, first), |(lo, hi), r| (lo.min(r), hi.max(r)));

        Some(Self {
            num_bins,
            min,
            max,
            width: (max - min) / num_bins as f64,
        })
    }

    pub fn bin(&self, value: f64) -> usize {
        let last = self.num_bins - 1;
        if value.is_nan() {
            return self.num_bins / 2;
        }
        if value <= self.min {
            return 0;
        }
        if value >= self.max {
            // a degenerate range has no interior, everything at or above it is the top edge
            return last;
        }
        let idx = ((value - self.min) / self.width).floor() as usize;
        idx.min(last)
    }

    /// `num_bins + 1` boundaries from min to max.
    pub fn edges(&self) -> Vec<f64> {
        (0..=self.num_bins)
            .map(|i| {
                if i == self.num_bins {
                    self.max
                } else {
                    self.min + self.width * i as f64
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_binner() -> Binner {
        Binner::fit(&[0.02, -0.0098, 0.0297, -0.0481], 4).unwrap()
    }

    #[test]
    fn test_equal_width_buckets() {
        let binner = scenario_binner();
        let edges = binner.edges();
        assert_eq!(edges.len(), 5);
        assert!((edges[0] + 0.0481).abs() < 1e-12);
        assert!((edges[4] - 0.0297).abs() < 1e-12);
        let width = edges[1] - edges[0];
        for pair in edges.windows(2) {
            assert!(((pair[1] - pair[0]) - width).abs() < 1e-12);
        }
    }

    #[test]
    fn test_scenario_bins() {
        let binner = scenario_binner();
        // width = 0.0778 / 4 = 0.01945
        assert_eq!(binner.bin(-0.0481), 0);
        assert_eq!(binner.bin(-0.0098), 1);
        assert_eq!(binner.bin(0.02), 3);
        assert_eq!(binner.bin(0.0297), 3);
    }

    #[test]
    fn test_clamps_outside_range() {
        let binner = scenario_binner();
        assert_eq!(binner.bin(-0.5), 0);
        assert_eq!(binner.bin(0.5), 3);
        assert_eq!(binner.bin(f64::INFINITY), 3);
        assert_eq!(binner.bin(f64::NEG_INFINITY), 0);
    }

    #[test]
    fn test_deterministic() {
        let binner = scenario_binner();
        for v in [-0.03, 0.0, 0.011, 0.025] {
            assert_eq!(binner.bin(v), binner.bin(v));
            assert!(binner.bin(v) < 4);
        }
    }

    #[test]
    fn test_degenerate_range() {
        let binner = Binner::fit(&[0.01, 0.01, 0.01], 5).unwrap();
        assert_eq!(binner.bin(0.01), 0);
        assert_eq!(binner.bin(0.0), 0);
        assert_eq!(binner.bin(0.02), 4);
    }

    #[test]
    fn test_fit_needs_finite_values() {
        assert!(Binner::fit(&[], 4).is_none());
        assert!(Binner::fit(&[f64::NAN], 4).is_none());
    }

    #[test]
    fn test_edges_bracket_each_bin() {
        let binner = scenario_binner();
        let edges = binner.edges();
        for v in [-0.04, -0.0098, 0.0, 0.015] {
            let idx = binner.bin(v);
            assert!(edges[idx] <= v && v < edges[idx + 1]);
        }
    }
}
