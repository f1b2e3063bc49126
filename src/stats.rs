//! Incremental statistics of the cells of a band.
use serde_derive::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Count, extrema and first two moments of the valid
/// cells of a band. Accumulated by add-assigning:
///
/// - a `f64` cell value (`NaN` cells are skipped),
/// - another `BandStats`, merging the two.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandStats {
    count: u64,
    min: f64,
    max: f64,
    sum: f64,
    sum_2: f64,
}

impl Default for BandStats {
    fn default() -> Self {
        BandStats {
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.,
            sum_2: 0.,
        }
    }
}

impl AddAssign<f64> for BandStats {
    fn add_assign(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.sum_2 += value * value;
    }
}

impl AddAssign<&BandStats> for BandStats {
    fn add_assign(&mut self, other: &BandStats) {
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.sum_2 += other.sum_2;
    }
}

impl<'a> std::iter::FromIterator<&'a f64> for BandStats {
    fn from_iter<I: IntoIterator<Item = &'a f64>>(iter: I) -> Self {
        let mut stats = BandStats::default();
        for &v in iter {
            stats += v;
        }
        stats
    }
}

impl BandStats {
    /// Number of valid cells.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// `None` when no valid cell was seen.
    pub fn min(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.min)
        }
    }

    pub fn max(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.max)
        }
    }

    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    /// Population variance.
    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        Some((self.sum_2 / self.count as f64 - mean * mean).max(0.))
    }

    pub fn std_deviation(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_and_skips_nan() {
        let stats: BandStats = [2., 4., f64::NAN, 4., 4., 5., 5., 7., 9.].iter().collect();
        assert_eq!(stats.count(), 8);
        assert_eq!(stats.min(), Some(2.));
        assert_eq!(stats.max(), Some(9.));
        assert_eq!(stats.mean(), Some(5.));
        assert_eq!(stats.std_deviation(), Some(2.));
    }

    #[test]
    fn merge_equals_single_pass() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let values: Vec<f64> = (0..1000).map(|_| rng.gen_range(-100., 100.)).collect();

        let all: BandStats = values.iter().collect();
        let mut merged: BandStats = values[..300].iter().collect();
        merged += &values[300..].iter().collect::<BandStats>();

        assert_eq!(all.count(), merged.count());
        assert_eq!(all.min(), merged.min());
        assert_eq!(all.max(), merged.max());
        assert!((all.mean().unwrap() - merged.mean().unwrap()).abs() < 1e-9);
    }

    #[test]
    fn empty() {
        let stats = BandStats::default();
        assert!(stats.is_empty());
        assert_eq!(stats.min(), None);
        assert_eq!(stats.mean(), None);
        assert_eq!(stats.std_deviation(), None);
    }
}
