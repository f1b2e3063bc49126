//! Multi-band tiles.

use anyhow::{bail, Result};
use ndarray::Array2;
use serde_derive::{Deserialize, Serialize};

/// A tile: one or more bands of equal shape, indexed
/// `[(row, col)]`. Missing data is `NaN`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultibandTile {
    bands: Vec<Array2<f64>>,
}

impl MultibandTile {
    pub fn new(bands: Vec<Array2<f64>>) -> Result<Self> {
        let shape = match bands.first() {
            Some(b) => b.dim(),
            None => bail!("tile has no bands"),
        };
        if bands.iter().any(|b| b.dim() != shape) {
            bail!("tile bands differ in size");
        }
        Ok(MultibandTile { bands })
    }

    /// A tile with every cell `NaN`.
    pub fn empty(cols: usize, rows: usize, band_count: usize) -> Self {
        MultibandTile {
            bands: vec![Array2::from_elem((rows, cols), f64::NAN); band_count],
        }
    }

    pub fn cols(&self) -> usize {
        self.bands[0].ncols()
    }

    pub fn rows(&self) -> usize {
        self.bands[0].nrows()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn band(&self, idx: usize) -> &Array2<f64> {
        &self.bands[idx]
    }

    pub fn band_mut(&mut self, idx: usize) -> &mut Array2<f64> {
        &mut self.bands[idx]
    }

    pub fn bands(&self) -> &[Array2<f64>] {
        &self.bands
    }

    /// Whether any cell of any band holds data.
    pub fn has_data(&self) -> bool {
        self.bands.iter().any(|b| b.iter().any(|v| !v.is_nan()))
    }
}

/// Cell-wise equality where `NaN` equals `NaN`.
impl PartialEq for MultibandTile {
    fn eq(&self, other: &Self) -> bool {
        self.bands.len() == other.bands.len()
            && self.bands.iter().zip(other.bands.iter()).all(|(a, b)| {
                a.dim() == b.dim()
                    && a
                        .iter()
                        .zip(b.iter())
                        .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_aware_equality() {
        let mut a = MultibandTile::empty(2, 2, 1);
        let mut b = MultibandTile::empty(2, 2, 1);
        assert_eq!(a, b);
        assert!(!a.has_data());

        a.band_mut(0)[(0, 1)] = 3.;
        assert_ne!(a, b);
        b.band_mut(0)[(0, 1)] = 3.;
        assert_eq!(a, b);
        assert!(a.has_data());

        assert_ne!(a, MultibandTile::empty(2, 2, 2));
    }

    #[test]
    fn rejects_mismatched_bands() {
        assert!(MultibandTile::new(vec![]).is_err());
        assert!(MultibandTile::new(vec![Array2::zeros((2, 2)), Array2::zeros((2, 3))]).is_err());
        let t = MultibandTile::new(vec![Array2::zeros((3, 4))]).unwrap();
        assert_eq!((t.cols(), t.rows(), t.band_count()), (4, 3, 1));
    }
}
