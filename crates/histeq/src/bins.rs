use histeq_kernels::histogram::bin_of;

use crate::error::EqualizeError;

/// Number of distinct 8-bit intensities.
pub const NUM_INTENSITIES: u32 = 256;

/// An ordered table of `B + 1` boundaries `0 = lo_0 < lo_1 < … < lo_B = 256`
/// splitting the intensity range into `B` contiguous half-open bins.
///
/// # Example
///
/// ```
/// use histeq::BinTable;
///
/// let table = BinTable::uniform(4).unwrap();
/// assert_eq!(table.boundaries(), &[0, 64, 128, 192, 256]);
/// assert_eq!(table.bin_of(130), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinTable {
    boundaries: Vec<u32>,
}

impl BinTable {
    /// Create `bins` bins of equal width.
    ///
    /// # Errors
    ///
    /// Returns [`EqualizeError::InvalidBinCount`] unless `bins` is in
    /// `1..=256` and divides 256.
    pub fn uniform(bins: usize) -> Result<Self, EqualizeError> {
        if bins == 0 || bins > NUM_INTENSITIES as usize || NUM_INTENSITIES as usize % bins != 0 {
            return Err(EqualizeError::InvalidBinCount(bins));
        }

        let width = NUM_INTENSITIES / bins as u32;
        let boundaries = (0..=bins as u32).map(|i| i * width).collect();

        Ok(Self { boundaries })
    }

    /// Create a table from explicit boundaries, allowing bins of different
    /// widths.
    ///
    /// # Errors
    ///
    /// Returns [`EqualizeError::InvalidBinBoundaries`] unless the boundaries
    /// start at 0, end at 256 and are strictly increasing.
    pub fn from_boundaries(boundaries: Vec<u32>) -> Result<Self, EqualizeError> {
        if boundaries.len() < 2 {
            return Err(EqualizeError::InvalidBinBoundaries(format!(
                "expected at least 2 boundaries, got {}",
                boundaries.len()
            )));
        }

        if boundaries[0] != 0 || boundaries[boundaries.len() - 1] != NUM_INTENSITIES {
            return Err(EqualizeError::InvalidBinBoundaries(format!(
                "boundaries must span 0..{NUM_INTENSITIES}, got {:?}..{:?}",
                boundaries.first(),
                boundaries.last()
            )));
        }

        if let Some(w) = boundaries.windows(2).find(|w| w[0] >= w[1]) {
            return Err(EqualizeError::InvalidBinBoundaries(format!(
                "boundaries must be strictly increasing, found {} before {}",
                w[0], w[1]
            )));
        }

        Ok(Self { boundaries })
    }

    /// Number of bins in the table.
    pub fn num_bins(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// The `B + 1` boundaries of the table.
    pub fn boundaries(&self) -> &[u32] {
        &self.boundaries
    }

    /// The bin containing `value`.
    pub fn bin_of(&self, value: u8) -> Option<usize> {
        bin_of(value, &self.boundaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform() -> Result<(), EqualizeError> {
        let table = BinTable::uniform(256)?;
        assert_eq!(table.num_bins(), 256);
        for v in 0..=255u8 {
            assert_eq!(table.bin_of(v), Some(v as usize));
        }

        let table = BinTable::uniform(1)?;
        assert_eq!(table.boundaries(), &[0, 256]);
        assert_eq!(table.bin_of(255), Some(0));

        Ok(())
    }

    #[test]
    fn test_uniform_invalid() {
        for bins in [0, 3, 100, 257, 512] {
            assert_eq!(
                BinTable::uniform(bins),
                Err(EqualizeError::InvalidBinCount(bins))
            );
        }
    }

    #[test]
    fn test_from_boundaries() -> Result<(), EqualizeError> {
        let table = BinTable::from_boundaries(vec![0, 16, 200, 256])?;
        assert_eq!(table.num_bins(), 3);
        assert_eq!(table.bin_of(15), Some(0));
        assert_eq!(table.bin_of(16), Some(1));
        assert_eq!(table.bin_of(199), Some(1));
        assert_eq!(table.bin_of(200), Some(2));
        Ok(())
    }

    #[test]
    fn test_from_boundaries_invalid() {
        for boundaries in [
            vec![0],
            vec![1, 256],
            vec![0, 255],
            vec![0, 100, 100, 256],
            vec![0, 200, 100, 256],
        ] {
            assert!(matches!(
                BinTable::from_boundaries(boundaries),
                Err(EqualizeError::InvalidBinBoundaries(_))
            ));
        }
    }
}
