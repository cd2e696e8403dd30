use crate::types::{SclGrid, ValidityMask};

/// SCL codes that are safe to classify: vegetation, bare soil, water,
/// unclassified and snow/ice. Cloud, cloud shadow, saturation and no-data
/// codes are excluded.
pub const CLEAR_SCL_CODES: [u8; 5] = [4, 5, 6, 7, 11];

/// Builds per-pixel validity masks from the scene classification layer
#[derive(Debug, Clone)]
pub struct CleanMaskBuilder {
    clear_codes: Vec<u8>,
}

impl Default for CleanMaskBuilder {
    fn default() -> Self {
        Self::new(CLEAR_SCL_CODES.to_vec())
    }
}

impl CleanMaskBuilder {
    pub fn new(clear_codes: Vec<u8>) -> Self {
        Self { clear_codes }
    }

    pub fn clear_codes(&self) -> &[u8] {
        &self.clear_codes
    }

    pub fn is_clear(&self, code: u8) -> bool {
        self.clear_codes.contains(&code)
    }

    /// True wherever the SCL code is in the clear set
    pub fn build(&self, scl: &SclGrid) -> ValidityMask {
        scl.mapv(|code| self.is_clear(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_default_codes() {
        let builder = CleanMaskBuilder::default();
        let scl = Array2::from_shape_vec((2, 6), vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]).unwrap();
        let mask = builder.build(&scl);

        let expected = vec![
            false, false, false, false, true, true,
            true, true, false, false, false, true,
        ];
        assert_eq!(mask.iter().copied().collect::<Vec<_>>(), expected);
        assert_eq!(mask.dim(), scl.dim());
    }

    #[test]
    fn test_custom_codes() {
        let builder = CleanMaskBuilder::new(vec![6]);
        let scl = Array2::from_shape_vec((1, 3), vec![4, 6, 9]).unwrap();
        let mask = builder.build(&scl);
        assert_eq!(mask.iter().copied().collect::<Vec<_>>(), vec![false, true, false]);
    }

    #[test]
    fn test_empty_grid() {
        let mask = CleanMaskBuilder::default().build(&Array2::<u8>::zeros((0, 0)));
        assert_eq!(mask.len(), 0);
    }
}
