/*!
 * Surface water decision tree for Sentinel-2 surface reflectance.
 *
 * The tree is a fixed regression-tree classifier over three normalised
 * difference indices and raw blue, red and SWIR-2 reflectance:
 *
 *   ndi_52 = (swir1 - green) / (swir1 + green)
 *   ndi_43 = (nir - red) / (nir + red)
 *   ndi_72 = (swir2 - green) / (swir2 + green)
 *
 * Based on:
 * - Mueller, N. et al. (2016). Water observations from space: Mapping surface
 *   water from 25 years of Landsat imagery across Australia. Remote Sens. Environ.
 */

use crate::types::{PixelClass, ReflectanceBands, ValidityMask, WofsError, WofsResult};
use ndarray::{Array2, Zip};
use num_traits::Float;

/// The per-pixel inputs of the decision tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeFeatures<F> {
    pub ndi_52: F,
    pub ndi_43: F,
    pub ndi_72: F,
    /// Blue reflectance
    pub b1: F,
    /// Red reflectance
    pub b3: F,
    /// SWIR-2 reflectance
    pub b7: F,
}

impl<F: Float> TreeFeatures<F> {
    /// Derive the tree inputs from raw band values (b1, b2, b3, b4, b5, b7)
    pub fn from_bands(b1: F, b2: F, b3: F, b4: F, b5: F, b7: F) -> Self {
        Self {
            ndi_52: normalised_difference(b5, b2),
            ndi_43: normalised_difference(b4, b3),
            ndi_72: normalised_difference(b7, b2),
            b1,
            b3,
            b7,
        }
    }
}

/// Leaves of the decision tree, named by node number in the published tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeLeaf {
    Node3,
    Node6,
    Node7,
    Node10,
    Node11,
    Node14,
    Node15,
    Node17,
    Node19,
    Node20,
    Node23,
    Node25,
    Node27,
    Node31,
    Node32,
    Node33,
    Node34,
    Node36,
    Node38,
    Node40,
    Node42,
    Node44,
    Node45,
}

impl TreeLeaf {
    pub const ALL: [TreeLeaf; 23] = [
        TreeLeaf::Node3,
        TreeLeaf::Node6,
        TreeLeaf::Node7,
        TreeLeaf::Node10,
        TreeLeaf::Node11,
        TreeLeaf::Node14,
        TreeLeaf::Node15,
        TreeLeaf::Node17,
        TreeLeaf::Node19,
        TreeLeaf::Node20,
        TreeLeaf::Node23,
        TreeLeaf::Node25,
        TreeLeaf::Node27,
        TreeLeaf::Node31,
        TreeLeaf::Node32,
        TreeLeaf::Node33,
        TreeLeaf::Node34,
        TreeLeaf::Node36,
        TreeLeaf::Node38,
        TreeLeaf::Node40,
        TreeLeaf::Node42,
        TreeLeaf::Node44,
        TreeLeaf::Node45,
    ];

    /// Class assigned by this leaf
    pub fn class(self) -> PixelClass {
        match self {
            TreeLeaf::Node6
            | TreeLeaf::Node10
            | TreeLeaf::Node14
            | TreeLeaf::Node17
            | TreeLeaf::Node19
            | TreeLeaf::Node27
            | TreeLeaf::Node31
            | TreeLeaf::Node33
            | TreeLeaf::Node44 => PixelClass::Water,
            _ => PixelClass::NotWater,
        }
    }
}

#[inline]
fn normalised_difference<F: Float>(a: F, b: F) -> F {
    (a - b) / (a + b)
}

/// `value <= threshold` with the threshold rounded to the working width.
///
/// Every split is phrased as this test or its negation, so NaN inputs fall
/// to the "greater than" side of each split.
#[inline]
fn le<F: Float>(value: F, threshold: f64) -> bool {
    value <= F::from(threshold).unwrap_or_else(F::nan)
}

/// Walk the tree for one pixel; exactly one leaf is returned
pub fn classify_features<F: Float>(f: &TreeFeatures<F>) -> TreeLeaf {
    if le(f.ndi_52, -0.01) {
        if !le(f.b1, 2083.5) {
            TreeLeaf::Node3
        } else if le(f.b7, 323.5) {
            if le(f.ndi_43, 0.61) { TreeLeaf::Node6 } else { TreeLeaf::Node7 }
        } else if !le(f.b1, 1400.5) {
            if le(f.ndi_43, -0.01) { TreeLeaf::Node10 } else { TreeLeaf::Node11 }
        } else if !le(f.ndi_72, -0.23) {
            if le(f.b1, 379.0) { TreeLeaf::Node14 } else { TreeLeaf::Node15 }
        } else if le(f.ndi_43, 0.22) {
            TreeLeaf::Node17
        } else if le(f.b1, 473.0) {
            TreeLeaf::Node19
        } else {
            TreeLeaf::Node20
        }
    } else if le(f.ndi_52, 0.23) {
        if !le(f.b1, 334.5) {
            TreeLeaf::Node23
        } else if !le(f.ndi_43, 0.54) {
            TreeLeaf::Node25
        } else if le(f.ndi_52, 0.12) {
            TreeLeaf::Node27
        } else if le(f.b3, 364.5) {
            if le(f.b1, 129.5) { TreeLeaf::Node31 } else { TreeLeaf::Node32 }
        } else if le(f.b1, 300.5) {
            TreeLeaf::Node33
        } else {
            TreeLeaf::Node34
        }
    } else if !le(f.ndi_52, 0.34) {
        TreeLeaf::Node36
    } else if !le(f.b1, 249.5) {
        TreeLeaf::Node38
    } else if !le(f.ndi_43, 0.45) {
        TreeLeaf::Node40
    } else if !le(f.b3, 364.5) {
        TreeLeaf::Node42
    } else if le(f.b1, 129.5) {
        TreeLeaf::Node44
    } else {
        TreeLeaf::Node45
    }
}

/// Per-pixel water classifier. Stateless; all methods are pure functions of
/// their inputs.
pub struct PixelClassifier;

impl PixelClassifier {
    /// Tree inputs at one pixel. Panics if `(row, col)` is outside any band.
    pub fn features_at<F: Float>(bands: &ReflectanceBands<F>, row: usize, col: usize) -> TreeFeatures<F> {
        TreeFeatures::from_bands(
            bands.blue[[row, col]],
            bands.green[[row, col]],
            bands.red[[row, col]],
            bands.nir[[row, col]],
            bands.swir1[[row, col]],
            bands.swir2[[row, col]],
        )
    }

    /// Classify every pixel: 0 = not water, 1 = water, NaN = masked out
    pub fn classify<F>(bands: &ReflectanceBands<F>, mask: &ValidityMask) -> WofsResult<Array2<F>>
    where
        F: Float + Send + Sync,
    {
        bands.check_shape()?;
        let dim = bands.dim();
        if mask.dim() != dim {
            return Err(WofsError::ShapeMismatch(format!(
                "validity mask is {:?}, reflectance bands are {:?}",
                mask.dim(),
                dim
            )));
        }

        let mut classified = Array2::<F>::zeros(dim);
        let pixel = |(row, col): (usize, usize), out: &mut F, &valid: &bool| {
            *out = if valid {
                let leaf = classify_features(&Self::features_at(bands, row, col));
                leaf.class().to_value()
            } else {
                F::nan()
            };
        };

        #[cfg(feature = "parallel")]
        Zip::indexed(&mut classified).and(mask).par_for_each(pixel);
        #[cfg(not(feature = "parallel"))]
        Zip::indexed(&mut classified).and(mask).for_each(pixel);

        Ok(classified)
    }

    /// Leaf reached by every pixel, ignoring validity
    pub fn leaf_map<F: Float>(bands: &ReflectanceBands<F>) -> WofsResult<Array2<TreeLeaf>> {
        bands.check_shape()?;
        Ok(Array2::from_shape_fn(bands.dim(), |(row, col)| {
            classify_features(&Self::features_at(bands, row, col))
        }))
    }
}
