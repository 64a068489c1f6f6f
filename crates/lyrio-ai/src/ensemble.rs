//! Linear blending of two probability vectors over a shared label set.

use lyrio_core::{AlignError, LabelSet};

/// Blend two probability vectors: `weight * primary + (1 - weight) * secondary`.
///
/// `primary` must already be in canonical order. `secondary` is given in
/// `secondary_labels` order and is permuted into canonical order by label
/// value before blending — the two classifiers may have learned their
/// label sets in different insertion orders, so positional alignment is
/// never assumed.
pub fn blend(
    primary: &[f32],
    secondary: &[f32],
    secondary_labels: &[String],
    canonical: &LabelSet,
    weight: f32,
) -> Result<Vec<f32>, AlignError> {
    if primary.len() != canonical.len() {
        return Err(AlignError::LengthMismatch {
            expected: canonical.len(),
            got: primary.len(),
        });
    }
    if secondary.len() != secondary_labels.len() {
        return Err(AlignError::LengthMismatch {
            expected: secondary_labels.len(),
            got: secondary.len(),
        });
    }

    let order = canonical.alignment(secondary_labels)?;

    Ok(primary
        .iter()
        .zip(order)
        .map(|(&p, j)| weight * p + (1.0 - weight) * secondary[j])
        .collect())
}
