//! Post-processing of scoring-service output: percentage scale repair,
//! tolerance-gated renormalization, and reference-matrix enrichment.

use greenlens_core::matrix::MaterialMatrix;
use greenlens_core::types::Material;

/// Drift beyond this triggers renormalization of the percentage vector.
const SUM_TOLERANCE: f64 = 0.05;

/// Bring material percentages onto a 0..=1 scale summing to ≈1.0.
///
/// The service sometimes answers on a 0-100 scale; any value above 1 flips
/// the whole vector to /100. After scale repair, the vector is rescaled
/// only when |sum − 1.0| exceeds the tolerance — small drift is left alone.
pub fn normalize_percentages(materials: &mut [Material]) {
    let on_percent_scale = materials
        .iter()
        .filter_map(|m| m.percentage)
        .any(|p| p > 1.0 + f64::EPSILON);

    if on_percent_scale {
        for material in materials.iter_mut() {
            if let Some(p) = material.percentage.as_mut() {
                *p /= 100.0;
            }
        }
    }

    let sum: f64 = materials.iter().filter_map(|m| m.percentage).sum();
    if sum > 0.0 && (sum - 1.0).abs() > SUM_TOLERANCE {
        tracing::debug!(sum, "Renormalizing material percentages");
        for material in materials.iter_mut() {
            if let Some(p) = material.percentage.as_mut() {
                *p /= sum;
            }
        }
    }
}

/// Attach reference score and recyclability from the matrix wherever the
/// service left them blank. Unknown materials stay unenriched.
pub fn enrich_materials(materials: &mut [Material], matrix: &MaterialMatrix) {
    for material in materials.iter_mut() {
        let Some(reference) = matrix.lookup(&material.name) else {
            continue;
        };
        if material.reference_score.is_none() {
            material.reference_score = Some(reference.score_0_100);
        }
        if material.recyclable.is_none() {
            material.recyclable = Some(reference.recyclable.clone());
        }
    }
}
