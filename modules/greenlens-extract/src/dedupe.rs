//! Near-duplicate removal via prefix-overlap similarity.
//!
//! O(n²) over candidate sections. Fine while per-page candidate counts
//! stay in the tens; revisit the pairwise scan if configs ever produce
//! thousands of candidates per page.

use greenlens_core::types::Section;

use crate::matcher::normalize_text;

/// Chars of normalized text used as a section's signature.
const SIGNATURE_CHARS: usize = 300;

/// Fraction of the shorter signature that must appear inside the longer
/// one for the pair to count as duplicates.
const OVERLAP_RATIO: f64 = 0.8;

/// Drop near-duplicates, keeping the first-seen section of each group in
/// input order. The asymmetric-overlap check catches exact repeats and
/// prefix/suffix supersets, e.g. a heading-crawled block that re-captures
/// text already present via a direct selector. Idempotent.
pub fn dedupe_sections(sections: Vec<Section>) -> Vec<Section> {
    let mut accepted_signatures: Vec<String> = Vec::new();
    let mut result = Vec::new();

    for section in sections {
        let signature = signature_of(&section.text);

        let is_duplicate = accepted_signatures
            .iter()
            .any(|seen| overlaps(&signature, seen));

        if !is_duplicate {
            accepted_signatures.push(signature);
            result.push(section);
        }
    }
    result
}

fn signature_of(text: &str) -> String {
    normalize_text(text).chars().take(SIGNATURE_CHARS).collect()
}

fn overlaps(a: &str, b: &str) -> bool {
    let (shorter, longer) = if a.chars().count() < b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let prefix_len = (shorter.chars().count() as f64 * OVERLAP_RATIO).floor() as usize;
    let prefix: String = shorter.chars().take(prefix_len).collect();
    longer.contains(&prefix)
}
