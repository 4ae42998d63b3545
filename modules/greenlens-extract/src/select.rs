//! Greedy, order-preserving budget packing.
//!
//! Critical sections (always-include selectors tagged `critical` in the
//! site config) go first; everything else follows in rank order. A section
//! that would reach or exceed the budget is skipped whole, never truncated
//! mid-section, and in the non-critical phase the first overflow stops the
//! loop entirely. Determinism and topical coherence win over maximal
//! budget utilization.

use greenlens_core::sites::CompiledSiteConfig;
use greenlens_core::types::{Section, SelectionResult};

/// Pack ranked sections into a payload below `target_chars` (strict).
pub fn select_for_analysis(
    config: &CompiledSiteConfig,
    sections: &[Section],
    target_chars: usize,
) -> SelectionResult {
    let critical_selectors = config.critical_selectors();
    let is_critical = |s: &Section| {
        s.selector
            .as_deref()
            .is_some_and(|sel| critical_selectors.contains(&sel))
    };

    let critical: Vec<&Section> = sections.iter().filter(|s| is_critical(s)).collect();
    let other: Vec<&Section> = sections.iter().filter(|s| !is_critical(s)).collect();

    let mut focused_content = String::new();
    let mut total_chars = 0usize;
    let mut selected = Vec::new();

    // Critical sections: each guarded individually, none stops the scan
    for section in critical {
        let len = section.text.chars().count();
        if total_chars + len < target_chars {
            append_block(&mut focused_content, section);
            total_chars += len;
            selected.push(section.clone());
        }
    }

    // Other sections: first overflow ends selection
    for section in other {
        let len = section.text.chars().count();
        if total_chars + len < target_chars {
            append_block(&mut focused_content, section);
            total_chars += len;
            selected.push(section.clone());
        } else {
            break;
        }
    }

    SelectionResult {
        focused_content: focused_content.trim().to_string(),
        selected,
        total_chars,
    }
}

fn append_block(out: &mut String, section: &Section) {
    out.push_str("\n\n[Section: ");
    out.push_str(section.display_label());
    out.push_str("]\n");
    out.push_str(&section.text);
}
