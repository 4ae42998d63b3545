//! Keyword family and bonus-pattern matching. Pure functions, no state.
//!
//! Keyword matching runs on normalized text (the single source of truth
//! for matching); pattern matching runs on the RAW text because patterns
//! may rely on casing or structure normalization would destroy.

use greenlens_core::sites::CompiledPattern;

/// Collapse whitespace runs to single spaces, trim, lowercase.
/// Idempotent: `normalize_text(normalize_text(x)) == normalize_text(x)`.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// True iff any term of any family is a substring of the normalized text.
/// Terms are stored lowercased at config load, so matching is
/// case-insensitive by construction. No word-boundary requirement:
/// recall over precision.
pub fn has_any_keyword(text: &str, families: &[(String, Vec<String>)]) -> bool {
    if text.is_empty() || families.is_empty() {
        return false;
    }
    let normalized = normalize_text(text);
    families
        .iter()
        .any(|(_, terms)| terms.iter().any(|term| normalized.contains(term.as_str())))
}

/// True iff any pattern regex matches the raw text.
pub fn has_any_pattern(text: &str, patterns: &[CompiledPattern]) -> bool {
    if text.is_empty() {
        return false;
    }
    patterns.iter().any(|p| p.regex.is_match(text))
}

/// Count of distinct families with at least one matching term, times
/// `per_family_bonus`. Uncapped here; the section-level clamp applies it.
pub fn keyword_bonus(text: &str, families: &[(String, Vec<String>)], per_family_bonus: f64) -> f64 {
    if text.is_empty() || families.is_empty() {
        return 0.0;
    }
    let normalized = normalize_text(text);
    let matched = families
        .iter()
        .filter(|(_, terms)| terms.iter().any(|term| normalized.contains(term.as_str())))
        .count();
    matched as f64 * per_family_bonus
}

/// Sum of matching patterns' bonuses, clamped to `cap`.
pub fn pattern_bonus(text: &str, patterns: &[CompiledPattern], cap: f64) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let total: f64 = patterns
        .iter()
        .filter(|p| p.regex.is_match(text))
        .map(|p| p.bonus)
        .sum();
    total.min(cap)
}
