pub mod dedupe;
pub mod extractor;
pub mod matcher;
pub mod select;

pub use dedupe::dedupe_sections;
pub use extractor::{ContentExtractor, ExtractorLimits, rank_sections};
pub use matcher::{has_any_keyword, has_any_pattern, keyword_bonus, normalize_text, pattern_bonus};
pub use select::select_for_analysis;
