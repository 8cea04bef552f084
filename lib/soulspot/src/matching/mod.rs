//! Fuzzy matching between track metadata and soulseek filenames.
//!
//! Queries and candidate filenames both go through the same normalization
//! pipeline, then a word-overlap score with a handful of bonuses and
//! penalties picks the single best download candidate (or none).

pub mod score;
pub mod select;
pub mod text;

pub use score::{score, MatchReason, MatchScore, ScoreBreakdown};
pub use select::{filter_eligible, select_best, MatchOptions, Selection, SelectionResult};
pub use text::{build_search_query, normalize, transliterate};
