use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::text::normalize;

const SEQUENCE_BONUS: f64 = 0.2;
const ORIGINAL_BONUS: f64 = 0.1;
const EXTRA_WORD_PENALTY: f64 = 0.02;
const EXTRA_WORD_GRACE: usize = 3;

/// Component-level breakdown of a word-overlap score, kept for audit logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub sequence_bonus: f64,
    pub original_bonus: f64,
    pub extra_words_penalty: f64,
    pub matching_words: usize,
    pub query_words: usize,
}

impl fmt::Display for ScoreBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "base:{:.2} seq:{:.2} orig:{:.2} penalty:{:.2} ({}/{} words)",
            self.base,
            self.sequence_bonus,
            self.original_bonus,
            self.extra_words_penalty,
            self.matching_words,
            self.query_words
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    EmptyQuery,
    ExactMatch,
    WordOverlap(ScoreBreakdown),
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchReason::EmptyQuery => write!(f, "empty query"),
            MatchReason::ExactMatch => write!(f, "exact match"),
            MatchReason::WordOverlap(breakdown) => breakdown.fmt(f),
        }
    }
}

/// Relevance of one candidate file to one query, in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchScore {
    pub score: f64,
    pub filename: String,
    pub reason: MatchReason,
}

/// The part of a remote path worth scoring: the filename itself, with the
/// immediate parent directory prepended when there is one. Release folders
/// routinely carry the artist or album name the filename omits.
pub fn extract_relevant_portion(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut parts = path.rsplitn(3, '/');
    let file = parts.next().unwrap_or_default();
    match parts.next() {
        Some(parent) if !parent.is_empty() => format!("{parent} {file}"),
        _ => file.to_string(),
    }
}

/// Score how well a remote path matches a query built from track metadata.
///
/// Base score is the ratio of candidate words found in the query to total
/// query words; candidate occurrences are counted without deduplication, so
/// the pre-clamp sum can exceed 1.0. On top of that: +0.2 when the whole
/// query appears verbatim in the candidate, +0.1 for "original" versions,
/// and -0.02 per extra candidate word beyond a grace allowance of 3 (label
/// tags and catalog numbers ride for free). Clamped to `[0, 1]` at the end,
/// not per term.
pub fn score(query: &str, path: &str) -> MatchScore {
    let norm_query = normalize(query);
    let norm_candidate = normalize(&extract_relevant_portion(path));

    let query_words: Vec<&str> = norm_query.split_whitespace().collect();
    let candidate_words: Vec<&str> = norm_candidate.split_whitespace().collect();

    if query_words.is_empty() {
        return MatchScore {
            score: 0.0,
            filename: path.to_string(),
            reason: MatchReason::EmptyQuery,
        };
    }

    if norm_query == norm_candidate {
        return MatchScore {
            score: 1.0,
            filename: path.to_string(),
            reason: MatchReason::ExactMatch,
        };
    }

    let query_set: HashSet<&str> = query_words.iter().copied().collect();
    let matching_words = candidate_words
        .iter()
        .filter(|w| query_set.contains(*w))
        .count();

    let base = matching_words as f64 / query_words.len() as f64;

    let sequence_bonus = if matching_words > 1 && norm_candidate.contains(&norm_query) {
        SEQUENCE_BONUS
    } else {
        0.0
    };

    let original_bonus = if norm_candidate.contains("original") {
        ORIGINAL_BONUS
    } else {
        0.0
    };

    let extra_words = candidate_words.len().saturating_sub(matching_words);
    let extra_words_penalty =
        extra_words.saturating_sub(EXTRA_WORD_GRACE) as f64 * EXTRA_WORD_PENALTY;

    let total = (base + sequence_bonus + original_bonus - extra_words_penalty).clamp(0.0, 1.0);

    MatchScore {
        score: total,
        filename: path.to_string(),
        reason: MatchReason::WordOverlap(ScoreBreakdown {
            base,
            sequence_bonus,
            original_bonus,
            extra_words_penalty,
            matching_words,
            query_words: query_words.len(),
        }),
    }
}
