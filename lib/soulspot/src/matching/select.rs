use std::cmp::Ordering;
use std::path::Path;

use serde::Serialize;
use shared::slskd::SearchResult;
use tracing::{debug, info};

use super::score::{score, MatchScore};
use super::text::normalize;

/// Deployment-level matching knobs.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Minimum score for accepting a candidate.
    pub threshold: f64,
    /// The one file extension eligible for download.
    pub extension: String,
    /// How many ranked candidates to emit in the audit log.
    pub log_top: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.15,
            extension: "mp3".to_string(),
            log_top: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Selection {
    Winner(SearchResult),
    NoMatch { best_score: Option<f64> },
}

/// Outcome of one selection run, with the full ranked trail for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionResult {
    pub selection: Selection,
    pub ranked: Vec<MatchScore>,
}

impl SelectionResult {
    pub fn winner(&self) -> Option<&SearchResult> {
        match &self.selection {
            Selection::Winner(candidate) => Some(candidate),
            Selection::NoMatch { .. } => None,
        }
    }

    pub fn best_score(&self) -> Option<f64> {
        self.ranked.first().map(|m| m.score)
    }

    /// Emit the decision trail for offline threshold tuning.
    pub fn log_decision(&self, query: &str) {
        info!("Query: {query}");
        info!("Normalized query: {}", normalize(query));
        info!("Scored candidates: {}", self.ranked.len());
        match &self.selection {
            Selection::Winner(candidate) => {
                info!(
                    "Selected: {} from {} ({} bytes)",
                    candidate.filename, candidate.username, candidate.size
                );
            }
            Selection::NoMatch { best_score } => match best_score {
                Some(best) => info!("Selected: none (closest score: {best:.3})"),
                None => info!("Selected: none (no eligible candidates)"),
            },
        }
    }
}

/// Keep the candidates with the target extension, dropping everything else.
/// Candidates with an empty path are never eligible. Order is preserved and
/// nothing is deduplicated.
pub fn filter_eligible<'a>(
    candidates: &'a [SearchResult],
    extension: &str,
) -> Vec<&'a SearchResult> {
    let eligible: Vec<&SearchResult> = candidates
        .iter()
        .filter(|c| !c.filename.is_empty() && has_extension(&c.filename, extension))
        .collect();
    debug!(
        "Filtered {} results to {} .{} files",
        candidates.len(),
        eligible.len(),
        extension
    );
    eligible
}

fn has_extension(filename: &str, extension: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Filter, score, rank and threshold-gate a raw candidate set.
///
/// The sort is stable and descending, so candidates with equal scores keep
/// their input order and repeated calls with the same arguments return the
/// same result.
pub fn select_best(
    query: &str,
    candidates: &[SearchResult],
    options: &MatchOptions,
) -> SelectionResult {
    let eligible = filter_eligible(candidates, &options.extension);
    if eligible.is_empty() {
        info!(
            "No eligible .{} files among {} search results",
            options.extension,
            candidates.len()
        );
        return SelectionResult {
            selection: Selection::NoMatch { best_score: None },
            ranked: Vec::new(),
        };
    }

    let mut scored: Vec<(&SearchResult, MatchScore)> = eligible
        .into_iter()
        .map(|c| (c, score(query, &c.filename)))
        .collect();
    scored.sort_by(|a, b| b.1.score.partial_cmp(&a.1.score).unwrap_or(Ordering::Equal));

    debug!("Match analysis for query: {query}");
    for (i, (_, m)) in scored.iter().take(options.log_top).enumerate() {
        debug!("  {}. score: {:.3} - {} ({})", i + 1, m.score, m.filename, m.reason);
    }

    let (best, best_match) = &scored[0];
    let selection = if best_match.score >= options.threshold {
        info!(
            "Selected best match: {} (score: {:.3})",
            best_match.filename, best_match.score
        );
        Selection::Winner((*best).clone())
    } else {
        info!(
            "No suitable match found (best score: {:.3}, threshold: {:.2})",
            best_match.score, options.threshold
        );
        Selection::NoMatch {
            best_score: Some(best_match.score),
        }
    };

    SelectionResult {
        selection,
        ranked: scored.into_iter().map(|(_, m)| m).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(username: &str, filename: &str) -> SearchResult {
        SearchResult {
            username: username.to_string(),
            filename: filename.to_string(),
            size: 7_340_032,
            upload_speed: 0,
            locked: false,
        }
    }

    fn options() -> MatchOptions {
        MatchOptions::default()
    }

    #[test]
    fn filter_keeps_only_the_target_extension() {
        let candidates = vec![
            candidate("a", "Track One.mp3"),
            candidate("b", "Track Two.wav"),
            candidate("c", "Track Three.MP3"),
            candidate("d", "no-extension"),
            candidate("e", ""),
        ];
        let eligible = filter_eligible(&candidates, "mp3");
        let names: Vec<&str> = eligible.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(names, vec!["Track One.mp3", "Track Three.MP3"]);
    }

    #[test]
    fn empty_candidate_set_yields_no_match() {
        let result = select_best("bastinov devine", &[], &options());
        assert_eq!(
            result.selection,
            Selection::NoMatch { best_score: None }
        );
        assert!(result.ranked.is_empty());
    }

    #[test]
    fn wrong_extension_yields_no_match_even_on_perfect_text() {
        let candidates = vec![candidate("a", "bastinov devine wav.wav")];
        let result = select_best("bastinov devine wav", &candidates, &options());
        assert_eq!(result.selection, Selection::NoMatch { best_score: None });
    }

    #[test]
    fn picks_the_eligible_original_mix() {
        let candidates = vec![
            candidate("a", "01 - Bastinov - Devine (Original Mix) [LABEL001].mp3"),
            candidate("b", "Bastinov - Devine (Club Edit).wav"),
        ];
        let result = select_best("bastinov devine", &candidates, &options());
        let winner = result.winner().expect("expected a winner");
        assert_eq!(winner.username, "a");
        assert_eq!(result.ranked.len(), 1);
    }

    #[test]
    fn below_threshold_reports_the_closest_score() {
        let candidates = vec![candidate("a", "Random Artist - Unrelated Song.mp3")];
        let result = select_best("intelectual to el barrio sabe", &candidates, &options());
        match result.selection {
            Selection::NoMatch { best_score: Some(best) } => assert!(best < 0.15),
            other => panic!("expected a scored no-match, got {other:?}"),
        }
    }

    #[test]
    fn threshold_gate_is_monotonic() {
        // half the query words match: a mid-range score of 0.5
        let candidates = vec![candidate("a", "Bastinov - Devine.mp3")];
        let query = "bastinov devine original extended";

        let strict = select_best(
            query,
            &candidates,
            &MatchOptions {
                threshold: 0.99,
                ..options()
            },
        );
        assert!(strict.winner().is_none());

        let lenient = select_best(query, &candidates, &options());
        assert!(lenient.winner().is_some());
        // same candidate set, same computed scores, only the gate moved
        assert_eq!(strict.ranked, lenient.ranked);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let candidates = vec![
            candidate("first", "Bastinov - Devine.mp3"),
            candidate("second", "Bastinov - Devine.mp3"),
        ];
        let result = select_best("bastinov devine", &candidates, &options());
        assert_eq!(result.winner().unwrap().username, "first");
    }

    #[test]
    fn selection_is_deterministic() {
        let candidates = vec![
            candidate("a", "Bastinov - Devine (Original Mix).mp3"),
            candidate("b", "Bastinov - Devine.mp3"),
            candidate("c", "Other - Something.mp3"),
        ];
        let first = select_best("bastinov devine", &candidates, &options());
        let second = select_best("bastinov devine", &candidates, &options());
        assert_eq!(first, second);
    }

    #[test]
    fn ranked_trail_is_sorted_descending() {
        let candidates = vec![
            candidate("a", "Nothing Related Here.mp3"),
            candidate("b", "Bastinov - Devine.mp3"),
        ];
        let result = select_best("bastinov devine", &candidates, &options());
        assert_eq!(result.ranked.len(), 2);
        assert!(result.ranked[0].score >= result.ranked[1].score);
        assert_eq!(result.ranked[0].filename, "Bastinov - Devine.mp3");
        assert_eq!(result.best_score(), Some(result.ranked[0].score));
    }
}
