use serde::Serialize;
use thiserror::Error;

use crate::concepts;
use crate::config::SearchConfig;
use crate::fetch::ContentFetcher;
use crate::history::{HistoryError, HistoryQuery, HistoryStore, TimeRange};
use crate::oracle::{EnrichedCandidate, OracleOutcome, RelevanceOracle, RANK_KEEP};
use crate::ranking::{filter_and_rank, ScoredRecord};

/// Candidate counts at or below this go through the oracle rank stage;
/// larger pools skip straight to the shortlist.
const RANK_THRESHOLD: usize = 50;
/// Shortlist size when the rank stage is skipped.
const SHORTLIST_LIMIT: usize = 35;

const FALLBACK_TITLE_BONUS: f32 = 3.0;
const FALLBACK_URL_BONUS: f32 = 2.0;
const FALLBACK_VISIT_CAP: f32 = 3.0;
const FALLBACK_VISIT_PER_VISIT: f32 = 0.2;
const FALLBACK_WEEK_BONUS: f32 = 2.0;
const FALLBACK_MONTH_BONUS: f32 = 1.0;

const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;
const MONTH_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// One entry of the final answer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateResult {
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SearchRequest {
    pub query: String,
    pub time_range: TimeRange,
    /// Caller override for the history window size.
    pub max_history_items: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    pub results: Vec<CandidateResult>,
    /// True when an oracle stage failed and keyword scores stood in for it.
    pub degraded: bool,
}

impl SearchOutcome {
    fn empty() -> Self {
        Self {
            results: Vec::new(),
            degraded: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error(transparent)]
    History(#[from] HistoryError),
}

#[derive(Clone, Copy, Debug)]
pub struct SearchLimits {
    pub max_history_items: usize,
    pub enrich_limit: usize,
    pub result_limit: usize,
}

impl From<&SearchConfig> for SearchLimits {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_history_items: config.max_history_items,
            enrich_limit: config.max_candidates_to_enrich,
            result_limit: config.result_limit,
        }
    }
}

/// Runs a query end to end: history window, concept extraction, keyword
/// ranking, then the oracle stages with keyword fallback when those fail.
pub struct Pipeline<S, F, O> {
    store: S,
    fetcher: F,
    oracle: O,
    limits: SearchLimits,
}

impl<S, F, O> Pipeline<S, F, O>
where
    S: HistoryStore,
    F: ContentFetcher,
    O: RelevanceOracle,
{
    pub fn new(store: S, fetcher: F, oracle: O, limits: SearchLimits) -> Self {
        Self {
            store,
            fetcher,
            oracle,
            limits,
        }
    }

    pub async fn run(&self, request: &SearchRequest) -> Result<SearchOutcome, SearchError> {
        self.run_at(request, crate::history::now_ms()).await
    }

    pub async fn run_at(
        &self,
        request: &SearchRequest,
        now_ms: i64,
    ) -> Result<SearchOutcome, SearchError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let max_results = request
            .max_history_items
            .unwrap_or(self.limits.max_history_items)
            .min(self.limits.max_history_items);
        let history_query = HistoryQuery {
            start_time_ms: request.time_range.start_time(now_ms),
            max_results,
        };

        let records = self.store.search(&history_query)?;
        log::info!(
            "query {query:?}: {} history records in window {:?}",
            records.len(),
            request.time_range
        );
        if records.is_empty() {
            return Ok(SearchOutcome::empty());
        }

        let concepts = concepts::extract(query);
        log::debug!(
            "concepts: {:?}",
            concepts.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
        );

        let ranked = filter_and_rank(&records, &concepts, query, now_ms);
        log::info!("{} candidates after keyword ranking", ranked.len());
        if ranked.is_empty() {
            return Ok(SearchOutcome::empty());
        }

        if !self.oracle.is_enabled() {
            log::info!("oracle disabled, answering from keyword scores");
            return Ok(SearchOutcome {
                results: fallback_analysis(query, &ranked, now_ms, self.limits.result_limit),
                degraded: false,
            });
        }

        let mut degraded = false;

        // Small pools are worth an oracle rank pass. Large ones already
        // carry enough signal in the keyword scores to shortlist directly.
        let selection: Vec<ScoredRecord> = if ranked.len() <= RANK_THRESHOLD {
            match self.oracle.rank(query, &ranked, now_ms).await {
                Ok(OracleOutcome::Found(indices)) => indices
                    .into_iter()
                    .filter_map(|i| ranked.get(i).cloned())
                    .take(RANK_KEEP)
                    .collect(),
                Ok(OracleOutcome::NoneRelevant) => {
                    log::info!("oracle found no relevant candidates");
                    return Ok(SearchOutcome::empty());
                }
                Err(err) => {
                    log::warn!("oracle rank failed: {err}");
                    degraded = true;
                    ranked.iter().take(RANK_KEEP).cloned().collect()
                }
            }
        } else {
            ranked.iter().take(SHORTLIST_LIMIT).cloned().collect()
        };

        let to_enrich = &selection[..selection.len().min(self.limits.enrich_limit)];
        let urls: Vec<String> = to_enrich.iter().map(|c| c.record.url.clone()).collect();
        let mut contents = self.fetcher.fetch_batch(&urls).await;
        let enriched: Vec<EnrichedCandidate> = to_enrich
            .iter()
            .map(|c| EnrichedCandidate {
                record: c.record.clone(),
                content: contents.remove(&c.record.url).flatten(),
            })
            .collect();
        log::info!(
            "{}/{} candidates enriched with page content",
            enriched.iter().filter(|c| c.content.is_some()).count(),
            enriched.len()
        );

        match self.oracle.synthesize(query, &enriched, now_ms).await {
            Ok(OracleOutcome::Found(results)) => Ok(SearchOutcome {
                results: dedup_results(results, self.limits.result_limit),
                degraded,
            }),
            Ok(OracleOutcome::NoneRelevant) => {
                log::info!("oracle synthesis found no relevant candidates");
                Ok(SearchOutcome {
                    results: Vec::new(),
                    degraded,
                })
            }
            Err(err) => {
                log::warn!("oracle synthesis failed: {err}");
                Ok(SearchOutcome {
                    results: fallback_analysis(query, &selection, now_ms, self.limits.result_limit),
                    degraded: true,
                })
            }
        }
    }
}

/// Keyword-only answer used when the oracle is unavailable. Scores every
/// query word (no length filter, unlike the ranking stage) so even short
/// queries produce something.
pub fn fallback_analysis(
    query: &str,
    candidates: &[ScoredRecord],
    now_ms: i64,
    limit: usize,
) -> Vec<CandidateResult> {
    let words: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let mut scored: Vec<(f32, &ScoredRecord)> = candidates
        .iter()
        .filter_map(|candidate| {
            let title = candidate.record.title.to_lowercase();
            let url = candidate.record.url.to_lowercase();

            let mut score = 0.0;
            for word in &words {
                if title.contains(word.as_str()) {
                    score += FALLBACK_TITLE_BONUS;
                }
                if url.contains(word.as_str()) {
                    score += FALLBACK_URL_BONUS;
                }
            }

            score += (candidate.record.visit_count as f32 * FALLBACK_VISIT_PER_VISIT)
                .min(FALLBACK_VISIT_CAP);

            let age_ms = now_ms - candidate.record.last_visit_time;
            if age_ms < WEEK_MS {
                score += FALLBACK_WEEK_BONUS;
            } else if age_ms < MONTH_MS {
                score += FALLBACK_MONTH_BONUS;
            }

            (score > 0.0).then_some((score, candidate))
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .take(limit)
        .map(|(score, candidate)| CandidateResult {
            url: candidate.record.url.clone(),
            title: candidate.record.title.clone(),
            reason: Some(format!(
                "Relevant match with score: {score:.1} (visited {} times)",
                candidate.record.visit_count
            )),
        })
        .collect()
}

fn dedup_results(results: Vec<CandidateResult>, limit: usize) -> Vec<CandidateResult> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for result in results {
        let key = result.url.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(result);
        if out.len() == limit {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryRecord;

    fn candidate(url: &str, title: &str, visits: u32, last_visit: i64) -> ScoredRecord {
        ScoredRecord {
            record: HistoryRecord {
                url: url.to_string(),
                title: title.to_string(),
                visit_count: visits,
                last_visit_time: last_visit,
            },
            score: 0.0,
        }
    }

    #[test]
    fn fallback_scores_title_url_visits_and_recency() {
        let now = 1_000_000_000_000;
        let candidates = vec![candidate(
            "https://reddit.com/r/wallpapers",
            "Anime wallpapers",
            10,
            now - 1000,
        )];

        let results = fallback_analysis("anime wallpapers", &candidates, now, 5);
        assert_eq!(results.len(), 1);
        // "anime" and "wallpapers" both hit the title (3.0 each),
        // "wallpapers" hits the url (2.0), visits add min(10 * 0.2, 3.0),
        // and the visit a second ago adds the 2.0 recency bonus.
        assert_eq!(
            results[0].reason.as_deref(),
            Some("Relevant match with score: 12.0 (visited 10 times)")
        );
    }

    #[test]
    fn fallback_drops_zero_score_candidates() {
        let now = 1_000_000_000_000;
        // No word overlap, zero visits, last visit outside the month window.
        let candidates = vec![candidate(
            "https://example.com",
            "Unrelated",
            0,
            now - 40 * 24 * 60 * 60 * 1000,
        )];

        let results = fallback_analysis("anime wallpapers", &candidates, now, 5);
        assert!(results.is_empty());
    }

    #[test]
    fn fallback_orders_by_score_and_caps_at_limit() {
        let now = 1_000_000_000_000;
        let old = now - 40 * 24 * 60 * 60 * 1000;
        let candidates = vec![
            candidate("https://a.com", "rust", 1, old),
            candidate("https://b.com", "rust tutorial", 1, old),
            candidate("https://c.com/rust", "rust tutorial", 1, old),
        ];

        let results = fallback_analysis("rust tutorial", &candidates, now, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://c.com/rust");
        assert_eq!(results[1].url, "https://b.com");
    }

    #[test]
    fn fallback_uses_short_words_too() {
        let now = 1_000_000_000_000;
        let old = now - 40 * 24 * 60 * 60 * 1000;
        // "ai" is shorter than the ranking stage's word filter allows but
        // still counts here.
        let candidates = vec![candidate("https://x.com", "ai news", 0, old)];

        let results = fallback_analysis("ai", &candidates, now, 5);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn dedup_results_keeps_first_occurrence() {
        let results = vec![
            CandidateResult {
                url: "https://a.com".to_string(),
                title: "A".to_string(),
                reason: None,
            },
            CandidateResult {
                url: "HTTPS://A.COM".to_string(),
                title: "A again".to_string(),
                reason: None,
            },
            CandidateResult {
                url: "https://b.com".to_string(),
                title: "B".to_string(),
                reason: None,
            },
        ];

        let deduped = dedup_results(results, 5);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "A");
        assert_eq!(deduped[1].url, "https://b.com");
    }

    #[test]
    fn dedup_results_respects_limit() {
        let results: Vec<CandidateResult> = (0..10)
            .map(|i| CandidateResult {
                url: format!("https://site{i}.com"),
                title: format!("Site {i}"),
                reason: None,
            })
            .collect();

        assert_eq!(dedup_results(results, 5).len(), 5);
    }
}
