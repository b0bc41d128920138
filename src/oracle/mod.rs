//! External LLM relevance oracle.
//!
//! Two operations over a candidate set: `rank` (re-order by relevance,
//! answering with 1-based indices into the supplied list) and `synthesize`
//! (grounded final selection, answering with `{url, title, reason}`
//! objects). Everything the oracle returns is validated against the input
//! candidate set before it is trusted; identifiers pointing outside the set
//! are discarded with a warning so hallucinated URLs can never reach the
//! user. A literal `NONE` or empty answer is a valid negative result, not
//! an error.

pub mod gemini;
pub mod grounding;
pub mod prompt;

use std::future::Future;

use serde::Deserialize;

use crate::history::HistoryRecord;
use crate::pipeline::CandidateResult;
use crate::ranking::ScoredRecord;
use grounding::GroundingMetadata;

/// Most candidates kept after a rank call.
pub const RANK_KEEP: usize = 20;
/// Most results kept after synthesis.
const SYNTHESIS_KEEP: usize = 5;

/// A candidate with optionally fetched page text.
#[derive(Debug, Clone)]
pub struct EnrichedCandidate {
    pub record: HistoryRecord,
    pub content: Option<String>,
}

/// Successful oracle answer: either a validated payload or an explicit
/// "nothing here is relevant".
#[derive(Debug, Clone, PartialEq)]
pub enum OracleOutcome<T> {
    Found(T),
    NoneRelevant,
}

#[derive(thiserror::Error, Debug)]
pub enum OracleError {
    #[error("no API key configured")]
    Disabled,
    #[error("oracle request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("oracle response unparseable: {0}")]
    Malformed(String),
}

pub trait RelevanceOracle: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Re-rank `candidates` by relevance to `query`. The payload is
    /// 0-based indices into `candidates`, already validated.
    fn rank(
        &self,
        query: &str,
        candidates: &[ScoredRecord],
        now_ms: i64,
    ) -> impl Future<Output = Result<OracleOutcome<Vec<usize>>, OracleError>> + Send;

    /// Produce the final result list from enriched candidates.
    fn synthesize(
        &self,
        query: &str,
        candidates: &[EnrichedCandidate],
        now_ms: i64,
    ) -> impl Future<Output = Result<OracleOutcome<Vec<CandidateResult>>, OracleError>> + Send;
}

/// Strip a markdown code fence the model may wrap its JSON in.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the fence line ("```" or "```json") and the closing fence.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim().trim_end_matches("```").trim()
}

/// Parse a rank answer into validated 0-based indices.
pub(crate) fn parse_rank_response(
    text: &str,
    candidate_count: usize,
) -> Result<OracleOutcome<Vec<usize>>, OracleError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() || cleaned == "NONE" {
        return Ok(OracleOutcome::NoneRelevant);
    }

    let rankings: Vec<i64> = serde_json::from_str(cleaned)
        .map_err(|e| OracleError::Malformed(format!("rank response: {e}")))?;

    let mut indices = Vec::new();
    for number in rankings {
        if number < 1 || number as usize > candidate_count {
            log::warn!("oracle ranked index {number} outside candidate list, discarding");
            continue;
        }
        let idx = (number - 1) as usize;
        if !indices.contains(&idx) {
            indices.push(idx);
        }
    }
    indices.truncate(RANK_KEEP);

    if indices.is_empty() {
        Ok(OracleOutcome::NoneRelevant)
    } else {
        Ok(OracleOutcome::Found(indices))
    }
}

#[derive(Debug, Deserialize)]
struct RawSynthesis {
    url: String,
    #[serde(default)]
    #[allow(dead_code)]
    title: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// Parse a synthesis answer, keeping only candidates from the input set.
///
/// URL and title are taken from the matched input record rather than the
/// model's echo, so only the `reason` text is model-authored.
pub(crate) fn parse_synthesis_response(
    text: &str,
    candidates: &[EnrichedCandidate],
    grounding: Option<&GroundingMetadata>,
) -> Result<OracleOutcome<Vec<CandidateResult>>, OracleError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() || cleaned == "NONE" {
        return Ok(OracleOutcome::NoneRelevant);
    }

    let raw: Vec<RawSynthesis> = serde_json::from_str(cleaned)
        .map_err(|e| OracleError::Malformed(format!("synthesis response: {e}")))?;

    let mut results: Vec<CandidateResult> = Vec::new();
    for item in raw {
        let Some(matched) = candidates
            .iter()
            .find(|c| c.record.url.eq_ignore_ascii_case(&item.url))
        else {
            log::warn!(
                "oracle returned URL outside candidate set, discarding: {}",
                item.url
            );
            continue;
        };

        if results.iter().any(|r| r.url == matched.record.url) {
            continue;
        }

        let reason = item.reason.map(|reason| match grounding {
            Some(metadata) => grounding::splice_citations(&reason, metadata),
            None => reason,
        });

        results.push(CandidateResult {
            url: matched.record.url.clone(),
            title: matched.record.title.clone(),
            reason,
        });
    }
    results.truncate(SYNTHESIS_KEEP);

    if results.is_empty() {
        Ok(OracleOutcome::NoneRelevant)
    } else {
        Ok(OracleOutcome::Found(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enriched(url: &str, title: &str) -> EnrichedCandidate {
        EnrichedCandidate {
            record: HistoryRecord {
                url: url.to_string(),
                title: title.to_string(),
                visit_count: 1,
                last_visit_time: 0,
            },
            content: None,
        }
    }

    #[test]
    fn rank_parses_plain_index_array() {
        let outcome = parse_rank_response("[3, 1, 2]", 3).unwrap();
        assert_eq!(outcome, OracleOutcome::Found(vec![2, 0, 1]));
    }

    #[test]
    fn rank_strips_code_fences() {
        let outcome = parse_rank_response("```json\n[1, 2]\n```", 2).unwrap();
        assert_eq!(outcome, OracleOutcome::Found(vec![0, 1]));
    }

    #[test]
    fn rank_discards_out_of_range_indices() {
        let outcome = parse_rank_response("[1, 99, -2, 2]", 2).unwrap();
        assert_eq!(outcome, OracleOutcome::Found(vec![0, 1]));
    }

    #[test]
    fn rank_dedups_repeated_indices() {
        let outcome = parse_rank_response("[2, 2, 1]", 3).unwrap();
        assert_eq!(outcome, OracleOutcome::Found(vec![1, 0]));
    }

    #[test]
    fn rank_none_and_empty_are_negative_results() {
        assert_eq!(
            parse_rank_response("NONE", 5).unwrap(),
            OracleOutcome::NoneRelevant
        );
        assert_eq!(
            parse_rank_response("  ", 5).unwrap(),
            OracleOutcome::NoneRelevant
        );
        // All entries invalid collapses to a negative result too.
        assert_eq!(
            parse_rank_response("[99]", 5).unwrap(),
            OracleOutcome::NoneRelevant
        );
    }

    #[test]
    fn rank_malformed_json_is_an_error() {
        assert!(parse_rank_response("most relevant: 3", 5).is_err());
    }

    #[test]
    fn synthesis_keeps_only_candidate_urls() {
        let candidates = vec![enriched("https://reddit.com/r/cats/1", "Cute cats")];
        let text = r#"[
            {"url": "https://reddit.com/r/cats/1", "title": "Cute cats", "reason": "matches"},
            {"url": "https://evil.example.com/phish", "title": "Cats", "reason": "hallucinated"}
        ]"#;

        let outcome = parse_synthesis_response(text, &candidates, None).unwrap();
        let OracleOutcome::Found(results) = outcome else {
            panic!("expected results");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://reddit.com/r/cats/1");
    }

    #[test]
    fn synthesis_takes_title_from_candidate_not_model() {
        let candidates = vec![enriched("https://a.com/x", "Real title")];
        let text = r#"[{"url": "https://a.com/x", "title": "Made-up title", "reason": "r"}]"#;

        let outcome = parse_synthesis_response(text, &candidates, None).unwrap();
        let OracleOutcome::Found(results) = outcome else {
            panic!("expected results");
        };
        assert_eq!(results[0].title, "Real title");
    }

    #[test]
    fn synthesis_all_foreign_urls_is_negative_result() {
        let candidates = vec![enriched("https://a.com/x", "A")];
        let text = r#"[{"url": "https://b.com/y", "reason": "nope"}]"#;
        assert_eq!(
            parse_synthesis_response(text, &candidates, None).unwrap(),
            OracleOutcome::NoneRelevant
        );
    }

    #[test]
    fn synthesis_splices_grounding_citations_into_reason() {
        use grounding::{GroundingChunk, GroundingMetadata, GroundingSupport, Segment, WebSource};

        let candidates = vec![enriched("https://a.com/x", "A")];
        let text = r#"[{"url": "https://a.com/x", "reason": "well cited"}]"#;
        let metadata = GroundingMetadata {
            grounding_supports: vec![GroundingSupport {
                segment: Some(Segment { end_index: Some(4) }),
                grounding_chunk_indices: vec![0],
            }],
            grounding_chunks: vec![GroundingChunk {
                web: Some(WebSource {
                    uri: Some("https://src.example.com".to_string()),
                    title: Some("Src".to_string()),
                }),
            }],
        };

        let outcome = parse_synthesis_response(text, &candidates, Some(&metadata)).unwrap();
        let OracleOutcome::Found(results) = outcome else {
            panic!("expected results");
        };
        assert_eq!(
            results[0].reason.as_deref(),
            Some("well [Src](https://src.example.com) cited")
        );
    }

    #[test]
    fn synthesis_malformed_json_is_an_error() {
        let candidates = vec![enriched("https://a.com/x", "A")];
        assert!(parse_synthesis_response("{not json", &candidates, None).is_err());
    }
}
