//! Keyword scoring of history records.
//!
//! Pure, offline, and linear in history size: every record gets an additive
//! score from concept matches, literal word matches, visit frequency and
//! recency, plus the domain verdict. Only records with a positive score
//! survive into the candidate set.

use crate::concepts::Concept;
use crate::history::HistoryRecord;
use crate::ranking::domain::{self, DomainVerdict};

/// Title match bonus per literal query word.
const TITLE_WORD_BONUS: f32 = 5.0;
/// URL match bonus per literal query word.
const URL_WORD_BONUS: f32 = 3.0;
/// Cap on the visit-frequency bonus.
const VISIT_BONUS_CAP: f32 = 2.0;
const VISIT_BONUS_PER_VISIT: f32 = 0.05;
/// Bonus for records visited within the last week.
const RECENCY_BONUS: f32 = 1.0;
const RECENCY_WINDOW_MS: i64 = 7 * 24 * 60 * 60 * 1000;
/// Multiplier applied when a multi-concept query is corroborated by fewer
/// than two concepts.
const SINGLE_CONCEPT_PENALTY: f32 = 0.1;

/// A history record that survived offline scoring.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: HistoryRecord,
    pub score: f32,
}

/// Literal query words considered for scoring (length > 2, lowercased).
pub fn query_words(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.len() > 2)
        .map(|w| w.to_string())
        .collect()
}

/// Score one record. `None` means the record is hard-excluded by a
/// platform rule and can never appear in the candidate set.
fn score_record(
    record: &HistoryRecord,
    concepts: &[Concept],
    words: &[String],
    now_ms: i64,
) -> Option<f32> {
    let title = record.title.to_lowercase();
    let url = record.url.to_lowercase();

    let mut score = 0.0;
    let mut matched_concepts = 0usize;

    // Each concept contributes its weight at most once, no matter how many
    // of its keywords appear.
    for concept in concepts {
        let found = concept
            .keywords
            .iter()
            .any(|k| title.contains(k.as_str()) || url.contains(k.as_str()));
        if found {
            matched_concepts += 1;
            score += concept.weight;
        }
    }

    // Multi-concept queries must be corroborated by at least two concepts.
    if concepts.len() > 1 && matched_concepts < 2 {
        score *= SINGLE_CONCEPT_PENALTY;
    }

    for word in words {
        if title.contains(word.as_str()) {
            score += TITLE_WORD_BONUS;
        }
        if url.contains(word.as_str()) {
            score += URL_WORD_BONUS;
        }
    }

    score += (record.visit_count as f32 * VISIT_BONUS_PER_VISIT).min(VISIT_BONUS_CAP);

    if now_ms - record.last_visit_time < RECENCY_WINDOW_MS {
        score += RECENCY_BONUS;
    }

    match domain::verdict(&record.url, concepts) {
        DomainVerdict::Excluded => return None,
        DomainVerdict::Score(domain_score) => score += domain_score,
    }

    Some(score)
}

/// Rank the history window against the query: score every record, drop
/// excluded and non-positive ones, sort by score descending (most recent
/// visit breaks ties).
pub fn filter_and_rank(
    records: &[HistoryRecord],
    concepts: &[Concept],
    query: &str,
    now_ms: i64,
) -> Vec<ScoredRecord> {
    let words = query_words(query);

    let mut scored: Vec<ScoredRecord> = records
        .iter()
        .filter_map(|record| {
            let score = score_record(record, concepts, &words, now_ms)?;
            if score <= 0.0 {
                log::debug!("excluded (score {score:.2}): {}", record.url);
                return None;
            }
            Some(ScoredRecord {
                record: record.clone(),
                score,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.record.last_visit_time.cmp(&a.record.last_visit_time))
    });

    log::info!(
        "keyword ranking kept {}/{} record(s)",
        scored.len(),
        records.len()
    );

    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concepts;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn record(url: &str, title: &str, visits: u32, last_visit: i64) -> HistoryRecord {
        HistoryRecord {
            url: url.to_string(),
            title: title.to_string(),
            visit_count: visits,
            last_visit_time: last_visit,
        }
    }

    #[test]
    fn concept_weight_counted_once_per_concept() {
        let now = 100 * DAY_MS;
        let concepts = concepts::extract("arcane wallpaper");

        // "jinx" and "caitlyn" are two keywords of the same arcane concept;
        // the title with both must not outscore the title with one on the
        // concept term alone.
        let one = record("https://site.com/a", "jinx wallpaper", 1, 0);
        let two = record("https://site.com/a", "jinx caitlyn wallpaper", 1, 0);

        let words: Vec<String> = Vec::new();
        let s1 = score_record(&one, &concepts, &words, now).unwrap();
        let s2 = score_record(&two, &concepts, &words, now).unwrap();
        assert_eq!(s1, s2);
    }

    #[test]
    fn multi_concept_queries_penalize_single_matches() {
        let now = 100 * DAY_MS;
        let concepts = concepts::extract("arcane wallpaper");
        assert!(concepts.len() > 1);

        let partial = record("https://site.com/x", "jinx fan page", 1, 0);
        let full = record("https://site.com/y", "jinx wallpaper", 1, 0);

        let words: Vec<String> = Vec::new();
        let partial_score = score_record(&partial, &concepts, &words, now).unwrap();
        let full_score = score_record(&full, &concepts, &words, now).unwrap();

        // One concept of two matched: weight lands but is cut to a tenth.
        assert!(partial_score < full_score * 0.2);
    }

    #[test]
    fn literal_word_bonuses_apply_to_title_and_url() {
        let now = 100 * DAY_MS;
        let concepts: Vec<Concept> = Vec::new();
        let words = query_words("ferret care");

        let both = record("https://ferret.example.com", "ferret care basics", 1, 0);
        let score = score_record(&both, &concepts, &words, now).unwrap();
        // "ferret": title +5, url +3; "care": title +5; visits 1 → +0.05.
        assert!((score - 13.05).abs() < 1e-3);
    }

    #[test]
    fn visit_bonus_is_capped() {
        let now = 100 * DAY_MS;
        let concepts: Vec<Concept> = Vec::new();
        let words = query_words("news");

        let few = record("https://news.site.com", "news", 10, 0);
        let many = record("https://news.site.com", "news", 10_000, 0);

        let s_few = score_record(&few, &concepts, &words, now).unwrap();
        let s_many = score_record(&many, &concepts, &words, now).unwrap();
        assert!((s_many - s_few - 1.5).abs() < 1e-3); // 2.0 cap − 0.5
    }

    #[test]
    fn recent_visits_get_recency_bonus() {
        let now = 100 * DAY_MS;
        let concepts: Vec<Concept> = Vec::new();
        let words = query_words("news");

        let recent = record("https://news.site.com", "news", 1, now - DAY_MS);
        let stale = record("https://news.site.com", "news", 1, now - 30 * DAY_MS);

        let s_recent = score_record(&recent, &concepts, &words, now).unwrap();
        let s_stale = score_record(&stale, &concepts, &words, now).unwrap();
        assert!((s_recent - s_stale - RECENCY_BONUS).abs() < 1e-3);
    }

    #[test]
    fn platform_exclusion_drops_off_platform_records() {
        let now = 100 * DAY_MS;
        let history = vec![
            record("https://reddit.com/r/cats/1", "Cute cats", 3, now - DAY_MS),
            record("https://youtube.com/watch?v=x", "Cat video", 10, now - DAY_MS),
        ];

        let concepts = concepts::extract("reddit post about cats");
        let ranked = filter_and_rank(&history, &concepts, "reddit post about cats", now);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].record.url, "https://reddit.com/r/cats/1");
    }

    #[test]
    fn non_positive_scores_are_dropped() {
        let now = 100 * DAY_MS;
        let history = vec![record(
            "https://mail.google.com/inbox",
            "Inbox",
            1,
            now - 60 * DAY_MS,
        )];

        let concepts = concepts::extract("ferret blog");
        let ranked = filter_and_rank(&history, &concepts, "ferret blog", now);
        assert!(ranked.is_empty());
    }

    #[test]
    fn ranking_is_score_descending() {
        let now = 100 * DAY_MS;
        let history = vec![
            record("https://a.com/cats", "cats", 1, 0),
            record("https://b.com/other", "cute cats pictures", 1, 0),
        ];

        let concepts = concepts::extract("cute cats");
        let ranked = filter_and_rank(&history, &concepts, "cute cats", now);
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].score >= ranked[1].score);
        assert_eq!(ranked[0].record.url, "https://b.com/other");
    }
}
