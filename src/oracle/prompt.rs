//! Prompt construction for the relevance oracle.
//!
//! Prompts are deterministic serializations of the candidate set with an
//! explicit truncation bound per field, so prompt size is bounded no matter
//! what the history contains.

use std::fmt::Write;

use crate::fetch::truncate_chars;
use crate::oracle::EnrichedCandidate;
use crate::ranking::ScoredRecord;

/// Most candidates serialized into a rank prompt.
pub const RANK_PROMPT_LIMIT: usize = 30;
/// Most candidates serialized into a synthesis prompt.
pub const SYNTHESIS_PROMPT_LIMIT: usize = 20;

const TITLE_MAX_CHARS: usize = 150;
const URL_MAX_CHARS: usize = 300;
const SNIPPET_MAX_CHARS: usize = 500;

const ONE_DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn days_since(now_ms: i64, last_visit_time: i64) -> i64 {
    ((now_ms - last_visit_time) / ONE_DAY_MS).max(0)
}

/// Prompt asking for a JSON array of 1-based indices ordered by relevance.
pub fn rank_prompt(query: &str, candidates: &[ScoredRecord], now_ms: i64) -> String {
    let shown = candidates.len().min(RANK_PROMPT_LIMIT);

    let mut lines = String::new();
    for (index, candidate) in candidates.iter().take(shown).enumerate() {
        let record = &candidate.record;
        let _ = writeln!(
            lines,
            "{}. \"{}\" - {} ({} visits, {}d ago)",
            index + 1,
            truncate_chars(&record.title, TITLE_MAX_CHARS),
            truncate_chars(&record.url, URL_MAX_CHARS),
            record.visit_count,
            days_since(now_ms, record.last_visit_time),
        );
    }

    format!(
        "Query: \"{query}\"\n\n\
         These websites were pre-filtered as potentially relevant. Rank them by relevance to the query.\n\n\
         {lines}\n\
         Return ONLY a JSON array of the numbers (1-{shown}) of the MOST relevant pages, ordered by relevance.\n\
         Example: [3, 1, 7, 12, 5]\n\n\
         Focus on pages where the TITLE or URL clearly relates to the query. \
         Ignore generic sites like email, social media unless they specifically match.\n\
         Return 10-20 numbers max. If none are relevant, return NONE.\n"
    )
}

/// Prompt asking for a JSON array of `{url, title, reason}` objects drawn
/// only from the candidate list.
pub fn synthesis_prompt(query: &str, candidates: &[EnrichedCandidate], now_ms: i64) -> String {
    let mut lines = String::new();
    for (index, candidate) in candidates.iter().take(SYNTHESIS_PROMPT_LIMIT).enumerate() {
        let record = &candidate.record;
        let _ = writeln!(
            lines,
            "{}. \"{}\" - {} (visited {} times, {} days ago)",
            index + 1,
            truncate_chars(&record.title, TITLE_MAX_CHARS),
            truncate_chars(&record.url, URL_MAX_CHARS),
            record.visit_count,
            days_since(now_ms, record.last_visit_time),
        );
        if let Some(content) = &candidate.content {
            let _ = writeln!(
                lines,
                "   Content snippet: {}...",
                truncate_chars(content, SNIPPET_MAX_CHARS)
            );
        }
    }

    format!(
        "I need to find the most relevant websites from a user's browsing history for this EXACT query: \"{query}\"\n\n\
         Here are the PRE-FILTERED candidate pages from their browsing history:\n\
         {lines}\n\
         CRITICAL: These candidates have already been filtered to match the user's query. Your job is to:\n\
         1. ONLY analyze and rank the pages from the candidate list above\n\
         2. Do NOT suggest any pages that aren't in the candidate list\n\
         3. Focus on which of these candidates best match the query intent\n\
         4. If the query mentions a specific platform (like \"reddit post\"), ONLY return results from that platform\n\n\
         Important considerations:\n\
         - Look specifically for content that matches ALL aspects of this query\n\
         - Consider the user's engagement level (visit count and recency) as a secondary factor\n\
         - Prioritize pages that have actual relevant content over popular but unrelated pages\n\n\
         Return your response as a JSON array with this exact format:\n\
         [\n\
             {{\n\
                 \"url\": \"exact_url_from_the_candidate_list_above\",\n\
                 \"title\": \"exact_title_from_the_candidate_list_above\",\n\
                 \"reason\": \"detailed explanation of why this page matches the query\"\n\
             }}\n\
         ]\n\n\
         Only return the JSON array, no additional text. If none of the candidates are relevant, return NONE.\n"
    )
}
