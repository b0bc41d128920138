//! Web-search grounding metadata and citation splicing.
//!
//! When the LLM runs with search grounding it returns character-offset
//! spans (`groundingSupports`) pointing at cited source chunks
//! (`groundingChunks`). Citations are spliced into the answer text at the
//! span end offsets, highest offset first so earlier insertions cannot
//! invalidate offsets that have not been applied yet.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_supports: Vec<GroundingSupport>,
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingSupport {
    pub segment: Option<Segment>,
    #[serde(default)]
    pub grounding_chunk_indices: Vec<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub end_index: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebSource {
    pub uri: Option<String>,
    pub title: Option<String>,
}

/// Round a byte offset down to the nearest char boundary inside `text`.
fn clamp_offset(text: &str, offset: usize) -> usize {
    let mut idx = offset.min(text.len());
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Splice markdown citation links into `text` at the grounded span ends.
pub fn splice_citations(text: &str, metadata: &GroundingMetadata) -> String {
    if metadata.grounding_supports.is_empty() || metadata.grounding_chunks.is_empty() {
        return text.to_string();
    }

    let mut supports: Vec<&GroundingSupport> = metadata.grounding_supports.iter().collect();
    supports.sort_by(|a, b| {
        let end_a = a.segment.as_ref().and_then(|s| s.end_index).unwrap_or(0);
        let end_b = b.segment.as_ref().and_then(|s| s.end_index).unwrap_or(0);
        end_b.cmp(&end_a)
    });

    let mut result = text.to_string();
    for support in supports {
        let Some(end_index) = support.segment.as_ref().and_then(|s| s.end_index) else {
            continue;
        };
        if support.grounding_chunk_indices.is_empty() {
            continue;
        }

        let links: Vec<String> = support
            .grounding_chunk_indices
            .iter()
            .filter_map(|&i| {
                let web = metadata.grounding_chunks.get(i)?.web.as_ref()?;
                let uri = web.uri.as_ref()?;
                let title = web.title.as_deref().unwrap_or("Source");
                Some(format!("[{title}]({uri})"))
            })
            .collect();

        if links.is_empty() {
            continue;
        }

        let citation = format!(" {}", links.join(", "));
        let idx = clamp_offset(&result, end_index);
        result.insert_str(idx, &citation);
    }

    result
}
