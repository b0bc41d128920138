//! Gemini `generateContent` client behind the `RelevanceOracle` trait.
//!
//! Plain ranking runs without tools; synthesis may run with the
//! web-search grounding tool enabled, in which case the response carries
//! grounding metadata that gets spliced into the reasons.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::OracleConfig;
use crate::oracle::grounding::GroundingMetadata;
use crate::oracle::{
    parse_rank_response, parse_synthesis_response, prompt, EnrichedCandidate, OracleError,
    OracleOutcome, RelevanceOracle,
};
use crate::pipeline::CandidateResult;
use crate::ranking::ScoredRecord;

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseCandidate {
    content: Option<Content>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

/// Text plus grounding of one model answer; `None` when the model produced
/// nothing usable (safety block, empty candidates).
struct Answer {
    text: String,
    grounding: Option<GroundingMetadata>,
}

pub struct GeminiOracle {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    grounded_model: String,
    temperature: f32,
    max_output_tokens: u32,
    grounding_enabled: bool,
}

impl GeminiOracle {
    pub fn new(config: &OracleConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.resolve_api_key(),
            model: config.model.clone(),
            grounded_model: config.grounded_model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            grounding_enabled: config.grounding,
        })
    }

    /// Safety blocks are "no usable result", not errors.
    fn is_blocked(finish_reason: Option<&str>) -> bool {
        matches!(
            finish_reason,
            Some("SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII")
        )
    }

    async fn generate(
        &self,
        model: &str,
        prompt: String,
        with_grounding: bool,
    ) -> Result<Option<Answer>, OracleError> {
        if self.api_key.is_empty() {
            return Err(OracleError::Disabled);
        }

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
            tools: with_grounding.then(|| {
                vec![Tool {
                    google_search: serde_json::json!({}),
                }]
            }),
        };

        let url = format!("{}/models/{model}:generateContent", self.api_base);
        let response: GenerateResponse = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(candidate) = response.candidates.into_iter().next() else {
            log::warn!("oracle returned no candidates");
            return Ok(None);
        };

        if Self::is_blocked(candidate.finish_reason.as_deref()) {
            log::warn!(
                "oracle answer blocked (finishReason {:?})",
                candidate.finish_reason
            );
            return Ok(None);
        }

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(Some(Answer {
            text,
            grounding: candidate.grounding_metadata,
        }))
    }
}

impl RelevanceOracle for GeminiOracle {
    fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn rank(
        &self,
        query: &str,
        candidates: &[ScoredRecord],
        now_ms: i64,
    ) -> Result<OracleOutcome<Vec<usize>>, OracleError> {
        if candidates.is_empty() {
            return Ok(OracleOutcome::NoneRelevant);
        }

        let prompt = prompt::rank_prompt(query, candidates, now_ms);
        log::debug!("rank prompt: {} chars", prompt.len());

        match self.generate(&self.model, prompt, false).await? {
            Some(answer) => {
                let shown = candidates.len().min(prompt::RANK_PROMPT_LIMIT);
                parse_rank_response(&answer.text, shown)
            }
            None => Ok(OracleOutcome::NoneRelevant),
        }
    }

    async fn synthesize(
        &self,
        query: &str,
        candidates: &[EnrichedCandidate],
        now_ms: i64,
    ) -> Result<OracleOutcome<Vec<CandidateResult>>, OracleError> {
        if candidates.is_empty() {
            return Ok(OracleOutcome::NoneRelevant);
        }

        let prompt = prompt::synthesis_prompt(query, candidates, now_ms);
        log::debug!("synthesis prompt: {} chars", prompt.len());

        match self
            .generate(&self.grounded_model, prompt, self.grounding_enabled)
            .await?
        {
            Some(answer) => {
                parse_synthesis_response(&answer.text, candidates, answer.grounding.as_ref())
            }
            None => Ok(OracleOutcome::NoneRelevant),
        }
    }
}
