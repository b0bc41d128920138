use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::history::MAX_HISTORY_RESULTS;

const DEFAULT_FETCH_ENDPOINT: &str = "https://terminxted-gdg.hf.space/fetch_text";
/// Hard timeout per content fetch.
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
/// Uniform truncation bound applied to fetched page text.
const DEFAULT_MAX_CONTENT_CHARS: usize = 8000;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_GROUNDED_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

const DEFAULT_ENRICH_LIMIT: usize = 20;
const DEFAULT_RESULT_LIMIT: usize = 5;

/// Where the browsing-history export lives.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

fn default_history_path() -> PathBuf {
    PathBuf::from("history.json")
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Most history records fetched per query (capped at 5000).
    #[serde(default = "default_max_history_items")]
    pub max_history_items: usize,
    /// Most candidates whose page text is fetched per query.
    #[serde(default = "default_enrich_limit")]
    pub max_candidates_to_enrich: usize,
    /// Most results returned per query.
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    /// Window applied when a request does not specify one.
    #[serde(default = "default_time_range")]
    pub default_time_range: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_history_items: default_max_history_items(),
            max_candidates_to_enrich: default_enrich_limit(),
            result_limit: default_result_limit(),
            default_time_range: default_time_range(),
        }
    }
}

fn default_max_history_items() -> usize {
    MAX_HISTORY_RESULTS
}

fn default_enrich_limit() -> usize {
    DEFAULT_ENRICH_LIMIT
}

fn default_result_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}

fn default_time_range() -> String {
    "all_time".to_string()
}

/// External text-extraction service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetcherConfig {
    #[serde(default = "default_fetch_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            endpoint: default_fetch_endpoint(),
            timeout_secs: default_fetch_timeout_secs(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

fn default_fetch_endpoint() -> String {
    DEFAULT_FETCH_ENDPOINT.to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_max_content_chars() -> usize {
    DEFAULT_MAX_CONTENT_CHARS
}

/// External LLM service. An empty `api_key` (and no `GEMINI_API_KEY` in the
/// environment) disables the oracle stages; the keyword pipeline still runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_grounded_model")]
    pub grounded_model: String,
    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Enable web-search grounding for the synthesis call.
    #[serde(default = "default_grounding")]
    pub grounding: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            model: default_model(),
            grounded_model: default_grounded_model(),
            timeout_secs: default_oracle_timeout_secs(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            grounding: default_grounding(),
        }
    }
}

impl OracleConfig {
    /// Environment wins over the config file so the key can stay out of it.
    pub fn resolve_api_key(&self) -> String {
        std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| self.api_key.clone())
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_grounded_model() -> String {
    DEFAULT_GROUNDED_MODEL.to_string()
}

fn default_oracle_timeout_secs() -> u64 {
    DEFAULT_ORACLE_TIMEOUT_SECS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_output_tokens() -> u32 {
    DEFAULT_MAX_OUTPUT_TOKENS
}

fn default_grounding() -> bool {
    true
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Config {
    fn validate(&mut self) {
        if self.search.max_history_items == 0 || self.search.max_history_items > MAX_HISTORY_RESULTS
        {
            self.search.max_history_items = MAX_HISTORY_RESULTS;
        }

        if self.search.result_limit == 0 {
            panic!("search.result_limit must be greater than 0");
        }

        if self.fetcher.timeout_secs == 0 {
            panic!("fetcher.timeout_secs must be greater than 0");
        }

        if self.fetcher.max_content_chars == 0 {
            panic!("fetcher.max_content_chars must be greater than 0");
        }

        if !(0.0..=2.0).contains(&self.oracle.temperature) {
            panic!(
                "oracle.temperature must be between 0.0 and 2.0, got {}",
                self.oracle.temperature
            );
        }

        // Warn early instead of failing the first request.
        let _ = crate::history::TimeRange::parse(&self.search.default_time_range);
    }

    pub fn load() -> Self {
        let base_path = homedir::my_home()
            .ok()
            .flatten()
            .map(|home| home.join(".config").join("sleuth"))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::load_with(&base_path)
    }

    pub fn load_with(base_path: &Path) -> Self {
        let config_path = base_path.join("config.yaml");

        // create new if does not exist
        if !config_path.exists() {
            std::fs::create_dir_all(base_path).expect("failed to create config directory");
            std::fs::write(
                &config_path,
                serde_yml::to_string(&Self::default()).unwrap(),
            )
            .expect("failed to write default config");
        }

        let config_str =
            std::fs::read_to_string(&config_path).expect("failed to read config file");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_path_buf();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let config_path = self.base_path.join("config.yaml");
        let config_str = serde_yml::to_string(&self).unwrap();
        std::fs::write(config_path, config_str).expect("failed to write config file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_with_creates_default_config() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_with(tmp.path());

        assert!(tmp.path().join("config.yaml").exists());
        assert_eq!(config.search.max_history_items, MAX_HISTORY_RESULTS);
        assert_eq!(config.fetcher.timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
        assert!(config.oracle.api_key.is_empty());
    }

    #[test]
    fn load_with_reads_back_saved_config() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::load_with(tmp.path());
        config.search.result_limit = 3;
        config.save();

        let reloaded = Config::load_with(tmp.path());
        assert_eq!(reloaded.search.result_limit, 3);
    }

    #[test]
    fn oversized_history_bound_is_clamped() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.yaml"),
            "search:\n  max_history_items: 999999\n",
        )
        .unwrap();

        let config = Config::load_with(tmp.path());
        assert_eq!(config.search.max_history_items, MAX_HISTORY_RESULTS);
    }
}
