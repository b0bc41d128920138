use std::path::PathBuf;

use clap::Parser;

mod cli;
mod concepts;
mod config;
mod fetch;
mod history;
mod oracle;
mod pipeline;
mod ranking;
mod web;

use config::Config;
use fetch::HttpFetcher;
use history::{JsonHistoryStore, TimeRange};
use oracle::gemini::GeminiOracle;
use pipeline::{Pipeline, SearchLimits, SearchRequest};
use web::AppPipeline;

fn build_pipeline(config: &Config, history_override: Option<PathBuf>) -> anyhow::Result<AppPipeline> {
    let history_path = history_override.unwrap_or_else(|| config.history.path.clone());
    let store = JsonHistoryStore::new(history_path);
    let fetcher = HttpFetcher::new(&config.fetcher)?;
    let oracle = GeminiOracle::new(&config.oracle)?;

    if !config.oracle.grounding {
        log::info!("web-search grounding disabled");
    }

    Ok(Pipeline::new(
        store,
        fetcher,
        oracle,
        SearchLimits::from(&config.search),
    ))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = cli::Args::parse();

    let config = Config::load();

    match args.command {
        cli::Command::Daemon { listen, history } => {
            let pipeline = build_pipeline(&config, history)?;
            let default_time_range = TimeRange::parse(&config.search.default_time_range);
            web::start_daemon(pipeline, default_time_range, &listen);
            Ok(())
        }

        cli::Command::Search {
            query,
            time_range,
            max_items,
            history,
        } => {
            let pipeline = build_pipeline(&config, history)?;

            let time_range = time_range
                .as_deref()
                .map(TimeRange::parse)
                .unwrap_or_else(|| TimeRange::parse(&config.search.default_time_range));

            let request = SearchRequest {
                query,
                time_range,
                max_history_items: max_items,
            };

            let outcome = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(async { pipeline.run(&request).await })?;

            if outcome.degraded {
                log::warn!("answered from keyword fallback");
            }

            if outcome.results.is_empty() {
                println!("No relevant history found.");
                return Ok(());
            }

            println!("{}", serde_json::to_string_pretty(&outcome.results)?);
            Ok(())
        }
    }
}
