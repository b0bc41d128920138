use crate::{
    fetch::HttpFetcher,
    history::{JsonHistoryStore, TimeRange},
    oracle::gemini::GeminiOracle,
    pipeline::{CandidateResult, Pipeline, SearchError, SearchRequest},
};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

pub type AppPipeline = Pipeline<JsonHistoryStore, HttpFetcher, GeminiOracle>;

struct SharedState {
    pipeline: AppPipeline,
    default_time_range: TimeRange,
}

async fn start_app(pipeline: AppPipeline, default_time_range: TimeRange, listen: &str) {
    let shared_state = Arc::new(SharedState {
        pipeline,
        default_time_range,
    });

    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let app = Router::new()
        .route("/api/search", post(search))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state);

    let listener = tokio::net::TcpListener::bind(listen).await.unwrap();
    log::info!("listening on {listen}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

pub fn start_daemon(pipeline: AppPipeline, default_time_range: TimeRange, listen: &str) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(pipeline, default_time_range, listen).await });
}

#[derive(Debug)]
struct HttpError(SearchError);

// Tell axum how to convert `SearchError` into a response.
impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0 {
            SearchError::EmptyQuery => axum::http::StatusCode::BAD_REQUEST,
            SearchError::History(_) => {
                log::error!("{self:?}");
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            json!({"success": false, "error": self.0.to_string()}).to_string(),
        )
            .into_response()
    }
}

impl From<SearchError> for HttpError {
    fn from(err: SearchError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSearchRequest {
    pub query: String,
    pub time_range: Option<String>,
    pub max_history_items: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiSearchResponse {
    pub success: bool,
    pub results: Vec<CandidateResult>,
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ApiSearchRequest>,
) -> Result<axum::Json<ApiSearchResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let time_range = payload
        .time_range
        .as_deref()
        .map(TimeRange::parse)
        .unwrap_or(state.default_time_range);

    let request = SearchRequest {
        query: payload.query,
        time_range,
        max_history_items: payload.max_history_items,
    };

    let outcome = state.pipeline.run(&request).await?;
    if outcome.degraded {
        log::warn!("answered {:?} from keyword fallback", request.query);
    }

    Ok(ApiSearchResponse {
        success: true,
        results: outcome.results,
    }
    .into())
}
