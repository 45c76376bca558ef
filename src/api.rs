use crate::document::{Corpus, Document};
use crate::engine::{CollocationEngine, CollocationParams, CollocationReport, ParamsInput};
use crate::error::CollocationError;
use crate::export::{collocation_rows, corpus_rows, write_collocations_csv, CollocationRow, CorpusRow};
use crate::provider::{CorpusFilter, CorpusProvider};
use crate::reference::ReferenceModel;
use crate::tokenizer::Tokenizer;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared state behind the router
pub struct AppState {
    pub engine: CollocationEngine,
    pub provider: Option<Box<dyn CorpusProvider>>,
}

// ========== Request/Response Types ==========

#[derive(Debug, Deserialize)]
pub struct ReferenceInput {
    pub counts: HashMap<String, u64>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl ReferenceInput {
    /// Keys are normalized like corpus tokens; keys that collapse to the same
    /// word add their counts, keys that normalize to nothing are dropped.
    fn into_model(self, tokenizer: &Tokenizer) -> Result<ReferenceModel, CollocationError> {
        let total = self.total.unwrap_or(0);
        let counts = self.counts.into_iter().flat_map(|(word, count)| {
            tokenizer
                .normalize_tokens([word])
                .into_iter()
                .map(move |token| (token, count))
        });
        ReferenceModel::with_total(counts, total)
    }
}

#[derive(Debug, Deserialize)]
pub struct CollocationRequest {
    pub documents: Vec<Document>,
    pub reference: ReferenceInput,
    #[serde(default)]
    pub params: ParamsInput,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub filter: CorpusFilter,
    #[serde(default)]
    pub params: ParamsInput,
}

#[derive(Debug, Serialize)]
pub struct CollocationResponse {
    pub target: String,
    pub corpus_size: usize,
    pub occurrences: u64,
    pub collocations: Vec<CollocationRow>,
    pub cloud: HashMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corpus: Option<Vec<CorpusRow>>,
}

impl From<CollocationReport> for CollocationResponse {
    fn from(report: CollocationReport) -> Self {
        Self {
            collocations: collocation_rows(&report.collocations),
            cloud: report
                .cloud
                .iter()
                .map(|w| (w.token.clone(), w.weight))
                .collect(),
            target: report.target,
            corpus_size: report.corpus_size,
            occurrences: report.occurrences,
            corpus: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

// ========== Error Handling ==========

struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = format!("{:#}", self.0);
        let status = match self.0.downcast_ref::<CollocationError>() {
            Some(err) if err.is_user_error() => StatusCode::BAD_REQUEST,
            Some(CollocationError::DegenerateReference) => StatusCode::UNPROCESSABLE_ENTITY,
            Some(CollocationError::Provider(_)) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("API error: {}", message);
        } else {
            tracing::warn!("Rejected request: {}", message);
        }

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// ========== Handlers ==========

async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::success("OK"))
}

fn inline_report(
    state: &AppState,
    req: CollocationRequest,
) -> Result<CollocationReport, CollocationError> {
    let params = CollocationParams::try_from(req.params)?;
    let tokenizer = state.engine.tokenizer();
    let reference = req.reference.into_model(tokenizer)?;
    let corpus = Corpus::new(
        req.documents
            .into_iter()
            .map(|doc| doc.normalized(tokenizer))
            .collect(),
    );
    state.engine.collocations(&corpus, &reference, &params)
}

async fn collocations(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CollocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let report = inline_report(&state, req)?;
    Ok(Json(ApiResponse::success(CollocationResponse::from(report))))
}

async fn collocations_csv(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CollocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let report = inline_report(&state, req)?;
    let mut body = Vec::new();
    write_collocations_csv(&mut body, &report.collocations)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"collocations.csv\""),
        ],
        body,
    ))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let provider = state.provider.as_deref().ok_or_else(|| {
        CollocationError::Provider(anyhow::anyhow!("no document library loaded"))
    })?;
    let params = CollocationParams::try_from(req.params)?;

    let (corpus, report) = state.engine.run(provider, &req.filter, &params)?;

    let mut response = CollocationResponse::from(report);
    response.corpus = Some(corpus_rows(&corpus));
    Ok(Json(ApiResponse::success(response)))
}

// ========== Router ==========

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/collocations", post(collocations))
        .route("/collocations/csv", post(collocations_csv))
        .route("/query", post(query))
        .with_state(state)
}
