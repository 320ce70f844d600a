// 🌐 REST API - every query as a JSON endpoint (feature "server")
// Load failures answer with an error status, never an empty payload.

use crate::fetcher::TransactionDataFetcher;
use crate::source::{LoadError, RecordSource};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<TransactionDataFetcher<Box<dyn RecordSource>>>,
    pub top_n: usize,
}

impl AppState {
    pub fn new(fetcher: TransactionDataFetcher<Box<dyn RecordSource>>, top_n: usize) -> Self {
        AppState {
            fetcher: Arc::new(fetcher),
            top_n,
        }
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failed(err: &LoadError) -> Self {
        Self::error(err.kind(), err.to_string())
    }

    fn error(kind: &str, message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                kind: kind.to_string(),
                message,
            }),
        }
    }
}

type Fetcher = TransactionDataFetcher<Box<dyn RecordSource>>;

fn respond<T: Serialize>(result: Result<T, LoadError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
        Err(err) => {
            warn!("Request failed: {}", err);
            let status = match err {
                LoadError::SourceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                LoadError::MalformedRecord { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (status, Json(ApiResponse::<T>::failed(&err))).into_response()
        }
    }
}

/// Run a query on the blocking pool; loads read the file synchronously
async fn run_query<T, F>(state: &AppState, query: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce(&Fetcher) -> Result<T, LoadError> + Send + 'static,
{
    let fetcher = Arc::clone(&state.fetcher);
    match tokio::task::spawn_blocking(move || query(fetcher.as_ref())).await {
        Ok(result) => respond(result),
        Err(err) => {
            error!("Query task failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<T>::error("QueryFailed", err.to_string())),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenIssueResponse {
    pub client: String,
    pub has_open_issue: bool,
}

#[derive(Debug, Deserialize)]
pub struct TopParams {
    n: Option<usize>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/transactions/total
async fn total_amount(State(state): State<AppState>) -> Response {
    run_query(&state, |f| f.total_transaction_amount()).await
}

/// GET /api/transactions/max
async fn max_amount(State(state): State<AppState>) -> Response {
    run_query(&state, |f| f.max_transaction_amount()).await
}

/// GET /api/transactions/top?n=3
async fn top_transactions(State(state): State<AppState>, Query(params): Query<TopParams>) -> Response {
    let n = params.n.unwrap_or(state.top_n);
    run_query(&state, move |f| f.top_transactions_by_amount(n)).await
}

/// GET /api/senders/:name/total
async fn total_sent_by(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    run_query(&state, move |f| f.total_transaction_amount_sent_by(&name)).await
}

/// GET /api/senders/top
async fn top_sender(State(state): State<AppState>) -> Response {
    run_query(&state, |f| f.top_sender()).await
}

/// GET /api/senders/top-by-total
async fn top_sender_by_total(State(state): State<AppState>) -> Response {
    run_query(&state, |f| f.top_sender_by_total_sent()).await
}

/// GET /api/clients/count
async fn unique_clients(State(state): State<AppState>) -> Response {
    run_query(&state, |f| f.count_unique_clients()).await
}

/// GET /api/clients/:name/open-issues
async fn open_issues(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    run_query(&state, move |f| {
        f.has_open_compliance_issues(&name)
            .map(|has_open_issue| OpenIssueResponse {
                client: name,
                has_open_issue,
            })
    })
    .await
}

/// GET /api/beneficiaries
async fn by_beneficiary(State(state): State<AppState>) -> Response {
    run_query(&state, |f| f.transactions_by_beneficiary_name()).await
}

/// GET /api/issues/unsolved
async fn unsolved_issues(State(state): State<AppState>) -> Response {
    run_query(&state, |f| f.unsolved_issue_ids()).await
}

/// GET /api/issues/solved/messages
async fn solved_messages(State(state): State<AppState>) -> Response {
    run_query(&state, |f| f.all_solved_issue_messages()).await
}

/// GET /api/report
async fn report(State(state): State<AppState>) -> Response {
    let top_n = state.top_n;
    run_query(&state, move |f| f.report(top_n)).await
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/transactions/total", get(total_amount))
        .route("/transactions/max", get(max_amount))
        .route("/transactions/top", get(top_transactions))
        .route("/senders/top", get(top_sender))
        .route("/senders/top-by-total", get(top_sender_by_total))
        .route("/senders/:name/total", get(total_sent_by))
        .route("/clients/count", get(unique_clients))
        .route("/clients/:name/open-issues", get(open_issues))
        .route("/beneficiaries", get(by_beneficiary))
        .route("/issues/unsolved", get(unsolved_issues))
        .route("/issues/solved/messages", get(solved_messages))
        .route("/report", get(report))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
