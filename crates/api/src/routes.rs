use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use riskdesk_core::domain::investment::{Investment, NewInvestment};
use riskdesk_core::domain::narrative::RiskNarrativeRequest;
use riskdesk_core::domain::snapshot::{normalize_symbol, CompanySnapshot, QuotePoint};
use riskdesk_core::llm::TextGenerator;
use riskdesk_core::market::{self, MarketDataProvider};
use riskdesk_core::narrative;
use riskdesk_core::report::ReportRenderer;
use riskdesk_core::storage::investments::InvestmentStore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub market: Arc<dyn MarketDataProvider>,
    pub narrator: Arc<dyn TextGenerator>,
    pub reports: ReportRenderer,
    /// `None` when the API runs without a database.
    pub investments: Option<Arc<dyn InvestmentStore>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/company/:symbol", get(get_company))
        .route("/company/:symbol/chart", get(get_company_chart))
        .route("/explain-risk", post(explain_risk))
        .route("/download-report", post(download_report))
        .route("/reports/:file_name", get(get_report))
        .route("/investments", get(list_investments).post(create_investment))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

async fn get_company(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<CompanySnapshot>> {
    let snapshot = market::get_company_snapshot(state.market.as_ref(), &symbol).await?;
    Ok(Json(snapshot))
}

async fn get_company_chart(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<[QuotePoint; 4]>> {
    let chart = market::get_quote_chart(state.market.as_ref(), &symbol).await?;
    Ok(Json(chart))
}

#[derive(Debug, Deserialize)]
struct ExplainRiskBody {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    metrics: Option<Value>,
    #[serde(default)]
    industry: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExplainRiskResponse {
    explanation: String,
    fallback: bool,
}

async fn explain_risk(
    State(state): State<AppState>,
    payload: Result<Json<ExplainRiskBody>, JsonRejection>,
) -> ApiResult<Json<ExplainRiskResponse>> {
    let body = json_body(payload)?;
    let symbol = normalize_symbol(body.symbol.as_deref().unwrap_or_default())?;

    let metrics = match body.metrics {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let req = RiskNarrativeRequest {
        symbol,
        metrics,
        industry: body.industry.filter(|s| !s.trim().is_empty()),
    };

    let outcome = narrative::generate_risk_narrative(state.narrator.as_ref(), &req).await;
    let fallback = outcome.is_fallback();
    Ok(Json(ExplainRiskResponse {
        explanation: outcome.into_explanation(),
        fallback,
    }))
}

#[derive(Debug, Deserialize)]
struct DownloadReportBody {
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadReportResponse {
    file_name: String,
}

async fn download_report(
    State(state): State<AppState>,
    payload: Result<Json<DownloadReportBody>, JsonRejection>,
) -> ApiResult<Json<DownloadReportResponse>> {
    let body = json_body(payload)?;
    let (Some(explanation), Some(symbol)) = (body.explanation, body.symbol) else {
        return Err(ApiError::bad_request("explanation and symbol are required"));
    };

    let artifact = state.reports.render_report(&explanation, &symbol).await?;
    Ok(Json(DownloadReportResponse {
        file_name: artifact.identifier,
    }))
}

async fn get_report(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> ApiResult<Response> {
    let bytes = state.reports.retrieve_artifact(&file_name).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn investment_store(state: &AppState) -> ApiResult<&Arc<dyn InvestmentStore>> {
    state
        .investments
        .as_ref()
        .ok_or(ApiError::Unavailable("investment storage"))
}

fn owner_id(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::Unauthenticated)
}

async fn create_investment(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewInvestment>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Investment>)> {
    let store = investment_store(&state)?;
    let owner = owner_id(&headers)?;
    let investment = json_body(payload)?.validate_and_into_investment(&owner, chrono::Utc::now())?;

    store.create(&investment).await?;
    tracing::info!(id = %investment.id, symbol = %investment.symbol, "investment recorded");
    Ok((StatusCode::CREATED, Json(investment)))
}

async fn list_investments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Investment>>> {
    let store = investment_store(&state)?;
    let owner = owner_id(&headers)?;
    Ok(Json(store.list_by_owner(&owner).await?))
}
