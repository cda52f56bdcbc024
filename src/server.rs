use axum::{
    extract::Query,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use chrono::{NaiveDate, Utc};
use hyper::Server;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::app::ports::SourcePort;
use crate::app::{DateRange, ExportSummary, ExportUseCase, IngestSummary, IngestUseCase, QueryUseCase, SignedSink};
use crate::config::Config;
use crate::constants::{DAY_FORMAT, SERVICE_NAME};
use crate::error::{EtlError, Result};
use crate::infra::{ReqwestSink, ReqwestSource};
use crate::observability;
use crate::pipeline::storage::{InMemoryStorage, Storage};

pub const DEFAULT_LIMIT: usize = 10;

/// Shared handles for every route
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub ingest: IngestUseCase,
    pub export: ExportUseCase,
    pub query: QueryUseCase,
}

impl AppState {
    pub fn new(source: Arc<dyn SourcePort>, storage: Arc<dyn Storage>, sink: Option<SignedSink>) -> Self {
        Self {
            ingest: IngestUseCase::new(source, storage.clone()),
            export: ExportUseCase::new(storage.clone(), sink),
            query: QueryUseCase::new(storage.clone()),
            storage,
        }
    }

    /// Wire HTTP adapters and an empty in-memory store from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = Arc::new(ReqwestSource::from_config(config)?);
        let sink = match ReqwestSink::from_config(config)? {
            Some(sink) => {
                let secret = config.sink_secret.clone().unwrap_or_else(|| {
                    warn!("SINK_URL is set without SINK_SECRET; signing with an empty key");
                    String::new()
                });
                Some(SignedSink {
                    sink: Arc::new(sink),
                    secret,
                })
            }
            None => None,
        };
        Ok(Self::new(source, Arc::new(InMemoryStorage::new()), sink))
    }
}

/// Maps pipeline errors onto HTTP statuses with an `{"error": ...}` body
pub struct ApiError(pub EtlError);

impl From<EtlError> for ApiError {
    fn from(e: EtlError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EtlError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            EtlError::NoData(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &self.0 {
            EtlError::InvalidParameter { message, .. } => message.clone(),
            EtlError::NoData(message) => message.clone(),
            other => {
                error!(error = %other, "request failed");
                other.to_string()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// One page of a metrics listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub has_more: bool,
}

/// Slice `items` by offset/limit. A zero limit is treated as 1.
pub fn paginate<T>(items: Vec<T>, limit: usize, offset: usize) -> Page<T> {
    let limit = limit.max(1);
    let total = items.len();
    let start = offset.min(total);
    let end = offset.saturating_add(limit).min(total);
    let data = items.into_iter().skip(start).take(end - start).collect();
    Page {
        data,
        total,
        page: offset / limit + 1,
        limit,
        has_more: end < total,
    }
}

fn parse_day(name: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT)
        .map_err(|_| EtlError::invalid_parameter(name, format!("Invalid {} date format, use YYYY-MM-DD", name)))
}

fn non_empty(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct IngestParams {
    pub since: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub date: Option<String>,
}

/// Query string shared by the metrics listings. Unparseable numbers fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct MetricsParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub channel: Option<String>,
    pub utm_campaign: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl MetricsParams {
    /// A range only applies when both ends are given
    fn range(&self) -> Result<Option<DateRange>> {
        let from = non_empty(&self.from).map(|s| parse_day("from", s)).transpose()?;
        let to = non_empty(&self.to).map(|s| parse_day("to", s)).transpose()?;
        Ok(match (from, to) {
            (Some(from), Some(to)) => Some(DateRange { from, to }),
            _ => None,
        })
    }

    fn limit(&self) -> usize {
        non_empty(&self.limit).and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_LIMIT)
    }

    fn offset(&self) -> usize {
        non_empty(&self.offset).and_then(|s| s.parse().ok()).unwrap_or(0)
    }
}

async fn healthz() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    }))
}

async fn readyz(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Response> {
    if state.storage.has_data().await? {
        let last_ingest = state.storage.last_ingest().await?;
        Ok(Json(json!({
            "status": "ready",
            "has_data": true,
            "last_ingest": last_ingest.map(|t| t.to_rfc3339()),
        }))
        .into_response())
    } else {
        Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not ready",
                "has_data": false,
                "message": "No data ingested yet",
            })),
        )
            .into_response())
    }
}

async fn ingest_run(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<IngestParams>,
) -> ApiResult<Json<IngestSummary>> {
    let since = non_empty(&params.since).map(|s| parse_day("since", s)).transpose()?;
    if let Some(day) = since {
        info!(since = %day, "filtering data since date");
    }
    Ok(Json(state.ingest.run(since).await?))
}

async fn quality_report(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Response> {
    Ok(Json(state.query.quality_report().await?).into_response())
}

async fn channel_metrics(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<MetricsParams>,
) -> ApiResult<Response> {
    let rows = state
        .query
        .channel_metrics(params.range()?, non_empty(&params.channel))
        .await?;
    Ok(Json(paginate(rows, params.limit(), params.offset())).into_response())
}

async fn funnel_metrics(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<MetricsParams>,
) -> ApiResult<Response> {
    let rows = state
        .query
        .funnel_metrics(params.range()?, non_empty(&params.utm_campaign))
        .await?;
    Ok(Json(paginate(rows, params.limit(), params.offset())).into_response())
}

async fn export_run(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ExportParams>,
) -> ApiResult<Json<ExportSummary>> {
    let raw = non_empty(&params.date)
        .ok_or_else(|| EtlError::invalid_parameter("date", "date parameter is required (YYYY-MM-DD)"))?;
    let date = parse_day("date", raw)?;
    Ok(Json(state.export.run(date).await?))
}

async fn prometheus() -> Response {
    match observability::render() {
        Some(body) => ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// Build the router with all routes
pub fn create_server(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/ingest/run", post(ingest_run))
        .route("/quality/report", get(quality_report))
        .route("/metrics/channel", get(channel_metrics))
        .route("/metrics/funnel", get(funnel_metrics))
        .route("/metrics/prometheus", get(prometheus))
        .route("/export/run", post(export_run))
        .layer(Extension(state))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
}

/// Serve until ctrl-c
pub async fn start_server(state: Arc<AppState>, port: u16) -> Result<()> {
    let app = create_server(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(port, "server started with data quality tracking");

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down server");
        })
        .await
        .map_err(|e| EtlError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    info!("server exited");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_defaults_and_tail() {
        let page = paginate((0..25).collect::<Vec<_>>(), 10, 20);
        assert_eq!(page.data, vec![20, 21, 22, 23, 24]);
        assert_eq!(page.total, 25);
        assert_eq!(page.page, 3);
        assert!(!page.has_more);

        let first = paginate((0..25).collect::<Vec<_>>(), 10, 0);
        assert_eq!(first.data.len(), 10);
        assert!(first.has_more);
    }

    #[test]
    fn test_paginate_offset_past_end_and_zero_limit() {
        let page = paginate(vec![1, 2, 3], 10, 50);
        assert!(page.data.is_empty());
        assert_eq!(page.total, 3);
        assert!(!page.has_more);

        let clamped = paginate(vec![1, 2, 3], 0, 1);
        assert_eq!(clamped.limit, 1);
        assert_eq!(clamped.data, vec![2]);
        assert_eq!(clamped.page, 2);
    }

    #[test]
    fn test_range_needs_both_ends() {
        let only_from = MetricsParams {
            from: Some("2025-08-01".into()),
            ..Default::default()
        };
        assert_eq!(only_from.range().unwrap(), None);

        let bad = MetricsParams {
            to: Some("08/01/2025".into()),
            ..Default::default()
        };
        assert!(matches!(bad.range(), Err(EtlError::InvalidParameter { .. })));
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let params = MetricsParams {
            limit: Some("ten".into()),
            offset: Some("-3".into()),
            ..Default::default()
        };
        assert_eq!(params.limit(), DEFAULT_LIMIT);
        assert_eq!(params.offset(), 0);
    }
}
