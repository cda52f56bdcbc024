use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use marketing_etl::app::ports::SourcePort;
use marketing_etl::domain::{AdsRecord, CrmRecord};
use marketing_etl::pipeline::storage::InMemoryStorage;
use marketing_etl::server::{create_server, AppState};
use marketing_etl::Result;

struct FixtureSource;

#[async_trait]
impl SourcePort for FixtureSource {
    async fn fetch_ads(&self) -> Result<Vec<AdsRecord>> {
        let ad = |date: &str, campaign: &str, channel: &str| AdsRecord {
            date: date.to_string(),
            campaign_id: campaign.to_string(),
            channel: channel.to_string(),
            clicks: 100,
            impressions: 1000,
            cost: 50.0,
            utm_campaign: "summer".to_string(),
            utm_source: Some("google".to_string()),
            utm_medium: Some("cpc".to_string()),
        };
        Ok(vec![
            ad("2025-08-01", "C1", "google_ads"),
            ad("2025-08-01", "C1", "google_ads"),
            ad("2025-08-01", "C2", "facebook_ads"),
            ad("2025-08-02", "C1", "google_ads"),
        ])
    }

    async fn fetch_crm(&self) -> Result<Vec<CrmRecord>> {
        Ok(vec![CrmRecord {
            opportunity_id: "O1".to_string(),
            contact_email: "a@b.io".to_string(),
            stage: "closed_won".to_string(),
            amount: 200.0,
            created_at: "2025-08-01T10:00:00Z".to_string(),
            utm_campaign: "summer".to_string(),
            utm_source: Some("google".to_string()),
            utm_medium: Some("cpc".to_string()),
        }])
    }
}

fn app() -> Router {
    let state = AppState::new(Arc::new(FixtureSource), Arc::new(InMemoryStorage::new()), None);
    create_server(Arc::new(state))
}

async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = app();

    let (status, body) = call(&app, Method::GET, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "marketing-etl");

    let (status, body) = call(&app, Method::GET, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["has_data"], false);

    call(&app, Method::POST, "/ingest/run").await;
    let (status, body) = call(&app, Method::GET, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert!(body["last_ingest"].is_string());
}

#[tokio::test]
async fn test_quality_report_requires_ingest() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/quality/report").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("run ingestion first"));

    let (status, body) = call(&app, Method::POST, "/ingest/run").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["ads_records"], 3);
    assert_eq!(body["quality_summary"]["duplicate_ads_records"], 1);

    let (status, body) = call(&app, Method::GET, "/quality/report").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total_ads_records"], 3);
    assert_eq!(body["ads_duplicates"][0]["record_id"], "ads_1");
}

#[tokio::test]
async fn test_ingest_rejects_bad_since() {
    let (status, body) = call(&app(), Method::POST, "/ingest/run?since=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid since date format, use YYYY-MM-DD");
}

#[tokio::test]
async fn test_channel_metrics_pagination_and_filters() {
    let app = app();
    call(&app, Method::POST, "/ingest/run").await;

    let (status, body) = call(&app, Method::GET, "/metrics/channel").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["has_more"], false);
    assert_eq!(body["data"][0]["channel"], "facebook_ads");
    assert_eq!(body["data"][1]["roas"], 4.0);
    assert_eq!(body["data"][1]["quality_score"], 100.0);

    let (_, body) = call(&app, Method::GET, "/metrics/channel?limit=1&offset=1").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["page"], 2);
    assert_eq!(body["has_more"], true);

    let (_, body) = call(&app, Method::GET, "/metrics/channel?from=2025-08-02&to=2025-08-02").await;
    assert_eq!(body["total"], 1);

    // one-sided range is ignored
    let (_, body) = call(&app, Method::GET, "/metrics/channel?from=2025-08-02").await;
    assert_eq!(body["total"], 3);

    let (_, body) = call(&app, Method::GET, "/metrics/channel?channel=facebook_ads").await;
    assert_eq!(body["total"], 1);

    let (status, _) = call(&app, Method::GET, "/metrics/channel?from=bad&to=2025-08-02").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_funnel_metrics() {
    let app = app();
    call(&app, Method::POST, "/ingest/run").await;

    let (status, body) = call(&app, Method::GET, "/metrics/funnel?utm_campaign=summer").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["utm_source"], "google");
    assert_eq!(body["data"][0]["closed_won"], 1);

    let (_, body) = call(&app, Method::GET, "/metrics/funnel?utm_campaign=winter").await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_export_run() {
    let app = app();

    let (status, _) = call(&app, Method::POST, "/export/run").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, Method::POST, "/export/run?date=2025-13-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    call(&app, Method::POST, "/ingest/run").await;

    let (status, _) = call(&app, Method::POST, "/export/run?date=2024-01-01").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, Method::POST, "/export/run?date=2025-08-01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["records_count"], 2);
    assert_eq!(body["date"], "2025-08-01");
    assert!(body["sink_url"].is_null());
    assert_eq!(body["data"][0]["campaign_id"], "aggregated");
}
