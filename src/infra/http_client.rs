use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::app::ports::{ExportSinkPort, SourcePort};
use crate::config::Config;
use crate::domain::{AdsRecord, AdsResponse, CrmRecord, CrmResponse};
use crate::error::{EtlError, Result};
use crate::observability::metrics;

pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Attempt count and backoff shared by fetches and export posts.
///
/// Before retry `n` (1-based) the caller sleeps `n² * backoff_unit`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, retry: u32) -> Duration {
        self.backoff_unit * retry * retry
    }

    async fn run<T, F, Fut>(&self, url: &str, source: &'static str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                let backoff = self.backoff(attempt);
                warn!(url, attempt = attempt + 1, backoff_ms = backoff.as_millis() as u64, "retrying request after backoff");
                metrics::sources::request_retry(source);
                tokio::time::sleep(backoff).await;
            }

            let started = Instant::now();
            match op().await {
                Ok(value) => {
                    metrics::sources::request_success(source);
                    metrics::sources::request_duration(source, started.elapsed().as_secs_f64());
                    info!(url, attempt = attempt + 1, "request successful");
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    warn!(url, error = %e, "request failed");
                    attempt += 1;
                }
                Err(e) => {
                    metrics::sources::request_error(source);
                    return Err(e);
                }
            }
        }
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

fn check_status(url: &str, status: reqwest::StatusCode) -> Result<()> {
    if status.is_client_error() || status.is_server_error() {
        return Err(EtlError::UpstreamStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}

/// Fetches ads and CRM batches over HTTP
pub struct ReqwestSource {
    client: reqwest::Client,
    ads_url: String,
    crm_url: String,
    retry: RetryPolicy,
}

impl ReqwestSource {
    pub fn new(ads_url: impl Into<String>, crm_url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            ads_url: ads_url.into(),
            crm_url: crm_url.into(),
            retry,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let (ads, crm) = config.source_urls()?;
        Self::new(
            ads,
            crm,
            config.http_timeout,
            RetryPolicy {
                attempts: config.retry_attempts,
                ..RetryPolicy::default()
            },
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, source: &'static str) -> Result<T> {
        let client = &self.client;
        self.retry
            .run(url, source, move || async move {
                let resp = client.get(url).send().await?;
                check_status(url, resp.status())?;
                let body = resp.bytes().await?;
                Ok(serde_json::from_slice::<T>(&body)?)
            })
            .await
    }
}

#[async_trait]
impl SourcePort for ReqwestSource {
    async fn fetch_ads(&self) -> Result<Vec<AdsRecord>> {
        let response: AdsResponse = self.get_json(&self.ads_url, "ads").await?;
        let records = response.into_records();
        info!(records = records.len(), "fetched ads data");
        Ok(records)
    }

    async fn fetch_crm(&self) -> Result<Vec<CrmRecord>> {
        let response: CrmResponse = self.get_json(&self.crm_url, "crm").await?;
        let records = response.into_records();
        info!(records = records.len(), "fetched CRM data");
        Ok(records)
    }
}

/// Posts signed export rows to the configured sink
pub struct ReqwestSink {
    client: reqwest::Client,
    url: String,
    retry: RetryPolicy,
}

impl ReqwestSink {
    pub fn new(url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
            retry,
        })
    }

    /// `None` when no sink URL is configured
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        config
            .sink_url
            .as_deref()
            .map(|url| {
                Self::new(
                    url,
                    config.http_timeout,
                    RetryPolicy {
                        attempts: config.retry_attempts,
                        ..RetryPolicy::default()
                    },
                )
            })
            .transpose()
    }
}

#[async_trait]
impl ExportSinkPort for ReqwestSink {
    fn url(&self) -> &str {
        &self.url
    }

    async fn post_signed(&self, body: Vec<u8>, signature: &str) -> Result<()> {
        let url = self.url.as_str();
        let client = &self.client;
        self.retry
            .run(url, "sink", move || {
                let body = body.clone();
                async move {
                    let resp = client
                        .post(url)
                        .header(CONTENT_TYPE, "application/json")
                        .header(SIGNATURE_HEADER, signature)
                        .body(body)
                        .send()
                        .await?;
                    check_status(url, resp.status())
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::get, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::net::{SocketAddr, TcpListener};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff_unit: Duration::from_millis(1),
        }
    }

    fn spawn(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = axum::Server::from_tcp(listener).unwrap().serve(app.into_make_service());
        tokio::spawn(server);
        addr
    }

    /// Returns 503 for the first `failures` calls, then the ads payload
    fn flaky_ads(failures: usize) -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/ads",
                get(move |State(calls): State<Arc<AtomicUsize>>| async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < failures {
                        return Err(StatusCode::SERVICE_UNAVAILABLE);
                    }
                    Ok(Json(json!({
                        "external": {"ads": {"performance": [{"campaign_id": "C1", "clicks": 5}]}}
                    })))
                }),
            )
            .route("/crm", get(|| async { StatusCode::NOT_FOUND }))
            .with_state(calls.clone());
        (app, calls)
    }

    #[test]
    fn test_backoff_is_quadratic() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(9));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let (app, calls) = flaky_ads(2);
        let addr = spawn(app);
        let source = ReqwestSource::new(
            format!("http://{}/ads", addr),
            format!("http://{}/crm", addr),
            Duration::from_secs(5),
            fast_retry(3),
        )
        .unwrap();

        let ads = source.fetch_ads().await.unwrap();
        assert_eq!(ads.len(), 1);
        assert_eq!(ads[0].campaign_id, "C1");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_last_attempt() {
        let (app, calls) = flaky_ads(10);
        let addr = spawn(app);
        let source =
            ReqwestSource::new(format!("http://{}/ads", addr), "", Duration::from_secs(5), fast_retry(2)).unwrap();

        let err = source.fetch_ads().await.unwrap_err();
        assert!(matches!(err, EtlError::UpstreamStatus { status: 503, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_errors_fail_immediately() {
        let (app, _) = flaky_ads(0);
        let addr = spawn(app);
        let source =
            ReqwestSource::new("", format!("http://{}/crm", addr), Duration::from_secs(5), fast_retry(3)).unwrap();

        let err = source.fetch_crm().await.unwrap_err();
        assert!(matches!(err, EtlError::UpstreamStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_sink_receives_signature_header() {
        let seen: Arc<Mutex<Vec<(String, Value)>>> = Arc::default();
        let app = Router::new()
            .route(
                "/sink",
                post(
                    |State(seen): State<Arc<Mutex<Vec<(String, Value)>>>>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        let sig = headers
                            .get(SIGNATURE_HEADER)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        seen.lock().unwrap().push((sig, body));
                        StatusCode::OK
                    },
                ),
            )
            .with_state(seen.clone());
        let addr = spawn(app);

        let sink = ReqwestSink::new(format!("http://{}/sink", addr), Duration::from_secs(5), fast_retry(1)).unwrap();
        sink.post_signed(br#"{"channel":"google_ads"}"#.to_vec(), "sha256=abc").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "sha256=abc");
        assert_eq!(seen[0].1["channel"], "google_ads");
    }
}
