// =============================================================================
// RentCast REST API Client — per-ZIP market statistics
// =============================================================================
//
// One GET per ZIP code against `{base}/markets?zipCode=...`. The base URL is
// either the upstream API or a local proxy that injects the key server-side,
// so the API key is optional here. The key is never logged or serialised.
//
// No retries, no backoff, no rate limiting. No timeout unless one is
// configured.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::market::{normalize, MarketSource, NormalizedMarket};
use crate::rentcast::raw::RawMarketResponse;

/// Default upstream base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.rentcast.io/v1";

/// Error bodies are truncated to this many characters.
const ERROR_BODY_LIMIT: usize = 200;

/// RentCast REST API client.
#[derive(Clone)]
pub struct RentcastClient {
    base_url: String,
    has_api_key: bool,
    client: reqwest::Client,
}

impl RentcastClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new `RentcastClient`.
    ///
    /// # Arguments
    /// * `base_url` — API root, e.g. `https://api.rentcast.io/v1`.
    /// * `api_key`  — sent as `X-Api-Key` when present and non-empty.
    /// * `timeout`  — request timeout; `None` leaves the transport default.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if let Some(key) = &api_key {
            let mut val = HeaderValue::from_str(key.trim()).context("API key is not a valid header value")?;
            val.set_sensitive(true);
            default_headers.insert("X-Api-Key", val);
        }

        let mut builder = reqwest::Client::builder().default_headers(default_headers);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().context("failed to build reqwest client")?;

        debug!(base_url = %base_url, has_api_key = api_key.is_some(), "RentcastClient initialised");

        Ok(Self {
            base_url,
            has_api_key: api_key.is_some(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -------------------------------------------------------------------------
    // Markets
    // -------------------------------------------------------------------------

    /// GET /markets?zipCode={zip}, returning the first entry still raw.
    #[instrument(skip(self), name = "rentcast::get_market")]
    pub async fn get_market(&self, zip: &str) -> Result<RawMarketResponse, FetchError> {
        let url = format!("{}/markets", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[("zipCode", zip)])
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let body: Value = serde_json::from_str(&text)?;
        debug!(zip, bytes = text.len(), "raw market response received");

        let first = match body {
            Value::Array(items) => items.into_iter().next(),
            Value::Object(map) if map.is_empty() => None,
            obj @ Value::Object(_) => Some(obj),
            Value::Null => None,
            other => {
                return Err(FetchError::Parse(format!(
                    "expected an object or array, got: {other}"
                )))
            }
        };

        let item = first.ok_or_else(|| FetchError::NoData(zip.to_string()))?;
        Ok(serde_json::from_value(item)?)
    }
}

#[async_trait]
impl MarketSource for RentcastClient {
    async fn fetch_market(&self, zip: &str) -> Result<NormalizedMarket, FetchError> {
        let raw = self.get_market(zip).await?;
        let market = normalize(&raw, zip);
        debug!(zip, resolved = %market.zip, history = market.historical.len(), "market normalised");
        Ok(market)
    }
}

impl std::fmt::Debug for RentcastClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RentcastClient")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.has_api_key { "<redacted>" } else { "<none>" })
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::{
        extract::{Query, State},
        http::{HeaderMap as AxumHeaders, StatusCode},
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use parking_lot::Mutex;

    /// What the fake upstream saw.
    #[derive(Default)]
    struct Seen {
        api_keys: Vec<Option<String>>,
        accepts: Vec<Option<String>>,
    }

    async fn markets(
        State(seen): State<Arc<Mutex<Seen>>>,
        headers: AxumHeaders,
        Query(q): Query<HashMap<String, String>>,
    ) -> axum::response::Response {
        {
            let mut seen = seen.lock();
            seen.api_keys.push(
                headers.get("x-api-key").and_then(|v| v.to_str().ok()).map(str::to_string),
            );
            seen.accepts.push(
                headers.get("accept").and_then(|v| v.to_str().ok()).map(str::to_string),
            );
        }

        match q.get("zipCode").map(String::as_str) {
            Some("32789") => Json(serde_json::json!([{
                "id": "32789",
                "zipCode": "32789",
                "rentalData": {
                    "averageRent": 1850,
                    "totalListings": 212,
                    "history": {
                        "2025-01": { "averageRent": 1800 },
                        "2025-02": { "averageRent": 1825 }
                    }
                }
            }]))
            .into_response(),
            Some("32803") => (
                [("content-type", "application/json")],
                r#"[{"id":"32803","rentalData":{
                    "dataByPropertyType":[{"averageRent":1400},{"propertyType":"Condo","totalListings":7}],
                    "dataByBedrooms":[{"bedrooms":2.0,"totalListings":5}],
                    "history":{
                        "2025-03":{"averageRent":1550},
                        "2025-01":{"averageRent":1500},
                        "2025-02":{"averageRent":1525}
                    }
                }}]"#,
            )
                .into_response(),
            Some("32792") => Json(serde_json::json!({ "zipCode": "32792" })).into_response(),
            Some("00000") => Json(serde_json::json!([])).into_response(),
            Some("00001") => Json(serde_json::json!({})).into_response(),
            Some("50000") => (StatusCode::INTERNAL_SERVER_ERROR, "x".repeat(500)).into_response(),
            Some("40100") => (StatusCode::UNAUTHORIZED, "bad key").into_response(),
            Some("77777") => "this is not json".into_response(),
            Some("88888") => Json(serde_json::json!(42)).into_response(),
            Some("99999") => Json(serde_json::json!([{ "rentalData": { "averageRent": "lots" } }])).into_response(),
            _ => Json(serde_json::json!([])).into_response(),
        }
    }

    async fn spawn_upstream() -> (String, Arc<Mutex<Seen>>) {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let app = Router::new()
            .route("/v1/markets", get(markets))
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/v1"), seen)
    }

    #[tokio::test]
    async fn fetches_and_normalises_first_item() {
        let (base, seen) = spawn_upstream().await;
        let client = RentcastClient::new(base, Some("secret".into()), None).unwrap();

        let market = client.fetch_market("32789").await.unwrap();
        assert_eq!(market.zip, "32789");
        assert_eq!(market.metrics.average_rent, 1850.0);
        assert_eq!(market.metrics.total_listings, 212);
        assert_eq!(market.historical.len(), 2);
        assert_eq!(market.historical[0].month, "2025-01");

        let seen = seen.lock();
        assert_eq!(seen.api_keys, vec![Some("secret".to_string())]);
        assert_eq!(seen.accepts, vec![Some("application/json".to_string())]);
    }

    #[tokio::test]
    async fn history_keeps_upstream_month_order() {
        let (base, _) = spawn_upstream().await;
        let client = RentcastClient::new(base, None, None).unwrap();

        let market = client.fetch_market("32803").await.unwrap();
        let months: Vec<&str> = market.historical.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, vec!["2025-03", "2025-01", "2025-02"]);
        assert_eq!(market.historical[1].average_rent, Some(1500.0));
    }

    #[tokio::test]
    async fn loose_breakdown_rows_do_not_drop_the_market() {
        let (base, _) = spawn_upstream().await;
        let client = RentcastClient::new(base, None, None).unwrap();

        let market = client.fetch_one("32803").await.expect("market survives");
        let types = market.data_by_property_type.unwrap();
        assert_eq!(types[0].property_type, "");
        assert_eq!(types[1].property_type, "Condo");
        assert_eq!(market.data_by_bedrooms.unwrap()[0].bedrooms, Some(2));
    }

    #[tokio::test]
    async fn omits_api_key_when_not_configured() {
        let (base, seen) = spawn_upstream().await;
        let client = RentcastClient::new(base.clone(), None, None).unwrap();
        client.fetch_market("32789").await.unwrap();

        let blank = RentcastClient::new(base, Some("   ".into()), None).unwrap();
        blank.fetch_market("32789").await.unwrap();

        assert_eq!(seen.lock().api_keys, vec![None, None]);
    }

    #[tokio::test]
    async fn single_object_response_is_one_item() {
        let (base, _) = spawn_upstream().await;
        let client = RentcastClient::new(base, None, None).unwrap();

        let market = client.fetch_market("32792").await.unwrap();
        assert_eq!(market.zip, "32792");
        assert_eq!(market.metrics.average_rent, 0.0);
    }

    #[tokio::test]
    async fn empty_results_are_no_data() {
        let (base, _) = spawn_upstream().await;
        let client = RentcastClient::new(base, None, None).unwrap();

        assert_eq!(
            client.fetch_market("00000").await.unwrap_err(),
            FetchError::NoData("00000".into())
        );
        assert_eq!(
            client.fetch_market("00001").await.unwrap_err(),
            FetchError::NoData("00001".into())
        );
        assert!(client.fetch_one("00000").await.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_truncated_body() {
        let (base, _) = spawn_upstream().await;
        let client = RentcastClient::new(base, None, None).unwrap();

        match client.fetch_market("50000").await.unwrap_err() {
            FetchError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), ERROR_BODY_LIMIT);
            }
            other => panic!("expected Status, got {other:?}"),
        }

        assert!(matches!(
            client.fetch_market("40100").await.unwrap_err(),
            FetchError::Status { status: 401, .. }
        ));
    }

    #[tokio::test]
    async fn malformed_bodies_are_parse_errors() {
        let (base, _) = spawn_upstream().await;
        let client = RentcastClient::new(base, None, None).unwrap();

        assert!(matches!(client.fetch_market("77777").await.unwrap_err(), FetchError::Parse(_)));
        assert!(matches!(client.fetch_market("88888").await.unwrap_err(), FetchError::Parse(_)));
        assert!(matches!(client.fetch_market("99999").await.unwrap_err(), FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RentcastClient::new(format!("http://{addr}/v1"), None, None).unwrap();
        assert!(matches!(
            client.fetch_market("32789").await.unwrap_err(),
            FetchError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn batch_drops_failed_zips() {
        let (base, _) = spawn_upstream().await;
        let client = RentcastClient::new(base, None, None).unwrap();

        let zips = vec!["50000".to_string(), "32789".to_string(), "00000".to_string()];
        let markets = client.fetch_many(&zips).await;
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].zip, "32789");
    }

    #[test]
    fn debug_redacts_key() {
        let client = RentcastClient::new("http://localhost/v1/", Some("secret".into()), None).unwrap();
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("<redacted>"));
        assert_eq!(client.base_url(), "http://localhost/v1");
    }
}
