use crate::config::Settings;
use crate::market::MarketDataProvider;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const PROFILE_PATH: &str = "/stock/profile2";
const METRIC_PATH: &str = "/stock/metric";
const QUOTE_PATH: &str = "/quote";

#[derive(Debug, Clone)]
pub struct FinnhubClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FinnhubClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_finnhub_api_key()?.to_string();
        let base_url = settings
            .finnhub_base_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("FINNHUB_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build finnhub http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        // Token travels as a header, never in the query string.
        let mut headers = HeaderMap::new();
        headers.insert("x-finnhub-token", HeaderValue::from_str(&self.api_key)?);
        Ok(headers)
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let res = self
            .http
            .get(self.url(path))
            .headers(self.headers()?)
            .query(query)
            .send()
            .await
            .with_context(|| format!("finnhub request failed: {path}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read finnhub response")?;

        if !status.is_success() {
            anyhow::bail!("finnhub HTTP {status} for {path}: {text}");
        }

        serde_json::from_str::<Value>(&text)
            .with_context(|| format!("finnhub response is not valid JSON: {text}"))
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for FinnhubClient {
    fn provider_name(&self) -> &'static str {
        "finnhub"
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<Value> {
        self.get_json(PROFILE_PATH, &[("symbol", symbol)]).await
    }

    async fn fetch_metrics(&self, symbol: &str) -> Result<Value> {
        self.get_json(METRIC_PATH, &[("symbol", symbol), ("metric", "all")])
            .await
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Value> {
        self.get_json(QUOTE_PATH, &[("symbol", symbol)]).await
    }
}
