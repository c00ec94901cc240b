pub mod finnhub;

use crate::domain::snapshot::{normalize_symbol, CompanySnapshot, Quote, QuotePoint};
use crate::error::{PipelineError, PipelineResult};
use serde_json::{Map, Value};

/// Read-only lookups against a financial-data provider. Each call returns the
/// provider's JSON body unchanged.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_profile(&self, symbol: &str) -> anyhow::Result<Value>;

    /// The full metric response; the bundle itself sits under `metric`.
    async fn fetch_metrics(&self, symbol: &str) -> anyhow::Result<Value>;

    async fn fetch_quote(&self, symbol: &str) -> anyhow::Result<Value>;
}

/// Fetches profile and metrics concurrently and merges them. Either failure
/// fails the whole snapshot; nothing partial is returned.
pub async fn get_company_snapshot(
    provider: &dyn MarketDataProvider,
    symbol: &str,
) -> PipelineResult<CompanySnapshot> {
    let symbol = normalize_symbol(symbol)?;

    let merged = async {
        let (profile, metrics) = tokio::try_join!(
            provider.fetch_profile(&symbol),
            provider.fetch_metrics(&symbol),
        )?;
        let profile = profile_fields(profile)?;
        let metrics = metric_bundle(metrics)?;
        anyhow::Ok((profile, metrics))
    }
    .await;

    match merged {
        Ok((profile, metrics)) => {
            tracing::debug!(
                %symbol,
                provider = provider.provider_name(),
                profile_fields = profile.len(),
                metrics = metrics.len(),
                "company snapshot assembled"
            );
            Ok(CompanySnapshot::merge(symbol, profile, metrics))
        }
        Err(err) => {
            tracing::error!(%symbol, provider = provider.provider_name(), error = %err, "company snapshot fetch failed");
            Err(PipelineError::data_unavailable(symbol, err))
        }
    }
}

/// Fetches a quote and reshapes it into the Open/High/Low/Current series.
pub async fn get_quote_chart(
    provider: &dyn MarketDataProvider,
    symbol: &str,
) -> PipelineResult<[QuotePoint; 4]> {
    let symbol = normalize_symbol(symbol)?;

    let quote = async {
        let raw = provider.fetch_quote(&symbol).await?;
        Quote::from_provider_json(&raw)
    }
    .await;

    match quote {
        Ok(quote) => Ok(quote.chart()),
        Err(err) => {
            tracing::error!(%symbol, provider = provider.provider_name(), error = %err, "quote fetch failed");
            Err(PipelineError::data_unavailable(symbol, err))
        }
    }
}

fn profile_fields(raw: Value) -> anyhow::Result<Map<String, Value>> {
    match raw {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("profile response is not a JSON object: {other}"),
    }
}

fn metric_bundle(raw: Value) -> anyhow::Result<Map<String, Value>> {
    let mut obj = match raw {
        Value::Object(map) => map,
        other => anyhow::bail!("metrics response is not a JSON object: {other}"),
    };
    match obj.remove("metric") {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(bundle)) => Ok(bundle),
        Some(other) => anyhow::bail!("metric bundle is not a JSON object: {other}"),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeProvider;
    use super::*;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn snapshot_nests_metric_bundle_under_metrics() {
        let provider = FakeProvider {
            profile: Some(json!({"name": "Acme", "finnhubIndustry": "Tools"})),
            metrics: Some(json!({"metric": {"beta": 1.2}, "metricType": "all"})),
            ..Default::default()
        };

        let snapshot = get_company_snapshot(&provider, "acme").await.unwrap();
        assert_eq!(snapshot.symbol, "ACME");

        let v = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(v["name"], json!("Acme"));
        assert_eq!(v["metrics"], json!({"beta": 1.2}));
        assert!(v.get("metricType").is_none());
    }

    #[tokio::test]
    async fn snapshot_tolerates_missing_metric_bundle_and_empty_profile() {
        let provider = FakeProvider {
            profile: Some(json!({})),
            metrics: Some(json!({"metricType": "all"})),
            ..Default::default()
        };

        let snapshot = get_company_snapshot(&provider, "ZZZZ").await.unwrap();
        assert!(snapshot.profile.is_empty());
        assert!(snapshot.metrics.is_empty());
    }

    #[tokio::test]
    async fn snapshot_fails_when_either_lookup_fails() {
        let provider = FakeProvider {
            profile: Some(json!({"name": "Acme"})),
            metrics: None,
            ..Default::default()
        };
        let err = get_company_snapshot(&provider, "ACME").await.unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable { .. }));

        let provider = FakeProvider {
            profile: None,
            metrics: Some(json!({"metric": {}})),
            ..Default::default()
        };
        let err = get_company_snapshot(&provider, "ACME").await.unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn snapshot_rejects_malformed_metric_bundle() {
        let provider = FakeProvider {
            profile: Some(json!({"name": "Acme"})),
            metrics: Some(json!({"metric": [1, 2, 3]})),
            ..Default::default()
        };
        let err = get_company_snapshot(&provider, "ACME").await.unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn snapshot_issues_lookups_concurrently() {
        let provider = FakeProvider {
            profile: Some(json!({})),
            metrics: Some(json!({"metric": {}})),
            delay: Some(Duration::from_millis(200)),
            ..Default::default()
        };

        let started = Instant::now();
        get_company_snapshot(&provider, "ACME").await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() < Duration::from_millis(390));
    }

    #[tokio::test]
    async fn invalid_symbol_makes_no_calls() {
        let provider = FakeProvider::default();
        let err = get_company_snapshot(&provider, "  ").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn quote_chart_reshapes_in_fixed_order() {
        let provider = FakeProvider {
            quote: Some(json!({"o": 10, "h": 12, "l": 9, "c": 11, "t": 1700000000})),
            ..Default::default()
        };

        let chart = get_quote_chart(&provider, "acme").await.unwrap();
        let labels: Vec<_> = chart.iter().map(|p| p.label).collect();
        let values: Vec<_> = chart.iter().map(|p| p.value).collect();
        assert_eq!(labels, ["Open", "High", "Low", "Current"]);
        assert_eq!(values, [10.0, 12.0, 9.0, 11.0]);
    }

    #[tokio::test]
    async fn quote_chart_fails_on_non_numeric_quote() {
        let provider = FakeProvider {
            quote: Some(json!({"o": null, "h": 12, "l": 9, "c": 11})),
            ..Default::default()
        };
        let err = get_quote_chart(&provider, "ACME").await.unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable { .. }));
    }
}
