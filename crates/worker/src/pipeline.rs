use anyhow::Context;
use chrono::{DateTime, Utc};
use riskdesk_core::domain::narrative::RiskNarrativeRequest;
use riskdesk_core::llm::TextGenerator;
use riskdesk_core::market::{self, MarketDataProvider};
use riskdesk_core::narrative;
use riskdesk_core::report::{ReportArtifact, ReportRenderer};

/// Snapshot, narrative and report for one symbol, the same path a mobile
/// client takes through the API. `dry_run` stops before rendering.
pub async fn run_report(
    market: &dyn MarketDataProvider,
    narrator: &dyn TextGenerator,
    renderer: &ReportRenderer,
    symbol: &str,
    dry_run: bool,
) -> anyhow::Result<Option<ReportArtifact>> {
    let snapshot = market::get_company_snapshot(market, symbol)
        .await
        .with_context(|| format!("snapshot for {symbol} failed"))?;

    let req = RiskNarrativeRequest {
        symbol: snapshot.symbol.clone(),
        metrics: snapshot.metrics.clone(),
        industry: snapshot.industry().map(str::to_string),
    };
    let outcome = narrative::generate_risk_narrative(narrator, &req).await;

    tracing::info!(
        symbol = %snapshot.symbol,
        name = snapshot.name().unwrap_or("-"),
        fallback = outcome.is_fallback(),
        chars = outcome.explanation().len(),
        "narrative ready"
    );

    if dry_run {
        tracing::info!(symbol = %snapshot.symbol, dry_run = true, "skipping report render");
        return Ok(None);
    }

    let artifact = renderer
        .render_report(outcome.explanation(), &snapshot.symbol)
        .await
        .context("render report failed")?;
    Ok(Some(artifact))
}

pub async fn run_prune(
    renderer: &ReportRenderer,
    older_than_days: u32,
    now: DateTime<Utc>,
    dry_run: bool,
) -> anyhow::Result<Vec<String>> {
    let cutoff = now - chrono::Duration::days(i64::from(older_than_days));
    let pruned = renderer.prune_before(cutoff, dry_run).await?;
    for name in &pruned {
        tracing::info!(%name, dry_run, "pruned report");
    }
    Ok(pruned)
}
