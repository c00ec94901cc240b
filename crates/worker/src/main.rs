use clap::{Parser, Subcommand};
use riskdesk_core::config::Settings;
use riskdesk_core::market::finnhub::FinnhubClient;
use riskdesk_core::report::store::LocalDirStore;
use riskdesk_core::report::ReportRenderer;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod pipeline;

#[derive(Debug, Parser)]
#[command(name = "riskdesk_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a risk report for one symbol and write it to REPORT_DIR.
    Report {
        #[arg(long)]
        symbol: String,

        /// Fetch data and generate the narrative, but do not render.
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete report files older than the given age.
    Prune {
        #[arg(long)]
        older_than_days: u32,

        /// List what would be deleted.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let renderer = ReportRenderer::new(Arc::new(LocalDirStore::new(settings.report_dir())));

    let result = match args.command {
        Command::Report { symbol, dry_run } => run_report(&settings, &renderer, &symbol, dry_run).await,
        Command::Prune {
            older_than_days,
            dry_run,
        } => pipeline::run_prune(&renderer, older_than_days, chrono::Utc::now(), dry_run)
            .await
            .map(|pruned| {
                tracing::info!(older_than_days, dry_run, count = pruned.len(), "prune finished");
            }),
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "worker command failed");
    }
    result
}

async fn run_report(
    settings: &Settings,
    renderer: &ReportRenderer,
    symbol: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    let market = FinnhubClient::from_settings(settings)?;
    let narrator = riskdesk_core::llm::from_settings(settings)?;

    if let Some(artifact) =
        pipeline::run_report(&market, narrator.as_ref(), renderer, symbol, dry_run).await?
    {
        tracing::info!(
            symbol = %artifact.symbol,
            identifier = %artifact.identifier,
            generated_at = %artifact.generated_at,
            "report written"
        );
    }
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
