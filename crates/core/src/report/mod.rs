pub mod pdf;
pub mod store;

use crate::domain::snapshot::normalize_symbol;
use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, LazyLock};
use store::{ArtifactStore, StoreError};

const MAX_NAME_ATTEMPTS: usize = 8;

static ARTIFACT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^report-([A-Z0-9.\-]{1,20})-([0-9]{1,19})\.pdf$")
        .unwrap_or_else(|e| panic!("invalid artifact name pattern: {e}"))
});

/// Last millisecond stamp handed out in this process.
static LAST_STAMP_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Current epoch millis, bumped past the last stamp so that two reports in the
/// same millisecond still get distinct names.
fn next_stamp_millis() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut prev = LAST_STAMP_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST_STAMP_MILLIS.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}

pub fn artifact_name(symbol: &str, stamp_millis: i64) -> String {
    format!("report-{symbol}-{stamp_millis}.pdf")
}

/// Splits `report-<SYMBOL>-<millis>.pdf` into its symbol and timestamp.
pub fn parse_artifact_name(name: &str) -> Option<(String, DateTime<Utc>)> {
    let caps = ARTIFACT_NAME.captures(name)?;
    let millis = caps.get(2)?.as_str().parse::<i64>().ok()?;
    let at = Utc.timestamp_millis_opt(millis).single()?;
    Some((caps.get(1)?.as_str().to_string(), at))
}

pub fn report_title(symbol: &str) -> String {
    format!("Risk Report for {}", symbol.to_ascii_uppercase())
}

/// One published report. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportArtifact {
    pub identifier: String,
    pub symbol: String,
    pub generated_at: DateTime<Utc>,
    pub source_narrative: String,
}

#[derive(Clone)]
pub struct ReportRenderer {
    store: Arc<dyn ArtifactStore>,
}

impl ReportRenderer {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Renders the narrative to a PDF and publishes it.
    ///
    /// The identifier is returned only after the store reports the write
    /// complete; any store failure is `ReportWriteFailed` and yields no
    /// identifier.
    pub async fn render_report(&self, explanation: &str, symbol: &str) -> PipelineResult<ReportArtifact> {
        let symbol = normalize_symbol(symbol)?;
        let bytes = pdf::render_document(&report_title(&symbol), explanation);

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let stamp = next_stamp_millis();
            let name = artifact_name(&symbol, stamp);
            tracing::debug!(%symbol, %name, attempt, bytes = bytes.len(), "writing report");

            match self.store.put(&name, &bytes).await {
                Ok(identifier) => {
                    let generated_at = Utc
                        .timestamp_millis_opt(stamp)
                        .single()
                        .unwrap_or_else(Utc::now);
                    tracing::info!(%symbol, %identifier, store = %self.store.describe(), "report created");
                    return Ok(ReportArtifact {
                        identifier,
                        symbol,
                        generated_at,
                        source_narrative: explanation.to_string(),
                    });
                }
                Err(StoreError::AlreadyExists(name)) => {
                    tracing::debug!(%symbol, %name, attempt, "report name taken; trying next stamp");
                }
                Err(StoreError::Io(source)) => {
                    tracing::error!(%symbol, %name, error = %format!("{source:#}"), "report write failed");
                    return Err(PipelineError::ReportWriteFailed { source });
                }
            }
        }

        Err(PipelineError::ReportWriteFailed {
            source: anyhow::anyhow!("no free report name after {MAX_NAME_ATTEMPTS} attempts"),
        })
    }

    /// Fetches a published artifact by exact name.
    pub async fn retrieve_artifact(&self, identifier: &str) -> PipelineResult<Vec<u8>> {
        if parse_artifact_name(identifier).is_none() {
            return Err(PipelineError::invalid(format!(
                "not a report identifier: {identifier}"
            )));
        }

        match self.store.get(identifier).await {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(PipelineError::NotFound(identifier.to_string())),
            Err(err) => {
                tracing::error!(%identifier, error = %format!("{err:#}"), "report read failed");
                Err(PipelineError::NotFound(identifier.to_string()))
            }
        }
    }

    /// Deletes reports whose embedded timestamp is before `cutoff`. Names that
    /// are not report identifiers are left alone. With `dry_run`, only lists.
    pub async fn prune_before(&self, cutoff: DateTime<Utc>, dry_run: bool) -> anyhow::Result<Vec<String>> {
        let mut pruned = Vec::new();
        for name in self.store.list().await? {
            let Some((_, created_at)) = parse_artifact_name(&name) else {
                continue;
            };
            if created_at >= cutoff {
                continue;
            }
            if dry_run || self.store.delete(&name).await? {
                pruned.push(name);
            }
        }
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::store::{LocalDirStore, MemoryStore};
    use super::*;
    use chrono::Duration;

    struct FailingStore;

    #[async_trait::async_trait]
    impl ArtifactStore for FailingStore {
        fn describe(&self) -> String {
            "failing".to_string()
        }

        async fn put(&self, _name: &str, _bytes: &[u8]) -> Result<String, StoreError> {
            Err(anyhow::anyhow!("No space left on device").into())
        }

        async fn get(&self, _name: &str) -> anyhow::Result<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn list(&self) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _name: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
    }

    fn memory_renderer() -> ReportRenderer {
        ReportRenderer::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn artifact_names_round_trip() {
        let name = artifact_name("BRK.B", 1_700_000_000_123);
        assert_eq!(name, "report-BRK.B-1700000000123.pdf");

        let (symbol, at) = parse_artifact_name(&name).unwrap();
        assert_eq!(symbol, "BRK.B");
        assert_eq!(at.timestamp_millis(), 1_700_000_000_123);

        let (symbol, _) = parse_artifact_name("report-RDS-A-5.pdf").unwrap();
        assert_eq!(symbol, "RDS-A");
    }

    #[test]
    fn rejects_foreign_names() {
        assert!(parse_artifact_name("../report-A-1.pdf").is_none());
        assert!(parse_artifact_name("report-a-1.pdf").is_none());
        assert!(parse_artifact_name("report-A-1.pdf.tmp").is_none());
        assert!(parse_artifact_name("notes.txt").is_none());
    }

    #[test]
    fn stamps_strictly_increase() {
        let a = next_stamp_millis();
        let b = next_stamp_millis();
        let c = next_stamp_millis();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn empty_explanation_still_renders_title() {
        let renderer = memory_renderer();
        let artifact = renderer.render_report("", "aapl").await.unwrap();

        assert_eq!(artifact.symbol, "AAPL");
        assert!(artifact.identifier.starts_with("report-AAPL-"));
        assert!(artifact.identifier.ends_with(".pdf"));

        let bytes = renderer.retrieve_artifact(&artifact.identifier).await.unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("(Risk Report for AAPL) Tj"));
    }

    #[tokio::test]
    async fn concurrent_reports_get_distinct_identifiers() {
        let renderer = memory_renderer();
        let (a, b) = tokio::join!(
            renderer.render_report("first", "MSFT"),
            renderer.render_report("second", "MSFT"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.identifier, b.identifier);

        let a_bytes = renderer.retrieve_artifact(&a.identifier).await.unwrap();
        let b_bytes = renderer.retrieve_artifact(&b.identifier).await.unwrap();
        assert!(String::from_utf8_lossy(&a_bytes).contains("(first) Tj"));
        assert!(String::from_utf8_lossy(&b_bytes).contains("(second) Tj"));
    }

    #[tokio::test]
    async fn concurrent_reports_on_disk_are_independently_retrievable() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ReportRenderer::new(Arc::new(LocalDirStore::new(dir.path())));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let renderer = renderer.clone();
                tokio::spawn(async move { renderer.render_report(&format!("body {i}"), "NVDA").await })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap().identifier);
        }
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 8);

        for id in &ids {
            assert!(renderer.retrieve_artifact(id).await.is_ok());
        }
    }

    #[tokio::test]
    async fn storage_failure_is_report_write_failed() {
        let renderer = ReportRenderer::new(Arc::new(FailingStore));
        let err = renderer.render_report("text", "AAPL").await.unwrap_err();

        match err {
            PipelineError::ReportWriteFailed { source } => {
                assert!(source.to_string().contains("No space left"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_symbol_is_rejected_before_writing() {
        let renderer = memory_renderer();
        let err = renderer.render_report("text", "").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
        assert!(renderer.store().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn retrieve_distinguishes_malformed_and_missing() {
        let renderer = memory_renderer();
        assert!(matches!(
            renderer.retrieve_artifact("../etc/passwd").await,
            Err(PipelineError::InvalidRequest(_))
        ));
        assert!(matches!(
            renderer.retrieve_artifact("report-AAPL-1.pdf").await,
            Err(PipelineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn prune_removes_only_old_reports() {
        let store = Arc::new(MemoryStore::new());
        let renderer = ReportRenderer::new(store.clone());

        let now = Utc::now();
        let old = artifact_name("AAPL", (now - Duration::days(40)).timestamp_millis());
        let fresh = artifact_name("AAPL", now.timestamp_millis());
        store.put(&old, b"old").await.unwrap();
        store.put(&fresh, b"new").await.unwrap();
        store.put("notes.txt", b"keep").await.unwrap();

        let cutoff = now - Duration::days(30);
        assert_eq!(renderer.prune_before(cutoff, true).await.unwrap(), [old.clone()]);
        assert_eq!(store.list().await.unwrap().len(), 3);

        assert_eq!(renderer.prune_before(cutoff, false).await.unwrap(), [old.clone()]);
        let mut left = store.list().await.unwrap();
        left.sort();
        assert!(!left.contains(&old));
        assert!(left.contains(&fresh));
        assert!(left.contains(&"notes.txt".to_string()));
    }
}
