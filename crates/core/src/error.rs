/// Failures that leave the pipeline and reach a caller.
///
/// Narrative generation has no variant here: its failures are absorbed into a
/// fallback narrative (see [`crate::narrative`]).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// An upstream market-data lookup failed or returned malformed data.
    #[error("market data unavailable for {symbol}")]
    DataUnavailable {
        symbol: String,
        #[source]
        source: anyhow::Error,
    },

    /// Required input was missing or malformed; no external call was made.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Writing a report artifact failed; nothing was published.
    #[error("failed to write report: {source}")]
    ReportWriteFailed {
        #[source]
        source: anyhow::Error,
    },

    #[error("not found: {0}")]
    NotFound(String),
}

impl PipelineError {
    pub fn data_unavailable(symbol: impl Into<String>, source: anyhow::Error) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            source,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Short machine-readable kind, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataUnavailable { .. } => "data_unavailable",
            Self::InvalidRequest(_) => "invalid_request",
            Self::ReportWriteFailed { .. } => "report_write_failed",
            Self::NotFound(_) => "not_found",
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
