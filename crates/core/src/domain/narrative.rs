use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input for one risk narrative. Built by the client from a prior snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskNarrativeRequest {
    pub symbol: String,
    #[serde(default)]
    pub metrics: Map<String, Value>,
    #[serde(default)]
    pub industry: Option<String>,
}

/// A generated narrative and its cleaned form.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskNarrative {
    /// Whatever the text service returned: a string, a structured object, or null.
    pub raw_text: Value,
    pub sanitized_text: String,
}

/// Result of narrative generation. Both arms are a successful answer to the
/// caller; only `Generated` came from the text service.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrativeOutcome {
    Generated(RiskNarrative),
    Fallback(String),
}

impl NarrativeOutcome {
    pub fn explanation(&self) -> &str {
        match self {
            Self::Generated(n) => &n.sanitized_text,
            Self::Fallback(text) => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn into_explanation(self) -> String {
        match self {
            Self::Generated(n) => n.sanitized_text,
            Self::Fallback(text) => text,
        }
    }
}
