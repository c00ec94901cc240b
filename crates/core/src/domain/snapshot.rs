use crate::error::{PipelineError, PipelineResult};
use anyhow::{ensure, Context};
use serde::Serialize;
use serde_json::{Map, Value};

const MAX_SYMBOL_LEN: usize = 20;

/// Trims and uppercases a ticker, rejecting anything that could not appear in a
/// report file name.
pub fn normalize_symbol(raw: &str) -> PipelineResult<String> {
    let symbol = raw.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(PipelineError::invalid("symbol is required"));
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(PipelineError::invalid(format!(
            "symbol must be at most {MAX_SYMBOL_LEN} characters"
        )));
    }
    if !symbol
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(PipelineError::invalid(format!(
            "symbol contains unsupported characters: {symbol}"
        )));
    }
    Ok(symbol)
}

/// Point-in-time aggregation of one ticker. Built per request, never cached.
///
/// Serializes as the profile fields at the top level, plus `symbol` and a
/// nested `metrics` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanySnapshot {
    pub symbol: String,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
    pub metrics: Map<String, Value>,
}

impl CompanySnapshot {
    /// `symbol` and `metrics` are reserved top-level keys; a profile field with
    /// either name is dropped.
    pub fn merge(symbol: String, mut profile: Map<String, Value>, metrics: Map<String, Value>) -> Self {
        profile.remove("symbol");
        profile.remove("metrics");
        Self {
            symbol,
            profile,
            metrics,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.profile.get("name").and_then(Value::as_str)
    }

    pub fn industry(&self) -> Option<&str> {
        self.profile
            .get("finnhubIndustry")
            .or_else(|| self.profile.get("industry"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Four-point intraday quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quote {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub current: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuotePoint {
    pub label: &'static str,
    pub value: f64,
}

impl Quote {
    /// Reads the provider's `{o, h, l, c}` quote object. Every field must be a
    /// JSON number.
    pub fn from_provider_json(raw: &Value) -> anyhow::Result<Self> {
        let obj = raw
            .as_object()
            .context("quote response is not a JSON object")?;

        let field = |key: &str| -> anyhow::Result<f64> {
            let v = obj
                .get(key)
                .with_context(|| format!("quote field `{key}` is missing"))?;
            let n = v
                .as_f64()
                .with_context(|| format!("quote field `{key}` is not numeric: {v}"))?;
            ensure!(n.is_finite(), "quote field `{key}` is not finite");
            Ok(n)
        };

        Ok(Self {
            open: field("o")?,
            high: field("h")?,
            low: field("l")?,
            current: field("c")?,
        })
    }

    /// Chart series in fixed order: Open, High, Low, Current.
    pub fn chart(&self) -> [QuotePoint; 4] {
        [
            QuotePoint {
                label: "Open",
                value: self.open,
            },
            QuotePoint {
                label: "High",
                value: self.high,
            },
            QuotePoint {
                label: "Low",
                value: self.low,
            },
            QuotePoint {
                label: "Current",
                value: self.current,
            },
        ]
    }
}
