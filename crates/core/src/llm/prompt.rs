use crate::domain::narrative::RiskNarrativeRequest;
use crate::llm::GenerateInput;
use serde_json::{Map, Value};

const BETA_KEYS: &[&str] = &["beta"];
const DEBT_TO_EQUITY_KEYS: &[&str] = &[
    "debtToEquity",
    "totalDebt/totalEquityAnnual",
    "totalDebt/totalEquityQuarterly",
];
const REVENUE_GROWTH_KEYS: &[&str] = &[
    "revenueGrowth",
    "revenueGrowthTTMYoy",
    "revenueGrowthQuarterlyYoy",
];

const UNKNOWN_INDUSTRY: &str = "Unknown";
const MISSING_METRIC: &str = "n/a";

fn system_prompt() -> String {
    [
        "You are a financial advisor AI writing for beginner investors.",
        "Use plain language and avoid jargon; briefly explain any term you cannot avoid.",
        "Do not add disclaimers or hypothetical examples about other companies.",
    ]
    .join("\n")
}

fn user_prompt(req: &RiskNarrativeRequest) -> String {
    let industry = req
        .industry
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_INDUSTRY);

    format!(
        "Analyze this company:\n\n\
- Symbol: {symbol}\n\
- Beta (volatility): {beta}\n\
- Debt/Equity ratio: {de}\n\
- Revenue growth: {growth}\n\
- Industry: {industry}\n\n\
1. Explain in simple terms why this company may be risky, referring to the beta, \
debt/equity ratio, revenue growth and industry above.\n\
2. Suggest 2-3 concrete actions an investor could take to reduce that risk.\n\
3. Keep it beginner-friendly and avoid jargon.",
        symbol = req.symbol.trim().to_ascii_uppercase(),
        beta = metric_display(&req.metrics, BETA_KEYS),
        de = metric_display(&req.metrics, DEBT_TO_EQUITY_KEYS),
        growth = metric_display(&req.metrics, REVENUE_GROWTH_KEYS),
    )
}

/// First present, non-null value among `keys`, in order.
fn metric_display(metrics: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| metrics.get(*k))
        .find(|v| !v.is_null())
        .map(|v| match v {
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() != 0.0 => format!("{f:.2}"),
                _ => n.to_string(),
            },
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| MISSING_METRIC.to_string())
}

pub fn risk_narrative_prompt(req: &RiskNarrativeRequest) -> GenerateInput {
    GenerateInput {
        system: Some(system_prompt()),
        user: user_prompt(req),
    }
}
