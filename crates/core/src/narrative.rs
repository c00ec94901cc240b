use crate::domain::narrative::{NarrativeOutcome, RiskNarrative, RiskNarrativeRequest};
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{prompt, TextGenerator};
use crate::sanitize;

/// Shown in place of a narrative when the text service fails.
pub const FALLBACK_NARRATIVE: &str = "AI explanation unavailable. Please try again later.";

/// Sends exactly one prompt to the text service and sanitizes the answer.
///
/// Never fails: any service error, or an answer with nothing left after
/// sanitization, becomes [`NarrativeOutcome::Fallback`].
pub async fn generate_risk_narrative(
    generator: &dyn TextGenerator,
    req: &RiskNarrativeRequest,
) -> NarrativeOutcome {
    let input = prompt::risk_narrative_prompt(req);
    let provider = generator.provider().as_str();

    let raw_text = match generator.generate_text(&input).await {
        Ok(raw) => raw,
        Err(err) => {
            if let Some(diag) = err.downcast_ref::<LlmDiagnosticsError>() {
                tracing::warn!(
                    symbol = %req.symbol,
                    provider,
                    stage = diag.stage,
                    error = %err,
                    "narrative generation failed; using fallback"
                );
            } else {
                tracing::warn!(
                    symbol = %req.symbol,
                    provider,
                    error = %format!("{err:#}"),
                    "narrative generation failed; using fallback"
                );
            }
            return NarrativeOutcome::Fallback(FALLBACK_NARRATIVE.to_string());
        }
    };

    let sanitized_text = sanitize::sanitize(&raw_text);
    if sanitized_text.is_empty() {
        tracing::warn!(symbol = %req.symbol, provider, "narrative empty after sanitization; using fallback");
        return NarrativeOutcome::Fallback(FALLBACK_NARRATIVE.to_string());
    }

    tracing::info!(symbol = %req.symbol, provider, chars = sanitized_text.len(), "narrative generated");
    NarrativeOutcome::Generated(RiskNarrative {
        raw_text,
        sanitized_text,
    })
}
