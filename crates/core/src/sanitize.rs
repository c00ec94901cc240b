//! Cleanup of generated risk narratives.
//!
//! Models like to wrap their answer in disclaimers, "important note" footers
//! and filler examples about unrelated companies. [`sanitize`] strips those with
//! a fixed, ordered list of [`CleaningRule`]s and normalizes blank lines.
//!
//! The pipeline is pure and idempotent: `sanitize_text(&sanitize_text(t)) ==
//! sanitize_text(t)` for every `t`. Line-anchored rules accept leading
//! whitespace so the final trim cannot expose a new match.

use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::LazyLock;

#[derive(Debug)]
enum RuleKind {
    Remove(Regex),
    Replace(Regex, &'static str),
    Trim,
}

/// One named step of the cleaning pipeline.
#[derive(Debug)]
pub struct CleaningRule {
    pub name: &'static str,
    kind: RuleKind,
}

impl CleaningRule {
    fn remove(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            kind: RuleKind::Remove(compile(pattern)),
        }
    }

    fn replace(name: &'static str, pattern: &str, with: &'static str) -> Self {
        Self {
            name,
            kind: RuleKind::Replace(compile(pattern), with),
        }
    }

    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match &self.kind {
            RuleKind::Remove(re) => re.replace_all(text, ""),
            RuleKind::Replace(re, with) => re.replace_all(text, *with),
            RuleKind::Trim => Cow::Borrowed(text.trim()),
        }
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in cleaning pattern {pattern:?}: {e}"))
}

static RULES: LazyLock<Vec<CleaningRule>> = LazyLock::new(|| {
    vec![
        CleaningRule::remove(
            "stop_marker_disclaimer",
            r"(?im)^[^\S\n]*🛑[^\n]*?disclaimer[^\n]*(?:\n|\z)",
        ),
        CleaningRule::remove(
            "hypothetical_company_filler",
            r"(?im)^[^\S\n]*let[^\n]*?(?:google|apple|company)[^\n]*(?:\n|\z)",
        ),
        CleaningRule::remove(
            "important_note_line",
            r"(?im)^[^\S\n]*(?:important note|important:|disclaimer)[^\n]*(?:\n|\z)",
        ),
        CleaningRule::remove(
            "trailing_important_note_section",
            r"(?is)\*\*important note:\*\*.*\z",
        ),
        CleaningRule::replace("collapse_blank_lines", r"\n(?:[^\S\n]*\n)+", "\n\n"),
        CleaningRule {
            name: "trim",
            kind: RuleKind::Trim,
        },
    ]
});

/// The cleaning rules in the order [`sanitize_text`] applies them.
pub fn rules() -> &'static [CleaningRule] {
    &RULES
}

/// Renders a raw narrative as text: strings as-is, objects and arrays as
/// pretty-printed JSON, null as empty, scalars in their JSON form.
pub fn coerce(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string())
        }
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
    }
}

fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

pub fn sanitize(raw: &Value) -> String {
    sanitize_text(&coerce(raw))
}

pub fn sanitize_text(text: &str) -> String {
    let mut out = normalize_line_endings(text).into_owned();
    for rule in rules() {
        out = rule.apply(&out).into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn rule(name: &str) -> &'static CleaningRule {
        rules().iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn rules_run_in_documented_order() {
        let names: Vec<_> = rules().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            [
                "stop_marker_disclaimer",
                "hypothetical_company_filler",
                "important_note_line",
                "trailing_important_note_section",
                "collapse_blank_lines",
                "trim",
            ]
        );
    }

    #[test]
    fn strips_stop_marker_disclaimer_line() {
        let raw = json!("🛑 Disclaimer: not advice\nReal content here.");
        assert_eq!(sanitize(&raw), "Real content here.");
    }

    #[test]
    fn stop_marker_without_disclaimer_is_kept() {
        let r = rule("stop_marker_disclaimer");
        assert_eq!(r.apply("🛑 Stop-loss orders help.\n"), "🛑 Stop-loss orders help.\n");
    }

    #[test]
    fn strips_hypothetical_company_filler() {
        let r = rule("hypothetical_company_filler");
        assert_eq!(
            r.apply("Beta is 1.8.\nLet's imagine Apple did this.\nDiversify.\n"),
            "Beta is 1.8.\nDiversify.\n"
        );
        assert_eq!(
            r.apply("Let me explain the basics.\n"),
            "Let me explain the basics.\n"
        );
    }

    #[test]
    fn strips_important_note_and_disclaimer_lines() {
        let r = rule("important_note_line");
        let text = "Risk one.\nImportant: do research\nIMPORTANT NOTE - past results\nDisclaimer text\nRisk two.";
        assert_eq!(r.apply(text), "Risk one.\nRisk two.");
    }

    #[test]
    fn strips_trailing_bold_important_note_section() {
        let r = rule("trailing_important_note_section");
        let text = "Body.\n\n**Important Note:** I am not a financial advisor.\nMore footer.\n";
        assert_eq!(r.apply(text), "Body.\n\n");
    }

    #[test]
    fn collapses_runs_of_blank_lines() {
        let raw = json!("a\n\n\n\nb\n \n\t\nc\n\nd");
        assert_eq!(sanitize(&raw), "a\n\nb\n\nc\n\nd");
    }

    #[test]
    fn leaves_clean_text_unchanged() {
        let text = "1. Beta of 1.4 means swings.\n\n2. Diversify across sectors.";
        assert_eq!(sanitize_text(text), text);
    }

    #[test]
    fn indented_filler_is_removed_in_one_pass() {
        let text = "   let's say Google stumbles\nReal point.";
        assert_eq!(sanitize_text(text), "Real point.");
    }

    #[test]
    fn normalizes_crlf_before_cleaning() {
        let raw = json!("Disclaimer: x\r\nKeep\r\n\r\n\r\nThis");
        assert_eq!(sanitize(&raw), "Keep\n\nThis");
    }

    #[test]
    fn coerces_non_text_inputs() {
        assert_eq!(sanitize(&Value::Null), "");
        assert_eq!(sanitize(&json!(42)), "42");
        assert_eq!(sanitize(&json!(true)), "true");
        assert_eq!(
            sanitize(&json!({"risk": "high"})),
            "{\n  \"risk\": \"high\"\n}"
        );
        assert_eq!(sanitize(&json!(["a"])), "[\n  \"a\"\n]");
    }

    fn narrative_line() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("🛑 Disclaimer: not advice".to_string()),
            Just("Let's pretend Google failed".to_string()),
            Just("  let the company grow".to_string()),
            Just("Important: read this".to_string()),
            Just("important note".to_string()),
            Just("**Important Note:** footer".to_string()),
            Just("DISCLAIMER".to_string()),
            Just(String::new()),
            Just(" \t".to_string()),
            "[a-zA-Z0-9 .,:*]{0,24}",
        ]
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent_on_narratives(
            lines in prop::collection::vec(narrative_line(), 0..16),
            crlf in any::<bool>(),
        ) {
            let sep = if crlf { "\r\n" } else { "\n" };
            let once = sanitize(&Value::String(lines.join(sep)));
            prop_assert_eq!(sanitize_text(&once), once);
        }

        #[test]
        fn sanitize_is_idempotent_on_arbitrary_text(text in "\\PC*") {
            let once = sanitize(&Value::String(text));
            prop_assert_eq!(sanitize_text(&once), once);
        }
    }
}
