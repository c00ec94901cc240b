pub mod domain;
pub mod error;
pub mod llm;
pub mod market;
pub mod narrative;
pub mod report;
pub mod sanitize;
pub mod storage;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub finnhub_api_key: Option<String>,
        pub finnhub_base_url: Option<String>,
        pub narrative_provider: Option<String>,
        pub gemini_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub report_dir: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                finnhub_api_key: std::env::var("FINNHUB_API_KEY").ok(),
                finnhub_base_url: std::env::var("FINNHUB_BASE_URL").ok(),
                narrative_provider: std::env::var("NARRATIVE_PROVIDER").ok(),
                gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                report_dir: std::env::var("REPORT_DIR").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_finnhub_api_key(&self) -> anyhow::Result<&str> {
            self.finnhub_api_key
                .as_deref()
                .context("FINNHUB_API_KEY is required")
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn report_dir(&self) -> &str {
            self.report_dir
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("./reports")
        }
    }

}
