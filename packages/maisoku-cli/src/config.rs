use anyhow::{Context, Result};
use dotenvy::dotenv;
use maisoku::PipelineConfig;
use std::env;
use std::time::Duration;

/// CLI configuration loaded from environment variables
#[derive(Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub notion_api_token: Option<String>,
    pub notion_database_id: Option<String>,
    pub file_concurrency: usize,
    pub call_delay: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("notion_api_token", &self.notion_api_token.as_ref().map(|_| "[REDACTED]"))
            .field("notion_database_id", &self.notion_database_id)
            .field("file_concurrency", &self.file_concurrency)
            .field("call_delay", &self.call_delay)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            notion_api_token: env::var("NOTION_API_TOKEN").ok(),
            notion_database_id: env::var("NOTION_DATABASE_ID").ok(),
            file_concurrency: env::var("MAISOKU_FILE_CONCURRENCY")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("MAISOKU_FILE_CONCURRENCY must be a valid number")?,
            call_delay: Duration::from_millis(
                env::var("MAISOKU_CALL_DELAY_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .context("MAISOKU_CALL_DELAY_MS must be a valid number")?,
            ),
        })
    }

    /// Pipeline settings derived from the environment
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_file_concurrency(self.file_concurrency)
            .with_call_delay(self.call_delay)
    }
}
