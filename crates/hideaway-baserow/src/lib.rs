use anyhow::{anyhow, bail, Context, Result};
use hideaway_config::BaserowConfig;
use reqwest::{header::AUTHORIZATION, Client, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

const MIN_TIMEOUT_SECONDS: f64 = 1.0;
const MAX_TIMEOUT_SECONDS: f64 = 3600.0;

/// Request timeout clamped to a range `Duration` can hold. Non-finite values
/// fall back to the ceiling.
fn request_timeout(seconds: f64) -> Duration {
    let seconds = if seconds.is_finite() {
        seconds.clamp(MIN_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS)
    } else {
        MAX_TIMEOUT_SECONDS
    };
    Duration::from_secs_f64(seconds)
}

/// Thin client for the Baserow row listing endpoint.
#[derive(Clone)]
pub struct BaserowClient {
    cfg: BaserowConfig,
    http: Client,
    token: String,
}

/// One page of the `list rows` response. Only `results` feeds the pipeline;
/// `count` and `next` are kept for logging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RowPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<Map<String, Value>>,
}

impl RowPage {
    pub fn has_more(&self) -> bool {
        self.next.as_deref().is_some_and(|next| !next.is_empty())
    }
}

impl BaserowClient {
    pub fn new(cfg: BaserowConfig, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            bail!("baserow token must not be empty");
        }

        let http = Client::builder()
            .timeout(request_timeout(cfg.timeout_seconds))
            .build()
            .context("failed to construct reqwest client")?;

        Ok(Self { cfg, http, token })
    }

    /// Builds a client whose token comes from the env var named by
    /// `cfg.token_env`.
    pub fn from_env(cfg: BaserowConfig) -> Result<Self> {
        let token = std::env::var(&cfg.token_env)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("environment variable {} is not set", cfg.token_env))?;
        Self::new(cfg, token)
    }

    fn rows_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.cfg.table_url).context("invalid Baserow table URL")?;
        url.query_pairs_mut().append_pair("user_field_names", "true");
        Ok(url)
    }

    pub async fn request_text(&self, url: Url) -> Result<String> {
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .send()
            .await
            .context("baserow request failed")?;
        let status = response.status();
        let text = response.text().await.with_context(|| {
            format!("failed to read baserow response body (status {})", status)
        })?;

        if !status.is_success() {
            return Err(anyhow!(
                "baserow returned {}: {}",
                status,
                truncate_for_error(&text)
            ));
        }

        Ok(text)
    }

    /// Fetches the first page of rows with human-readable field names.
    pub async fn list_rows(&self) -> Result<RowPage> {
        let url = self.rows_url()?;
        let raw = self.request_text(url).await?;
        serde_json::from_str::<RowPage>(&raw).with_context(|| {
            format!(
                "invalid baserow rows response: {}",
                truncate_for_error(&raw)
            )
        })
    }
}

fn truncate_for_error(body: &str) -> String {
    const LIMIT: usize = 240;
    let compact = body.split_whitespace().collect::<Vec<_>>().join(" ");
    match compact.char_indices().nth(LIMIT) {
        None => compact,
        Some((cut, _)) => format!("{}...", &compact[..cut]),
    }
}
