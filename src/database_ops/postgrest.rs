use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::instrument;

use crate::database_ops::movies::MovieSink;
use crate::database_ops::tmdb::provider::truncate_for_log;
use crate::normalization::movie::MovieRecord;

const CONFLICT_TARGET: &str = "tmdb_id";

/// Supabase backend: upserts through the project's PostgREST endpoint with
/// the service-role key.
///
/// POST {project}/rest/v1/{table}?on_conflict=tmdb_id
/// Prefer: resolution=merge-duplicates,return=minimal
#[derive(Debug, Clone)]
pub struct SupabaseRestSink {
    http: Client,
    endpoint: String,
}

impl SupabaseRestSink {
    pub fn new(
        project_url: &str,
        service_key: &str,
        table: &str,
        timeout: Duration,
    ) -> Result<Self> {
        anyhow::ensure!(!service_key.trim().is_empty(), "missing Supabase service-role key");
        anyhow::ensure!(!table.trim().is_empty(), "table name is required");
        let base = url::Url::parse(project_url.trim())
            .with_context(|| format!("invalid Supabase URL {project_url:?}"))?;
        anyhow::ensure!(
            matches!(base.scheme(), "http" | "https"),
            "Supabase URL must be http(s), got {}",
            base.scheme()
        );
        let endpoint = format!(
            "{}/rest/v1/{}",
            base.as_str().trim_end_matches('/'),
            table.trim()
        );

        let key = service_key.trim();
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(key).context("invalid Supabase service-role key")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))
                .context("invalid Supabase service-role key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=minimal"),
        );
        let http = Client::builder()
            .user_agent("movie-seed/0.1")
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Supabase HTTP client")?;
        Ok(Self { http, endpoint })
    }
}

#[async_trait::async_trait]
impl MovieSink for SupabaseRestSink {
    fn name(&self) -> &'static str {
        "supabase"
    }

    #[instrument(skip(self, record), fields(tmdb_id = record.external_id))]
    async fn upsert(&self, record: &MovieRecord) -> Result<()> {
        let resp = self
            .http
            .post(&self.endpoint)
            .query(&[("on_conflict", CONFLICT_TARGET)])
            .json(&record.row())
            .send()
            .await
            .context("Supabase upsert request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), 1000);
            return Err(anyhow!("Supabase upsert failed: {status} {body}"));
        }
        Ok(())
    }
}
