use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use crate::database_ops::db::Db;
use crate::database_ops::movies::{MovieSink, PgMovieSink, DEFAULT_MOVIES_TABLE};
use crate::database_ops::postgrest::SupabaseRestSink;
use crate::database_ops::tmdb::provider::DEFAULT_TMDB_BASE_URL;
use crate::database_ops::tmdb::TmdbProvider;
use crate::embedding::openai::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use crate::embedding::{Embedder, LocalEmbedder, OpenAiEmbedder, DEFAULT_EMBEDDING_DIM};
use crate::orchestrator::{PipelineOptions, RunSummary, SeedPipeline};
use crate::util::env as env_util;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Supabase PostgREST with the service-role key
    Supabase,
    /// Direct Postgres connection (pgvector)
    Postgres,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderBackend {
    /// In-process sentence-transformer (fastembed)
    Local,
    /// OpenAI-compatible /embeddings endpoint
    #[value(name = "openai")]
    OpenAi,
}

/// Seed the movies table with TMDB top-rated metadata and summary embeddings.
///
/// Every option falls back to an environment variable (`.env` is loaded first),
/// so running with no arguments performs the standard seed.
#[derive(Parser, Debug, Clone)]
#[command(name = "seed_movies", version)]
pub struct SeedArgs {
    /// TMDB v3 API key
    #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
    pub tmdb_api_key: Option<String>,

    /// TMDB v3 API root
    #[arg(long, env = "TMDB_BASE_URL", default_value = DEFAULT_TMDB_BASE_URL)]
    pub tmdb_base_url: String,

    /// Language tag sent with every list request
    #[arg(long, env = "TMDB_LANGUAGE", default_value = "en-US")]
    pub language: String,

    /// Number of top_rated pages to fetch (20 movies per page)
    #[arg(long, env = "TMDB_PAGES", default_value_t = 5)]
    pub pages: u32,

    /// Pause after each page, in milliseconds
    #[arg(long, env = "TMDB_PAGE_DELAY_MS", default_value_t = 200)]
    pub page_delay_ms: u64,

    /// Per-request timeout for every HTTP client, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Where the rows are written
    #[arg(long, env = "MOVIE_STORE", value_enum, default_value_t = StoreBackend::Supabase)]
    pub store: StoreBackend,

    /// Supabase project URL (https://<ref>.supabase.co)
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase service-role key (bypasses RLS for the upsert)
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Postgres DSN for the `postgres` store (falls back to SUPABASE_DB_URL)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Target table, optionally schema-qualified (`public.movies`)
    #[arg(long, env = "MOVIES_TABLE", default_value = DEFAULT_MOVIES_TABLE)]
    pub table: String,

    /// Embedding backend
    #[arg(long, env = "EMBEDDER", value_enum, default_value_t = EmbedderBackend::Local)]
    pub embedder: EmbedderBackend,

    /// Model name; defaults to all-MiniLM-L6-v2 (local) or text-embedding-3-small (openai)
    #[arg(long, env = "EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Root of the OpenAI-compatible API (openai backend only)
    #[arg(long, env = "EMBEDDING_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    pub embedding_base_url: String,

    /// Bearer key for the embeddings API (openai backend only)
    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    pub embedding_api_key: Option<String>,

    /// Vector length expected by the `embedding` column
    #[arg(long, env = "EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIM)]
    pub embedding_dimensions: usize,

    /// Fetch, enrich and embed, but do not write to the store
    #[arg(long, env = "SEED_DRY_RUN")]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    Supabase {
        url: String,
        service_key: String,
        table: String,
    },
    Postgres {
        database_url: String,
        table: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EmbedderConfig {
    Local {
        model: String,
        dimensions: usize,
    },
    OpenAi {
        api_key: String,
        base_url: String,
        model: String,
        dimensions: usize,
    },
}

/// Validated configuration for one run. Secrets only ever come from the
/// command line or the environment.
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub http_timeout: Duration,
    pub pipeline: PipelineOptions,
    /// `None` for a dry run.
    pub store: Option<StoreConfig>,
    pub embedder: EmbedderConfig,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl SeedArgs {
    /// Check required values for the selected backends and build a [`SeedConfig`].
    /// Every missing value is reported in one error.
    pub fn into_config(self) -> Result<SeedConfig> {
        let tmdb_api_key = non_empty(self.tmdb_api_key);
        let supabase_url = non_empty(self.supabase_url);
        let supabase_key = non_empty(self.supabase_key);
        let database_url = non_empty(self.database_url).or_else(env_util::db_url);
        let embedding_api_key = non_empty(self.embedding_api_key);

        let mut required = vec!["TMDB_API_KEY"];
        if !self.dry_run {
            match self.store {
                StoreBackend::Supabase => {
                    required.extend(["SUPABASE_URL", "SUPABASE_SERVICE_ROLE_KEY"])
                }
                StoreBackend::Postgres => required.push("DATABASE_URL"),
            }
        }
        if self.embedder == EmbedderBackend::OpenAi {
            required.push("EMBEDDING_API_KEY");
        }

        let pages = self.pages.to_string();
        let store_label = format!("{:?}", self.store).to_ascii_lowercase();
        let embedder_label = format!("{:?}", self.embedder).to_ascii_lowercase();
        env_util::preflight_check(
            "seed_movies",
            &[
                ("TMDB_API_KEY", tmdb_api_key.as_deref()),
                ("TMDB_BASE_URL", Some(self.tmdb_base_url.as_str())),
                ("TMDB_LANGUAGE", Some(self.language.as_str())),
                ("TMDB_PAGES", Some(pages.as_str())),
                ("MOVIE_STORE", Some(store_label.as_str())),
                ("SUPABASE_URL", supabase_url.as_deref()),
                ("SUPABASE_SERVICE_ROLE_KEY", supabase_key.as_deref()),
                ("DATABASE_URL", database_url.as_deref()),
                ("MOVIES_TABLE", Some(self.table.as_str())),
                ("EMBEDDER", Some(embedder_label.as_str())),
                ("EMBEDDING_API_KEY", embedding_api_key.as_deref()),
            ],
            &required,
        )?;

        anyhow::ensure!(self.pages >= 1, "TMDB_PAGES must be at least 1");
        anyhow::ensure!(
            self.embedding_dimensions >= 1,
            "EMBEDDING_DIMENSIONS must be at least 1"
        );

        let store = if self.dry_run {
            None
        } else {
            Some(match self.store {
                StoreBackend::Supabase => StoreConfig::Supabase {
                    url: supabase_url.unwrap_or_default(),
                    service_key: supabase_key.unwrap_or_default(),
                    table: self.table.clone(),
                },
                StoreBackend::Postgres => StoreConfig::Postgres {
                    database_url: database_url.unwrap_or_default(),
                    table: self.table.clone(),
                },
            })
        };

        let embedder = match self.embedder {
            EmbedderBackend::Local => EmbedderConfig::Local {
                model: self
                    .embedding_model
                    .unwrap_or_else(|| LocalEmbedder::DEFAULT_MODEL.to_string()),
                dimensions: self.embedding_dimensions,
            },
            EmbedderBackend::OpenAi => EmbedderConfig::OpenAi {
                api_key: embedding_api_key.unwrap_or_default(),
                base_url: self.embedding_base_url,
                model: self
                    .embedding_model
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                dimensions: self.embedding_dimensions,
            },
        };

        Ok(SeedConfig {
            tmdb_api_key: tmdb_api_key.unwrap_or_default(),
            tmdb_base_url: self.tmdb_base_url,
            http_timeout: Duration::from_secs(self.http_timeout_secs.max(1)),
            pipeline: PipelineOptions {
                pages: self.pages,
                language: self.language,
                page_delay: Duration::from_millis(self.page_delay_ms),
            },
            store,
            embedder,
        })
    }
}

async fn build_embedder(
    config: &EmbedderConfig,
    timeout: Duration,
) -> Result<Box<dyn Embedder>> {
    match config {
        EmbedderConfig::Local { model, dimensions } => {
            let name = model.clone();
            let embedder = tokio::task::spawn_blocking(move || LocalEmbedder::load(&name))
                .await
                .context("embedding model loader panicked")??;
            anyhow::ensure!(
                embedder.dimension() == Some(*dimensions),
                "model {model} produces {:?}-dimensional vectors but EMBEDDING_DIMENSIONS is {dimensions}",
                embedder.dimension()
            );
            Ok(Box::new(embedder))
        }
        EmbedderConfig::OpenAi {
            api_key,
            base_url,
            model,
            dimensions,
        } => Ok(Box::new(OpenAiEmbedder::new(
            api_key,
            base_url,
            model,
            Some(*dimensions),
            timeout,
        )?)),
    }
}

async fn build_sink(config: &StoreConfig, timeout: Duration) -> Result<Box<dyn MovieSink>> {
    match config {
        StoreConfig::Supabase {
            url,
            service_key,
            table,
        } => Ok(Box::new(SupabaseRestSink::new(url, service_key, table, timeout)?)),
        StoreConfig::Postgres {
            database_url,
            table,
        } => {
            let db = Db::connect(database_url, 1).await?;
            Ok(Box::new(PgMovieSink::new(db, table)?))
        }
    }
}

/// Full seed: acquire the model and the store first so a bad setup fails
/// before any TMDB request, then run the pipeline.
pub async fn run(args: SeedArgs) -> Result<RunSummary> {
    let config = args.into_config()?;

    let embedder = build_embedder(&config.embedder, config.http_timeout).await?;
    info!(model = embedder.model_name(), "embedder ready");

    let sink = match &config.store {
        Some(store) => {
            let sink = build_sink(store, config.http_timeout).await?;
            info!(backend = sink.name(), "store ready");
            Some(sink)
        }
        None => None,
    };

    let catalog = TmdbProvider::new(
        config.tmdb_api_key.clone(),
        Some(&config.tmdb_base_url),
        config.http_timeout,
    )?;

    SeedPipeline::new(
        &catalog,
        embedder.as_ref(),
        sink.as_deref(),
        config.pipeline.clone(),
    )
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use wiremock::matchers::any;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn args() -> SeedArgs {
        SeedArgs {
            tmdb_api_key: Some("tmdb".into()),
            tmdb_base_url: DEFAULT_TMDB_BASE_URL.into(),
            language: "en-US".into(),
            pages: 5,
            page_delay_ms: 200,
            http_timeout_secs: 30,
            store: StoreBackend::Supabase,
            supabase_url: Some("https://x.supabase.co".into()),
            supabase_key: Some("service".into()),
            database_url: Some("postgres://u:p@localhost/db".into()),
            table: "movies".into(),
            embedder: EmbedderBackend::Local,
            embedding_model: None,
            embedding_base_url: DEFAULT_OPENAI_BASE_URL.into(),
            embedding_api_key: None,
            embedding_dimensions: 384,
            dry_run: false,
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        SeedArgs::command().debug_assert();
    }

    #[test]
    fn defaults_match_reference_run() {
        let config = args().into_config().unwrap();
        assert_eq!(config.pipeline.pages, 5);
        assert_eq!(config.pipeline.language, "en-US");
        assert_eq!(config.pipeline.page_delay, Duration::from_millis(200));
        assert_eq!(
            config.embedder,
            EmbedderConfig::Local {
                model: "all-MiniLM-L6-v2".into(),
                dimensions: 384
            }
        );
        assert_eq!(
            config.store,
            Some(StoreConfig::Supabase {
                url: "https://x.supabase.co".into(),
                service_key: "service".into(),
                table: "movies".into(),
            })
        );
    }

    #[test]
    fn missing_tmdb_key_fails_closed() {
        let err = SeedArgs {
            tmdb_api_key: Some("   ".into()),
            ..args()
        }
        .into_config()
        .unwrap_err()
        .to_string();
        assert!(err.contains("TMDB_API_KEY"), "{err}");
    }

    #[test]
    fn missing_store_credentials_are_listed_together() {
        let err = SeedArgs {
            supabase_url: None,
            supabase_key: None,
            ..args()
        }
        .into_config()
        .unwrap_err()
        .to_string();
        assert!(err.contains("SUPABASE_URL"), "{err}");
        assert!(err.contains("SUPABASE_SERVICE_ROLE_KEY"), "{err}");
    }

    #[test]
    fn dry_run_needs_no_store() {
        let config = SeedArgs {
            supabase_url: None,
            supabase_key: None,
            dry_run: true,
            ..args()
        }
        .into_config()
        .unwrap();
        assert!(config.store.is_none());
    }

    #[test]
    fn postgres_backend_uses_dsn() {
        let config = SeedArgs {
            store: StoreBackend::Postgres,
            supabase_url: None,
            supabase_key: None,
            table: "public.movies".into(),
            ..args()
        }
        .into_config()
        .unwrap();
        assert_eq!(
            config.store,
            Some(StoreConfig::Postgres {
                database_url: "postgres://u:p@localhost/db".into(),
                table: "public.movies".into(),
            })
        );
    }

    #[test]
    fn openai_backend_requires_key() {
        let err = SeedArgs {
            embedder: EmbedderBackend::OpenAi,
            ..args()
        }
        .into_config()
        .unwrap_err()
        .to_string();
        assert!(err.contains("EMBEDDING_API_KEY"), "{err}");

        let config = SeedArgs {
            embedder: EmbedderBackend::OpenAi,
            embedding_api_key: Some("sk".into()),
            ..args()
        }
        .into_config()
        .unwrap();
        assert_eq!(
            config.embedder,
            EmbedderConfig::OpenAi {
                api_key: "sk".into(),
                base_url: DEFAULT_OPENAI_BASE_URL.into(),
                model: DEFAULT_OPENAI_MODEL.into(),
                dimensions: 384,
            }
        );
    }

    #[tokio::test]
    async fn unknown_model_fails_before_any_tmdb_request() {
        let tmdb = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&tmdb)
            .await;

        let result = run(SeedArgs {
            tmdb_base_url: tmdb.uri(),
            embedding_model: Some("word2vec".into()),
            ..args()
        })
        .await;

        let err = format!("{:#}", result.unwrap_err());
        assert!(err.contains("word2vec"), "{err}");
        tmdb.verify().await;
    }

    #[tokio::test]
    async fn bad_store_url_fails_before_any_tmdb_request() {
        let tmdb = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&tmdb)
            .await;

        let result = run(SeedArgs {
            tmdb_base_url: tmdb.uri(),
            embedder: EmbedderBackend::OpenAi,
            embedding_api_key: Some("sk".into()),
            embedding_base_url: tmdb.uri(),
            supabase_url: Some("ftp://x".into()),
            ..args()
        })
        .await;

        let err = format!("{:#}", result.unwrap_err());
        assert!(err.contains("http(s)"), "{err}");
        tmdb.verify().await;
    }

    #[test]
    fn zero_pages_is_rejected() {
        assert!(SeedArgs { pages: 0, ..args() }.into_config().is_err());
    }
}
