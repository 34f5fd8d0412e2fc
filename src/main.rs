use anyhow::Result;
use clap::Parser;
use movie_seed::cli::seed::{self, SeedArgs};
use movie_seed::tracing::{init_tracing, DEFAULT_FILTER};
use movie_seed::util::env as env_util;
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads env-backed arguments.
    env_util::init_env();
    init_tracing(DEFAULT_FILTER)?;

    let args = SeedArgs::parse();
    let summary = seed::run(args).await?;

    if summary.pagination_aborted {
        warn!(
            pages_fetched = summary.pages_fetched,
            "pagination stopped early; seeded a partial catalog"
        );
    }
    if summary.upload_failures > 0 {
        warn!(
            failed = summary.upload_failures,
            uploaded = summary.uploaded,
            "some movies were not uploaded"
        );
    }
    info!(
        movies = summary.movies_collected,
        uploaded = summary.uploaded,
        "database populated"
    );
    Ok(())
}
