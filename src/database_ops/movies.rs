//! Keyed upsert of movie rows into the `movies` table.

use anyhow::{Context, Result};
use tracing::instrument;

use crate::database_ops::db::Db;
use crate::normalization::movie::MovieRecord;

pub const DEFAULT_MOVIES_TABLE: &str = "movies";

/// Upsert-capable keyed store. `tmdb_id` is the conflict target: absent rows
/// are inserted, present rows have every column overwritten.
#[async_trait::async_trait]
pub trait MovieSink: Send + Sync {
    /// Short backend label for logs.
    fn name(&self) -> &'static str;

    async fn upsert(&self, record: &MovieRecord) -> Result<()>;
}

/// Quotes Postgres identifiers, escaping embedded quotes.
pub fn quote_ident(input: &str) -> String {
    let escaped = input.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// `schema.table` or `table`, each part quoted.
pub fn qualified_table(table: &str) -> Result<String> {
    anyhow::ensure!(!table.trim().is_empty(), "table name is required");
    Ok(table
        .split('.')
        .map(|part| quote_ident(part.trim()))
        .collect::<Vec<_>>()
        .join("."))
}

/// pgvector text literal: `[0.1,0.2,...]`.
pub fn vector_literal(values: &[f32]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

fn upsert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {table} \
         (tmdb_id, title, overview, poster_path, vote_average, genres, director, cast_members, embedding) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::vector) \
         ON CONFLICT (tmdb_id) DO UPDATE SET \
         title = EXCLUDED.title, \
         overview = EXCLUDED.overview, \
         poster_path = EXCLUDED.poster_path, \
         vote_average = EXCLUDED.vote_average, \
         genres = EXCLUDED.genres, \
         director = EXCLUDED.director, \
         cast_members = EXCLUDED.cast_members, \
         embedding = EXCLUDED.embedding"
    )
}

/// Direct Postgres backend (pgvector column for `embedding`).
pub struct PgMovieSink {
    db: Db,
    sql: String,
}

impl PgMovieSink {
    pub fn new(db: Db, table: &str) -> Result<Self> {
        let table = qualified_table(table)?;
        Ok(Self {
            db,
            sql: upsert_sql(&table),
        })
    }
}

#[async_trait::async_trait]
impl MovieSink for PgMovieSink {
    fn name(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self, record), fields(tmdb_id = record.external_id))]
    async fn upsert(&self, record: &MovieRecord) -> Result<()> {
        sqlx::query(&self.sql)
            .persistent(false)
            .bind(record.external_id)
            .bind(&record.title)
            .bind(&record.overview)
            .bind(record.poster_path.as_deref())
            .bind(record.rating)
            .bind(&record.genre_ids)
            .bind(&record.director)
            .bind(&record.cast_members)
            .bind(vector_literal(&record.embedding))
            .execute(&self.db.pool)
            .await
            .with_context(|| format!("upsert of tmdb_id {} failed", record.external_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("movies"), "\"movies\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(qualified_table("public.movies").unwrap(), "\"public\".\"movies\"");
        assert!(qualified_table(" ").is_err());
    }

    #[test]
    fn vector_literal_format() {
        assert_eq!(vector_literal(&[0.5, -1.0, 0.25]), "[0.5,-1,0.25]");
        assert_eq!(vector_literal(&[]), "[]");
    }

    #[test]
    fn upsert_targets_tmdb_id_and_overwrites_all_columns() {
        let sql = upsert_sql("\"movies\"");
        assert!(sql.contains("ON CONFLICT (tmdb_id) DO UPDATE"));
        for column in [
            "title",
            "overview",
            "poster_path",
            "vote_average",
            "genres",
            "director",
            "cast_members",
            "embedding",
        ] {
            assert!(
                sql.contains(&format!("{column} = EXCLUDED.{column}")),
                "missing overwrite for {column}"
            );
        }
        assert!(!sql.contains("summary_text"));
    }
}
