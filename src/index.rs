//! Freshness-scoped index: build, swap, read.
//!
//! The index directory holds one SQLite database describing exactly one
//! report, the most recently indexed one. Rebuilds write into a sibling
//! staging directory and rename it over the canonical path only after the
//! database is fully persisted, so a reader always sees either the previous
//! complete index or the new one, never a half-written mixture. A failed
//! build leaves the previous index untouched.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{info, warn};

use crate::chunk::split_text;
use crate::config::Config;
use crate::embedding;
use crate::error::PipelineError;
use crate::models::Report;

pub const INDEX_DB_FILE: &str = "index.sqlite";

/// What a completed rebuild produced.
#[derive(Debug)]
pub struct IndexSummary {
    pub chunk_count: usize,
    pub embedding_model: String,
}

/// Metadata row describing the indexed report.
#[derive(Debug, Clone)]
pub struct IndexMeta {
    pub detail_url: String,
    pub attachment_url: String,
    pub text_sha256: String,
    pub embedding_model: String,
    pub embedding_dims: i64,
    pub chunk_count: i64,
    pub indexed_at: i64,
}

/// Rebuild the index from the report, replacing any previous generation.
pub async fn rebuild_index(config: &Config, report: &Report) -> Result<IndexSummary, PipelineError> {
    build_and_swap(config, report)
        .await
        .map_err(|e| PipelineError::IndexBuild(format!("{:#}", e)))
}

async fn build_and_swap(config: &Config, report: &Report) -> Result<IndexSummary> {
    let canonical = &config.index.dir;
    let staging = sibling_dir(canonical, "staging");
    let retired = sibling_dir(canonical, "old");

    // Leftovers from a crashed run
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    if retired.exists() {
        std::fs::remove_dir_all(&retired)?;
    }
    if let Some(parent) = canonical.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&staging)?;

    let summary = match write_index(config, report, &staging).await {
        Ok(summary) => summary,
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_dir_all(&staging) {
                warn!(error = %cleanup, "failed to remove staging dir after build error");
            }
            return Err(e);
        }
    };

    // Swap: the previous generation stays readable until the new one is
    // complete, then gets retired in one rename each way.
    if canonical.exists() {
        std::fs::rename(canonical, &retired)
            .with_context(|| "failed to retire previous index")?;
    }
    if let Err(e) = std::fs::rename(&staging, canonical) {
        // Put the previous generation back before surfacing the error.
        if retired.exists() {
            let _ = std::fs::rename(&retired, canonical);
        }
        let _ = std::fs::remove_dir_all(&staging);
        return Err(e).with_context(|| "failed to activate new index");
    }
    if retired.exists() {
        std::fs::remove_dir_all(&retired)?;
    }

    info!(
        dir = %canonical.display(),
        chunks = summary.chunk_count,
        model = %summary.embedding_model,
        "index rebuilt"
    );
    Ok(summary)
}

async fn write_index(config: &Config, report: &Report, dir: &Path) -> Result<IndexSummary> {
    let chunks = split_text(&report.text, &config.chunking);
    if chunks.is_empty() {
        bail!("report text is empty, nothing to index");
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let pool = open_writable(&dir.join(INDEX_DB_FILE)).await?;
    create_schema(&pool).await?;

    let mut stored = 0usize;
    for batch in chunks.chunks(config.embedding.batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors =
            embedding::embed_texts(provider.as_ref(), &config.embedding, &texts).await?;
        if vectors.len() != batch.len() {
            bail!(
                "embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                batch.len()
            );
        }

        for (chunk, vector) in batch.iter().zip(vectors.iter()) {
            sqlx::query("INSERT INTO chunks (ordinal, text, embedding) VALUES (?, ?, ?)")
                .bind(chunk.ordinal)
                .bind(&chunk.text)
                .bind(embedding::vec_to_blob(vector))
                .execute(&pool)
                .await?;
            stored += 1;
        }
    }

    let mut hasher = Sha256::new();
    hasher.update(report.text.as_bytes());
    let text_sha256 = format!("{:x}", hasher.finalize());

    sqlx::query(
        r#"
        INSERT INTO report_meta
            (id, detail_url, attachment_url, text_sha256, embedding_model, embedding_dims, chunk_count, indexed_at)
        VALUES (1, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&report.detail_url)
    .bind(&report.attachment_url)
    .bind(&text_sha256)
    .bind(provider.model_name())
    .bind(provider.dims() as i64)
    .bind(stored as i64)
    .bind(chrono::Utc::now().timestamp())
    .execute(&pool)
    .await?;

    // Flush everything to disk before the directory rename
    pool.close().await;

    Ok(IndexSummary {
        chunk_count: stored,
        embedding_model: provider.model_name().to_string(),
    })
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE report_meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            detail_url TEXT NOT NULL,
            attachment_url TEXT NOT NULL,
            text_sha256 TEXT NOT NULL,
            embedding_model TEXT NOT NULL,
            embedding_dims INTEGER NOT NULL,
            chunk_count INTEGER NOT NULL,
            indexed_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE chunks (
            ordinal INTEGER PRIMARY KEY,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn open_writable(db_path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Read-only handle over the current index.
pub struct IndexReader {
    pool: SqlitePool,
    pub meta: IndexMeta,
}

/// Open the canonical index read-only. Fails when no index exists yet.
pub async fn open_index(dir: &Path) -> Result<IndexReader> {
    let db_path = dir.join(INDEX_DB_FILE);
    if !db_path.exists() {
        bail!(
            "no index at {}; run the index stage first",
            dir.display()
        );
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .read_only(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await?;

    let row = sqlx::query(
        r#"
        SELECT detail_url, attachment_url, text_sha256, embedding_model,
               embedding_dims, chunk_count, indexed_at
        FROM report_meta WHERE id = 1
        "#,
    )
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| anyhow::anyhow!("index at {} has no report metadata", dir.display()))?;

    let meta = IndexMeta {
        detail_url: row.get("detail_url"),
        attachment_url: row.get("attachment_url"),
        text_sha256: row.get("text_sha256"),
        embedding_model: row.get("embedding_model"),
        embedding_dims: row.get("embedding_dims"),
        chunk_count: row.get("chunk_count"),
        indexed_at: row.get("indexed_at"),
    };

    Ok(IndexReader { pool, meta })
}

impl IndexReader {
    /// All chunks with their embeddings, in ordinal order.
    pub async fn all_chunks(&self) -> Result<Vec<(i64, String, Vec<f32>)>> {
        let rows = sqlx::query("SELECT ordinal, text, embedding FROM chunks ORDER BY ordinal")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                (
                    row.get("ordinal"),
                    row.get("text"),
                    embedding::blob_to_vec(&blob),
                )
            })
            .collect())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn sibling_dir(canonical: &Path, suffix: &str) -> PathBuf {
    let name = canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    canonical.with_file_name(format!("{}.{}", name, suffix))
}
