//! End-to-end orchestration: fetch → index → answer → notify.
//!
//! Stages run strictly sequentially; the extracted text and the answer are
//! passed as plain values between them. The first failing stage aborts the
//! run and its classified error propagates unmodified to the caller; the
//! external scheduler owns retries and the daily trigger.

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use crate::answer;
use crate::config::Config;
use crate::fetch;
use crate::index;
use crate::notify;

/// One full pipeline run.
pub async fn run_pipeline(config: &Config) -> Result<()> {
    let run_id = Uuid::new_v4();
    info!(%run_id, "pipeline run started");

    let report = fetch::fetch_latest_report(&config.board).await?;
    println!("fetch");
    println!("  detail: {}", report.detail_url);
    println!("  attachment: {}", report.attachment_url);
    println!("  extracted chars: {}", report.text.chars().count());

    let summary = index::rebuild_index(config, &report).await?;
    println!("index");
    println!("  chunks: {}", summary.chunk_count);
    println!("  model: {}", summary.embedding_model);

    let answer = answer::answer_daily_question(config).await?;
    println!("answer");
    println!("  {}", answer.text.replace('\n', "\n  "));

    notify::post_message(&config.notify, &answer::format_message(&answer)).await?;
    println!("notified");
    println!("ok");

    info!(%run_id, "pipeline run complete");
    Ok(())
}
