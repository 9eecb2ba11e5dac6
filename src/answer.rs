//! Retrieval-augmented answering for the fixed daily question.
//!
//! Loads the current index read-only, retrieves the top-k chunks by cosine
//! similarity to the question's embedding, and asks the generation
//! capability for the answer. The index must have been built with the same
//! embedding model that is configured now; the mismatch is caught against
//! the model name recorded in the index metadata.

use std::cmp::Ordering;

use anyhow::{bail, Result};
use tracing::info;

use crate::config::Config;
use crate::embedding;
use crate::generate;
use crate::index::{self, IndexReader};
use crate::models::{Answer, ScoredChunk};

/// The one question asked of every day's report.
pub const DAILY_QUESTION: &str = "오늘자 안전관리 일일상황보고서의 '기상 현황'과 '기상 전망' 내용을 불렛 형태로 요약해줘. 한국어로 답변해줘.";

/// Header line of the webhook message.
pub const MESSAGE_HEADER: &str = "📌 *오늘의 안전관리상황 요약*";

/// Answer the daily question against the current index.
pub async fn answer_daily_question(config: &Config) -> Result<Answer> {
    let reader = index::open_index(&config.index.dir).await?;
    let provider = embedding::create_provider(&config.embedding)?;

    if reader.meta.embedding_model != provider.model_name() {
        bail!(
            "index was built with embedding model '{}' but '{}' is configured; rebuild the index",
            reader.meta.embedding_model,
            provider.model_name()
        );
    }

    let query_vec =
        embedding::embed_query(provider.as_ref(), &config.embedding, DAILY_QUESTION).await?;
    let top = top_chunks(&reader, &query_vec, config.retrieval.top_k).await?;
    reader.close().await;

    if top.is_empty() {
        bail!("index contains no chunks");
    }
    info!(retrieved = top.len(), "retrieved context for daily question");

    let text = generate::generate_answer(&config.generation, DAILY_QUESTION, &top).await?;

    Ok(Answer {
        question: DAILY_QUESTION.to_string(),
        text,
    })
}

/// Top-k chunks by cosine similarity, ordinal as the deterministic
/// tie-break.
async fn top_chunks(reader: &IndexReader, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
    let mut scored: Vec<ScoredChunk> = reader
        .all_chunks()
        .await?
        .into_iter()
        .map(|(ordinal, text, vector)| ScoredChunk {
            ordinal,
            text,
            score: embedding::cosine_similarity(query, &vector),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.ordinal.cmp(&b.ordinal))
    });
    scored.truncate(k);

    Ok(scored)
}

/// Webhook payload text: header line plus the answer in a code block.
pub fn format_message(answer: &Answer) -> String {
    format!("{}\n```{}```", MESSAGE_HEADER, answer.text)
}
