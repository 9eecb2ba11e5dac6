//! Generation provider abstraction (chat-style LLM).
//!
//! Mirrors the embedding module's config-dispatch shape:
//! - **openai** — OpenAI-compatible `POST /chat/completions`; requires
//!   `OPENAI_API_KEY`. The base URL is overridable, so any compatible
//!   router or hosted endpoint works.
//! - **ollama** — `POST /api/chat` on a local Ollama instance.
//!
//! One single-turn request per pipeline run; there is no conversation
//! history. A missing or empty answer in the response classifies as a
//! generation failure.

use std::time::Duration;

use tracing::debug;

use crate::config::GenerationConfig;
use crate::error::PipelineError;
use crate::models::ScoredChunk;

const SYSTEM_PROMPT: &str =
    "다음 문서 발췌를 근거로 질문에 답하세요. 발췌에 없는 내용은 추측하지 마세요.";

/// Answer `question` grounded in the retrieved chunks.
pub async fn generate_answer(
    config: &GenerationConfig,
    question: &str,
    context: &[ScoredChunk],
) -> Result<String, PipelineError> {
    let prompt = build_prompt(question, context);
    debug!(provider = %config.provider, model = %config.model, "requesting generation");

    match config.provider.as_str() {
        "openai" => generate_openai(config, &prompt).await,
        "ollama" => generate_ollama(config, &prompt).await,
        other => Err(PipelineError::Generation(format!(
            "unknown generation provider: {}",
            other
        ))),
    }
}

/// Retrieved chunks first, separated from each other and from the
/// question, so the model sees the evidence before the ask.
fn build_prompt(question: &str, context: &[ScoredChunk]) -> String {
    let mut prompt = String::new();
    for chunk in context {
        prompt.push_str(&chunk.text);
        prompt.push_str("\n\n---\n\n");
    }
    prompt.push_str(question);
    prompt
}

async fn generate_openai(config: &GenerationConfig, prompt: &str) -> Result<String, PipelineError> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| PipelineError::Generation("OPENAI_API_KEY not set".to_string()))?;

    let base_url = config
        .url
        .as_deref()
        .unwrap_or("https://api.openai.com/v1");
    let timeout = Duration::from_secs(config.timeout_secs);

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::Generation(e.to_string()))?;

    let body = serde_json::json!({
        "model": config.model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": prompt },
        ],
        "temperature": 0.0,
        "max_tokens": config.max_tokens,
    });

    let response = client
        .post(format!("{}/chat/completions", base_url))
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| PipelineError::from_reqwest(e, timeout, PipelineError::Generation))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(PipelineError::Generation(format!(
            "generation API error {}: {}",
            status, body_text
        )));
    }

    let json: serde_json::Value = response
        .json()
        .await
        .map_err(|e| PipelineError::Generation(e.to_string()))?;

    extract_answer(&json["choices"][0]["message"]["content"])
}

async fn generate_ollama(config: &GenerationConfig, prompt: &str) -> Result<String, PipelineError> {
    let base_url = config.url.as_deref().unwrap_or("http://localhost:11434");
    let timeout = Duration::from_secs(config.timeout_secs);

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::Generation(e.to_string()))?;

    let body = serde_json::json!({
        "model": config.model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": prompt },
        ],
        "stream": false,
    });

    let response = client
        .post(format!("{}/api/chat", base_url))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| PipelineError::from_reqwest(e, timeout, PipelineError::Generation))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(PipelineError::Generation(format!(
            "Ollama API error {}: {}",
            status, body_text
        )));
    }

    let json: serde_json::Value = response
        .json()
        .await
        .map_err(|e| PipelineError::Generation(e.to_string()))?;

    extract_answer(&json["message"]["content"])
}

fn extract_answer(value: &serde_json::Value) -> Result<String, PipelineError> {
    match value.as_str() {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(PipelineError::Generation(
            "no answer in generation response".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(ordinal: i64, text: &str) -> ScoredChunk {
        ScoredChunk {
            ordinal,
            text: text.to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn prompt_places_context_before_question() {
        let prompt = build_prompt(
            "기상 전망은?",
            &[chunk(0, "기상 현황: 맑음"), chunk(1, "기상 전망: 흐림")],
        );
        let question_pos = prompt.find("기상 전망은?").unwrap();
        let first_chunk_pos = prompt.find("기상 현황: 맑음").unwrap();
        assert!(first_chunk_pos < question_pos);
        assert!(prompt.contains("---"));
    }

    #[test]
    fn prompt_without_context_is_just_the_question() {
        assert_eq!(build_prompt("질문", &[]), "질문");
    }

    #[test]
    fn missing_answer_is_generation_error() {
        let err = extract_answer(&serde_json::Value::Null).unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
    }

    #[test]
    fn blank_answer_is_generation_error() {
        let err = extract_answer(&serde_json::json!("   ")).unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
    }

    #[test]
    fn answer_text_passes_through() {
        let text = extract_answer(&serde_json::json!("- 맑음\n- 전국 비 소식")).unwrap();
        assert_eq!(text, "- 맑음\n- 전국 비 소식");
    }
}
