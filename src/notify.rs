//! Webhook delivery.

use std::time::Duration;

use serde_json::json;
use tracing::info;

use crate::config::NotifyConfig;
use crate::error::PipelineError;

/// POST `{"text": ...}` to the configured webhook.
///
/// One attempt with a bounded timeout; retrying a failed delivery is the
/// scheduler's decision, not ours. Success is a 2xx status; the response
/// body is not inspected.
pub async fn post_message(config: &NotifyConfig, text: &str) -> Result<(), PipelineError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::Notification(e.to_string()))?;

    let response = client
        .post(&config.webhook_url)
        .json(&json!({ "text": text }))
        .send()
        .await
        .map_err(|e| PipelineError::from_reqwest(e, timeout, PipelineError::Notification))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::Notification(format!(
            "webhook returned HTTP {}",
            status
        )));
    }

    info!(status = %status, "notification delivered");
    Ok(())
}
