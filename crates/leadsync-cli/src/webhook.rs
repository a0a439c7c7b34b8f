//! Slack-style incoming-webhook notifier.

use std::time::Duration;

use leadsync_core::{context::RunEvent, notify::Notifier};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("webhook returned {0}")]
  Status(reqwest::StatusCode),
}

#[derive(Serialize)]
struct Payload<'a> {
  text: &'a str,
}

/// Posts each event as `{"text": "..."}`.
#[derive(Clone)]
pub struct WebhookNotifier {
  client: Client,
  url:    String,
}

impl WebhookNotifier {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WebhookError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, url: url.into() })
  }
}

impl Notifier for WebhookNotifier {
  type Error = WebhookError;

  async fn notify(&self, event: &RunEvent) -> Result<(), WebhookError> {
    let message = event.message();
    let resp = self
      .client
      .post(&self.url)
      .json(&Payload { text: &message })
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(WebhookError::Status(resp.status()));
    }
    Ok(())
  }
}
