//! Shared HTTP plumbing for the REST providers.

use crate::Outcome;
use crate::retry::{is_retryable_status_code, is_retryable_transport_error};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use storymap_core::{Result, StoryMapError};

pub(crate) fn build_client() -> Result<Client> {
    Client::builder()
        .build()
        .map_err(|e| StoryMapError::Config(format!("Failed to create HTTP client: {e}")))
}

/// Send a JSON request and decode the body, classifying any failure.
pub(crate) async fn send_json<T: DeserializeOwned>(
    builder: RequestBuilder,
    provider: &str,
) -> std::result::Result<T, Outcome> {
    let response = builder.send().await.map_err(|e| {
        let message = format!("{provider} API request failed: {e}");
        if is_retryable_transport_error(&e) { Outcome::Retryable(message) } else { Outcome::Fatal(message) }
    })?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        let message = format!("{provider} API error ({status}): {error_text}");
        // Some backends report exhausted quota with a 400 or 403.
        return Err(if is_retryable_status_code(status.as_u16()) {
            Outcome::Retryable(message)
        } else {
            Outcome::from_error_message(message)
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| Outcome::Fatal(format!("{provider} API returned an undecodable body: {e}")))
}
