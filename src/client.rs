//! Native client for a running Murmur gateway
//!
//! Thin HTTP wrapper used by the `talk` CLI flow: submit a finished clip
//! or a typed message, page history, clear it.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::api::history::HistoryResponseBody;
use crate::api::meta::HealthResponse;
use crate::api::turn::{TurnOptionsBody, TurnRequestBody, TurnResponseBody};
use crate::voice::AudioClip;
use crate::{Error, Result};

/// HTTP client for the gateway API
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Submit a finished clip for a full voice turn
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the gateway reports one
    pub async fn submit_clip(
        &self,
        clip: AudioClip,
        options: TurnOptionsBody,
    ) -> Result<TurnResponseBody> {
        let (bytes, format) = clip.into_parts();
        let body = TurnRequestBody {
            message: None,
            audio_data: Some(BASE64.encode(bytes)),
            format: Some(format.tag().to_string()),
            options,
        };
        self.post_turn(&body).await
    }

    /// Submit a typed message for a turn
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the gateway reports one
    pub async fn submit_message(
        &self,
        message: impl Into<String>,
        options: TurnOptionsBody,
    ) -> Result<TurnResponseBody> {
        let body = TurnRequestBody {
            message: Some(message.into()),
            audio_data: None,
            format: None,
            options,
        };
        self.post_turn(&body).await
    }

    async fn post_turn(&self, body: &TurnRequestBody) -> Result<TurnResponseBody> {
        let response = self
            .http
            .post(format!("{}/api/turn", self.base_url))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Gateway(format!("{status}: {body}")));
        }

        Ok(response.json().await?)
    }

    /// Fetch a page of conversation history
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn history(&self, limit: usize, offset: usize) -> Result<HistoryResponseBody> {
        let response = self
            .http
            .get(format!(
                "{}/api/history?limit={limit}&offset={offset}",
                self.base_url
            ))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// Clear all conversation history
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn clear_history(&self) -> Result<()> {
        self.http
            .delete(format!("{}/api/history", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Check gateway liveness
    ///
    /// # Errors
    ///
    /// Returns error if the gateway is unreachable
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}
