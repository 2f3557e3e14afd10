//! YandexGPT completion client (Foundation Models API).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{CalorieEstimator, calorie_prompt};
use crate::error::EstimatorError;

const COMPLETION_URL: &str = "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";

const MAX_TOKENS: u32 = 2000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model_uri: String,
    completion_options: CompletionOptions,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    stream: bool,
    temperature: f32,
    /// The API takes this as a string.
    max_tokens: String,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    text: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Debug, Deserialize)]
struct CompletionResult {
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    message: AlternativeMessage,
}

#[derive(Debug, Deserialize)]
struct AlternativeMessage {
    text: String,
}

/// Calorie estimator backed by YandexGPT, authenticated with an API key.
pub struct YandexGptEstimator {
    api_key: SecretString,
    folder_id: String,
    model: String,
    url: String,
    client: reqwest::Client,
}

impl YandexGptEstimator {
    pub fn new(api_key: SecretString, folder_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            folder_id: folder_id.into(),
            model: model.into(),
            url: COMPLETION_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the completion endpoint (tests, proxies).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn model_uri(&self) -> String {
        format!("gpt://{}/{}", self.folder_id, self.model)
    }

    fn request(&self, prompt: String) -> CompletionRequest<'static> {
        CompletionRequest {
            model_uri: self.model_uri(),
            completion_options: CompletionOptions {
                stream: false,
                temperature: 0.0,
                max_tokens: MAX_TOKENS.to_string(),
            },
            messages: vec![Message {
                role: "user",
                text: prompt,
            }],
        }
    }
}

fn first_alternative(body: CompletionResponse) -> Result<String, EstimatorError> {
    body.result
        .alternatives
        .into_iter()
        .next()
        .map(|a| a.message.text)
        .ok_or(EstimatorError::UnexpectedFormat)
}

#[async_trait]
impl CalorieEstimator for YandexGptEstimator {
    async fn estimate(&self, product: &str) -> Result<String, EstimatorError> {
        let body = self.request(calorie_prompt(product));

        let resp = self
            .client
            .post(&self.url)
            .header(
                "Authorization",
                format!("Api-Key {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EstimatorError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|_| EstimatorError::UnexpectedFormat)?;
        let text = first_alternative(parsed)?;
        tracing::debug!(product = %product, answer = %text, "Calorie estimate received");
        Ok(text)
    }
}
