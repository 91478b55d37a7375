use crate::{config::ImageApi, log_internal};
use anyhow::{anyhow, Result};
use serde_json::Value;

const DEFAULT_TITLE: &str = "Image Generated";

/// Body returned by the image generation API
#[derive(Debug, serde::Deserialize)]
pub struct ImageResponse {
    #[serde(default)]
    pub message: Option<String>,
    /// Usually a boolean, but not guaranteed to be one
    #[serde(default)]
    pub success: Value,
    #[serde(default)]
    pub image: Option<String>,
}

impl ImageResponse {
    pub fn title(&self) -> &str {
        match self.message.as_deref() {
            Some(message) if !message.is_empty() => message,
            _ => DEFAULT_TITLE,
        }
    }

    pub fn success_label(&self) -> String {
        match &self.success {
            Value::Null => "unknown".to_owned(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

pub async fn generate(settings: &ImageApi, prompt: &str) -> Result<ImageResponse> {
    log_internal!("Requesting image from {}... ", settings.url);
    let client = reqwest::Client::new();
    let response = client
        .get(&settings.url)
        .query(&[("prompt", prompt)])
        .header("x-api-key", &settings.api_key)
        .timeout(settings.timeout())
        .send()
        .await
        .map_err(|e| anyhow!("Image API request failed: {}", e))?
        .error_for_status()
        .map_err(|e| anyhow!("Image API returned an error: {}", e))?
        .json::<ImageResponse>()
        .await
        .map_err(|e| anyhow!("Image API returned an unreadable body: {}", e))?;
    log_internal!("Requesting image from {}... done", settings.url);

    Ok(response)
}
