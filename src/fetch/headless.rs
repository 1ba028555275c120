//! Headless browser transport for JavaScript-rendered pages.
//!
//! Talks to a Browserless-compatible `/content` endpoint, which loads the
//! page in a real browser and returns the rendered HTML.

use super::PageFetch;
use crate::error::FetchError;
use std::time::Duration;
use tracing::{debug, instrument};

const RENDER_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Clone)]
pub struct HeadlessTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HeadlessTransport {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(RENDER_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self) -> String {
        match &self.token {
            Some(token) => format!(
                "{}/content?token={}",
                self.base_url,
                urlencoding::encode(token)
            ),
            None => format!("{}/content", self.base_url),
        }
    }
}

impl PageFetch for HeadlessTransport {
    #[instrument(level = "debug", skip(self))]
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let body = serde_json::json!({
            "url": url,
            "gotoOptions": { "waitUntil": "domcontentloaded", "timeout": 60000 },
        });

        let resp = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = resp.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        debug!(bytes = html.len(), "Rendered page");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_token() {
        let transport = HeadlessTransport::new("http://localhost:3000/", Some("a b&c")).unwrap();
        assert_eq!(
            transport.endpoint(),
            "http://localhost:3000/content?token=a%20b%26c"
        );
    }

    #[test]
    fn test_endpoint_without_token() {
        let transport = HeadlessTransport::new("http://localhost:3000", None).unwrap();
        assert_eq!(transport.endpoint(), "http://localhost:3000/content");
    }
}
