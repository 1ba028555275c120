//! LLM API interaction.
//!
//! This module provides the seam between the digest builder and an
//! OpenAI-compatible LLM API:
//! - [`AskAsync`]: core trait defining text-in/text-out interaction
//! - [`AskFnWrapper`]: wraps the `awful_aj` library's `ask` function with a
//!   chat template
//!
//! The digest builder is generic over [`AskAsync`], so tests drive it with
//! scripted fakes instead of a live endpoint. Calls are not retried here: a
//! failed summarization fails the whole summarize operation.

use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use std::error::Error;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors send text to an LLM and return its response. The model
/// identifier is reported alongside every digest.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;

    /// Identifier of the model answering the requests.
    fn model(&self) -> &str;
}

impl<T: AskAsync> AskAsync for &T {
    type Response = T::Response;

    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        (**self).ask(text).await
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

/// Wrapper around `awful_aj::api::ask` that implements [`AskAsync`].
///
/// The template supplies the system prompt; the text passed to
/// [`AskAsync::ask`] becomes the user message.
#[derive(Debug)]
pub struct AskFnWrapper<'a> {
    /// LLM configuration (API key, endpoint, model).
    pub config: &'a AwfulJadeConfig,
    /// Chat template defining the conversation structure.
    pub template: &'a ChatTemplate,
}

impl<'a> AskAsync for AskFnWrapper<'a> {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.config.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None).await;
        let dt = t0.elapsed();

        match &res {
            Ok(_) => debug!(elapsed_ms = dt.as_millis() as u64, "API call succeeded"),
            Err(e) => warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "API call failed"),
        }
        res.map(|r| r.trim().to_string())
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
