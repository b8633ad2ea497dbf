use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::ChatError;
use crate::tui::AppEvent;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Outcome of one request: the raw success body, or the error to report.
pub type Completion = Result<String, ChatError>;

/// Everything the transport needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    parts: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Value>>,
}

/// Decode only the first element; anything after it is never inspected.
fn first<T: DeserializeOwned>(items: Option<Vec<Value>>) -> Option<T> {
    items?
        .into_iter()
        .next()
        .and_then(|item| serde_json::from_value(item).ok())
}

/// Result of walking `candidates[0].content.parts[0].text`.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Text(String),
    /// Some step was absent, null or empty, or the text was blank.
    Empty,
    /// The body was not a JSON object of the expected shape.
    Malformed(String),
}

pub fn extract_reply(body: &str) -> Extracted {
    let response: GenerateResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => return Extracted::Malformed(e.to_string()),
    };

    let text = first::<Candidate>(response.candidates)
        .and_then(|candidate| candidate.content)
        .and_then(|content| first::<ResponsePart>(content.parts))
        .and_then(|part| part.text);

    match text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Extracted::Text(text.to_string()),
        _ => Extracted::Empty,
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// `<endpoint>/models/<model>:generateContent?key=<api key>`
    pub fn url(&self) -> Result<Url, ChatError> {
        let base = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        Url::parse_with_params(&base, &[("key", self.config.api_key.as_str())])
            .map_err(|e| ChatError::Request(e.to_string()))
    }

    /// Issue one POST for `prompt` and return the raw body on a 2xx status.
    pub async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let url = self.url()?;

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(describe)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Http {
                status: status.to_string(),
            });
        }

        let body = response.text().await.map_err(describe)?;
        debug!(%body, "raw Gemini response");
        Ok(body)
    }

    /// Spawn the request and deliver its completion to the event loop.
    ///
    /// Each call is independent: nothing is cancelled and completions arrive
    /// in whatever order the requests finish.
    pub fn send(&self, prompt: String, tx: UnboundedSender<AppEvent>) -> JoinHandle<()> {
        let client = self.clone();
        info!(model = %client.config.model, chars = prompt.chars().count(), "sending prompt");
        tokio::spawn(async move {
            let completion = client.generate(&prompt).await;
            if tx.send(AppEvent::Reply(completion)).is_err() {
                debug!("event loop closed before reply arrived");
            }
        })
    }
}

/// Flatten a reqwest error and its causes into one line, without the URL
/// (it carries the API key). Builder failures never left the client.
fn describe(err: reqwest::Error) -> ChatError {
    let is_builder = err.is_builder();
    let err = err.without_url();
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    if is_builder {
        ChatError::Request(message)
    } else {
        ChatError::transport(message)
    }
}
