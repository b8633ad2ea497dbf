use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::gemini::{extract_reply, Extracted};

/// One (year, value) sample on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DataPoint {
    pub year: i64,
    pub value: f64,
}

/// Where cleaned reply text should go.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Prose(String),
    Chart(Vec<DataPoint>),
}

/// The single renderable outcome of one completed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Message(String),
    Chart(Vec<DataPoint>),
}

fn note_pattern() -> &'static Regex {
    static NOTE: OnceLock<Regex> = OnceLock::new();
    NOTE.get_or_init(|| Regex::new(r"(?i)note:.*").expect("note pattern is valid"))
}

/// Strip code fences and trailing `note:` annotations from model output.
pub fn clean(raw: &str) -> String {
    let unfenced = raw.replace("```json", "").replace("```", "");
    note_pattern()
        .replace_all(&unfenced, "")
        .trim()
        .to_string()
}

/// Decide whether cleaned text is a chart payload or prose.
///
/// Only the first and last non-whitespace characters are inspected. Text that
/// looks like an array but fails to decode is an error, never prose.
pub fn classify(cleaned: &str) -> Result<Classified, ChatError> {
    let text = cleaned.trim();
    if !(text.starts_with('[') && text.ends_with(']')) {
        return Ok(Classified::Prose(cleaned.to_string()));
    }

    let items: Vec<serde_json::Value> =
        serde_json::from_str(text).map_err(|_| ChatError::NotAnArray)?;
    let points = items
        .into_iter()
        .map(serde_json::from_value::<DataPoint>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ChatError::ChartData(e.to_string()))?;
    Ok(Classified::Chart(points))
}

/// Turn a successful response body into exactly one thing to render.
pub fn interpret(body: &str) -> Rendered {
    let reply = match extract_reply(body) {
        Extracted::Text(text) => text,
        Extracted::Empty => return fold(ChatError::NoContent),
        Extracted::Malformed(details) => return fold(ChatError::Envelope(details)),
    };

    let cleaned = clean(&reply);
    if cleaned.is_empty() {
        return fold(ChatError::NoContent);
    }

    match classify(&cleaned) {
        Ok(Classified::Prose(text)) => Rendered::Message(text),
        Ok(Classified::Chart(points)) => {
            debug!(points = points.len(), "reply decoded as chart data");
            Rendered::Chart(points)
        }
        Err(err) => fold(err),
    }
}

/// Convert an error into the chat line that reports it.
pub fn fold(err: ChatError) -> Rendered {
    warn!(error = ?err, "request produced an error message");
    Rendered::Message(err.to_string())
}
