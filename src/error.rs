//! Failures that end up as a chat line.
//!
//! Every variant is caught where it happens and shown to the user as a single
//! assistant message. The `Display` text is exactly that message.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChatError {
    /// The request could not be assembled (bad endpoint, unencodable body).
    #[error("❌ Error: could not build request: {0}")]
    Request(String),

    /// No HTTP response was received at all.
    #[error("❌ Error: {0}")]
    Transport(String),

    /// The server answered with a non-success status, e.g. `404 Not Found`.
    #[error("⚠️ API Error: {status}")]
    Http { status: String },

    /// The response body was not valid JSON.
    #[error("⚠️ Parsing error: {0}")]
    Envelope(String),

    /// The envelope parsed but held no candidate text.
    #[error("⚠️ No valid response from Gemini.")]
    NoContent,

    /// The reply looked like an array but was not valid JSON.
    #[error("⚠️ Response was not a valid JSON array.")]
    NotAnArray,

    /// The array parsed but an element lacked a usable `year` or `value`.
    #[error("📉 Graph parsing error: {0}")]
    ChartData(String),
}

impl ChatError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        ChatError::Transport(err.to_string())
    }
}
