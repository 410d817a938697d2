//! Error types for page-summary

use thiserror::Error;

use crate::summary::PageSummary;

/// Errors that can occur when fetching a document or summarizing it.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to parse or validate the URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP request failed
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status (>= 400)
    #[cfg(feature = "http")]
    #[error("response status code was {0}")]
    Status(u16),

    /// Failed to read file
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Reading the document failed part way through tokenizing.
    ///
    /// `partial` holds whatever was summarized before the failure, or `None`
    /// if the stream failed before the first token.
    #[error("failed to tokenize HTML: {source}")]
    Tokenize {
        source: std::io::Error,
        partial: Option<Box<PageSummary>>,
    },

    /// Invalid response (non-HTML content type)
    #[error("invalid content type: expected text/html, got {0}")]
    InvalidContentType(String),

    /// Request blocked due to SSRF protection
    #[cfg(feature = "http")]
    #[error("SSRF protection: {0}")]
    SsrfBlocked(String),
}

/// Result type alias for page-summary operations.
pub type Result<T> = std::result::Result<T, Error>;
