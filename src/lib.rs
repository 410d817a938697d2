//! # page-summary
//!
//! Extract a page summary from the `<head>` of an HTML document: title,
//! description, site name, author, keywords, icon and Open Graph preview
//! images.
//!
//! ## Features
//!
//! - Single forward pass over the head; nothing after `</head>` is read
//! - Open Graph first, with fallbacks to `<title>` and standard meta tags
//! - Relative image and icon URLs resolved against the page URL
//! - Async HTTP fetching with SSRF protection (`http` feature, default)
//! - A ready-to-run summary HTTP service (`server` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use page_summary::PageSummary;
//!
//! #[tokio::main]
//! async fn main() -> page_summary::Result<()> {
//!     let summary = PageSummary::fetch("https://example.org").await?;
//!
//!     println!("Title: {}", summary.title);
//!     println!("Images: {}", summary.images.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Parsing Local HTML
//!
//! ```rust
//! use page_summary::PageSummary;
//!
//! let html = r#"<html><head>
//!     <meta property="og:title" content="Hello">
//!     <meta property="og:image" content="/cover.png">
//!     <meta property="og:image:width" content="1200">
//! </head></html>"#;
//! let summary = PageSummary::from_html(html, "https://example.org/post").unwrap();
//! assert_eq!(summary.title, "Hello");
//! assert_eq!(summary.images[0].url, "https://example.org/cover.png");
//! assert_eq!(summary.images[0].width, 1200);
//! ```
//!
//! ## Without HTTP (parsing only)
//!
//! If you don't need HTTP fetching, disable the default `http` feature:
//!
//! ```toml
//! [dependencies]
//! page-summary = { version = "0.1", default-features = false }
//! ```

mod error;
mod icon;
mod image;
mod resolve;
mod summary;
mod tokens;

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod server;

pub use error::{Error, Result};
pub use image::PreviewImage;
pub use resolve::resolve_url;
pub use summary::PageSummary;
pub use tokens::{Attribute, HeadToken, Tag, TokenStream};

#[cfg(feature = "http")]
pub use http::{BodyReader, Document, HttpOptions, fetch_document};

#[cfg(feature = "http")]
impl PageSummary {
    /// Fetch a page and summarize it with default options.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use page_summary::PageSummary;
    ///
    /// #[tokio::main]
    /// async fn main() -> page_summary::Result<()> {
    ///     let summary = PageSummary::fetch("https://example.org").await?;
    ///     println!("Title: {}", summary.title);
    ///     Ok(())
    /// }
    /// ```
    pub async fn fetch(url: &str) -> Result<Self> {
        Self::fetch_with_options(url, &HttpOptions::default()).await
    }

    /// Fetch a page and summarize it with custom HTTP options.
    ///
    /// Relative URLs in the page are resolved against the final URL after
    /// redirects. A failed fetch never reaches the parser. The body is read
    /// only up to `</head>`; if the connection fails before that,
    /// [`Error::Tokenize`] carries what was summarized so far.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::time::Duration;
    /// use page_summary::{PageSummary, HttpOptions};
    ///
    /// #[tokio::main]
    /// async fn main() -> page_summary::Result<()> {
    ///     let options = HttpOptions::new()
    ///         .timeout(Duration::from_secs(5))
    ///         .user_agent("SummaryBot/1.0");
    ///
    ///     let summary = PageSummary::fetch_with_options("https://example.org", &options).await?;
    ///     println!("Site: {}", summary.site_name);
    ///     Ok(())
    /// }
    /// ```
    pub async fn fetch_with_options(url: &str, options: &HttpOptions) -> Result<Self> {
        let document = fetch_document(url, options).await?;
        let base_url = document.url.clone();
        let reader = document.into_reader();

        // The body arrives while the parser runs; the download ends with it.
        tokio::task::spawn_blocking(move || Self::from_reader(reader, &base_url))
            .await
            .map_err(|err| Error::Io(std::io::Error::other(err)))?
    }
}
