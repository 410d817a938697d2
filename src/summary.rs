//! Page summary extraction from the document head

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::mem;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::image::PreviewImage;
use crate::tokens::{HeadToken, Tag, TokenStream};

// Security limit for the image list
const MAX_IMAGES: usize = 100;

/// Summary metadata for a web page.
///
/// Filled from Open Graph properties, falling back to standard meta tags
/// and `<title>`. Empty fields are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    /// The type of object from `og:type` (e.g., "website", "article")
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub page_type: String,

    /// Canonical URL from `og:url`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    /// `og:title`, or the `<title>` text
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// `og:site_name`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub site_name: String,

    /// `og:description`, or `<meta name="description">`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// `<meta name="author">`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,

    /// `<meta name="keywords">`, split on commas
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Site icon from `<link rel="icon">`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<PreviewImage>,

    /// Preview images in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<PreviewImage>,
}

impl PageSummary {
    /// Summarize the head of an HTML document read from `reader`.
    ///
    /// Relative URLs are resolved against `base_url`. Reading stops at
    /// `</head>` or end of input. If the reader fails part way through,
    /// the error carries whatever was summarized up to that point.
    pub fn from_reader<R: Read>(reader: R, base_url: &str) -> Result<Self> {
        HeadParser::new(TokenStream::new(reader), base_url).run()
    }

    /// Summarize an HTML document held in memory.
    ///
    /// # Example
    /// ```
    /// use page_summary::PageSummary;
    ///
    /// let html = r#"<html><head>
    ///     <title>Hello</title>
    ///     <meta name="keywords" content="rust, html">
    /// </head><body>World</body></html>"#;
    /// let summary = PageSummary::from_html(html, "https://example.com/").unwrap();
    /// assert_eq!(summary.title, "Hello");
    /// assert_eq!(summary.keywords, vec!["rust", "html"]);
    /// ```
    pub fn from_html(html: &str, base_url: &str) -> Result<Self> {
        Self::from_reader(html.as_bytes(), base_url)
    }

    /// Summarize an HTML file.
    ///
    /// # Arguments
    /// * `path` - Path to the HTML file
    /// * `base_url` - URL the file was served from, for resolving relative links
    pub fn from_file(path: impl AsRef<Path>, base_url: &str) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), base_url)
    }

    /// Check if nothing was extracted.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Scanning,
    Done,
}

/// Single forward pass over the token stream, accumulating a summary.
struct HeadParser<'a, R> {
    tokens: TokenStream<R>,
    base_url: &'a str,
    summary: PageSummary,
    state: ParseState,
    read_any: bool,
    images_capped: bool,
}

impl<'a, R: Read> HeadParser<'a, R> {
    fn new(tokens: TokenStream<R>, base_url: &'a str) -> Self {
        Self {
            tokens,
            base_url,
            summary: PageSummary::default(),
            state: ParseState::Scanning,
            read_any: false,
            images_capped: false,
        }
    }

    fn run(mut self) -> Result<PageSummary> {
        while self.state == ParseState::Scanning {
            match self.next_token()? {
                Some(token) => self.dispatch(token)?,
                None => {
                    trace!("end of stream before </head>");
                    self.state = ParseState::Done;
                }
            }
        }
        Ok(self.summary)
    }

    fn next_token(&mut self) -> Result<Option<HeadToken>> {
        match self.tokens.next() {
            None => Ok(None),
            Some(Ok(token)) => {
                self.read_any = true;
                Ok(Some(token))
            }
            Some(Err(source)) => Err(self.fail(source)),
        }
    }

    fn fail(&mut self, source: io::Error) -> Error {
        let partial = self
            .read_any
            .then(|| Box::new(mem::take(&mut self.summary)));
        self.state = ParseState::Done;
        Error::Tokenize { source, partial }
    }

    fn dispatch(&mut self, token: HeadToken) -> Result<()> {
        match token {
            HeadToken::StartTag(tag) => match tag.name.as_str() {
                "meta" => self.meta(&tag),
                "title" if self.summary.title.is_empty() => self.title()?,
                "link" => self.link(&tag),
                _ => {}
            },
            HeadToken::EndTag(name) if name == "head" => self.state = ParseState::Done,
            _ => {}
        }
        Ok(())
    }

    /// Take the token right after `<title>` as the title if it is text.
    fn title(&mut self) -> Result<()> {
        match self.next_token()? {
            Some(HeadToken::Text(text)) => self.summary.title = text,
            Some(_) => {}
            None => self.state = ParseState::Done,
        }
        Ok(())
    }

    fn link(&mut self, tag: &Tag) {
        if let Some(icon) = PreviewImage::from_icon_link(tag, self.base_url) {
            self.summary.icon = Some(icon);
        }
    }

    fn meta(&mut self, tag: &Tag) {
        let property = tag.attr("property").unwrap_or_default();
        let name = tag.attr("name").unwrap_or_default();
        let content = tag.attr("content").unwrap_or_default();
        let summary = &mut self.summary;

        match property {
            "og:type" => summary.page_type = content.to_string(),
            "og:url" => summary.url = content.to_string(),
            "og:title" => summary.title = content.to_string(),
            "og:site_name" => summary.site_name = content.to_string(),
            "og:description" => summary.description = content.to_string(),
            _ => {}
        }

        match name {
            "description" if property != "og:description" && summary.description.is_empty() => {
                summary.description = content.to_string();
            }
            "author" => summary.author = content.to_string(),
            "keywords" => summary.keywords = split_keywords(content),
            _ => {}
        }

        if property == "og:image" {
            self.start_image(content);
        } else if property.starts_with("og:image:") {
            self.extend_image(property, content);
        }
    }

    fn start_image(&mut self, content: &str) {
        if self.summary.images.len() >= MAX_IMAGES {
            if !self.images_capped {
                debug!(limit = MAX_IMAGES, "image limit reached, ignoring further og:image tags");
            }
            self.images_capped = true;
            return;
        }
        let mut image = PreviewImage::default();
        image.extend("og:image", self.base_url, content);
        self.summary.images.push(image);
    }

    fn extend_image(&mut self, property: &str, content: &str) {
        if self.images_capped {
            return;
        }
        match self.summary.images.last_mut() {
            Some(image) => image.extend(property, self.base_url, content),
            None => debug!(property, "ignoring image property before any og:image"),
        }
    }
}

/// Split a keywords list. Spaces are dropped only when the list has commas.
fn split_keywords(content: &str) -> Vec<String> {
    if content.contains(',') {
        content
            .replace(' ', "")
            .split(',')
            .map(str::to_string)
            .collect()
    } else {
        vec![content.to_string()]
    }
}
