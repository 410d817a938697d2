//! Site icon from `<link rel="icon">`

use crate::image::PreviewImage;
use crate::resolve::resolve_url;
use crate::tokens::Tag;

impl PreviewImage {
    /// Build an icon from a `<link>` tag.
    ///
    /// Returns `None` unless `rel` is exactly `icon`. The `sizes` attribute
    /// is read as `HEIGHTxWIDTH`: the first number is the height and the
    /// second the width. A malformed size leaves the affected dimension at
    /// zero.
    ///
    /// # Example
    /// ```
    /// use page_summary::{PreviewImage, Tag};
    ///
    /// let link = Tag::new("link", [("rel", "icon"), ("href", "/favicon.png"), ("sizes", "16x32")]);
    /// let icon = PreviewImage::from_icon_link(&link, "https://example.com/a/b").unwrap();
    /// assert_eq!(icon.url, "https://example.com/favicon.png");
    /// assert_eq!((icon.height, icon.width), (16, 32));
    /// ```
    pub fn from_icon_link(tag: &Tag, base_url: &str) -> Option<Self> {
        if tag.attr("rel") != Some("icon") {
            return None;
        }

        let href = tag.attr("href").unwrap_or_default();
        let url = if href.starts_with("http") {
            href.to_string()
        } else {
            resolve_url(base_url, href)
        };

        let mut icon = Self {
            url,
            mime_type: tag.attr("type").unwrap_or_default().to_string(),
            alt: tag.attr("alt").unwrap_or_default().to_string(),
            ..Default::default()
        };

        if let Some(sizes) = tag.attr("sizes").filter(|s| !s.is_empty() && *s != "any") {
            let mut dims = sizes.split('x');
            icon.height = dims.next().and_then(|h| h.parse().ok()).unwrap_or(0);
            icon.width = dims.next().and_then(|w| w.parse().ok()).unwrap_or(0);
        }

        Some(icon)
    }
}
