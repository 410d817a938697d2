//! Preview images built from Open Graph `og:image*` properties

use serde::{Deserialize, Serialize};

use crate::resolve::resolve_url;

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// A candidate preview image or site icon.
///
/// Every field is optional; absent values are left empty or zero and are
/// omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewImage {
    /// Absolute URL of the image
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    /// Secure (HTTPS) URL of the image
    #[serde(
        rename = "secureURL",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub secure_url: String,

    /// MIME type (e.g., "image/png")
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub mime_type: String,

    /// Width in pixels
    #[serde(default, skip_serializing_if = "is_zero")]
    pub width: u32,

    /// Height in pixels
    #[serde(default, skip_serializing_if = "is_zero")]
    pub height: u32,

    /// Alternative text description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alt: String,
}

impl PreviewImage {
    /// Apply one `og:image*` property to this image.
    ///
    /// URLs are resolved against `base_url`. Width and height that are not
    /// valid integers are set to zero. Properties other than `og:image`,
    /// `og:image:secure_url`, `og:image:type`, `og:image:width`,
    /// `og:image:height` and `og:image:alt` are ignored.
    ///
    /// # Example
    /// ```
    /// use page_summary::PreviewImage;
    ///
    /// let mut image = PreviewImage::default();
    /// image.extend("og:image", "https://example.com/a/", "cover.png");
    /// image.extend("og:image:width", "https://example.com/a/", "1200");
    /// assert_eq!(image.url, "https://example.com/a/cover.png");
    /// assert_eq!(image.width, 1200);
    /// ```
    pub fn extend(&mut self, property: &str, base_url: &str, content: &str) {
        match property {
            "og:image" => self.url = resolve_url(base_url, content),
            "og:image:secure_url" => self.secure_url = resolve_url(base_url, content),
            "og:image:type" => self.mime_type = content.to_string(),
            "og:image:width" => self.width = content.parse().unwrap_or(0),
            "og:image:height" => self.height = content.parse().unwrap_or(0),
            "og:image:alt" => self.alt = content.to_string(),
            _ => {}
        }
    }

    /// Check if no field has been set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
