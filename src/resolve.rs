//! Relative URL resolution against the page URL

use tracing::debug;
use url::Url;

/// Resolve `candidate` against `base` and return an absolute URL string.
///
/// Absolute candidates are returned unchanged, byte for byte. If the base
/// cannot be parsed or the reference cannot be joined, the candidate comes
/// back unresolved rather than failing the whole summary.
///
/// # Example
/// ```
/// use page_summary::resolve_url;
///
/// assert_eq!(
///     resolve_url("https://example.com/articles/1", "../img/a.png"),
///     "https://example.com/img/a.png"
/// );
/// assert_eq!(
///     resolve_url("https://example.com/", "https://cdn.example.net"),
///     "https://cdn.example.net"
/// );
/// ```
pub fn resolve_url(base: &str, candidate: &str) -> String {
    if Url::parse(candidate).is_ok() {
        return candidate.to_string();
    }

    match Url::parse(base).and_then(|base| base.join(candidate)) {
        Ok(resolved) => resolved.into(),
        Err(err) => {
            debug!(base, candidate, error = %err, "leaving URL unresolved");
            candidate.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/blog/post.html?id=7";

    #[test]
    fn test_path_absolute() {
        assert_eq!(resolve_url(BASE, "/img1.png"), "https://example.com/img1.png");
    }

    #[test]
    fn test_path_relative() {
        assert_eq!(
            resolve_url(BASE, "images/cover.jpg"),
            "https://example.com/blog/images/cover.jpg"
        );
        assert_eq!(
            resolve_url(BASE, "../favicon.ico"),
            "https://example.com/favicon.ico"
        );
    }

    #[test]
    fn test_scheme_relative() {
        assert_eq!(
            resolve_url(BASE, "//cdn.example.net/a.png"),
            "https://cdn.example.net/a.png"
        );
    }

    #[test]
    fn test_fragment_only() {
        assert_eq!(
            resolve_url(BASE, "#top"),
            "https://example.com/blog/post.html?id=7#top"
        );
    }

    #[test]
    fn test_absolute_is_unchanged() {
        for url in [
            "https://example.org",
            "http://example.org/a/../b",
            "https://EXAMPLE.org/Path?q=1#frag",
            "data:image/png;base64,AAAA",
        ] {
            assert_eq!(resolve_url(BASE, url), url);
            assert_eq!(resolve_url("not a url", url), url);
        }
    }

    #[test]
    fn test_unparseable_base_keeps_candidate() {
        assert_eq!(resolve_url("", "/img.png"), "/img.png");
        assert_eq!(resolve_url("::nope::", "img.png"), "img.png");
    }

    #[test]
    fn test_empty_candidate_resolves_to_base() {
        assert_eq!(resolve_url("https://example.com/", ""), "https://example.com/");
    }
}
