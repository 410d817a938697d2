//! Document source: fetching HTML pages over HTTP

use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::{Host, Url};

use crate::error::{Error, Result};

const DEFAULT_MAX_REDIRECTS: usize = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10 MB
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.1";
// Chunks buffered between the connection and the reader
const BODY_CHANNEL_DEPTH: usize = 2;

/// An HTML document whose headers have been checked and whose body has not
/// been read yet.
#[derive(Debug)]
pub struct Document {
    /// The final URL after following redirects
    pub url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value, as sent
    pub content_type: String,

    response: Response,
    max_body_size: usize,
}

impl Document {
    /// Stream the body through a blocking reader.
    ///
    /// Chunks are pulled from the connection only as the reader asks for
    /// them, up to the configured maximum body size. Dropping the reader
    /// stops the download and closes the response.
    ///
    /// Must be called from within a Tokio runtime. The reader blocks, so
    /// read it from `tokio::task::spawn_blocking` or another thread.
    pub fn into_reader(self) -> BodyReader {
        let (tx, rx) = mpsc::channel(BODY_CHANNEL_DEPTH);
        tokio::spawn(pump_body(self.response, self.max_body_size, tx));
        BodyReader::new(rx)
    }
}

/// Blocking [`Read`] over a response body being downloaded in the background.
///
/// A transport failure is returned as an I/O error from `read`.
#[derive(Debug)]
pub struct BodyReader {
    chunks: mpsc::Receiver<io::Result<Vec<u8>>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl BodyReader {
    fn new(chunks: mpsc::Receiver<io::Result<Vec<u8>>>) -> Self {
        Self {
            chunks,
            chunk: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos == self.chunk.len() {
            match self.chunks.blocking_recv() {
                Some(Ok(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Some(Err(err)) => return Err(err),
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Forward body chunks to `tx` until the body ends, `max_body_size` bytes
/// have been sent, or the receiving side goes away. Returns the number of
/// bytes forwarded.
async fn pump_body(
    response: Response,
    max_body_size: usize,
    tx: mpsc::Sender<io::Result<Vec<u8>>>,
) -> usize {
    let mut stream = response.bytes_stream();
    let mut forwarded = 0;

    while forwarded < max_body_size {
        let (next, failed) = match stream.next().await {
            None => break,
            Some(Ok(chunk)) => {
                let take = chunk.len().min(max_body_size - forwarded);
                (Ok(chunk[..take].to_vec()), false)
            }
            Some(Err(err)) => (Err(io::Error::other(err)), true),
        };
        let len = next.as_ref().map_or(0, Vec::len);
        if tx.send(next).await.is_err() {
            debug!(forwarded, "body reader closed, dropping response");
            break;
        }
        forwarded += len;
        if failed {
            break;
        }
    }

    forwarded
}

/// Options for fetching documents.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Accept invalid TLS certificates. Only for testing against
    /// self-signed hosts.
    pub allow_insecure: bool,

    /// Follow HTTP redirects
    pub follow_redirects: bool,

    /// Maximum number of redirects to follow
    pub max_redirects: usize,

    /// Request timeout, covering connect, headers and body
    pub timeout: Duration,

    /// Maximum number of body bytes read; the rest is dropped.
    pub max_body_size: usize,

    /// Refuse URLs that point at loopback, private, link-local or otherwise
    /// internal addresses. On by default.
    pub block_private_ips: bool,

    /// User-Agent header
    pub user_agent: String,

    /// Additional headers to send
    pub headers: Vec<(String, String)>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            allow_insecure: false,
            follow_redirects: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            block_private_ips: true,
            user_agent: format!("page-summary/{}", env!("CARGO_PKG_VERSION")),
            headers: Vec::new(),
        }
    }
}

impl HttpOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether invalid TLS certificates are accepted.
    pub fn allow_insecure(mut self, allow: bool) -> Self {
        self.allow_insecure = allow;
        self
    }

    /// Set whether to follow redirects.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of body bytes to read.
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set whether URLs resolving to internal addresses are refused.
    pub fn block_private_ips(mut self, block: bool) -> Self {
        self.block_private_ips = block;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// With private IPs blocked, every redirect target is checked before it
    /// is followed.
    fn redirect_policy(&self) -> Policy {
        if !self.follow_redirects {
            return Policy::none();
        }
        if !self.block_private_ips {
            return Policy::limited(self.max_redirects);
        }

        let max_redirects = self.max_redirects;
        Policy::custom(move |attempt| {
            if attempt.previous().len() >= max_redirects {
                return attempt.error("too many redirects");
            }
            match redirect_block_reason(attempt.url()) {
                Some(reason) => {
                    warn!(url = %attempt.url(), %reason, "refusing redirect");
                    attempt.error(reason)
                }
                None => attempt.follow(),
            }
        })
    }

    fn build_client(&self) -> Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        for (name, value) in &self.headers {
            match (name.parse::<HeaderName>(), value.parse::<HeaderValue>()) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = %name, "skipping invalid request header"),
            }
        }

        Ok(Client::builder()
            .danger_accept_invalid_certs(self.allow_insecure)
            .redirect(self.redirect_policy())
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .default_headers(headers)
            .build()?)
    }
}

/// Whether an address is loopback, private, link-local, or otherwise not a
/// public unicast address.
fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_ipv4(v4),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || v6.to_ipv4_mapped().is_some_and(is_internal_ipv4)
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // unique local fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // link-local fe80::/10
                || v6.segments()[..2] == [0x2001, 0x0db8] // documentation
        }
    }
}

fn is_internal_ipv4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local() // includes the 169.254.169.254 metadata endpoint
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.octets()[0] == 0
        || ip.octets()[0] >= 224 // multicast and reserved
}

fn is_internal_hostname(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
}

/// Parse `url` and make sure it is an http(s) URL with a host.
fn parse_target(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(Error::InvalidUrl(format!(
                "unsupported scheme '{scheme}', only http/https allowed"
            )));
        }
    }
    if parsed.host().is_none() {
        return Err(Error::InvalidUrl("missing host".to_string()));
    }
    Ok(parsed)
}

/// Why `url` names an internal target, judged from the URL alone.
fn internal_target(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Ipv4(ip) if is_internal_ip(ip.into()) => Some(format!("internal address {ip}")),
        Host::Ipv6(ip) if is_internal_ip(ip.into()) => Some(format!("internal address {ip}")),
        Host::Domain(host) if is_internal_hostname(host) => {
            Some(format!("internal host name {host}"))
        }
        _ => None,
    }
}

/// Why a redirect to `url` must not be followed. No DNS lookups happen here;
/// the final URL is checked again once the response arrives.
fn redirect_block_reason(url: &Url) -> Option<String> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Some(format!("redirect to unsupported scheme '{scheme}'")),
    }
    if url.host().is_none() {
        return Some("redirect without host".to_string());
    }
    internal_target(url).map(|reason| format!("redirect to {reason}"))
}

/// Refuse targets that name or resolve to an internal address.
async fn check_public_target(url: &Url) -> Result<()> {
    if let Some(reason) = internal_target(url) {
        return Err(Error::SsrfBlocked(reason));
    }
    if let Some(Host::Domain(host)) = url.host() {
        let port = url.port_or_known_default().unwrap_or(80);
        // Unresolvable names are left for the request itself to report.
        if let Ok(addrs) = tokio::net::lookup_host((host, port)).await {
            for addr in addrs {
                if is_internal_ip(addr.ip()) {
                    return Err(Error::SsrfBlocked(format!(
                        "{host} resolves to internal address {}",
                        addr.ip()
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Check whether a Content-Type header advertises an HTML page.
fn is_html(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..9)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("text/html"))
}

/// Fetch a URL and return the HTML document.
///
/// Fails when the request cannot be made, when the server answers with a
/// status of 400 or above, or when the response is not `text/html`. The
/// body is left on the connection until [`Document::into_reader`] is read.
pub async fn fetch_document(url: &str, options: &HttpOptions) -> Result<Document> {
    let target = parse_target(url)?;
    if options.block_private_ips {
        if let Err(err) = check_public_target(&target).await {
            warn!(url, error = %err, "refusing to fetch");
            return Err(err);
        }
    }

    let client = options.build_client()?;
    let response = client.get(target.clone()).send().await?;

    if options.block_private_ips && *response.url() != target {
        if let Err(err) = check_public_target(response.url()).await {
            warn!(url, final_url = %response.url(), error = %err, "refusing redirected fetch");
            return Err(err);
        }
    }

    let status_code = response.status().as_u16();
    if status_code >= 400 {
        warn!(url, status_code, "upstream returned an error status");
        return Err(Error::Status(status_code));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !is_html(&content_type) {
        let shown = if content_type.is_empty() {
            "no content type".to_string()
        } else {
            content_type
        };
        warn!(url, content_type = %shown, "upstream document is not HTML");
        return Err(Error::InvalidContentType(shown));
    }

    let final_url = response.url().to_string();
    debug!(url = %final_url, status_code, "fetched document headers");

    Ok(Document {
        url: final_url,
        status_code,
        content_type,
        response,
        max_body_size: options.max_body_size,
    })
}
