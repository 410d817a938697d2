//! Lazy HTML token stream
//!
//! Wraps html5ever's tokenizer in a pull-based iterator: bytes are read from
//! the source only when the consumer asks for a token that has not been
//! produced yet, so a consumer that stops early never reads the rest of the
//! document.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::mem;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
    TokenizerResult,
};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// A single attribute of a tag, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lower-cased attribute name
    pub name: String,

    /// Attribute value with character references decoded
    pub value: String,
}

/// A start or self-closing tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    /// Lower-cased tag name
    pub name: String,

    /// Attributes in the order they appear in the source
    pub attrs: Vec<Attribute>,

    /// Whether the tag was written as `<tag ... />`
    pub self_closing: bool,
}

impl Tag {
    /// Create a tag from a name and `(name, value)` attribute pairs.
    pub fn new<'a>(name: &str, attrs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            name: name.to_string(),
            attrs: attrs
                .into_iter()
                .map(|(name, value)| Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
            self_closing: false,
        }
    }

    /// Look up an attribute value by name.
    ///
    /// Returns `None` when the attribute is absent, which is distinct from
    /// an attribute present with an empty value. The first occurrence wins.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }
}

/// Tokens produced by [`TokenStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadToken {
    /// Start tag, including self-closing tags
    StartTag(Tag),

    /// End tag, by lower-cased name
    EndTag(String),

    /// A run of character data
    Text(String),

    /// Comments and doctypes
    Other,
}

/// Collects tokens emitted by the tokenizer until the iterator hands them out.
#[derive(Default)]
struct TokenQueue {
    ready: VecDeque<HeadToken>,
    text: String,
}

impl TokenQueue {
    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.ready.push_back(HeadToken::Text(mem::take(&mut self.text)));
        }
    }

    fn push(&mut self, token: HeadToken) {
        self.flush_text();
        self.ready.push_back(token);
    }
}

/// Tokenizer state to switch to after the given start tag, matching what a
/// browser does for elements whose content is not markup.
fn content_state(name: &str) -> Option<TokenSinkResult<()>> {
    match name {
        "title" | "textarea" => Some(TokenSinkResult::RawData(RawKind::Rcdata)),
        "script" => Some(TokenSinkResult::RawData(RawKind::ScriptData)),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" | "noscript" => {
            Some(TokenSinkResult::RawData(RawKind::Rawtext))
        }
        "plaintext" => Some(TokenSinkResult::Plaintext),
        _ => None,
    }
}

impl TokenSink for TokenQueue {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::CharacterTokens(text) => self.text.push_str(&text),
            Token::NullCharacterToken => self.text.push('\u{FFFD}'),
            // Recoverable; the tokenizer has already applied its fix-up.
            Token::ParseError(_) => {}
            Token::TagToken(tag) => {
                let name = tag.name.to_string();
                match tag.kind {
                    TagKind::StartTag => {
                        let switch = if tag.self_closing {
                            None
                        } else {
                            content_state(&name)
                        };
                        self.push(HeadToken::StartTag(Tag {
                            name,
                            attrs: tag
                                .attrs
                                .into_iter()
                                .map(|attr| Attribute {
                                    name: attr.name.local.to_string(),
                                    value: attr.value.to_string(),
                                })
                                .collect(),
                            self_closing: tag.self_closing,
                        }));
                        if let Some(switch) = switch {
                            return switch;
                        }
                    }
                    TagKind::EndTag => self.push(HeadToken::EndTag(name)),
                }
            }
            Token::CommentToken(_) | Token::DoctypeToken(_) => self.push(HeadToken::Other),
            Token::EOFToken => self.flush_text(),
        }
        TokenSinkResult::Continue
    }
}

/// Length of an incomplete UTF-8 sequence at the end of `bytes`, if any.
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let needed = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if needed > back { back } else { 0 };
    }
    0
}

/// A lazy, forward-only stream of HTML tokens read from `R`.
///
/// Reading stops at end of input, which ends the iterator. A read error is
/// yielded once and then the iterator ends.
pub struct TokenStream<R> {
    reader: R,
    tokenizer: Tokenizer<TokenQueue>,
    input: BufferQueue,
    undecoded: Vec<u8>,
    chunk: Box<[u8]>,
    finished: bool,
}

impl<R: Read> TokenStream<R> {
    /// Create a token stream over a byte source.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            tokenizer: Tokenizer::new(TokenQueue::default(), TokenizerOpts::default()),
            input: BufferQueue::default(),
            undecoded: Vec::new(),
            chunk: vec![0; READ_CHUNK_SIZE].into_boxed_slice(),
            finished: false,
        }
    }

    /// Read one chunk from the source and run the tokenizer over it.
    fn fill(&mut self) -> io::Result<()> {
        let read = loop {
            match self.reader.read(&mut self.chunk) {
                Ok(read) => break read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        };

        if read == 0 {
            if !self.undecoded.is_empty() {
                let rest = String::from_utf8_lossy(&self.undecoded).into_owned();
                self.undecoded.clear();
                self.feed(rest);
            }
            self.tokenizer.end();
            self.finished = true;
            return Ok(());
        }

        self.undecoded.extend_from_slice(&self.chunk[..read]);
        let complete = self.undecoded.len() - incomplete_utf8_tail(&self.undecoded);
        let text = String::from_utf8_lossy(&self.undecoded[..complete]).into_owned();
        self.undecoded.drain(..complete);
        self.feed(text);
        Ok(())
    }

    fn feed(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        self.input.push_back(StrTendril::from(text));
        match self.tokenizer.feed(&mut self.input) {
            TokenizerResult::Done => {}
            // Only a sink returning `TokenSinkResult::Script` pauses the tokenizer.
            TokenizerResult::Script(()) => {
                unreachable!("token queue never requests a script pause")
            }
        }
    }
}

impl<R: Read> Iterator for TokenStream<R> {
    type Item = io::Result<HeadToken>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.tokenizer.sink.ready.pop_front() {
                return Some(Ok(token));
            }
            if self.finished {
                return None;
            }
            if let Err(err) = self.fill() {
                self.finished = true;
                return Some(Err(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(html: &str) -> Vec<HeadToken> {
        TokenStream::new(html.as_bytes())
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    fn start(name: &str) -> HeadToken {
        HeadToken::StartTag(Tag {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Hands out at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn test_attr_lookup() {
        let tag = Tag::new(
            "meta",
            [("name", "description"), ("content", ""), ("name", "author")],
        );
        assert_eq!(tag.attr("name"), Some("description"));
        assert_eq!(tag.attr("content"), Some(""));
        assert_eq!(tag.attr("property"), None);
    }

    #[test]
    fn test_basic_tokens() {
        let toks = tokens(r#"<head><meta property="og:title" content="A &amp; B"/></head>"#);
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[0], start("head"));
        let HeadToken::StartTag(meta) = &toks[1] else {
            panic!("expected start tag, got {:?}", toks[1]);
        };
        assert_eq!(meta.name, "meta");
        assert!(meta.self_closing);
        assert_eq!(meta.attr("content"), Some("A & B"));
        assert_eq!(toks[2], HeadToken::EndTag("head".to_string()));
    }

    #[test]
    fn test_names_are_lowercased() {
        let toks = tokens(r#"<META PROPERTY="og:type" Content="Website">"#);
        let HeadToken::StartTag(meta) = &toks[0] else {
            panic!("expected start tag");
        };
        assert_eq!(meta.name, "meta");
        assert_eq!(meta.attr("property"), Some("og:type"));
        assert_eq!(meta.attr("content"), Some("Website"));
    }

    #[test]
    fn test_duplicate_attribute_keeps_first() {
        let toks = tokens(r#"<link rel="icon" rel="stylesheet">"#);
        let HeadToken::StartTag(link) = &toks[0] else {
            panic!("expected start tag");
        };
        assert_eq!(link.attr("rel"), Some("icon"));
    }

    #[test]
    fn test_title_text_is_one_token() {
        let toks = tokens("<title>Fish &amp; <b>Chips</b></title>");
        assert_eq!(
            toks,
            vec![
                start("title"),
                HeadToken::Text("Fish & <b>Chips</b>".to_string()),
                HeadToken::EndTag("title".to_string()),
            ]
        );
    }

    #[test]
    fn test_script_content_is_not_markup() {
        let toks = tokens(r#"<script>var s = "</head>";</script><meta name="a">"#);
        assert_eq!(
            toks[1],
            HeadToken::Text(r#"var s = "</head>";"#.to_string())
        );
        assert_eq!(toks[2], HeadToken::EndTag("script".to_string()));
        assert!(matches!(&toks[3], HeadToken::StartTag(tag) if tag.name == "meta"));
    }

    #[test]
    fn test_comments_and_doctype() {
        let toks = tokens("<!DOCTYPE html><!-- note --><head>");
        assert_eq!(toks[0], HeadToken::Other);
        assert_eq!(toks[1], HeadToken::Other);
        assert!(matches!(&toks[2], HeadToken::StartTag(tag) if tag.name == "head"));
    }

    #[test]
    fn test_chunk_boundaries() {
        let html = r#"<head><title>Café – ünïcödé</title><meta name="author" content="Zoë"></head>"#;
        let whole = tokens(html);
        for step in [1, 2, 3, 5, 7] {
            let trickled = TokenStream::new(Trickle {
                data: html.as_bytes(),
                step,
            })
            .collect::<io::Result<Vec<_>>>()
            .unwrap();
            assert_eq!(trickled, whole, "step {step}");
        }
        assert_eq!(whole[2], HeadToken::Text("Café – ünïcödé".to_string()));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let bytes = b"<title>bad \xFF byte</title>";
        let toks = TokenStream::new(&bytes[..])
            .collect::<io::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(toks[1], HeadToken::Text("bad \u{FFFD} byte".to_string()));
    }

    #[test]
    fn test_truncated_utf8_at_eof() {
        let bytes = b"<title>cut \xE2\x82";
        let toks = TokenStream::new(&bytes[..])
            .collect::<io::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(toks[1], HeadToken::Text("cut \u{FFFD}".to_string()));
    }

    #[test]
    fn test_read_error_is_yielded_once() {
        let mut stream = TokenStream::new(Broken);
        let err = stream.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_empty_input() {
        assert!(tokens("").is_empty());
    }
}
