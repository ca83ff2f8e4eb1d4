//! Markdown to HTML rendering.
//!
//! The engine is `pulldown-cmark`, driven with a fixed option set. The raw
//! event stream is post-processed before it is used:
//!
//! - adjacent text events are merged so URLs are never split,
//! - bare URLs and e-mail addresses become links (GFM autolinks),
//! - soft line breaks become hard breaks,
//! - every heading gets a slug id, de-duplicated with numeric suffixes.
//!
//! The same processed stream feeds both the HTML writer and the block list
//! the egui display draws from, so the two never disagree.

use std::collections::HashMap;
use std::sync::OnceLock;

use pulldown_cmark::{html, Event, LinkType, Options, Parser, Tag};
use regex::Regex;

use crate::markdown_view::{parse_events, MarkdownElement};

/// Engine configuration. The defaults are the viewer's fixed option set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Single newlines inside a paragraph become line breaks.
    pub breaks: bool,
    /// Tables, strikethrough, task lists and bare-URL autolinks.
    pub gfm: bool,
    /// Generate `id` attributes for headings.
    pub header_ids: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            breaks: true,
            gfm: true,
            header_ids: true,
        }
    }
}

impl RenderOptions {
    fn parser_options(&self) -> Options {
        let mut options = Options::empty();
        if self.gfm {
            options.insert(Options::ENABLE_TABLES);
            options.insert(Options::ENABLE_STRIKETHROUGH);
            options.insert(Options::ENABLE_TASKLISTS);
            options.insert(Options::ENABLE_FOOTNOTES);
        }
        options
    }
}

/// Output of one render: the HTML plus the blocks drawn on screen.
#[derive(Debug, Clone, Default)]
pub struct RenderedDocument {
    pub html: String,
    pub blocks: Vec<MarkdownElement>,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("the Markdown renderer is not available")]
    Unavailable,
    #[error("{0}")]
    Failed(String),
    #[error("the Markdown renderer crashed: {0}")]
    Panicked(String),
}

/// Anything that can turn Markdown text into a document.
pub trait Renderer {
    fn render(&self, source: &str) -> Result<RenderedDocument, RenderError>;
}

/// The default renderer backed by `pulldown-cmark`.
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    options: RenderOptions,
}

impl HtmlRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, source: &str) -> Result<RenderedDocument, RenderError> {
        let options = self.options;
        catch_render_panic(|| {
            with_events(source, &options, |events| {
                let mut html_out = String::with_capacity(source.len() * 3 / 2);
                html::push_html(&mut html_out, events.iter().cloned());
                RenderedDocument {
                    html: html_out,
                    blocks: parse_events(events),
                }
            })
        })
    }
}

/// Run `render`, turning a panic into `RenderError::Panicked`.
fn catch_render_panic(
    render: impl FnOnce() -> RenderedDocument,
) -> Result<RenderedDocument, RenderError> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(render)).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::error!("renderer panicked: {message}");
        RenderError::Panicked(message)
    })
}

/// Parse `source` and hand the processed event stream to `f`.
pub fn with_events<R>(
    source: &str,
    options: &RenderOptions,
    f: impl FnOnce(&[Event<'_>]) -> R,
) -> R {
    let mut events: Vec<Event> = Parser::new_ext(source, options.parser_options()).collect();
    events = merge_text(events);
    if options.gfm {
        events = autolink(events);
    }
    if options.breaks {
        events = events
            .into_iter()
            .map(|event| match event {
                Event::SoftBreak => Event::HardBreak,
                other => other,
            })
            .collect();
    }
    let slugs = if options.header_ids {
        heading_slugs(&events)
    } else {
        Vec::new()
    };
    let events = attach_heading_ids(events, &slugs);
    f(&events)
}

fn merge_text(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out: Vec<Event> = Vec::with_capacity(events.len());
    for event in events {
        if let Event::Text(text) = &event {
            if let Some(Event::Text(prev)) = out.last_mut() {
                let mut joined = prev.to_string();
                joined.push_str(text);
                *prev = joined.into();
                continue;
            }
        }
        out.push(event);
    }
    out
}

// ---------------------------------------------------------------------------
// Autolinks
// ---------------------------------------------------------------------------

/// A bare link found inside a text run.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FoundLink {
    start: usize,
    end: usize,
    href: String,
}

fn autolink_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)(?P<url>\b(?:https?://|www\.)[^\s<]*[^\s<?!.,:;*_~'\x22])",
            r"|(?P<email>[a-z0-9._+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,})",
        ))
        .expect("autolink pattern is valid")
    })
}

fn find_autolinks(text: &str) -> Vec<FoundLink> {
    let mut found = Vec::new();
    for caps in autolink_pattern().captures_iter(text) {
        if let Some(url) = caps.name("url") {
            let trimmed = trim_unbalanced_parens(url.as_str());
            let href = if trimmed.to_ascii_lowercase().starts_with("www.") {
                format!("http://{trimmed}")
            } else {
                trimmed.to_string()
            };
            found.push(FoundLink {
                start: url.start(),
                end: url.start() + trimmed.len(),
                href,
            });
        } else if let Some(email) = caps.name("email") {
            // Addresses are linked verbatim, never entity-obfuscated.
            found.push(FoundLink {
                start: email.start(),
                end: email.end(),
                href: format!("mailto:{}", email.as_str()),
            });
        }
    }
    found
}

/// Drop trailing `)` characters that have no matching `(` in the URL.
fn trim_unbalanced_parens(url: &str) -> &str {
    let mut end = url.len();
    while url[..end].ends_with(')') {
        let slice = &url[..end];
        let opens = slice.matches('(').count();
        let closes = slice.matches(')').count();
        if closes <= opens {
            break;
        }
        end -= 1;
    }
    &url[..end]
}

fn autolink(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    // Links, images and code blocks are never linkified.
    let mut opaque = 0usize;
    for event in events {
        match &event {
            Event::Start(Tag::Link(..) | Tag::Image(..) | Tag::CodeBlock(_)) => opaque += 1,
            Event::End(Tag::Link(..) | Tag::Image(..) | Tag::CodeBlock(_)) => {
                opaque = opaque.saturating_sub(1);
            }
            Event::Text(text) if opaque == 0 => {
                let links = find_autolinks(text);
                if !links.is_empty() {
                    let mut last = 0;
                    for link in links {
                        if link.start > last {
                            out.push(Event::Text(text[last..link.start].to_string().into()));
                        }
                        let tag = Tag::Link(LinkType::Autolink, link.href.into(), "".into());
                        out.push(Event::Start(tag.clone()));
                        out.push(Event::Text(text[link.start..link.end].to_string().into()));
                        out.push(Event::End(tag));
                        last = link.end;
                    }
                    if last < text.len() {
                        out.push(Event::Text(text[last..].to_string().into()));
                    }
                    continue;
                }
            }
            _ => {}
        }
        out.push(event);
    }
    out
}

// ---------------------------------------------------------------------------
// Heading ids
// ---------------------------------------------------------------------------

/// Lowercase, strip punctuation, turn whitespace into dashes.
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !is_slug_punctuation(*c))
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}

fn is_slug_punctuation(c: char) -> bool {
    matches!(c, '\u{2000}'..='\u{206F}' | '\u{2E00}'..='\u{2E7F}')
        || (c.is_ascii_punctuation() && c != '-' && c != '_')
}

/// Hands out unique slugs: the first `intro` is `intro`, the next is
/// `intro-1`, and so on, skipping any suffix already taken.
#[derive(Debug, Default)]
struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    fn unique(&mut self, base: String) -> String {
        let Some(&count) = self.seen.get(&base) else {
            self.seen.insert(base.clone(), 0);
            return base;
        };
        let mut count = count;
        let candidate = loop {
            count += 1;
            let candidate = format!("{base}-{count}");
            if !self.seen.contains_key(&candidate) {
                break candidate;
            }
        };
        self.seen.insert(base, count);
        self.seen.insert(candidate.clone(), 0);
        candidate
    }
}

fn heading_slugs(events: &[Event<'_>]) -> Vec<String> {
    let mut slugger = Slugger::default();
    let mut slugs = Vec::new();
    let mut current: Option<String> = None;
    for event in events {
        match event {
            Event::Start(Tag::Heading(..)) => current = Some(String::new()),
            Event::Text(text) | Event::Code(text) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(text);
                }
            }
            Event::End(Tag::Heading(..)) => {
                if let Some(text) = current.take() {
                    slugs.push(slugger.unique(slugify(&text)));
                }
            }
            _ => {}
        }
    }
    slugs
}

fn attach_heading_ids<'a>(events: Vec<Event<'a>>, slugs: &'a [String]) -> Vec<Event<'a>> {
    let mut ids = slugs.iter();
    events
        .into_iter()
        .map(|event| match event {
            Event::Start(Tag::Heading(level, None, classes)) => {
                Event::Start(Tag::Heading(level, ids.next().map(String::as_str), classes))
            }
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(source: &str) -> RenderedDocument {
        HtmlRenderer::default().render(source).expect("render")
    }

    #[test]
    fn test_plain_text_is_single_paragraph() {
        let doc = render("Hello world");
        assert_eq!(doc.html, "<p>Hello world</p>\n");
        assert_eq!(doc.blocks.len(), 1);
        assert!(matches!(doc.blocks[0], MarkdownElement::Paragraph(_)));
    }

    #[test]
    fn test_soft_breaks_become_line_breaks() {
        let doc = render("first\nsecond");
        assert!(doc.html.contains("first<br />"), "{}", doc.html);

        let off = HtmlRenderer::new(RenderOptions {
            breaks: false,
            ..Default::default()
        })
        .render("first\nsecond")
        .expect("render");
        assert!(!off.html.contains("<br"));
    }

    #[test]
    fn test_gfm_tables_and_strikethrough() {
        let doc = render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(doc.html.contains("<table>"));
        assert!(doc.html.contains("<del>gone</del>"));
        assert!(doc
            .blocks
            .iter()
            .any(|b| matches!(b, MarkdownElement::Table { .. })));
    }

    #[test]
    fn test_heading_ids_are_slugged_and_unique() {
        let doc = render("# Hello, World!\n\n## Hello World\n\n## hello world");
        assert!(doc.html.contains(r#"<h1 id="hello-world">"#), "{}", doc.html);
        assert!(doc.html.contains(r#"<h2 id="hello-world-1">"#));
        assert!(doc.html.contains(r#"<h2 id="hello-world-2">"#));
    }

    #[test]
    fn test_heading_ids_can_be_disabled() {
        let doc = HtmlRenderer::new(RenderOptions {
            header_ids: false,
            ..Default::default()
        })
        .render("# Title")
        .expect("render");
        assert_eq!(doc.html, "<h1>Title</h1>\n");
    }

    #[test]
    fn test_bare_urls_are_autolinked() {
        let doc = render("visit https://example.com/path_(x)). or www.rust-lang.org!");
        assert!(
            doc.html
                .contains(r#"<a href="https://example.com/path_(x)">https://example.com/path_(x)</a>)."#),
            "{}",
            doc.html
        );
        assert!(doc
            .html
            .contains(r#"<a href="http://www.rust-lang.org">www.rust-lang.org</a>!"#));
    }

    #[test]
    fn test_emails_are_linked_without_mangling() {
        let doc = render("mail me@example.com today");
        assert!(doc
            .html
            .contains(r#"<a href="mailto:me@example.com">me@example.com</a>"#));
    }

    #[test]
    fn test_code_and_existing_links_are_not_autolinked() {
        let doc = render("[site](https://a.example) and `https://b.example`\n\n```\nhttps://c.example\n```");
        assert_eq!(doc.html.matches("<a ").count(), 1, "{}", doc.html);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Intro & Setup  "), "intro--setup");
        assert_eq!(slugify("API v2.0"), "api-v20");
        assert_eq!(slugify("snake_case-name"), "snake_case-name");
    }

    #[test]
    fn test_slugger_skips_taken_suffixes() {
        let mut slugger = Slugger::default();
        assert_eq!(slugger.unique("a-1".into()), "a-1");
        assert_eq!(slugger.unique("a".into()), "a");
        assert_eq!(slugger.unique("a".into()), "a-2");
    }

    #[test]
    fn test_trim_unbalanced_parens() {
        assert_eq!(trim_unbalanced_parens("http://x/(a)"), "http://x/(a)");
        assert_eq!(trim_unbalanced_parens("http://x/a)"), "http://x/a");
        assert_eq!(trim_unbalanced_parens("http://x/(a))"), "http://x/(a)");
    }

    #[test]
    fn test_empty_source() {
        let doc = render("");
        assert!(doc.html.is_empty());
        assert!(doc.blocks.is_empty());
    }

    #[test]
    fn test_panicking_render_is_captured() {
        let err = catch_render_panic(|| panic!("table walk overflowed")).unwrap_err();
        assert!(matches!(err, RenderError::Panicked(ref msg) if msg == "table walk overflowed"));

        let code = 7;
        let err = catch_render_panic(|| panic!("bad block {code}")).unwrap_err();
        assert!(matches!(err, RenderError::Panicked(ref msg) if msg == "bad block 7"));

        let err = catch_render_panic(|| std::panic::panic_any(42_u8)).unwrap_err();
        assert!(matches!(err, RenderError::Panicked(ref msg) if msg == "unknown panic"));
    }

    #[test]
    fn test_non_panicking_render_passes_through() {
        let doc = catch_render_panic(|| RenderedDocument {
            html: "<p>x</p>\n".into(),
            blocks: Vec::new(),
        })
        .expect("render");
        assert_eq!(doc.html, "<p>x</p>\n");
    }
}
