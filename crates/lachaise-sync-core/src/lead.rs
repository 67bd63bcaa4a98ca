//! Lead-section extraction from rendered encyclopedia HTML.
//!
//! The parsed section 0 of a page contains the intro paragraphs mixed with
//! infoboxes, reference markers, hidden spans and maintenance banners.
//! [`extract_lead`] walks the markup once, keeping a stack of open
//! elements, and only emits the parts a reader would see in the intro.
//!
//! # Rules
//!
//! Output is suppressed while any open element is:
//!
//! - a `table` or a `ref`;
//! - an `ol`, `ul`, `li` or `sup` carrying an `id` or `class`;
//! - a `strong` whose class contains `error`;
//! - a `span` with an `id`, or whose class is `noprint` or `unicode haudio`;
//! - a `small` with an `id`, or whose class contains `metadata`;
//! - any element whose `style` contains `display:none`;
//!
//! and while the outermost open element is a `div`.
//!
//! Visible start tags are written without attributes, except `<a>` which
//! keeps an absolute `href`. An element is kept on close only if text was
//! written inside it (links are always kept); a discarded element also
//! takes a single trailing space or `&nbsp;` token of its parent with it.
//!
//! A `<` that does not open a tag (`x < y`) is kept as text.
//!
//! # Example
//!
//! ```rust
//! use lachaise_sync_core::lead::extract_lead;
//!
//! let html = r#"<p>Text with <sup class="reference">[1]</sup> a <table>ignored</table> tail</p>"#;
//! assert_eq!(extract_lead(html, "en").unwrap(), "<p>Text with  a  tail</p>");
//! ```

use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use thiserror::Error;

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#?[0-9A-Za-z]+;").expect("entity pattern is valid"));

static BARE_LT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([^A-Za-z/!?]|$)").expect("bare lt pattern is valid"));

/// Stands in for a bare `<` while the markup is tokenized.
const LT_MARK: char = '\u{E000}';

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

#[derive(Error, Debug)]
pub enum LeadError {
    #[error("malformed html: {0}")]
    Malformed(#[from] quick_xml::Error),
}

/// One open element.
struct Context {
    tag: String,
    attrs: Vec<(String, String)>,
    has_data: bool,
    content: Vec<String>,
}

impl Context {
    fn new(tag: String, attrs: Vec<(String, String)>) -> Self {
        Self {
            tag,
            attrs,
            has_data: false,
            content: Vec::new(),
        }
    }

    fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(k, _)| k == name)
    }

    fn attr_matches(&self, name: &str, pred: impl Fn(&str) -> bool) -> bool {
        self.attrs.iter().any(|(k, v)| k == name && pred(v.as_str()))
    }

    fn hides_content(&self) -> bool {
        let hidden = match self.tag.as_str() {
            "table" | "ref" => true,
            "ol" | "ul" | "li" | "sup" => self.has_attr("id") || self.has_attr("class"),
            "strong" => self.attr_matches("class", |c| c.contains("error")),
            "span" => {
                self.has_attr("id")
                    || self.attr_matches("class", |c| c == "noprint" || c == "unicode haudio")
            }
            "small" => self.has_attr("id") || self.attr_matches("class", |c| c.contains("metadata")),
            _ => false,
        };
        hidden || self.attr_matches("style", |s| s.contains("display:none"))
    }
}

struct LeadFilter<'l> {
    language: &'l str,
    stack: Vec<Context>,
}

impl<'l> LeadFilter<'l> {
    fn new(language: &'l str) -> Self {
        Self {
            language,
            stack: vec![Context::new("root".into(), Vec::new())],
        }
    }

    fn can_read(&self) -> bool {
        if self.stack.get(1).is_some_and(|c| c.tag == "div") {
            return false;
        }
        !self.stack.iter().any(Context::hides_content)
    }

    fn top(&mut self) -> &mut Context {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() || !self.can_read() {
            return;
        }
        let text = text.replace(LT_MARK, "<");
        let text = text.as_str();
        let top = self.top();
        let mut last = 0;
        for entity in ENTITY.find_iter(text) {
            if entity.start() > last {
                top.content.push(text[last..entity.start()].to_string());
            }
            top.content.push(entity.as_str().to_string());
            last = entity.end();
        }
        if last < text.len() {
            top.content.push(text[last..].to_string());
        }
        top.has_data = true;
    }

    fn start(&mut self, tag: String, attrs: Vec<(String, String)>) {
        self.stack.push(Context::new(tag, attrs));
        if !self.can_read() {
            return;
        }
        let language = self.language;
        let top = self.top();
        let mut pieces = vec![format!("<{}", top.tag)];
        if top.tag == "a" {
            for (_, href) in top.attrs.iter().filter(|(k, _)| k == "href") {
                if href.starts_with("/wiki/") || href.starts_with("/w/") {
                    pieces.push(format!(r#" href="https://{language}.wikipedia.org{href}""#));
                } else if href.starts_with("//") {
                    pieces.push(format!(r#" href="https:{href}""#));
                }
            }
        }
        pieces.push(">".into());
        top.content.extend(pieces);
    }

    fn end(&mut self, tag: &str) {
        // A stray end tag with nothing open is ignored.
        if self.stack.len() < 2 {
            return;
        }
        let readable = self.can_read();
        let Some(mut closed) = self.stack.pop() else {
            return;
        };
        if readable {
            closed.content.push(format!("</{tag}>"));
        }
        let parent = self.top();
        if readable && (closed.has_data || closed.tag == "a") {
            parent.content.push(closed.content.concat());
            parent.has_data = true;
        } else if matches!(
            parent.content.last().map(String::as_str),
            Some(" ") | Some("&nbsp;")
        ) {
            parent.content.pop();
            if parent.content.len() < 2 {
                parent.has_data = false;
            }
        }
    }

    fn finish(self) -> String {
        self.stack
            .into_iter()
            .next()
            .map(|root| root.content.concat().trim().to_string())
            .unwrap_or_default()
    }
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase()
}

fn attributes(e: &BytesStart<'_>) -> Vec<(String, String)> {
    e.html_attributes()
        .filter_map(Result::ok)
        .map(|a| {
            (
                String::from_utf8_lossy(a.key.as_ref()).to_ascii_lowercase(),
                String::from_utf8_lossy(&a.value).into_owned(),
            )
        })
        .collect()
}

/// Extract the visible lead section of `html`, rewriting links for the
/// `language` subdomain.
pub fn extract_lead(html: &str, language: &str) -> Result<String, LeadError> {
    let html = BARE_LT.replace_all(html, |caps: &regex::Captures<'_>| {
        format!("{LT_MARK}{}", &caps[1])
    });
    let mut reader = Reader::from_str(&html);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut filter = LeadFilter::new(language);
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let tag = tag_name(&e);
                let void = VOID_ELEMENTS.contains(&tag.as_str());
                filter.start(tag.clone(), attributes(&e));
                if void {
                    filter.end(&tag);
                }
            }
            Event::Empty(e) => {
                let tag = tag_name(&e);
                filter.start(tag.clone(), attributes(&e));
                filter.end(&tag);
            }
            Event::End(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                filter.end(&tag);
            }
            Event::Text(t) => filter.text(&String::from_utf8_lossy(&t)),
            Event::CData(t) => filter.text(&String::from_utf8_lossy(&t)),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(filter.finish())
}
