//! Article text extraction from raw HTML.
//!
//! Scripts, styles, and `<noscript>` blocks are dropped, the remaining text
//! nodes of `<body>` are flattened with block elements starting new lines,
//! and a publish date is looked up via [`dates`].

pub mod dates;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

/// Minimum extracted characters for a page to count as an article.
pub const MIN_ARTICLE_CHARS: usize = 200;

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript"];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).expect("valid selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));

/// What the extractor pulled out of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPage {
    pub title: String,
    pub text: String,
    pub published_at: Option<String>,
}

impl ExtractedPage {
    /// Whether the body is long enough to store.
    pub fn is_acceptable(&self) -> bool {
        self.text.chars().count() >= MIN_ARTICLE_CHARS
    }
}

pub fn extract_article(html: &str) -> ExtractedPage {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .or_else(|| {
            document
                .select(&OG_TITLE)
                .next()
                .and_then(|m| m.value().attr("content"))
                .map(collapse_whitespace)
        })
        .unwrap_or_default();

    let root = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element());
    let mut raw = String::new();
    flatten_text(root, &mut raw);
    let text = raw
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let published_at = dates::extract_published_date(&document, &text);

    ExtractedPage {
        title,
        text,
        published_at,
    }
}

fn flatten_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    flatten_text(child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scripts_and_keeps_paragraphs() {
        let html = r#"<html><head><title> Store Openings </title>
            <style>body { color: red }</style></head>
            <body>
              <script>var tracking = 1;</script>
              <noscript>Enable JavaScript</noscript>
              <h1>Store   openings surge</h1>
              <p>First <b>paragraph</b> text.</p>
              <p>Second paragraph.</p>
            </body></html>"#;

        let page = extract_article(html);
        assert_eq!(page.title, "Store Openings");
        assert_eq!(
            page.text,
            "Store openings surge\nFirst paragraph text.\nSecond paragraph."
        );
        assert!(!page.text.contains("tracking"));
        assert!(!page.text.contains("JavaScript"));
        assert!(!page.text.contains("color"));
    }

    #[test]
    fn test_title_falls_back_to_og_title() {
        let html = r#"<html><head><meta property="og:title" content="Holiday outlook"></head>
            <body><p>x</p></body></html>"#;
        assert_eq!(extract_article(html).title, "Holiday outlook");
    }

    #[test]
    fn test_acceptance_threshold() {
        let short = format!("<html><body><p>{}</p></body></html>", "a".repeat(199));
        let exact = format!("<html><body><p>{}</p></body></html>", "a".repeat(200));
        assert!(!extract_article(&short).is_acceptable());
        assert!(extract_article(&exact).is_acceptable());
    }

    #[test]
    fn test_published_date_from_body_text() {
        let html = r#"<html><body><p>Published on 2025-02-14</p><p>Body</p></body></html>"#;
        assert_eq!(
            extract_article(html).published_at.as_deref(),
            Some("2025-02-14")
        );
    }

    #[test]
    fn test_malformed_html_does_not_panic() {
        let page = extract_article("<html><body><p>unclosed <div><span>text");
        assert_eq!(page.text, "unclosed\ntext");
        assert_eq!(page.title, "");
    }
}
