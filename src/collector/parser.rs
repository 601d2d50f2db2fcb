use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

use crate::entry::Entry;

static ENTRY_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.topic-item").expect("Invalid selector"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("#title").expect("Invalid selector"));
static CONTENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.content").expect("Invalid selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("Invalid selector"));
static AUTHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.entry-author").expect("Invalid selector"));
static PERMALINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.entry-date.permalink").expect("Invalid selector"));
static LIST_ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("li").expect("Invalid selector"));

/// Site-specific values the parser needs to build entries.
#[derive(Debug, Clone)]
pub struct ParseRules {
    /// Prepended to page-relative permalinks.
    pub site_origin: String,
    /// Hyperlinks starting with this are collected as images.
    pub media_host_prefix: String,
}

impl ParseRules {
    #[must_use]
    pub fn new(site_origin: &str, media_host_prefix: &str) -> Self {
        Self {
            site_origin: site_origin.trim_end_matches('/').to_string(),
            media_host_prefix: media_host_prefix.to_string(),
        }
    }
}

/// Parse every entry block out of one listing page, in document order.
///
/// Blocks with missing parts still produce an entry with empty fields.
#[must_use]
pub fn parse_listing(html: &str, rules: &ParseRules) -> Vec<Entry> {
    let document = Html::parse_document(html);

    document
        .select(&ENTRY_BLOCK)
        .map(|block| parse_block(&block, rules))
        .collect()
}

fn parse_block(block: &ElementRef, rules: &ParseRules) -> Entry {
    let title = first_attr(block, &TITLE, "data-title");
    let content = block
        .select(&CONTENT)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default();

    let image_urls = block
        .select(&LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.starts_with(&rules.media_host_prefix))
        .map(ToString::to_string)
        .collect();

    let author = first_text(block, &AUTHOR);
    let date = first_text(block, &PERMALINK);
    let permalink = first_attr(block, &PERMALINK, "href");
    let favorite_count = first_attr(block, &LIST_ITEM, "data-favorite-count");

    Entry {
        title,
        content,
        image_urls,
        author,
        date,
        url: format!("{}{permalink}", rules.site_origin),
        favorite_count,
    }
}

fn first_attr(block: &ElementRef, selector: &Selector, attr: &str) -> String {
    block
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn first_text(block: &ElementRef, selector: &Selector) -> String {
    block
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Text content of an element with `<br>` kept as line breaks.
fn element_text(element: &ElementRef) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(el) if el.name() == "br" => text.push('\n'),
            _ => {}
        }
    }
    text.trim().to_string()
}
