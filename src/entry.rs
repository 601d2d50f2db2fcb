use serde::Serialize;

/// One favorited forum entry as parsed from a listing page.
///
/// Every field is filled at parse time; parts missing from the markup are
/// empty strings rather than absent values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Topic title the entry was posted under.
    pub title: String,
    /// Body text, may be empty.
    pub content: String,
    /// Image links on the media host, in document order.
    pub image_urls: Vec<String>,
    /// Display name of the author.
    pub author: String,
    /// Display-formatted date, kept as the page shows it.
    pub date: String,
    /// Absolute permalink.
    pub url: String,
    /// Favorite count as the page reports it, not validated.
    pub favorite_count: String,
}
