//! HTML parsing for the proceedings archive
//!
//! This module handles the two page shapes the crawler reads:
//! - Year listing pages (`ul.paper-list li a` anchors, one per paper)
//! - Paper detail pages (authors in `<i>` elements, first link ending in `.pdf`)
//!
//! Missing markup is never an error: it yields an empty list or `None`.

use scraper::{Html, Selector};
use url::Url;

/// Maximum length of a sanitized title before the `.pdf` extension
pub const MAX_FILENAME_STEM: usize = 200;

/// A paper anchor found on a year listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperLink {
    /// Anchor text, trimmed
    pub title: String,

    /// Absolute URL of the paper detail page
    pub url: String,
}

/// Information extracted from a paper detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperPage {
    /// Author names in document order
    pub authors: Vec<String>,

    /// Absolute URL of the first PDF link, if any
    pub pdf_url: Option<String>,
}

impl PaperPage {
    /// Authors joined for display, e.g. `"Ada Lovelace, Alan Turing"`
    pub fn authors_display(&self) -> String {
        self.authors.join(", ")
    }
}

/// Extracts the ordered paper anchors from a year listing page
///
/// # Example
///
/// ```
/// use paper_harvest::crawler::extract_paper_links;
/// use url::Url;
///
/// let html = r#"<ul class="paper-list"><li><a href="/paper/1">Attention</a></li></ul>"#;
/// let base = Url::parse("https://papers.nips.cc").unwrap();
/// let links = extract_paper_links(html, &base);
/// assert_eq!(links[0].url, "https://papers.nips.cc/paper/1");
/// ```
pub fn extract_paper_links(html: &str, base_url: &Url) -> Vec<PaperLink> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("ul.paper-list li a") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let url = resolve_link(href, base_url)?;
            let title = element.text().collect::<String>().trim().to_string();
            Some(PaperLink { title, url })
        })
        .collect()
}

/// Parses a paper detail page
///
/// # Arguments
///
/// * `html` - The page body
/// * `base_url` - The site root used to resolve a relative PDF link
pub fn parse_paper_page(html: &str, base_url: &Url) -> PaperPage {
    let document = Html::parse_document(html);

    PaperPage {
        authors: extract_authors(&document),
        pdf_url: extract_pdf_link(&document, base_url),
    }
}

/// Trimmed text of every `<i>` element, empty ones included
fn extract_authors(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("i") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect()
}

/// First anchor whose href ends in `.pdf`, resolved against the base URL
fn extract_pdf_link(document: &Html, base_url: &Url) -> Option<String> {
    let selector = Selector::parse(r#"a[href$=".pdf"]"#).ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .find_map(|href| resolve_link(href, base_url))
}

/// Resolves an href to an absolute http(s) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}

/// Builds a PDF file name from a paper title
///
/// Every character outside `[A-Za-z0-9_.-]` becomes `_`, the result is cut to
/// 200 characters and `.pdf` is appended.
///
/// ```
/// use paper_harvest::crawler::sanitize_filename;
///
/// assert_eq!(sanitize_filename("Deep Nets: A Survey"), "Deep_Nets__A_Survey.pdf");
/// ```
pub fn sanitize_filename(title: &str) -> String {
    let mut name: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_STEM)
        .collect();
    name.push_str(".pdf");
    name
}
