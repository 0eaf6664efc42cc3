// src/core/scanner/page_scanner.rs

use std::collections::HashSet;

use once_cell::sync::Lazy;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::core::error::FetchError;
use crate::core::models::PageSummary;

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[name=description]").unwrap());
static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Elements whose content is never rendered as text.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that break words apart when text is rendered.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Fetches the target page and extracts its content metrics.
///
/// Redirects are followed and non-2xx responses are parsed like any other
/// page. Only transport failures, timeouts, unreadable bodies and non-markup
/// content types are errors.
pub async fn run_page_scan(client: &Client, url: &str) -> Result<PageSummary, FetchError> {
    info!(url, "Starting page fetch.");

    let response = client.get(url).send().await.map_err(|e| {
        warn!(url, error = %e, "Page request failed.");
        FetchError::from_request(url, e)
    })?;

    let status = response.status();
    let final_url = response.url().clone();
    debug!(%status, final_url = %final_url, "Received page response.");

    if let Some(content_type) = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        if !is_markup(content_type) {
            warn!(url, content_type, "Refusing to parse non-markup content.");
            return Err(FetchError::UnsupportedContentType {
                url: url.to_string(),
                content_type: content_type.to_string(),
            });
        }
    }

    let body = response.text().await.map_err(|source| {
        warn!(url, error = %source, "Failed to read page body.");
        if source.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else {
            FetchError::Body { url: url.to_string(), source }
        }
    })?;
    debug!(bytes = body.len(), "Read page body.");

    let summary = parse_page(&body, &final_url);
    info!(
        title = %summary.title,
        words = summary.word_count,
        links = summary.links.len(),
        "Page fetch finished."
    );
    Ok(summary)
}

/// Extracts title, description, word count and links from an HTML document.
/// Relative links are resolved against `base`.
pub fn parse_page(html: &str, base: &Url) -> PageSummary {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default();

    let meta_description = document
        .select(&META_DESCRIPTION)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
        .unwrap_or_default();

    let mut text = String::new();
    collect_visible_text(document.root_element(), &mut text);
    let word_count = u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX);

    PageSummary { title, meta_description, word_count, links: extract_links(&document, base) }
}

fn extract_links(document: &Html, base: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for anchor in document.select(&ANCHORS) {
        let Some(href) = anchor.value().attr("href") else { continue };
        let Ok(absolute) = base.join(href.trim()) else {
            debug!(href, "Skipping unresolvable link.");
            continue;
        };
        let absolute = absolute.to_string();
        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }
    links
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if HIDDEN_ELEMENTS.contains(&name) {
                continue;
            }
            let breaks = BLOCK_ELEMENTS.contains(&name);
            if breaks {
                out.push(' ');
            }
            collect_visible_text(child_element, out);
            if breaks {
                out.push(' ');
            }
        } else if let Node::Text(text) = child.value() {
            out.push_str(text);
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_markup(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    mime.is_empty() || mime.starts_with("text/") || mime.ends_with("/xml") || mime.ends_with("+xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>  Example
      Domain </title>
    <meta name="description" content="An example page">
    <style>body { color: red; }</style>
  </head>
  <body>
    <h1>Hello world</h1>
    <p>This is <b>bold</b> text.</p>
    <script>var hidden = "not counted";</script>
    <a href="/about">About</a>
    <a href="https://other.test/page">Other</a>
    <a href="/about">About again</a>
    <a href="mailto:someone@example.test">Mail</a>
    <a href="">Self</a>
  </body>
</html>"#;

    fn base() -> Url {
        Url::parse("https://example.test/index.html").unwrap()
    }

    #[test]
    fn extracts_title_and_description() {
        let summary = parse_page(PAGE, &base());
        assert_eq!(summary.title, "Example Domain");
        assert_eq!(summary.meta_description, "An example page");
    }

    #[test]
    fn counts_rendered_words_only() {
        let summary = parse_page(PAGE, &base());
        // Hello world / This is bold text. / About / Other / About again / Mail / Self
        assert_eq!(summary.word_count, 12);
    }

    #[test]
    fn links_are_absolute_distinct_and_ordered() {
        let summary = parse_page(PAGE, &base());
        assert_eq!(
            summary.links,
            vec![
                "https://example.test/about",
                "https://other.test/page",
                "mailto:someone@example.test",
                "https://example.test/index.html",
            ]
        );
    }

    #[test]
    fn non_http_targets_are_counted_as_links() {
        let html = r#"<a href="/x">x</a><a href="mailto:a@b.test">m</a><a href="tel:+123">t</a>"#;
        let summary = parse_page(html, &Url::parse("https://example.test/").unwrap());
        assert_eq!(summary.links, vec!["https://example.test/x", "mailto:a@b.test", "tel:+123"]);
    }

    #[test]
    fn empty_document_yields_empty_summary() {
        let summary = parse_page("", &base());
        assert_eq!(summary, PageSummary::default());
    }

    #[test]
    fn markup_content_types() {
        assert!(is_markup("text/html; charset=utf-8"));
        assert!(is_markup("application/xhtml+xml"));
        assert!(is_markup("application/xml"));
        assert!(!is_markup("image/png"));
        assert!(!is_markup("application/json"));
    }

    #[tokio::test]
    async fn fetch_follows_redirects_and_accepts_error_statuses() {
        let mut server = mockito::Server::new_async().await;
        let _redirect = server
            .mock("GET", "/")
            .with_status(301)
            .with_header("location", "/moved")
            .create_async()
            .await;
        let _moved = server
            .mock("GET", "/moved")
            .with_status(404)
            .with_header("content-type", "text/html")
            .with_body("<html><head><title>Gone</title></head><body><a href=\"next\">n</a></body></html>")
            .create_async()
            .await;

        let client = Client::builder().timeout(Duration::from_secs(5)).build().unwrap();
        let summary = run_page_scan(&client, &server.url()).await.unwrap();

        assert_eq!(summary.title, "Gone");
        assert_eq!(summary.links, vec![format!("{}/next", server.url())]);
    }

    #[tokio::test]
    async fn fetch_rejects_binary_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body([0u8, 1, 2, 3])
            .create_async()
            .await;

        let client = Client::new();
        let result = run_page_scan(&client, &server.url()).await;
        assert!(matches!(result, Err(FetchError::UnsupportedContentType { .. })));
    }

    #[tokio::test]
    async fn fetch_fails_on_refused_connection() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let client = Client::new();
        let result = run_page_scan(&client, &url).await;
        assert!(matches!(result, Err(FetchError::Request { .. })));
    }
}
