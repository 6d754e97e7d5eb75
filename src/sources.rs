use anyhow::{Context, Result};
use tracing::info;

/// Path fragments that mark a sitemap URL as a funding/grants page. Council
/// sites are inconsistent; this list is deliberately broad and the parser
/// copes with the false positives (they fall back to a single default tier).
const FUNDING_PATH_HINTS: &[&str] = &["grant", "fund", "bursary", "award"];

/// Fetch a council sitemap and return (url, slug) pairs for the pages that
/// look like funding opportunities.
pub async fn fetch_funding_urls(sitemap_url: &str) -> Result<Vec<(String, String)>> {
    let client = reqwest::Client::new();

    info!("Fetching sitemap: {}", sitemap_url);
    let xml = client
        .get(sitemap_url)
        .send()
        .await?
        .text()
        .await
        .context("Failed to fetch sitemap")?;

    let all_urls = parse_urlset(&xml)?;
    info!("Total URLs in sitemap: {}", all_urls.len());

    let filtered: Vec<(String, String)> = all_urls
        .into_iter()
        .filter_map(|url| {
            let slug = funding_slug(&url)?;
            Some((url, slug))
        })
        .collect();

    info!("Funding pages after filtering: {}", filtered.len());
    Ok(filtered)
}

/// Slug for a funding page URL: the last non-empty path segment, lower-cased.
/// Returns None for URLs whose path carries no funding hint.
fn funding_slug(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let path = parsed.path().to_lowercase();
    if !FUNDING_PATH_HINTS.iter().any(|hint| path.contains(hint)) {
        return None;
    }
    let segment = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()?;
    Some(segment.to_lowercase())
}

/// Parse a urlset XML and return all <loc> URLs.
fn parse_urlset(xml: &str) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut urls = Vec::new();
    let mut in_url = false;
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.name().as_ref() {
                b"url" => in_url = true,
                b"loc" if in_url => in_loc = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(e)) if in_loc => {
                urls.push(e.unescape()?.to_string());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.name().as_ref() {
                b"loc" => in_loc = false,
                b"url" => in_url = false,
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlset_parsing() {
        let xml = r#"<?xml version="1.0"?>
            <urlset>
              <url><loc>https://example.gov.uk/grants/small-grants</loc></url>
              <url><loc>https://example.gov.uk/bins/collection-days</loc></url>
            </urlset>"#;
        let urls = parse_urlset(xml).unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], "https://example.gov.uk/grants/small-grants");
    }

    #[test]
    fn funding_slug_filters_and_derives() {
        assert_eq!(
            funding_slug("https://example.gov.uk/grants/Small-Grants"),
            Some("small-grants".to_string())
        );
        assert_eq!(
            funding_slug("https://example.gov.uk/community-fund/"),
            Some("community-fund".to_string())
        );
        assert_eq!(funding_slug("https://example.gov.uk/bins/collection-days"), None);
        assert_eq!(funding_slug("not a url"), None);
    }
}
