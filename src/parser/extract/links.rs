use crate::parser::blocks::Block;

const APPLY_WORDS: &[&str] = &["apply", "application", "form", "submit"];

/// Hosts that look like dedicated application portals beat in-page or
/// document links.
const PORTAL_HINTS: &[&str] = &["apply.", "portal.", "external."];

/// Pick the application link for a section: anchors qualify by their link
/// text, portal-looking targets win, otherwise the first absolute qualifying
/// link does.
pub fn extract(blocks: &[Block]) -> Option<String> {
    let qualifying: Vec<&str> = blocks
        .iter()
        .filter_map(|block| match block {
            Block::Link { text, url } => {
                let lower = text.to_lowercase();
                APPLY_WORDS
                    .iter()
                    .any(|word| lower.contains(word))
                    .then_some(url.as_str())
            }
            _ => None,
        })
        .collect();

    if let Some(url) = qualifying
        .iter()
        .find(|url| PORTAL_HINTS.iter().any(|hint| url.contains(hint)))
    {
        return Some((*url).to_string());
    }

    qualifying
        .iter()
        .find(|url| url.starts_with("http"))
        .map(|url| (*url).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(text: &str, url: &str) -> Block {
        Block::Link {
            text: text.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn portal_host_beats_earlier_plain_link() {
        let blocks = vec![
            link("Application guidance", "https://www.example.gov.uk/guidance"),
            link("Apply online", "https://apply.example.gov.uk/grants"),
        ];
        assert_eq!(
            extract(&blocks).as_deref(),
            Some("https://apply.example.gov.uk/grants")
        );
    }

    #[test]
    fn first_absolute_qualifying_link_otherwise() {
        let blocks = vec![
            link("Our newsletter", "https://example.org/news"),
            link("Submit your project", "https://example.org/submit"),
            link("Application form", "https://example.org/form"),
        ];
        assert_eq!(extract(&blocks).as_deref(), Some("https://example.org/submit"));
    }

    #[test]
    fn relative_links_do_not_qualify_as_fallback() {
        let blocks = vec![link("Apply now", "/grants/apply-page")];
        assert_eq!(extract(&blocks), None);
    }

    #[test]
    fn anchor_text_gates_qualification() {
        let blocks = vec![link("Read more", "https://apply.example.org/info")];
        assert_eq!(extract(&blocks), None);
    }

    #[test]
    fn no_links_is_none() {
        let blocks = vec![Block::Text("no anchors here".into())];
        assert_eq!(extract(&blocks), None);
    }
}
