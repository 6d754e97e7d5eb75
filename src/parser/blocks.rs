use std::sync::LazyLock;

use regex::Regex;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());
static SINGLE_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]*)\]\(([^)]+)\)$").unwrap());
static INLINE_LINKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").unwrap());
static CLOSE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\]\(([^)]+)\)").unwrap());

/// The document representation the parser works on. Scraped pages arrive as
/// markdown; each line becomes one block. Heading levels carry the h1–h6
/// structure the section segmenter walks.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Link { text: String, url: String },
    Text(String),
    Empty,
}

pub fn classify_lines(markdown: &str) -> Vec<Block> {
    if markdown.trim().is_empty() {
        return vec![Block::Empty];
    }

    let lines: Vec<&str> = markdown.lines().collect();
    let mut blocks = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();

        if line.is_empty() {
            blocks.push(Block::Empty);
            i += 1;
            continue;
        }

        // ── Multi-line link: "[" then text lines until ](url) ──
        if line == "[" {
            i = consume_multiline_link(&lines, i, &mut blocks);
            continue;
        }

        // ── Stray continuation: ](url) — emit as bare link ──
        if let Some(caps) = CLOSE_LINK_RE.captures(line) {
            blocks.push(Block::Link {
                text: String::new(),
                url: caps[1].to_string(),
            });
            i += 1;
            continue;
        }

        // ── Heading: ## text ──
        if let Some(caps) = HEADING_RE.captures(line) {
            blocks.push(Block::Heading {
                level: caps[1].len() as u8,
                text: caps[2].trim().to_string(),
            });
            i += 1;
            continue;
        }

        // ── Whole line is one link: [text](url) ──
        if let Some(caps) = SINGLE_LINK_RE.captures(line) {
            blocks.push(Block::Link {
                text: caps[1].trim().to_string(),
                url: caps[2].to_string(),
            });
            i += 1;
            continue;
        }

        // ── Prose with inline links. Funding pages put deadlines and apply
        // links in the same sentence, so both the links and the surrounding
        // text must survive. Anchor text reaches the section text through the
        // Link block; the residue keeps only the prose. ──
        if line.contains("](") {
            for caps in INLINE_LINKS_RE.captures_iter(line) {
                blocks.push(Block::Link {
                    text: caps[1].trim().to_string(),
                    url: caps[2].to_string(),
                });
            }
            let stripped = INLINE_LINKS_RE.replace_all(line, "");
            let residue = stripped.trim().trim_end_matches('[').trim_end();
            if !residue.is_empty() {
                blocks.push(Block::Text(residue.to_string()));
            }
            if line.ends_with('[') {
                i = consume_multiline_link(&lines, i + 1, &mut blocks);
                continue;
            }
            i += 1;
            continue;
        }

        // ── Plain text ──
        blocks.push(Block::Text(line.to_string()));
        i += 1;
    }

    blocks
}

/// Consume a multi-line link starting at `start` (a "[" line, or the line
/// after a trailing "["). Reads text lines until ](url). Returns the next
/// line index to process.
fn consume_multiline_link(lines: &[&str], start: usize, blocks: &mut Vec<Block>) -> usize {
    let mut text_parts = Vec::new();
    let mut j = start;

    if j < lines.len() && lines[j].trim() == "[" {
        j += 1;
    }

    while j < lines.len() {
        let l = lines[j].trim();
        if let Some(url_part) = l.strip_prefix("](") {
            let url = url_part.split(')').next().unwrap_or(url_part);
            blocks.push(Block::Link {
                text: text_parts.join(" "),
                url: url.to_string(),
            });
            return j + 1;
        }
        text_parts.push(l);
        j += 1;
    }

    // Never found the closing ](url) — keep the text
    for part in text_parts {
        blocks.push(Block::Text(part.to_string()));
    }
    j
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading() {
        let blocks = classify_lines("## Small grants of up to £5,000");
        assert!(
            matches!(&blocks[0], Block::Heading { level: 2, text } if text == "Small grants of up to £5,000")
        );
    }

    #[test]
    fn single_link() {
        let blocks = classify_lines("[Apply now](https://apply.example.gov.uk/form)");
        assert!(
            matches!(&blocks[0], Block::Link { text, url } if text == "Apply now" && url == "https://apply.example.gov.uk/form")
        );
    }

    #[test]
    fn inline_link_keeps_prose() {
        let blocks =
            classify_lines("Applications close on 1 May 2025. [Apply here](https://example.org/a)");
        let links: Vec<_> = blocks
            .iter()
            .filter(|b| matches!(b, Block::Link { .. }))
            .collect();
        assert_eq!(links.len(), 1);
        assert!(blocks
            .iter()
            .any(|b| matches!(b, Block::Text(t) if t.contains("close on 1 May 2025"))));
    }

    #[test]
    fn multiline_link() {
        let md = "[\nApplication form\n](https://example.gov.uk/apply)";
        let blocks = classify_lines(md);
        assert!(
            matches!(&blocks[0], Block::Link { text, url } if text == "Application form" && url == "https://example.gov.uk/apply")
        );
    }

    #[test]
    fn stray_continuation_link() {
        let blocks = classify_lines("](https://example.org/x)");
        assert!(matches!(&blocks[0], Block::Link { text, url } if text.is_empty() && url == "https://example.org/x"));
    }

    #[test]
    fn empty_string() {
        let blocks = classify_lines("");
        assert_eq!(blocks, vec![Block::Empty]);
    }

    #[test]
    fn empty_line_between_text() {
        let blocks = classify_lines("text\n\nmore");
        assert!(matches!(&blocks[1], Block::Empty));
    }
}
