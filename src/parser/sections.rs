use tracing::warn;

use super::blocks::Block;
use super::patterns::{MONEY_RES, TIER_PHRASES};

/// Cap on how many sibling blocks are collected under one heading. Guards
/// against malformed input; well-formed pages never get close.
const MAX_SIBLING_WALK: usize = 100;

/// One candidate funding tier: a heading plus the blocks that follow it up to
/// the next heading of any level.
#[derive(Debug, Clone)]
pub struct TierSection {
    pub heading: String,
    pub blocks: Vec<Block>,
}

impl TierSection {
    /// Heading plus the visible text of every body block, space-joined.
    /// This is what the per-field extractors scan.
    pub fn text(&self) -> String {
        let mut parts = vec![self.heading.clone()];
        for block in &self.blocks {
            match block {
                Block::Text(t) => parts.push(t.clone()),
                Block::Link { text, .. } if !text.is_empty() => parts.push(text.clone()),
                _ => {}
            }
        }
        parts.join(" ")
    }
}

/// Walk the document and cut out one section per tier heading (h2/h3 whose
/// text matches a money pattern or a tier phrase). Returns sections in
/// document order; an empty result means the page has no detectable tiers and
/// the caller falls back to a single default tier.
pub fn tier_sections(blocks: &[Block]) -> Vec<TierSection> {
    let mut sections = Vec::new();
    let mut i = 0;

    while i < blocks.len() {
        let heading = match &blocks[i] {
            Block::Heading { level: 2 | 3, text } if is_tier_heading(text) => text.clone(),
            _ => {
                i += 1;
                continue;
            }
        };

        let mut body = Vec::new();
        let mut j = i + 1;
        while j < blocks.len() && !matches!(blocks[j], Block::Heading { .. }) {
            if body.len() >= MAX_SIBLING_WALK {
                warn!(
                    heading = %heading,
                    "section walk hit the {}-block cap, keeping partial content",
                    MAX_SIBLING_WALK
                );
                break;
            }
            body.push(blocks[j].clone());
            j += 1;
        }

        sections.push(TierSection {
            heading,
            blocks: body,
        });
        i = j;
    }

    sections
}

/// A heading introduces a funding tier if it mentions an amount of money or
/// one of the known tier phrases.
pub fn is_tier_heading(text: &str) -> bool {
    if MONEY_RES.iter().any(|re| re.is_match(text)) {
        return true;
    }
    let lower = text.to_lowercase();
    TIER_PHRASES.iter().any(|phrase| lower.contains(phrase))
}
