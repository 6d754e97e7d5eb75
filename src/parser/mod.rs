pub mod blocks;
pub mod extract;
pub mod patterns;
pub mod sections;

use crate::db::ScrapedPage;
use crate::model::FundingOpportunity;
use crate::variants;
use blocks::Block;

/// Everything the parser produces for one page: the opportunity (variants
/// attached, top-level fields projected) plus the raw tier sections kept for
/// QA review.
pub struct ParsedPage {
    pub page_data_id: i64,
    pub opportunity: FundingOpportunity,
    /// (heading, searched section text) per detected tier section.
    pub sections: Vec<(String, String)>,
}

/// Three-pass pipeline: markdown → blocks → tier sections → variants, then
/// the primary variant is projected onto the flattened top-level fields.
pub fn process_page(page: &ScrapedPage) -> ParsedPage {
    let blocks = blocks::classify_lines(&page.markdown);
    let tier_sections = sections::tier_sections(&blocks);
    let variants = extract::build_variants(&tier_sections);

    let mut opportunity = FundingOpportunity::new(&page.slug, &page.url, page_title(&blocks));
    opportunity.variants = variants;
    variants::apply_primary_to_top_level(&mut opportunity);

    let sections = tier_sections
        .iter()
        .map(|section| (section.heading.clone(), section.text()))
        .collect();

    ParsedPage {
        page_data_id: page.page_data_id,
        opportunity,
        sections,
    }
}

/// Page title: the first h1, else the first plain text line.
fn page_title(blocks: &[Block]) -> Option<String> {
    blocks
        .iter()
        .find_map(|block| match block {
            Block::Heading { level: 1, text } => Some(text.clone()),
            _ => None,
        })
        .or_else(|| {
            blocks.iter().find_map(|block| match block {
                Block::Text(text) => Some(text.clone()),
                _ => None,
            })
        })
}
