pub mod amounts;
pub mod dates;
pub mod delivery;
pub mod links;
pub mod rounds;
pub mod window;

use std::sync::LazyLock;

use regex::Regex;

use super::sections::TierSection;
use crate::model::{
    ApplicationRound, ApplicationWindow, DeliveryPeriod, OpportunityVariant, DEFAULT_CURRENCY,
};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const DEFAULT_TIER_TITLE: &str = "Main Grant";
const DEFAULT_TIER_NOTES: &str = "Default tier created from main content";

/// One detected funding tier, before it becomes a variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub title: String,
    pub grant_min: Option<f64>,
    pub grant_max: Option<f64>,
    pub currency: String,
    pub application_window: Option<ApplicationWindow>,
    pub application_rounds: Vec<ApplicationRound>,
    pub delivery_period: Option<DeliveryPeriod>,
    pub application_link: Option<String>,
    pub notes: String,
}

/// Run every field extractor over each tier section. A page with no tier
/// sections still yields one default tier, so the result is never empty.
pub fn detect_tiers(sections: &[TierSection]) -> Vec<Tier> {
    if sections.is_empty() {
        return vec![default_tier()];
    }
    sections.iter().map(tier_from_section).collect()
}

/// Detected tiers as variants, first one primary by position. The flag is a
/// default for display, not a judgment — `variants::select_primary` remains
/// the authority on every read.
pub fn build_variants(sections: &[TierSection]) -> Vec<OpportunityVariant> {
    detect_tiers(sections)
        .into_iter()
        .enumerate()
        .map(|(index, tier)| OpportunityVariant {
            variant_title: tier.title,
            grant_min: tier.grant_min,
            grant_max: tier.grant_max,
            currency: tier.currency,
            funding_type: None,
            application_window: tier.application_window,
            application_rounds: tier.application_rounds,
            delivery_period: tier.delivery_period,
            application_link: tier.application_link,
            notes: tier.notes,
            is_primary: index == 0,
        })
        .collect()
}

fn tier_from_section(section: &TierSection) -> Tier {
    let text = section.text();

    // Headings are the highest-signal spot for amounts; fall back to the
    // whole section only when the heading says nothing.
    let amounts = amounts::extract(&section.heading).or_else(|| amounts::extract(&text));

    let rounds = rounds::extract(&text);
    let application_window = window::extract(&text).map(|mut w| {
        w.application_rounds = rounds.clone();
        w
    });

    Tier {
        title: section.heading.clone(),
        grant_min: amounts.and_then(|a| a.min),
        grant_max: amounts.and_then(|a| a.max),
        currency: DEFAULT_CURRENCY.to_string(),
        application_window,
        application_rounds: rounds,
        delivery_period: delivery::extract(&text),
        application_link: links::extract(&section.blocks),
        notes: notes_text(&text),
    }
}

fn default_tier() -> Tier {
    Tier {
        title: DEFAULT_TIER_TITLE.to_string(),
        grant_min: None,
        grant_max: None,
        currency: DEFAULT_CURRENCY.to_string(),
        application_window: None,
        application_rounds: Vec::new(),
        delivery_period: None,
        application_link: None,
        notes: DEFAULT_TIER_NOTES.to_string(),
    }
}

/// Catch-all residue for human review: the section's text with whitespace
/// collapsed. Always a string, possibly empty.
fn notes_text(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::blocks::classify_lines;
    use crate::parser::sections::tier_sections;

    fn parse(fixture: &str) -> Vec<TierSection> {
        let md = std::fs::read_to_string(format!("tests/fixtures/{}.md", fixture)).unwrap();
        tier_sections(&classify_lines(&md))
    }

    #[test]
    fn hartfield_detects_both_tiers() {
        let variants = build_variants(&parse("hartfield"));
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].variant_title, "Small Grants - up to £5,000");
        assert_eq!(variants[1].variant_title, "Large Grants");
    }

    #[test]
    fn hartfield_small_grants_fields() {
        let variants = build_variants(&parse("hartfield"));
        let small = &variants[0];
        assert_eq!(small.grant_min, None);
        assert_eq!(small.grant_max, Some(5000.0));
        assert_eq!(small.currency, "GBP");

        let window = small.application_window.as_ref().unwrap();
        assert!(window.open_date.is_some());
        let close = window.close_date.unwrap();
        assert_eq!(close.format("%Y-%m-%d %H:%M").to_string(), "2025-07-31 17:00");
        assert_eq!(window.timezone.as_deref(), Some("GMT"));

        let delivery = small.delivery_period.as_ref().unwrap();
        assert!(delivery.start_date.is_some());
        assert!(delivery.end_date.is_some());

        // Portal host preferred over the plain guidance link
        assert_eq!(
            small.application_link.as_deref(),
            Some("https://apply.hartfield.gov.uk/small-grants")
        );
    }

    #[test]
    fn hartfield_large_grants_fields() {
        let variants = build_variants(&parse("hartfield"));
        let large = &variants[1];
        assert_eq!(large.grant_min, Some(5000.0));
        assert_eq!(large.grant_max, Some(25000.0));

        // Round 3 has no month and is dropped
        assert_eq!(large.application_rounds.len(), 2);
        assert_eq!(large.application_rounds[0].round_name, "Round 1");
        assert_eq!(
            large.application_rounds[0].apply_open_month.as_deref(),
            Some("November")
        );
        assert_eq!(large.application_rounds[0].apply_open_year_estimate, Some(2025));
        assert_eq!(large.application_rounds[1].round_name, "Round 2");

        assert_eq!(
            large.application_link.as_deref(),
            Some("https://www.hartfield.gov.uk/large-grants/form")
        );
    }

    #[test]
    fn first_variant_is_positional_primary() {
        let variants = build_variants(&parse("hartfield"));
        assert!(variants[0].is_primary);
        assert!(variants[1..].iter().all(|v| !v.is_primary));
    }

    #[test]
    fn plain_page_falls_back_to_default_tier() {
        let variants = build_variants(&parse("riverdale"));
        assert_eq!(variants.len(), 1);
        let only = &variants[0];
        assert_eq!(only.variant_title, "Main Grant");
        assert_eq!(only.grant_min, None);
        assert_eq!(only.grant_max, None);
        assert_eq!(only.currency, "GBP");
        assert!(only.application_window.is_none());
        assert!(only.application_rounds.is_empty());
        assert!(only.delivery_period.is_none());
        assert!(only.application_link.is_none());
        assert_eq!(only.notes, "Default tier created from main content");
        assert!(only.is_primary);
    }

    #[test]
    fn pipeline_is_deterministic() {
        let first = build_variants(&parse("hartfield"));
        let second = build_variants(&parse("hartfield"));
        assert_eq!(first, second);
    }

    #[test]
    fn notes_collapse_whitespace() {
        assert_eq!(notes_text("  spread \n out\t text  "), "spread out text");
    }
}
