//! Primary-variant selection and the top-level projection that keeps the
//! flattened legacy fields in sync with the variants.
//!
//! Selection is a pure function re-run on every read path. The stored
//! `is_primary` flag is only a positional default: QA edits can leave zero or
//! several flags set, and the cascade below is the single source of truth.

use chrono::NaiveDateTime;

use crate::model::{FundingOpportunity, OpportunityVariant};

/// Deterministic cascade, first applicable rule wins:
/// 1. the first variant flagged `is_primary`,
/// 2. the variant with the earliest close date,
/// 3. the variant with the highest `grant_max`,
/// 4. the first variant in document order.
///
/// Returns `None` only for an empty slice, which callers holding the
/// tier-detector guarantee (at least one variant per opportunity) never pass.
pub fn select_primary(variants: &[OpportunityVariant]) -> Option<&OpportunityVariant> {
    if let Some(flagged) = variants.iter().find(|v| v.is_primary) {
        return Some(flagged);
    }

    // Earliest close date: the nearest deadline is the operationally relevant
    // variant. Index in the key makes equal dates resolve to list order.
    let earliest = variants
        .iter()
        .enumerate()
        .filter_map(|(index, v)| close_date(v).map(|date| (date, index, v)))
        .min_by_key(|(date, index, _)| (*date, *index))
        .map(|(_, _, v)| v);
    if earliest.is_some() {
        return earliest;
    }

    // Highest funding ceiling. Ties resolve to the earlier variant.
    let richest = variants
        .iter()
        .enumerate()
        .filter_map(|(index, v)| v.grant_max.map(|max| (max, index, v)))
        .max_by(|a, b| a.0.total_cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, _, v)| v);
    if richest.is_some() {
        return richest;
    }

    variants.first()
}

fn close_date(variant: &OpportunityVariant) -> Option<NaiveDateTime> {
    variant
        .application_window
        .as_ref()
        .and_then(|window| window.close_date)
}

/// Project the primary variant onto the opportunity's flattened legacy
/// fields. Amounts, currency and the link only ever gain information — a
/// `None` on the variant never erases an existing value. `deadline` is the
/// exception: with no close date on the primary window it is set to `None`
/// explicitly, so stale deadlines cannot survive a re-parse (downstream
/// renders a missing deadline as "varies").
///
/// No-op when the opportunity has no variants at all; legacy single-tier
/// records keep their hand-set fields.
pub fn apply_primary_to_top_level(opportunity: &mut FundingOpportunity) {
    let Some(primary) = select_primary(&opportunity.variants) else {
        return;
    };
    let primary = primary.clone();

    if primary.grant_min.is_some() {
        opportunity.grant_min = primary.grant_min;
    }
    if primary.grant_max.is_some() {
        opportunity.grant_max = primary.grant_max;
    }
    if !primary.currency.is_empty() {
        opportunity.currency = Some(primary.currency.clone());
    }
    if primary.application_link.is_some() {
        opportunity.application_link = primary.application_link.clone();
    }

    opportunity.deadline = primary
        .application_window
        .as_ref()
        .and_then(|window| window.close_date);
}

/// Compact "min - max CUR" label for tables and QA summaries.
pub fn format_grant_range(
    min: Option<f64>,
    max: Option<f64>,
    currency: &str,
) -> Option<String> {
    let label = match (min, max) {
        (Some(min), Some(max)) if min == max => format!("{}", min),
        (Some(min), Some(max)) => format!("{} - {}", min, max),
        (Some(min), None) => format!("Min: {}", min),
        (None, Some(max)) => format!("Max: {}", max),
        (None, None) => return None,
    };
    if currency.is_empty() {
        Some(label)
    } else {
        Some(format!("{} {}", label, currency))
    }
}

pub fn grant_range_label(variant: &OpportunityVariant) -> Option<String> {
    format_grant_range(variant.grant_min, variant.grant_max, &variant.currency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApplicationWindow, DEFAULT_CURRENCY};
    use chrono::NaiveDate;

    fn variant(title: &str) -> OpportunityVariant {
        OpportunityVariant {
            variant_title: title.to_string(),
            grant_min: None,
            grant_max: None,
            currency: DEFAULT_CURRENCY.to_string(),
            funding_type: None,
            application_window: None,
            application_rounds: Vec::new(),
            delivery_period: None,
            application_link: None,
            notes: String::new(),
            is_primary: false,
        }
    }

    fn with_close(mut v: OpportunityVariant, y: i32, m: u32, d: u32) -> OpportunityVariant {
        v.application_window = Some(ApplicationWindow {
            open_date: None,
            close_date: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0),
            timezone: None,
            application_rounds: Vec::new(),
        });
        v
    }

    fn cascade_fixture() -> Vec<OpportunityVariant> {
        let mut v1 = variant("V1");
        v1.is_primary = true;
        let mut v2 = with_close(variant("V2"), 2025, 1, 1);
        v2.grant_max = Some(5000.0);
        let mut v3 = with_close(variant("V3"), 2025, 6, 1);
        v3.grant_max = Some(100000.0);
        vec![v1, v2, v3]
    }

    #[test]
    fn rule_1_explicit_flag_short_circuits() {
        let variants = cascade_fixture();
        assert_eq!(select_primary(&variants).unwrap().variant_title, "V1");
    }

    #[test]
    fn rule_2_earliest_close_date() {
        let mut variants = cascade_fixture();
        variants[0].is_primary = false;
        assert_eq!(select_primary(&variants).unwrap().variant_title, "V2");
    }

    #[test]
    fn rule_3_highest_grant_max() {
        let mut variants = cascade_fixture();
        variants[0].is_primary = false;
        variants[1].application_window = None;
        variants[2].application_window = None;
        assert_eq!(select_primary(&variants).unwrap().variant_title, "V3");
    }

    #[test]
    fn rule_4_first_in_document_order() {
        let variants = vec![variant("V1"), variant("V2"), variant("V3")];
        assert_eq!(select_primary(&variants).unwrap().variant_title, "V1");
    }

    #[test]
    fn multiple_flags_resolve_to_first() {
        let mut variants = cascade_fixture();
        variants[2].is_primary = true;
        assert_eq!(select_primary(&variants).unwrap().variant_title, "V1");
    }

    #[test]
    fn equal_close_dates_resolve_to_list_order() {
        let variants = vec![
            with_close(variant("V1"), 2025, 3, 1),
            with_close(variant("V2"), 2025, 3, 1),
        ];
        assert_eq!(select_primary(&variants).unwrap().variant_title, "V1");
    }

    #[test]
    fn equal_grant_max_resolves_to_list_order() {
        let mut v1 = variant("V1");
        v1.grant_max = Some(5000.0);
        let mut v2 = variant("V2");
        v2.grant_max = Some(5000.0);
        assert_eq!(select_primary(&[v1, v2]).unwrap().variant_title, "V1");
    }

    #[test]
    fn selection_is_always_drawn_from_the_input() {
        let variants = cascade_fixture();
        let selected = select_primary(&variants).unwrap();
        assert!(variants.iter().any(|v| std::ptr::eq(v, selected)));
    }

    #[test]
    fn empty_input_is_none() {
        assert!(select_primary(&[]).is_none());
    }

    fn opportunity_with(variants: Vec<OpportunityVariant>) -> FundingOpportunity {
        let mut opp = FundingOpportunity::new("test", "https://example.org", None);
        opp.variants = variants;
        opp
    }

    #[test]
    fn projection_never_erases_amounts_with_null() {
        let mut opp = opportunity_with(vec![variant("V1")]);
        opp.grant_min = Some(1000.0);
        apply_primary_to_top_level(&mut opp);
        assert_eq!(opp.grant_min, Some(1000.0));
    }

    #[test]
    fn projection_nulls_stale_deadline() {
        let mut opp = opportunity_with(vec![variant("V1")]);
        opp.deadline = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0);
        apply_primary_to_top_level(&mut opp);
        assert_eq!(opp.deadline, None);
    }

    #[test]
    fn projection_copies_primary_fields() {
        let mut v = with_close(variant("V1"), 2025, 7, 31);
        v.grant_max = Some(5000.0);
        v.application_link = Some("https://apply.example.org".to_string());
        let mut opp = opportunity_with(vec![v]);
        apply_primary_to_top_level(&mut opp);
        assert_eq!(opp.grant_max, Some(5000.0));
        assert_eq!(opp.currency.as_deref(), Some("GBP"));
        assert_eq!(opp.application_link.as_deref(), Some("https://apply.example.org"));
        assert!(opp.deadline.is_some());
    }

    #[test]
    fn projection_is_a_noop_without_variants() {
        let mut opp = opportunity_with(Vec::new());
        opp.grant_max = Some(750.0);
        let before = opp.clone();
        apply_primary_to_top_level(&mut opp);
        assert_eq!(opp, before);
    }

    #[test]
    fn grant_range_labels() {
        let mut v = variant("V");
        assert_eq!(grant_range_label(&v), None);
        v.grant_max = Some(5000.0);
        assert_eq!(grant_range_label(&v).as_deref(), Some("Max: 5000 GBP"));
        v.grant_min = Some(1000.0);
        assert_eq!(grant_range_label(&v).as_deref(), Some("1000 - 5000 GBP"));
        v.grant_max = Some(1000.0);
        assert_eq!(grant_range_label(&v).as_deref(), Some("1000 GBP"));
    }
}
