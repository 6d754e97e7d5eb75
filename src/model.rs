use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Source pages are UK-council oriented; amounts without an explicit currency
/// marker are assumed GBP.
pub const DEFAULT_CURRENCY: &str = "GBP";

/// One named sub-deadline within a multi-round opportunity.
/// Only `round_name` is guaranteed; everything else reflects what the source
/// text actually said. A missing value is never guessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRound {
    pub round_name: String,
    pub apply_open_month: Option<String>,
    pub apply_open_year_estimate: Option<i32>,
    pub apply_close_date: Option<NaiveDateTime>,
}

/// The open/close window for one funding variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationWindow {
    pub open_date: Option<NaiveDateTime>,
    pub close_date: Option<NaiveDateTime>,
    /// Raw abbreviation as found in the text ("GMT", "BST"). Not validated
    /// against a timezone database; source ambiguity is preserved.
    pub timezone: Option<String>,
    pub application_rounds: Vec<ApplicationRound>,
}

/// The window during which funded work must be carried out. Distinct from the
/// application window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPeriod {
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

/// One funding tier or stream within a single opportunity page.
///
/// `is_primary` is a positional default set by the variant builder, not an
/// authoritative selection. Consumers that need "the" primary variant run
/// `variants::select_primary` instead of trusting this flag — variants can be
/// edited independently after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityVariant {
    pub variant_title: String,
    pub grant_min: Option<f64>,
    pub grant_max: Option<f64>,
    pub currency: String,
    /// Not populated by the extractor; kept for manual QA edits.
    pub funding_type: Option<String>,
    pub application_window: Option<ApplicationWindow>,
    pub application_rounds: Vec<ApplicationRound>,
    pub delivery_period: Option<DeliveryPeriod>,
    pub application_link: Option<String>,
    /// Free-text residue of the section, kept for human review.
    pub notes: String,
    pub is_primary: bool,
}

/// A funding opportunity with its variants and the flattened legacy fields.
///
/// The top-level scalars (`grant_min` … `deadline`) are recomputed from the
/// selected primary variant whenever variants exist; they are never hand-edited
/// independently of the variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingOpportunity {
    pub slug: String,
    pub url: String,
    pub title: Option<String>,
    pub grant_min: Option<f64>,
    pub grant_max: Option<f64>,
    pub currency: Option<String>,
    pub application_link: Option<String>,
    pub deadline: Option<NaiveDateTime>,
    pub variants: Vec<OpportunityVariant>,
}

impl FundingOpportunity {
    pub fn new(slug: &str, url: &str, title: Option<String>) -> Self {
        FundingOpportunity {
            slug: slug.to_string(),
            url: url.to_string(),
            title,
            grant_min: None,
            grant_max: None,
            currency: None,
            application_link: None,
            deadline: None,
            variants: Vec::new(),
        }
    }
}
