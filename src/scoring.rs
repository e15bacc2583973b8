//! Pure scoring rules for enriched leads.
//!
//! Every function here is synchronous and deterministic: no I/O, no clock,
//! no randomness. The weights and thresholds are business rules and must not
//! be tuned.

use crate::models::{non_blank, DomainCheck, DomainStatus, PlaceDetails, RawLead, RiskTag};

/// Business-category terms, scanned in this order.
pub const CATEGORY_TERMS: &[&str] = &[
    "restaurant",
    "cafe",
    "coffee",
    "bakery",
    "bar",
    "pizza",
    "dental",
    "medical",
    "clinic",
    "pharmacy",
    "legal",
    "law",
    "accounting",
    "consulting",
    "insurance",
    "real estate",
    "retail",
    "boutique",
    "salon",
    "spa",
    "fitness",
    "gym",
    "technology",
    "software",
    "marketing",
    "construction",
    "plumbing",
    "electric",
    "roofing",
    "automotive",
    "repair",
    "cleaning",
    "hotel",
    "travel",
    "education",
    "school",
    "pet",
    "veterinary",
    "florist",
    "photography",
];

/// Generic location terms, scanned after the category terms.
pub const LOCATION_TERMS: &[&str] = &["local", "downtown", "mall", "center", "plaza"];

/// Number of fields on the completeness checklist.
pub const COMPLETENESS_FIELDS: usize = 9;

const RISK_BASELINE: i32 = 50;

pub const FACTOR_NO_WEBSITE: &str = "No website found";
pub const FACTOR_PARKED_DOMAIN: &str = "Parked domain";
pub const FACTOR_LOW_RATING: &str = "Low or missing Google rating";
pub const FACTOR_FEW_REVIEWS: &str = "Few customer reviews";
pub const FACTOR_MISSING_CONTACT: &str = "Missing contact information";
pub const FACTOR_INCOMPLETE: &str = "Incomplete business information";

/// Extracts category and location keywords from a name and description.
///
/// Matching is a case-insensitive substring test; the result is
/// deduplicated and follows vocabulary order.
pub fn extract_keywords(business_name: &str, description: Option<&str>) -> Vec<String> {
    let text = format!("{} {}", business_name, description.unwrap_or("")).to_lowercase();

    let mut keywords: Vec<String> = Vec::new();
    for term in CATEGORY_TERMS.iter().chain(LOCATION_TERMS.iter()) {
        if text.contains(term) && !keywords.iter().any(|k| k == term) {
            keywords.push((*term).to_string());
        }
    }
    keywords
}

/// Fraction of the field checklist that is populated.
///
/// Checklist: business name, address, phone, email, website, rating,
/// review count, description, category. Strings count only when non-blank.
pub fn completeness_score(lead: &RawLead, details: &PlaceDetails) -> f64 {
    let checklist = [
        non_blank(Some(&lead.business_name)).is_some(),
        non_blank(lead.address.as_deref()).is_some(),
        non_blank(lead.phone.as_deref()).is_some(),
        non_blank(lead.email.as_deref()).is_some(),
        non_blank(lead.website.as_deref()).is_some(),
        details.rating.is_some(),
        details.review_count.is_some(),
        non_blank(details.business_description.as_deref()).is_some(),
        non_blank(details.category.as_deref()).is_some(),
    ];

    let present = checklist.iter().filter(|present| **present).count();
    clamp_unit(present as f64 / COMPLETENESS_FIELDS as f64)
}

/// Inputs to the risk assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskSignals {
    pub domain_found: bool,
    pub domain_status: DomainStatus,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub has_email: bool,
    pub has_phone: bool,
    pub completeness: f64,
}

impl RiskSignals {
    pub fn collect(
        lead: &RawLead,
        domain: &DomainCheck,
        details: &PlaceDetails,
        completeness: f64,
    ) -> Self {
        Self {
            domain_found: domain.found,
            domain_status: domain.status,
            rating: details.rating,
            review_count: details.review_count,
            has_email: lead.has_email(),
            has_phone: lead.has_phone(),
            completeness,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub score: f64,
    pub tag: RiskTag,
    /// Negative signals that fired, in evaluation order.
    pub factors: Vec<String>,
}

/// Combines lead signals into a risk score, tag and factor narrative.
///
/// Starts at 0.5 and sums every adjustment; nothing short-circuits.
/// Adjustments are kept in hundredths so sums such as 0.5 + 0.2 land on
/// exactly 0.7 before the tag thresholds are applied.
pub fn assess_risk(signals: &RiskSignals) -> RiskAssessment {
    let mut hundredths = RISK_BASELINE;
    let mut factors = Vec::new();

    let mut penalize = |applies: bool, amount: i32, factor: &str| {
        if applies {
            hundredths += amount;
            factors.push(factor.to_string());
        }
    };

    penalize(!signals.domain_found, 20, FACTOR_NO_WEBSITE);
    penalize(
        signals.domain_found && signals.domain_status == DomainStatus::Parked,
        15,
        FACTOR_PARKED_DOMAIN,
    );
    penalize(
        signals.rating.map_or(true, |r| r < 3.0),
        10,
        FACTOR_LOW_RATING,
    );
    penalize(
        signals.review_count.map_or(true, |c| c < 5),
        10,
        FACTOR_FEW_REVIEWS,
    );
    penalize(
        !signals.has_email && !signals.has_phone,
        15,
        FACTOR_MISSING_CONTACT,
    );
    penalize(signals.completeness < 0.5, 10, FACTOR_INCOMPLETE);

    // Positive adjustments carry no factor text
    if signals.rating.is_some_and(|r| r >= 4.0) {
        hundredths -= 10;
    }
    if signals.review_count.is_some_and(|c| c >= 20) {
        hundredths -= 10;
    }
    if signals.domain_found && signals.domain_status == DomainStatus::Active {
        hundredths -= 10;
    }

    let score = f64::from(hundredths.clamp(0, 100)) / 100.0;
    RiskAssessment {
        score,
        tag: RiskTag::from_score(score),
        factors,
    }
}

/// Inputs to the quality score.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityInputs {
    pub completeness: f64,
    pub domain_found: bool,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub risk_score: f64,
}

/// Weighted lead quality:
/// `completeness*0.30 + domain 0.20 + (rating/5)*0.25 + min(reviews/100, 1)*0.15 - risk*0.10`.
pub fn quality_score(inputs: &QualityInputs) -> f64 {
    let domain_bonus = if inputs.domain_found { 0.20 } else { 0.0 };
    let rating_score = inputs.rating.map_or(0.0, |r| (r / 5.0) * 0.25);
    let review_score = inputs
        .review_count
        .map_or(0.0, |c| (f64::from(c) / 100.0).min(1.0) * 0.15);

    clamp_unit(
        inputs.completeness * 0.30 + domain_bonus + rating_score + review_score
            - inputs.risk_score * 0.10,
    )
}

/// Clamps to `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals() -> RiskSignals {
        RiskSignals {
            domain_found: true,
            domain_status: DomainStatus::Active,
            rating: Some(3.5),
            review_count: Some(10),
            has_email: true,
            has_phone: true,
            completeness: 0.8,
        }
    }

    #[test]
    fn test_keywords_follow_vocabulary_order() {
        let keywords = extract_keywords(
            "Downtown Pizza Cafe",
            Some("Family restaurant near the plaza"),
        );
        assert_eq!(
            keywords,
            vec!["restaurant", "cafe", "pizza", "downtown", "plaza"]
        );
    }

    #[test]
    fn test_keywords_without_description() {
        assert_eq!(extract_keywords("Smile Dental", None), vec!["dental"]);
        assert!(extract_keywords("Zzyzx Holdings", None).is_empty());
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let keywords = extract_keywords("BRIGHT SOFTWARE", Some("Technology CONSULTING"));
        assert_eq!(keywords, vec!["consulting", "technology", "software"]);
    }

    #[test]
    fn test_completeness_counts_non_blank_fields() {
        let lead = RawLead {
            business_name: "Acme".to_string(),
            address: Some("1 Main St".to_string()),
            phone: Some("   ".to_string()),
            email: None,
            website: Some("acme.com".to_string()),
            ..Default::default()
        };
        let details = PlaceDetails {
            rating: Some(4.0),
            category: Some(String::new()),
            ..Default::default()
        };

        let score = completeness_score(&lead, &details);
        assert!((score - 4.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_completeness_full_checklist() {
        let lead = RawLead {
            business_name: "Acme".to_string(),
            address: Some("1 Main St".to_string()),
            phone: Some("555-0100".to_string()),
            email: Some("hi@acme.com".to_string()),
            website: Some("acme.com".to_string()),
            ..Default::default()
        };
        let details = PlaceDetails {
            rating: Some(4.0),
            review_count: Some(3),
            business_description: Some("Widgets".to_string()),
            category: Some("store".to_string()),
            review_freshness_score: None,
        };
        assert_eq!(completeness_score(&lead, &details), 1.0);
    }

    #[test]
    fn test_risk_neutral_lead() {
        let assessment = assess_risk(&signals());
        // 0.5 - 0.10 (active domain)
        assert_eq!(assessment.score, 0.4);
        assert_eq!(assessment.tag, RiskTag::Opportunity);
        assert!(assessment.factors.is_empty());
    }

    #[test]
    fn test_risk_parked_domain() {
        let assessment = assess_risk(&RiskSignals {
            domain_status: DomainStatus::Parked,
            ..signals()
        });
        assert_eq!(assessment.score, 0.65);
        assert_eq!(assessment.factors, vec![FACTOR_PARKED_DOMAIN]);
    }

    #[test]
    fn test_risk_exact_upper_boundary_is_opportunity() {
        // 0.5 + 0.20 (no website)
        let assessment = assess_risk(&RiskSignals {
            domain_found: false,
            domain_status: DomainStatus::NotFound,
            ..signals()
        });
        assert_eq!(assessment.score, 0.7);
        assert_eq!(assessment.tag, RiskTag::Opportunity);
    }

    #[test]
    fn test_risk_exact_lower_boundary_is_opportunity() {
        // 0.5 - 0.10 (rating) - 0.10 (active domain)
        let assessment = assess_risk(&RiskSignals {
            rating: Some(4.2),
            ..signals()
        });
        assert_eq!(assessment.score, 0.3);
        assert_eq!(assessment.tag, RiskTag::Opportunity);
    }

    #[test]
    fn test_risk_all_penalties_clamp_to_one() {
        let assessment = assess_risk(&RiskSignals {
            domain_found: false,
            domain_status: DomainStatus::NotFound,
            rating: None,
            review_count: None,
            has_email: false,
            has_phone: false,
            completeness: 0.1,
        });
        assert_eq!(assessment.score, 1.0);
        assert_eq!(assessment.tag, RiskTag::Risky);
        assert_eq!(
            assessment.factors,
            vec![
                FACTOR_NO_WEBSITE,
                FACTOR_LOW_RATING,
                FACTOR_FEW_REVIEWS,
                FACTOR_MISSING_CONTACT,
                FACTOR_INCOMPLETE,
            ]
        );
    }

    #[test]
    fn test_quality_formula() {
        let score = quality_score(&QualityInputs {
            completeness: 1.0,
            domain_found: true,
            rating: Some(4.8),
            review_count: Some(50),
            risk_score: 0.2,
        });
        // 0.30 + 0.20 + 0.24 + 0.075 - 0.02
        assert!((score - 0.795).abs() < 1e-9);
    }

    #[test]
    fn test_quality_caps_review_volume() {
        let capped = quality_score(&QualityInputs {
            completeness: 0.0,
            domain_found: false,
            rating: None,
            review_count: Some(10_000),
            risk_score: 0.0,
        });
        assert!((capped - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_quality_never_negative() {
        let score = quality_score(&QualityInputs {
            completeness: 0.0,
            domain_found: false,
            rating: None,
            review_count: None,
            risk_score: 1.0,
        });
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_clamp_unit_handles_nan() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(1.5), 1.0);
        assert_eq!(clamp_unit(-0.5), 0.0);
    }
}
