/// Property-based tests using proptest
/// Invariants of the pure scorers that must hold for all inputs
use proptest::prelude::*;
use rust_leads_api::core::enrichment::score_lead;
use rust_leads_api::core::models::{
    DomainCheck, DomainStatus, PlaceDetails, RawLead, RiskTag,
};
use rust_leads_api::core::scoring::{
    assess_risk, completeness_score, extract_keywords, quality_score, QualityInputs, RiskSignals,
    CATEGORY_TERMS, LOCATION_TERMS,
};

fn domain_status() -> impl Strategy<Value = DomainStatus> {
    prop_oneof![
        Just(DomainStatus::Active),
        Just(DomainStatus::Parked),
        Just(DomainStatus::Expired),
        Just(DomainStatus::NotFound),
    ]
}

fn risk_signals() -> impl Strategy<Value = RiskSignals> {
    (
        any::<bool>(),
        domain_status(),
        proptest::option::of(-10.0f64..10.0),
        proptest::option::of(0u32..1000),
        any::<bool>(),
        any::<bool>(),
        0.0f64..=1.0,
    )
        .prop_map(
            |(domain_found, domain_status, rating, review_count, has_email, has_phone, completeness)| {
                RiskSignals {
                    domain_found,
                    domain_status,
                    rating,
                    review_count,
                    has_email,
                    has_phone,
                    completeness,
                }
            },
        )
}

fn optional_text() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[ a-zA-Z0-9]{0,12}")
}

fn raw_lead() -> impl Strategy<Value = RawLead> {
    (
        "[A-Za-z ]{1,24}",
        optional_text(),
        optional_text(),
        optional_text(),
        optional_text(),
    )
        .prop_map(|(business_name, address, phone, email, website)| RawLead {
            business_name,
            address,
            phone,
            email,
            website,
            ..Default::default()
        })
}

fn place_details() -> impl Strategy<Value = PlaceDetails> {
    (
        proptest::option::of(0.0f64..=5.0),
        proptest::option::of(0u32..500),
        optional_text(),
        optional_text(),
        proptest::option::of(1u8..=10),
    )
        .prop_map(
            |(rating, review_count, business_description, category, review_freshness_score)| {
                PlaceDetails {
                    rating,
                    review_count,
                    business_description,
                    category,
                    review_freshness_score,
                }
            },
        )
}

// Property: risk stays in range and its tag always agrees with the score
proptest! {
    #[test]
    fn risk_score_is_clamped_and_tag_consistent(signals in risk_signals()) {
        let risk = assess_risk(&signals);
        prop_assert!((0.0..=1.0).contains(&risk.score));
        prop_assert_eq!(risk.tag, RiskTag::from_score(risk.score));
        match risk.tag {
            RiskTag::Risky => prop_assert!(risk.score > 0.7),
            RiskTag::Trusted => prop_assert!(risk.score < 0.3),
            RiskTag::Opportunity => prop_assert!((0.3..=0.7).contains(&risk.score)),
        }
    }

    #[test]
    fn missing_website_always_reported(mut signals in risk_signals()) {
        signals.domain_found = false;
        let risk = assess_risk(&signals);
        prop_assert_eq!(risk.factors.first().map(String::as_str), Some("No website found"));
    }

    #[test]
    fn quality_score_is_clamped(
        completeness in 0.0f64..=1.0,
        domain_found in any::<bool>(),
        rating in proptest::option::of(-100.0f64..100.0),
        review_count in proptest::option::of(any::<u32>()),
        risk_score in 0.0f64..=1.0,
    ) {
        let quality = quality_score(&QualityInputs {
            completeness,
            domain_found,
            rating,
            review_count,
            risk_score,
        });
        prop_assert!((0.0..=1.0).contains(&quality));
    }
}

// Property: scorers are deterministic and stay within their ranges
proptest! {
    #[test]
    fn completeness_is_a_fraction_of_nine(lead in raw_lead(), details in place_details()) {
        let score = completeness_score(&lead, &details);
        prop_assert!((0.0..=1.0).contains(&score));
        let ninths = score * 9.0;
        prop_assert!((ninths - ninths.round()).abs() < 1e-9);
    }

    #[test]
    fn scoring_a_lead_is_idempotent(
        lead in raw_lead(),
        details in place_details(),
        found in any::<bool>(),
    ) {
        let domain = if found { DomainCheck::active() } else { DomainCheck::not_found() };
        let first = score_lead(lead.clone(), domain.clone(), details.clone());
        let second = score_lead(lead, domain, details);
        prop_assert_eq!(&first, &second);
        prop_assert!((1..=10).contains(&first.review_freshness_score));
        prop_assert!((0.0..=1.0).contains(&first.lead_quality_score));
    }

    #[test]
    fn keywords_are_vocabulary_terms_without_duplicates(
        name in "\\PC{0,40}",
        description in proptest::option::of("\\PC{0,60}"),
    ) {
        let keywords = extract_keywords(&name, description.as_deref());
        prop_assert_eq!(&keywords, &extract_keywords(&name, description.as_deref()));

        let mut seen = std::collections::HashSet::new();
        for keyword in &keywords {
            prop_assert!(seen.insert(keyword.clone()));
            prop_assert!(
                CATEGORY_TERMS.contains(&keyword.as_str())
                    || LOCATION_TERMS.contains(&keyword.as_str())
            );
        }
    }
}
