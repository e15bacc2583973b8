//! Batch enrichment driver.
//!
//! For every lead in a batch:
//! 1. Probe the website and look up place details (concurrently)
//! 2. Extract keywords and score completeness
//! 3. Assess risk
//! 4. Score quality
//!
//! Leads run in fixed groups of `maxConcurrent`; a group finishes before
//! the next one starts. A lead's failure is recorded against its index and
//! never affects its siblings.

use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::domain_probe::{DomainProbe, HttpFetcher};
use crate::errors::AppError;
use crate::models::{
    validate_batch_id, BatchResult, BatchStatistics, DomainCheck, DomainStatus, EnrichedLead,
    EnrichmentOptions, LeadError, PlaceDetails, RawLead, ValidatedBatch,
};
use crate::place_details::{DirectoryLookup, GooglePlacesClient, PlaceDetailsFetcher};
use crate::scoring::{
    assess_risk, completeness_score, extract_keywords, quality_score, QualityInputs, RiskSignals,
};

/// Runs enrichment batches against shared probe and directory clients.
#[derive(Clone)]
pub struct EnrichmentOrchestrator {
    domain_probe: Arc<DomainProbe>,
    place_details: Arc<PlaceDetailsFetcher>,
}

impl EnrichmentOrchestrator {
    pub fn new(domain_probe: DomainProbe, place_details: PlaceDetailsFetcher) -> Self {
        Self {
            domain_probe: Arc::new(domain_probe),
            place_details: Arc::new(place_details),
        }
    }

    /// Wires the reqwest-backed probe and, when a key is configured, the
    /// Google Places directory.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let domain_probe = DomainProbe::new(
            Arc::new(HttpFetcher::new()?),
            config.domain_check_timeout(),
        );

        let directory: Option<Arc<dyn DirectoryLookup>> = match config.google_places_api_key {
            Some(ref key) => Some(Arc::new(GooglePlacesClient::new(
                config.google_places_base_url.clone(),
                key.clone(),
                config.directory_timeout(),
            )?)),
            None => None,
        };

        Ok(Self::new(domain_probe, PlaceDetailsFetcher::new(directory)))
    }

    /// Enriches typed leads.
    ///
    /// Fails only with `AppError::Validation` when `batch_id` is missing or
    /// blank. Per-lead failures are reported in `BatchResult::errors`.
    pub async fn enrich(
        &self,
        batch_id: Option<&str>,
        leads: Vec<RawLead>,
        options: EnrichmentOptions,
    ) -> Result<BatchResult, AppError> {
        let batch_id = validate_batch_id(batch_id)?;

        Ok(self
            .enrich_batch(ValidatedBatch {
                batch_id,
                leads: leads.into_iter().map(Ok).collect(),
                options,
            })
            .await)
    }

    /// Enriches a validated batch. Always completes; every entry ends up in
    /// exactly one of `processed` or `errors`.
    pub async fn enrich_batch(&self, batch: ValidatedBatch) -> BatchResult {
        let started = Instant::now();
        let ValidatedBatch {
            batch_id,
            leads,
            options,
        } = batch;
        let total = leads.len();
        let group_size = options.group_size();
        let options = Arc::new(options);

        tracing::info!(
            "Batch {}: enriching {} lead(s) in groups of {} (skip_domain_check={}, skip_directory_lookup={})",
            batch_id,
            total,
            group_size,
            options.skip_domain_check,
            options.skip_directory_lookup
        );

        let entries: Vec<(usize, Result<RawLead, String>)> = leads.into_iter().enumerate().collect();
        let mut outcomes: Vec<(usize, Result<EnrichedLead, AppError>)> = Vec::with_capacity(total);

        for (group_number, group) in entries.chunks(group_size).enumerate() {
            let mut indices = Vec::with_capacity(group.len());
            let mut tasks = Vec::with_capacity(group.len());

            for (index, entry) in group.iter().cloned() {
                let domain_probe = Arc::clone(&self.domain_probe);
                let place_details = Arc::clone(&self.place_details);
                let options = Arc::clone(&options);

                indices.push(index);
                tasks.push(tokio::spawn(async move {
                    let lead = match entry {
                        Ok(lead) => lead,
                        Err(reason) => return Err(AppError::LeadProcessing(reason)),
                    };
                    enrich_lead(lead, &domain_probe, &place_details, &options).await
                }));
            }

            // Wait for the whole group, successes and failures alike
            let settled = join_all(tasks).await;
            for (index, joined) in indices.into_iter().zip(settled) {
                let outcome = joined.unwrap_or_else(|e| {
                    Err(AppError::LeadProcessing(format!(
                        "enrichment task failed: {}",
                        e
                    )))
                });
                outcomes.push((index, outcome));
            }

            tracing::debug!(
                "Batch {}: group {} settled ({}/{} leads)",
                batch_id,
                group_number + 1,
                outcomes.len(),
                total
            );
        }

        let result = merge_outcomes(batch_id, outcomes);

        tracing::info!(
            "Batch {} complete in {}ms: {} processed, {} failed, avg quality {:.3}",
            result.batch_id,
            started.elapsed().as_millis(),
            result.processed.len(),
            result.errors.len(),
            result.statistics.avg_quality_score
        );

        result
    }
}

/// Enriches one lead: network steps concurrently, then the pure scorers.
pub async fn enrich_lead(
    lead: RawLead,
    domain_probe: &DomainProbe,
    place_details: &PlaceDetailsFetcher,
    options: &EnrichmentOptions,
) -> Result<EnrichedLead, AppError> {
    if lead.business_name.trim().is_empty() {
        return Err(AppError::LeadProcessing(
            "businessName is required".to_string(),
        ));
    }

    let domain_step = async {
        if options.skip_domain_check {
            return assumed_domain_check(&lead);
        }
        match lead.website() {
            Some(website) => domain_probe.check(website).await,
            None => DomainCheck::not_found(),
        }
    };

    let details_step = async {
        if options.skip_directory_lookup {
            PlaceDetails::default()
        } else {
            place_details.fetch(lead.place_id.as_deref()).await
        }
    };

    let (domain, details) = tokio::join!(domain_step, details_step);
    Ok(score_lead(lead, domain, details))
}

/// Domain result used when the probe is skipped: a website is taken at its
/// word.
pub fn assumed_domain_check(lead: &RawLead) -> DomainCheck {
    if lead.website().is_some() {
        DomainCheck::active()
    } else {
        DomainCheck::not_found()
    }
}

/// Assembles an enriched lead from its probe results. Pure.
pub fn score_lead(lead: RawLead, domain: DomainCheck, details: PlaceDetails) -> EnrichedLead {
    let keywords = extract_keywords(
        &lead.business_name,
        details.business_description.as_deref(),
    );
    let completeness = completeness_score(&lead, &details);
    let risk = assess_risk(&RiskSignals::collect(&lead, &domain, &details, completeness));
    let quality = quality_score(&QualityInputs {
        completeness,
        domain_found: domain.found,
        rating: details.rating,
        review_count: details.review_count,
        risk_score: risk.score,
    });

    EnrichedLead {
        lead,
        google_rating: details.rating,
        review_count: details.review_count,
        review_freshness_score: details.review_freshness_score.unwrap_or(5),
        keywords,
        business_description: details.business_description,
        category: details.category,
        domain_found: domain.found,
        domain_status: if domain.found {
            domain.status
        } else {
            DomainStatus::NotFound
        },
        social_media_presence: BTreeMap::new(),
        risk_tag: risk.tag,
        risk_score: risk.score,
        risk_factors: risk.factors,
        completeness_score: completeness,
        lead_quality_score: quality,
    }
}

/// Index-preserving merge of settled lead outcomes.
fn merge_outcomes(
    batch_id: String,
    mut outcomes: Vec<(usize, Result<EnrichedLead, AppError>)>,
) -> BatchResult {
    outcomes.sort_by_key(|(index, _)| *index);

    let mut processed = Vec::new();
    let mut errors = Vec::new();
    for (index, outcome) in outcomes {
        match outcome {
            Ok(lead) => processed.push(lead),
            Err(e) => {
                tracing::warn!("Batch {}: lead #{} failed: {}", batch_id, index, e);
                errors.push(LeadError {
                    index,
                    message: e.to_string(),
                });
            }
        }
    }

    let statistics = BatchStatistics::from_leads(&processed);
    BatchResult {
        batch_id,
        processed,
        errors,
        statistics,
    }
}
