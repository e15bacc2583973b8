use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::AppError;

// ============ Input Models ============

/// A business record as returned by a maps/places search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLead {
    /// Business name. Required; blank names fail the lead, not the batch.
    #[serde(default)]
    pub business_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    /// External directory identifier (Google place id).
    pub place_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl RawLead {
    pub fn new(business_name: impl Into<String>) -> Self {
        Self {
            business_name: business_name.into(),
            ..Self::default()
        }
    }

    /// Website with surrounding whitespace removed, if non-blank.
    pub fn website(&self) -> Option<&str> {
        non_blank(self.website.as_deref())
    }

    pub fn has_email(&self) -> bool {
        non_blank(self.email.as_deref()).is_some()
    }

    pub fn has_phone(&self) -> bool {
        non_blank(self.phone.as_deref()).is_some()
    }
}

/// Recognized enrichment options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrichmentOptions {
    pub skip_domain_check: bool,
    pub skip_directory_lookup: bool,
    pub max_concurrent: usize,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self {
            skip_domain_check: false,
            skip_directory_lookup: false,
            max_concurrent: 5,
        }
    }
}

impl EnrichmentOptions {
    /// Group width, never below one.
    pub fn group_size(&self) -> usize {
        self.max_concurrent.max(1)
    }
}

/// Batch request body as it arrives over the wire.
///
/// `leads` is kept untyped so that a non-array value can be reported as a
/// validation error and a single malformed entry fails only that lead.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub batch_id: Option<String>,
    pub leads: Option<Value>,
    pub options: Option<EnrichmentOptions>,
}

/// A batch that passed request-level validation.
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub batch_id: String,
    /// One entry per submitted lead, in input order. `Err` holds the reason
    /// the entry could not be read as a lead.
    pub leads: Vec<Result<RawLead, String>>,
    pub options: EnrichmentOptions,
}

impl BatchRequest {
    /// Validates the batch envelope.
    ///
    /// Fails with `AppError::Validation` when the batch id is missing or blank,
    /// or when `leads` is absent or not an array. Individual entries are
    /// decoded leniently; a decoding failure is carried per entry.
    pub fn validate(self) -> Result<ValidatedBatch, AppError> {
        let batch_id = validate_batch_id(self.batch_id.as_deref())?;

        let entries = match self.leads {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(AppError::Validation(
                    "leads must be an array".to_string(),
                ))
            }
            None => return Err(AppError::Validation("leads is required".to_string())),
        };

        let leads = entries
            .into_iter()
            .map(|entry| {
                serde_json::from_value::<RawLead>(entry)
                    .map_err(|e| format!("Malformed lead: {}", e))
            })
            .collect();

        Ok(ValidatedBatch {
            batch_id,
            leads,
            options: self.options.unwrap_or_default(),
        })
    }
}

/// Checks that a batch identifier is present and non-blank.
pub fn validate_batch_id(batch_id: Option<&str>) -> Result<String, AppError> {
    non_blank(batch_id)
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("batchId is required".to_string()))
}

// ============ Probe & Directory Models ============

/// Liveness classification of a lead's website.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    Active,
    Parked,
    /// Reserved for registrar-expiry detection; the HTTP probe never reports it.
    Expired,
    NotFound,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainStatus::Active => "active",
            DomainStatus::Parked => "parked",
            DomainStatus::Expired => "expired",
            DomainStatus::NotFound => "not_found",
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a domain probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCheck {
    pub found: bool,
    pub status: DomainStatus,
    /// "timeout" when the probe timed out, otherwise the failure text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DomainCheck {
    pub fn active() -> Self {
        Self {
            found: true,
            status: DomainStatus::Active,
            error: None,
        }
    }

    pub fn parked() -> Self {
        Self {
            found: true,
            status: DomainStatus::Parked,
            error: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            found: false,
            status: DomainStatus::NotFound,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::not_found()
        }
    }
}

/// A single review as reported by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub timestamp: Option<DateTime<Utc>>,
}

/// Raw directory response for one place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    #[serde(default)]
    pub reviews: Vec<ReviewRecord>,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Place details folded into an enriched lead. All fields absent when the
/// lookup was skipped or failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetails {
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub business_description: Option<String>,
    pub category: Option<String>,
    pub review_freshness_score: Option<u8>,
}

impl PlaceDetails {
    pub fn is_empty(&self) -> bool {
        *self == PlaceDetails::default()
    }
}

// ============ Output Models ============

/// Coarse bucket derived from the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTag {
    Risky,
    Trusted,
    Opportunity,
}

impl RiskTag {
    /// `> 0.7` is risky, `< 0.3` is trusted, everything else (boundaries
    /// included) is an opportunity.
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            RiskTag::Risky
        } else if score < 0.3 {
            RiskTag::Trusted
        } else {
            RiskTag::Opportunity
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTag::Risky => "risky",
            RiskTag::Trusted => "trusted",
            RiskTag::Opportunity => "opportunity",
        }
    }
}

impl fmt::Display for RiskTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw lead plus everything derived during enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedLead {
    #[serde(flatten)]
    pub lead: RawLead,
    pub google_rating: Option<f64>,
    pub review_count: Option<u32>,
    pub review_freshness_score: u8,
    pub keywords: Vec<String>,
    pub business_description: Option<String>,
    pub category: Option<String>,
    pub domain_found: bool,
    pub domain_status: DomainStatus,
    /// Platform name to profile URL. Not populated by any probe yet.
    pub social_media_presence: BTreeMap<String, String>,
    pub risk_tag: RiskTag,
    pub risk_score: f64,
    pub risk_factors: Vec<String>,
    pub completeness_score: f64,
    pub lead_quality_score: f64,
}

/// A lead that failed enrichment, identified by its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadError {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatistics {
    pub risky_count: usize,
    pub trusted_count: usize,
    pub opportunity_count: usize,
    pub avg_quality_score: f64,
    pub domain_found_count: usize,
}

impl BatchStatistics {
    /// Aggregates over the successfully processed leads. The average of an
    /// empty set is 0.
    pub fn from_leads(leads: &[EnrichedLead]) -> Self {
        let mut stats = BatchStatistics::default();
        let mut quality_sum = 0.0;

        for lead in leads {
            match lead.risk_tag {
                RiskTag::Risky => stats.risky_count += 1,
                RiskTag::Trusted => stats.trusted_count += 1,
                RiskTag::Opportunity => stats.opportunity_count += 1,
            }
            if lead.domain_found {
                stats.domain_found_count += 1;
            }
            quality_sum += lead.lead_quality_score;
        }

        if !leads.is_empty() {
            stats.avg_quality_score = quality_sum / leads.len() as f64;
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub batch_id: String,
    pub processed: Vec<EnrichedLead>,
    pub errors: Vec<LeadError>,
    pub statistics: BatchStatistics,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.processed.len() + self.errors.len()
    }
}

/// Returns the trimmed value when it has any non-whitespace content.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
