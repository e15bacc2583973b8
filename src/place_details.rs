//! Place-details lookup against an external business directory.
//!
//! The fetcher never fails: a missing place id, a failed lookup or an open
//! circuit all yield empty details, and the lead is scored without them.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use failsafe::futures::CircuitBreaker;
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::cache_validator::ValidatedCacheEntry;
use crate::circuit_breaker::{create_directory_circuit_breaker, DirectoryBreaker};
use crate::errors::AppError;
use crate::models::{non_blank, DirectoryRecord, PlaceDetails, ReviewRecord};

/// Reviews newer than this count towards freshness.
pub const FRESHNESS_WINDOW_DAYS: i64 = 90;
/// Freshness reported when no review carries a timestamp.
pub const DEFAULT_FRESHNESS: u8 = 5;

/// Place types too generic to serve as a category.
const GENERIC_PLACE_TYPES: &[&str] = &["point_of_interest", "establishment"];

/// Places statuses that describe the requested id, not the service.
const PER_PLACE_STATUSES: &[&str] = &["NOT_FOUND", "ZERO_RESULTS", "INVALID_REQUEST"];

/// External business-directory client.
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    async fn lookup(&self, place_id: &str) -> Result<DirectoryRecord, AppError>;
}

/// Google Places Details API client.
#[derive(Clone)]
pub struct GooglePlacesClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct PlacesDetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    result: Option<PlacesResult>,
}

#[derive(Debug, Deserialize)]
struct PlacesResult {
    rating: Option<f64>,
    user_ratings_total: Option<u32>,
    #[serde(default)]
    reviews: Vec<PlacesReview>,
    editorial_summary: Option<EditorialSummary>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PlacesReview {
    /// Unix seconds.
    time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EditorialSummary {
    overview: Option<String>,
}

impl GooglePlacesClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::ExternalApiError(format!("Failed to create Places client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl DirectoryLookup for GooglePlacesClient {
    async fn lookup(&self, place_id: &str) -> Result<DirectoryRecord, AppError> {
        // Build URL with proper parameter encoding to prevent injection attacks
        let url = reqwest::Url::parse_with_params(
            &format!("{}/details/json", self.base_url),
            &[
                ("place_id", place_id),
                (
                    "fields",
                    "rating,user_ratings_total,reviews,editorial_summary,types",
                ),
                ("key", self.api_key.as_str()),
            ],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        tracing::debug!(
            "Places URL: {}/details/json?place_id={}&key=[REDACTED]",
            self.base_url,
            place_id
        );

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Places API returned status {}: {}",
                status, error_text
            )));
        }

        let body: PlacesDetailsResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Places response: {}", e))
        })?;

        if body.status != "OK" {
            let message = format!(
                "Places API status {} for {}: {}",
                body.status,
                place_id,
                body.error_message.unwrap_or_default()
            );
            return Err(if PER_PLACE_STATUSES.contains(&body.status.as_str()) {
                AppError::NotFound(message)
            } else {
                AppError::ExternalApiError(message)
            });
        }

        let result = body.result.ok_or_else(|| {
            AppError::NotFound(format!("Places API returned no result for {}", place_id))
        })?;

        Ok(DirectoryRecord {
            rating: result.rating,
            review_count: result.user_ratings_total,
            reviews: result
                .reviews
                .into_iter()
                .map(|review| ReviewRecord {
                    timestamp: review
                        .time
                        .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
                })
                .collect(),
            description: result.editorial_summary.and_then(|s| s.overview),
            category: result
                .types
                .iter()
                .find(|t| !GENERIC_PLACE_TYPES.contains(&t.as_str()))
                .map(|t| t.replace('_', " ")),
        })
    }
}

/// Resolves place ids into `PlaceDetails`, degrading every failure to
/// empty details.
pub struct PlaceDetailsFetcher {
    directory: Option<Arc<dyn DirectoryLookup>>,
    breaker: DirectoryBreaker,
    /// "place:{id}" -> sealed `PlaceDetails` (1 hour TTL).
    cache: Cache<String, String>,
}

impl PlaceDetailsFetcher {
    /// `directory` is `None` when no directory is configured; every lookup
    /// then yields empty details.
    pub fn new(directory: Option<Arc<dyn DirectoryLookup>>) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(3600))
            .max_capacity(100_000)
            .build();

        Self {
            directory,
            breaker: create_directory_circuit_breaker(),
            cache,
        }
    }

    pub async fn fetch(&self, place_id: Option<&str>) -> PlaceDetails {
        let Some(place_id) = non_blank(place_id) else {
            return PlaceDetails::default();
        };
        let Some(directory) = self.directory.as_ref() else {
            return PlaceDetails::default();
        };

        let cache_key = format!("place:{}", place_id);
        if let Some(sealed) = self.cache.get(&cache_key).await {
            if let Some(details) = ValidatedCacheEntry::open::<PlaceDetails>(&sealed) {
                tracing::debug!("Places cache HIT for {}", place_id);
                return details;
            }
            tracing::warn!("Cache validation failed for {}, refetching", place_id);
        }

        let record = match self
            .breaker
            .call_with(trips_breaker, directory.lookup(place_id))
            .await
        {
            Ok(record) => record,
            Err(failsafe::Error::Rejected) => {
                tracing::warn!("Directory circuit open, skipping lookup for {}", place_id);
                return PlaceDetails::default();
            }
            Err(failsafe::Error::Inner(e)) => {
                tracing::warn!("Directory lookup failed for {}: {}", place_id, e);
                return PlaceDetails::default();
            }
        };

        let details = details_from_record(record, Utc::now());
        if let Some(sealed) = ValidatedCacheEntry::seal(&details) {
            self.cache.insert(cache_key, sealed).await;
        }
        details
    }
}

/// Whether a lookup error counts against the shared directory breaker.
/// A miss for one place id is that lead's problem only.
fn trips_breaker(error: &AppError) -> bool {
    match error {
        AppError::NotFound(_) => false,
        AppError::WithContext { source, .. } => trips_breaker(source),
        _ => true,
    }
}

/// Folds a directory record into place details as of `now`.
pub fn details_from_record(record: DirectoryRecord, now: DateTime<Utc>) -> PlaceDetails {
    PlaceDetails {
        rating: record.rating.map(|r| r.clamp(0.0, 5.0)),
        review_count: record.review_count,
        review_freshness_score: Some(freshness_score(&record.reviews, now)),
        business_description: record.description.filter(|d| !d.trim().is_empty()),
        category: record.category.filter(|c| !c.trim().is_empty()),
    }
}

/// Recent-activity indicator in `1..=10`.
///
/// Counts reviews within the last 90 days of `now` and doubles the count.
/// Returns 5 when no review carries a timestamp.
pub fn freshness_score(reviews: &[ReviewRecord], now: DateTime<Utc>) -> u8 {
    let timestamps: Vec<DateTime<Utc>> = reviews.iter().filter_map(|r| r.timestamp).collect();
    if timestamps.is_empty() {
        return DEFAULT_FRESHNESS;
    }

    let cutoff = now - ChronoDuration::days(FRESHNESS_WINDOW_DAYS);
    let recent = timestamps.iter().filter(|ts| **ts >= cutoff).count();
    recent.saturating_mul(2).clamp(1, 10) as u8
}
