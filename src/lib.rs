//! Lead Enrichment API Library
//!
//! Turns raw business records from a maps/places search into enriched,
//! scored and risk-tagged leads. The batch driver probes each lead's website,
//! looks up its place details, and applies fixed scoring rules.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `cache_validator`: Checksummed cache entries.
//! - `circuit_breaker`: Circuit breaker for directory lookups.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Lead sink and its Postgres implementation.
//! - `domain_probe`: Website liveness and parking detection.
//! - `enrichment`: Batch enrichment orchestration.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `place_details`: Business-directory lookups.
//! - `scoring`: Keyword, completeness, risk and quality rules.

pub mod api;
pub mod core;
pub mod integrations;

pub mod cache_validator;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod domain_probe;
pub mod enrichment;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod place_details;
pub mod scoring;
