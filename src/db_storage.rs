use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::{AppError, ResultExt};
use crate::models::{BatchResult, EnrichedLead};

/// Storage collaborator that receives a batch's processed leads.
#[async_trait]
pub trait LeadSink: Send + Sync {
    /// Stores every processed lead of `result`, returning how many rows
    /// were written.
    async fn persist(&self, result: &BatchResult) -> Result<usize, AppError>;
}

const CREATE_ENRICHED_LEADS: &str = r#"
    CREATE TABLE IF NOT EXISTS enriched_leads (
        id UUID PRIMARY KEY,
        batch_id TEXT NOT NULL,
        business_name TEXT NOT NULL,
        address TEXT,
        phone TEXT,
        email TEXT,
        website TEXT,
        place_id TEXT,
        latitude DOUBLE PRECISION,
        longitude DOUBLE PRECISION,
        google_rating DOUBLE PRECISION,
        review_count INTEGER,
        review_freshness_score SMALLINT NOT NULL,
        keywords JSONB NOT NULL,
        business_description TEXT,
        category TEXT,
        domain_found BOOLEAN NOT NULL,
        domain_status TEXT NOT NULL,
        social_media_presence JSONB NOT NULL,
        risk_tag TEXT NOT NULL,
        risk_score DOUBLE PRECISION NOT NULL,
        risk_factors JSONB NOT NULL,
        completeness_score DOUBLE PRECISION NOT NULL,
        lead_quality_score DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const CREATE_ENRICHED_LEADS_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_enriched_leads_batch ON enriched_leads (batch_id)",
    "CREATE INDEX IF NOT EXISTS idx_enriched_leads_risk_tag ON enriched_leads (risk_tag)",
    "CREATE INDEX IF NOT EXISTS idx_enriched_leads_quality ON enriched_leads (lead_quality_score)",
];

/// Postgres-backed lead sink.
pub struct EnrichmentStorage {
    pool: PgPool,
}

impl EnrichmentStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `enriched_leads` table and its lookup indexes if missing.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(CREATE_ENRICHED_LEADS)
            .execute(&self.pool)
            .await
            .context("create enriched_leads")?;

        for statement in CREATE_ENRICHED_LEADS_INDEXES {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("create enriched_leads index")?;
        }
        Ok(())
    }
}

#[async_trait]
impl LeadSink for EnrichmentStorage {
    /// Inserts all processed leads of a batch in one transaction.
    async fn persist(&self, result: &BatchResult) -> Result<usize, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin enriched lead insert")?;

        for lead in &result.processed {
            insert_lead(&mut tx, &result.batch_id, lead)
                .await
                .with_context(|| {
                    format!(
                        "insert lead '{}' for batch {}",
                        lead.lead.business_name, result.batch_id
                    )
                })?;
        }

        tx.commit().await.context("commit enriched leads")?;

        tracing::info!(
            "Stored {} enriched lead(s) for batch {}",
            result.processed.len(),
            result.batch_id
        );
        Ok(result.processed.len())
    }
}

async fn insert_lead(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    batch_id: &str,
    enriched: &EnrichedLead,
) -> Result<(), sqlx::Error> {
    let lead = &enriched.lead;

    sqlx::query(
        r#"
        INSERT INTO enriched_leads (
            id, batch_id, business_name, address, phone, email, website, place_id,
            latitude, longitude, google_rating, review_count, review_freshness_score,
            keywords, business_description, category, domain_found, domain_status,
            social_media_presence, risk_tag, risk_score, risk_factors,
            completeness_score, lead_quality_score
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
            $17, $18, $19, $20, $21, $22, $23, $24
        )
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(batch_id)
    .bind(&lead.business_name)
    .bind(&lead.address)
    .bind(&lead.phone)
    .bind(&lead.email)
    .bind(&lead.website)
    .bind(&lead.place_id)
    .bind(lead.latitude)
    .bind(lead.longitude)
    .bind(enriched.google_rating)
    .bind(enriched.review_count.map(|c| i32::try_from(c).unwrap_or(i32::MAX)))
    .bind(i16::from(enriched.review_freshness_score))
    .bind(json!(enriched.keywords))
    .bind(&enriched.business_description)
    .bind(&enriched.category)
    .bind(enriched.domain_found)
    .bind(enriched.domain_status.as_str())
    .bind(json!(enriched.social_media_presence))
    .bind(enriched.risk_tag.as_str())
    .bind(enriched.risk_score)
    .bind(json!(enriched.risk_factors))
    .bind(enriched.completeness_score)
    .bind(enriched.lead_quality_score)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
