//! PostgreSQL record sink
//!
//! Records land in the `offers` table, one row per external id. Exporting
//! the same posting again replaces the earlier row.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use super::RecordSink;
use crate::error::Result;
use crate::record::CanonicalRecord;

const CREATE_OFFERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS offers (
    id                  BIGSERIAL PRIMARY KEY,
    external_id         TEXT NOT NULL UNIQUE,
    download_date       DATE NOT NULL,
    posted_date         DATE,
    title               TEXT,
    category            TEXT,
    seniorities         TEXT[] NOT NULL DEFAULT '{}',
    url                 TEXT,
    company_size        BIGINT,
    salary_currency     TEXT,
    salary_min_uop      DOUBLE PRECISION,
    salary_max_uop      DOUBLE PRECISION,
    salary_min_b2b      DOUBLE PRECISION,
    salary_max_b2b      DOUBLE PRECISION,
    salary_min_other    DOUBLE PRECISION,
    salary_max_other    DOUBLE PRECISION,
    must_skills         TEXT[] NOT NULL DEFAULT '{}',
    nice_skills         TEXT[] NOT NULL DEFAULT '{}',
    available_remote    BOOLEAN NOT NULL DEFAULT FALSE,
    available_in_poland BOOLEAN NOT NULL DEFAULT FALSE,
    locations           TEXT[] NOT NULL DEFAULT '{}'
)
"#;

const UPSERT_OFFER: &str = r#"
INSERT INTO offers (
    external_id, download_date, posted_date, title, category, seniorities,
    url, company_size, salary_currency,
    salary_min_uop, salary_max_uop, salary_min_b2b, salary_max_b2b,
    salary_min_other, salary_max_other,
    must_skills, nice_skills, available_remote, available_in_poland, locations
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
ON CONFLICT (external_id) DO UPDATE SET
    download_date = EXCLUDED.download_date,
    posted_date = EXCLUDED.posted_date,
    title = EXCLUDED.title,
    category = EXCLUDED.category,
    seniorities = EXCLUDED.seniorities,
    url = EXCLUDED.url,
    company_size = EXCLUDED.company_size,
    salary_currency = EXCLUDED.salary_currency,
    salary_min_uop = EXCLUDED.salary_min_uop,
    salary_max_uop = EXCLUDED.salary_max_uop,
    salary_min_b2b = EXCLUDED.salary_min_b2b,
    salary_max_b2b = EXCLUDED.salary_max_b2b,
    salary_min_other = EXCLUDED.salary_min_other,
    salary_max_other = EXCLUDED.salary_max_other,
    must_skills = EXCLUDED.must_skills,
    nice_skills = EXCLUDED.nice_skills,
    available_remote = EXCLUDED.available_remote,
    available_in_poland = EXCLUDED.available_in_poland,
    locations = EXCLUDED.locations
"#;

#[derive(Debug, Clone)]
pub struct PostgresSink {
    pool: PgPool,
}

impl PostgresSink {
    /// Connect and make sure the `offers` table exists
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: PgPool) -> Result<Self> {
        sqlx::query(CREATE_OFFERS_TABLE).execute(&pool).await?;
        info!("Offers table ready");
        Ok(Self { pool })
    }
}

fn to_vec(set: &std::collections::BTreeSet<String>) -> Vec<String> {
    set.iter().cloned().collect()
}

#[async_trait]
impl RecordSink for PostgresSink {
    async fn write(&self, record: &CanonicalRecord) -> Result<()> {
        sqlx::query(UPSERT_OFFER)
            .bind(&record.external_id)
            .bind(record.download_date)
            .bind(record.posted_date)
            .bind(&record.title)
            .bind(&record.category)
            .bind(to_vec(&record.seniorities))
            .bind(&record.url)
            .bind(record.company_size)
            .bind(&record.salary_currency)
            .bind(record.salary_min_uop)
            .bind(record.salary_max_uop)
            .bind(record.salary_min_b2b)
            .bind(record.salary_max_b2b)
            .bind(record.salary_min_other)
            .bind(record.salary_max_other)
            .bind(to_vec(&record.must_skills))
            .bind(to_vec(&record.nice_skills))
            .bind(record.available_remote)
            .bind(record.available_in_poland)
            .bind(to_vec(&record.locations))
            .execute(&self.pool)
            .await?;

        debug!(external_id = %record.external_id, "Upserted offer");
        Ok(())
    }

    async fn finish(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
