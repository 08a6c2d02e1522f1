use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::candidates::filter::{like_pattern, CandidateFilter};
use crate::candidates::repo_types::{Candidate, CandidateRow, CandidateStatus};
use crate::db::RepoError;

/// Candidate persistence. Every method except `insert` is owner-scoped.
#[async_trait]
pub trait CandidateRepository: Send + Sync {
    /// Fails with `RepoError::Duplicate` if the owner already has this email.
    async fn insert(&self, candidate: &Candidate) -> Result<(), RepoError>;
    async fn find_by_email(&self, owner_id: Uuid, email: &str)
        -> Result<Option<Candidate>, RepoError>;
    async fn find(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Candidate>, RepoError>;
    /// Newest first.
    async fn list(&self, owner_id: Uuid, filter: &CandidateFilter)
        -> Result<Vec<Candidate>, RepoError>;
    async fn update_status(
        &self,
        owner_id: Uuid,
        id: Uuid,
        status: CandidateStatus,
    ) -> Result<Option<Candidate>, RepoError>;
    /// Returns whether a row was removed.
    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, RepoError>;
}

const COLUMNS: &str =
    "id, owner_id, name, email, phone, job_title, status, resume_url, created_at, updated_at";

#[derive(Clone)]
pub struct PgCandidateRepository {
    db: PgPool,
}

impl PgCandidateRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn convert(rows: Vec<CandidateRow>) -> Result<Vec<Candidate>, RepoError> {
    rows.into_iter().map(Candidate::try_from).collect()
}

#[async_trait]
impl CandidateRepository for PgCandidateRepository {
    async fn insert(&self, c: &Candidate) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO candidates
                (id, owner_id, name, email, phone, job_title, status, resume_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(c.id)
        .bind(c.owner_id)
        .bind(&c.name)
        .bind(&c.email)
        .bind(&c.phone)
        .bind(&c.job_title)
        .bind(c.status.as_str())
        .bind(&c.resume_url)
        .bind(c.created_at)
        .bind(c.updated_at)
        .execute(&self.db)
        .await
        .map_err(|e| RepoError::from_insert(e, "candidate"))?;
        Ok(())
    }

    async fn find_by_email(
        &self,
        owner_id: Uuid,
        email: &str,
    ) -> Result<Option<Candidate>, RepoError> {
        let row = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {COLUMNS} FROM candidates WHERE owner_id = $1 AND email = $2"
        ))
        .bind(owner_id)
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        row.map(Candidate::try_from).transpose()
    }

    async fn find(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Candidate>, RepoError> {
        let row = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {COLUMNS} FROM candidates WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?;
        row.map(Candidate::try_from).transpose()
    }

    async fn list(
        &self,
        owner_id: Uuid,
        filter: &CandidateFilter,
    ) -> Result<Vec<Candidate>, RepoError> {
        let rows = sqlx::query_as::<_, CandidateRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM candidates
            WHERE owner_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR job_title ILIKE $3)
              AND ($4::text IS NULL OR name ILIKE $4 OR job_title ILIKE $4 OR email ILIKE $4)
            ORDER BY created_at DESC
            "#
        ))
        .bind(owner_id)
        .bind(filter.status.map(CandidateStatus::as_str))
        .bind(filter.job_title.as_deref().map(like_pattern))
        .bind(filter.search.as_deref().map(like_pattern))
        .fetch_all(&self.db)
        .await?;
        convert(rows)
    }

    async fn update_status(
        &self,
        owner_id: Uuid,
        id: Uuid,
        status: CandidateStatus,
    ) -> Result<Option<Candidate>, RepoError> {
        let row = sqlx::query_as::<_, CandidateRow>(&format!(
            r#"
            UPDATE candidates
               SET status = $3, updated_at = $4
             WHERE id = $1 AND owner_id = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(status.as_str())
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.db)
        .await?;
        row.map(Candidate::try_from).transpose()
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM candidates WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
