use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::candidates::filter::CandidateFilter;
use crate::candidates::repo::CandidateRepository;
use crate::candidates::repo_types::{Candidate, CandidateStatus};
use crate::db::RepoError;

/// Insertion-ordered store enforcing the (owner, email) uniqueness the
/// Postgres table enforces.
#[derive(Clone, Default)]
pub struct InMemoryCandidateRepository {
    storage: Arc<RwLock<Vec<Candidate>>>,
}

impl InMemoryCandidateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Same semantics as the Postgres `ILIKE` query: AND across criteria,
/// `search` is an OR over name, job title and email.
fn filter_matches(filter: &CandidateFilter, c: &Candidate) -> bool {
    if filter.status.is_some_and(|s| s != c.status) {
        return false;
    }
    if let Some(jt) = &filter.job_title {
        if !contains_ci(&c.job_title, jt) {
            return false;
        }
    }
    if let Some(term) = &filter.search {
        return [&c.name, &c.job_title, &c.email]
            .into_iter()
            .any(|field| contains_ci(field, term));
    }
    true
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl CandidateRepository for InMemoryCandidateRepository {
    async fn insert(&self, candidate: &Candidate) -> Result<(), RepoError> {
        let mut storage = self.storage.write().await;
        if storage
            .iter()
            .any(|c| c.owner_id == candidate.owner_id && c.email == candidate.email)
        {
            return Err(RepoError::Duplicate("candidate"));
        }
        storage.push(candidate.clone());
        Ok(())
    }

    async fn find_by_email(
        &self,
        owner_id: Uuid,
        email: &str,
    ) -> Result<Option<Candidate>, RepoError> {
        let storage = self.storage.read().await;
        Ok(storage
            .iter()
            .find(|c| c.owner_id == owner_id && c.email == email)
            .cloned())
    }

    async fn find(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Candidate>, RepoError> {
        let storage = self.storage.read().await;
        Ok(storage
            .iter()
            .find(|c| c.owner_id == owner_id && c.id == id)
            .cloned())
    }

    async fn list(
        &self,
        owner_id: Uuid,
        filter: &CandidateFilter,
    ) -> Result<Vec<Candidate>, RepoError> {
        let storage = self.storage.read().await;
        let mut out: Vec<Candidate> = storage
            .iter()
            .rev()
            .filter(|c| c.owner_id == owner_id && filter_matches(filter, c))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn update_status(
        &self,
        owner_id: Uuid,
        id: Uuid,
        status: CandidateStatus,
    ) -> Result<Option<Candidate>, RepoError> {
        let mut storage = self.storage.write().await;
        Ok(storage
            .iter_mut()
            .find(|c| c.owner_id == owner_id && c.id == id)
            .map(|c| {
                c.status = status;
                c.updated_at = OffsetDateTime::now_utc();
                c.clone()
            }))
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, RepoError> {
        let mut storage = self.storage.write().await;
        let before = storage.len();
        storage.retain(|c| !(c.owner_id == owner_id && c.id == id));
        Ok(storage.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, email: &str, job_title: &str, status: CandidateStatus) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            phone: "9876543210".into(),
            job_title: job_title.into(),
            status,
            resume_url: None,
            owner_id: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn search_matches_any_field_case_insensitively() {
        let devops = candidate("David Kumar", "david@techcorp.com", "DevOps Engineer", CandidateStatus::Pending);
        let designer = candidate("Priya Sharma", "priya@infosys.com", "UI/UX Designer", CandidateStatus::Pending);
        let f = CandidateFilter::from_query(None, None, Some("devops")).unwrap();
        assert!(filter_matches(&f, &devops));
        assert!(!filter_matches(&f, &designer));

        let by_email = CandidateFilter::from_query(None, None, Some("INFOSYS")).unwrap();
        assert!(filter_matches(&by_email, &designer));
        let by_name = CandidateFilter::from_query(None, None, Some("kumar")).unwrap();
        assert!(filter_matches(&by_name, &devops));
    }

    #[test]
    fn criteria_compose_with_and() {
        let hired_dev = candidate("Emily", "emily@yahoo.com", "Full Stack Developer", CandidateStatus::Hired);
        let pending_dev = candidate("Sarah", "sarah@gmail.com", "Frontend Developer", CandidateStatus::Pending);

        let f = CandidateFilter::from_query(Some("Hired"), Some("developer"), Some("emily")).unwrap();
        assert!(filter_matches(&f, &hired_dev));
        assert!(!filter_matches(&f, &pending_dev));

        let f = CandidateFilter::from_query(Some("Hired"), Some("designer"), None).unwrap();
        assert!(!filter_matches(&f, &hired_dev));
    }
}
