use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    candidates::{
        dto::CandidateForm,
        filter::CandidateFilter,
        repo_types::{Candidate, CandidateStatus},
        validation,
    },
    db::RepoError,
    errors::AppError,
    resumes::ResumeUpload,
    state::AppState,
};

const NOT_FOUND: &str = "Candidate not found";
const DUPLICATE: &str = "A candidate with this email already exists";

fn not_found() -> AppError {
    AppError::NotFound(NOT_FOUND.into())
}

pub fn parse_candidate_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation("Invalid candidate ID format".into()))
}

pub fn parse_status(raw: Option<&str>) -> Result<CandidateStatus, AppError> {
    raw.and_then(|s| s.parse().ok()).ok_or_else(|| {
        AppError::Validation("Invalid status. Must be: Pending, Reviewed, or Hired".into())
    })
}

/// Best-effort removal of a stored resume; failures are logged only.
async fn discard_resume(st: &AppState, resume_url: &str) {
    if let Err(e) = st.resumes.delete(resume_url).await {
        error!(resume_url, error = ?e, "failed to delete resume");
    }
}

pub async fn create_candidate(
    st: &AppState,
    owner_id: Uuid,
    form: CandidateForm,
    resume: Option<ResumeUpload>,
) -> Result<Candidate, AppError> {
    let fields = validation::validate(form)?;

    if st
        .candidates
        .find_by_email(owner_id, &fields.email)
        .await?
        .is_some()
    {
        warn!(%owner_id, email = %fields.email, "duplicate candidate referral");
        return Err(AppError::Conflict(DUPLICATE.into()));
    }

    let resume_url = match resume {
        Some(upload) => Some(st.resumes.save(upload).await?),
        None => None,
    };

    let now = OffsetDateTime::now_utc();
    let candidate = Candidate {
        id: Uuid::new_v4(),
        name: fields.name,
        email: fields.email,
        phone: fields.phone,
        job_title: fields.job_title,
        status: CandidateStatus::Pending,
        resume_url,
        owner_id,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = st.candidates.insert(&candidate).await {
        // Don't leave an orphaned upload behind.
        if let Some(url) = &candidate.resume_url {
            discard_resume(st, url).await;
        }
        return Err(match e {
            RepoError::Duplicate(_) => AppError::Conflict(DUPLICATE.into()),
            other => other.into(),
        });
    }

    info!(%owner_id, candidate_id = %candidate.id, has_resume = candidate.resume_url.is_some(), "candidate referred");
    Ok(candidate)
}

pub async fn list_candidates(
    st: &AppState,
    owner_id: Uuid,
    filter: &CandidateFilter,
) -> Result<Vec<Candidate>, AppError> {
    Ok(st.candidates.list(owner_id, filter).await?)
}

pub async fn get_candidate(st: &AppState, owner_id: Uuid, id: Uuid) -> Result<Candidate, AppError> {
    st.candidates.find(owner_id, id).await?.ok_or_else(not_found)
}

pub async fn update_status(
    st: &AppState,
    owner_id: Uuid,
    id: Uuid,
    status: CandidateStatus,
) -> Result<Candidate, AppError> {
    let candidate = st
        .candidates
        .update_status(owner_id, id, status)
        .await?
        .ok_or_else(not_found)?;
    info!(%owner_id, candidate_id = %id, %status, "candidate status updated");
    Ok(candidate)
}

pub async fn delete_candidate(st: &AppState, owner_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let candidate = st.candidates.find(owner_id, id).await?.ok_or_else(not_found)?;

    if let Some(url) = &candidate.resume_url {
        discard_resume(st, url).await;
    }

    if !st.candidates.delete(owner_id, id).await? {
        return Err(not_found());
    }
    info!(%owner_id, candidate_id = %id, "candidate deleted");
    Ok(())
}

pub async fn resolve_resume_link(
    st: &AppState,
    owner_id: Uuid,
    id: Uuid,
) -> Result<String, AppError> {
    let candidate = st.candidates.find(owner_id, id).await?.ok_or_else(not_found)?;
    let Some(stored) = candidate.resume_url else {
        return Err(AppError::NotFound(
            "No resume found for this candidate".into(),
        ));
    };
    Ok(st.resumes.resolve(&stored).await?)
}
