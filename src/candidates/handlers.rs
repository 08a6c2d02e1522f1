use axum::{
    extract::{
        multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, FromRequest,
        Multipart, Path, Query, Request, State,
    },
    http::{header::CONTENT_TYPE, StatusCode},
    routing::{get, put},
    Json, Router,
};
use tracing::{debug, instrument};

use crate::{
    auth::jwt::AuthUser,
    candidates::{
        dto::{CandidateForm, ListQuery, ResumeLink, StatusUpdateRequest},
        filter::CandidateFilter,
        repo_types::Candidate,
        services,
    },
    errors::AppError,
    resumes::{validate_upload, ResumeUpload, MAX_RESUME_BYTES},
    response::ApiResponse,
    state::AppState,
};

/// Leaves room for the text parts next to a maximum-size resume.
const CREATE_BODY_LIMIT: usize = MAX_RESUME_BYTES + 512 * 1024;

pub fn candidate_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/candidates",
            get(list_candidates).post(create_candidate),
        )
        .route(
            "/candidates/:id",
            get(get_candidate).delete(delete_candidate),
        )
        .route("/candidates/:id/status", put(update_status))
        .route("/candidates/:id/resume", get(get_resume))
        .layer(DefaultBodyLimit::max(CREATE_BODY_LIMIT))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::Validation(e.body_text())
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Collects the text parts and the optional `resume` file part. The file is
/// checked before anything else so a bad upload fails regardless of the
/// other fields.
async fn read_multipart(
    mut mp: Multipart,
) -> Result<(CandidateForm, Option<ResumeUpload>), AppError> {
    let mut form = CandidateForm::default();
    let mut resume = None;

    while let Some(field) = mp.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if name == "resume" {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            // An untouched file input still submits an empty, unnamed part.
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            let upload = ResumeUpload {
                file_name,
                content_type,
                bytes,
            };
            validate_upload(&upload)?;
            resume = Some(upload);
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "name" => form.name = Some(value),
            "email" => form.email = Some(value),
            "phone" => form.phone = Some(value),
            "jobTitle" => form.job_title = Some(value),
            other => debug!(field = other, "ignoring unknown multipart field"),
        }
    }
    Ok((form, resume))
}

/// `POST /candidates`, multipart with an optional `resume` part or plain JSON.
#[instrument(skip(state, req))]
pub async fn create_candidate(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    req: Request,
) -> Result<ApiResponse<Candidate>, AppError> {
    let (form, resume) = if is_multipart(&req) {
        let mp = Multipart::from_request(req, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        read_multipart(mp).await?
    } else {
        let payload: Result<Json<CandidateForm>, JsonRejection> =
            Json::from_request(req, &state).await;
        let Json(form) = payload?;
        (form, None)
    };

    let candidate = services::create_candidate(&state, owner_id, form, resume).await?;
    Ok(ApiResponse::data(candidate)
        .with_message("Candidate referred successfully")
        .created())
}

#[instrument(skip(state))]
pub async fn list_candidates(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    query: Result<Query<ListQuery>, axum::extract::rejection::QueryRejection>,
) -> Result<ApiResponse<Vec<Candidate>>, AppError> {
    let Query(q) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let filter = CandidateFilter::from_query(
        q.status.as_deref(),
        q.job_title.as_deref(),
        q.search.as_deref(),
    )?;
    let candidates = services::list_candidates(&state, owner_id, &filter).await?;
    let count = candidates.len();
    Ok(ApiResponse::data(candidates).with_count(count))
}

#[instrument(skip(state))]
pub async fn get_candidate(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<Candidate>, AppError> {
    let id = services::parse_candidate_id(&id)?;
    let candidate = services::get_candidate(&state, owner_id, id).await?;
    Ok(ApiResponse::data(candidate))
}

#[instrument(skip(state, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<ApiResponse<Candidate>, AppError> {
    let id = services::parse_candidate_id(&id)?;
    let Json(payload) = payload?;
    let status = services::parse_status(payload.status.as_deref())?;
    let candidate = services::update_status(&state, owner_id, id, status).await?;
    Ok(ApiResponse::data(candidate).with_message("Candidate status updated successfully"))
}

#[instrument(skip(state))]
pub async fn delete_candidate(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    let id = services::parse_candidate_id(&id)?;
    services::delete_candidate(&state, owner_id, id).await?;
    Ok(ApiResponse::message("Candidate deleted successfully"))
}

/// Returns a fetchable URL; for the remote backend it is freshly signed.
#[instrument(skip(state))]
pub async fn get_resume(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<ResumeLink>, AppError> {
    let id = services::parse_candidate_id(&id)?;
    let resume_url = services::resolve_resume_link(&state, owner_id, id).await?;
    Ok(ApiResponse::data(ResumeLink { resume_url }))
}
