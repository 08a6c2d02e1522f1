use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::User,
    },
    db::RepoError,
    errors::AppError,
    state::AppState,
};

const MIN_NAME_LEN: usize = 2;
const MIN_PASSWORD_LEN: usize = 8;
const BAD_CREDENTIALS: &str = "Invalid email or password";
const EMAIL_TAKEN: &str = "User with this email already exists";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();
    let name = req.name.trim();
    if name.is_empty() {
        errors.push("Name is required".to_string());
    } else if name.chars().count() < MIN_NAME_LEN {
        errors.push(format!("Name must be at least {MIN_NAME_LEN} characters long"));
    }
    if req.email.is_empty() {
        errors.push("Email is required".to_string());
    } else if !is_valid_email(&req.email) {
        errors.push("Please provide a valid email address".to_string());
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors.join(", ")))
    }
}

pub async fn register(st: &AppState, mut req: RegisterRequest) -> Result<AuthResponse, AppError> {
    req.email = normalize_email(&req.email);
    if let Err(e) = validate_registration(&req) {
        warn!(email = %req.email, error = %e, "registration rejected");
        return Err(e);
    }

    if st.users.find_by_email(&req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(AppError::Conflict(EMAIL_TAKEN.into()));
    }

    let user = User {
        id: Uuid::new_v4(),
        name: req.name.trim().to_string(),
        email: req.email,
        password_hash: hash_password(&req.password)?,
        created_at: OffsetDateTime::now_utc(),
    };
    let user = match st.users.create(user).await {
        Ok(u) => u,
        Err(RepoError::Duplicate(_)) => return Err(AppError::Conflict(EMAIL_TAKEN.into())),
        Err(e) => return Err(e.into()),
    };

    let token = JwtKeys::from_ref(st).sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(AuthResponse {
        user: user.into(),
        token,
    })
}

pub async fn login(st: &AppState, req: LoginRequest) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Please provide email and password".into(),
        ));
    }

    let Some(user) = st.users.find_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let token = JwtKeys::from_ref(st).sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(AuthResponse {
        user: user.into(),
        token,
    })
}

pub async fn current_user(st: &AppState, user_id: Uuid) -> Result<PublicUser, AppError> {
    st.users
        .find_by_id(user_id)
        .await?
        .map(PublicUser::from)
        .ok_or_else(|| {
            warn!(%user_id, "token refers to a missing user");
            AppError::NotFound("User not found".into())
        })
}
