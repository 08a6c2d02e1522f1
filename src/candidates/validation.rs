use lazy_static::lazy_static;
use regex::Regex;

use crate::candidates::dto::CandidateForm;
use crate::errors::AppError;

lazy_static! {
    // ASCII word characters only; `\w` alone would admit any Unicode letter.
    static ref EMAIL_RE: Regex = Regex::new(
        r"^(?-u:\w)+([.-]?(?-u:\w)+)*@(?-u:\w)+([.-]?(?-u:\w)+)*(\.(?-u:\w){2,3})+$"
    )
    .unwrap();
    static ref PHONE_RE: Regex =
        Regex::new(r"^[+]?[(]?[0-9]{3}[)]?[-\s.]?[0-9]{3}[-\s.]?[0-9]{4,6}$").unwrap();
}

const MIN_NAME_LEN: usize = 2;

/// Submitted fields after trimming and normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCandidate {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub job_title: String,
}

/// Normalizes the form and checks every rule, reporting all failures at once.
pub fn validate(form: CandidateForm) -> Result<ValidCandidate, AppError> {
    let name = form.name.unwrap_or_default().trim().to_string();
    let email = form.email.unwrap_or_default().trim().to_lowercase();
    let phone = form.phone.unwrap_or_default().trim().to_string();
    let job_title = form.job_title.unwrap_or_default().trim().to_string();

    let mut errors: Vec<&str> = Vec::new();
    if name.is_empty() {
        errors.push("Candidate name is required");
    } else if name.chars().count() < MIN_NAME_LEN {
        errors.push("Name must be at least 2 characters long");
    }
    if email.is_empty() {
        errors.push("Email is required");
    } else if !EMAIL_RE.is_match(&email) {
        errors.push("Please provide a valid email address");
    }
    if phone.is_empty() {
        errors.push("Phone number is required");
    } else if !PHONE_RE.is_match(&phone) {
        errors.push("Please provide a valid phone number");
    }
    if job_title.is_empty() {
        errors.push("Job title is required");
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors.join(", ")));
    }
    Ok(ValidCandidate {
        name,
        email,
        phone,
        job_title,
    })
}
