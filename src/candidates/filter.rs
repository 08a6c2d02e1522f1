use crate::candidates::repo_types::CandidateStatus;
use crate::errors::AppError;

/// Value of `status` that disables status filtering.
pub const ALL_STATUSES: &str = "All";

/// List criteria. Set fields are AND-ed; `search` is an OR over name,
/// job title and email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateFilter {
    pub status: Option<CandidateStatus>,
    pub job_title: Option<String>,
    pub search: Option<String>,
}

impl CandidateFilter {
    /// Builds a filter from raw query values. Blank values are ignored.
    pub fn from_query(
        status: Option<&str>,
        job_title: Option<&str>,
        search: Option<&str>,
    ) -> Result<Self, AppError> {
        let status = match non_blank(status) {
            None => None,
            Some(s) if s == ALL_STATUSES => None,
            Some(s) => Some(s.parse::<CandidateStatus>().map_err(|_| {
                AppError::Validation(
                    "Invalid status filter. Must be: All, Pending, Reviewed, or Hired".into(),
                )
            })?),
        };
        Ok(Self {
            status,
            job_title: non_blank(job_title).map(str::to_string),
            search: non_blank(search).map(str::to_string),
        })
    }
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

/// `%term%` for ILIKE, with the user's own wildcards escaped.
pub fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_and_blank_disable_status_filter() {
        for raw in [None, Some(""), Some("  "), Some("All")] {
            let f = CandidateFilter::from_query(raw, None, None).unwrap();
            assert_eq!(f.status, None);
        }
        let f = CandidateFilter::from_query(Some("Hired"), Some(" "), Some("")).unwrap();
        assert_eq!(
            f,
            CandidateFilter {
                status: Some(CandidateStatus::Hired),
                job_title: None,
                search: None,
            }
        );
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let err = CandidateFilter::from_query(Some("Rejected"), None, None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("dev"), "%dev%");
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }
}
