use crate::geography::Soato;

/// Input rejected before any repository is touched. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} '{value}' is not a valid identifier")]
    InvalidId { field: &'static str, value: String },
    #[error("district soato required")]
    MissingSoato,
    #[error("region code is fixed at {stored}; submitted district belongs to {submitted}")]
    SoatoChanged { stored: Soato, submitted: Soato },
    #[error("{field} must be at least 1")]
    InvalidPagination { field: &'static str },
    #[error("{field} '{value}' must be formatted as YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },
    #[error("from_date must not be later than to_date")]
    InvertedDateRange,
    #[error("comment is required")]
    MissingComment,
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("property order {0} is used more than once in the group")]
    DuplicateOrder(u32),
    #[error("property {0} is listed more than once in the group")]
    DuplicateMember(String),
    #[error("{0} properties need at least one option")]
    MissingOptions(&'static str),
    #[error("'{0}' is not a registry number")]
    InvalidNumber(String),
}
