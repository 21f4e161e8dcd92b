//! Identity of the party issuing a request.
//!
//! Authentication happens upstream; the gateway forwards the verified identity as
//! `x-user-*` headers which are turned into a [`Caller`] here.

use crate::geography::Soato;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_TYPE_HEADER: &str = "x-user-type";
pub const USER_LOGIN_HEADER: &str = "x-user-login";
pub const USER_SOATO_HEADER: &str = "x-user-soato";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerKind {
    /// Registry staff, scoped to the region they administer.
    Staff { soato: Soato },
    Applicant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub login: String,
    pub kind: CallerKind,
}

impl Caller {
    pub fn staff(user_id: impl Into<String>, login: impl Into<String>, soato: Soato) -> Self {
        Self {
            user_id: UserId::new(user_id),
            login: login.into(),
            kind: CallerKind::Staff { soato },
        }
    }

    pub fn applicant(user_id: impl Into<String>, login: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            login: login.into(),
            kind: CallerKind::Applicant,
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.kind, CallerKind::Staff { .. })
    }

    pub fn staff_soato(&self) -> Option<Soato> {
        match self.kind {
            CallerKind::Staff { soato } => Some(soato),
            CallerKind::Applicant => None,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, CallerError> {
        let user_id = required(headers, USER_ID_HEADER)?;
        let user_type = required(headers, USER_TYPE_HEADER)?;
        let login = optional(headers, USER_LOGIN_HEADER)?.unwrap_or_default();

        match user_type.to_ascii_lowercase().as_str() {
            "staff" => {
                let raw = required(headers, USER_SOATO_HEADER)?;
                let soato = raw
                    .parse::<Soato>()
                    .map_err(|_| CallerError::InvalidHeader {
                        header: USER_SOATO_HEADER,
                        value: raw.clone(),
                    })?;
                Ok(Self::staff(user_id, login, soato))
            }
            "applicant" | "user" => Ok(Self::applicant(user_id, login)),
            _ => Err(CallerError::UnknownUserType(user_type)),
        }
    }
}

fn optional(headers: &HeaderMap, name: &'static str) -> Result<Option<String>, CallerError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|value| Some(value.trim().to_string()))
            .map_err(|_| CallerError::InvalidHeader {
                header: name,
                value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            }),
    }
}

fn required(headers: &HeaderMap, name: &'static str) -> Result<String, CallerError> {
    optional(headers, name)?
        .filter(|value| !value.is_empty())
        .ok_or(CallerError::MissingHeader(name))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallerError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("invalid {header} header '{value}'")]
    InvalidHeader { header: &'static str, value: String },
    #[error("unknown user type '{0}'")]
    UnknownUserType(String),
}

impl IntoResponse for CallerError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.to_string() });
        (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = CallerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Caller::from_headers(&parts.headers)
    }
}
