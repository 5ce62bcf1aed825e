//! Boundary with the authentication collaborator.
//!
//! Authentication itself happens upstream; by the time a request reaches
//! these routes the gateway has attached the caller's identity headers.
//! [`identity_from_headers`] turns them into a [`Principal`] extension and
//! the [`Principal`] extractor rejects requests that carry none.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Site-wide role; class membership is asked of the roster instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))
    }
}

fn principal_from_parts(parts: &Parts) -> Option<Principal> {
    let id = parts
        .headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()
        .and_then(|value| Uuid::parse_str(value.trim()).ok())?;

    let role = match parts
        .headers
        .get(USER_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        Some(value) if value.trim().eq_ignore_ascii_case("admin") => Role::Admin,
        _ => Role::User,
    };

    Some(Principal { id, role })
}

pub async fn identity_from_headers(request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    match principal_from_parts(&parts) {
        Some(principal) => {
            parts.extensions.insert(principal);
        }
        None => debug!("request carries no identity"),
    }

    next.run(Request::from_parts(parts, body)).await
}
