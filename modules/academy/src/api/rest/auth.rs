//! Role guard. Authentication itself happens upstream: the session layer puts
//! the authenticated user's id into a trusted header and [`Principal`] loads
//! that user from storage.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderName, StatusCode},
};
use modkit::api::problem::ProblemResponse;
use uuid::Uuid;

use crate::api::rest::error::{from_parts, map_domain_error, RequestMeta};
use crate::contract::model::{Role, User};
use crate::domain::error::DomainError;
use crate::domain::service::Service;

/// Header carrying the authenticated user id, installed as a request extension.
#[derive(Debug, Clone)]
pub struct PrincipalHeader(pub HeaderName);

impl Default for PrincipalHeader {
    fn default() -> Self {
        Self(HeaderName::from_static("x-user-id"))
    }
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct Principal(pub User);

fn unauthenticated(detail: &str, meta: &RequestMeta) -> ProblemResponse {
    meta.attach(from_parts(
        StatusCode::UNAUTHORIZED,
        "UNAUTHENTICATED",
        "Unauthorized",
        detail,
        meta.path(),
    ))
}

impl Principal {
    pub fn user(&self) -> &User {
        &self.0
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }

    /// Admin passes every gate.
    pub fn has_any(&self, roles: &[Role]) -> bool {
        self.0.role == Role::Admin || roles.contains(&self.0.role)
    }

    pub fn require(&self, roles: &[Role], meta: &RequestMeta) -> Result<(), ProblemResponse> {
        if self.has_any(roles) {
            return Ok(());
        }
        let allowed: Vec<&str> = roles.iter().map(Role::as_str).collect();
        tracing::debug!(user_id = %self.0.id, role = %self.0.role, "role gate rejected request");
        Err(meta.attach(from_parts(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "Forbidden",
            format!("requires one of roles: {}", allowed.join(", ")),
            meta.path(),
        )))
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let meta = RequestMeta::of(parts);
        let header = parts
            .extensions
            .get::<PrincipalHeader>()
            .cloned()
            .unwrap_or_default();
        let svc = parts
            .extensions
            .get::<Arc<Service>>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("academy service extension missing");
                meta.attach(map_domain_error(
                    &DomainError::database("service not installed"),
                    meta.path(),
                ))
            })?;

        let raw = parts
            .headers
            .get(&header.0)
            .ok_or_else(|| unauthenticated("authentication required", &meta))?;
        let id = raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| unauthenticated("malformed user id", &meta))?;

        match svc.get_user(id).await {
            Ok(user) => Ok(Principal(user)),
            Err(DomainError::NotFound { .. }) => Err(unauthenticated("unknown user", &meta)),
            Err(e) => Err(meta.attach(map_domain_error(&e, meta.path()))),
        }
    }
}
