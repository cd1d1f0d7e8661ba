use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use modkit::api::problem::{Problem, ProblemResponse};

use crate::domain::error::DomainError;

/// Path and request id of the current request, used to fill problem bodies.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    path: String,
    request_id: Option<String>,
}

impl RequestMeta {
    pub fn of(parts: &Parts) -> Self {
        Self {
            path: parts.uri.path().to_owned(),
            request_id: parts
                .headers
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn attach(&self, resp: ProblemResponse) -> ProblemResponse {
        match &self.request_id {
            Some(id) => ProblemResponse(resp.0.with_request_id(id.clone())),
            None => resp,
        }
    }
}

impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::of(parts))
    }
}

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> ProblemResponse {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.academy.local/{code}"))
        .with_code(code)
        .with_instance(instance);
    ProblemResponse(problem)
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::NotFound { entity, .. } => from_parts(
            StatusCode::NOT_FOUND,
            &format!("{}_NOT_FOUND", entity.to_uppercase()),
            "Not found",
            e.to_string(),
            instance,
        ),
        DomainError::Validation { .. } => from_parts(
            StatusCode::BAD_REQUEST,
            "VALIDATION",
            "Validation error",
            e.to_string(),
            instance,
        ),
        DomainError::Conflict { .. } => from_parts(
            StatusCode::CONFLICT,
            "CONFLICT",
            "Conflict",
            e.to_string(),
            instance,
        ),
        DomainError::BatchSerialExhausted { .. } => from_parts(
            StatusCode::CONFLICT,
            "BATCH_SERIAL_EXHAUSTED",
            "Batch serial exhausted",
            e.to_string(),
            instance,
        ),
        DomainError::Forbidden { .. } => from_parts(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "Forbidden",
            e.to_string(),
            instance,
        ),
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_DB",
                "Internal error",
                "An internal database error occurred",
                instance,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn not_found_code_uses_entity_name() {
        let e = DomainError::not_found("Batch", Uuid::new_v4());
        let p = map_domain_error(&e, "/api/batches/x").0;
        assert_eq!(p.status, 404);
        assert_eq!(p.code, "BATCH_NOT_FOUND");
        assert_eq!(p.message, "Batch not found");
        assert_eq!(p.instance, "/api/batches/x");
    }

    #[test]
    fn database_errors_hide_internal_detail() {
        let e = DomainError::database("connection reset by peer");
        let p = map_domain_error(&e, "/api/users").0;
        assert_eq!(p.status, 500);
        assert_eq!(p.code, "INTERNAL_DB");
        assert!(!p.detail.contains("peer"));
    }

    #[test]
    fn serial_exhaustion_is_a_conflict() {
        let e = DomainError::batch_serial_exhausted("KR", "music");
        let p = map_domain_error(&e, "/api/batches").0;
        assert_eq!(p.status, 409);
        assert_eq!(p.code, "BATCH_SERIAL_EXHAUSTED");
    }
}
