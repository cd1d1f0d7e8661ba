use thiserror::Error;
use uuid::Uuid;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{message}")]
    Conflict { message: String },

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("No batch serial left for branch {branch_code} in category '{category}'")]
    BatchSerialExhausted {
        branch_code: String,
        category: String,
    },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn batch_serial_exhausted(branch_code: impl Into<String>, category: impl Into<String>) -> Self {
        Self::BatchSerialExhausted {
            branch_code: branch_code.into(),
            category: category.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for DomainError {
    fn from(e: anyhow::Error) -> Self {
        Self::database(format!("{e:#}"))
    }
}
