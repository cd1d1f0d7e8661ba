//! Domain service with the academy's business rules. Depends only on the
//! repository ports, never on infra types.
//!
//! Operations are split by area; each file adds an `impl Service` block.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::repo::{Record, Repository, Storage};

mod attendance;
mod batches;
mod catalog;
mod finance;
mod messages;
mod students;
mod users;

pub use finance::invoice_number;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub max_name_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_name_length: 200,
        }
    }
}

#[derive(Clone)]
pub struct Service {
    store: Storage,
    config: ServiceConfig,
    // Serializes "generate code + insert" for batch creation
    batch_codes: Arc<Mutex<()>>,
    // Same for "pick invoice number + insert"
    invoice_numbers: Arc<Mutex<()>>,
}

impl Service {
    pub fn new(store: Storage, config: ServiceConfig) -> Self {
        Self {
            store,
            config,
            batch_codes: Arc::new(Mutex::new(())),
            invoice_numbers: Arc::new(Mutex::new(())),
        }
    }

    // --- shared helpers ---

    async fn load<T: Record>(repo: &Arc<dyn Repository<T>>, id: Uuid) -> Result<T, DomainError> {
        repo.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(T::ENTITY, id))
    }

    async fn ensure_exists<T: Record>(
        repo: &Arc<dyn Repository<T>>,
        id: Uuid,
    ) -> Result<(), DomainError> {
        Self::load(repo, id).await.map(|_| ())
    }

    async fn replace<T: Record>(repo: &Arc<dyn Repository<T>>, record: T) -> Result<T, DomainError> {
        if !repo.update(record.clone()).await? {
            return Err(DomainError::not_found(T::ENTITY, record.id()));
        }
        Ok(record)
    }

    async fn remove<T: Record>(repo: &Arc<dyn Repository<T>>, id: Uuid) -> Result<(), DomainError> {
        if !repo.delete(id).await? {
            return Err(DomainError::not_found(T::ENTITY, id));
        }
        Ok(())
    }

    fn validate_name(&self, field: &str, value: &str) -> Result<(), DomainError> {
        if value.trim().is_empty() {
            return Err(DomainError::validation(field, "cannot be empty"));
        }
        if value.chars().count() > self.config.max_name_length {
            return Err(DomainError::validation(
                field,
                format!("too long (max: {})", self.config.max_name_length),
            ));
        }
        Ok(())
    }

    fn validate_amount(field: &str, value: i64) -> Result<(), DomainError> {
        if value < 0 {
            return Err(DomainError::validation(field, "cannot be negative"));
        }
        Ok(())
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }
}

pub(crate) fn validate_email(field: &str, email: &str) -> Result<(), DomainError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(DomainError::validation(
            field,
            format!("'{email}' is not a valid email"),
        ));
    }
    Ok(())
}
