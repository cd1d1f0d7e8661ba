use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{validate_email, Service};
use crate::contract::model::{NewUser, Role, User, UserPatch};
use crate::domain::error::DomainError;
use crate::domain::repo::UserFilter;

impl Service {
    #[instrument(name = "academy.service.list_users", skip(self))]
    pub async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, DomainError> {
        let users = self.store.users.list(&filter).await?;
        debug!("Listed {} users", users.len());
        Ok(users)
    }

    #[instrument(name = "academy.service.get_user", skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: Uuid) -> Result<User, DomainError> {
        Self::load(&self.store.users, id).await
    }

    #[instrument(
        name = "academy.service.create_user",
        skip(self),
        fields(email = %new_user.email, role = %new_user.role)
    )]
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Creating new user");

        let email = new_user.email.trim().to_lowercase();
        validate_email("email", &email)?;
        self.validate_name("display_name", &new_user.display_name)?;
        self.ensure_email_free(&email).await?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            display_name: new_user.display_name.trim().to_string(),
            role: new_user.role,
            phone: new_user.phone,
            created_at: now,
            updated_at: now,
        };
        self.store.users.insert(user.clone()).await?;

        info!("Successfully created user with id={}", user.id);
        Ok(user)
    }

    #[instrument(name = "academy.service.update_user", skip(self), fields(user_id = %id))]
    pub async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<User, DomainError> {
        let mut current = self.get_user(id).await?;

        if let Some(email) = patch.email {
            let email = email.trim().to_lowercase();
            validate_email("email", &email)?;
            if email != current.email {
                self.ensure_email_free(&email).await?;
            }
            current.email = email;
        }
        if let Some(display_name) = patch.display_name {
            self.validate_name("display_name", &display_name)?;
            current.display_name = display_name.trim().to_string();
        }
        if let Some(role) = patch.role {
            current.role = role;
        }
        if patch.phone.is_some() {
            current.phone = patch.phone;
        }
        current.updated_at = Utc::now();

        Self::replace(&self.store.users, current).await
    }

    #[instrument(name = "academy.service.delete_user", skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: Uuid) -> Result<(), DomainError> {
        Self::remove(&self.store.users, id).await?;
        info!("Successfully deleted user");
        Ok(())
    }

    /// Creates the configured admin when no user exists yet.
    #[instrument(name = "academy.service.bootstrap_admin", skip(self))]
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        display_name: &str,
    ) -> Result<Option<User>, DomainError> {
        if !self.store.users.list(&UserFilter::default()).await?.is_empty() {
            debug!("Users present, skipping admin bootstrap");
            return Ok(None);
        }
        let admin = self
            .create_user(NewUser {
                email: email.to_string(),
                display_name: display_name.to_string(),
                role: Role::Admin,
                phone: None,
            })
            .await?;
        info!(admin_id = %admin.id, "Bootstrapped admin user");
        Ok(Some(admin))
    }

    async fn ensure_email_free(&self, email: &str) -> Result<(), DomainError> {
        let filter = UserFilter {
            email: Some(email.to_string()),
            ..Default::default()
        };
        if !self.store.users.list(&filter).await?.is_empty() {
            return Err(DomainError::conflict(format!(
                "User with email '{email}' already exists"
            )));
        }
        Ok(())
    }
}
