//! Branches and courses.

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::Service;
use crate::contract::model::{Branch, BranchPatch, Course, CoursePatch, NewBranch, NewCourse};
use crate::domain::batch_code::normalize_code;
use crate::domain::error::DomainError;
use crate::domain::repo::{BranchFilter, CourseFilter};

impl Service {
    #[instrument(name = "academy.service.list_branches", skip(self))]
    pub async fn list_branches(&self) -> Result<Vec<Branch>, DomainError> {
        Ok(self.store.branches.list(&BranchFilter::default()).await?)
    }

    #[instrument(name = "academy.service.get_branch", skip(self), fields(branch_id = %id))]
    pub async fn get_branch(&self, id: Uuid) -> Result<Branch, DomainError> {
        Self::load(&self.store.branches, id).await
    }

    #[instrument(name = "academy.service.create_branch", skip(self), fields(code = %new.code))]
    pub async fn create_branch(&self, new: NewBranch) -> Result<Branch, DomainError> {
        self.validate_name("name", &new.name)?;
        let code = normalize_code("code", &new.code)?;
        self.ensure_branch_code_free(&code).await?;

        let now = Utc::now();
        let branch = Branch {
            id: Uuid::new_v4(),
            name: new.name.trim().to_string(),
            code,
            address: new.address,
            created_at: now,
            updated_at: now,
        };
        self.store.branches.insert(branch.clone()).await?;
        info!("Successfully created branch with id={}", branch.id);
        Ok(branch)
    }

    #[instrument(name = "academy.service.update_branch", skip(self), fields(branch_id = %id))]
    pub async fn update_branch(&self, id: Uuid, patch: BranchPatch) -> Result<Branch, DomainError> {
        let mut current = self.get_branch(id).await?;
        if let Some(name) = patch.name {
            self.validate_name("name", &name)?;
            current.name = name.trim().to_string();
        }
        if let Some(code) = patch.code {
            let code = normalize_code("code", &code)?;
            if code != current.code {
                self.ensure_branch_code_free(&code).await?;
            }
            current.code = code;
        }
        if patch.address.is_some() {
            current.address = patch.address;
        }
        current.updated_at = Utc::now();
        Self::replace(&self.store.branches, current).await
    }

    #[instrument(name = "academy.service.delete_branch", skip(self), fields(branch_id = %id))]
    pub async fn delete_branch(&self, id: Uuid) -> Result<(), DomainError> {
        Self::remove(&self.store.branches, id).await
    }

    async fn ensure_branch_code_free(&self, code: &str) -> Result<(), DomainError> {
        let filter = BranchFilter {
            code: Some(code.to_string()),
        };
        if !self.store.branches.list(&filter).await?.is_empty() {
            return Err(DomainError::conflict(format!(
                "Branch with code '{code}' already exists"
            )));
        }
        Ok(())
    }

    #[instrument(name = "academy.service.list_courses", skip(self))]
    pub async fn list_courses(&self, filter: CourseFilter) -> Result<Vec<Course>, DomainError> {
        Ok(self.store.courses.list(&filter).await?)
    }

    #[instrument(name = "academy.service.get_course", skip(self), fields(course_id = %id))]
    pub async fn get_course(&self, id: Uuid) -> Result<Course, DomainError> {
        Self::load(&self.store.courses, id).await
    }

    #[instrument(name = "academy.service.create_course", skip(self), fields(code = %new.code))]
    pub async fn create_course(&self, new: NewCourse) -> Result<Course, DomainError> {
        self.validate_name("name", &new.name)?;
        self.validate_name("category", &new.category)?;
        let code = normalize_code("code", &new.code)?;
        Self::validate_amount("fee", new.fee)?;
        if new.duration_weeks.is_some_and(|w| w <= 0) {
            return Err(DomainError::validation("duration_weeks", "must be positive"));
        }

        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4(),
            name: new.name.trim().to_string(),
            code,
            category: new.category.trim().to_lowercase(),
            description: new.description,
            fee: new.fee,
            duration_weeks: new.duration_weeks,
            created_at: now,
            updated_at: now,
        };
        self.store.courses.insert(course.clone()).await?;
        info!("Successfully created course with id={}", course.id);
        Ok(course)
    }

    #[instrument(name = "academy.service.update_course", skip(self), fields(course_id = %id))]
    pub async fn update_course(&self, id: Uuid, patch: CoursePatch) -> Result<Course, DomainError> {
        let mut current = self.get_course(id).await?;
        if let Some(name) = patch.name {
            self.validate_name("name", &name)?;
            current.name = name.trim().to_string();
        }
        if let Some(code) = patch.code {
            current.code = normalize_code("code", &code)?;
        }
        if let Some(category) = patch.category {
            self.validate_name("category", &category)?;
            current.category = category.trim().to_lowercase();
        }
        if patch.description.is_some() {
            current.description = patch.description;
        }
        if let Some(fee) = patch.fee {
            Self::validate_amount("fee", fee)?;
            current.fee = fee;
        }
        if let Some(weeks) = patch.duration_weeks {
            if weeks <= 0 {
                return Err(DomainError::validation("duration_weeks", "must be positive"));
            }
            current.duration_weeks = Some(weeks);
        }
        current.updated_at = Utc::now();
        Self::replace(&self.store.courses, current).await
    }

    #[instrument(name = "academy.service.delete_course", skip(self), fields(course_id = %id))]
    pub async fn delete_course(&self, id: Uuid) -> Result<(), DomainError> {
        Self::remove(&self.store.courses, id).await
    }
}
