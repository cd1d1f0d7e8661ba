use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::Service;
use crate::contract::model::{
    Batch, BatchPatch, Branch, Course, EnrollmentStatus, NewBatch, Student,
};
use crate::domain::batch_code;
use crate::domain::error::DomainError;
use crate::domain::repo::{BatchFilter, EnrollmentFilter};

impl Service {
    #[instrument(name = "academy.service.list_batches", skip(self))]
    pub async fn list_batches(&self, filter: BatchFilter) -> Result<Vec<Batch>, DomainError> {
        Ok(self.store.batches.list(&filter).await?)
    }

    #[instrument(name = "academy.service.get_batch", skip(self), fields(batch_id = %id))]
    pub async fn get_batch(&self, id: Uuid) -> Result<Batch, DomainError> {
        Self::load(&self.store.batches, id).await
    }

    /// Code the next batch for this course, branch and start date would get.
    #[instrument(name = "academy.service.preview_batch_code", skip(self))]
    pub async fn preview_batch_code(
        &self,
        course_id: Uuid,
        branch_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<String, DomainError> {
        let course = self.get_course(course_id).await?;
        let branch = self.get_branch(branch_id).await?;
        self.next_batch_code(&course, &branch, &course.category, start_date)
            .await
    }

    #[instrument(
        name = "academy.service.create_batch",
        skip(self),
        fields(course_id = %new.course_id, branch_id = %new.branch_id)
    )]
    pub async fn create_batch(&self, new: NewBatch) -> Result<Batch, DomainError> {
        info!("Creating new batch");

        let course = self.get_course(new.course_id).await?;
        let branch = self.get_branch(new.branch_id).await?;
        if let Some(teacher_id) = new.teacher_id {
            Self::ensure_exists(&self.store.employees, teacher_id).await?;
        }
        Self::validate_batch_dates(new.start_date, new.end_date)?;
        Self::validate_capacity(new.capacity)?;
        let category = match new.category {
            Some(c) => {
                self.validate_name("category", &c)?;
                c.trim().to_lowercase()
            }
            None => course.category.clone(),
        };

        let _guard = self.batch_codes.lock().await;
        let code = self
            .next_batch_code(&course, &branch, &category, new.start_date)
            .await?;
        let taken = BatchFilter {
            code: Some(code.clone()),
            ..Default::default()
        };
        if !self.store.batches.list(&taken).await?.is_empty() {
            return Err(DomainError::conflict(format!(
                "Batch code '{code}' is already taken"
            )));
        }

        let now = Utc::now();
        let batch = Batch {
            id: Uuid::new_v4(),
            code,
            course_id: course.id,
            branch_id: branch.id,
            teacher_id: new.teacher_id,
            category,
            schedule: new.schedule,
            start_date: new.start_date,
            end_date: new.end_date,
            capacity: new.capacity,
            created_at: now,
            updated_at: now,
        };
        self.store.batches.insert(batch.clone()).await?;

        info!(code = %batch.code, "Successfully created batch with id={}", batch.id);
        Ok(batch)
    }

    /// The code is never regenerated; course and branch cannot change.
    #[instrument(name = "academy.service.update_batch", skip(self), fields(batch_id = %id))]
    pub async fn update_batch(&self, id: Uuid, patch: BatchPatch) -> Result<Batch, DomainError> {
        let mut current = self.get_batch(id).await?;

        if patch.course_id.is_some_and(|c| c != current.course_id) {
            return Err(DomainError::validation(
                "course_id",
                "cannot be changed after the batch code is generated",
            ));
        }
        if patch.branch_id.is_some_and(|b| b != current.branch_id) {
            return Err(DomainError::validation(
                "branch_id",
                "cannot be changed after the batch code is generated",
            ));
        }
        if let Some(teacher_id) = patch.teacher_id {
            Self::ensure_exists(&self.store.employees, teacher_id).await?;
            current.teacher_id = Some(teacher_id);
        }
        if patch.schedule.is_some() {
            current.schedule = patch.schedule;
        }
        if let Some(start) = patch.start_date {
            current.start_date = start;
        }
        if patch.end_date.is_some() {
            current.end_date = patch.end_date;
        }
        if patch.capacity.is_some() {
            Self::validate_capacity(patch.capacity)?;
            current.capacity = patch.capacity;
        }
        Self::validate_batch_dates(current.start_date, current.end_date)?;
        current.updated_at = Utc::now();

        Self::replace(&self.store.batches, current).await
    }

    #[instrument(name = "academy.service.delete_batch", skip(self), fields(batch_id = %id))]
    pub async fn delete_batch(&self, id: Uuid) -> Result<(), DomainError> {
        Self::remove(&self.store.batches, id).await
    }

    /// Students with an active enrollment in the batch.
    #[instrument(name = "academy.service.batch_students", skip(self), fields(batch_id = %id))]
    pub async fn batch_students(&self, id: Uuid) -> Result<Vec<Student>, DomainError> {
        Self::ensure_exists(&self.store.batches, id).await?;
        let filter = EnrollmentFilter {
            batch_id: Some(id),
            status: Some(EnrollmentStatus::Active),
            ..Default::default()
        };
        let mut students = Vec::new();
        for enrollment in self.store.enrollments.list(&filter).await? {
            match self.store.students.find_by_id(enrollment.student_id).await? {
                Some(s) => students.push(s),
                None => debug!(student_id = %enrollment.student_id, "enrollment points to a deleted student"),
            }
        }
        Ok(students)
    }

    async fn next_batch_code(
        &self,
        course: &Course,
        branch: &Branch,
        category: &str,
        start_date: NaiveDate,
    ) -> Result<String, DomainError> {
        let course_code = batch_code::normalize_code("course.code", &course.code)?;
        let branch_code = batch_code::normalize_code("branch.code", &branch.code)?;

        // Serial scope is (branch, category), but the code itself carries neither
        // the category nor the course id; same-prefix codes of the same year count too.
        let in_branch = BatchFilter {
            branch_id: Some(branch.id),
            ..Default::default()
        };
        let existing = self.store.batches.list(&in_branch).await?;
        let relevant = existing.iter().filter(|b| {
            b.category == category
                || batch_code::same_family(&b.code, &course_code, &branch_code, start_date)
        });
        let serial = batch_code::next_serial(relevant.map(|b| b.code.as_str()))
            .ok_or_else(|| DomainError::batch_serial_exhausted(&branch_code, category))?;

        Ok(batch_code::format_code(&course_code, &branch_code, serial, start_date))
    }

    fn validate_batch_dates(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), DomainError> {
        if end.is_some_and(|end| end < start) {
            return Err(DomainError::validation(
                "end_date",
                "cannot be before start_date",
            ));
        }
        Ok(())
    }

    fn validate_capacity(capacity: Option<i32>) -> Result<(), DomainError> {
        if capacity.is_some_and(|c| c <= 0) {
            return Err(DomainError::validation("capacity", "must be positive"));
        }
        Ok(())
    }
}
