//! Students, their enrollments and the parent/student views of them.

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{validate_email, Service};
use crate::contract::model::{
    Batch, Enrollment, EnrollmentPatch, EnrollmentStatus, NewEnrollment, NewStudent, Role, Student,
    StudentPatch, User,
};
use crate::domain::error::DomainError;
use crate::domain::repo::{EnrollmentFilter, StudentFilter};

impl Service {
    #[instrument(name = "academy.service.list_students", skip(self))]
    pub async fn list_students(&self, filter: StudentFilter) -> Result<Vec<Student>, DomainError> {
        Ok(self.store.students.list(&filter).await?)
    }

    #[instrument(name = "academy.service.get_student", skip(self), fields(student_id = %id))]
    pub async fn get_student(&self, id: Uuid) -> Result<Student, DomainError> {
        Self::load(&self.store.students, id).await
    }

    #[instrument(name = "academy.service.create_student", skip(self))]
    pub async fn create_student(&self, new: NewStudent) -> Result<Student, DomainError> {
        self.validate_name("name", &new.name)?;
        if let Some(email) = &new.email {
            validate_email("email", email)?;
        }
        if let Some(branch_id) = new.branch_id {
            Self::ensure_exists(&self.store.branches, branch_id).await?;
        }
        if let Some(parent_id) = new.parent_id {
            self.ensure_user_role(parent_id, Role::Parent, "parent_id").await?;
        }
        if let Some(user_id) = new.user_id {
            self.ensure_user_role(user_id, Role::Student, "user_id").await?;
        }

        let now = Utc::now();
        let student = Student {
            id: Uuid::new_v4(),
            name: new.name.trim().to_string(),
            email: new.email,
            phone: new.phone,
            date_of_birth: new.date_of_birth,
            branch_id: new.branch_id,
            parent_id: new.parent_id,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        };
        self.store.students.insert(student.clone()).await?;
        info!("Successfully created student with id={}", student.id);
        Ok(student)
    }

    #[instrument(name = "academy.service.update_student", skip(self), fields(student_id = %id))]
    pub async fn update_student(&self, id: Uuid, patch: StudentPatch) -> Result<Student, DomainError> {
        let mut current = self.get_student(id).await?;
        if let Some(name) = patch.name {
            self.validate_name("name", &name)?;
            current.name = name.trim().to_string();
        }
        if let Some(email) = patch.email {
            validate_email("email", &email)?;
            current.email = Some(email);
        }
        if patch.phone.is_some() {
            current.phone = patch.phone;
        }
        if patch.date_of_birth.is_some() {
            current.date_of_birth = patch.date_of_birth;
        }
        if let Some(branch_id) = patch.branch_id {
            Self::ensure_exists(&self.store.branches, branch_id).await?;
            current.branch_id = Some(branch_id);
        }
        if let Some(parent_id) = patch.parent_id {
            self.ensure_user_role(parent_id, Role::Parent, "parent_id").await?;
            current.parent_id = Some(parent_id);
        }
        if let Some(user_id) = patch.user_id {
            self.ensure_user_role(user_id, Role::Student, "user_id").await?;
            current.user_id = Some(user_id);
        }
        current.updated_at = Utc::now();
        Self::replace(&self.store.students, current).await
    }

    #[instrument(name = "academy.service.delete_student", skip(self), fields(student_id = %id))]
    pub async fn delete_student(&self, id: Uuid) -> Result<(), DomainError> {
        Self::remove(&self.store.students, id).await
    }

    /// Student records the actor may see as a parent or a student. Admins pass
    /// every role gate but own no student records.
    #[instrument(name = "academy.service.linked_students", skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn linked_students(&self, actor: &User) -> Result<Vec<Student>, DomainError> {
        let filter = match actor.role {
            Role::Parent => StudentFilter {
                parent_id: Some(actor.id),
                ..Default::default()
            },
            Role::Student => StudentFilter {
                user_id: Some(actor.id),
                ..Default::default()
            },
            Role::Admin => return Ok(Vec::new()),
            Role::Teacher => {
                return Err(DomainError::forbidden(
                    "only parents and students have linked student records",
                ))
            }
        };
        Ok(self.store.students.list(&filter).await?)
    }

    /// Parent's children.
    pub async fn children_of(&self, parent: &User) -> Result<Vec<Student>, DomainError> {
        if !matches!(parent.role, Role::Parent | Role::Admin) {
            return Err(DomainError::forbidden("parent role required"));
        }
        self.linked_students(parent).await
    }

    /// Staff may view any student; parents their children, students themselves.
    pub(crate) async fn ensure_can_view_student(
        &self,
        actor: &User,
        student_id: Uuid,
    ) -> Result<Student, DomainError> {
        let student = self.get_student(student_id).await?;
        let allowed = match actor.role {
            Role::Admin | Role::Teacher => true,
            Role::Parent => student.parent_id == Some(actor.id),
            Role::Student => student.user_id == Some(actor.id),
        };
        if !allowed {
            return Err(DomainError::forbidden(
                "not allowed to view this student's records",
            ));
        }
        Ok(student)
    }

    async fn ensure_user_role(&self, user_id: Uuid, role: Role, field: &str) -> Result<(), DomainError> {
        let user = self.get_user(user_id).await?;
        if user.role != role {
            return Err(DomainError::validation(
                field,
                format!("user {user_id} must have the {role} role"),
            ));
        }
        Ok(())
    }

    #[instrument(name = "academy.service.list_enrollments", skip(self))]
    pub async fn list_enrollments(
        &self,
        filter: EnrollmentFilter,
    ) -> Result<Vec<Enrollment>, DomainError> {
        Ok(self.store.enrollments.list(&filter).await?)
    }

    #[instrument(name = "academy.service.get_enrollment", skip(self), fields(enrollment_id = %id))]
    pub async fn get_enrollment(&self, id: Uuid) -> Result<Enrollment, DomainError> {
        Self::load(&self.store.enrollments, id).await
    }

    #[instrument(
        name = "academy.service.enroll",
        skip(self),
        fields(student_id = %new.student_id, batch_id = %new.batch_id)
    )]
    pub async fn enroll(&self, new: NewEnrollment) -> Result<Enrollment, DomainError> {
        Self::ensure_exists(&self.store.students, new.student_id).await?;
        let batch = self.get_batch(new.batch_id).await?;

        let active = self.active_enrollments(batch.id).await?;
        if active.iter().any(|e| e.student_id == new.student_id) {
            return Err(DomainError::conflict(
                "Student is already enrolled in this batch",
            ));
        }
        let status = new.status.unwrap_or(EnrollmentStatus::Active);
        if status == EnrollmentStatus::Active {
            ensure_seat_left(&batch, active.len())?;
        }

        let now = Utc::now();
        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            student_id: new.student_id,
            batch_id: batch.id,
            enrolled_on: new.enrolled_on.unwrap_or_else(Self::today),
            status,
            created_at: now,
            updated_at: now,
        };
        self.store.enrollments.insert(enrollment.clone()).await?;
        info!("Successfully enrolled student, enrollment id={}", enrollment.id);
        Ok(enrollment)
    }

    #[instrument(name = "academy.service.update_enrollment", skip(self), fields(enrollment_id = %id))]
    pub async fn update_enrollment(
        &self,
        id: Uuid,
        patch: EnrollmentPatch,
    ) -> Result<Enrollment, DomainError> {
        let mut current = self.get_enrollment(id).await?;
        if let Some(enrolled_on) = patch.enrolled_on {
            current.enrolled_on = enrolled_on;
        }
        if let Some(status) = patch.status {
            if status == EnrollmentStatus::Active && current.status != EnrollmentStatus::Active {
                let batch = self.get_batch(current.batch_id).await?;
                let active = self.active_enrollments(batch.id).await?;
                if active.iter().any(|e| e.student_id == current.student_id) {
                    return Err(DomainError::conflict(
                        "Student is already enrolled in this batch",
                    ));
                }
                ensure_seat_left(&batch, active.len())?;
            }
            current.status = status;
        }
        current.updated_at = Utc::now();
        Self::replace(&self.store.enrollments, current).await
    }

    async fn active_enrollments(&self, batch_id: Uuid) -> Result<Vec<Enrollment>, DomainError> {
        Ok(self
            .store
            .enrollments
            .list(&EnrollmentFilter {
                batch_id: Some(batch_id),
                status: Some(EnrollmentStatus::Active),
                ..Default::default()
            })
            .await?)
    }

    #[instrument(name = "academy.service.delete_enrollment", skip(self), fields(enrollment_id = %id))]
    pub async fn delete_enrollment(&self, id: Uuid) -> Result<(), DomainError> {
        Self::remove(&self.store.enrollments, id).await
    }
}

/// Capacity counts active enrollments only.
fn ensure_seat_left(batch: &Batch, active: usize) -> Result<(), DomainError> {
    match batch.capacity {
        Some(capacity) if active >= capacity as usize => Err(DomainError::conflict(format!(
            "Batch {} is full ({capacity} students)",
            batch.code
        ))),
        _ => Ok(()),
    }
}
