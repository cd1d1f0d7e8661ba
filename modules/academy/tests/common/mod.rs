#![allow(dead_code)]

use std::sync::Arc;

use academy::contract::model::*;
use academy::domain::repo::Storage;
use academy::domain::service::{Service, ServiceConfig};
use academy::infra::storage::{self, migrations::Migrator};
use chrono::NaiveDate;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;

/// Fresh in-memory SQLite storage with migrations applied.
pub async fn sqlite_storage() -> Storage {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    storage::sea_orm(db)
}

pub fn memory_service() -> Arc<Service> {
    Arc::new(Service::new(storage::in_memory(), ServiceConfig::default()))
}

pub async fn sqlite_service() -> Arc<Service> {
    Arc::new(Service::new(sqlite_storage().await, ServiceConfig::default()))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn user(svc: &Service, email: &str, role: Role) -> User {
    svc.create_user(NewUser {
        email: email.to_string(),
        display_name: email.split('@').next().unwrap_or(email).to_string(),
        role,
        phone: None,
    })
    .await
    .unwrap()
}

pub async fn branch(svc: &Service, code: &str) -> Branch {
    svc.create_branch(NewBranch {
        name: format!("Branch {code}"),
        code: code.to_string(),
        address: None,
    })
    .await
    .unwrap()
}

pub async fn course(svc: &Service, code: &str, category: &str) -> Course {
    svc.create_course(NewCourse {
        name: format!("Course {code}"),
        code: code.to_string(),
        category: category.to_string(),
        description: None,
        fee: 250_000,
        duration_weeks: Some(12),
    })
    .await
    .unwrap()
}

pub async fn teacher(svc: &Service, email: &str, user_id: Option<uuid::Uuid>) -> Employee {
    svc.create_employee(NewEmployee {
        name: "Meera".to_string(),
        email: email.to_string(),
        phone: None,
        designation: Designation::Teacher,
        branch_id: None,
        user_id,
        monthly_salary: 4_000_000,
    })
    .await
    .unwrap()
}

pub fn new_batch(course: &Course, branch: &Branch, start: NaiveDate) -> NewBatch {
    NewBatch {
        course_id: course.id,
        branch_id: branch.id,
        teacher_id: None,
        category: None,
        schedule: Some("Sat 10:00".to_string()),
        start_date: start,
        end_date: None,
        capacity: None,
    }
}

pub async fn student(svc: &Service, name: &str, parent_id: Option<uuid::Uuid>) -> Student {
    svc.create_student(NewStudent {
        name: name.to_string(),
        email: None,
        phone: None,
        date_of_birth: None,
        branch_id: None,
        parent_id,
        user_id: None,
    })
    .await
    .unwrap()
}

pub async fn enroll(svc: &Service, student: &Student, batch: &Batch) -> Enrollment {
    svc.enroll(NewEnrollment {
        student_id: student.id,
        batch_id: batch.id,
        enrolled_on: None,
        status: None,
    })
    .await
    .unwrap()
}
