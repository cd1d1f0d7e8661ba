//! Persistence ports. The domain only sees `Repository<T>`; the memory and
//! SeaORM adapters live in `infra::storage`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::contract::model::*;

/// A stored row: identity, creation time (for ordering) and the equality
/// filter its list operation understands.
pub trait Record: Clone + Send + Sync + 'static {
    type Filter: Default + Clone + Send + Sync + std::fmt::Debug;

    /// Entity name used in errors and logs.
    const ENTITY: &'static str;

    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    fn matches(&self, filter: &Self::Filter) -> bool;
}

/// Port for the domain layer. Object-safe and async-friendly via `async_trait`.
///
/// Lists are ordered by `(created_at, id)`.
#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<T>>;
    async fn list(&self, filter: &T::Filter) -> anyhow::Result<Vec<T>>;
    /// Insert a fully-formed record; the service computes ids and timestamps.
    async fn insert(&self, record: T) -> anyhow::Result<()>;
    /// Replace by primary key. Returns false if no row had that id.
    async fn update(&self, record: T) -> anyhow::Result<bool>;
    /// Single-row delete, no cascade. Returns true if a row was deleted.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

fn eq<V: PartialEq>(want: &Option<V>, have: &V) -> bool {
    want.as_ref().map_or(true, |w| w == have)
}

fn eq_opt<V: PartialEq>(want: &Option<V>, have: &Option<V>) -> bool {
    want.is_none() || want.as_ref() == have.as_ref()
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl Record for User {
    type Filter = UserFilter;
    const ENTITY: &'static str = "User";

    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn matches(&self, f: &UserFilter) -> bool {
        eq(&f.email, &self.email) && eq(&f.role, &self.role)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BranchFilter {
    pub code: Option<String>,
}

impl Record for Branch {
    type Filter = BranchFilter;
    const ENTITY: &'static str = "Branch";

    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn matches(&self, f: &BranchFilter) -> bool {
        eq(&f.code, &self.code)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub category: Option<String>,
}

impl Record for Course {
    type Filter = CourseFilter;
    const ENTITY: &'static str = "Course";

    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn matches(&self, f: &CourseFilter) -> bool {
        eq(&f.category, &self.category)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    pub branch_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl Record for Employee {
    type Filter = EmployeeFilter;
    const ENTITY: &'static str = "Employee";

    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn matches(&self, f: &EmployeeFilter) -> bool {
        eq_opt(&f.branch_id, &self.branch_id) && eq_opt(&f.user_id, &self.user_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub code: Option<String>,
    pub course_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub category: Option<String>,
}

impl Record for Batch {
    type Filter = BatchFilter;
    const ENTITY: &'static str = "Batch";

    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn matches(&self, f: &BatchFilter) -> bool {
        eq(&f.code, &self.code)
            && eq(&f.course_id, &self.course_id)
            && eq(&f.branch_id, &self.branch_id)
            && eq_opt(&f.teacher_id, &self.teacher_id)
            && eq(&f.category, &self.category)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub branch_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl Record for Student {
    type Filter = StudentFilter;
    const ENTITY: &'static str = "Student";

    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn matches(&self, f: &StudentFilter) -> bool {
        eq_opt(&f.branch_id, &self.branch_id)
            && eq_opt(&f.parent_id, &self.parent_id)
            && eq_opt(&f.user_id, &self.user_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnrollmentFilter {
    pub student_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub status: Option<EnrollmentStatus>,
}

impl Record for Enrollment {
    type Filter = EnrollmentFilter;
    const ENTITY: &'static str = "Enrollment";

    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn matches(&self, f: &EnrollmentFilter) -> bool {
        eq(&f.student_id, &self.student_id)
            && eq(&f.batch_id, &self.batch_id)
            && eq(&f.status, &self.status)
    }
}

/// `from`/`to` bound `date` inclusively.
#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub enrollment_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl Record for Attendance {
    type Filter = AttendanceFilter;
    const ENTITY: &'static str = "Attendance";

    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn matches(&self, f: &AttendanceFilter) -> bool {
        eq(&f.enrollment_id, &self.enrollment_id)
            && eq(&f.student_id, &self.student_id)
            && eq(&f.batch_id, &self.batch_id)
            && eq(&f.date, &self.date)
            && f.from.map_or(true, |from| self.date >= from)
            && f.to.map_or(true, |to| self.date <= to)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub student_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
    pub invoice_number: Option<String>,
}

impl Record for Payment {
    type Filter = PaymentFilter;
    const ENTITY: &'static str = "Payment";

    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn matches(&self, f: &PaymentFilter) -> bool {
        eq(&f.student_id, &self.student_id)
            && eq(&f.status, &self.status)
            && eq(&f.invoice_number, &self.invoice_number)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PayrollFilter {
    pub employee_id: Option<Uuid>,
    pub month: Option<String>,
}

impl Record for Payroll {
    type Filter = PayrollFilter;
    const ENTITY: &'static str = "Payroll";

    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn matches(&self, f: &PayrollFilter) -> bool {
        eq(&f.employee_id, &self.employee_id) && eq(&f.month, &self.month)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub sender_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
}

impl Record for Message {
    type Filter = MessageFilter;
    const ENTITY: &'static str = "Message";

    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn matches(&self, f: &MessageFilter) -> bool {
        eq(&f.sender_id, &self.sender_id) && eq(&f.recipient_id, &self.recipient_id)
    }
}

/// One repository per entity, shared by every service operation.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn Repository<User>>,
    pub branches: Arc<dyn Repository<Branch>>,
    pub courses: Arc<dyn Repository<Course>>,
    pub employees: Arc<dyn Repository<Employee>>,
    pub batches: Arc<dyn Repository<Batch>>,
    pub students: Arc<dyn Repository<Student>>,
    pub enrollments: Arc<dyn Repository<Enrollment>>,
    pub attendance: Arc<dyn Repository<Attendance>>,
    pub payments: Arc<dyn Repository<Payment>>,
    pub payrolls: Arc<dyn Repository<Payroll>>,
    pub messages: Arc<dyn Repository<Message>>,
}
