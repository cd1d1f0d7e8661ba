use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::contract::model::*;

// ---- users ----

/// REST DTO for user representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserReq {
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserReq {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            role: u.role,
            phone: u.phone,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

impl From<CreateUserReq> for NewUser {
    fn from(req: CreateUserReq) -> Self {
        Self {
            email: req.email,
            display_name: req.display_name,
            role: req.role,
            phone: req.phone,
        }
    }
}

impl From<UpdateUserReq> for UserPatch {
    fn from(req: UpdateUserReq) -> Self {
        Self {
            email: req.email,
            display_name: req.display_name,
            role: req.role,
            phone: req.phone,
        }
    }
}

// ---- branches & courses ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BranchDto {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateBranchReq {
    pub name: String,
    /// Two ASCII letters; stored upper-cased.
    pub code: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateBranchReq {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
}

impl From<Branch> for BranchDto {
    fn from(b: Branch) -> Self {
        Self {
            id: b.id,
            name: b.name,
            code: b.code,
            address: b.address,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

impl From<CreateBranchReq> for NewBranch {
    fn from(req: CreateBranchReq) -> Self {
        Self {
            name: req.name,
            code: req.code,
            address: req.address,
        }
    }
}

impl From<UpdateBranchReq> for BranchPatch {
    fn from(req: UpdateBranchReq) -> Self {
        Self {
            name: req.name,
            code: req.code,
            address: req.address,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseDto {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub category: String,
    pub description: Option<String>,
    pub fee: i64,
    pub duration_weeks: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCourseReq {
    pub name: String,
    pub code: String,
    pub category: String,
    pub description: Option<String>,
    /// Minor currency units.
    pub fee: i64,
    pub duration_weeks: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateCourseReq {
    pub name: Option<String>,
    pub code: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub fee: Option<i64>,
    pub duration_weeks: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCoursesQuery {
    pub category: Option<String>,
}

impl From<Course> for CourseDto {
    fn from(c: Course) -> Self {
        Self {
            id: c.id,
            name: c.name,
            code: c.code,
            category: c.category,
            description: c.description,
            fee: c.fee,
            duration_weeks: c.duration_weeks,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl From<CreateCourseReq> for NewCourse {
    fn from(req: CreateCourseReq) -> Self {
        Self {
            name: req.name,
            code: req.code,
            category: req.category,
            description: req.description,
            fee: req.fee,
            duration_weeks: req.duration_weeks,
        }
    }
}

impl From<UpdateCourseReq> for CoursePatch {
    fn from(req: UpdateCourseReq) -> Self {
        Self {
            name: req.name,
            code: req.code,
            category: req.category,
            description: req.description,
            fee: req.fee,
            duration_weeks: req.duration_weeks,
        }
    }
}

// ---- employees ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmployeeDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub designation: Designation,
    pub branch_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub monthly_salary: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateEmployeeReq {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub designation: Designation,
    pub branch_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub monthly_salary: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateEmployeeReq {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub designation: Option<Designation>,
    pub branch_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub monthly_salary: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEmployeesQuery {
    pub branch_id: Option<Uuid>,
}

impl From<Employee> for EmployeeDto {
    fn from(e: Employee) -> Self {
        Self {
            id: e.id,
            name: e.name,
            email: e.email,
            phone: e.phone,
            designation: e.designation,
            branch_id: e.branch_id,
            user_id: e.user_id,
            monthly_salary: e.monthly_salary,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

impl From<CreateEmployeeReq> for NewEmployee {
    fn from(req: CreateEmployeeReq) -> Self {
        Self {
            name: req.name,
            email: req.email,
            phone: req.phone,
            designation: req.designation,
            branch_id: req.branch_id,
            user_id: req.user_id,
            monthly_salary: req.monthly_salary,
        }
    }
}

impl From<UpdateEmployeeReq> for EmployeePatch {
    fn from(req: UpdateEmployeeReq) -> Self {
        Self {
            name: req.name,
            email: req.email,
            phone: req.phone,
            designation: req.designation,
            branch_id: req.branch_id,
            user_id: req.user_id,
            monthly_salary: req.monthly_salary,
        }
    }
}

// ---- batches ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchDto {
    pub id: Uuid,
    /// `{courseCode}{branchCode}{serial}{year}`
    pub code: String,
    pub course_id: Uuid,
    pub branch_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub category: String,
    pub schedule: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub capacity: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateBatchReq {
    pub course_id: Uuid,
    pub branch_id: Uuid,
    pub teacher_id: Option<Uuid>,
    /// Defaults to the course category.
    pub category: Option<String>,
    pub schedule: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateBatchReq {
    pub course_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub schedule: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListBatchesQuery {
    pub branch_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NextBatchCodeQuery {
    pub course_id: Uuid,
    pub branch_id: Uuid,
    /// Defaults to today.
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchCodeDto {
    pub code: String,
}

impl From<Batch> for BatchDto {
    fn from(b: Batch) -> Self {
        Self {
            id: b.id,
            code: b.code,
            course_id: b.course_id,
            branch_id: b.branch_id,
            teacher_id: b.teacher_id,
            category: b.category,
            schedule: b.schedule,
            start_date: b.start_date,
            end_date: b.end_date,
            capacity: b.capacity,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

impl From<CreateBatchReq> for NewBatch {
    fn from(req: CreateBatchReq) -> Self {
        Self {
            course_id: req.course_id,
            branch_id: req.branch_id,
            teacher_id: req.teacher_id,
            category: req.category,
            schedule: req.schedule,
            start_date: req.start_date,
            end_date: req.end_date,
            capacity: req.capacity,
        }
    }
}

impl From<UpdateBatchReq> for BatchPatch {
    fn from(req: UpdateBatchReq) -> Self {
        Self {
            course_id: req.course_id,
            branch_id: req.branch_id,
            teacher_id: req.teacher_id,
            schedule: req.schedule,
            start_date: req.start_date,
            end_date: req.end_date,
            capacity: req.capacity,
        }
    }
}

// ---- students & enrollments ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentDto {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub branch_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateStudentReq {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub branch_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateStudentReq {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub branch_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListStudentsQuery {
    pub branch_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
}

impl From<Student> for StudentDto {
    fn from(s: Student) -> Self {
        Self {
            id: s.id,
            name: s.name,
            email: s.email,
            phone: s.phone,
            date_of_birth: s.date_of_birth,
            branch_id: s.branch_id,
            parent_id: s.parent_id,
            user_id: s.user_id,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

impl From<CreateStudentReq> for NewStudent {
    fn from(req: CreateStudentReq) -> Self {
        Self {
            name: req.name,
            email: req.email,
            phone: req.phone,
            date_of_birth: req.date_of_birth,
            branch_id: req.branch_id,
            parent_id: req.parent_id,
            user_id: req.user_id,
        }
    }
}

impl From<UpdateStudentReq> for StudentPatch {
    fn from(req: UpdateStudentReq) -> Self {
        Self {
            name: req.name,
            email: req.email,
            phone: req.phone,
            date_of_birth: req.date_of_birth,
            branch_id: req.branch_id,
            parent_id: req.parent_id,
            user_id: req.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentDto {
    pub id: Uuid,
    pub student_id: Uuid,
    pub batch_id: Uuid,
    pub enrolled_on: NaiveDate,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateEnrollmentReq {
    pub student_id: Uuid,
    pub batch_id: Uuid,
    pub enrolled_on: Option<NaiveDate>,
    pub status: Option<EnrollmentStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateEnrollmentReq {
    pub enrolled_on: Option<NaiveDate>,
    pub status: Option<EnrollmentStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEnrollmentsQuery {
    pub student_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub status: Option<EnrollmentStatus>,
}

impl From<Enrollment> for EnrollmentDto {
    fn from(e: Enrollment) -> Self {
        Self {
            id: e.id,
            student_id: e.student_id,
            batch_id: e.batch_id,
            enrolled_on: e.enrolled_on,
            status: e.status,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

impl From<CreateEnrollmentReq> for NewEnrollment {
    fn from(req: CreateEnrollmentReq) -> Self {
        Self {
            student_id: req.student_id,
            batch_id: req.batch_id,
            enrolled_on: req.enrolled_on,
            status: req.status,
        }
    }
}

impl From<UpdateEnrollmentReq> for EnrollmentPatch {
    fn from(req: UpdateEnrollmentReq) -> Self {
        Self {
            enrolled_on: req.enrolled_on,
            status: req.status,
        }
    }
}

// ---- attendance ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceDto {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub student_id: Uuid,
    pub batch_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub marked_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecordReq {
    pub student_id: Uuid,
    pub status: AttendanceStatus,
}

/// Attendance for one batch session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkAttendanceReq {
    pub batch_id: Uuid,
    pub date: NaiveDate,
    pub records: Vec<AttendanceRecordReq>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAttendanceQuery {
    pub batch_id: Uuid,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSummaryDto {
    pub student_id: Uuid,
    pub total: u32,
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub excused: u32,
    pub percentage: f64,
}

impl From<Attendance> for AttendanceDto {
    fn from(a: Attendance) -> Self {
        Self {
            id: a.id,
            enrollment_id: a.enrollment_id,
            student_id: a.student_id,
            batch_id: a.batch_id,
            date: a.date,
            status: a.status,
            marked_by: a.marked_by,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

impl From<MarkAttendanceReq> for MarkAttendance {
    fn from(req: MarkAttendanceReq) -> Self {
        Self {
            batch_id: req.batch_id,
            date: req.date,
            marks: req
                .records
                .into_iter()
                .map(|r| AttendanceMark {
                    student_id: r.student_id,
                    status: r.status,
                })
                .collect(),
        }
    }
}

impl From<AttendanceSummary> for AttendanceSummaryDto {
    fn from(s: AttendanceSummary) -> Self {
        Self {
            student_id: s.student_id,
            total: s.total,
            present: s.present,
            absent: s.absent,
            late: s.late,
            excused: s.excused,
            percentage: s.percentage,
        }
    }
}

// ---- payments & payroll ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentDto {
    pub id: Uuid,
    pub student_id: Uuid,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub invoice_number: String,
    pub description: Option<String>,
    pub paid_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePaymentReq {
    pub student_id: Uuid,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: Option<PaymentStatus>,
    pub description: Option<String>,
    pub paid_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdatePaymentReq {
    pub amount: Option<i64>,
    pub method: Option<PaymentMethod>,
    pub status: Option<PaymentStatus>,
    pub description: Option<String>,
    pub paid_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListPaymentsQuery {
    pub student_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
}

impl From<Payment> for PaymentDto {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            student_id: p.student_id,
            amount: p.amount,
            method: p.method,
            status: p.status,
            invoice_number: p.invoice_number,
            description: p.description,
            paid_on: p.paid_on,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl From<CreatePaymentReq> for NewPayment {
    fn from(req: CreatePaymentReq) -> Self {
        Self {
            student_id: req.student_id,
            amount: req.amount,
            method: req.method,
            status: req.status,
            description: req.description,
            paid_on: req.paid_on,
        }
    }
}

impl From<UpdatePaymentReq> for PaymentPatch {
    fn from(req: UpdatePaymentReq) -> Self {
        Self {
            amount: req.amount,
            method: req.method,
            status: req.status,
            description: req.description,
            paid_on: req.paid_on,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayrollDto {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub month: String,
    pub base_salary: i64,
    pub bonus: i64,
    pub deductions: i64,
    pub net_amount: i64,
    pub status: PayrollStatus,
    pub paid_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePayrollReq {
    pub employee_id: Uuid,
    /// `YYYY-MM`
    pub month: String,
    pub base_salary: Option<i64>,
    #[serde(default)]
    pub bonus: i64,
    #[serde(default)]
    pub deductions: i64,
    pub status: Option<PayrollStatus>,
    pub paid_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdatePayrollReq {
    pub base_salary: Option<i64>,
    pub bonus: Option<i64>,
    pub deductions: Option<i64>,
    pub status: Option<PayrollStatus>,
    pub paid_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListPayrollsQuery {
    pub employee_id: Option<Uuid>,
    pub month: Option<String>,
}

impl From<Payroll> for PayrollDto {
    fn from(p: Payroll) -> Self {
        Self {
            id: p.id,
            employee_id: p.employee_id,
            month: p.month,
            base_salary: p.base_salary,
            bonus: p.bonus,
            deductions: p.deductions,
            net_amount: p.net_amount,
            status: p.status,
            paid_on: p.paid_on,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl From<CreatePayrollReq> for NewPayroll {
    fn from(req: CreatePayrollReq) -> Self {
        Self {
            employee_id: req.employee_id,
            month: req.month,
            base_salary: req.base_salary,
            bonus: req.bonus,
            deductions: req.deductions,
            status: req.status,
            paid_on: req.paid_on,
        }
    }
}

impl From<UpdatePayrollReq> for PayrollPatch {
    fn from(req: UpdatePayrollReq) -> Self {
        Self {
            base_salary: req.base_salary,
            bonus: req.bonus,
            deductions: req.deductions,
            status: req.status,
            paid_on: req.paid_on,
        }
    }
}

// ---- messages ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageDto {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendMessageReq {
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
}

impl From<Message> for MessageDto {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            sender_id: m.sender_id,
            recipient_id: m.recipient_id,
            subject: m.subject,
            body: m.body,
            read_at: m.read_at,
            created_at: m.created_at,
        }
    }
}

impl From<SendMessageReq> for NewMessage {
    fn from(req: SendMessageReq) -> Self {
        Self {
            recipient_id: req.recipient_id,
            subject: req.subject,
            body: req.body,
        }
    }
}

/// Converts a list of domain records into their DTOs.
pub fn to_dtos<T, D: From<T>>(items: Vec<T>) -> Vec<D> {
    items.into_iter().map(D::from).collect()
}
