//! Academy domain models shared by the service, storage and REST layers.
//!
//! Money amounts are integer minor units (paise/cents). Every record carries
//! `created_at`/`updated_at` and lists are ordered by `(created_at, id)`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Closed string enums stored as text columns; `as_str` matches the serde name.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($name), " '{}'"),
                        other
                    )),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    /// Role of an authenticated user. Admin passes every role gate.
    Role {
        Admin => "admin",
        Teacher => "teacher",
        Parent => "parent",
        Student => "student",
    }
);

text_enum!(Designation {
    Teacher => "teacher",
    AdminStaff => "admin_staff",
    Other => "other",
});

text_enum!(EnrollmentStatus {
    Active => "active",
    Completed => "completed",
    Dropped => "dropped",
});

text_enum!(AttendanceStatus {
    Present => "present",
    Absent => "absent",
    Late => "late",
    Excused => "excused",
});

text_enum!(PaymentMethod {
    Cash => "cash",
    Card => "card",
    Upi => "upi",
    BankTransfer => "bank_transfer",
    Other => "other",
});

text_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

text_enum!(PayrollStatus {
    Pending => "pending",
    Paid => "paid",
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub id: Uuid,
    pub name: String,
    /// Two upper-case ASCII letters, used in batch codes.
    pub code: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBranch {
    pub name: String,
    pub code: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BranchPatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    /// Two upper-case ASCII letters, used in batch codes.
    pub code: String,
    /// Free text, e.g. "music" or "dance". Scopes batch serials.
    pub category: String,
    pub description: Option<String>,
    pub fee: i64,
    pub duration_weeks: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCourse {
    pub name: String,
    pub code: String,
    pub category: String,
    pub description: Option<String>,
    pub fee: i64,
    pub duration_weeks: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub fee: Option<i64>,
    pub duration_weeks: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub designation: Designation,
    pub branch_id: Option<Uuid>,
    /// Login account of the employee, if any.
    pub user_id: Option<Uuid>,
    pub monthly_salary: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub designation: Designation,
    pub branch_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub monthly_salary: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub designation: Option<Designation>,
    pub branch_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub monthly_salary: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub id: Uuid,
    /// `{courseCode}{branchCode}{serial}{year}`, e.g. `GTKR0125`.
    pub code: String,
    pub course_id: Uuid,
    pub branch_id: Uuid,
    /// Employee teaching the batch.
    pub teacher_id: Option<Uuid>,
    pub category: String,
    pub schedule: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub capacity: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBatch {
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

/// Course and branch are fixed once the code is generated; a patch naming a
/// different one is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchPatch {
    pub course_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub schedule: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub branch_id: Option<Uuid>,
    /// User with the parent role.
    pub parent_id: Option<Uuid>,
    /// Login account of the student, if any.
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub branch_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub branch_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub batch_id: Uuid,
    pub enrolled_on: NaiveDate,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnrollment {
    pub student_id: Uuid,
    pub batch_id: Uuid,
    pub enrolled_on: Option<NaiveDate>,
    pub status: Option<EnrollmentStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnrollmentPatch {
    pub enrolled_on: Option<NaiveDate>,
    pub status: Option<EnrollmentStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attendance {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub student_id: Uuid,
    pub batch_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    /// User who marked the row.
    pub marked_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One `(student, status)` pair of a mark request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceMark {
    pub student_id: Uuid,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkAttendance {
    pub batch_id: Uuid,
    pub date: NaiveDate,
    pub marks: Vec<AttendanceMark>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceSummary {
    pub student_id: Uuid,
    pub total: u32,
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub excused: u32,
    /// Share of sessions attended (present or late), 0..=100.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// `INV-{YYYYMMDD}-{6 hex}`.
    pub invoice_number: String,
    pub description: Option<String>,
    pub paid_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub student_id: Uuid,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: Option<PaymentStatus>,
    pub description: Option<String>,
    pub paid_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaymentPatch {
    pub amount: Option<i64>,
    pub method: Option<PaymentMethod>,
    pub status: Option<PaymentStatus>,
    pub description: Option<String>,
    pub paid_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payroll {
    pub id: Uuid,
    pub employee_id: Uuid,
    /// `YYYY-MM`.
    pub month: String,
    pub base_salary: i64,
    pub bonus: i64,
    pub deductions: i64,
    /// `base_salary + bonus - deductions`, never negative.
    pub net_amount: i64,
    pub status: PayrollStatus,
    pub paid_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayroll {
    pub employee_id: Uuid,
    pub month: String,
    /// Defaults to the employee's monthly salary.
    pub base_salary: Option<i64>,
    pub bonus: i64,
    pub deductions: i64,
    pub status: Option<PayrollStatus>,
    pub paid_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PayrollPatch {
    pub base_salary: Option<i64>,
    pub bonus: Option<i64>,
    pub deductions: Option<i64>,
    pub status: Option<PayrollStatus>,
    pub paid_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
}
