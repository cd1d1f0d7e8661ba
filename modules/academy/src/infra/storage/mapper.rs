//! Entity <-> contract conversions and filter conditions per record type.

use sea_orm::{ColumnTrait, Condition, Set};

use super::entity::{
    attendance, batch, branch, course, employee, enrollment, message, payment, payroll, student,
    user,
};
use super::sea_orm_repo::SeaRecord;
use crate::contract::model::*;
use crate::domain::repo::{
    AttendanceFilter, BatchFilter, BranchFilter, CourseFilter, EmployeeFilter, EnrollmentFilter,
    MessageFilter, PaymentFilter, PayrollFilter, StudentFilter, UserFilter,
};

fn parse<E: std::str::FromStr<Err = String>>(raw: &str) -> anyhow::Result<E> {
    raw.parse().map_err(anyhow::Error::msg)
}

impl SeaRecord for User {
    type Entity = user::Entity;
    type ActiveModel = user::ActiveModel;

    fn into_active(self) -> user::ActiveModel {
        user::ActiveModel {
            id: Set(self.id),
            email: Set(self.email),
            display_name: Set(self.display_name),
            role: Set(self.role.as_str().to_string()),
            phone: Set(self.phone),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
        }
    }

    fn from_model(m: user::Model) -> anyhow::Result<Self> {
        Ok(User {
            id: m.id,
            email: m.email,
            display_name: m.display_name,
            role: parse(&m.role)?,
            phone: m.phone,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }

    fn condition(f: &UserFilter) -> Condition {
        Condition::all()
            .add_option(f.email.clone().map(|v| user::Column::Email.eq(v)))
            .add_option(f.role.map(|v| user::Column::Role.eq(v.as_str())))
    }

    fn id_column() -> user::Column {
        user::Column::Id
    }

    fn created_at_column() -> user::Column {
        user::Column::CreatedAt
    }
}

impl SeaRecord for Branch {
    type Entity = branch::Entity;
    type ActiveModel = branch::ActiveModel;

    fn into_active(self) -> branch::ActiveModel {
        branch::ActiveModel {
            id: Set(self.id),
            name: Set(self.name),
            code: Set(self.code),
            address: Set(self.address),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
        }
    }

    fn from_model(m: branch::Model) -> anyhow::Result<Self> {
        Ok(Branch {
            id: m.id,
            name: m.name,
            code: m.code,
            address: m.address,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }

    fn condition(f: &BranchFilter) -> Condition {
        Condition::all().add_option(f.code.clone().map(|v| branch::Column::Code.eq(v)))
    }

    fn id_column() -> branch::Column {
        branch::Column::Id
    }

    fn created_at_column() -> branch::Column {
        branch::Column::CreatedAt
    }
}

impl SeaRecord for Course {
    type Entity = course::Entity;
    type ActiveModel = course::ActiveModel;

    fn into_active(self) -> course::ActiveModel {
        course::ActiveModel {
            id: Set(self.id),
            name: Set(self.name),
            code: Set(self.code),
            category: Set(self.category),
            description: Set(self.description),
            fee: Set(self.fee),
            duration_weeks: Set(self.duration_weeks),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
        }
    }

    fn from_model(m: course::Model) -> anyhow::Result<Self> {
        Ok(Course {
            id: m.id,
            name: m.name,
            code: m.code,
            category: m.category,
            description: m.description,
            fee: m.fee,
            duration_weeks: m.duration_weeks,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }

    fn condition(f: &CourseFilter) -> Condition {
        Condition::all().add_option(f.category.clone().map(|v| course::Column::Category.eq(v)))
    }

    fn id_column() -> course::Column {
        course::Column::Id
    }

    fn created_at_column() -> course::Column {
        course::Column::CreatedAt
    }
}

impl SeaRecord for Employee {
    type Entity = employee::Entity;
    type ActiveModel = employee::ActiveModel;

    fn into_active(self) -> employee::ActiveModel {
        employee::ActiveModel {
            id: Set(self.id),
            name: Set(self.name),
            email: Set(self.email),
            phone: Set(self.phone),
            designation: Set(self.designation.as_str().to_string()),
            branch_id: Set(self.branch_id),
            user_id: Set(self.user_id),
            monthly_salary: Set(self.monthly_salary),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
        }
    }

    fn from_model(m: employee::Model) -> anyhow::Result<Self> {
        Ok(Employee {
            id: m.id,
            name: m.name,
            email: m.email,
            phone: m.phone,
            designation: parse(&m.designation)?,
            branch_id: m.branch_id,
            user_id: m.user_id,
            monthly_salary: m.monthly_salary,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }

    fn condition(f: &EmployeeFilter) -> Condition {
        Condition::all()
            .add_option(f.branch_id.map(|v| employee::Column::BranchId.eq(v)))
            .add_option(f.user_id.map(|v| employee::Column::UserId.eq(v)))
    }

    fn id_column() -> employee::Column {
        employee::Column::Id
    }

    fn created_at_column() -> employee::Column {
        employee::Column::CreatedAt
    }
}

impl SeaRecord for Batch {
    type Entity = batch::Entity;
    type ActiveModel = batch::ActiveModel;

    fn into_active(self) -> batch::ActiveModel {
        batch::ActiveModel {
            id: Set(self.id),
            code: Set(self.code),
            course_id: Set(self.course_id),
            branch_id: Set(self.branch_id),
            teacher_id: Set(self.teacher_id),
            category: Set(self.category),
            schedule: Set(self.schedule),
            start_date: Set(self.start_date),
            end_date: Set(self.end_date),
            capacity: Set(self.capacity),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
        }
    }

    fn from_model(m: batch::Model) -> anyhow::Result<Self> {
        Ok(Batch {
            id: m.id,
            code: m.code,
            course_id: m.course_id,
            branch_id: m.branch_id,
            teacher_id: m.teacher_id,
            category: m.category,
            schedule: m.schedule,
            start_date: m.start_date,
            end_date: m.end_date,
            capacity: m.capacity,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }

    fn condition(f: &BatchFilter) -> Condition {
        Condition::all()
            .add_option(f.code.clone().map(|v| batch::Column::Code.eq(v)))
            .add_option(f.course_id.map(|v| batch::Column::CourseId.eq(v)))
            .add_option(f.branch_id.map(|v| batch::Column::BranchId.eq(v)))
            .add_option(f.teacher_id.map(|v| batch::Column::TeacherId.eq(v)))
            .add_option(f.category.clone().map(|v| batch::Column::Category.eq(v)))
    }

    fn id_column() -> batch::Column {
        batch::Column::Id
    }

    fn created_at_column() -> batch::Column {
        batch::Column::CreatedAt
    }
}

impl SeaRecord for Student {
    type Entity = student::Entity;
    type ActiveModel = student::ActiveModel;

    fn into_active(self) -> student::ActiveModel {
        student::ActiveModel {
            id: Set(self.id),
            name: Set(self.name),
            email: Set(self.email),
            phone: Set(self.phone),
            date_of_birth: Set(self.date_of_birth),
            branch_id: Set(self.branch_id),
            parent_id: Set(self.parent_id),
            user_id: Set(self.user_id),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
        }
    }

    fn from_model(m: student::Model) -> anyhow::Result<Self> {
        Ok(Student {
            id: m.id,
            name: m.name,
            email: m.email,
            phone: m.phone,
            date_of_birth: m.date_of_birth,
            branch_id: m.branch_id,
            parent_id: m.parent_id,
            user_id: m.user_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }

    fn condition(f: &StudentFilter) -> Condition {
        Condition::all()
            .add_option(f.branch_id.map(|v| student::Column::BranchId.eq(v)))
            .add_option(f.parent_id.map(|v| student::Column::ParentId.eq(v)))
            .add_option(f.user_id.map(|v| student::Column::UserId.eq(v)))
    }

    fn id_column() -> student::Column {
        student::Column::Id
    }

    fn created_at_column() -> student::Column {
        student::Column::CreatedAt
    }
}

impl SeaRecord for Enrollment {
    type Entity = enrollment::Entity;
    type ActiveModel = enrollment::ActiveModel;

    fn into_active(self) -> enrollment::ActiveModel {
        enrollment::ActiveModel {
            id: Set(self.id),
            student_id: Set(self.student_id),
            batch_id: Set(self.batch_id),
            enrolled_on: Set(self.enrolled_on),
            status: Set(self.status.as_str().to_string()),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
        }
    }

    fn from_model(m: enrollment::Model) -> anyhow::Result<Self> {
        Ok(Enrollment {
            id: m.id,
            student_id: m.student_id,
            batch_id: m.batch_id,
            enrolled_on: m.enrolled_on,
            status: parse(&m.status)?,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }

    fn condition(f: &EnrollmentFilter) -> Condition {
        Condition::all()
            .add_option(f.student_id.map(|v| enrollment::Column::StudentId.eq(v)))
            .add_option(f.batch_id.map(|v| enrollment::Column::BatchId.eq(v)))
            .add_option(f.status.map(|v| enrollment::Column::Status.eq(v.as_str())))
    }

    fn id_column() -> enrollment::Column {
        enrollment::Column::Id
    }

    fn created_at_column() -> enrollment::Column {
        enrollment::Column::CreatedAt
    }
}

impl SeaRecord for Attendance {
    type Entity = attendance::Entity;
    type ActiveModel = attendance::ActiveModel;

    fn into_active(self) -> attendance::ActiveModel {
        attendance::ActiveModel {
            id: Set(self.id),
            enrollment_id: Set(self.enrollment_id),
            student_id: Set(self.student_id),
            batch_id: Set(self.batch_id),
            date: Set(self.date),
            status: Set(self.status.as_str().to_string()),
            marked_by: Set(self.marked_by),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
        }
    }

    fn from_model(m: attendance::Model) -> anyhow::Result<Self> {
        Ok(Attendance {
            id: m.id,
            enrollment_id: m.enrollment_id,
            student_id: m.student_id,
            batch_id: m.batch_id,
            date: m.date,
            status: parse(&m.status)?,
            marked_by: m.marked_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }

    fn condition(f: &AttendanceFilter) -> Condition {
        use attendance::Column;
        Condition::all()
            .add_option(f.enrollment_id.map(|v| Column::EnrollmentId.eq(v)))
            .add_option(f.student_id.map(|v| Column::StudentId.eq(v)))
            .add_option(f.batch_id.map(|v| Column::BatchId.eq(v)))
            .add_option(f.date.map(|v| Column::Date.eq(v)))
            .add_option(f.from.map(|v| Column::Date.gte(v)))
            .add_option(f.to.map(|v| Column::Date.lte(v)))
    }

    fn id_column() -> attendance::Column {
        attendance::Column::Id
    }

    fn created_at_column() -> attendance::Column {
        attendance::Column::CreatedAt
    }
}

impl SeaRecord for Payment {
    type Entity = payment::Entity;
    type ActiveModel = payment::ActiveModel;

    fn into_active(self) -> payment::ActiveModel {
        payment::ActiveModel {
            id: Set(self.id),
            student_id: Set(self.student_id),
            amount: Set(self.amount),
            method: Set(self.method.as_str().to_string()),
            status: Set(self.status.as_str().to_string()),
            invoice_number: Set(self.invoice_number),
            description: Set(self.description),
            paid_on: Set(self.paid_on),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
        }
    }

    fn from_model(m: payment::Model) -> anyhow::Result<Self> {
        Ok(Payment {
            id: m.id,
            student_id: m.student_id,
            amount: m.amount,
            method: parse(&m.method)?,
            status: parse(&m.status)?,
            invoice_number: m.invoice_number,
            description: m.description,
            paid_on: m.paid_on,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }

    fn condition(f: &PaymentFilter) -> Condition {
        Condition::all()
            .add_option(f.student_id.map(|v| payment::Column::StudentId.eq(v)))
            .add_option(f.status.map(|v| payment::Column::Status.eq(v.as_str())))
            .add_option(
                f.invoice_number
                    .clone()
                    .map(|v| payment::Column::InvoiceNumber.eq(v)),
            )
    }

    fn id_column() -> payment::Column {
        payment::Column::Id
    }

    fn created_at_column() -> payment::Column {
        payment::Column::CreatedAt
    }
}

impl SeaRecord for Payroll {
    type Entity = payroll::Entity;
    type ActiveModel = payroll::ActiveModel;

    fn into_active(self) -> payroll::ActiveModel {
        payroll::ActiveModel {
            id: Set(self.id),
            employee_id: Set(self.employee_id),
            month: Set(self.month),
            base_salary: Set(self.base_salary),
            bonus: Set(self.bonus),
            deductions: Set(self.deductions),
            net_amount: Set(self.net_amount),
            status: Set(self.status.as_str().to_string()),
            paid_on: Set(self.paid_on),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
        }
    }

    fn from_model(m: payroll::Model) -> anyhow::Result<Self> {
        Ok(Payroll {
            id: m.id,
            employee_id: m.employee_id,
            month: m.month,
            base_salary: m.base_salary,
            bonus: m.bonus,
            deductions: m.deductions,
            net_amount: m.net_amount,
            status: parse(&m.status)?,
            paid_on: m.paid_on,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }

    fn condition(f: &PayrollFilter) -> Condition {
        Condition::all()
            .add_option(f.employee_id.map(|v| payroll::Column::EmployeeId.eq(v)))
            .add_option(f.month.clone().map(|v| payroll::Column::Month.eq(v)))
    }

    fn id_column() -> payroll::Column {
        payroll::Column::Id
    }

    fn created_at_column() -> payroll::Column {
        payroll::Column::CreatedAt
    }
}

impl SeaRecord for Message {
    type Entity = message::Entity;
    type ActiveModel = message::ActiveModel;

    fn into_active(self) -> message::ActiveModel {
        message::ActiveModel {
            id: Set(self.id),
            sender_id: Set(self.sender_id),
            recipient_id: Set(self.recipient_id),
            subject: Set(self.subject),
            body: Set(self.body),
            read_at: Set(self.read_at),
            created_at: Set(self.created_at),
            updated_at: Set(self.updated_at),
        }
    }

    fn from_model(m: message::Model) -> anyhow::Result<Self> {
        Ok(Message {
            id: m.id,
            sender_id: m.sender_id,
            recipient_id: m.recipient_id,
            subject: m.subject,
            body: m.body,
            read_at: m.read_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }

    fn condition(f: &MessageFilter) -> Condition {
        Condition::all()
            .add_option(f.sender_id.map(|v| message::Column::SenderId.eq(v)))
            .add_option(f.recipient_id.map(|v| message::Column::RecipientId.eq(v)))
    }

    fn id_column() -> message::Column {
        message::Column::Id
    }

    fn created_at_column() -> message::Column {
        message::Column::CreatedAt
    }
}
