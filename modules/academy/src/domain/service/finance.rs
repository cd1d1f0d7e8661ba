//! Employees, payments (invoicing) and payroll.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{validate_email, Service};
use crate::contract::model::{
    Employee, EmployeePatch, NewEmployee, NewPayment, NewPayroll, Payment, PaymentPatch,
    PaymentStatus, Payroll, PayrollPatch, PayrollStatus, Role, User,
};
use crate::domain::error::DomainError;
use crate::domain::repo::{EmployeeFilter, PaymentFilter, PayrollFilter};

const INVOICE_ATTEMPTS: usize = 8;

/// `INV-{YYYYMMDD}-{6 hex}`; the suffix comes from the payment id.
pub fn invoice_number(date: NaiveDate, id: Uuid) -> String {
    let hex = id.simple().to_string();
    format!(
        "INV-{}-{}",
        date.format("%Y%m%d"),
        hex[..6].to_ascii_uppercase()
    )
}

fn validate_month(month: &str) -> Result<(), DomainError> {
    let well_formed = month.len() == 7
        && NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").is_ok();
    if !well_formed {
        return Err(DomainError::validation(
            "month",
            format!("'{month}' is not in YYYY-MM format"),
        ));
    }
    Ok(())
}

fn net_amount(base_salary: i64, bonus: i64, deductions: i64) -> Result<i64, DomainError> {
    let net = base_salary
        .checked_add(bonus)
        .and_then(|v| v.checked_sub(deductions))
        .ok_or_else(|| DomainError::validation("net_amount", "out of range"))?;
    if net < 0 {
        return Err(DomainError::validation(
            "deductions",
            "cannot exceed base salary plus bonus",
        ));
    }
    Ok(net)
}

impl Service {
    #[instrument(name = "academy.service.list_employees", skip(self))]
    pub async fn list_employees(&self, filter: EmployeeFilter) -> Result<Vec<Employee>, DomainError> {
        Ok(self.store.employees.list(&filter).await?)
    }

    #[instrument(name = "academy.service.get_employee", skip(self), fields(employee_id = %id))]
    pub async fn get_employee(&self, id: Uuid) -> Result<Employee, DomainError> {
        Self::load(&self.store.employees, id).await
    }

    #[instrument(name = "academy.service.create_employee", skip(self))]
    pub async fn create_employee(&self, new: NewEmployee) -> Result<Employee, DomainError> {
        self.validate_name("name", &new.name)?;
        validate_email("email", &new.email)?;
        Self::validate_amount("monthly_salary", new.monthly_salary)?;
        if let Some(branch_id) = new.branch_id {
            Self::ensure_exists(&self.store.branches, branch_id).await?;
        }
        if let Some(user_id) = new.user_id {
            Self::ensure_exists(&self.store.users, user_id).await?;
        }

        let now = Utc::now();
        let employee = Employee {
            id: Uuid::new_v4(),
            name: new.name.trim().to_string(),
            email: new.email.trim().to_lowercase(),
            phone: new.phone,
            designation: new.designation,
            branch_id: new.branch_id,
            user_id: new.user_id,
            monthly_salary: new.monthly_salary,
            created_at: now,
            updated_at: now,
        };
        self.store.employees.insert(employee.clone()).await?;
        info!("Successfully created employee with id={}", employee.id);
        Ok(employee)
    }

    #[instrument(name = "academy.service.update_employee", skip(self), fields(employee_id = %id))]
    pub async fn update_employee(&self, id: Uuid, patch: EmployeePatch) -> Result<Employee, DomainError> {
        let mut current = self.get_employee(id).await?;
        if let Some(name) = patch.name {
            self.validate_name("name", &name)?;
            current.name = name.trim().to_string();
        }
        if let Some(email) = patch.email {
            validate_email("email", &email)?;
            current.email = email.trim().to_lowercase();
        }
        if patch.phone.is_some() {
            current.phone = patch.phone;
        }
        if let Some(designation) = patch.designation {
            current.designation = designation;
        }
        if let Some(branch_id) = patch.branch_id {
            Self::ensure_exists(&self.store.branches, branch_id).await?;
            current.branch_id = Some(branch_id);
        }
        if let Some(user_id) = patch.user_id {
            Self::ensure_exists(&self.store.users, user_id).await?;
            current.user_id = Some(user_id);
        }
        if let Some(salary) = patch.monthly_salary {
            Self::validate_amount("monthly_salary", salary)?;
            current.monthly_salary = salary;
        }
        current.updated_at = Utc::now();
        Self::replace(&self.store.employees, current).await
    }

    #[instrument(name = "academy.service.delete_employee", skip(self), fields(employee_id = %id))]
    pub async fn delete_employee(&self, id: Uuid) -> Result<(), DomainError> {
        Self::remove(&self.store.employees, id).await
    }

    #[instrument(name = "academy.service.list_payments", skip(self))]
    pub async fn list_payments(&self, filter: PaymentFilter) -> Result<Vec<Payment>, DomainError> {
        Ok(self.store.payments.list(&filter).await?)
    }

    #[instrument(name = "academy.service.get_payment", skip(self), fields(payment_id = %id))]
    pub async fn get_payment(&self, id: Uuid) -> Result<Payment, DomainError> {
        Self::load(&self.store.payments, id).await
    }

    #[instrument(
        name = "academy.service.create_payment",
        skip(self),
        fields(student_id = %new.student_id, amount = new.amount)
    )]
    pub async fn create_payment(&self, new: NewPayment) -> Result<Payment, DomainError> {
        if new.amount <= 0 {
            return Err(DomainError::validation("amount", "must be positive"));
        }
        Self::ensure_exists(&self.store.students, new.student_id).await?;

        let status = new.status.unwrap_or(PaymentStatus::Pending);
        let paid_on = match (status, new.paid_on) {
            (PaymentStatus::Paid, None) => Some(Self::today()),
            (_, paid_on) => paid_on,
        };

        let now = Utc::now();
        let _guard = self.invoice_numbers.lock().await;
        let (id, invoice_number) = self
            .free_invoice_number(now.date_naive(), std::iter::repeat_with(Uuid::new_v4))
            .await?;
        let payment = Payment {
            id,
            student_id: new.student_id,
            amount: new.amount,
            method: new.method,
            status,
            invoice_number,
            description: new.description,
            paid_on,
            created_at: now,
            updated_at: now,
        };
        self.store.payments.insert(payment.clone()).await?;
        info!(invoice = %payment.invoice_number, "Successfully recorded payment");
        Ok(payment)
    }

    /// Payment id plus an invoice number not yet used by any payment.
    async fn free_invoice_number(
        &self,
        date: NaiveDate,
        ids: impl Iterator<Item = Uuid>,
    ) -> Result<(Uuid, String), DomainError> {
        for id in ids.take(INVOICE_ATTEMPTS) {
            let number = invoice_number(date, id);
            let taken = PaymentFilter {
                invoice_number: Some(number.clone()),
                ..Default::default()
            };
            if self.store.payments.list(&taken).await?.is_empty() {
                return Ok((id, number));
            }
            debug!(invoice = %number, "invoice number taken, regenerating");
        }
        Err(DomainError::conflict(format!(
            "No free invoice number for {date} after {INVOICE_ATTEMPTS} attempts"
        )))
    }

    #[instrument(name = "academy.service.update_payment", skip(self), fields(payment_id = %id))]
    pub async fn update_payment(&self, id: Uuid, patch: PaymentPatch) -> Result<Payment, DomainError> {
        let mut current = self.get_payment(id).await?;
        if let Some(amount) = patch.amount {
            if amount <= 0 {
                return Err(DomainError::validation("amount", "must be positive"));
            }
            current.amount = amount;
        }
        if let Some(method) = patch.method {
            current.method = method;
        }
        if patch.description.is_some() {
            current.description = patch.description;
        }
        if patch.paid_on.is_some() {
            current.paid_on = patch.paid_on;
        }
        if let Some(status) = patch.status {
            current.status = status;
            if status == PaymentStatus::Paid && current.paid_on.is_none() {
                current.paid_on = Some(Self::today());
            }
        }
        current.updated_at = Utc::now();
        Self::replace(&self.store.payments, current).await
    }

    #[instrument(name = "academy.service.delete_payment", skip(self), fields(payment_id = %id))]
    pub async fn delete_payment(&self, id: Uuid) -> Result<(), DomainError> {
        Self::remove(&self.store.payments, id).await
    }

    /// Payments of the actor's own student record (student) or children (parent).
    #[instrument(name = "academy.service.my_payments", skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn my_payments(&self, actor: &User) -> Result<Vec<Payment>, DomainError> {
        let mut payments = Vec::new();
        for student in self.linked_students(actor).await? {
            payments.extend(
                self.store
                    .payments
                    .list(&PaymentFilter {
                        student_id: Some(student.id),
                        ..Default::default()
                    })
                    .await?,
            );
        }
        payments.sort_by_key(|p| (p.created_at, p.id));
        Ok(payments)
    }

    #[instrument(name = "academy.service.list_payrolls", skip(self))]
    pub async fn list_payrolls(&self, filter: PayrollFilter) -> Result<Vec<Payroll>, DomainError> {
        if let Some(month) = &filter.month {
            validate_month(month)?;
        }
        Ok(self.store.payrolls.list(&filter).await?)
    }

    #[instrument(name = "academy.service.get_payroll", skip(self), fields(payroll_id = %id))]
    pub async fn get_payroll(&self, id: Uuid) -> Result<Payroll, DomainError> {
        Self::load(&self.store.payrolls, id).await
    }

    #[instrument(
        name = "academy.service.create_payroll",
        skip(self),
        fields(employee_id = %new.employee_id, month = %new.month)
    )]
    pub async fn create_payroll(&self, new: NewPayroll) -> Result<Payroll, DomainError> {
        validate_month(&new.month)?;
        let employee = self.get_employee(new.employee_id).await?;
        let existing = self
            .store
            .payrolls
            .list(&PayrollFilter {
                employee_id: Some(employee.id),
                month: Some(new.month.clone()),
            })
            .await?;
        if !existing.is_empty() {
            return Err(DomainError::conflict(format!(
                "Payroll for {} already exists",
                new.month
            )));
        }

        let base_salary = new.base_salary.unwrap_or(employee.monthly_salary);
        Self::validate_amount("base_salary", base_salary)?;
        Self::validate_amount("bonus", new.bonus)?;
        Self::validate_amount("deductions", new.deductions)?;
        let net = net_amount(base_salary, new.bonus, new.deductions)?;

        let status = new.status.unwrap_or(PayrollStatus::Pending);
        let paid_on = match (status, new.paid_on) {
            (PayrollStatus::Paid, None) => Some(Self::today()),
            (_, paid_on) => paid_on,
        };

        let now = Utc::now();
        let payroll = Payroll {
            id: Uuid::new_v4(),
            employee_id: employee.id,
            month: new.month,
            base_salary,
            bonus: new.bonus,
            deductions: new.deductions,
            net_amount: net,
            status,
            paid_on,
            created_at: now,
            updated_at: now,
        };
        self.store.payrolls.insert(payroll.clone()).await?;
        info!(net_amount = net, "Successfully created payroll with id={}", payroll.id);
        Ok(payroll)
    }

    /// Recomputes `net_amount` on every update.
    #[instrument(name = "academy.service.update_payroll", skip(self), fields(payroll_id = %id))]
    pub async fn update_payroll(&self, id: Uuid, patch: PayrollPatch) -> Result<Payroll, DomainError> {
        let mut current = self.get_payroll(id).await?;
        if let Some(v) = patch.base_salary {
            Self::validate_amount("base_salary", v)?;
            current.base_salary = v;
        }
        if let Some(v) = patch.bonus {
            Self::validate_amount("bonus", v)?;
            current.bonus = v;
        }
        if let Some(v) = patch.deductions {
            Self::validate_amount("deductions", v)?;
            current.deductions = v;
        }
        current.net_amount = net_amount(current.base_salary, current.bonus, current.deductions)?;
        if patch.paid_on.is_some() {
            current.paid_on = patch.paid_on;
        }
        if let Some(status) = patch.status {
            current.status = status;
            if status == PayrollStatus::Paid && current.paid_on.is_none() {
                current.paid_on = Some(Self::today());
            }
        }
        current.updated_at = Utc::now();
        Self::replace(&self.store.payrolls, current).await
    }

    #[instrument(name = "academy.service.delete_payroll", skip(self), fields(payroll_id = %id))]
    pub async fn delete_payroll(&self, id: Uuid) -> Result<(), DomainError> {
        Self::remove(&self.store.payrolls, id).await
    }

    /// Payrolls of the employee records linked to the actor's login.
    #[instrument(name = "academy.service.my_payrolls", skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn my_payrolls(&self, actor: &User) -> Result<Vec<Payroll>, DomainError> {
        if !matches!(actor.role, Role::Teacher | Role::Admin) {
            return Err(DomainError::forbidden("teacher role required"));
        }
        let employees = self
            .store
            .employees
            .list(&EmployeeFilter {
                user_id: Some(actor.id),
                ..Default::default()
            })
            .await?;
        let mut payrolls = Vec::new();
        for employee in employees {
            payrolls.extend(
                self.store
                    .payrolls
                    .list(&PayrollFilter {
                        employee_id: Some(employee.id),
                        ..Default::default()
                    })
                    .await?,
            );
        }
        payrolls.sort_by_key(|p| (p.created_at, p.id));
        Ok(payrolls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_number_shape() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let id = Uuid::parse_str("a1b2c3d4-0000-4000-8000-000000000000").unwrap();
        assert_eq!(invoice_number(date, id), "INV-20250307-A1B2C3");
    }

    async fn service_with_payment() -> (Service, Payment) {
        let svc = Service::new(
            crate::infra::storage::in_memory(),
            crate::domain::service::ServiceConfig::default(),
        );
        let student = svc
            .create_student(crate::contract::model::NewStudent {
                name: "Asha".to_string(),
                email: None,
                phone: None,
                date_of_birth: None,
                branch_id: None,
                parent_id: None,
                user_id: None,
            })
            .await
            .unwrap();
        let payment = svc
            .create_payment(NewPayment {
                student_id: student.id,
                amount: 1_000,
                method: crate::contract::model::PaymentMethod::Cash,
                status: None,
                description: None,
                paid_on: None,
            })
            .await
            .unwrap();
        (svc, payment)
    }

    #[tokio::test]
    async fn taken_invoice_number_is_regenerated() {
        let (svc, existing) = service_with_payment().await;
        let date = existing.created_at.date_naive();
        let fresh = Uuid::parse_str("f0f0f0f0-0000-4000-8000-000000000000").unwrap();

        let (id, number) = svc
            .free_invoice_number(date, [existing.id, fresh].into_iter())
            .await
            .unwrap();
        assert_eq!(id, fresh);
        assert_ne!(number, existing.invoice_number);
        assert_eq!(number, invoice_number(date, fresh));
    }

    #[tokio::test]
    async fn invoice_numbers_give_up_after_repeated_clashes() {
        let (svc, existing) = service_with_payment().await;
        let date = existing.created_at.date_naive();

        let err = svc
            .free_invoice_number(date, std::iter::repeat(existing.id))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }), "{err}");
    }

    #[test]
    fn month_format() {
        assert!(validate_month("2025-03").is_ok());
        assert!(validate_month("2025-13").is_err());
        assert!(validate_month("2025-3").is_err());
        assert!(validate_month("March").is_err());
    }

    #[test]
    fn net_amount_cannot_go_negative() {
        assert_eq!(net_amount(50_000, 5_000, 2_000).unwrap(), 53_000);
        assert!(net_amount(1_000, 0, 1_001).is_err());
    }
}
