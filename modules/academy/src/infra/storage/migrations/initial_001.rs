//! Academy tables. Foreign keys are not declared: deletes are single-row and
//! referential checks happen in the service. Unique indexes back the
//! one-row-per-key invariants.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    DisplayName,
    Role,
    Phone,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Branches {
    Table,
    Id,
    Name,
    Code,
    Address,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
    Name,
    Code,
    Category,
    Description,
    Fee,
    DurationWeeks,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Designation,
    BranchId,
    UserId,
    MonthlySalary,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Batches {
    Table,
    Id,
    Code,
    CourseId,
    BranchId,
    TeacherId,
    Category,
    Schedule,
    StartDate,
    EndDate,
    Capacity,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
    Name,
    Email,
    Phone,
    DateOfBirth,
    BranchId,
    ParentId,
    UserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Enrollments {
    Table,
    Id,
    StudentId,
    BatchId,
    EnrolledOn,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Attendance {
    Table,
    Id,
    EnrollmentId,
    StudentId,
    BatchId,
    Date,
    Status,
    MarkedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Payments {
    Table,
    Id,
    StudentId,
    Amount,
    Method,
    Status,
    InvoiceNumber,
    Description,
    PaidOn,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Payrolls {
    Table,
    Id,
    EmployeeId,
    Month,
    BaseSalary,
    Bonus,
    Deductions,
    NetAmount,
    Status,
    PaidOn,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Messages {
    Table,
    Id,
    SenderId,
    RecipientId,
    Subject,
    Body,
    ReadAt,
    CreatedAt,
    UpdatedAt,
}

fn id<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().primary_key().to_owned()
}

fn timestamps(table: &mut TableCreateStatement, created: impl IntoIden, updated: impl IntoIden) {
    table
        .col(ColumnDef::new(created).timestamp_with_time_zone().not_null())
        .col(ColumnDef::new(updated).timestamp_with_time_zone().not_null());
}

async fn index(
    manager: &SchemaManager<'_>,
    name: &str,
    table: impl IntoIden + 'static,
    cols: Vec<DynIden>,
    unique: bool,
) -> Result<(), DbErr> {
    let mut stmt = Index::create();
    stmt.name(name).table(table).if_not_exists();
    for col in cols {
        stmt.col(col);
    }
    if unique {
        stmt.unique();
    }
    manager.create_index(stmt.to_owned()).await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut t = Table::create();
        t.table(Users::Table)
            .if_not_exists()
            .col(id(Users::Id))
            .col(ColumnDef::new(Users::Email).string().not_null())
            .col(ColumnDef::new(Users::DisplayName).string().not_null())
            .col(ColumnDef::new(Users::Role).string().not_null())
            .col(ColumnDef::new(Users::Phone).string().null());
        timestamps(&mut t, Users::CreatedAt, Users::UpdatedAt);
        manager.create_table(t.to_owned()).await?;

        let mut t = Table::create();
        t.table(Branches::Table)
            .if_not_exists()
            .col(id(Branches::Id))
            .col(ColumnDef::new(Branches::Name).string().not_null())
            .col(ColumnDef::new(Branches::Code).string().not_null())
            .col(ColumnDef::new(Branches::Address).string().null());
        timestamps(&mut t, Branches::CreatedAt, Branches::UpdatedAt);
        manager.create_table(t.to_owned()).await?;

        let mut t = Table::create();
        t.table(Courses::Table)
            .if_not_exists()
            .col(id(Courses::Id))
            .col(ColumnDef::new(Courses::Name).string().not_null())
            .col(ColumnDef::new(Courses::Code).string().not_null())
            .col(ColumnDef::new(Courses::Category).string().not_null())
            .col(ColumnDef::new(Courses::Description).text().null())
            .col(ColumnDef::new(Courses::Fee).big_integer().not_null())
            .col(ColumnDef::new(Courses::DurationWeeks).integer().null());
        timestamps(&mut t, Courses::CreatedAt, Courses::UpdatedAt);
        manager.create_table(t.to_owned()).await?;

        let mut t = Table::create();
        t.table(Employees::Table)
            .if_not_exists()
            .col(id(Employees::Id))
            .col(ColumnDef::new(Employees::Name).string().not_null())
            .col(ColumnDef::new(Employees::Email).string().not_null())
            .col(ColumnDef::new(Employees::Phone).string().null())
            .col(ColumnDef::new(Employees::Designation).string().not_null())
            .col(ColumnDef::new(Employees::BranchId).uuid().null())
            .col(ColumnDef::new(Employees::UserId).uuid().null())
            .col(ColumnDef::new(Employees::MonthlySalary).big_integer().not_null());
        timestamps(&mut t, Employees::CreatedAt, Employees::UpdatedAt);
        manager.create_table(t.to_owned()).await?;

        let mut t = Table::create();
        t.table(Batches::Table)
            .if_not_exists()
            .col(id(Batches::Id))
            .col(ColumnDef::new(Batches::Code).string_len(8).not_null())
            .col(ColumnDef::new(Batches::CourseId).uuid().not_null())
            .col(ColumnDef::new(Batches::BranchId).uuid().not_null())
            .col(ColumnDef::new(Batches::TeacherId).uuid().null())
            .col(ColumnDef::new(Batches::Category).string().not_null())
            .col(ColumnDef::new(Batches::Schedule).string().null())
            .col(ColumnDef::new(Batches::StartDate).date().not_null())
            .col(ColumnDef::new(Batches::EndDate).date().null())
            .col(ColumnDef::new(Batches::Capacity).integer().null());
        timestamps(&mut t, Batches::CreatedAt, Batches::UpdatedAt);
        manager.create_table(t.to_owned()).await?;

        let mut t = Table::create();
        t.table(Students::Table)
            .if_not_exists()
            .col(id(Students::Id))
            .col(ColumnDef::new(Students::Name).string().not_null())
            .col(ColumnDef::new(Students::Email).string().null())
            .col(ColumnDef::new(Students::Phone).string().null())
            .col(ColumnDef::new(Students::DateOfBirth).date().null())
            .col(ColumnDef::new(Students::BranchId).uuid().null())
            .col(ColumnDef::new(Students::ParentId).uuid().null())
            .col(ColumnDef::new(Students::UserId).uuid().null());
        timestamps(&mut t, Students::CreatedAt, Students::UpdatedAt);
        manager.create_table(t.to_owned()).await?;

        let mut t = Table::create();
        t.table(Enrollments::Table)
            .if_not_exists()
            .col(id(Enrollments::Id))
            .col(ColumnDef::new(Enrollments::StudentId).uuid().not_null())
            .col(ColumnDef::new(Enrollments::BatchId).uuid().not_null())
            .col(ColumnDef::new(Enrollments::EnrolledOn).date().not_null())
            .col(ColumnDef::new(Enrollments::Status).string().not_null());
        timestamps(&mut t, Enrollments::CreatedAt, Enrollments::UpdatedAt);
        manager.create_table(t.to_owned()).await?;

        let mut t = Table::create();
        t.table(Attendance::Table)
            .if_not_exists()
            .col(id(Attendance::Id))
            .col(ColumnDef::new(Attendance::EnrollmentId).uuid().not_null())
            .col(ColumnDef::new(Attendance::StudentId).uuid().not_null())
            .col(ColumnDef::new(Attendance::BatchId).uuid().not_null())
            .col(ColumnDef::new(Attendance::Date).date().not_null())
            .col(ColumnDef::new(Attendance::Status).string().not_null())
            .col(ColumnDef::new(Attendance::MarkedBy).uuid().null());
        timestamps(&mut t, Attendance::CreatedAt, Attendance::UpdatedAt);
        manager.create_table(t.to_owned()).await?;

        let mut t = Table::create();
        t.table(Payments::Table)
            .if_not_exists()
            .col(id(Payments::Id))
            .col(ColumnDef::new(Payments::StudentId).uuid().not_null())
            .col(ColumnDef::new(Payments::Amount).big_integer().not_null())
            .col(ColumnDef::new(Payments::Method).string().not_null())
            .col(ColumnDef::new(Payments::Status).string().not_null())
            .col(ColumnDef::new(Payments::InvoiceNumber).string().not_null())
            .col(ColumnDef::new(Payments::Description).text().null())
            .col(ColumnDef::new(Payments::PaidOn).date().null());
        timestamps(&mut t, Payments::CreatedAt, Payments::UpdatedAt);
        manager.create_table(t.to_owned()).await?;

        let mut t = Table::create();
        t.table(Payrolls::Table)
            .if_not_exists()
            .col(id(Payrolls::Id))
            .col(ColumnDef::new(Payrolls::EmployeeId).uuid().not_null())
            .col(ColumnDef::new(Payrolls::Month).string_len(7).not_null())
            .col(ColumnDef::new(Payrolls::BaseSalary).big_integer().not_null())
            .col(ColumnDef::new(Payrolls::Bonus).big_integer().not_null())
            .col(ColumnDef::new(Payrolls::Deductions).big_integer().not_null())
            .col(ColumnDef::new(Payrolls::NetAmount).big_integer().not_null())
            .col(ColumnDef::new(Payrolls::Status).string().not_null())
            .col(ColumnDef::new(Payrolls::PaidOn).date().null());
        timestamps(&mut t, Payrolls::CreatedAt, Payrolls::UpdatedAt);
        manager.create_table(t.to_owned()).await?;

        let mut t = Table::create();
        t.table(Messages::Table)
            .if_not_exists()
            .col(id(Messages::Id))
            .col(ColumnDef::new(Messages::SenderId).uuid().not_null())
            .col(ColumnDef::new(Messages::RecipientId).uuid().not_null())
            .col(ColumnDef::new(Messages::Subject).string().not_null())
            .col(ColumnDef::new(Messages::Body).text().not_null())
            .col(ColumnDef::new(Messages::ReadAt).timestamp_with_time_zone().null());
        timestamps(&mut t, Messages::CreatedAt, Messages::UpdatedAt);
        manager.create_table(t.to_owned()).await?;

        index(manager, "ux_users_email", Users::Table, vec![Users::Email.into_iden()], true).await?;
        index(manager, "ux_branches_code", Branches::Table, vec![Branches::Code.into_iden()], true).await?;
        index(manager, "ux_batches_code", Batches::Table, vec![Batches::Code.into_iden()], true).await?;
        index(
            manager,
            "ix_batches_branch_category",
            Batches::Table,
            vec![Batches::BranchId.into_iden(), Batches::Category.into_iden()],
            false,
        )
        .await?;
        index(
            manager,
            "ix_enrollments_batch_student",
            Enrollments::Table,
            vec![Enrollments::BatchId.into_iden(), Enrollments::StudentId.into_iden()],
            false,
        )
        .await?;
        index(
            manager,
            "ux_attendance_enrollment_date",
            Attendance::Table,
            vec![Attendance::EnrollmentId.into_iden(), Attendance::Date.into_iden()],
            true,
        )
        .await?;
        index(
            manager,
            "ux_payments_invoice_number",
            Payments::Table,
            vec![Payments::InvoiceNumber.into_iden()],
            true,
        )
        .await?;
        index(
            manager,
            "ux_payrolls_employee_month",
            Payrolls::Table,
            vec![Payrolls::EmployeeId.into_iden(), Payrolls::Month.into_iden()],
            true,
        )
        .await?;
        index(
            manager,
            "ix_messages_recipient",
            Messages::Table,
            vec![Messages::RecipientId.into_iden()],
            false,
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Messages::Table.into_iden(),
            Payrolls::Table.into_iden(),
            Payments::Table.into_iden(),
            Attendance::Table.into_iden(),
            Enrollments::Table.into_iden(),
            Students::Table.into_iden(),
            Batches::Table.into_iden(),
            Employees::Table.into_iden(),
            Courses::Table.into_iden(),
            Branches::Table.into_iden(),
            Users::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}
