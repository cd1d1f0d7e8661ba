use std::sync::Arc;

use axum::{
    routing::{delete, get, put},
    Extension, Router,
};
use modkit::api::OpenApiRegistry;
use utoipa::OpenApi;

use crate::api::rest::auth::PrincipalHeader;
use crate::api::rest::{dto, handlers};
use crate::domain::service::Service;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_me,
        handlers::list_users,
        handlers::get_user,
        handlers::create_user,
        handlers::update_user,
        handlers::delete_user,
        handlers::list_branches,
        handlers::get_branch,
        handlers::create_branch,
        handlers::update_branch,
        handlers::delete_branch,
        handlers::list_courses,
        handlers::get_course,
        handlers::create_course,
        handlers::update_course,
        handlers::delete_course,
        handlers::list_batches,
        handlers::get_batch,
        handlers::next_batch_code,
        handlers::create_batch,
        handlers::update_batch,
        handlers::delete_batch,
        handlers::batch_students,
        handlers::list_students,
        handlers::get_student,
        handlers::create_student,
        handlers::update_student,
        handlers::delete_student,
        handlers::my_children,
        handlers::list_enrollments,
        handlers::get_enrollment,
        handlers::create_enrollment,
        handlers::update_enrollment,
        handlers::delete_enrollment,
        handlers::mark_attendance,
        handlers::list_attendance,
        handlers::student_attendance,
        handlers::attendance_summary,
        handlers::my_attendance,
        handlers::list_employees,
        handlers::get_employee,
        handlers::create_employee,
        handlers::update_employee,
        handlers::delete_employee,
        handlers::list_payments,
        handlers::get_payment,
        handlers::create_payment,
        handlers::update_payment,
        handlers::delete_payment,
        handlers::my_payments,
        handlers::list_payrolls,
        handlers::get_payroll,
        handlers::create_payroll,
        handlers::update_payroll,
        handlers::delete_payroll,
        handlers::my_payrolls,
        handlers::inbox,
        handlers::sent_messages,
        handlers::send_message,
        handlers::mark_message_read,
        handlers::delete_message,
    ),
    components(schemas(dto::AttendanceRecordReq, modkit::Problem, modkit::ValidationError)),
    tags(
        (name = "users", description = "Accounts and roles"),
        (name = "branches", description = "Academy branches"),
        (name = "courses", description = "Course catalog"),
        (name = "batches", description = "Batches and generated batch codes"),
        (name = "students", description = "Students and parent links"),
        (name = "enrollments", description = "Student enrollment in batches"),
        (name = "attendance", description = "Attendance marking and reports"),
        (name = "employees", description = "Staff records"),
        (name = "payments", description = "Student payments and invoices"),
        (name = "payroll", description = "Monthly staff payroll"),
        (name = "messages", description = "User inbox"),
    )
)]
pub struct AcademyApiDoc;

/// Builds the academy routes, each method/path registered exactly once.
pub fn academy_router() -> Router {
    Router::new()
        .route("/api/me", get(handlers::get_me))
        .route("/api/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/api/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route(
            "/api/branches",
            get(handlers::list_branches).post(handlers::create_branch),
        )
        .route(
            "/api/branches/{id}",
            get(handlers::get_branch)
                .put(handlers::update_branch)
                .delete(handlers::delete_branch),
        )
        .route(
            "/api/courses",
            get(handlers::list_courses).post(handlers::create_course),
        )
        .route(
            "/api/courses/{id}",
            get(handlers::get_course)
                .put(handlers::update_course)
                .delete(handlers::delete_course),
        )
        .route(
            "/api/batches",
            get(handlers::list_batches).post(handlers::create_batch),
        )
        .route("/api/batches/next-code", get(handlers::next_batch_code))
        .route(
            "/api/batches/{id}",
            get(handlers::get_batch)
                .put(handlers::update_batch)
                .delete(handlers::delete_batch),
        )
        .route("/api/batches/{id}/students", get(handlers::batch_students))
        .route(
            "/api/students",
            get(handlers::list_students).post(handlers::create_student),
        )
        .route(
            "/api/students/{id}",
            get(handlers::get_student)
                .put(handlers::update_student)
                .delete(handlers::delete_student),
        )
        .route(
            "/api/students/{id}/attendance",
            get(handlers::student_attendance),
        )
        .route(
            "/api/students/{id}/attendance/summary",
            get(handlers::attendance_summary),
        )
        .route("/api/parent/children", get(handlers::my_children))
        .route(
            "/api/enrollments",
            get(handlers::list_enrollments).post(handlers::create_enrollment),
        )
        .route(
            "/api/enrollments/{id}",
            get(handlers::get_enrollment)
                .put(handlers::update_enrollment)
                .delete(handlers::delete_enrollment),
        )
        .route(
            "/api/attendance",
            get(handlers::list_attendance).post(handlers::mark_attendance),
        )
        .route("/api/student/attendance", get(handlers::my_attendance))
        .route(
            "/api/employees",
            get(handlers::list_employees).post(handlers::create_employee),
        )
        .route(
            "/api/employees/{id}",
            get(handlers::get_employee)
                .put(handlers::update_employee)
                .delete(handlers::delete_employee),
        )
        .route(
            "/api/payments",
            get(handlers::list_payments).post(handlers::create_payment),
        )
        .route(
            "/api/payments/{id}",
            get(handlers::get_payment)
                .put(handlers::update_payment)
                .delete(handlers::delete_payment),
        )
        .route("/api/student/payments", get(handlers::my_payments))
        .route(
            "/api/payrolls",
            get(handlers::list_payrolls).post(handlers::create_payroll),
        )
        .route(
            "/api/payrolls/{id}",
            get(handlers::get_payroll)
                .put(handlers::update_payroll)
                .delete(handlers::delete_payroll),
        )
        .route("/api/teacher/payrolls", get(handlers::my_payrolls))
        .route("/api/messages", get(handlers::inbox).post(handlers::send_message))
        .route("/api/messages/sent", get(handlers::sent_messages))
        .route(
            "/api/messages/{id}",
            delete(handlers::delete_message),
        )
        .route("/api/messages/{id}/read", put(handlers::mark_message_read))
}

pub fn register_routes(
    router: Router,
    openapi: &dyn OpenApiRegistry,
    service: Arc<Service>,
    principal_header: PrincipalHeader,
) -> anyhow::Result<Router> {
    let academy = academy_router()
        .layer(Extension(principal_header))
        .layer(Extension(service));

    openapi.register_openapi("academy", AcademyApiDoc::openapi());

    Ok(router.merge(academy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_academy_paths() {
        let doc = AcademyApiDoc::openapi();
        for path in [
            "/api/batches",
            "/api/batches/next-code",
            "/api/attendance",
            "/api/students/{id}/attendance/summary",
            "/api/messages/{id}/read",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.expect("components");
        assert!(components.schemas.contains_key("BatchDto"));
        assert!(components.schemas.contains_key("Problem"));
    }
}
