use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::Json,
    Extension,
};
use modkit::api::problem::{Problem, ProblemResponse};
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::rest::auth::Principal;
use crate::api::rest::dto::*;
use crate::api::rest::error::{map_domain_error, RequestMeta};
use crate::contract::model::Role;
use crate::domain::error::DomainError;
use crate::domain::repo::{
    BatchFilter, CourseFilter, EmployeeFilter, EnrollmentFilter, PaymentFilter, PayrollFilter,
    StudentFilter, UserFilter,
};
use crate::domain::service::Service;

type Svc = Extension<Arc<Service>>;
type ApiResult<T> = Result<T, ProblemResponse>;

const ADMIN: &[Role] = &[Role::Admin];
const STAFF: &[Role] = &[Role::Admin, Role::Teacher];
const FAMILY: &[Role] = &[Role::Parent, Role::Student];

fn problem(meta: &RequestMeta) -> impl FnOnce(DomainError) -> ProblemResponse + '_ {
    move |e| {
        debug!(path = meta.path(), error = %e, "request failed");
        meta.attach(map_domain_error(&e, meta.path()))
    }
}

// ---- me & users ----

/// The authenticated user.
#[utoipa::path(get, path = "/api/me", tag = "users",
    responses((status = 200, body = UserDto), (status = 401, body = Problem)))]
pub async fn get_me(principal: Principal) -> Json<UserDto> {
    Json(UserDto::from(principal.0))
}

#[utoipa::path(get, path = "/api/users", tag = "users", params(ListUsersQuery),
    responses((status = 200, body = [UserDto]), (status = 403, body = Problem)))]
pub async fn list_users(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<Vec<UserDto>>> {
    principal.require(ADMIN, &meta)?;
    let filter = UserFilter {
        role: query.role,
        ..Default::default()
    };
    let users = svc.list_users(filter).await.map_err(problem(&meta))?;
    Ok(Json(to_dtos(users)))
}

#[utoipa::path(get, path = "/api/users/{id}", tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, body = UserDto), (status = 404, body = Problem)))]
pub async fn get_user(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserDto>> {
    principal.require(ADMIN, &meta)?;
    let user = svc.get_user(id).await.map_err(problem(&meta))?;
    Ok(Json(user.into()))
}

#[utoipa::path(post, path = "/api/users", tag = "users", request_body = CreateUserReq,
    responses((status = 201, body = UserDto), (status = 400, body = Problem), (status = 409, body = Problem)))]
pub async fn create_user(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Json(req): Json<CreateUserReq>,
) -> ApiResult<(StatusCode, Json<UserDto>)> {
    principal.require(ADMIN, &meta)?;
    info!(role = %req.role, "Creating user");
    let user = svc.create_user(req.into()).await.map_err(problem(&meta))?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(put, path = "/api/users/{id}", tag = "users", request_body = UpdateUserReq,
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, body = UserDto), (status = 404, body = Problem), (status = 409, body = Problem)))]
pub async fn update_user(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserReq>,
) -> ApiResult<Json<UserDto>> {
    principal.require(ADMIN, &meta)?;
    let user = svc.update_user(id, req.into()).await.map_err(problem(&meta))?;
    Ok(Json(user.into()))
}

#[utoipa::path(delete, path = "/api/users/{id}", tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 204), (status = 404, body = Problem)))]
pub async fn delete_user(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    principal.require(ADMIN, &meta)?;
    svc.delete_user(id).await.map_err(problem(&meta))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- branches ----

#[utoipa::path(get, path = "/api/branches", tag = "branches",
    responses((status = 200, body = [BranchDto])))]
pub async fn list_branches(
    meta: RequestMeta,
    Extension(svc): Svc,
    _principal: Principal,
) -> ApiResult<Json<Vec<BranchDto>>> {
    let branches = svc.list_branches().await.map_err(problem(&meta))?;
    Ok(Json(to_dtos(branches)))
}

#[utoipa::path(get, path = "/api/branches/{id}", tag = "branches",
    params(("id" = Uuid, Path, description = "Branch id")),
    responses((status = 200, body = BranchDto), (status = 404, body = Problem)))]
pub async fn get_branch(
    meta: RequestMeta,
    Extension(svc): Svc,
    _principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BranchDto>> {
    let branch = svc.get_branch(id).await.map_err(problem(&meta))?;
    Ok(Json(branch.into()))
}

#[utoipa::path(post, path = "/api/branches", tag = "branches", request_body = CreateBranchReq,
    responses((status = 201, body = BranchDto), (status = 400, body = Problem), (status = 409, body = Problem)))]
pub async fn create_branch(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Json(req): Json<CreateBranchReq>,
) -> ApiResult<(StatusCode, Json<BranchDto>)> {
    principal.require(ADMIN, &meta)?;
    let branch = svc.create_branch(req.into()).await.map_err(problem(&meta))?;
    Ok((StatusCode::CREATED, Json(branch.into())))
}

#[utoipa::path(put, path = "/api/branches/{id}", tag = "branches", request_body = UpdateBranchReq,
    params(("id" = Uuid, Path, description = "Branch id")),
    responses((status = 200, body = BranchDto), (status = 404, body = Problem)))]
pub async fn update_branch(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBranchReq>,
) -> ApiResult<Json<BranchDto>> {
    principal.require(ADMIN, &meta)?;
    let branch = svc.update_branch(id, req.into()).await.map_err(problem(&meta))?;
    Ok(Json(branch.into()))
}

#[utoipa::path(delete, path = "/api/branches/{id}", tag = "branches",
    params(("id" = Uuid, Path, description = "Branch id")),
    responses((status = 204), (status = 404, body = Problem)))]
pub async fn delete_branch(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    principal.require(ADMIN, &meta)?;
    svc.delete_branch(id).await.map_err(problem(&meta))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- courses ----

#[utoipa::path(get, path = "/api/courses", tag = "courses", params(ListCoursesQuery),
    responses((status = 200, body = [CourseDto])))]
pub async fn list_courses(
    meta: RequestMeta,
    Extension(svc): Svc,
    _principal: Principal,
    Query(query): Query<ListCoursesQuery>,
) -> ApiResult<Json<Vec<CourseDto>>> {
    let filter = CourseFilter {
        category: query.category.map(|c| c.trim().to_lowercase()),
    };
    let courses = svc.list_courses(filter).await.map_err(problem(&meta))?;
    Ok(Json(to_dtos(courses)))
}

#[utoipa::path(get, path = "/api/courses/{id}", tag = "courses",
    params(("id" = Uuid, Path, description = "Course id")),
    responses((status = 200, body = CourseDto), (status = 404, body = Problem)))]
pub async fn get_course(
    meta: RequestMeta,
    Extension(svc): Svc,
    _principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CourseDto>> {
    let course = svc.get_course(id).await.map_err(problem(&meta))?;
    Ok(Json(course.into()))
}

#[utoipa::path(post, path = "/api/courses", tag = "courses", request_body = CreateCourseReq,
    responses((status = 201, body = CourseDto), (status = 400, body = Problem)))]
pub async fn create_course(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Json(req): Json<CreateCourseReq>,
) -> ApiResult<(StatusCode, Json<CourseDto>)> {
    principal.require(ADMIN, &meta)?;
    let course = svc.create_course(req.into()).await.map_err(problem(&meta))?;
    Ok((StatusCode::CREATED, Json(course.into())))
}

#[utoipa::path(put, path = "/api/courses/{id}", tag = "courses", request_body = UpdateCourseReq,
    params(("id" = Uuid, Path, description = "Course id")),
    responses((status = 200, body = CourseDto), (status = 404, body = Problem)))]
pub async fn update_course(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCourseReq>,
) -> ApiResult<Json<CourseDto>> {
    principal.require(ADMIN, &meta)?;
    let course = svc.update_course(id, req.into()).await.map_err(problem(&meta))?;
    Ok(Json(course.into()))
}

#[utoipa::path(delete, path = "/api/courses/{id}", tag = "courses",
    params(("id" = Uuid, Path, description = "Course id")),
    responses((status = 204), (status = 404, body = Problem)))]
pub async fn delete_course(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    principal.require(ADMIN, &meta)?;
    svc.delete_course(id).await.map_err(problem(&meta))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- batches ----

#[utoipa::path(get, path = "/api/batches", tag = "batches", params(ListBatchesQuery),
    responses((status = 200, body = [BatchDto]), (status = 403, body = Problem)))]
pub async fn list_batches(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Query(query): Query<ListBatchesQuery>,
) -> ApiResult<Json<Vec<BatchDto>>> {
    principal.require(STAFF, &meta)?;
    let filter = BatchFilter {
        branch_id: query.branch_id,
        course_id: query.course_id,
        teacher_id: query.teacher_id,
        category: query.category.map(|c| c.trim().to_lowercase()),
        ..Default::default()
    };
    let batches = svc.list_batches(filter).await.map_err(problem(&meta))?;
    Ok(Json(to_dtos(batches)))
}

#[utoipa::path(get, path = "/api/batches/{id}", tag = "batches",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses((status = 200, body = BatchDto), (status = 404, body = Problem)))]
pub async fn get_batch(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BatchDto>> {
    principal.require(STAFF, &meta)?;
    let batch = svc.get_batch(id).await.map_err(problem(&meta))?;
    Ok(Json(batch.into()))
}

/// Preview of the code the next batch would receive.
#[utoipa::path(get, path = "/api/batches/next-code", tag = "batches", params(NextBatchCodeQuery),
    responses((status = 200, body = BatchCodeDto), (status = 404, body = Problem), (status = 409, body = Problem)))]
pub async fn next_batch_code(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Query(query): Query<NextBatchCodeQuery>,
) -> ApiResult<Json<BatchCodeDto>> {
    principal.require(ADMIN, &meta)?;
    let start = query
        .start_date
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    let code = svc
        .preview_batch_code(query.course_id, query.branch_id, start)
        .await
        .map_err(problem(&meta))?;
    Ok(Json(BatchCodeDto { code }))
}

#[utoipa::path(post, path = "/api/batches", tag = "batches", request_body = CreateBatchReq,
    responses((status = 201, body = BatchDto), (status = 400, body = Problem), (status = 404, body = Problem), (status = 409, body = Problem)))]
pub async fn create_batch(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Json(req): Json<CreateBatchReq>,
) -> ApiResult<(StatusCode, Json<BatchDto>)> {
    principal.require(ADMIN, &meta)?;
    let batch = svc.create_batch(req.into()).await.map_err(problem(&meta))?;
    info!(code = %batch.code, "Batch created");
    Ok((StatusCode::CREATED, Json(batch.into())))
}

#[utoipa::path(put, path = "/api/batches/{id}", tag = "batches", request_body = UpdateBatchReq,
    params(("id" = Uuid, Path, description = "Batch id")),
    responses((status = 200, body = BatchDto), (status = 400, body = Problem), (status = 404, body = Problem)))]
pub async fn update_batch(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBatchReq>,
) -> ApiResult<Json<BatchDto>> {
    principal.require(ADMIN, &meta)?;
    let batch = svc.update_batch(id, req.into()).await.map_err(problem(&meta))?;
    Ok(Json(batch.into()))
}

#[utoipa::path(delete, path = "/api/batches/{id}", tag = "batches",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses((status = 204), (status = 404, body = Problem)))]
pub async fn delete_batch(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    principal.require(ADMIN, &meta)?;
    svc.delete_batch(id).await.map_err(problem(&meta))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Students actively enrolled in a batch.
#[utoipa::path(get, path = "/api/batches/{id}/students", tag = "batches",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses((status = 200, body = [StudentDto]), (status = 404, body = Problem)))]
pub async fn batch_students(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<StudentDto>>> {
    principal.require(STAFF, &meta)?;
    let students = svc.batch_students(id).await.map_err(problem(&meta))?;
    Ok(Json(to_dtos(students)))
}

// ---- students ----

#[utoipa::path(get, path = "/api/students", tag = "students", params(ListStudentsQuery),
    responses((status = 200, body = [StudentDto]), (status = 403, body = Problem)))]
pub async fn list_students(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Query(query): Query<ListStudentsQuery>,
) -> ApiResult<Json<Vec<StudentDto>>> {
    principal.require(STAFF, &meta)?;
    let filter = StudentFilter {
        branch_id: query.branch_id,
        parent_id: query.parent_id,
        ..Default::default()
    };
    let students = svc.list_students(filter).await.map_err(problem(&meta))?;
    Ok(Json(to_dtos(students)))
}

#[utoipa::path(get, path = "/api/students/{id}", tag = "students",
    params(("id" = Uuid, Path, description = "Student id")),
    responses((status = 200, body = StudentDto), (status = 404, body = Problem)))]
pub async fn get_student(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StudentDto>> {
    principal.require(STAFF, &meta)?;
    let student = svc.get_student(id).await.map_err(problem(&meta))?;
    Ok(Json(student.into()))
}

#[utoipa::path(post, path = "/api/students", tag = "students", request_body = CreateStudentReq,
    responses((status = 201, body = StudentDto), (status = 400, body = Problem), (status = 404, body = Problem)))]
pub async fn create_student(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Json(req): Json<CreateStudentReq>,
) -> ApiResult<(StatusCode, Json<StudentDto>)> {
    principal.require(ADMIN, &meta)?;
    let student = svc.create_student(req.into()).await.map_err(problem(&meta))?;
    Ok((StatusCode::CREATED, Json(student.into())))
}

#[utoipa::path(put, path = "/api/students/{id}", tag = "students", request_body = UpdateStudentReq,
    params(("id" = Uuid, Path, description = "Student id")),
    responses((status = 200, body = StudentDto), (status = 404, body = Problem)))]
pub async fn update_student(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStudentReq>,
) -> ApiResult<Json<StudentDto>> {
    principal.require(ADMIN, &meta)?;
    let student = svc.update_student(id, req.into()).await.map_err(problem(&meta))?;
    Ok(Json(student.into()))
}

#[utoipa::path(delete, path = "/api/students/{id}", tag = "students",
    params(("id" = Uuid, Path, description = "Student id")),
    responses((status = 204), (status = 404, body = Problem)))]
pub async fn delete_student(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    principal.require(ADMIN, &meta)?;
    svc.delete_student(id).await.map_err(problem(&meta))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/api/parent/children", tag = "students",
    responses((status = 200, body = [StudentDto]), (status = 403, body = Problem)))]
pub async fn my_children(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
) -> ApiResult<Json<Vec<StudentDto>>> {
    principal.require(&[Role::Parent], &meta)?;
    let children = svc.children_of(principal.user()).await.map_err(problem(&meta))?;
    Ok(Json(to_dtos(children)))
}

// ---- enrollments ----

#[utoipa::path(get, path = "/api/enrollments", tag = "enrollments", params(ListEnrollmentsQuery),
    responses((status = 200, body = [EnrollmentDto])))]
pub async fn list_enrollments(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Query(query): Query<ListEnrollmentsQuery>,
) -> ApiResult<Json<Vec<EnrollmentDto>>> {
    principal.require(STAFF, &meta)?;
    let filter = EnrollmentFilter {
        student_id: query.student_id,
        batch_id: query.batch_id,
        status: query.status,
    };
    let rows = svc.list_enrollments(filter).await.map_err(problem(&meta))?;
    Ok(Json(to_dtos(rows)))
}

#[utoipa::path(get, path = "/api/enrollments/{id}", tag = "enrollments",
    params(("id" = Uuid, Path, description = "Enrollment id")),
    responses((status = 200, body = EnrollmentDto), (status = 404, body = Problem)))]
pub async fn get_enrollment(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EnrollmentDto>> {
    principal.require(STAFF, &meta)?;
    let row = svc.get_enrollment(id).await.map_err(problem(&meta))?;
    Ok(Json(row.into()))
}

#[utoipa::path(post, path = "/api/enrollments", tag = "enrollments", request_body = CreateEnrollmentReq,
    responses((status = 201, body = EnrollmentDto), (status = 404, body = Problem), (status = 409, body = Problem)))]
pub async fn create_enrollment(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Json(req): Json<CreateEnrollmentReq>,
) -> ApiResult<(StatusCode, Json<EnrollmentDto>)> {
    principal.require(ADMIN, &meta)?;
    let row = svc.enroll(req.into()).await.map_err(problem(&meta))?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[utoipa::path(put, path = "/api/enrollments/{id}", tag = "enrollments", request_body = UpdateEnrollmentReq,
    params(("id" = Uuid, Path, description = "Enrollment id")),
    responses((status = 200, body = EnrollmentDto), (status = 404, body = Problem), (status = 409, body = Problem)))]
pub async fn update_enrollment(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEnrollmentReq>,
) -> ApiResult<Json<EnrollmentDto>> {
    principal.require(ADMIN, &meta)?;
    let row = svc
        .update_enrollment(id, req.into())
        .await
        .map_err(problem(&meta))?;
    Ok(Json(row.into()))
}

#[utoipa::path(delete, path = "/api/enrollments/{id}", tag = "enrollments",
    params(("id" = Uuid, Path, description = "Enrollment id")),
    responses((status = 204), (status = 404, body = Problem)))]
pub async fn delete_enrollment(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    principal.require(ADMIN, &meta)?;
    svc.delete_enrollment(id).await.map_err(problem(&meta))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- attendance ----

/// Mark attendance for a batch session; one row per record.
#[utoipa::path(post, path = "/api/attendance", tag = "attendance", request_body = MarkAttendanceReq,
    responses((status = 201, body = [AttendanceDto]), (status = 400, body = Problem), (status = 404, body = Problem)))]
pub async fn mark_attendance(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Json(req): Json<MarkAttendanceReq>,
) -> ApiResult<(StatusCode, Json<Vec<AttendanceDto>>)> {
    principal.require(STAFF, &meta)?;
    info!(batch_id = %req.batch_id, date = %req.date, records = req.records.len(), "Marking attendance");
    let rows = svc
        .mark_attendance(req.into(), Some(principal.id()))
        .await
        .map_err(problem(&meta))?;
    Ok((StatusCode::CREATED, Json(to_dtos(rows))))
}

#[utoipa::path(get, path = "/api/attendance", tag = "attendance", params(ListAttendanceQuery),
    responses((status = 200, body = [AttendanceDto]), (status = 404, body = Problem)))]
pub async fn list_attendance(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Query(query): Query<ListAttendanceQuery>,
) -> ApiResult<Json<Vec<AttendanceDto>>> {
    principal.require(STAFF, &meta)?;
    let rows = svc
        .list_attendance(query.batch_id, query.date)
        .await
        .map_err(problem(&meta))?;
    Ok(Json(to_dtos(rows)))
}

#[utoipa::path(get, path = "/api/students/{id}/attendance", tag = "attendance",
    params(("id" = Uuid, Path, description = "Student id"), DateRangeQuery),
    responses((status = 200, body = [AttendanceDto]), (status = 403, body = Problem), (status = 404, body = Problem)))]
pub async fn student_attendance(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Json<Vec<AttendanceDto>>> {
    let rows = svc
        .student_attendance(principal.user(), id, range.from, range.to)
        .await
        .map_err(problem(&meta))?;
    Ok(Json(to_dtos(rows)))
}

#[utoipa::path(get, path = "/api/students/{id}/attendance/summary", tag = "attendance",
    params(("id" = Uuid, Path, description = "Student id")),
    responses((status = 200, body = AttendanceSummaryDto), (status = 403, body = Problem), (status = 404, body = Problem)))]
pub async fn attendance_summary(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AttendanceSummaryDto>> {
    let summary = svc
        .attendance_summary(principal.user(), id)
        .await
        .map_err(problem(&meta))?;
    Ok(Json(summary.into()))
}

/// Attendance of the caller (student) or the caller's children (parent).
#[utoipa::path(get, path = "/api/student/attendance", tag = "attendance",
    responses((status = 200, body = [AttendanceDto]), (status = 403, body = Problem)))]
pub async fn my_attendance(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
) -> ApiResult<Json<Vec<AttendanceDto>>> {
    principal.require(FAMILY, &meta)?;
    let rows = svc
        .my_attendance(principal.user())
        .await
        .map_err(problem(&meta))?;
    Ok(Json(to_dtos(rows)))
}

// ---- employees ----

#[utoipa::path(get, path = "/api/employees", tag = "employees", params(ListEmployeesQuery),
    responses((status = 200, body = [EmployeeDto])))]
pub async fn list_employees(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Query(query): Query<ListEmployeesQuery>,
) -> ApiResult<Json<Vec<EmployeeDto>>> {
    principal.require(ADMIN, &meta)?;
    let filter = EmployeeFilter {
        branch_id: query.branch_id,
        ..Default::default()
    };
    let rows = svc.list_employees(filter).await.map_err(problem(&meta))?;
    Ok(Json(to_dtos(rows)))
}

#[utoipa::path(get, path = "/api/employees/{id}", tag = "employees",
    params(("id" = Uuid, Path, description = "Employee id")),
    responses((status = 200, body = EmployeeDto), (status = 404, body = Problem)))]
pub async fn get_employee(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EmployeeDto>> {
    principal.require(ADMIN, &meta)?;
    let row = svc.get_employee(id).await.map_err(problem(&meta))?;
    Ok(Json(row.into()))
}

#[utoipa::path(post, path = "/api/employees", tag = "employees", request_body = CreateEmployeeReq,
    responses((status = 201, body = EmployeeDto), (status = 400, body = Problem)))]
pub async fn create_employee(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Json(req): Json<CreateEmployeeReq>,
) -> ApiResult<(StatusCode, Json<EmployeeDto>)> {
    principal.require(ADMIN, &meta)?;
    let row = svc.create_employee(req.into()).await.map_err(problem(&meta))?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[utoipa::path(put, path = "/api/employees/{id}", tag = "employees", request_body = UpdateEmployeeReq,
    params(("id" = Uuid, Path, description = "Employee id")),
    responses((status = 200, body = EmployeeDto), (status = 404, body = Problem)))]
pub async fn update_employee(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEmployeeReq>,
) -> ApiResult<Json<EmployeeDto>> {
    principal.require(ADMIN, &meta)?;
    let row = svc.update_employee(id, req.into()).await.map_err(problem(&meta))?;
    Ok(Json(row.into()))
}

#[utoipa::path(delete, path = "/api/employees/{id}", tag = "employees",
    params(("id" = Uuid, Path, description = "Employee id")),
    responses((status = 204), (status = 404, body = Problem)))]
pub async fn delete_employee(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    principal.require(ADMIN, &meta)?;
    svc.delete_employee(id).await.map_err(problem(&meta))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- payments ----

#[utoipa::path(get, path = "/api/payments", tag = "payments", params(ListPaymentsQuery),
    responses((status = 200, body = [PaymentDto])))]
pub async fn list_payments(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Query(query): Query<ListPaymentsQuery>,
) -> ApiResult<Json<Vec<PaymentDto>>> {
    principal.require(ADMIN, &meta)?;
    let filter = PaymentFilter {
        student_id: query.student_id,
        status: query.status,
        ..Default::default()
    };
    let rows = svc.list_payments(filter).await.map_err(problem(&meta))?;
    Ok(Json(to_dtos(rows)))
}

#[utoipa::path(get, path = "/api/payments/{id}", tag = "payments",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses((status = 200, body = PaymentDto), (status = 404, body = Problem)))]
pub async fn get_payment(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PaymentDto>> {
    principal.require(ADMIN, &meta)?;
    let row = svc.get_payment(id).await.map_err(problem(&meta))?;
    Ok(Json(row.into()))
}

#[utoipa::path(post, path = "/api/payments", tag = "payments", request_body = CreatePaymentReq,
    responses((status = 201, body = PaymentDto), (status = 400, body = Problem), (status = 404, body = Problem)))]
pub async fn create_payment(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Json(req): Json<CreatePaymentReq>,
) -> ApiResult<(StatusCode, Json<PaymentDto>)> {
    principal.require(ADMIN, &meta)?;
    let row = svc.create_payment(req.into()).await.map_err(problem(&meta))?;
    info!(invoice = %row.invoice_number, "Payment recorded");
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[utoipa::path(put, path = "/api/payments/{id}", tag = "payments", request_body = UpdatePaymentReq,
    params(("id" = Uuid, Path, description = "Payment id")),
    responses((status = 200, body = PaymentDto), (status = 404, body = Problem)))]
pub async fn update_payment(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePaymentReq>,
) -> ApiResult<Json<PaymentDto>> {
    principal.require(ADMIN, &meta)?;
    let row = svc.update_payment(id, req.into()).await.map_err(problem(&meta))?;
    Ok(Json(row.into()))
}

#[utoipa::path(delete, path = "/api/payments/{id}", tag = "payments",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses((status = 204), (status = 404, body = Problem)))]
pub async fn delete_payment(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    principal.require(ADMIN, &meta)?;
    svc.delete_payment(id).await.map_err(problem(&meta))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/api/student/payments", tag = "payments",
    responses((status = 200, body = [PaymentDto]), (status = 403, body = Problem)))]
pub async fn my_payments(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
) -> ApiResult<Json<Vec<PaymentDto>>> {
    principal.require(FAMILY, &meta)?;
    let rows = svc
        .my_payments(principal.user())
        .await
        .map_err(problem(&meta))?;
    Ok(Json(to_dtos(rows)))
}

// ---- payroll ----

#[utoipa::path(get, path = "/api/payrolls", tag = "payroll", params(ListPayrollsQuery),
    responses((status = 200, body = [PayrollDto]), (status = 400, body = Problem)))]
pub async fn list_payrolls(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Query(query): Query<ListPayrollsQuery>,
) -> ApiResult<Json<Vec<PayrollDto>>> {
    principal.require(ADMIN, &meta)?;
    let filter = PayrollFilter {
        employee_id: query.employee_id,
        month: query.month,
    };
    let rows = svc.list_payrolls(filter).await.map_err(problem(&meta))?;
    Ok(Json(to_dtos(rows)))
}

#[utoipa::path(get, path = "/api/payrolls/{id}", tag = "payroll",
    params(("id" = Uuid, Path, description = "Payroll id")),
    responses((status = 200, body = PayrollDto), (status = 404, body = Problem)))]
pub async fn get_payroll(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PayrollDto>> {
    principal.require(ADMIN, &meta)?;
    let row = svc.get_payroll(id).await.map_err(problem(&meta))?;
    Ok(Json(row.into()))
}

#[utoipa::path(post, path = "/api/payrolls", tag = "payroll", request_body = CreatePayrollReq,
    responses((status = 201, body = PayrollDto), (status = 400, body = Problem), (status = 409, body = Problem)))]
pub async fn create_payroll(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Json(req): Json<CreatePayrollReq>,
) -> ApiResult<(StatusCode, Json<PayrollDto>)> {
    principal.require(ADMIN, &meta)?;
    let row = svc.create_payroll(req.into()).await.map_err(problem(&meta))?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[utoipa::path(put, path = "/api/payrolls/{id}", tag = "payroll", request_body = UpdatePayrollReq,
    params(("id" = Uuid, Path, description = "Payroll id")),
    responses((status = 200, body = PayrollDto), (status = 400, body = Problem), (status = 404, body = Problem)))]
pub async fn update_payroll(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePayrollReq>,
) -> ApiResult<Json<PayrollDto>> {
    principal.require(ADMIN, &meta)?;
    let row = svc.update_payroll(id, req.into()).await.map_err(problem(&meta))?;
    Ok(Json(row.into()))
}

#[utoipa::path(delete, path = "/api/payrolls/{id}", tag = "payroll",
    params(("id" = Uuid, Path, description = "Payroll id")),
    responses((status = 204), (status = 404, body = Problem)))]
pub async fn delete_payroll(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    principal.require(ADMIN, &meta)?;
    svc.delete_payroll(id).await.map_err(problem(&meta))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/api/teacher/payrolls", tag = "payroll",
    responses((status = 200, body = [PayrollDto]), (status = 403, body = Problem)))]
pub async fn my_payrolls(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
) -> ApiResult<Json<Vec<PayrollDto>>> {
    principal.require(&[Role::Teacher], &meta)?;
    let rows = svc
        .my_payrolls(principal.user())
        .await
        .map_err(problem(&meta))?;
    Ok(Json(to_dtos(rows)))
}

// ---- messages ----

/// Messages received by the caller, oldest first.
#[utoipa::path(get, path = "/api/messages", tag = "messages",
    responses((status = 200, body = [MessageDto])))]
pub async fn inbox(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
) -> ApiResult<Json<Vec<MessageDto>>> {
    let rows = svc.inbox(principal.user()).await.map_err(problem(&meta))?;
    Ok(Json(to_dtos(rows)))
}

#[utoipa::path(get, path = "/api/messages/sent", tag = "messages",
    responses((status = 200, body = [MessageDto])))]
pub async fn sent_messages(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
) -> ApiResult<Json<Vec<MessageDto>>> {
    let rows = svc
        .sent_messages(principal.user())
        .await
        .map_err(problem(&meta))?;
    Ok(Json(to_dtos(rows)))
}

#[utoipa::path(post, path = "/api/messages", tag = "messages", request_body = SendMessageReq,
    responses((status = 201, body = MessageDto), (status = 400, body = Problem), (status = 404, body = Problem)))]
pub async fn send_message(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Json(req): Json<SendMessageReq>,
) -> ApiResult<(StatusCode, Json<MessageDto>)> {
    let message = svc
        .send_message(principal.user(), req.into())
        .await
        .map_err(problem(&meta))?;
    Ok((StatusCode::CREATED, Json(message.into())))
}

#[utoipa::path(put, path = "/api/messages/{id}/read", tag = "messages",
    params(("id" = Uuid, Path, description = "Message id")),
    responses((status = 200, body = MessageDto), (status = 403, body = Problem), (status = 404, body = Problem)))]
pub async fn mark_message_read(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageDto>> {
    let message = svc
        .mark_message_read(principal.user(), id)
        .await
        .map_err(problem(&meta))?;
    Ok(Json(message.into()))
}

#[utoipa::path(delete, path = "/api/messages/{id}", tag = "messages",
    params(("id" = Uuid, Path, description = "Message id")),
    responses((status = 204), (status = 403, body = Problem), (status = 404, body = Problem)))]
pub async fn delete_message(
    meta: RequestMeta,
    Extension(svc): Svc,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    svc.delete_message(principal.user(), id)
        .await
        .map_err(problem(&meta))?;
    Ok(StatusCode::NO_CONTENT)
}
