//! Student endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        student::{CreateStudent, StudentQuery},
        LoanDetails, StudentShort,
    },
    sync::StudentWrite,
};

/// Registration response
#[derive(Serialize, ToSchema)]
pub struct StudentResponse {
    pub student: StudentShort,
    /// Whether the new student reached the remote store
    pub sync: StudentWrite,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Register a new student
#[utoipa::path(
    post,
    path = "/students",
    tag = "students",
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student registered", body = StudentResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_student(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateStudent>,
) -> AppResult<(StatusCode, Json<StudentResponse>)> {
    let (student, sync) = state.services.students.register(request).await?;
    Ok((StatusCode::CREATED, Json(StudentResponse { student, sync })))
}

/// Check a student's email and password
#[utoipa::path(
    post,
    path = "/students/login",
    tag = "students",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted", body = StudentShort),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<StudentShort>> {
    let student = state
        .services
        .students
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(student))
}

/// List students
#[utoipa::path(
    get,
    path = "/students",
    tag = "students",
    params(
        ("sort" = Option<String>, Query, description = "Sort order: name (default), email, id or loans")
    ),
    responses(
        (status = 200, description = "All students", body = Vec<StudentShort>)
    )
)]
pub async fn list_students(
    State(state): State<crate::AppState>,
    Query(query): Query<StudentQuery>,
) -> Json<Vec<StudentShort>> {
    Json(state.services.students.list(query.sort).await)
}

/// Get a student by email
#[utoipa::path(
    get,
    path = "/students/{email}",
    tag = "students",
    params(
        ("email" = String, Path, description = "Student email")
    ),
    responses(
        (status = 200, description = "Student details", body = StudentShort),
        (status = 404, description = "Student not found")
    )
)]
pub async fn get_student(
    State(state): State<crate::AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<StudentShort>> {
    let student = state.services.students.get(&email).await?;
    Ok(Json(student))
}

/// Copies a student currently holds
#[utoipa::path(
    get,
    path = "/students/{email}/loans",
    tag = "students",
    params(
        ("email" = String, Path, description = "Student email")
    ),
    responses(
        (status = 200, description = "Held copies with due dates", body = Vec<LoanDetails>),
        (status = 404, description = "Student not found")
    )
)]
pub async fn get_student_loans(
    State(state): State<crate::AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.students.loans(&email).await?;
    Ok(Json(loans))
}
