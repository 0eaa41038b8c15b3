//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, loans, students, sync};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campus Library API",
        version = "1.0.0",
        description = "Book lending for a campus library",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        // Books
        books::list_books,
        books::search_books,
        books::get_book,
        // Students
        students::create_student,
        students::login,
        students::list_students,
        students::get_student,
        students::get_student_loans,
        // Loans
        loans::create_loan,
        loans::return_loan,
        // Sync
        sync::get_status,
        sync::retry,
        sync::events,
    ),
    components(
        schemas(
            // Books
            crate::models::BookCopyShort,
            crate::models::book::BookSort,
            crate::models::book::SearchField,
            // Students
            crate::models::StudentShort,
            crate::models::student::CreateStudent,
            crate::models::student::StudentSort,
            students::StudentResponse,
            students::LoginRequest,
            // Loans
            crate::models::Loan,
            crate::models::LoanDetails,
            loans::LoanRequest,
            loans::LoanResponse,
            loans::ReturnResponse,
            // Sync
            crate::sync::SyncOutcome,
            crate::sync::SyncEvent,
            crate::sync::SyncStatus,
            crate::sync::PendingWrite,
            crate::sync::StudentWrite,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog of book copies"),
        (name = "students", description = "Student registration and lookup"),
        (name = "loans", description = "Borrowing and returning copies"),
        (name = "sync", description = "Remote student store synchronization")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
