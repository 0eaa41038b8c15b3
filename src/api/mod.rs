//! API handlers for the campus library REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod students;
pub mod sync;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Books
        .route("/books", get(books::list_books))
        .route("/books/search", get(books::search_books))
        .route("/books/:id", get(books::get_book))
        // Students
        .route("/students", get(students::list_students))
        .route("/students", post(students::create_student))
        .route("/students/login", post(students::login))
        .route("/students/:email", get(students::get_student))
        .route("/students/:email/loans", get(students::get_student_loans))
        // Loans
        .route("/loans", post(loans::create_loan))
        .route("/loans/return", post(loans::return_loan))
        // Sync
        .route("/sync/status", get(sync::get_status))
        .route("/sync/retry", post(sync::retry))
        .route("/sync/events", get(sync::events))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
