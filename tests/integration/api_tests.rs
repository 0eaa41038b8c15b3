//! API integration tests
//!
//! Each test builds the full router over an in-memory student store and a
//! temporary seed catalog, and drives it in process.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use campus_library::{
    api,
    models::{student::LoanRecord, StudentDocument},
    services::Services,
    store::MemoryStore,
    sync::Outbox,
    AppConfig, AppState,
};

const SEED: &str = "isbn,title,author
9780441013593,Dune,Frank Herbert
9780441013593,Dune,Frank Herbert
9780547928227,The Hobbit,J.R.R. Tolkien
9780618640157,The Lord of the Rings,J.R.R. Tolkien
not enough fields
";

async fn app(store: MemoryStore) -> Router {
    let seed = std::env::temp_dir().join(format!("campus-library-seed-{}.csv", uuid::Uuid::new_v4()));
    std::fs::write(&seed, SEED).expect("Failed to write seed catalog");

    let mut config = AppConfig::default();
    config.catalog.seed_path = seed.to_string_lossy().into_owned();

    let services = Services::start(&config, Arc::new(store), Outbox::in_memory()).await;
    let _ = std::fs::remove_file(&seed);

    api::create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(format!("/api/v1{}", uri));
    let body = match body {
        Some(body) => {
            request = request.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).expect("Failed to build request"))
        .await
        .expect("Failed to send request");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Failed to parse response")
    };
    (status, body)
}

async fn register(app: &Router, first_name: &str, email: &str) -> Value {
    let (status, body) = call(
        app,
        Method::POST,
        "/students",
        Some(json!({
            "first_name": first_name,
            "last_name": "Student",
            "email": email,
            "password": "secret"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

#[tokio::test]
async fn test_health_check() {
    let app = app(MemoryStore::new()).await;

    let (status, body) = call(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["pending_writes"], 0);
}

#[tokio::test]
async fn test_catalog_is_loaded_from_seed() {
    let app = app(MemoryStore::new()).await;

    let (status, body) = call(&app, Method::GET, "/books", None).await;

    assert_eq!(status, StatusCode::OK);
    let books = body.as_array().unwrap();
    assert_eq!(books.len(), 4);
    assert_eq!(books[0]["id"], 1);
    assert_eq!(books[0]["title"], "Dune");
    assert!(books.iter().all(|book| book["available"] == true));
}

#[tokio::test]
async fn test_register_writes_to_store() {
    let store = MemoryStore::new();
    let app = app(store.clone()).await;

    let body = register(&app, "Ada", "Ada@Campus.edu").await;

    assert_eq!(body["student"]["email"], "Ada@Campus.edu");
    assert_eq!(body["sync"]["email"], "ada@campus.edu");
    assert_eq!(body["sync"]["outcome"]["status"], "synced");

    let stored = store.get("ada@campus.edu").await.unwrap();
    assert_eq!(stored.first_name, "Ada");
    assert!(stored.current_books.is_empty());
}

#[tokio::test]
async fn test_register_rejects_duplicate_and_invalid_email() {
    let app = app(MemoryStore::new()).await;
    register(&app, "Ada", "ada@campus.edu").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/students",
        Some(json!({
            "first_name": "Other",
            "last_name": "Ada",
            "email": "ADA@campus.edu",
            "password": "x"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Duplicate");

    let (status, _) = call(
        &app,
        Method::POST,
        "/students",
        Some(json!({
            "first_name": "No",
            "last_name": "Email",
            "email": "not-an-email",
            "password": "x"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login() {
    let app = app(MemoryStore::new()).await;
    register(&app, "Ada", "ada@campus.edu").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/students/login",
        Some(json!({ "email": "ada@campus.edu", "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Ada");
    assert!(body.get("password").is_none());

    let (status, _) = call(
        &app,
        Method::POST,
        "/students/login",
        Some(json!({ "email": "ada@campus.edu", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_borrow_by_isbn_takes_each_available_copy_in_turn() {
    let store = MemoryStore::new();
    let app = app(store.clone()).await;
    register(&app, "Ada", "ada@campus.edu").await;
    register(&app, "Alan", "alan@campus.edu").await;
    register(&app, "Grace", "grace@campus.edu").await;

    let dune = json!({ "email": "ada@campus.edu", "isbn": "9780441013593" });
    let (status, body) = call(&app, Method::POST, "/loans", Some(dune)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["loan"]["copy_id"], 1);
    assert_eq!(body["sync"]["outcome"]["status"], "synced");

    let borrowed_on: NaiveDate = serde_json::from_value(body["loan"]["borrowed_on"].clone()).unwrap();
    let due_date: NaiveDate = serde_json::from_value(body["loan"]["due_date"].clone()).unwrap();
    assert_eq!((due_date - borrowed_on).num_days(), 14);

    let dune = json!({ "email": "alan@campus.edu", "isbn": "9780441013593" });
    let (_, body) = call(&app, Method::POST, "/loans", Some(dune)).await;
    assert_eq!(body["loan"]["copy_id"], 2);

    let dune = json!({ "email": "grace@campus.edu", "isbn": "9780441013593" });
    let (status, body) = call(&app, Method::POST, "/loans", Some(dune)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "CopyNotAvailable");

    let stored = store.get("alan@campus.edu").await.unwrap();
    assert_eq!(stored.current_books, vec!["9780441013593".to_string()]);
    assert!(store.get("grace@campus.edu").await.unwrap().loans.is_empty());
}

#[tokio::test]
async fn test_borrow_held_copy_by_id_is_rejected() {
    let app = app(MemoryStore::new()).await;
    register(&app, "Ada", "ada@campus.edu").await;
    register(&app, "Alan", "alan@campus.edu").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/loans",
        Some(json!({ "email": "ada@campus.edu", "copy_id": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        &app,
        Method::POST,
        "/loans",
        Some(json!({ "email": "alan@campus.edu", "copy_id": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, book) = call(&app, Method::GET, "/books/3", None).await;
    assert_eq!(book["available"], false);
}

#[tokio::test]
async fn test_borrow_requires_a_copy() {
    let app = app(MemoryStore::new()).await;
    register(&app, "Ada", "ada@campus.edu").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/loans",
        Some(json!({ "email": "ada@campus.edu" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::POST,
        "/loans",
        Some(json!({ "email": "ada@campus.edu", "isbn": "0000000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_return_makes_copy_available_again() {
    let store = MemoryStore::new();
    let app = app(store.clone()).await;
    register(&app, "Ada", "ada@campus.edu").await;

    call(
        &app,
        Method::POST,
        "/loans",
        Some(json!({ "email": "ada@campus.edu", "isbn": "9780547928227" })),
    )
    .await;

    let (status, loans) = call(&app, Method::GET, "/students/ada@campus.edu/loans", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loans[0]["title"], "The Hobbit");
    assert_eq!(loans[0]["is_overdue"], false);

    let (status, body) = call(
        &app,
        Method::POST,
        "/loans/return",
        Some(json!({ "email": "ada@campus.edu", "isbn": "9780547928227" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["copy_id"], 3);
    assert_eq!(body["loan"]["copy_id"], 3);

    let (_, book) = call(&app, Method::GET, "/books/3", None).await;
    assert_eq!(book["available"], true);
    assert!(book["due_date"].is_null());

    let (_, loans) = call(&app, Method::GET, "/students/ada@campus.edu/loans", None).await;
    assert!(loans.as_array().unwrap().is_empty());
    assert!(store.get("ada@campus.edu").await.unwrap().current_books.is_empty());
}

#[tokio::test]
async fn test_return_by_isbn_not_held_is_not_found() {
    let app = app(MemoryStore::new()).await;
    register(&app, "Ada", "ada@campus.edu").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/loans/return",
        Some(json!({ "email": "ada@campus.edu", "isbn": "9780547928227" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search() {
    let app = app(MemoryStore::new()).await;

    let (status, body) = call(&app, Method::GET, "/books/search?by=author&q=tolkien", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = call(&app, Method::GET, "/books/search?by=title&q=DUNE", None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = call(&app, Method::GET, "/books/search?by=id&q=4", None).await;
    assert_eq!(body[0]["title"], "The Lord of the Rings");

    let (status, body) = call(&app, Method::GET, "/books/search?by=id&q=four", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_copy_and_student() {
    let app = app(MemoryStore::new()).await;

    let (status, body) = call(&app, Method::GET, "/books/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");

    let (status, _) = call(&app, Method::GET, "/students/nobody@campus.edu", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_students_sorted_by_name() {
    let app = app(MemoryStore::new()).await;
    for (first, last, email) in [
        ("Zoe", "Young", "zoe@campus.edu"),
        ("Amy", "Baker", "amy@campus.edu"),
        ("Bob", "Baker", "bob@campus.edu"),
    ] {
        call(
            &app,
            Method::POST,
            "/students",
            Some(json!({
                "first_name": first,
                "last_name": last,
                "email": email,
                "password": "pw"
            })),
        )
        .await;
    }

    let (_, body) = call(&app, Method::GET, "/students?sort=name", None).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|student| student["first_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Amy", "Bob", "Zoe"]);
}

#[tokio::test]
async fn test_persisted_loans_are_restored_at_startup() {
    let borrowed_on = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let due_date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    let store = MemoryStore::with_documents(vec![StudentDocument {
        id: 100001,
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        email: "grace@campus.edu".to_string(),
        password: "cobol".to_string(),
        current_books: vec!["9780547928227".to_string()],
        loans: vec![LoanRecord {
            copy_id: 3,
            isbn: "9780547928227".to_string(),
            borrowed_on,
            due_date,
        }],
    }]);
    let app = app(store).await;

    let (_, book) = call(&app, Method::GET, "/books/3", None).await;
    assert_eq!(book["available"], false);
    assert_eq!(book["holder_id"], "100001");
    assert_eq!(book["due_date"], "2024-03-15");

    let (_, loans) = call(&app, Method::GET, "/students/grace@campus.edu/loans", None).await;
    assert_eq!(loans[0]["copy_id"], 3);
    assert_eq!(loans[0]["is_overdue"], true);
}

#[tokio::test]
async fn test_sync_status_starts_empty() {
    let app = app(MemoryStore::new()).await;

    let (status, body) = call(&app, Method::GET, "/sync/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending"], 0);

    let (status, body) = call(&app, Method::POST, "/sync/retry", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending"], 0);
}
