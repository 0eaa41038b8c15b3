//! Book copy endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::{BookListQuery, BookQuery},
        BookCopyShort, CopyId,
    },
};

/// List every copy with its lending status
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(
        ("sort" = Option<String>, Query, description = "Sort order: id (default), title or author")
    ),
    responses(
        (status = 200, description = "All copies", body = Vec<BookCopyShort>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookListQuery>,
) -> Json<Vec<BookCopyShort>> {
    Json(state.services.catalog.list(query.sort).await)
}

/// Search copies by title, author or copy id
#[utoipa::path(
    get,
    path = "/books/search",
    tag = "books",
    params(
        ("by" = Option<String>, Query, description = "Field to search: title (default), author or id"),
        ("q" = Option<String>, Query, description = "Search text")
    ),
    responses(
        (status = 200, description = "Matching copies", body = Vec<BookCopyShort>),
        (status = 400, description = "Unknown search field")
    )
)]
pub async fn search_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> Json<Vec<BookCopyShort>> {
    Json(state.services.catalog.search(&query).await)
}

/// Get one copy by id
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = u32, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy details", body = BookCopyShort),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<CopyId>,
) -> AppResult<Json<BookCopyShort>> {
    let copy = state.services.catalog.get(id).await?;
    Ok(Json(copy))
}
