//! Borrow and return endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{CopyId, CopyTarget, Loan},
    sync::StudentWrite,
};

/// Borrow or return request. The copy is designated by `copy_id`, or by
/// `isbn` when no id is given.
#[derive(Deserialize, ToSchema)]
pub struct LoanRequest {
    /// Student email
    pub email: String,
    /// Copy ID
    pub copy_id: Option<CopyId>,
    /// ISBN; borrowing takes the first available copy, returning needs the
    /// student to hold exactly one copy with it
    pub isbn: Option<String>,
}

impl LoanRequest {
    fn target(&self) -> AppResult<CopyTarget> {
        CopyTarget::from_parts(self.copy_id, self.isbn.as_deref())
    }
}

#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    pub loan: Loan,
    pub sync: StudentWrite,
}

#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Copy put back on the shelf
    pub copy_id: CopyId,
    /// Loan the copy carried, if it was held
    pub loan: Option<Loan>,
    /// One entry per student whose loans changed
    pub sync: Vec<StudentWrite>,
}

/// Borrow a copy
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = LoanRequest,
    responses(
        (status = 201, description = "Copy lent", body = LoanResponse),
        (status = 400, description = "Neither copy_id nor isbn given"),
        (status = 404, description = "Student or copy not found"),
        (status = 422, description = "Copy already on loan")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<LoanRequest>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    let target = request.target()?;
    let (loan, sync) = state.services.loans.borrow(&request.email, target).await?;
    Ok((StatusCode::CREATED, Json(LoanResponse { loan, sync })))
}

/// Return a copy
#[utoipa::path(
    post,
    path = "/loans/return",
    tag = "loans",
    request_body = LoanRequest,
    responses(
        (status = 200, description = "Copy returned", body = ReturnResponse),
        (status = 400, description = "No copy designated, or ISBN matches several held copies"),
        (status = 404, description = "Student or copy not found")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<LoanRequest>,
) -> AppResult<Json<ReturnResponse>> {
    let target = request.target()?;
    let (outcome, sync) = state
        .services
        .loans
        .give_back(&request.email, target)
        .await?;

    Ok(Json(ReturnResponse {
        copy_id: outcome.copy_id,
        loan: outcome.previous,
        sync,
    }))
}
