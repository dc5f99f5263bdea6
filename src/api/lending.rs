//! Lending endpoints: borrow, return, approve, and the per-user projections

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        id::{BookId, LoanId, UserId},
        loan::{BorrowedBookResponse, LentBookResponse, LoanRecord, LoanState},
        page::{BorrowedBooksPage, LentBooksPage, Page, PageQuery},
    },
    AppState,
};

use super::AuthenticatedUser;

/// Loan after a transition
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub borrower_id: UserId,
    pub returned: bool,
    pub return_approved: bool,
    pub state: LoanState,
    /// When the book was borrowed
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Status message
    pub message: String,
}

impl LoanResponse {
    fn new(loan: LoanRecord, message: &str) -> Self {
        let (returned, return_approved) = loan.state.flags();
        Self {
            loan_id: loan.id,
            book_id: loan.book_id,
            borrower_id: loan.borrower_id,
            returned,
            return_approved,
            state: loan.state,
            created_at: loan.created_at,
            updated_at: loan.updated_at,
            message: message.to_string(),
        }
    }
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/books/{id}/borrow",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 201, description = "Book borrowed", body = LoanResponse),
        (status = 400, description = "Book not lendable, owned by the caller, or already borrowed", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Concurrent update, try again", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<BookId>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    claims.require_member()?;

    let loan = state
        .services
        .lending
        .borrow_book(&claims.actor(), book_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse::new(loan, "Book borrowed successfully")),
    ))
}

/// Return a borrowed book; the loan then waits for the owner's approval
#[utoipa::path(
    patch,
    path = "/books/{id}/borrow/return",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Return recorded", body = LoanResponse),
        (status = 400, description = "Book not lendable or not borrowed by the caller", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Concurrent update, try again", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<BookId>,
) -> AppResult<Json<LoanResponse>> {
    claims.require_member()?;

    let loan = state
        .services
        .lending
        .return_book(&claims.actor(), book_id)
        .await?;

    Ok(Json(LoanResponse::new(
        loan,
        "Book returned, waiting for the owner's approval",
    )))
}

/// Approve the return of one of the caller's books
#[utoipa::path(
    patch,
    path = "/books/{id}/borrow/return/approve",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Return approved, loan closed", body = LoanResponse),
        (status = 400, description = "Caller does not own the book, or nothing was returned", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Concurrent update, try again", body = crate::error::ErrorResponse)
    )
)]
pub async fn approve_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<BookId>,
) -> AppResult<Json<LoanResponse>> {
    claims.require_member()?;

    let loan = state
        .services
        .lending
        .approve_return(&claims.actor(), book_id)
        .await?;

    Ok(Json(LoanResponse::new(loan, "Return approved")))
}

/// Books borrowed by the caller
#[utoipa::path(
    get,
    path = "/books/borrowed",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Borrowed books, newest first", body = BorrowedBooksPage),
        (status = 400, description = "Invalid page parameters")
    )
)]
pub async fn borrowed_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<BorrowedBookResponse>>> {
    claims.require_member()?;
    query.validate()?;

    let page = state
        .services
        .projections
        .borrowed_books(claims.user_id, query.request())
        .await?;

    Ok(Json(page))
}

/// Returns of the caller's books that wait for approval
#[utoipa::path(
    get,
    path = "/books/returned",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Returned books pending approval, newest first", body = LentBooksPage),
        (status = 400, description = "Invalid page parameters")
    )
)]
pub async fn pending_approvals(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<LentBookResponse>>> {
    claims.require_member()?;
    query.validate()?;

    let page = state
        .services
        .projections
        .pending_approvals(claims.user_id, query.request())
        .await?;

    Ok(Json(page))
}

/// Lending history of the caller's books
#[utoipa::path(
    get,
    path = "/books/lent",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Loans of the caller's books, newest first", body = LentBooksPage),
        (status = 400, description = "Invalid page parameters")
    )
)]
pub async fn lent_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<LentBookResponse>>> {
    claims.require_member()?;
    query.validate()?;

    let page = state
        .services
        .projections
        .lent_books(claims.user_id, query.request())
        .await?;

    Ok(Json(page))
}
