//! Read-only loan projections for borrowers and owners

use crate::{
    error::AppResult,
    models::{
        id::UserId,
        loan::{BorrowedBookResponse, LentBookResponse},
        page::{Page, PageRequest},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ProjectionService {
    repository: Repository,
}

impl ProjectionService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Books the user has borrowed, whatever the state of each loan
    pub async fn borrowed_books(
        &self,
        borrower_id: UserId,
        request: PageRequest,
    ) -> AppResult<Page<BorrowedBookResponse>> {
        let (items, total) = self
            .repository
            .loans
            .list_loans_of_borrower(borrower_id, request)
            .await?;

        Ok(Page::new(items, total, request).map(BorrowedBookResponse::from))
    }

    /// Loans of the user's books that were returned and wait for approval
    pub async fn pending_approvals(
        &self,
        owner_id: UserId,
        request: PageRequest,
    ) -> AppResult<Page<LentBookResponse>> {
        let (items, total) = self
            .repository
            .loans
            .list_pending_approvals_of_owner(owner_id, request)
            .await?;

        Ok(Page::new(items, total, request).map(LentBookResponse::from))
    }

    /// Full lending history of the user's books
    pub async fn lent_books(
        &self,
        owner_id: UserId,
        request: PageRequest,
    ) -> AppResult<Page<LentBookResponse>> {
        let (items, total) = self
            .repository
            .loans
            .list_loans_of_owner(owner_id, request)
            .await?;

        Ok(Page::new(items, total, request).map(LentBookResponse::from))
    }
}
