//! Lending engine: borrow, return and approve-return transitions
//!
//! Every transition reloads the catalog entry, evaluates its guards, then
//! applies a single insert or a single compare-and-set update through the loan
//! repository. When the store reports that a concurrent transition won the
//! race, the whole sequence runs once more so the caller gets the outcome that
//! matches the state after the race (usually a precondition failure).

use std::future::Future;

use crate::{
    error::{AppError, AppResult, LendingRejection},
    models::{
        book::CatalogEntry,
        id::BookId,
        loan::{CreateLoan, LoanRecord},
        user::Actor,
    },
    repository::Repository,
};

/// Automatic re-runs after a `ConcurrencyConflict`
const CONFLICT_RETRIES: usize = 1;

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
}

impl LendingService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Borrow a book: creates an ACTIVE loan for the actor
    pub async fn borrow_book(&self, actor: &Actor, book_id: BookId) -> AppResult<LoanRecord> {
        let loan = retry_on_conflict("borrow", || self.try_borrow(actor, book_id)).await?;

        tracing::info!(
            loan_id = %loan.id,
            book_id = %book_id,
            borrower_id = %actor.id,
            "Book borrowed"
        );
        Ok(loan)
    }

    /// Signal the return of a borrowed book: ACTIVE -> RETURN_PENDING
    pub async fn return_book(&self, actor: &Actor, book_id: BookId) -> AppResult<LoanRecord> {
        let loan = retry_on_conflict("return", || self.try_return(actor, book_id)).await?;

        tracing::info!(
            loan_id = %loan.id,
            book_id = %book_id,
            borrower_id = %actor.id,
            "Book returned, waiting for owner approval"
        );
        Ok(loan)
    }

    /// Confirm a return as the book's owner: RETURN_PENDING -> CLOSED
    pub async fn approve_return(&self, actor: &Actor, book_id: BookId) -> AppResult<LoanRecord> {
        let loan = retry_on_conflict("approve return", || self.try_approve(actor, book_id)).await?;

        tracing::info!(
            loan_id = %loan.id,
            book_id = %book_id,
            borrower_id = %loan.borrower_id,
            owner_id = %actor.id,
            "Return approved, loan closed"
        );
        Ok(loan)
    }

    /// Whether the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.books.ping().await
    }

    async fn try_borrow(&self, actor: &Actor, book_id: BookId) -> AppResult<LoanRecord> {
        let book = self.load_lendable_book(book_id).await?;

        if book.is_owned_by(actor.id) {
            return Err(LendingRejection::OwnBook.into());
        }

        if self.repository.loans.exists_open_loan(book_id, actor.id).await? {
            return Err(LendingRejection::AlreadyBorrowed.into());
        }

        self.repository
            .loans
            .create_loan(CreateLoan {
                book_id,
                borrower_id: actor.id,
            })
            .await
    }

    async fn try_return(&self, actor: &Actor, book_id: BookId) -> AppResult<LoanRecord> {
        self.load_lendable_book(book_id).await?;

        let loan = self
            .repository
            .loans
            .find_open_loan_by_borrower(book_id, actor.id)
            .await?
            .ok_or(LendingRejection::NotBorrowed)?;

        self.repository.loans.mark_returned(loan.id).await
    }

    async fn try_approve(&self, actor: &Actor, book_id: BookId) -> AppResult<LoanRecord> {
        let book = self.load_lendable_book(book_id).await?;

        if !book.is_owned_by(actor.id) {
            return Err(LendingRejection::NotOwner.into());
        }

        let loan = self
            .repository
            .loans
            .find_pending_approval_by_owner(book_id, actor.id)
            .await?
            .ok_or(LendingRejection::NotReturnedYet)?;

        self.repository.loans.approve_return(loan.id).await
    }

    /// Load a book and reject it when it is archived or not shareable
    async fn load_lendable_book(&self, book_id: BookId) -> AppResult<CatalogEntry> {
        let book = self
            .repository
            .books
            .find_by_id(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        if !book.is_lendable() {
            return Err(LendingRejection::NotLendable.into());
        }

        Ok(book)
    }
}

/// Run `attempt`, re-running it after a lost race up to `CONFLICT_RETRIES` times.
///
/// A conflict that survives the retries is returned to the caller.
async fn retry_on_conflict<T, F, Fut>(operation: &'static str, mut attempt: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Err(AppError::ConcurrencyConflict(reason)) if retries < CONFLICT_RETRIES => {
                retries += 1;
                tracing::warn!(operation, %reason, "Lost a concurrent {}, re-checking guards", operation);
            }
            Err(AppError::ConcurrencyConflict(reason)) => {
                tracing::warn!(operation, %reason, "Concurrent {} still conflicting after retry", operation);
                return Err(AppError::ConcurrencyConflict(reason));
            }
            other => return other,
        }
    }
}
