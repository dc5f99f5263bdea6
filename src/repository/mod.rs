//! Repository layer: persistence boundary of the lending engine

pub mod books;
pub mod loans;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::CatalogEntry,
        id::{BookId, LoanId, UserId},
        loan::{CreateLoan, LoanListing, LoanRecord},
        page::PageRequest,
    },
};

/// Read access to catalog entries owned by catalog management
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_by_id(&self, book_id: BookId) -> AppResult<Option<CatalogEntry>>;

    /// Cheap round trip used by readiness checks
    async fn ping(&self) -> AppResult<()>;
}

/// Loan records, exposed through the narrow predicates each transition needs.
///
/// Borrower-keyed and owner-keyed lookups are deliberately separate methods:
/// the key a transition searches by is its authorization check.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// Whether `borrower_id` holds a loan of `book_id` whose return is not approved yet
    async fn exists_open_loan(&self, book_id: BookId, borrower_id: UserId) -> AppResult<bool>;

    /// Insert an ACTIVE loan.
    ///
    /// Fails with `ConcurrencyConflict` when an open loan for the same
    /// (book, borrower) pair already exists, whatever the guard said before.
    async fn create_loan(&self, event: CreateLoan) -> AppResult<LoanRecord>;

    /// The borrower's ACTIVE loan of this book
    async fn find_open_loan_by_borrower(
        &self,
        book_id: BookId,
        borrower_id: UserId,
    ) -> AppResult<Option<LoanRecord>>;

    /// The oldest RETURN_PENDING loan of this book, provided `owner_id` owns the book
    async fn find_pending_approval_by_owner(
        &self,
        book_id: BookId,
        owner_id: UserId,
    ) -> AppResult<Option<LoanRecord>>;

    /// ACTIVE -> RETURN_PENDING, only if the row is still ACTIVE.
    ///
    /// Fails with `ConcurrencyConflict` when the row already moved on and with
    /// `NotFound` when no loan has this id.
    async fn mark_returned(&self, loan_id: LoanId) -> AppResult<LoanRecord>;

    /// RETURN_PENDING -> CLOSED, only if the row is still RETURN_PENDING.
    ///
    /// Fails with `ConcurrencyConflict` when the row already moved on and with
    /// `NotFound` when no loan has this id.
    async fn approve_return(&self, loan_id: LoanId) -> AppResult<LoanRecord>;

    /// Every loan of a borrower, newest first
    async fn list_loans_of_borrower(
        &self,
        borrower_id: UserId,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanListing>, i64)>;

    /// Loans of the owner's books waiting for the owner's approval, newest first
    async fn list_pending_approvals_of_owner(
        &self,
        owner_id: UserId,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanListing>, i64)>;

    /// Every loan of every book the owner owns, newest first
    async fn list_loans_of_owner(
        &self,
        owner_id: UserId,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanListing>, i64)>;
}

/// Main repository struct handed to the services
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn CatalogRepository>,
    pub loans: Arc<dyn LoanRepository>,
}

impl Repository {
    /// Create a Postgres-backed repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::PgCatalogRepository::new(pool.clone())),
            loans: Arc::new(loans::PgLoanRepository::new(pool)),
        }
    }

    /// Create a repository backed by an in-process store
    pub fn in_memory(store: memory::MemoryStore) -> Self {
        Self {
            books: Arc::new(store.clone()),
            loans: Arc::new(store),
        }
    }

    pub fn from_parts(books: Arc<dyn CatalogRepository>, loans: Arc<dyn LoanRepository>) -> Self {
        Self { books, loans }
    }
}
