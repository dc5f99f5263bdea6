//! Loan record model and lending projections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::book::BookSummary;
use super::id::{BookId, LoanId, UserId};
use crate::error::{AppError, AppResult};

/// Lifecycle of a loan.
///
/// Storage keeps the historical `returned` / `return_approved` flag pair; this
/// enum is the only representation used above the repository, which makes the
/// "approved but never returned" combination unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanState {
    /// The book is out on loan
    Active,
    /// The borrower handed the book back, the owner has not confirmed yet
    ReturnPending,
    /// Terminal: the owner confirmed the return
    Closed,
}

impl LoanState {
    /// Decode the stored flag pair, `None` for `returned = false, return_approved = true`
    pub fn from_flags(returned: bool, return_approved: bool) -> Option<Self> {
        match (returned, return_approved) {
            (false, false) => Some(LoanState::Active),
            (true, false) => Some(LoanState::ReturnPending),
            (true, true) => Some(LoanState::Closed),
            (false, true) => None,
        }
    }

    /// `(returned, return_approved)` as persisted
    pub fn flags(self) -> (bool, bool) {
        match self {
            LoanState::Active => (false, false),
            LoanState::ReturnPending => (true, false),
            LoanState::Closed => (true, true),
        }
    }

    /// Open loans block the same borrower from borrowing the book again
    pub fn is_open(self) -> bool {
        self != LoanState::Closed
    }

    /// State reached when the borrower signals the return
    pub fn after_return(self) -> Option<Self> {
        match self {
            LoanState::Active => Some(LoanState::ReturnPending),
            _ => None,
        }
    }

    /// State reached when the owner approves the return
    pub fn after_approval(self) -> Option<Self> {
        match self {
            LoanState::ReturnPending => Some(LoanState::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for LoanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LoanState::Active => "ACTIVE",
            LoanState::ReturnPending => "RETURN_PENDING",
            LoanState::Closed => "CLOSED",
        };
        write!(f, "{}", s)
    }
}

/// One borrow transaction for a (book, borrower) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: LoanId,
    pub book_id: BookId,
    pub borrower_id: UserId,
    pub state: LoanState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanRecord {
    pub fn returned(&self) -> bool {
        self.state.flags().0
    }

    pub fn return_approved(&self) -> bool {
        self.state.flags().1
    }
}

/// Raw `loans` row
#[derive(Debug, Clone, FromRow)]
pub struct LoanRow {
    id: LoanId,
    book_id: BookId,
    borrower_id: UserId,
    returned: bool,
    return_approved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LoanRow> for LoanRecord {
    type Error = AppError;

    fn try_from(row: LoanRow) -> AppResult<Self> {
        let state = LoanState::from_flags(row.returned, row.return_approved).ok_or_else(|| {
            AppError::Internal(format!(
                "Loan {} is approved but was never returned",
                row.id
            ))
        })?;

        Ok(LoanRecord {
            id: row.id,
            book_id: row.book_id,
            borrower_id: row.borrower_id,
            state,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A loan together with the book it concerns, as returned by list queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanListing {
    pub loan: LoanRecord,
    pub book: BookSummary,
}

/// Row of the loans/books join used by list queries
#[derive(Debug, Clone, FromRow)]
pub struct LoanListingRow {
    #[sqlx(flatten)]
    loan: LoanRow,
    owner_id: UserId,
    title: String,
    author_name: String,
    isbn: String,
}

impl TryFrom<LoanListingRow> for LoanListing {
    type Error = AppError;

    fn try_from(row: LoanListingRow) -> AppResult<Self> {
        let book = BookSummary {
            id: row.loan.book_id,
            owner_id: row.owner_id,
            title: row.title,
            author_name: row.author_name,
            isbn: row.isbn,
        };
        Ok(LoanListing {
            loan: row.loan.try_into()?,
            book,
        })
    }
}

/// Create loan request, as issued by a successful borrow guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateLoan {
    pub book_id: BookId,
    pub borrower_id: UserId,
}

/// "Borrowed by me" projection
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowedBookResponse {
    /// Book ID
    pub id: BookId,
    pub loan_id: LoanId,
    pub title: String,
    pub author_name: String,
    pub isbn: String,
    pub returned: bool,
    pub return_approved: bool,
    pub state: LoanState,
    /// When the book was borrowed
    pub borrowed_at: DateTime<Utc>,
}

impl From<LoanListing> for BorrowedBookResponse {
    fn from(listing: LoanListing) -> Self {
        let (returned, return_approved) = listing.loan.state.flags();
        BorrowedBookResponse {
            id: listing.book.id,
            loan_id: listing.loan.id,
            title: listing.book.title,
            author_name: listing.book.author_name,
            isbn: listing.book.isbn,
            returned,
            return_approved,
            state: listing.loan.state,
            borrowed_at: listing.loan.created_at,
        }
    }
}

/// Owner-side projection: a loan of one of my books
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LentBookResponse {
    /// Book ID
    pub id: BookId,
    pub loan_id: LoanId,
    pub title: String,
    pub author_name: String,
    pub isbn: String,
    pub borrower_id: UserId,
    pub returned: bool,
    pub return_approved: bool,
    pub state: LoanState,
    pub borrowed_at: DateTime<Utc>,
    /// Last transition of the loan
    pub updated_at: DateTime<Utc>,
}

impl From<LoanListing> for LentBookResponse {
    fn from(listing: LoanListing) -> Self {
        let (returned, return_approved) = listing.loan.state.flags();
        LentBookResponse {
            id: listing.book.id,
            loan_id: listing.loan.id,
            title: listing.book.title,
            author_name: listing.book.author_name,
            isbn: listing.book.isbn,
            borrower_id: listing.loan.borrower_id,
            returned,
            return_approved,
            state: listing.loan.state,
            borrowed_at: listing.loan.created_at,
            updated_at: listing.loan.updated_at,
        }
    }
}
