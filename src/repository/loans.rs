//! Loans repository for database operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};

use super::LoanRepository;
use crate::{
    error::{AppError, AppResult},
    models::{
        id::{BookId, LoanId, UserId},
        loan::{CreateLoan, LoanListing, LoanListingRow, LoanRecord, LoanRow},
        page::PageRequest,
    },
};

const LOAN_COLUMNS: &str =
    "l.id, l.book_id, l.borrower_id, l.returned, l.return_approved, l.created_at, l.updated_at";

/// Which side of a loan a list query is keyed by
#[derive(Debug, Clone, Copy)]
enum ListFilter {
    Borrower,
    PendingForOwner,
    Owner,
}

impl ListFilter {
    fn condition(self) -> &'static str {
        match self {
            ListFilter::Borrower => "l.borrower_id = $1",
            ListFilter::PendingForOwner => "b.owner_id = $1 AND l.returned AND NOT l.return_approved",
            ListFilter::Owner => "b.owner_id = $1",
        }
    }
}

/// Error for a compare-and-set that matched no row
fn missed_transition(loan_id: LoanId, exists: bool, action: &str) -> AppError {
    if exists {
        AppError::ConcurrencyConflict(format!(
            "Loan {} changed before it could be {}",
            loan_id, action
        ))
    } else {
        AppError::NotFound(format!("Loan with id {} not found", loan_id))
    }
}

#[derive(Clone)]
pub struct PgLoanRepository {
    pool: Pool<Postgres>,
}

impl PgLoanRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Compare-and-set: apply `set` only while the row still matches `expected`
    async fn transition(
        &self,
        loan_id: LoanId,
        set: &str,
        expected: &str,
        action: &str,
    ) -> AppResult<LoanRecord> {
        let query = format!(
            "UPDATE loans l SET {set}, updated_at = $2 WHERE l.id = $1 AND {expected} RETURNING {LOAN_COLUMNS}"
        );

        let row = sqlx::query_as::<_, LoanRow>(&query)
            .bind(loan_id)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE id = $1)")
                .bind(loan_id)
                .fetch_one(&self.pool)
                .await?;
            return Err(missed_transition(loan_id, exists, action));
        };

        row.try_into()
    }

    async fn list(
        &self,
        filter: ListFilter,
        user_id: UserId,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanListing>, i64)> {
        let condition = filter.condition();

        let count_q = format!(
            "SELECT COUNT(*) FROM loans l JOIN books b ON b.id = l.book_id WHERE {condition}"
        );
        let total: i64 = sqlx::query_scalar(&count_q)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let list_q = format!(
            r#"
            SELECT {LOAN_COLUMNS}, b.owner_id, b.title, b.author_name, b.isbn
            FROM loans l
            JOIN books b ON b.id = l.book_id
            WHERE {condition}
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, LoanListingRow>(&list_q)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let listings = rows
            .into_iter()
            .map(LoanListing::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((listings, total))
    }
}

#[async_trait]
impl LoanRepository for PgLoanRepository {
    async fn exists_open_loan(&self, book_id: BookId, borrower_id: UserId) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM loans
                WHERE book_id = $1 AND borrower_id = $2 AND NOT return_approved
            )
            "#,
        )
        .bind(book_id)
        .bind(borrower_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create_loan(&self, event: CreateLoan) -> AppResult<LoanRecord> {
        let now = Utc::now();

        // loans_one_open_per_borrower turns a lost guard-then-insert race into a unique violation
        let query = format!(
            r#"
            INSERT INTO loans AS l (book_id, borrower_id, returned, return_approved, created_at, updated_at)
            VALUES ($1, $2, FALSE, FALSE, $3, $3)
            RETURNING {LOAN_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, LoanRow>(&query)
            .bind(event.book_id)
            .bind(event.borrower_id)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::ConcurrencyConflict(format!(
                        "Book {} already has an open loan for user {}",
                        event.book_id, event.borrower_id
                    ))
                }
                other => AppError::StoreUnavailable(other),
            })?;

        row.try_into()
    }

    async fn find_open_loan_by_borrower(
        &self,
        book_id: BookId,
        borrower_id: UserId,
    ) -> AppResult<Option<LoanRecord>> {
        let query = format!(
            r#"
            SELECT {LOAN_COLUMNS}
            FROM loans l
            WHERE l.book_id = $1 AND l.borrower_id = $2
              AND NOT l.returned AND NOT l.return_approved
            "#
        );

        sqlx::query_as::<_, LoanRow>(&query)
            .bind(book_id)
            .bind(borrower_id)
            .fetch_optional(&self.pool)
            .await?
            .map(LoanRecord::try_from)
            .transpose()
    }

    async fn find_pending_approval_by_owner(
        &self,
        book_id: BookId,
        owner_id: UserId,
    ) -> AppResult<Option<LoanRecord>> {
        let query = format!(
            r#"
            SELECT {LOAN_COLUMNS}
            FROM loans l
            JOIN books b ON b.id = l.book_id
            WHERE l.book_id = $1 AND b.owner_id = $2
              AND l.returned AND NOT l.return_approved
            ORDER BY l.created_at, l.id
            LIMIT 1
            "#
        );

        sqlx::query_as::<_, LoanRow>(&query)
            .bind(book_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?
            .map(LoanRecord::try_from)
            .transpose()
    }

    async fn mark_returned(&self, loan_id: LoanId) -> AppResult<LoanRecord> {
        self.transition(
            loan_id,
            "returned = TRUE",
            "NOT l.returned AND NOT l.return_approved",
            "returned",
        )
        .await
    }

    async fn approve_return(&self, loan_id: LoanId) -> AppResult<LoanRecord> {
        self.transition(
            loan_id,
            "return_approved = TRUE",
            "l.returned AND NOT l.return_approved",
            "approved",
        )
        .await
    }

    async fn list_loans_of_borrower(
        &self,
        borrower_id: UserId,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanListing>, i64)> {
        self.list(ListFilter::Borrower, borrower_id, page).await
    }

    async fn list_pending_approvals_of_owner(
        &self,
        owner_id: UserId,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanListing>, i64)> {
        self.list(ListFilter::PendingForOwner, owner_id, page).await
    }

    async fn list_loans_of_owner(
        &self,
        owner_id: UserId,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanListing>, i64)> {
        self.list(ListFilter::Owner, owner_id, page).await
    }
}
