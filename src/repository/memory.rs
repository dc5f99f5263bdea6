//! In-process store implementing both repository traits.
//!
//! Each operation runs under a single lock, so the open-loan uniqueness check
//! and the compare-and-set updates behave like their Postgres counterparts.
//! Catalog management is external to the lending engine, so seeding books is
//! only possible through the inherent methods here.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{CatalogRepository, LoanRepository};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::CatalogEntry,
        id::{BookId, LoanId, UserId},
        loan::{CreateLoan, LoanListing, LoanRecord, LoanState},
        page::PageRequest,
    },
};

/// Book to seed into the store
#[derive(Debug, Clone)]
pub struct NewBook {
    pub owner_id: UserId,
    pub title: String,
    pub author_name: String,
    pub isbn: String,
    pub shareable: bool,
    pub archived: bool,
}

impl NewBook {
    /// A shareable, non-archived book
    pub fn shared(owner_id: impl Into<UserId>, title: &str) -> Self {
        Self {
            owner_id: owner_id.into(),
            title: title.to_string(),
            author_name: "Unknown".to_string(),
            isbn: String::new(),
            shareable: true,
            archived: false,
        }
    }
}

#[derive(Default)]
struct Tables {
    books: BTreeMap<BookId, CatalogEntry>,
    /// Append-only, in insertion order
    loans: Vec<LoanRecord>,
    next_book_id: i64,
    next_loan_id: i64,
}

impl Tables {
    fn listing(&self, loan: &LoanRecord) -> AppResult<LoanListing> {
        let book = self.books.get(&loan.book_id).ok_or_else(|| {
            AppError::Internal(format!("Loan {} references missing book {}", loan.id, loan.book_id))
        })?;
        Ok(LoanListing {
            loan: loan.clone(),
            book: book.summary(),
        })
    }

    fn owner_of(&self, book_id: BookId) -> Option<UserId> {
        self.books.get(&book_id).map(|b| b.owner_id)
    }

    fn page_of(
        &self,
        page: PageRequest,
        predicate: impl Fn(&LoanRecord) -> bool,
    ) -> AppResult<(Vec<LoanListing>, i64)> {
        let mut matching: Vec<&LoanRecord> = self.loans.iter().filter(|l| predicate(l)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|l| self.listing(l))
            .collect::<AppResult<Vec<_>>>()?;

        Ok((items, total))
    }

    /// Compare-and-set on a loan's state
    fn transition(
        &mut self,
        loan_id: LoanId,
        next: impl Fn(LoanState) -> Option<LoanState>,
        action: &str,
    ) -> AppResult<LoanRecord> {
        let loan = self
            .loans
            .iter_mut()
            .find(|l| l.id == loan_id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        let state = next(loan.state).ok_or_else(|| {
            AppError::ConcurrencyConflict(format!(
                "Loan {} changed before it could be {}",
                loan_id, action
            ))
        })?;

        loan.state = state;
        loan.updated_at = Utc::now();
        Ok(loan.clone())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_book(&self, book: NewBook) -> CatalogEntry {
        let mut tables = self.inner.lock().await;
        tables.next_book_id += 1;
        let now = Utc::now();
        let entry = CatalogEntry {
            id: BookId(tables.next_book_id),
            owner_id: book.owner_id,
            title: book.title,
            author_name: book.author_name,
            isbn: book.isbn,
            shareable: book.shareable,
            archived: book.archived,
            created_at: now,
            updated_at: now,
        };
        tables.books.insert(entry.id, entry.clone());
        entry
    }

    /// Toggle the owner-controlled sharing flags of a book
    pub async fn set_sharing(
        &self,
        book_id: BookId,
        shareable: bool,
        archived: bool,
    ) -> AppResult<CatalogEntry> {
        let mut tables = self.inner.lock().await;
        let book = tables
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        book.shareable = shareable;
        book.archived = archived;
        book.updated_at = Utc::now();
        Ok(book.clone())
    }

    /// Snapshot of every loan record, oldest first
    pub async fn loans(&self) -> Vec<LoanRecord> {
        self.inner.lock().await.loans.clone()
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn find_by_id(&self, book_id: BookId) -> AppResult<Option<CatalogEntry>> {
        Ok(self.inner.lock().await.books.get(&book_id).cloned())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl LoanRepository for MemoryStore {
    async fn exists_open_loan(&self, book_id: BookId, borrower_id: UserId) -> AppResult<bool> {
        let tables = self.inner.lock().await;
        Ok(tables
            .loans
            .iter()
            .any(|l| l.book_id == book_id && l.borrower_id == borrower_id && l.state.is_open()))
    }

    async fn create_loan(&self, event: CreateLoan) -> AppResult<LoanRecord> {
        let mut tables = self.inner.lock().await;

        let duplicate = tables.loans.iter().any(|l| {
            l.book_id == event.book_id && l.borrower_id == event.borrower_id && l.state.is_open()
        });
        if duplicate {
            return Err(AppError::ConcurrencyConflict(format!(
                "Book {} already has an open loan for user {}",
                event.book_id, event.borrower_id
            )));
        }

        tables.next_loan_id += 1;
        let now = Utc::now();
        let loan = LoanRecord {
            id: LoanId(tables.next_loan_id),
            book_id: event.book_id,
            borrower_id: event.borrower_id,
            state: LoanState::Active,
            created_at: now,
            updated_at: now,
        };
        tables.loans.push(loan.clone());
        Ok(loan)
    }

    async fn find_open_loan_by_borrower(
        &self,
        book_id: BookId,
        borrower_id: UserId,
    ) -> AppResult<Option<LoanRecord>> {
        let tables = self.inner.lock().await;
        Ok(tables
            .loans
            .iter()
            .find(|l| {
                l.book_id == book_id && l.borrower_id == borrower_id && l.state == LoanState::Active
            })
            .cloned())
    }

    async fn find_pending_approval_by_owner(
        &self,
        book_id: BookId,
        owner_id: UserId,
    ) -> AppResult<Option<LoanRecord>> {
        let tables = self.inner.lock().await;
        if tables.owner_of(book_id) != Some(owner_id) {
            return Ok(None);
        }
        Ok(tables
            .loans
            .iter()
            .find(|l| l.book_id == book_id && l.state == LoanState::ReturnPending)
            .cloned())
    }

    async fn mark_returned(&self, loan_id: LoanId) -> AppResult<LoanRecord> {
        self.inner
            .lock()
            .await
            .transition(loan_id, LoanState::after_return, "returned")
    }

    async fn approve_return(&self, loan_id: LoanId) -> AppResult<LoanRecord> {
        self.inner
            .lock()
            .await
            .transition(loan_id, LoanState::after_approval, "approved")
    }

    async fn list_loans_of_borrower(
        &self,
        borrower_id: UserId,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanListing>, i64)> {
        let tables = self.inner.lock().await;
        tables.page_of(page, |l| l.borrower_id == borrower_id)
    }

    async fn list_pending_approvals_of_owner(
        &self,
        owner_id: UserId,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanListing>, i64)> {
        let tables = self.inner.lock().await;
        tables.page_of(page, |l| {
            l.state == LoanState::ReturnPending && tables.owner_of(l.book_id) == Some(owner_id)
        })
    }

    async fn list_loans_of_owner(
        &self,
        owner_id: UserId,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanListing>, i64)> {
        let tables = self.inner.lock().await;
        tables.page_of(page, |l| tables.owner_of(l.book_id) == Some(owner_id))
    }
}
