//! Shared fixtures for the integration tests

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use tokio::sync::Barrier;

use bookshelf_server::{
    api::{self, rate_limit::RateLimiter},
    config::AppConfig,
    error::AppResult,
    models::{
        book::CatalogEntry,
        id::{BookId, LoanId, UserId},
        loan::{CreateLoan, LoanListing, LoanRecord},
        page::PageRequest,
        user::{Role, UserClaims},
    },
    repository::{
        memory::{MemoryStore, NewBook},
        LoanRepository, Repository,
    },
    services::Services,
    AppState,
};

pub const OWNER: UserId = UserId(1);
pub const ALICE: UserId = UserId(2);
pub const BOB: UserId = UserId(3);

/// In-memory store plus the services running on top of it
pub struct Library {
    pub store: MemoryStore,
    pub services: Services,
}

impl Library {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let services = Services::new(Repository::in_memory(store.clone()));
        Self { store, services }
    }

    pub async fn shared_book(&self, owner: UserId, title: &str) -> CatalogEntry {
        self.store.insert_book(NewBook::shared(owner, title)).await
    }
}

/// Router over a fresh in-memory store
pub fn app(store: &MemoryStore, limiter: Option<RateLimiter>) -> Router {
    let state = AppState {
        config: Arc::new(AppConfig::default()),
        services: Arc::new(Services::new(Repository::in_memory(store.clone()))),
    };
    api::create_router(state, limiter)
}

/// Bearer token accepted by a router built with the default configuration
pub fn token_for(user_id: UserId, roles: Vec<Role>) -> String {
    let now = Utc::now().timestamp();
    UserClaims {
        sub: format!("user-{}", user_id),
        user_id,
        roles,
        exp: now + 3600,
        iat: now,
    }
    .create_token(&AppConfig::default().auth.jwt_secret)
    .expect("token should encode")
}

pub fn member_token(user_id: UserId) -> String {
    token_for(user_id, vec![Role::Member])
}

/// Loan repository whose first two guard lookups meet at a barrier.
///
/// Both callers read the store before either of them writes, which is the
/// interleaving a guard-then-write race needs.
pub struct GatedLoans {
    inner: MemoryStore,
    barrier: Barrier,
    lookups: AtomicUsize,
}

impl GatedLoans {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            barrier: Barrier::new(2),
            lookups: AtomicUsize::new(0),
        }
    }

    async fn gate(&self) {
        if self.lookups.fetch_add(1, Ordering::SeqCst) < 2 {
            self.barrier.wait().await;
        }
    }
}

#[async_trait]
impl LoanRepository for GatedLoans {
    async fn exists_open_loan(&self, book_id: BookId, borrower_id: UserId) -> AppResult<bool> {
        let exists = self.inner.exists_open_loan(book_id, borrower_id).await;
        self.gate().await;
        exists
    }

    async fn create_loan(&self, event: CreateLoan) -> AppResult<LoanRecord> {
        self.inner.create_loan(event).await
    }

    async fn find_open_loan_by_borrower(
        &self,
        book_id: BookId,
        borrower_id: UserId,
    ) -> AppResult<Option<LoanRecord>> {
        let loan = self.inner.find_open_loan_by_borrower(book_id, borrower_id).await;
        self.gate().await;
        loan
    }

    async fn find_pending_approval_by_owner(
        &self,
        book_id: BookId,
        owner_id: UserId,
    ) -> AppResult<Option<LoanRecord>> {
        let loan = self.inner.find_pending_approval_by_owner(book_id, owner_id).await;
        self.gate().await;
        loan
    }

    async fn mark_returned(&self, loan_id: LoanId) -> AppResult<LoanRecord> {
        self.inner.mark_returned(loan_id).await
    }

    async fn approve_return(&self, loan_id: LoanId) -> AppResult<LoanRecord> {
        self.inner.approve_return(loan_id).await
    }

    async fn list_loans_of_borrower(
        &self,
        borrower_id: UserId,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanListing>, i64)> {
        self.inner.list_loans_of_borrower(borrower_id, page).await
    }

    async fn list_pending_approvals_of_owner(
        &self,
        owner_id: UserId,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanListing>, i64)> {
        self.inner.list_pending_approvals_of_owner(owner_id, page).await
    }

    async fn list_loans_of_owner(
        &self,
        owner_id: UserId,
        page: PageRequest,
    ) -> AppResult<(Vec<LoanListing>, i64)> {
        self.inner.list_loans_of_owner(owner_id, page).await
    }
}

/// Services whose loan lookups race through `GatedLoans`
pub fn gated_services(store: &MemoryStore) -> Services {
    Services::new(Repository::from_parts(
        Arc::new(store.clone()),
        Arc::new(GatedLoans::new(store.clone())),
    ))
}
