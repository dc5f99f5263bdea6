//! Data models for Bookshelf

pub mod book;
pub mod id;
pub mod loan;
pub mod page;
pub mod user;

// Re-export commonly used types
pub use book::{BookSummary, CatalogEntry};
pub use id::{BookId, LoanId, UserId};
pub use loan::{BorrowedBookResponse, LentBookResponse, LoanListing, LoanRecord, LoanState};
pub use page::{Page, PageQuery, PageRequest};
pub use user::{Actor, Role, UserClaims};
