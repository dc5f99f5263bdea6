//! Catalog entry (book) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::id::{BookId, UserId};

/// A book as seen by the lending engine.
///
/// Catalog management owns these rows; lending only ever reads them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CatalogEntry {
    pub id: BookId,
    pub owner_id: UserId,
    pub title: String,
    pub author_name: String,
    pub isbn: String,
    pub shareable: bool,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    /// Archived or non-shareable books never take part in lending
    pub fn is_lendable(&self) -> bool {
        self.shareable && !self.archived
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    pub fn summary(&self) -> BookSummary {
        BookSummary {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title.clone(),
            author_name: self.author_name.clone(),
            isbn: self.isbn.clone(),
        }
    }
}

/// Denormalised book fields carried by lending projections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub id: BookId,
    pub owner_id: UserId,
    pub title: String,
    pub author_name: String,
    pub isbn: String,
}
