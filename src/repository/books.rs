//! Catalog lookups for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::CatalogRepository;
use crate::{
    error::AppResult,
    models::{book::CatalogEntry, id::BookId},
};

#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: Pool<Postgres>,
}

impl PgCatalogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn find_by_id(&self, book_id: BookId) -> AppResult<Option<CatalogEntry>> {
        let book = sqlx::query_as::<_, CatalogEntry>(
            r#"
            SELECT id, owner_id, title, author_name, isbn, shareable, archived,
                   created_at, updated_at
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
