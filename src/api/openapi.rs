//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, lending};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookshelf API",
        version = "1.0.0",
        description = "Peer-to-peer book lending REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Transitions
        lending::borrow_book,
        lending::return_book,
        lending::approve_return,
        // Projections
        lending::borrowed_books,
        lending::pending_approvals,
        lending::lent_books,
    ),
    components(
        schemas(
            lending::LoanResponse,
            crate::models::loan::LoanState,
            crate::models::loan::BorrowedBookResponse,
            crate::models::loan::LentBookResponse,
            crate::models::page::BorrowedBooksPage,
            crate::models::page::LentBooksPage,
            crate::models::id::BookId,
            crate::models::id::UserId,
            crate::models::id::LoanId,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "lending", description = "Borrowing, returning and approving returns")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
