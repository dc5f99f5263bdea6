//! Business logic services

pub mod lending;
pub mod projections;

use crate::repository::Repository;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub lending: lending::LendingService,
    pub projections: projections::ProjectionService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository) -> Self {
        Self {
            lending: lending::LendingService::new(repository.clone()),
            projections: projections::ProjectionService::new(repository),
        }
    }
}
