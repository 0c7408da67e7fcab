//! Business logic services

pub mod access;
pub mod cart;
pub mod catalog;
pub mod circulation;
pub mod clock;
pub mod fines;
pub mod reports;
pub mod users;

use std::sync::Arc;

use crate::{
    config::CirculationConfig,
    repository::{CartStore, Catalog, LoanStore, Repository, UserDirectory},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub cart: cart::CartService,
    pub circulation: circulation::CirculationService,
    pub reports: reports::ReportsService,
}

impl Services {
    /// Create all services over the PostgreSQL repository
    pub fn new(repository: Repository, settings: CirculationConfig, clock: Arc<dyn clock::Clock>) -> Self {
        let users: Arc<dyn UserDirectory> = Arc::new(repository.users.clone());
        let books: Arc<dyn Catalog> = Arc::new(repository.books.clone());
        let carts: Arc<dyn CartStore> = Arc::new(repository.carts.clone());
        let loans: Arc<dyn LoanStore> = Arc::new(repository.loans.clone());

        let circulation = circulation::CirculationService::new(
            users.clone(),
            books.clone(),
            loans,
            clock.clone(),
            settings,
        );

        Self {
            catalog: catalog::CatalogService::new(users.clone(), books.clone()),
            users: users::UsersService::new(users.clone()),
            cart: cart::CartService::new(users.clone(), books, carts, circulation.clone(), clock.clone()),
            circulation,
            reports: reports::ReportsService::new(users, repository.reports, clock),
        }
    }
}
