//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, cart, health, loans, reports, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Perpustakaan API",
        version = "1.0.0",
        description = "School library circulation REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::list_stock_movements,
        // Users
        users::me,
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::set_active,
        users::delete_user,
        // Cart
        cart::list_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::checkout,
        // Loans
        loans::list_loans,
        loans::create_loan,
        loans::self_borrow,
        loans::my_loans,
        loans::due_soon,
        loans::overdue_loans,
        loans::get_loan,
        loans::return_loan,
        loans::self_return,
        loans::confirm_return,
        loans::rate_loan,
        // Reports
        reports::summary,
        reports::most_borrowed,
        reports::late_students,
        reports::top_rated,
        reports::loans_per_period,
    ),
    components(
        schemas(
            // Enums
            crate::models::enums::Role,
            crate::models::enums::LoanStatus,
            crate::models::enums::ReturnCondition,
            crate::models::enums::FineKind,
            crate::models::enums::StockReason,
            // Books
            crate::models::book::Book,
            crate::models::book::BookQuery,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::StockMovement,
            // Users
            crate::models::user::User,
            crate::models::user::UserQuery,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::user::UpdateActive,
            // Cart
            crate::models::cart::CartEntry,
            crate::models::cart::CartItem,
            crate::models::cart::AddToCart,
            crate::models::cart::CheckoutSummary,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanQuery,
            crate::models::loan::LoanPage,
            crate::models::loan::LoanSortField,
            crate::models::loan::SortDirection,
            crate::models::loan::OverdueLoan,
            crate::models::loan::CreateManualLoan,
            crate::models::loan::SelfBorrowRequest,
            crate::models::loan::ReturnLoanRequest,
            crate::models::loan::ConfirmReturnRequest,
            crate::models::loan::RateLoanRequest,
            // Reports
            crate::models::report::Interval,
            crate::models::report::ReportPeriod,
            crate::models::report::LoanTrendQuery,
            crate::models::report::SummaryReport,
            crate::models::report::TitleCount,
            crate::models::report::LateStudent,
            crate::models::report::TitleRating,
            crate::models::report::PeriodCount,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "users", description = "Student and staff accounts"),
        (name = "cart", description = "Student cart and checkout"),
        (name = "loans", description = "Loan lifecycle"),
        (name = "reports", description = "Circulation reports")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by handler annotations
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
