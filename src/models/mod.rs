//! Data models for Perpustakaan

pub mod book;
pub mod cart;
pub mod enums;
pub mod loan;
pub mod policy;
pub mod report;
pub mod user;

// Re-export commonly used types
pub use book::{Book, StockMovement};
pub use cart::{CartEntry, CartItem, CheckoutSummary};
pub use enums::{FineKind, LoanStatus, ReturnCondition, Role, StockReason};
pub use loan::{Fine, Loan, LoanDetails, LoanTransition, NewLoan, ReturnRecord};
pub use policy::Operation;
pub use user::{Principal, User};
