//! # Repository Module
//!
//! Database repository implementations for Tienda POS.
//!
//! Each repository isolates the SQL for one aggregate. Methods that
//! participate in a multi-entity operation take a `&mut SqliteConnection`
//! so the settlement engine can scope them inside one transaction; plain
//! reads run against the pool.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product lookup and the stock ledger
//! - [`sale::SaleRepository`] - Sale and sale line operations
//! - [`payment::PaymentRepository`] - Payment rows and settlement queries
//! - [`checkout::CheckoutRepository`] - Standalone QR checkouts

pub mod checkout;
pub mod payment;
pub mod product;
pub mod sale;
