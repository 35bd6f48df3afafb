//! # tienda-db: Database Layer for Tienda POS
//!
//! SQLite persistence for the settlement workflow, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  tienda-settlement                                                  │
//! │       │  begin() ── explicit transactions around multi-step ops     │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                  tienda-db (THIS CRATE)                       │  │
//! │  │                                                               │  │
//! │  │  Database (pool.rs)   Repositories        Migrations          │  │
//! │  │  SqlitePool, WAL      product / sale /    001_initial_…       │  │
//! │  │  foreign keys on      payment / checkout  (embedded)          │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database file (or :memory: in tests)                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Convention
//!
//! Repository methods that are part of a multi-entity operation take a
//! `&mut SqliteConnection` so the caller decides the transaction scope:
//! everything commits together or nothing does. Plain reads and
//! single-statement updates run directly against the pool.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::checkout::CheckoutRepository;
pub use repository::payment::PaymentRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
