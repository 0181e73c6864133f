//! # ledger-db: Database Layer for the Warung Ledger
//!
//! SQLite persistence for the order-payment-inventory consistency
//! engine. This crate owns the ledger store (stock, movements, sales,
//! orders, payments, receivables, buyers) and exposes it through
//! repositories. The engine crate composes the transaction-scoped
//! primitives into one atomic unit of work per mutation.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations per aggregate
//!
//! ## Two Kinds of Method
//!
//! Repositories expose pool-level reads (`&self`, convenience queries)
//! and free-standing transaction primitives that take
//! `&mut SqliteConnection`. Anything that mutates ledger rows is a
//! transaction primitive, so it can only run inside a unit of work the
//! engine controls.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/ledger.db")).await?;
//! let stock = db.stock().level("loc-1", "prod-1").await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::buyer::BuyerRepository;
pub use repository::order::{OrderRepository, StatusChange};
pub use repository::payment::PaymentRepository;
pub use repository::product::ProductRepository;
pub use repository::receivable::ReceivableRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::{ReserveOutcome, StockDemand, StockRepository};
