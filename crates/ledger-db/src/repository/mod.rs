//! # Repository Module
//!
//! Repository implementations for the ledger store, one per aggregate.
//!
//! ## Two Kinds of Method
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Pool-level reads                Transaction primitives             │
//! │  ─────────────────               ──────────────────────             │
//! │  repo.get_by_id(id)              module::insert(conn, &row)         │
//! │  repo.level(loc, prod)           module::reserve(conn, ...)         │
//! │                                                                     │
//! │  &self + SqlitePool              &mut SqliteConnection              │
//! │  convenience queries             composed by ledger-engine into     │
//! │                                  ONE transaction per mutation       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations of ledger rows only exist as transaction primitives, so a
//! caller cannot decrement stock without also being inside a unit of
//! work that writes the movement row.

pub mod buyer;
pub mod order;
pub mod payment;
pub mod product;
pub mod receivable;
pub mod sale;
pub mod stock;

use uuid::Uuid;

/// Generates a new row id (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
