//! # ledger-core: Pure Business Logic for the Warung Ledger
//!
//! This crate is the heart of the order-payment-inventory consistency
//! engine. It contains all business rules as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Storefront / Admin / POS surfaces (external collaborators)         │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ledger-engine  — create_sale, transition,                          │
//! │                   create_payment_intent, apply_payment_result       │
//! │       │                                                             │
//! │       ├──────────► ledger-core (THIS CRATE)                         │
//! │       │            money • types • status machine • errors          │
//! │       │            NO I/O • NO DATABASE • PURE FUNCTIONS            │
//! │       ▼                                                             │
//! │  ledger-db      — SQLite schema, repositories, migrations           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Buyer, Product, Sale, Order, Payment, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`status`] - Order status state machine and authority guards
//! - [`invoice`] - Deterministic daily invoice numbering
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, always
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are i64 minor units
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

pub mod error;
pub mod invoice;
pub mod money;
pub mod status;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use status::{validate_transition, Actor, ActorRole};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single line item.
///
/// Prevents accidental over-ordering (e.g. typing 10000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Maximum line items in a single sale or order.
pub const MAX_LINE_ITEMS: usize = 200;
