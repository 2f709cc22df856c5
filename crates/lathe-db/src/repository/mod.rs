//! # Repository Module
//!
//! Database repository implementations for Lathe.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.calculations().save_and_apply(&new, expected_version)      │
//! │       ▼                                                                 │
//! │  CalculationRepository                                                 │
//! │  ├── save / save_and_apply                                             │
//! │  ├── find_for_key                                                      │
//! │  └── latest_for_quote                                                  │
//! │       │                                                                 │
//! │       │  SQL (one transaction per write)                               │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Writes that touch several tables share `pub(crate)` helpers taking    │
//! │  `&mut SqliteConnection`, so they compose inside one transaction.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`QuoteRepository`] - Quotes and lifecycle status
//! - [`PartRepository`] - Manufactured parts on a quote
//! - [`LineItemRepository`] - Billable rows; every write recomputes the total
//! - [`CalculationRepository`] - Current calculation per part

pub mod calculation;
pub mod line_item;
pub mod part;
pub mod quote;

pub use calculation::{CalculationRepository, SavedCalculation};
pub use line_item::{LineItemChange, LineItemRepository, LineItemUpdate, NewLineItem};
pub use part::PartRepository;
pub use quote::QuoteRepository;
