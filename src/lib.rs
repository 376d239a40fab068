//! Turnstile: reshapes ticketing CSV exports into spreadsheet reports,
//! optionally enriched from a CRM directory.

pub mod aggregate;
pub mod config;
pub mod directory;
pub mod enrich;
pub mod error;
pub mod export;
pub mod reports;
pub mod segment;
pub mod table;

pub use crate::error::{AppError, Warning};
pub use crate::table::{Cell, Table};
