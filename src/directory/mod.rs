//! Directory (CRM) lookup capability.
//!
//! Cross-referencing resolves a ticketing identifier to zero or more contact
//! records held in the club's CRM. The capability is a trait so the pipeline
//! can run against the real HTTP-backed client ([`DirectoryClient`]) or an
//! in-memory fake in tests.

pub mod client;
pub mod fake;

use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use client::{DirectoryClient, DirectoryCredentials};
pub use fake::FakeDirectory;

/// One contact record returned by the directory for an identifier.
///
/// Zero, one, or many records may exist per identifier; absence simply means
/// "no matching data". A record with no consent flag is unusable for
/// marketing-oriented reports and is dropped downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// The identifier the record was looked up by.
    pub identifier: i64,
    /// Contact display name.
    pub name: String,
    /// Owning account name, when the contact belongs to one.
    pub account: Option<String>,
    /// Marketing-consent flag; `None` when the CRM holds no answer.
    pub consent: Option<bool>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birthdate: Option<NaiveDate>,
}

/// Boxed-future lookup capability, object safe so reports can take
/// `&dyn DirectoryLookup`.
pub trait DirectoryLookup: Send + Sync {
    /// Returns all directory records for `identifier`, possibly none.
    ///
    /// Failures are per-identifier: callers treat a non-fatal [`AppError`]
    /// as a warning and continue with the remaining identifiers.
    fn lookup<'a>(
        &'a self,
        identifier: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DirectoryRecord>, AppError>> + Send + 'a>>;
}
