//! In-memory directory for tests and offline runs.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use crate::directory::{DirectoryLookup, DirectoryRecord};
use crate::error::AppError;

/// A canned [`DirectoryLookup`] backed by a map. Identifiers registered with
/// [`FakeDirectory::fail`] return a directory error instead, to exercise the
/// partial-failure path.
#[derive(Debug, Default)]
pub struct FakeDirectory {
    records: HashMap<i64, Vec<DirectoryRecord>>,
    failing: HashSet<i64>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record under its own identifier.
    pub fn insert(&mut self, record: DirectoryRecord) {
        self.records.entry(record.identifier).or_default().push(record);
    }

    /// Makes lookups for `identifier` fail with a directory error.
    pub fn fail(&mut self, identifier: i64) {
        self.failing.insert(identifier);
    }
}

impl DirectoryLookup for FakeDirectory {
    fn lookup<'a>(
        &'a self,
        identifier: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DirectoryRecord>, AppError>> + Send + 'a>> {
        Box::pin(async move {
            if self.failing.contains(&identifier) {
                return Err(AppError::DirectoryError(format!(
                    "lookup for {} failed (simulated)",
                    identifier
                )));
            }
            Ok(self.records.get(&identifier).cloned().unwrap_or_default())
        })
    }
}
