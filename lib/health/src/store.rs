//! In-memory health data provider.

use crate::error::HealthError;
use crate::provider::HealthDataProvider;
use crate::quantity::{CorrelatedRecord, CorrelationType, QuantityType};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, instrument};

/// Health records held in memory.
///
/// Loaded from a JSON export (an array of correlated records) or built up
/// with [`InMemoryHealthStore::insert`].
#[derive(Debug, Default)]
pub struct InMemoryHealthStore {
    records: RwLock<Vec<CorrelatedRecord>>,
    denial: Option<String>,
    authorization_requests: AtomicUsize,
}

impl InMemoryHealthStore {
    /// Creates an empty store that grants every authorization request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `records`.
    #[must_use]
    pub fn with_records(records: Vec<CorrelatedRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    /// Loads records from a JSON export file.
    pub fn from_json_file(path: impl AsRef<Path>) -> vitals_core::Result<Self, HealthError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| HealthError::ExportUnreadable {
                path: path.display().to_string(),
                details: e.to_string(),
            })?;
        let records: Vec<CorrelatedRecord> =
            serde_json::from_str(&contents).map_err(|e| HealthError::ExportInvalid {
                path: path.display().to_string(),
                details: e.to_string(),
            })?;
        debug!(path = %path.display(), records = records.len(), "loaded health export");
        Ok(Self::with_records(records))
    }

    /// Makes every authorization request fail with `reason`.
    #[must_use]
    pub fn deny_authorization(mut self, reason: impl Into<String>) -> Self {
        self.denial = Some(reason.into());
        self
    }

    /// Adds a record.
    pub fn insert(&self, record: CorrelatedRecord) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how many times authorization was requested.
    #[must_use]
    pub fn authorization_requests(&self) -> usize {
        self.authorization_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthDataProvider for InMemoryHealthStore {
    #[instrument(skip(self, read))]
    async fn request_authorization(&self, read: &[QuantityType]) -> Result<(), HealthError> {
        self.authorization_requests.fetch_add(1, Ordering::SeqCst);
        debug!(types = read.len(), denied = self.denial.is_some(), "authorization requested");
        match &self.denial {
            Some(reason) => Err(HealthError::AuthorizationDenied {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn query_latest_correlated(
        &self,
        correlation: CorrelationType,
    ) -> Result<CorrelatedRecord, HealthError> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.correlation_type == correlation)
            .max_by_key(|r| r.recorded_at)
            .cloned()
            .ok_or_else(|| HealthError::NotFound {
                kind: correlation.to_string(),
            })
    }
}
