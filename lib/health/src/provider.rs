//! Health data provider port.

use crate::error::HealthError;
use crate::quantity::{CorrelatedRecord, CorrelationType, QuantityType};
use async_trait::async_trait;

/// Source of health measurements.
///
/// Implementations may prompt the user for consent in
/// `request_authorization`; callers must request access to every type they
/// intend to read before querying.
#[async_trait]
pub trait HealthDataProvider: Send + Sync {
    /// Requests read access to the given quantity types.
    ///
    /// # Errors
    ///
    /// Returns `HealthError::AuthorizationDenied` if access was refused.
    async fn request_authorization(&self, read: &[QuantityType]) -> Result<(), HealthError>;

    /// Returns the most recent correlated record of the given type.
    ///
    /// # Errors
    ///
    /// Returns `HealthError::NotFound` if there is none.
    async fn query_latest_correlated(
        &self,
        correlation: CorrelationType,
    ) -> Result<CorrelatedRecord, HealthError>;
}
