//! Blood pressure tool.
//!
//! Exposes the most recent blood pressure reading to the model as
//! `{"systolic": <int>, "diastolic": <int>}` in millimetres of mercury.

use crate::error::HealthError;
use crate::provider::HealthDataProvider;
use crate::quantity::{CorrelationType, PressureUnit, QuantityType};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, instrument};
use vitals_conversation::{Tool, ToolDefinition, ToolError, ToolPayload};

const NAME: &str = "blood_pressure";
const DESCRIPTION: &str =
    "Get the latest blood pressure (systolic and diastolic) from the health store.";
const MISSING_DATA: &str = "Missing blood pressure data";

/// Reads the latest blood pressure reading from a health data provider.
#[derive(Clone)]
pub struct BloodPressureTool {
    provider: Arc<dyn HealthDataProvider>,
}

impl BloodPressureTool {
    #[must_use]
    pub fn new(provider: Arc<dyn HealthDataProvider>) -> Self {
        Self { provider }
    }

    async fn latest_reading(&self) -> Result<(f64, f64), ToolError> {
        self.provider
            .request_authorization(CorrelationType::BloodPressure.members())
            .await
            .map_err(into_tool_error)?;

        let record = self
            .provider
            .query_latest_correlated(CorrelationType::BloodPressure)
            .await
            .map_err(into_tool_error)?;

        let systolic = record.first(QuantityType::BloodPressureSystolic);
        let diastolic = record.first(QuantityType::BloodPressureDiastolic);
        match (systolic, diastolic) {
            (Some(systolic), Some(diastolic)) => Ok((
                systolic.quantity.value_in(PressureUnit::MillimeterOfMercury),
                diastolic.quantity.value_in(PressureUnit::MillimeterOfMercury),
            )),
            _ => Err(missing_data()),
        }
    }
}

#[async_trait]
impl Tool for BloodPressureTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(NAME, DESCRIPTION)
    }

    #[instrument(skip(self, _arguments))]
    async fn call(&self, _arguments: JsonValue) -> Result<ToolPayload, ToolError> {
        let (systolic, diastolic) = self.latest_reading().await?;
        // Whole millimetres, truncated.
        let systolic = systolic.trunc() as i64;
        let diastolic = diastolic.trunc() as i64;
        debug!(systolic, diastolic, "read latest blood pressure");

        let mut payload = ToolPayload::new();
        payload.insert("systolic".to_string(), systolic.into());
        payload.insert("diastolic".to_string(), diastolic.into());
        Ok(payload)
    }
}

fn missing_data() -> ToolError {
    ToolError::MissingData {
        description: MISSING_DATA.to_string(),
    }
}

fn into_tool_error(err: HealthError) -> ToolError {
    match err {
        HealthError::NotFound { .. } => missing_data(),
        HealthError::AuthorizationDenied { reason } => ToolError::AuthorizationDenied { reason },
        other => ToolError::ExecutionFailed {
            reason: other.to_string(),
        },
    }
}
