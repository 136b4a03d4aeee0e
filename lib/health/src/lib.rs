//! Health data for the vitals coach.
//!
//! This crate provides:
//!
//! - **Quantities**: Measurement types, units and correlated records
//! - **Provider**: The port through which health data is read
//! - **Store**: An in-memory provider, loadable from a JSON export
//! - **Blood Pressure Tool**: The conversation tool exposing the latest reading

pub mod blood_pressure;
pub mod error;
pub mod provider;
pub mod quantity;
pub mod store;

pub use blood_pressure::BloodPressureTool;
pub use error::HealthError;
pub use provider::HealthDataProvider;
pub use quantity::{
    CorrelatedRecord, CorrelationType, PressureUnit, Quantity, QuantitySample, QuantityType,
};
pub use store::InMemoryHealthStore;
