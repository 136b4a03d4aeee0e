//! Health measurement types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A kind of single-valued measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityType {
    BloodPressureSystolic,
    BloodPressureDiastolic,
}

impl fmt::Display for QuantityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BloodPressureSystolic => write!(f, "blood_pressure_systolic"),
            Self::BloodPressureDiastolic => write!(f, "blood_pressure_diastolic"),
        }
    }
}

/// A kind of record grouping measurements taken together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationType {
    BloodPressure,
}

impl CorrelationType {
    /// Returns the quantity types a record of this kind holds.
    #[must_use]
    pub fn members(&self) -> &'static [QuantityType] {
        match self {
            Self::BloodPressure => &[
                QuantityType::BloodPressureSystolic,
                QuantityType::BloodPressureDiastolic,
            ],
        }
    }
}

impl fmt::Display for CorrelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BloodPressure => write!(f, "blood_pressure"),
        }
    }
}

/// Unit of pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PressureUnit {
    #[serde(rename = "mmHg")]
    MillimeterOfMercury,
    #[serde(rename = "kPa")]
    Kilopascal,
    #[serde(rename = "cmH2O")]
    CentimeterOfWater,
    #[serde(rename = "inHg")]
    InchOfMercury,
}

impl PressureUnit {
    /// Millimetres of mercury per one of this unit.
    fn mmhg_factor(self) -> f64 {
        match self {
            Self::MillimeterOfMercury => 1.0,
            Self::Kilopascal => 7.500_615_75,
            Self::CentimeterOfWater => 0.735_559_1,
            Self::InchOfMercury => 25.4,
        }
    }
}

/// A measured value with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: PressureUnit,
}

impl Quantity {
    #[must_use]
    pub fn new(value: f64, unit: PressureUnit) -> Self {
        Self { value, unit }
    }

    #[must_use]
    pub fn mmhg(value: f64) -> Self {
        Self::new(value, PressureUnit::MillimeterOfMercury)
    }

    /// Returns the value converted to `unit`.
    #[must_use]
    pub fn value_in(&self, unit: PressureUnit) -> f64 {
        if self.unit == unit {
            return self.value;
        }
        self.value * self.unit.mmhg_factor() / unit.mmhg_factor()
    }
}

/// One measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitySample {
    pub quantity_type: QuantityType,
    pub quantity: Quantity,
}

/// Measurements recorded together, such as one blood pressure reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedRecord {
    pub correlation_type: CorrelationType,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub samples: Vec<QuantitySample>,
}

impl CorrelatedRecord {
    /// Creates a blood pressure record from millimetre-of-mercury values.
    #[must_use]
    pub fn blood_pressure(recorded_at: DateTime<Utc>, systolic: f64, diastolic: f64) -> Self {
        Self {
            correlation_type: CorrelationType::BloodPressure,
            recorded_at,
            samples: vec![
                QuantitySample {
                    quantity_type: QuantityType::BloodPressureSystolic,
                    quantity: Quantity::mmhg(systolic),
                },
                QuantitySample {
                    quantity_type: QuantityType::BloodPressureDiastolic,
                    quantity: Quantity::mmhg(diastolic),
                },
            ],
        }
    }

    /// Returns the first sample of the given type.
    #[must_use]
    pub fn first(&self, quantity_type: QuantityType) -> Option<&QuantitySample> {
        self.samples
            .iter()
            .find(|s| s.quantity_type == quantity_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_pressure_units() {
        let kpa = Quantity::new(16.0, PressureUnit::Kilopascal);
        assert!((kpa.value_in(PressureUnit::MillimeterOfMercury) - 120.01).abs() < 0.01);

        let inhg = Quantity::new(5.0, PressureUnit::InchOfMercury);
        assert!((inhg.value_in(PressureUnit::MillimeterOfMercury) - 127.0).abs() < 1e-9);

        let mmhg = Quantity::mmhg(120.0);
        assert!((mmhg.value_in(PressureUnit::Kilopascal) - 16.0).abs() < 0.01);
        assert_eq!(mmhg.value_in(PressureUnit::MillimeterOfMercury), 120.0);
    }

    #[test]
    fn first_finds_sample_by_type() {
        let record = CorrelatedRecord::blood_pressure(Utc::now(), 128.0, 82.0);
        let systolic = record
            .first(QuantityType::BloodPressureSystolic)
            .expect("systolic");
        assert_eq!(systolic.quantity.value, 128.0);
        assert_eq!(
            CorrelationType::BloodPressure.members(),
            &[
                QuantityType::BloodPressureSystolic,
                QuantityType::BloodPressureDiastolic
            ]
        );
    }

    #[test]
    fn units_use_conventional_symbols() {
        let json = serde_json::to_value(Quantity::new(4.8, PressureUnit::InchOfMercury))
            .expect("serialize");
        assert_eq!(json["unit"], "inHg");
        let quantity: Quantity =
            serde_json::from_str(r#"{"value": 100.0, "unit": "cmH2O"}"#).expect("deserialize");
        assert_eq!(quantity.unit, PressureUnit::CentimeterOfWater);
    }
}
