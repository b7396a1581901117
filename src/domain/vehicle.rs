use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type VehicleId = Uuid;

/// A government vehicle that employees check out under a permit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Free-text category, e.g. "Pickup", "Sedan", "Minibus"
    pub vehicle_type: String,
    pub plate_number: String,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn new(vehicle_type: impl Into<String>, plate_number: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_type: vehicle_type.into(),
            plate_number: plate_number.into(),
            created_at: Utc::now(),
        }
    }

    /// Label used in reports and printouts.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.vehicle_type, self.plate_number)
    }
}
