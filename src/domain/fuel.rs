use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, Kilometres, Millilitres, PermitId, VehicleId};

pub type FuelExpenseId = Uuid;

/// One refuelling event made under a permit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelExpense {
    pub id: FuelExpenseId,
    pub permit_id: PermitId,
    /// Copied from the permit at creation and never changed afterwards
    pub vehicle_id: VehicleId,
    pub date: DateTime<Utc>,
    pub liters: Millilitres,
    pub cost: Cents,
    /// Odometer reading at the pump
    pub odometer_reading: Kilometres,
    pub station_name: String,
    pub created_at: DateTime<Utc>,
}

impl FuelExpense {
    pub fn new(
        permit_id: PermitId,
        vehicle_id: VehicleId,
        date: DateTime<Utc>,
        liters: Millilitres,
        cost: Cents,
        odometer_reading: Kilometres,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            permit_id,
            vehicle_id,
            date,
            liters,
            cost,
            odometer_reading,
            station_name: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_station(mut self, station_name: impl Into<String>) -> Self {
        self.station_name = station_name.into();
        self
    }
}
