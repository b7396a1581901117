use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, FuelExpense, FuelExpenseId, Kilometres, Millilitres, VehicleId, VehiclePermit};

/// Default odometer value for a new permit on `vehicle_id`: the return reading
/// of the most recently closed permit (latest `end_date`), or 0.
pub fn resolve_opening_odometer(vehicle_id: VehicleId, permits: &[VehiclePermit]) -> Kilometres {
    resolve_opening_odometer_or(vehicle_id, permits, 0)
}

/// Same as [`resolve_opening_odometer`] but falls back to `default` when the
/// vehicle has no closed permit.
pub fn resolve_opening_odometer_or(
    vehicle_id: VehicleId,
    permits: &[VehiclePermit],
    default: Kilometres,
) -> Kilometres {
    permits
        .iter()
        .filter(|p| p.vehicle_id == vehicle_id)
        .filter_map(|p| match (p.end_date, p.odometer_in) {
            (Some(end_date), Some(odometer_in)) => Some((end_date, odometer_in)),
            _ => None,
        })
        .max_by_key(|(end_date, _)| *end_date)
        .map(|(_, odometer_in)| odometer_in)
        .unwrap_or(default)
        .max(0)
}

/// Distance between two consecutive fuel events of the same vehicle,
/// attributed to the later event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceSegment {
    /// The later expense of the pair
    pub expense_id: FuelExpenseId,
    pub date: DateTime<Utc>,
    pub previous_reading: Kilometres,
    pub current_reading: Kilometres,
    /// Never negative; 0 when the reading did not advance
    pub distance: Kilometres,
    pub liters: Millilitres,
    pub cost: Cents,
}

impl DistanceSegment {
    /// Only positive segments take part in consumption math.
    pub fn is_positive(&self) -> bool {
        self.distance > 0
    }
}

/// Walk the odometer chain of one vehicle.
///
/// Expenses are ordered by odometer reading rather than by date, so refuelling
/// events entered out of order still produce a sane chain. The first expense
/// has no predecessor and yields no segment.
pub fn compute_distance_segments(
    vehicle_id: VehicleId,
    expenses: &[FuelExpense],
) -> Vec<DistanceSegment> {
    let mut chain: Vec<&FuelExpense> = expenses
        .iter()
        .filter(|e| e.vehicle_id == vehicle_id)
        .collect();
    chain.sort_by_key(|e| e.odometer_reading);

    chain
        .windows(2)
        .map(|pair| {
            let (prev, current) = (pair[0], pair[1]);
            DistanceSegment {
                expense_id: current.id,
                date: current.date,
                previous_reading: prev.odometer_reading,
                current_reading: current.odometer_reading,
                distance: (current.odometer_reading - prev.odometer_reading).max(0),
                liters: current.liters,
                cost: current.cost,
            }
        })
        .collect()
}
