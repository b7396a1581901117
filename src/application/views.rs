use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    FuelExpense, LeaveRequest, LeaveTemplate, PermitId, PermitState, PublicHoliday, Settings,
    StoredDocument, Vehicle, VehicleId, VehiclePermit, format_litres,
};

/// Shown wherever a reference can't be resolved or a value is undefined.
pub const PLACEHOLDER: &str = "-";

/// A permit joined with its vehicle, ready for display or printing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermitView {
    pub permit: VehiclePermit,
    pub state: PermitState,
    pub vehicle_label: String,
    /// Kilometres driven, or the placeholder while open or when readings are inconsistent
    pub distance_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuelExpenseView {
    pub expense: FuelExpense,
    pub permit_number_label: String,
    pub vehicle_label: String,
    pub liters_label: String,
}

/// Everything the leave form needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeavePrintout {
    pub request: StoredDocument<LeaveRequest>,
    pub duration_days: i64,
    pub template: LeaveTemplate,
    /// Holidays inside the leave window; listed only, not deducted
    pub holidays: Vec<PublicHoliday>,
    pub overlaps_ramadan: bool,
    pub settings: Settings,
}

fn vehicle_labels(vehicles: &[Vehicle]) -> HashMap<VehicleId, String> {
    vehicles
        .iter()
        .map(|v| (v.id, v.display_name()))
        .collect()
}

fn label_for(labels: &HashMap<VehicleId, String>, id: VehicleId) -> String {
    labels
        .get(&id)
        .cloned()
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

pub fn distance_label(permit: &VehiclePermit) -> String {
    permit
        .distance()
        .map(|km| km.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

pub fn permit_views(permits: &[VehiclePermit], vehicles: &[Vehicle]) -> Vec<PermitView> {
    let labels = vehicle_labels(vehicles);
    permits
        .iter()
        .map(|permit| PermitView {
            state: permit.state(),
            vehicle_label: label_for(&labels, permit.vehicle_id),
            distance_label: distance_label(permit),
            permit: permit.clone(),
        })
        .collect()
}

pub fn fuel_expense_views(
    expenses: &[FuelExpense],
    permits: &[VehiclePermit],
    vehicles: &[Vehicle],
) -> Vec<FuelExpenseView> {
    let labels = vehicle_labels(vehicles);
    let permit_numbers: HashMap<PermitId, i64> =
        permits.iter().map(|p| (p.id, p.permit_number)).collect();

    expenses
        .iter()
        .map(|expense| FuelExpenseView {
            permit_number_label: permit_numbers
                .get(&expense.permit_id)
                .map(|n| format!("#{}", n))
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            vehicle_label: label_for(&labels, expense.vehicle_id),
            liters_label: format_litres(expense.liters),
            expense: expense.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_reversed_permit_renders_placeholder_distance() {
        let vehicle = Vehicle::new("Pickup", "P-1");
        let mut permit = VehiclePermit::checkout("Ali", vehicle.id, "Delivery", Utc::now(), 500);
        permit.checkin(Utc::now(), 480);

        let views = permit_views(&[permit], &[vehicle]);
        assert_eq!(views[0].distance_label, "-");
        assert_eq!(views[0].vehicle_label, "Pickup (P-1)");
        assert_eq!(views[0].state, PermitState::Closed);
    }

    #[test]
    fn test_missing_vehicle_renders_placeholder() {
        let mut permit = VehiclePermit::checkout("Ali", Uuid::new_v4(), "Delivery", Utc::now(), 100);
        permit.checkin(Utc::now(), 160);

        let views = permit_views(&[permit], &[]);
        assert_eq!(views[0].vehicle_label, "-");
        assert_eq!(views[0].distance_label, "60");
    }

    #[test]
    fn test_fuel_expense_with_deleted_permit() {
        let vehicle = Vehicle::new("Sedan", "S-2");
        let expense = FuelExpense::new(Uuid::new_v4(), vehicle.id, Utc::now(), 20_500, 615, 9_000);

        let views = fuel_expense_views(&[expense], &[], &[vehicle]);
        assert_eq!(views[0].permit_number_label, "-");
        assert_eq!(views[0].vehicle_label, "Sedan (S-2)");
        assert_eq!(views[0].liters_label, "20.500");
    }
}
