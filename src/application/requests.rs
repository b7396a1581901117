//! Typed commands accepted by [`OfficeService`](super::OfficeService).
//!
//! Field-level rules are checked with `validator`; rules spanning several
//! fields or needing stored data are checked by the service.

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::domain::{Cents, Kilometres, Millilitres, PermitId, VehicleId};

#[derive(Debug, Clone, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, max = 50))]
    pub vehicle_type: String,

    #[validate(length(min = 1, max = 20))]
    pub plate_number: String,
}

#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 1, max = 50))]
    pub vehicle_type: Option<String>,

    #[validate(length(min = 1, max = 20))]
    pub plate_number: Option<String>,
}

/// Check a vehicle out to an employee.
#[derive(Debug, Clone, Validate)]
pub struct CreatePermitRequest {
    #[validate(length(min = 1, max = 100))]
    pub employee_name: String,

    pub vehicle_id: VehicleId,

    #[validate(length(min = 1, max = 500))]
    pub purpose: String,

    #[validate(length(max = 200))]
    pub destination: String,

    pub start_date: DateTime<Utc>,

    /// Defaults to the vehicle's last return reading
    #[validate(range(min = 0))]
    pub odometer_out: Option<Kilometres>,

    /// Check out even if the vehicle has an open permit
    pub force: bool,
}

#[derive(Debug, Clone, Validate)]
pub struct CheckinPermitRequest {
    pub end_date: DateTime<Utc>,

    #[validate(range(min = 0))]
    pub odometer_in: Kilometres,
}

/// Administrative edit. `None` leaves a field unchanged; the permit number
/// cannot be edited.
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdatePermitRequest {
    #[validate(length(min = 1, max = 100))]
    pub employee_name: Option<String>,

    pub vehicle_id: Option<VehicleId>,

    #[validate(length(min = 1, max = 500))]
    pub purpose: Option<String>,

    #[validate(length(max = 200))]
    pub destination: Option<String>,

    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,

    #[validate(range(min = 0))]
    pub odometer_out: Option<Kilometres>,

    #[validate(range(min = 0))]
    pub odometer_in: Option<Kilometres>,
}

#[derive(Debug, Clone, Validate)]
pub struct CreateFuelExpenseRequest {
    pub permit_id: PermitId,

    pub date: DateTime<Utc>,

    #[validate(range(min = 1))]
    pub liters: Millilitres,

    #[validate(range(min = 0))]
    pub cost: Cents,

    #[validate(range(min = 0))]
    pub odometer_reading: Kilometres,

    #[validate(length(max = 100))]
    pub station_name: String,
}

/// Edit a fuel expense. Its permit and vehicle stay as recorded.
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateFuelExpenseRequest {
    pub date: Option<DateTime<Utc>>,

    #[validate(range(min = 1))]
    pub liters: Option<Millilitres>,

    #[validate(range(min = 0))]
    pub cost: Option<Cents>,

    #[validate(range(min = 0))]
    pub odometer_reading: Option<Kilometres>,

    #[validate(length(max = 100))]
    pub station_name: Option<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct SubmitLeaveRequest {
    /// Filing on someone else's behalf requires ManageRecords; defaults to the actor
    #[validate(length(min = 1, max = 100))]
    pub employee_name: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub leave_type: String,

    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,

    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}
