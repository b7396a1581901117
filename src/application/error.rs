use thiserror::Error;

use crate::domain::{Action, Kilometres, Role};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),

    #[error("Vehicle already registered: {0}")]
    VehicleAlreadyExists(String),

    #[error("Vehicle {plate_number} is still out under permit #{permit_number}")]
    VehicleInUse {
        plate_number: String,
        permit_number: i64,
    },

    #[error("Permit not found: {0}")]
    PermitNotFound(String),

    #[error("Permit #{permit_number} is already closed (odometer in: {odometer_in})")]
    PermitAlreadyClosed {
        permit_number: i64,
        odometer_in: Kilometres,
    },

    #[error("Fuel expense not found: {0}")]
    FuelExpenseNotFound(String),

    #[error("{kind} not found: {id}")]
    RecordNotFound { kind: &'static str, id: String },

    #[error("Leave request {id} was already {status}")]
    LeaveAlreadyDecided { id: String, status: String },

    #[error("Role '{role}' is not allowed to {action}")]
    Forbidden { role: Role, action: Action },

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid month: {0}")]
    InvalidMonth(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
