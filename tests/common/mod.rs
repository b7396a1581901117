// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use maktab::application::{
    CheckinPermitRequest, CreateFuelExpenseRequest, CreatePermitRequest, CreateVehicleRequest,
    OfficeService,
};
use maktab::domain::{Actor, FuelExpense, Role, Vehicle, VehiclePermit};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(OfficeService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = OfficeService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

pub fn admin() -> Actor {
    Actor::admin("Admin")
}

pub fn head() -> Actor {
    Actor::new("Huda", Role::HeadOfDepartment)
}

pub fn employee(name: &str) -> Actor {
    Actor::employee(name)
}

/// Test fixture: vehicles and trips recorded through the service
pub struct Fleet;

impl Fleet {
    pub async fn vehicle(service: &OfficeService, plate: &str) -> Result<Vehicle> {
        Ok(service
            .create_vehicle(
                &admin(),
                CreateVehicleRequest {
                    vehicle_type: "Pickup".into(),
                    plate_number: plate.into(),
                },
            )
            .await?)
    }

    /// Check a vehicle out, letting the service pick the opening odometer
    pub async fn checkout(
        service: &OfficeService,
        vehicle: &Vehicle,
        employee: &str,
        date: &str,
    ) -> Result<VehiclePermit> {
        Self::checkout_at(service, vehicle, employee, date, None).await
    }

    pub async fn checkout_at(
        service: &OfficeService,
        vehicle: &Vehicle,
        employee: &str,
        date: &str,
        odometer_out: Option<i64>,
    ) -> Result<VehiclePermit> {
        Ok(service
            .checkout(
                &Actor::employee(employee),
                CreatePermitRequest {
                    employee_name: employee.into(),
                    vehicle_id: vehicle.id,
                    purpose: "Field visit".into(),
                    destination: String::new(),
                    start_date: parse_date(date),
                    odometer_out,
                    force: false,
                },
            )
            .await?)
    }

    pub async fn checkin(
        service: &OfficeService,
        permit: &VehiclePermit,
        date: &str,
        odometer_in: i64,
    ) -> Result<VehiclePermit> {
        let result = service
            .checkin(
                &Actor::employee(&permit.employee_name),
                permit.id,
                CheckinPermitRequest {
                    end_date: parse_date(date),
                    odometer_in,
                },
            )
            .await?;
        Ok(result.permit)
    }

    pub async fn fuel(
        service: &OfficeService,
        permit: &VehiclePermit,
        date: &str,
        odometer_reading: i64,
        liters: i64,
        cost: i64,
    ) -> Result<FuelExpense> {
        Ok(service
            .record_fuel_expense(
                &Actor::employee(&permit.employee_name),
                CreateFuelExpenseRequest {
                    permit_id: permit.id,
                    date: parse_date(date),
                    liters,
                    cost,
                    odometer_reading,
                    station_name: "Central".into(),
                },
            )
            .await?)
    }
}
