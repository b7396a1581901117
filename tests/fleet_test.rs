mod common;

use anyhow::Result;
use common::{Fleet, admin, employee, test_service};
use maktab::application::{AppError, OfficeService, UpdateFuelExpenseRequest};
use maktab::domain::{Action, FleetTotals};
use maktab::io::Exporter;

#[tokio::test]
async fn test_january_fleet_report() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let vehicle = Fleet::vehicle(&service, "X-1").await?;
    let permit = Fleet::checkout(&service, &vehicle, "Ali", "2024-01-09").await?;
    Fleet::fuel(&service, &permit, "2024-01-10", 1_000, 10_000, 300).await?;
    Fleet::fuel(&service, &permit, "2024-01-20", 1_200, 15_000, 450).await?;

    let month = OfficeService::parse_month("2024-01")?;
    let report = service.monthly_fleet_report(month).await?;

    assert_eq!(report.lines.len(), 1);
    let line = &report.lines[0];
    assert_eq!(line.vehicle_name, "Pickup (X-1)");
    assert_eq!(line.total_distance, 200);
    assert_eq!(line.total_liters, 15_000);
    assert_eq!(line.total_cost, 450);
    assert_eq!(format!("{:.2}", line.consumption), "13.33");
    assert_eq!(
        report.totals,
        FleetTotals {
            distance: 200,
            liters: 15_000,
            cost: 450
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_vehicles_without_expenses_are_left_out() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let busy = Fleet::vehicle(&service, "BUSY").await?;
    Fleet::vehicle(&service, "IDLE").await?;
    let permit = Fleet::checkout(&service, &busy, "Ali", "2024-01-01").await?;
    Fleet::fuel(&service, &permit, "2024-01-02", 100, 10_000, 300).await?;
    Fleet::fuel(&service, &permit, "2024-01-03", 250, 10_000, 300).await?;

    let report = service
        .monthly_fleet_report(OfficeService::parse_month("2024-01")?)
        .await?;
    assert_eq!(report.lines.len(), 1);
    assert_eq!(report.lines[0].vehicle_id, busy.id);

    // Nothing happened in February
    let report = service
        .monthly_fleet_report(OfficeService::parse_month("2024-02")?)
        .await?;
    assert!(report.lines.is_empty());
    assert_eq!(report.totals.consumption(), 0.0);
    Ok(())
}

#[tokio::test]
async fn test_report_is_idempotent() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let vehicle = Fleet::vehicle(&service, "X-1").await?;
    let permit = Fleet::checkout(&service, &vehicle, "Ali", "2024-01-01").await?;
    Fleet::fuel(&service, &permit, "2024-01-05", 500, 20_000, 600).await?;
    Fleet::fuel(&service, &permit, "2024-01-25", 820, 25_000, 750).await?;

    let month = OfficeService::parse_month("2024-01")?;
    let first = service.monthly_fleet_report(month).await?;
    let second = service.monthly_fleet_report(month).await?;
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn test_segments_follow_odometer_order_and_never_go_negative() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let vehicle = Fleet::vehicle(&service, "X-1").await?;
    let permit = Fleet::checkout(&service, &vehicle, "Ali", "2024-01-01").await?;

    // Entered out of date order, with one repeated reading
    Fleet::fuel(&service, &permit, "2024-01-20", 1_300, 10_000, 300).await?;
    Fleet::fuel(&service, &permit, "2024-01-05", 1_000, 10_000, 300).await?;
    Fleet::fuel(&service, &permit, "2024-01-10", 1_000, 10_000, 300).await?;

    let segments = service.distance_segments(vehicle.id).await?;
    assert_eq!(segments.len(), 2);
    assert!(segments.iter().all(|s| s.distance >= 0));
    assert_eq!(segments[0].distance, 0);
    assert!(!segments[0].is_positive());
    assert_eq!(segments[1].previous_reading, 1_000);
    assert_eq!(segments[1].current_reading, 1_300);
    assert_eq!(segments[1].distance, 300);
    Ok(())
}

#[tokio::test]
async fn test_fuel_edit_recomputes_report() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let vehicle = Fleet::vehicle(&service, "X-1").await?;
    let permit = Fleet::checkout(&service, &vehicle, "Ali", "2024-01-01").await?;
    Fleet::fuel(&service, &permit, "2024-01-10", 1_000, 10_000, 300).await?;
    let later = Fleet::fuel(&service, &permit, "2024-01-20", 1_200, 15_000, 450).await?;

    let denied = service
        .update_fuel_expense(
            &employee("Ali"),
            later.id,
            UpdateFuelExpenseRequest::default(),
        )
        .await;
    assert!(matches!(
        denied,
        Err(AppError::Forbidden {
            action: Action::ManageFuelExpenses,
            ..
        })
    ));

    let edited = service
        .update_fuel_expense(
            &admin(),
            later.id,
            UpdateFuelExpenseRequest {
                odometer_reading: Some(1_300),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(edited.vehicle_id, vehicle.id);

    let report = service
        .monthly_fleet_report(OfficeService::parse_month("2024-01")?)
        .await?;
    assert_eq!(report.lines[0].total_distance, 300);
    assert_eq!(format!("{:.2}", report.lines[0].consumption), "20.00");

    service.delete_fuel_expense(&admin(), later.id).await?;
    let report = service
        .monthly_fleet_report(OfficeService::parse_month("2024-01")?)
        .await?;
    assert!(report.lines.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_fuel_expense_takes_vehicle_from_permit() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let vehicle = Fleet::vehicle(&service, "X-1").await?;
    let permit = Fleet::checkout(&service, &vehicle, "Ali", "2024-01-01").await?;

    let expense = Fleet::fuel(&service, &permit, "2024-01-02", 50, 5_000, 150).await?;
    assert_eq!(expense.vehicle_id, vehicle.id);
    assert_eq!(expense.permit_id, permit.id);
    Ok(())
}

#[tokio::test]
async fn test_invalid_month_is_rejected() -> Result<()> {
    assert!(matches!(
        OfficeService::parse_month("2024-13"),
        Err(AppError::InvalidMonth(_))
    ));
    assert!(matches!(
        OfficeService::parse_month("January"),
        Err(AppError::InvalidMonth(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_vehicle_plates_are_unique() -> Result<()> {
    let (service, _temp) = test_service().await?;
    Fleet::vehicle(&service, "X-1").await?;

    let err = Fleet::vehicle(&service, "X-1").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::VehicleAlreadyExists(_))
    ));

    let found = service.find_vehicle("X-1").await?;
    assert_eq!(found.plate_number, "X-1");
    assert!(matches!(
        service.find_vehicle("NOPE").await,
        Err(AppError::VehicleNotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_employees_cannot_manage_vehicles() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let vehicle = Fleet::vehicle(&service, "X-1").await?;

    let result = service.delete_vehicle(&employee("Ali"), vehicle.id).await;
    assert!(matches!(
        result,
        Err(AppError::Forbidden {
            action: Action::ManageFleet,
            ..
        })
    ));
    Ok(())
}

#[tokio::test]
async fn test_export_fleet_report_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let vehicle = Fleet::vehicle(&service, "X-1").await?;
    let permit = Fleet::checkout(&service, &vehicle, "Ali", "2024-01-09").await?;
    Fleet::fuel(&service, &permit, "2024-01-10", 1_000, 10_000, 300).await?;
    Fleet::fuel(&service, &permit, "2024-01-20", 1_200, 15_000, 450).await?;

    let actor = admin();
    let exporter = Exporter::new(&service, &actor);
    let mut buffer = Vec::new();
    exporter
        .export_fleet_report_csv(OfficeService::parse_month("2024-01")?, &mut buffer)
        .await?;

    let csv = String::from_utf8(buffer)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "month,vehicle,distance_km,liters,cost,km_per_liter");
    assert_eq!(lines[1], "2024-01,Pickup (X-1),200,15.000,4.50,13.33");
    assert_eq!(lines[2], "2024-01,TOTAL,200,15.000,4.50,13.33");
    Ok(())
}
