use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::{FuelExpenseFilter, OfficeService, PermitFilter};
use crate::domain::{
    Actor, Announcement, Correspondence, Employee, FleetReport, FuelExpense, LeaveRequest,
    PublicHoliday, RecordFilter, Settings, StoredDocument, TrainingRecord, UserRequest, Vehicle,
    VehiclePermit, YearMonth, format_cents, format_litres,
};

/// Database snapshot for full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub settings: Settings,
    pub vehicles: Vec<Vehicle>,
    pub permits: Vec<VehiclePermit>,
    pub fuel_expenses: Vec<FuelExpense>,
    pub employees: Vec<StoredDocument<Employee>>,
    pub leave_requests: Vec<StoredDocument<LeaveRequest>>,
    pub public_holidays: Vec<StoredDocument<PublicHoliday>>,
    pub training_records: Vec<StoredDocument<TrainingRecord>>,
    pub correspondence: Vec<StoredDocument<Correspondence>>,
    pub announcements: Vec<StoredDocument<Announcement>>,
    pub user_requests: Vec<StoredDocument<UserRequest>>,
}

/// Exporter for converting office data to various formats
pub struct Exporter<'a> {
    service: &'a OfficeService,
    actor: &'a Actor,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a OfficeService, actor: &'a Actor) -> Self {
        Self { service, actor }
    }

    /// Export the monthly fleet report to CSV format, one row per vehicle
    /// followed by the fleet total
    pub async fn export_fleet_report_csv<W: Write>(
        &self,
        month: YearMonth,
        writer: W,
    ) -> Result<FleetReport> {
        let report = self.service.monthly_fleet_report(month).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "month",
            "vehicle",
            "distance_km",
            "liters",
            "cost",
            "km_per_liter",
        ])?;

        let month = report.month.to_string();
        for line in &report.lines {
            csv_writer.write_record([
                month.as_str(),
                &line.vehicle_name,
                &line.total_distance.to_string(),
                &format_litres(line.total_liters),
                &format_cents(line.total_cost),
                &format!("{:.2}", line.consumption),
            ])?;
        }

        csv_writer.write_record([
            month.as_str(),
            "TOTAL",
            &report.totals.distance.to_string(),
            &format_litres(report.totals.liters),
            &format_cents(report.totals.cost),
            &format!("{:.2}", report.totals.consumption()),
        ])?;

        csv_writer.flush()?;
        Ok(report)
    }

    /// Export the monthly fleet report as JSON
    pub async fn export_fleet_report_json<W: Write>(
        &self,
        month: YearMonth,
        mut writer: W,
    ) -> Result<FleetReport> {
        let report = self.service.monthly_fleet_report(month).await?;
        let json = serde_json::to_string_pretty(&report)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;
        Ok(report)
    }

    /// Export permits to CSV format
    pub async fn export_permits_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let views = self
            .service
            .list_permit_views(&PermitFilter::default())
            .await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "permit_number",
            "state",
            "employee",
            "vehicle",
            "purpose",
            "destination",
            "start_date",
            "end_date",
            "odometer_out",
            "odometer_in",
            "distance",
        ])?;

        for view in &views {
            let permit = &view.permit;
            csv_writer.write_record([
                permit.permit_number.to_string().as_str(),
                view.state.as_str(),
                &permit.employee_name,
                &view.vehicle_label,
                &permit.purpose,
                &permit.destination,
                &permit.start_date.to_rfc3339(),
                &permit.end_date.map(|d| d.to_rfc3339()).unwrap_or_default(),
                &permit.odometer_out.to_string(),
                &permit.odometer_in.map(|km| km.to_string()).unwrap_or_default(),
                &view.distance_label,
            ])?;
        }

        csv_writer.flush()?;
        Ok(views.len())
    }

    /// Export fuel expenses to CSV format
    pub async fn export_fuel_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let views = self
            .service
            .list_fuel_expense_views(&FuelExpenseFilter::default())
            .await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "date",
            "permit",
            "vehicle",
            "liters",
            "cost",
            "odometer_reading",
            "station",
        ])?;

        for view in &views {
            let expense = &view.expense;
            csv_writer.write_record([
                &expense.id.to_string(),
                &expense.date.to_rfc3339(),
                &view.permit_number_label,
                &view.vehicle_label,
                &view.liters_label,
                &format_cents(expense.cost),
                &expense.odometer_reading.to_string(),
                &expense.station_name,
            ])?;
        }

        csv_writer.flush()?;
        Ok(views.len())
    }

    /// Export full database as JSON snapshot. Owned records are limited to
    /// what the actor may see.
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<DatabaseSnapshot> {
        let all = RecordFilter::default();

        let snapshot = DatabaseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            settings: self.service.get_settings().await?,
            vehicles: self.service.list_vehicles().await?,
            permits: self.service.list_permits(&PermitFilter::default()).await?,
            fuel_expenses: self
                .service
                .list_fuel_expenses(&FuelExpenseFilter::default())
                .await?,
            employees: self.service.list_records(self.actor, &all).await?,
            leave_requests: self.service.list_records(self.actor, &all).await?,
            public_holidays: self.service.list_records(self.actor, &all).await?,
            training_records: self.service.list_records(self.actor, &all).await?,
            correspondence: self.service.list_records(self.actor, &all).await?,
            announcements: self.service.list_records(self.actor, &all).await?,
            user_requests: self.service.list_records(self.actor, &all).await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
