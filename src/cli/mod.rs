use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{
    CheckinPermitRequest, CreateFuelExpenseRequest, CreatePermitRequest, CreateVehicleRequest,
    FuelExpenseFilter, OfficeService, PermitFilter, SubmitLeaveRequest, UpdateFuelExpenseRequest,
    UpdatePermitRequest, UpdateVehicleRequest,
};
use crate::domain::{
    Actor, Announcement, Correspondence, Document, Employee, LeaveRequest, PermitState,
    PublicHoliday, RecordFilter, Role, Settings, TrainingRecord, UserRequest, format_cents,
    format_litres, parse_cents, parse_litres,
};

/// Maktab - Office administration and fleet usage ledger
#[derive(Parser)]
#[command(name = "maktab")]
#[command(about = "Office administration: vehicle permits, fuel ledger, leave and records")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "MAKTAB_DB", default_value = "maktab.db")]
    pub database: String,

    /// Name of the acting user
    #[arg(short, long, env = "MAKTAB_USER", default_value = "admin")]
    pub user: String,

    /// Role of the acting user: admin, head_of_department, employee
    #[arg(short, long, env = "MAKTAB_ROLE", default_value = "employee")]
    pub role: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Vehicle management commands
    #[command(subcommand)]
    Vehicle(VehicleCommands),

    /// Vehicle permit (checkout/checkin) commands
    #[command(subcommand)]
    Permit(PermitCommands),

    /// Fuel expense commands
    #[command(subcommand)]
    Fuel(FuelCommands),

    /// Generate reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Leave request commands
    #[command(subcommand)]
    Leave(LeaveCommands),

    /// Staff directory commands
    #[command(subcommand)]
    Employee(EmployeeCommands),

    /// Public holiday commands
    #[command(subcommand)]
    Holiday(HolidayCommands),

    /// Generic record commands (training, correspondence, announcement, request, ...)
    #[command(subcommand)]
    Doc(DocCommands),

    /// Office settings
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Export data to CSV or JSON
    Export {
        /// What to export: fleet, permits, fuel, full
        export_type: String,

        /// Report month for fleet exports (YYYY-MM, defaults to current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json (fleet only; other types have a fixed format)
        #[arg(short, long, default_value = "csv")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum VehicleCommands {
    /// Register a new vehicle
    Add {
        /// Plate number (must be unique)
        plate: String,

        /// Vehicle type (e.g., "Pickup", "Sedan")
        #[arg(short = 't', long = "type")]
        vehicle_type: String,
    },

    /// List all vehicles
    List,

    /// Show availability of every vehicle
    Status,

    /// Change a vehicle's plate or type
    Update {
        /// Plate number or ID
        vehicle: String,

        #[arg(long)]
        plate: Option<String>,

        #[arg(short = 't', long = "type")]
        vehicle_type: Option<String>,
    },

    /// Delete a vehicle (its permits and fuel expenses are kept)
    Remove {
        /// Plate number or ID
        vehicle: String,
    },
}

#[derive(Subcommand)]
pub enum PermitCommands {
    /// Check a vehicle out
    Checkout {
        /// Plate number or ID
        vehicle: String,

        /// Purpose of the trip
        #[arg(short, long)]
        purpose: String,

        /// Employee taking the vehicle (defaults to the acting user)
        #[arg(short, long)]
        employee: Option<String>,

        #[arg(long, default_value = "")]
        destination: String,

        /// Checkout date (YYYY-MM-DD or RFC 3339, defaults to now)
        #[arg(long)]
        date: Option<String>,

        /// Odometer reading at checkout (defaults to the last return reading)
        #[arg(long)]
        odometer: Option<i64>,

        /// Check out even if the vehicle is still out
        #[arg(long)]
        force: bool,
    },

    /// Check a vehicle back in
    Checkin {
        /// Permit number
        number: i64,

        /// Odometer reading on return
        #[arg(long)]
        odometer: i64,

        /// Return date (YYYY-MM-DD or RFC 3339, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List permits
    List {
        /// Filter by vehicle plate or ID
        #[arg(long)]
        vehicle: Option<String>,

        /// Filter by state: open, closed
        #[arg(long)]
        state: Option<String>,

        /// Filter by employee name
        #[arg(long)]
        employee: Option<String>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,
    },

    /// Show a printable permit
    Show {
        /// Permit number
        number: i64,
    },

    /// Edit a permit (administrators)
    Edit {
        /// Permit number
        number: i64,

        #[arg(long)]
        employee: Option<String>,

        /// Move the permit to another vehicle (plate or ID)
        #[arg(long)]
        vehicle: Option<String>,

        #[arg(long)]
        purpose: Option<String>,

        #[arg(long)]
        destination: Option<String>,

        #[arg(long)]
        start_date: Option<String>,

        #[arg(long)]
        end_date: Option<String>,

        #[arg(long)]
        odometer_out: Option<i64>,

        #[arg(long)]
        odometer_in: Option<i64>,
    },

    /// Delete a permit (administrators)
    Delete {
        /// Permit number
        number: i64,
    },
}

#[derive(Subcommand)]
pub enum FuelCommands {
    /// Record a refuelling under a permit
    Add {
        /// Permit number
        permit: i64,

        /// Litres (e.g., "42.5")
        #[arg(short, long)]
        liters: String,

        /// Cost (e.g., "12.75")
        #[arg(short, long)]
        cost: String,

        /// Odometer reading at the pump
        #[arg(short, long)]
        odometer: i64,

        #[arg(short, long, default_value = "")]
        station: String,

        /// Date (YYYY-MM-DD or RFC 3339, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List fuel expenses
    List {
        /// Filter by vehicle plate or ID
        #[arg(long)]
        vehicle: Option<String>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,
    },

    /// Edit a fuel expense
    Edit {
        /// Fuel expense ID
        id: String,

        #[arg(long)]
        liters: Option<String>,

        #[arg(long)]
        cost: Option<String>,

        #[arg(long)]
        odometer: Option<i64>,

        #[arg(long)]
        station: Option<String>,

        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a fuel expense
    Delete {
        /// Fuel expense ID
        id: String,
    },

    /// Show the odometer chain of one vehicle
    Chain {
        /// Plate number or ID
        vehicle: String,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Monthly fuel consumption per vehicle
    Fleet {
        /// Month (YYYY-MM, defaults to current month)
        month: Option<String>,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum LeaveCommands {
    /// Submit a leave request
    Submit {
        /// Leave type (e.g., annual, sick, emergency)
        #[arg(short = 't', long = "type")]
        leave_type: String,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        to: String,

        #[arg(long)]
        reason: Option<String>,

        /// File on behalf of another employee
        #[arg(long)]
        employee: Option<String>,
    },

    /// List leave requests
    List {
        /// Filter by status: pending, approved, rejected
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        from_date: Option<String>,

        #[arg(long)]
        to_date: Option<String>,

        #[arg(long)]
        search: Option<String>,
    },

    /// Approve a pending request
    Approve { id: String },

    /// Reject a pending request
    Reject { id: String },

    /// Print the leave form
    Print {
        id: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum EmployeeCommands {
    /// Add an employee to the directory
    Add {
        name: String,

        #[arg(long, default_value = "")]
        title: String,

        #[arg(long, default_value = "")]
        department: String,

        /// admin, head_of_department, employee
        #[arg(long, default_value = "employee")]
        role: String,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Hire date (YYYY-MM-DD)
        #[arg(long)]
        hired: Option<String>,
    },

    /// List employees
    List {
        #[arg(long)]
        search: Option<String>,
    },

    /// Remove an employee
    Remove { id: String },
}

#[derive(Subcommand)]
pub enum HolidayCommands {
    /// Add a public holiday
    Add {
        name: String,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Last day for multi-day holidays (YYYY-MM-DD)
        #[arg(long)]
        until: Option<String>,
    },

    /// List public holidays
    List,

    /// Remove a public holiday
    Remove { id: String },
}

#[derive(Subcommand)]
pub enum DocCommands {
    /// Create a record from a JSON object
    Add {
        /// Record kind
        kind: String,

        /// Record fields as JSON
        json: String,
    },

    /// List records of one kind
    List {
        kind: String,

        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        from_date: Option<String>,

        #[arg(long)]
        to_date: Option<String>,

        #[arg(long)]
        search: Option<String>,
    },

    /// Show one record as JSON
    Show { kind: String, id: String },

    /// Update fields of a record from a JSON object
    Update {
        kind: String,
        id: String,

        /// Fields to replace, as JSON
        json: String,
    },

    /// Delete a record
    Delete { kind: String, id: String },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show office settings
    Show,

    /// Change office settings
    Set {
        #[arg(long)]
        office: Option<String>,

        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        manager: Option<String>,

        /// First day of Ramadan (YYYY-MM-DD)
        #[arg(long)]
        ramadan_start: Option<String>,

        /// Last day of Ramadan (YYYY-MM-DD)
        #[arg(long)]
        ramadan_end: Option<String>,
    },
}

impl Cli {
    fn actor(&self) -> Result<Actor> {
        let role = Role::from_str(&self.role).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid role '{}'. Valid roles: admin, head_of_department, employee",
                self.role
            )
        })?;
        Ok(Actor::new(self.user.clone(), role))
    }

    pub async fn run(self) -> Result<()> {
        let actor = self.actor()?;

        if let Commands::Init = self.command {
            OfficeService::init(&self.database).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let service = OfficeService::connect(&self.database)
            .await
            .with_context(|| format!("Failed to open database '{}'", self.database))?;

        match self.command {
            Commands::Init => {}
            Commands::Vehicle(cmd) => run_vehicle_command(&service, &actor, cmd).await?,
            Commands::Permit(cmd) => run_permit_command(&service, &actor, cmd).await?,
            Commands::Fuel(cmd) => run_fuel_command(&service, &actor, cmd).await?,
            Commands::Report(cmd) => run_report_command(&service, cmd).await?,
            Commands::Leave(cmd) => run_leave_command(&service, &actor, cmd).await?,
            Commands::Employee(cmd) => run_employee_command(&service, &actor, cmd).await?,
            Commands::Holiday(cmd) => run_holiday_command(&service, &actor, cmd).await?,
            Commands::Doc(cmd) => run_doc_command(&service, &actor, cmd).await?,
            Commands::Settings(cmd) => run_settings_command(&service, &actor, cmd).await?,
            Commands::Export {
                export_type,
                month,
                output,
                format,
            } => {
                run_export_command(
                    &service,
                    &actor,
                    &export_type,
                    month.as_deref(),
                    output.as_deref(),
                    &format,
                )
                .await?
            }
        }

        Ok(())
    }
}

async fn run_vehicle_command(
    service: &OfficeService,
    actor: &Actor,
    cmd: VehicleCommands,
) -> Result<()> {
    match cmd {
        VehicleCommands::Add {
            plate,
            vehicle_type,
        } => {
            let vehicle = service
                .create_vehicle(
                    actor,
                    CreateVehicleRequest {
                        vehicle_type,
                        plate_number: plate,
                    },
                )
                .await?;
            println!("Registered vehicle: {} ({})", vehicle.display_name(), vehicle.id);
        }

        VehicleCommands::List => {
            let vehicles = service.list_vehicles().await?;
            if vehicles.is_empty() {
                println!("No vehicles found.");
            } else {
                println!("{:<12} {:<20} {:<36}", "PLATE", "TYPE", "ID");
                println!("{}", "-".repeat(70));
                for vehicle in vehicles {
                    println!(
                        "{:<12} {:<20} {:<36}",
                        vehicle.plate_number,
                        truncate(&vehicle.vehicle_type, 20),
                        vehicle.id
                    );
                }
            }
        }

        VehicleCommands::Status => {
            let statuses = service.vehicle_statuses().await?;
            if statuses.is_empty() {
                println!("No vehicles found.");
            } else {
                println!(
                    "{:<24} {:<10} {:>10} {:<20}",
                    "VEHICLE", "STATE", "ODOMETER", "OUT WITH"
                );
                println!("{}", "-".repeat(68));
                for status in statuses {
                    let (state, holder) = match &status.open_permit {
                        Some(permit) => (
                            format!("#{}", permit.permit_number),
                            permit.employee_name.clone(),
                        ),
                        None => ("available".to_string(), "-".to_string()),
                    };
                    println!(
                        "{:<24} {:<10} {:>10} {:<20}",
                        truncate(&status.vehicle.display_name(), 24),
                        state,
                        status.opening_odometer,
                        truncate(&holder, 20)
                    );
                }
            }
        }

        VehicleCommands::Update {
            vehicle,
            plate,
            vehicle_type,
        } => {
            let existing = service.find_vehicle(&vehicle).await?;
            let updated = service
                .update_vehicle(
                    actor,
                    existing.id,
                    UpdateVehicleRequest {
                        vehicle_type,
                        plate_number: plate,
                    },
                )
                .await?;
            println!("Updated vehicle: {}", updated.display_name());
        }

        VehicleCommands::Remove { vehicle } => {
            let existing = service.find_vehicle(&vehicle).await?;
            let removed = service.delete_vehicle(actor, existing.id).await?;
            println!("Deleted vehicle: {}", removed.display_name());
        }
    }
    Ok(())
}

async fn run_permit_command(
    service: &OfficeService,
    actor: &Actor,
    cmd: PermitCommands,
) -> Result<()> {
    match cmd {
        PermitCommands::Checkout {
            vehicle,
            purpose,
            employee,
            destination,
            date,
            odometer,
            force,
        } => {
            let vehicle = service.find_vehicle(&vehicle).await?;
            let start_date = parse_optional_timestamp(date)?.unwrap_or_else(Utc::now);

            let permit = service
                .checkout(
                    actor,
                    CreatePermitRequest {
                        employee_name: employee.unwrap_or_else(|| actor.name.clone()),
                        vehicle_id: vehicle.id,
                        purpose,
                        destination,
                        start_date,
                        odometer_out: odometer,
                        force,
                    },
                )
                .await?;
            println!(
                "Permit #{}: {} checked out to {} at {} km",
                permit.permit_number,
                vehicle.display_name(),
                permit.employee_name,
                permit.odometer_out
            );
        }

        PermitCommands::Checkin {
            number,
            odometer,
            date,
        } => {
            let permit = service.get_permit_by_number(number).await?;
            let end_date = parse_optional_timestamp(date)?.unwrap_or_else(Utc::now);

            let result = service
                .checkin(
                    actor,
                    permit.id,
                    CheckinPermitRequest {
                        end_date,
                        odometer_in: odometer,
                    },
                )
                .await?;

            match result.permit.distance() {
                Some(km) => println!("Permit #{} closed: {} km driven", number, km),
                None => println!("Permit #{} closed", number),
            }
            if result.inconsistent_reading {
                eprintln!(
                    "Warning: return reading {} is below checkout reading {}",
                    odometer, result.permit.odometer_out
                );
            }
        }

        PermitCommands::List {
            vehicle,
            state,
            employee,
            from_date,
            to_date,
        } => {
            let vehicle_id = match vehicle {
                Some(key) => Some(service.find_vehicle(&key).await?.id),
                None => None,
            };
            let state = state
                .map(|s| {
                    PermitState::from_str(&s).ok_or_else(|| {
                        anyhow::anyhow!("Invalid state '{}'. Valid states: open, closed", s)
                    })
                })
                .transpose()?;

            let filter = PermitFilter {
                vehicle_id,
                state,
                employee_name: employee,
                from_date: parse_optional_date(from_date)?,
                to_date: parse_optional_date(to_date)?,
            };
            let views = service.list_permit_views(&filter).await?;

            if views.is_empty() {
                println!("No permits found.");
            } else {
                println!(
                    "{:>6} {:<8} {:<20} {:<24} {:<10} {:>8}",
                    "NO.", "STATE", "EMPLOYEE", "VEHICLE", "DATE", "KM"
                );
                println!("{}", "-".repeat(81));
                for view in views {
                    println!(
                        "{:>6} {:<8} {:<20} {:<24} {:<10} {:>8}",
                        view.permit.permit_number,
                        view.state.as_str(),
                        truncate(&view.permit.employee_name, 20),
                        truncate(&view.vehicle_label, 24),
                        view.permit.start_date.format("%Y-%m-%d"),
                        view.distance_label
                    );
                }
            }
        }

        PermitCommands::Show { number } => {
            let permit = service.get_permit_by_number(number).await?;
            let filter = PermitFilter {
                vehicle_id: Some(permit.vehicle_id),
                ..Default::default()
            };
            let view = service
                .list_permit_views(&filter)
                .await?
                .into_iter()
                .find(|v| v.permit.id == permit.id)
                .ok_or_else(|| anyhow::anyhow!("Permit #{} disappeared", number))?;
            let settings = service.get_settings().await?;

            if !settings.office_name.is_empty() {
                println!("{}", settings.office_name);
            }
            println!("Vehicle Permit #{}", view.permit.permit_number);
            println!("  State:        {}", view.state);
            println!("  Employee:     {}", view.permit.employee_name);
            println!("  Vehicle:      {}", view.vehicle_label);
            println!("  Purpose:      {}", view.permit.purpose);
            if !view.permit.destination.is_empty() {
                println!("  Destination:  {}", view.permit.destination);
            }
            println!(
                "  Out:          {} at {} km",
                view.permit.start_date.format("%Y-%m-%d %H:%M"),
                view.permit.odometer_out
            );
            match (view.permit.end_date, view.permit.odometer_in) {
                (Some(end), Some(km)) => {
                    println!("  In:           {} at {} km", end.format("%Y-%m-%d %H:%M"), km)
                }
                _ => println!("  In:           -"),
            }
            println!("  Distance:     {}", view.distance_label);
        }

        PermitCommands::Edit {
            number,
            employee,
            vehicle,
            purpose,
            destination,
            start_date,
            end_date,
            odometer_out,
            odometer_in,
        } => {
            let permit = service.get_permit_by_number(number).await?;
            let vehicle_id = match vehicle {
                Some(key) => Some(service.find_vehicle(&key).await?.id),
                None => None,
            };

            let updated = service
                .update_permit(
                    actor,
                    permit.id,
                    UpdatePermitRequest {
                        employee_name: employee,
                        vehicle_id,
                        purpose,
                        destination,
                        start_date: parse_optional_timestamp(start_date)?,
                        end_date: parse_optional_timestamp(end_date)?,
                        odometer_out,
                        odometer_in,
                    },
                )
                .await?;
            println!("Updated permit #{}", updated.permit_number);
        }

        PermitCommands::Delete { number } => {
            let permit = service.get_permit_by_number(number).await?;
            service.delete_permit(actor, permit.id).await?;
            println!("Deleted permit #{}", number);
        }
    }
    Ok(())
}

async fn run_fuel_command(service: &OfficeService, actor: &Actor, cmd: FuelCommands) -> Result<()> {
    match cmd {
        FuelCommands::Add {
            permit,
            liters,
            cost,
            odometer,
            station,
            date,
        } => {
            let permit = service.get_permit_by_number(permit).await?;
            let liters = parse_litres(&liters).context("Invalid litres. Use '42.5' or '42'")?;
            let cost = parse_cents(&cost).context("Invalid cost. Use '12.75' or '12'")?;
            let date = parse_optional_timestamp(date)?.unwrap_or_else(Utc::now);

            let expense = service
                .record_fuel_expense(
                    actor,
                    CreateFuelExpenseRequest {
                        permit_id: permit.id,
                        date,
                        liters,
                        cost,
                        odometer_reading: odometer,
                        station_name: station,
                    },
                )
                .await?;
            println!(
                "Recorded fuel: {} L for {} under permit #{} ({})",
                format_litres(expense.liters),
                format_cents(expense.cost),
                permit.permit_number,
                expense.id
            );
        }

        FuelCommands::List {
            vehicle,
            from_date,
            to_date,
        } => {
            let vehicle_id = match vehicle {
                Some(key) => Some(service.find_vehicle(&key).await?.id),
                None => None,
            };
            let filter = FuelExpenseFilter {
                vehicle_id,
                permit_id: None,
                from_date: parse_optional_date(from_date)?,
                to_date: parse_optional_date(to_date)?,
            };
            let views = service.list_fuel_expense_views(&filter).await?;

            if views.is_empty() {
                println!("No fuel expenses found.");
            } else {
                println!(
                    "{:<10} {:>7} {:<24} {:>10} {:>10} {:>10}",
                    "DATE", "PERMIT", "VEHICLE", "LITRES", "COST", "ODOMETER"
                );
                println!("{}", "-".repeat(76));
                for view in views {
                    println!(
                        "{:<10} {:>7} {:<24} {:>10} {:>10} {:>10}",
                        view.expense.date.format("%Y-%m-%d"),
                        view.permit_number_label,
                        truncate(&view.vehicle_label, 24),
                        view.liters_label,
                        format_cents(view.expense.cost),
                        view.expense.odometer_reading
                    );
                }
            }
        }

        FuelCommands::Edit {
            id,
            liters,
            cost,
            odometer,
            station,
            date,
        } => {
            let id = parse_id(&id)?;
            let request = UpdateFuelExpenseRequest {
                date: parse_optional_timestamp(date)?,
                liters: liters
                    .map(|l| parse_litres(&l))
                    .transpose()
                    .context("Invalid litres")?,
                cost: cost
                    .map(|c| parse_cents(&c))
                    .transpose()
                    .context("Invalid cost")?,
                odometer_reading: odometer,
                station_name: station,
            };
            let expense = service.update_fuel_expense(actor, id, request).await?;
            println!("Updated fuel expense {}", expense.id);
        }

        FuelCommands::Delete { id } => {
            let id = parse_id(&id)?;
            service.delete_fuel_expense(actor, id).await?;
            println!("Deleted fuel expense {}", id);
        }

        FuelCommands::Chain { vehicle } => {
            let vehicle = service.find_vehicle(&vehicle).await?;
            let segments = service.distance_segments(vehicle.id).await?;

            println!("Odometer chain: {}", vehicle.display_name());
            if segments.is_empty() {
                println!("Fewer than two fuel expenses recorded.");
                return Ok(());
            }
            println!(
                "{:<10} {:>10} {:>10} {:>8} {:>10} {:>10}",
                "DATE", "FROM", "TO", "KM", "LITRES", "COST"
            );
            println!("{}", "-".repeat(63));
            for segment in segments {
                println!(
                    "{:<10} {:>10} {:>10} {:>8} {:>10} {:>10}",
                    segment.date.format("%Y-%m-%d"),
                    segment.previous_reading,
                    segment.current_reading,
                    segment.distance,
                    format_litres(segment.liters),
                    format_cents(segment.cost)
                );
            }
        }
    }
    Ok(())
}

async fn run_report_command(service: &OfficeService, cmd: ReportCommands) -> Result<()> {
    match cmd {
        ReportCommands::Fleet { month, format } => {
            let month = match month {
                Some(m) => OfficeService::parse_month(&m)?,
                None => crate::domain::YearMonth::of(Utc::now()),
            };
            let report = service.monthly_fleet_report(month).await?;

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                "csv" => {
                    println!("vehicle,distance_km,liters,cost,km_per_liter");
                    for line in &report.lines {
                        println!(
                            "{},{},{},{},{:.2}",
                            line.vehicle_name,
                            line.total_distance,
                            format_litres(line.total_liters),
                            format_cents(line.total_cost),
                            line.consumption
                        );
                    }
                }
                _ => {
                    println!("Fleet Fuel Report: {}", report.month);
                    println!();
                    if report.lines.is_empty() {
                        println!("No fuel consumption recorded for this month.");
                        return Ok(());
                    }
                    println!(
                        "{:<24} {:>10} {:>10} {:>10} {:>8}",
                        "VEHICLE", "KM", "LITRES", "COST", "KM/L"
                    );
                    println!("{}", "-".repeat(66));
                    for line in &report.lines {
                        println!(
                            "{:<24} {:>10} {:>10} {:>10} {:>8.2}",
                            truncate(&line.vehicle_name, 24),
                            line.total_distance,
                            format_litres(line.total_liters),
                            format_cents(line.total_cost),
                            line.consumption
                        );
                    }
                    println!("{}", "-".repeat(66));
                    println!(
                        "{:<24} {:>10} {:>10} {:>10} {:>8.2}",
                        "TOTAL",
                        report.totals.distance,
                        format_litres(report.totals.liters),
                        format_cents(report.totals.cost),
                        report.totals.consumption()
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_leave_command(service: &OfficeService, actor: &Actor, cmd: LeaveCommands) -> Result<()> {
    match cmd {
        LeaveCommands::Submit {
            leave_type,
            from,
            to,
            reason,
            employee,
        } => {
            let doc = service
                .submit_leave(
                    actor,
                    SubmitLeaveRequest {
                        employee_name: employee,
                        leave_type,
                        start_date: parse_date(&from)?,
                        end_date: parse_date(&to)?,
                        reason,
                    },
                )
                .await?;
            println!(
                "Submitted {} leave for {}: {} day(s) ({})",
                doc.data.leave_type,
                doc.data.employee_name,
                doc.data.duration_days(),
                doc.id
            );
        }

        LeaveCommands::List {
            status,
            from_date,
            to_date,
            search,
        } => {
            let filter = RecordFilter {
                status,
                from_date: parse_optional_date(from_date)?,
                to_date: parse_optional_date(to_date)?,
                search,
            };
            let requests = service
                .list_records::<LeaveRequest>(actor, &filter)
                .await?;

            if requests.is_empty() {
                println!("No leave requests found.");
            } else {
                println!(
                    "{:<36} {:<20} {:<10} {:<10} {:<10} {:>5} {:<9}",
                    "ID", "EMPLOYEE", "TYPE", "FROM", "TO", "DAYS", "STATUS"
                );
                println!("{}", "-".repeat(106));
                for doc in requests {
                    let leave = &doc.data;
                    println!(
                        "{:<36} {:<20} {:<10} {:<10} {:<10} {:>5} {:<9}",
                        doc.id,
                        truncate(&leave.employee_name, 20),
                        truncate(&leave.leave_type, 10),
                        leave.start_date.format("%Y-%m-%d"),
                        leave.end_date.format("%Y-%m-%d"),
                        leave.duration_days(),
                        leave.status.as_str()
                    );
                }
            }
        }

        LeaveCommands::Approve { id } => {
            let doc = service.approve_leave(actor, parse_id(&id)?).await?;
            println!("Approved leave for {}", doc.data.employee_name);
        }

        LeaveCommands::Reject { id } => {
            let doc = service.reject_leave(actor, parse_id(&id)?).await?;
            println!("Rejected leave for {}", doc.data.employee_name);
        }

        LeaveCommands::Print { id, format } => {
            let printout = service.leave_printout(actor, parse_id(&id)?).await?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&printout)?);
                return Ok(());
            }

            let leave = &printout.request.data;
            if !printout.settings.office_name.is_empty() {
                println!("{}", printout.settings.office_name);
            }
            if !printout.settings.department_name.is_empty() {
                println!("{}", printout.settings.department_name);
            }
            println!("Leave Request ({} form)", printout.template.as_str());
            println!("  Employee:  {}", leave.employee_name);
            println!("  Type:      {}", leave.leave_type);
            println!(
                "  Period:    {} to {} ({} day(s))",
                leave.start_date.format("%Y-%m-%d"),
                leave.end_date.format("%Y-%m-%d"),
                printout.duration_days
            );
            if let Some(reason) = &leave.reason {
                println!("  Reason:    {}", reason);
            }
            println!("  Status:    {}", leave.status);
            if let Some(by) = &leave.decided_by {
                println!("  Decided:   by {}", by);
            }
            if !printout.holidays.is_empty() {
                println!("  Holidays in period:");
                for holiday in &printout.holidays {
                    println!(
                        "    {} ({} to {})",
                        holiday.name,
                        holiday.start_date,
                        holiday.last_day()
                    );
                }
            }
            if printout.overlaps_ramadan {
                println!("  Note: period falls within Ramadan");
            }
            if !printout.settings.manager_name.is_empty() {
                println!();
                println!("  Manager: {}", printout.settings.manager_name);
            }
        }
    }
    Ok(())
}

async fn run_employee_command(
    service: &OfficeService,
    actor: &Actor,
    cmd: EmployeeCommands,
) -> Result<()> {
    match cmd {
        EmployeeCommands::Add {
            name,
            title,
            department,
            role,
            phone,
            email,
            hired,
        } => {
            let role = Role::from_str(&role)
                .ok_or_else(|| anyhow::anyhow!("Invalid role '{}'", role))?;
            let hired_at = hired.map(|d| parse_naive_date(&d)).transpose()?;

            let doc = service
                .create_record(
                    actor,
                    Employee {
                        name,
                        job_title: title,
                        department,
                        role,
                        phone,
                        email,
                        hired_at,
                    },
                )
                .await?;
            println!("Added employee: {} ({})", doc.data.name, doc.id);
        }

        EmployeeCommands::List { search } => {
            let filter = RecordFilter {
                search,
                ..Default::default()
            };
            let employees = service.list_records::<Employee>(actor, &filter).await?;
            if employees.is_empty() {
                println!("No employees found.");
            } else {
                println!(
                    "{:<36} {:<20} {:<20} {:<18}",
                    "ID", "NAME", "TITLE", "ROLE"
                );
                println!("{}", "-".repeat(97));
                for doc in employees {
                    println!(
                        "{:<36} {:<20} {:<20} {:<18}",
                        doc.id,
                        truncate(&doc.data.name, 20),
                        truncate(&doc.data.job_title, 20),
                        doc.data.role.as_str()
                    );
                }
            }
        }

        EmployeeCommands::Remove { id } => {
            let doc = service
                .delete_record::<Employee>(actor, parse_id(&id)?)
                .await?;
            println!("Removed employee: {}", doc.data.name);
        }
    }
    Ok(())
}

async fn run_holiday_command(
    service: &OfficeService,
    actor: &Actor,
    cmd: HolidayCommands,
) -> Result<()> {
    match cmd {
        HolidayCommands::Add { name, date, until } => {
            let holiday = PublicHoliday {
                name,
                start_date: parse_naive_date(&date)?,
                end_date: until.map(|d| parse_naive_date(&d)).transpose()?,
            };
            let doc = service.create_record(actor, holiday).await?;
            println!(
                "Added holiday: {} ({} to {})",
                doc.data.name,
                doc.data.start_date,
                doc.data.last_day()
            );
        }

        HolidayCommands::List => {
            let mut holidays = service
                .list_records::<PublicHoliday>(actor, &RecordFilter::default())
                .await?;
            holidays.sort_by_key(|doc| doc.data.start_date);

            if holidays.is_empty() {
                println!("No public holidays found.");
            } else {
                println!("{:<36} {:<10} {:<10} {:<24}", "ID", "FROM", "TO", "NAME");
                println!("{}", "-".repeat(83));
                for doc in holidays {
                    println!(
                        "{:<36} {:<10} {:<10} {:<24}",
                        doc.id,
                        doc.data.start_date,
                        doc.data.last_day(),
                        truncate(&doc.data.name, 24)
                    );
                }
            }
        }

        HolidayCommands::Remove { id } => {
            let doc = service
                .delete_record::<PublicHoliday>(actor, parse_id(&id)?)
                .await?;
            println!("Removed holiday: {}", doc.data.name);
        }
    }
    Ok(())
}

async fn run_doc_command(service: &OfficeService, actor: &Actor, cmd: DocCommands) -> Result<()> {
    match cmd {
        DocCommands::Add { kind, json } => {
            let value: serde_json::Value =
                serde_json::from_str(&json).context("Record must be valid JSON")?;
            match kind.as_str() {
                "employee" => doc_add::<Employee>(service, actor, value).await,
                "leave" | "leave_request" => doc_add::<LeaveRequest>(service, actor, value).await,
                "holiday" | "public_holiday" => {
                    doc_add::<PublicHoliday>(service, actor, value).await
                }
                "training" => doc_add::<TrainingRecord>(service, actor, value).await,
                "correspondence" => doc_add::<Correspondence>(service, actor, value).await,
                "announcement" => doc_add::<Announcement>(service, actor, value).await,
                "request" | "user_request" => doc_add::<UserRequest>(service, actor, value).await,
                _ => Err(invalid_kind(&kind)),
            }
        }

        DocCommands::List {
            kind,
            status,
            from_date,
            to_date,
            search,
        } => {
            let filter = RecordFilter {
                status,
                from_date: parse_optional_date(from_date)?,
                to_date: parse_optional_date(to_date)?,
                search,
            };
            match kind.as_str() {
                "employee" => doc_list::<Employee>(service, actor, &filter).await,
                "leave" | "leave_request" => doc_list::<LeaveRequest>(service, actor, &filter).await,
                "holiday" | "public_holiday" => {
                    doc_list::<PublicHoliday>(service, actor, &filter).await
                }
                "training" => doc_list::<TrainingRecord>(service, actor, &filter).await,
                "correspondence" => doc_list::<Correspondence>(service, actor, &filter).await,
                "announcement" => doc_list::<Announcement>(service, actor, &filter).await,
                "request" | "user_request" => doc_list::<UserRequest>(service, actor, &filter).await,
                _ => Err(invalid_kind(&kind)),
            }
        }

        DocCommands::Show { kind, id } => {
            let id = parse_id(&id)?;
            match kind.as_str() {
                "employee" => doc_show::<Employee>(service, actor, id).await,
                "leave" | "leave_request" => doc_show::<LeaveRequest>(service, actor, id).await,
                "holiday" | "public_holiday" => doc_show::<PublicHoliday>(service, actor, id).await,
                "training" => doc_show::<TrainingRecord>(service, actor, id).await,
                "correspondence" => doc_show::<Correspondence>(service, actor, id).await,
                "announcement" => doc_show::<Announcement>(service, actor, id).await,
                "request" | "user_request" => doc_show::<UserRequest>(service, actor, id).await,
                _ => Err(invalid_kind(&kind)),
            }
        }

        DocCommands::Update { kind, id, json } => {
            let id = parse_id(&id)?;
            let patch: serde_json::Value =
                serde_json::from_str(&json).context("Update must be valid JSON")?;
            match kind.as_str() {
                "employee" => doc_update::<Employee>(service, actor, id, patch).await,
                "leave" | "leave_request" => {
                    doc_update::<LeaveRequest>(service, actor, id, patch).await
                }
                "holiday" | "public_holiday" => {
                    doc_update::<PublicHoliday>(service, actor, id, patch).await
                }
                "training" => doc_update::<TrainingRecord>(service, actor, id, patch).await,
                "correspondence" => doc_update::<Correspondence>(service, actor, id, patch).await,
                "announcement" => doc_update::<Announcement>(service, actor, id, patch).await,
                "request" | "user_request" => {
                    doc_update::<UserRequest>(service, actor, id, patch).await
                }
                _ => Err(invalid_kind(&kind)),
            }
        }

        DocCommands::Delete { kind, id } => {
            let id = parse_id(&id)?;
            match kind.as_str() {
                "employee" => doc_delete::<Employee>(service, actor, id).await,
                "leave" | "leave_request" => doc_delete::<LeaveRequest>(service, actor, id).await,
                "holiday" | "public_holiday" => {
                    doc_delete::<PublicHoliday>(service, actor, id).await
                }
                "training" => doc_delete::<TrainingRecord>(service, actor, id).await,
                "correspondence" => doc_delete::<Correspondence>(service, actor, id).await,
                "announcement" => doc_delete::<Announcement>(service, actor, id).await,
                "request" | "user_request" => doc_delete::<UserRequest>(service, actor, id).await,
                _ => Err(invalid_kind(&kind)),
            }
        }
    }
}

async fn doc_add<T: Document>(
    service: &OfficeService,
    actor: &Actor,
    value: serde_json::Value,
) -> Result<()> {
    let data: T = serde_json::from_value(value)
        .with_context(|| format!("Invalid {} record", T::KIND))?;
    let doc = service.create_record(actor, data).await?;
    println!("Created {} {}", T::KIND, doc.id);
    Ok(())
}

async fn doc_list<T: Document>(
    service: &OfficeService,
    actor: &Actor,
    filter: &RecordFilter,
) -> Result<()> {
    let docs = service.list_records::<T>(actor, filter).await?;
    if docs.is_empty() {
        println!("No {} records found.", T::KIND);
        return Ok(());
    }

    println!("{:<36} {:<10} {:<12} {:<40}", "ID", "DATE", "STATUS", "SUMMARY");
    println!("{}", "-".repeat(101));
    for doc in docs {
        println!(
            "{:<36} {:<10} {:<12} {:<40}",
            doc.id,
            doc.effective_date().format("%Y-%m-%d"),
            doc.data.status().unwrap_or("-"),
            truncate(&doc.data.search_text(), 40)
        );
    }
    Ok(())
}

async fn doc_show<T: Document>(service: &OfficeService, actor: &Actor, id: Uuid) -> Result<()> {
    let doc = service.get_record::<T>(actor, id).await?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

async fn doc_update<T: Document>(
    service: &OfficeService,
    actor: &Actor,
    id: Uuid,
    patch: serde_json::Value,
) -> Result<()> {
    let doc = service.update_record::<T>(actor, id, patch).await?;
    println!("Updated {} {}", T::KIND, doc.id);
    Ok(())
}

async fn doc_delete<T: Document>(service: &OfficeService, actor: &Actor, id: Uuid) -> Result<()> {
    let doc = service.delete_record::<T>(actor, id).await?;
    println!("Deleted {} {}", T::KIND, doc.id);
    Ok(())
}

fn invalid_kind(kind: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Invalid record kind '{}'. Valid kinds: employee, leave, holiday, training, correspondence, announcement, request",
        kind
    )
}

async fn run_settings_command(
    service: &OfficeService,
    actor: &Actor,
    cmd: SettingsCommands,
) -> Result<()> {
    match cmd {
        SettingsCommands::Show => {
            let settings = service.get_settings().await?;
            print_settings(&settings);
        }

        SettingsCommands::Set {
            office,
            department,
            manager,
            ramadan_start,
            ramadan_end,
        } => {
            let mut settings = service.get_settings().await?;
            if let Some(office) = office {
                settings.office_name = office;
            }
            if let Some(department) = department {
                settings.department_name = department;
            }
            if let Some(manager) = manager {
                settings.manager_name = manager;
            }
            if let Some(start) = ramadan_start {
                settings.ramadan_start = Some(parse_naive_date(&start)?);
            }
            if let Some(end) = ramadan_end {
                settings.ramadan_end = Some(parse_naive_date(&end)?);
            }

            let saved = service.save_settings(actor, settings).await?;
            println!("Settings saved.");
            print_settings(&saved);
        }
    }
    Ok(())
}

fn print_settings(settings: &Settings) {
    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
    let date_or_dash =
        |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());

    println!("  Office:         {}", or_dash(&settings.office_name));
    println!("  Department:     {}", or_dash(&settings.department_name));
    println!("  Manager:        {}", or_dash(&settings.manager_name));
    println!("  Ramadan start:  {}", date_or_dash(settings.ramadan_start));
    println!("  Ramadan end:    {}", date_or_dash(settings.ramadan_end));
}

async fn run_export_command(
    service: &OfficeService,
    actor: &Actor,
    export_type: &str,
    month: Option<&str>,
    output: Option<&str>,
    format: &str,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service, actor);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "fleet" => {
            let month = match month {
                Some(m) => OfficeService::parse_month(m)?,
                None => crate::domain::YearMonth::of(Utc::now()),
            };
            let report = match format {
                "json" => exporter.export_fleet_report_json(month, writer).await?,
                "csv" => exporter.export_fleet_report_csv(month, writer).await?,
                _ => anyhow::bail!("Invalid format '{}'. Valid formats: csv, json", format),
            };
            if output.is_some() {
                eprintln!(
                    "Exported fleet report {}: {} vehicle(s)",
                    report.month,
                    report.lines.len()
                );
            }
        }
        "permits" => {
            let count = exporter.export_permits_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} permits", count);
            }
        }
        "fuel" => {
            let count = exporter.export_fuel_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} fuel expenses", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full database: {} vehicles, {} permits, {} fuel expenses, {} leave requests",
                    snapshot.vehicles.len(),
                    snapshot.permits.len(),
                    snapshot.fuel_expenses.len(),
                    snapshot.leave_requests.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: fleet, permits, fuel, full",
                export_type
            );
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("Invalid ID '{}' (expected UUID)", id))
}

fn parse_naive_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date_str))
}

/// Parse `YYYY-MM-DD` as UTC midnight.
fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    Ok(parse_naive_date(date_str)?.and_time(NaiveTime::MIN).and_utc())
}

fn parse_optional_date(date_str: Option<String>) -> Result<Option<DateTime<Utc>>> {
    date_str.map(|d| parse_date(&d)).transpose()
}

/// Accept either a full RFC 3339 timestamp or a plain date.
fn parse_optional_timestamp(input: Option<String>) -> Result<Option<DateTime<Utc>>> {
    input
        .map(|s| match DateTime::parse_from_rfc3339(&s) {
            Ok(ts) => Ok(ts.with_timezone(&Utc)),
            Err(_) => parse_date(&s),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Toyota Land Cruiser", 10), "Toyota ...");
        assert_eq!(truncate("سيارة نقل كبيرة", 8), "سيارة...");
    }

    #[test]
    fn test_timestamp_accepts_date_or_rfc3339() {
        let date = parse_optional_timestamp(Some("2024-01-15".into())).unwrap().unwrap();
        assert_eq!(date.to_rfc3339(), "2024-01-15T00:00:00+00:00");

        let ts = parse_optional_timestamp(Some("2024-01-15T08:30:00Z".into()))
            .unwrap()
            .unwrap();
        assert_eq!(ts.format("%H:%M").to_string(), "08:30");

        assert!(parse_optional_timestamp(Some("15/01/2024".into())).is_err());
        assert!(parse_optional_timestamp(None).unwrap().is_none());
    }

    #[test]
    fn test_cli_reads_actor_flags() {
        let cli = Cli::parse_from([
            "maktab",
            "--user",
            "Huda",
            "--role",
            "head",
            "vehicle",
            "list",
        ]);
        let actor = cli.actor().unwrap();
        assert_eq!(actor.name, "Huda");
        assert_eq!(actor.role, Role::HeadOfDepartment);
    }
}
