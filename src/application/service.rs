use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    Action, Actor, DistanceSegment, FleetReport, FuelExpense, FuelExpenseId, Kilometres,
    PermitId, PermitState, Vehicle, VehicleId, VehiclePermit, YearMonth, build_monthly_report,
    can_manage, compute_distance_segments, resolve_opening_odometer,
};
use crate::storage::Repository;

use super::views::{FuelExpenseView, PermitView, fuel_expense_views, permit_views};
use super::{
    AppError, CheckinPermitRequest, CreateFuelExpenseRequest, CreatePermitRequest,
    CreateVehicleRequest, UpdateFuelExpenseRequest, UpdatePermitRequest, UpdateVehicleRequest,
};

/// Application service providing the office's use cases.
/// This is the primary interface for any client (CLI, API, UI, etc.).
pub struct OfficeService {
    pub(super) repo: Repository,
}

/// Result of checking a vehicle back in
pub struct CheckinResult {
    pub permit: VehiclePermit,
    /// Return reading was lower than the checkout reading
    pub inconsistent_reading: bool,
}

/// Current availability of one vehicle
pub struct VehicleStatus {
    pub vehicle: Vehicle,
    pub open_permit: Option<VehiclePermit>,
    /// What the next checkout will default its odometer to
    pub opening_odometer: Kilometres,
}

/// Filter for querying permits
#[derive(Debug, Clone, Default)]
pub struct PermitFilter {
    pub vehicle_id: Option<VehicleId>,
    pub state: Option<PermitState>,
    pub employee_name: Option<String>,
    /// Matched against the permit's start date
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

impl PermitFilter {
    pub fn matches(&self, permit: &VehiclePermit) -> bool {
        self.vehicle_id.is_none_or(|id| permit.vehicle_id == id)
            && self.state.is_none_or(|state| permit.state() == state)
            && self
                .employee_name
                .as_deref()
                .is_none_or(|name| permit.employee_name.eq_ignore_ascii_case(name))
            && self.from_date.is_none_or(|from| permit.start_date >= from)
            && self.to_date.is_none_or(|to| permit.start_date <= to)
    }
}

/// Filter for querying fuel expenses
#[derive(Debug, Clone, Default)]
pub struct FuelExpenseFilter {
    pub vehicle_id: Option<VehicleId>,
    pub permit_id: Option<PermitId>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

impl FuelExpenseFilter {
    pub fn matches(&self, expense: &FuelExpense) -> bool {
        self.vehicle_id.is_none_or(|id| expense.vehicle_id == id)
            && self.permit_id.is_none_or(|id| expense.permit_id == id)
            && self.from_date.is_none_or(|from| expense.date >= from)
            && self.to_date.is_none_or(|to| expense.date <= to)
    }
}

impl OfficeService {
    /// Create a new office service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    pub(super) fn authorize(actor: &Actor, action: Action) -> Result<(), AppError> {
        if can_manage(actor, action) {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                role: actor.role,
                action,
            })
        }
    }

    /// Parse a `YYYY-MM` report key.
    pub fn parse_month(input: &str) -> Result<YearMonth, AppError> {
        input
            .parse()
            .map_err(|e: crate::domain::ParseYearMonthError| AppError::InvalidMonth(e.to_string()))
    }

    // ========================
    // Vehicle operations
    // ========================

    /// Register a vehicle. Plate numbers are unique.
    pub async fn create_vehicle(
        &self,
        actor: &Actor,
        request: CreateVehicleRequest,
    ) -> Result<Vehicle, AppError> {
        Self::authorize(actor, Action::ManageFleet)?;
        request.validate()?;

        if self
            .repo
            .get_vehicle_by_plate(&request.plate_number)
            .await?
            .is_some()
        {
            return Err(AppError::VehicleAlreadyExists(request.plate_number));
        }

        let vehicle = Vehicle::new(request.vehicle_type, request.plate_number);
        self.repo.save_vehicle(&vehicle).await?;
        info!(vehicle_id = %vehicle.id, plate = %vehicle.plate_number, "Registered vehicle");
        Ok(vehicle)
    }

    pub async fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle, AppError> {
        self.repo
            .get_vehicle(id)
            .await?
            .ok_or_else(|| AppError::VehicleNotFound(id.to_string()))
    }

    /// Look a vehicle up by plate number, falling back to its ID.
    pub async fn find_vehicle(&self, key: &str) -> Result<Vehicle, AppError> {
        if let Some(vehicle) = self.repo.get_vehicle_by_plate(key).await? {
            return Ok(vehicle);
        }
        match Uuid::parse_str(key) {
            Ok(id) => self.get_vehicle(id).await,
            Err(_) => Err(AppError::VehicleNotFound(key.to_string())),
        }
    }

    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>, AppError> {
        Ok(self.repo.list_vehicles().await?)
    }

    pub async fn update_vehicle(
        &self,
        actor: &Actor,
        id: VehicleId,
        request: UpdateVehicleRequest,
    ) -> Result<Vehicle, AppError> {
        Self::authorize(actor, Action::ManageFleet)?;
        request.validate()?;

        let mut vehicle = self.get_vehicle(id).await?;
        if let Some(plate_number) = request.plate_number {
            if plate_number != vehicle.plate_number
                && self.repo.get_vehicle_by_plate(&plate_number).await?.is_some()
            {
                return Err(AppError::VehicleAlreadyExists(plate_number));
            }
            vehicle.plate_number = plate_number;
        }
        if let Some(vehicle_type) = request.vehicle_type {
            vehicle.vehicle_type = vehicle_type;
        }

        self.repo.update_vehicle(&vehicle).await?;
        info!(vehicle_id = %vehicle.id, "Updated vehicle");
        Ok(vehicle)
    }

    /// Delete a vehicle. Its permits and fuel expenses stay behind as orphans.
    pub async fn delete_vehicle(&self, actor: &Actor, id: VehicleId) -> Result<Vehicle, AppError> {
        Self::authorize(actor, Action::ManageFleet)?;
        let vehicle = self.get_vehicle(id).await?;

        let orphaned = self.repo.list_permits_for_vehicle(id).await?.len();
        if !self.repo.delete_vehicle(id).await? {
            return Err(AppError::VehicleNotFound(id.to_string()));
        }

        if orphaned > 0 {
            warn!(vehicle_id = %id, orphaned, "Deleted vehicle still referenced by permits");
        }
        info!(vehicle_id = %id, plate = %vehicle.plate_number, "Deleted vehicle");
        Ok(vehicle)
    }

    /// Availability board: every vehicle with its open permit, if any.
    pub async fn vehicle_statuses(&self) -> Result<Vec<VehicleStatus>, AppError> {
        let vehicles = self.repo.list_vehicles().await?;
        let permits = self.repo.list_permits().await?;

        Ok(vehicles
            .into_iter()
            .map(|vehicle| {
                let open_permit = permits
                    .iter()
                    .filter(|p| p.vehicle_id == vehicle.id && p.is_open())
                    .max_by_key(|p| p.start_date)
                    .cloned();
                let opening_odometer = resolve_opening_odometer(vehicle.id, &permits);
                VehicleStatus {
                    vehicle,
                    open_permit,
                    opening_odometer,
                }
            })
            .collect())
    }

    // ========================
    // Permit operations
    // ========================

    /// Odometer value a new permit for this vehicle starts from.
    pub async fn opening_odometer(&self, vehicle_id: VehicleId) -> Result<Kilometres, AppError> {
        let permits = self.repo.list_permits_for_vehicle(vehicle_id).await?;
        Ok(resolve_opening_odometer(vehicle_id, &permits))
    }

    /// Check a vehicle out. Open to every user.
    pub async fn checkout(
        &self,
        actor: &Actor,
        request: CreatePermitRequest,
    ) -> Result<VehiclePermit, AppError> {
        request.validate()?;
        let vehicle = self.get_vehicle(request.vehicle_id).await?;
        let permits = self.repo.list_permits_for_vehicle(vehicle.id).await?;

        if let Some(open) = permits.iter().find(|p| p.is_open()) {
            if !request.force {
                return Err(AppError::VehicleInUse {
                    plate_number: vehicle.plate_number,
                    permit_number: open.permit_number,
                });
            }
            warn!(
                plate = %vehicle.plate_number,
                open_permit = open.permit_number,
                "Forced checkout of a vehicle that is still out"
            );
        }

        let odometer_out = request
            .odometer_out
            .unwrap_or_else(|| resolve_opening_odometer(vehicle.id, &permits));

        let mut permit = VehiclePermit::checkout(
            request.employee_name,
            vehicle.id,
            request.purpose,
            request.start_date,
            odometer_out,
        )
        .with_destination(request.destination);

        self.repo.save_permit(&mut permit).await?;
        info!(
            permit_number = permit.permit_number,
            plate = %vehicle.plate_number,
            odometer_out,
            by = %actor.name,
            "Vehicle checked out"
        );
        Ok(permit)
    }

    /// Record a vehicle's return. A reading below the checkout reading is
    /// stored as entered and flagged in the result.
    pub async fn checkin(
        &self,
        actor: &Actor,
        permit_id: PermitId,
        request: CheckinPermitRequest,
    ) -> Result<CheckinResult, AppError> {
        request.validate()?;
        let mut permit = self.get_permit(permit_id).await?;

        if let Some(odometer_in) = permit.odometer_in {
            return Err(AppError::PermitAlreadyClosed {
                permit_number: permit.permit_number,
                odometer_in,
            });
        }

        permit.checkin(request.end_date, request.odometer_in);
        self.repo.update_permit(&permit).await?;

        let inconsistent_reading = permit.has_inconsistent_reading();
        if inconsistent_reading {
            warn!(
                permit_number = permit.permit_number,
                odometer_out = permit.odometer_out,
                odometer_in = request.odometer_in,
                "Return reading is below checkout reading"
            );
        }
        info!(
            permit_number = permit.permit_number,
            distance = ?permit.distance(),
            by = %actor.name,
            "Vehicle checked in"
        );

        Ok(CheckinResult {
            permit,
            inconsistent_reading,
        })
    }

    /// Administrative edit of any permit field except its number.
    pub async fn update_permit(
        &self,
        actor: &Actor,
        permit_id: PermitId,
        request: UpdatePermitRequest,
    ) -> Result<VehiclePermit, AppError> {
        Self::authorize(actor, Action::EditPermit)?;
        request.validate()?;

        let mut permit = self.get_permit(permit_id).await?;
        if let Some(vehicle_id) = request.vehicle_id {
            self.get_vehicle(vehicle_id).await?;
            permit.vehicle_id = vehicle_id;
        }
        if let Some(employee_name) = request.employee_name {
            permit.employee_name = employee_name;
        }
        if let Some(purpose) = request.purpose {
            permit.purpose = purpose;
        }
        if let Some(destination) = request.destination {
            permit.destination = destination;
        }
        if let Some(start_date) = request.start_date {
            permit.start_date = start_date;
        }
        if let Some(end_date) = request.end_date {
            permit.end_date = Some(end_date);
        }
        if let Some(odometer_out) = request.odometer_out {
            permit.odometer_out = odometer_out;
        }
        if let Some(odometer_in) = request.odometer_in {
            permit.odometer_in = Some(odometer_in);
        }
        // Closing readings without an end date would leave the permit out of odometer resolution
        if permit.odometer_in.is_some() && permit.end_date.is_none() {
            return Err(AppError::InvalidInput(format!(
                "permit {} has a return reading but no end date",
                permit.permit_number
            )));
        }

        self.repo.update_permit(&permit).await?;
        if permit.has_inconsistent_reading() {
            warn!(permit_number = permit.permit_number, "Edited permit has inconsistent readings");
        }
        info!(permit_number = permit.permit_number, by = %actor.name, "Updated permit");
        Ok(permit)
    }

    /// Delete a permit. Fuel expenses recorded under it are kept.
    pub async fn delete_permit(
        &self,
        actor: &Actor,
        permit_id: PermitId,
    ) -> Result<VehiclePermit, AppError> {
        Self::authorize(actor, Action::EditPermit)?;
        let permit = self.get_permit(permit_id).await?;
        if !self.repo.delete_permit(permit_id).await? {
            return Err(AppError::PermitNotFound(permit_id.to_string()));
        }
        info!(permit_number = permit.permit_number, by = %actor.name, "Deleted permit");
        Ok(permit)
    }

    pub async fn get_permit(&self, id: PermitId) -> Result<VehiclePermit, AppError> {
        self.repo
            .get_permit(id)
            .await?
            .ok_or_else(|| AppError::PermitNotFound(id.to_string()))
    }

    pub async fn get_permit_by_number(&self, permit_number: i64) -> Result<VehiclePermit, AppError> {
        self.repo
            .get_permit_by_number(permit_number)
            .await?
            .ok_or_else(|| AppError::PermitNotFound(format!("#{}", permit_number)))
    }

    pub async fn list_permits(&self, filter: &PermitFilter) -> Result<Vec<VehiclePermit>, AppError> {
        let permits = match filter.vehicle_id {
            Some(vehicle_id) => self.repo.list_permits_for_vehicle(vehicle_id).await?,
            None => self.repo.list_permits().await?,
        };
        Ok(permits.into_iter().filter(|p| filter.matches(p)).collect())
    }

    /// Permits joined with their vehicles for display.
    pub async fn list_permit_views(&self, filter: &PermitFilter) -> Result<Vec<PermitView>, AppError> {
        let permits = self.list_permits(filter).await?;
        let vehicles = self.repo.list_vehicles().await?;
        Ok(permit_views(&permits, &vehicles))
    }

    // ========================
    // Fuel expense operations
    // ========================

    /// Record a refuelling under a permit. The vehicle is taken from the permit.
    pub async fn record_fuel_expense(
        &self,
        actor: &Actor,
        request: CreateFuelExpenseRequest,
    ) -> Result<FuelExpense, AppError> {
        request.validate()?;
        let permit = self.get_permit(request.permit_id).await?;

        let expense = FuelExpense::new(
            permit.id,
            permit.vehicle_id,
            request.date,
            request.liters,
            request.cost,
            request.odometer_reading,
        )
        .with_station(request.station_name);

        self.repo.save_fuel_expense(&expense).await?;
        if expense.odometer_reading < permit.odometer_out {
            debug!(
                expense_id = %expense.id,
                permit_number = permit.permit_number,
                "Fuel reading is below the permit's checkout reading"
            );
        }
        info!(
            expense_id = %expense.id,
            permit_number = permit.permit_number,
            liters = expense.liters,
            cost = expense.cost,
            by = %actor.name,
            "Recorded fuel expense"
        );
        Ok(expense)
    }

    pub async fn get_fuel_expense(&self, id: FuelExpenseId) -> Result<FuelExpense, AppError> {
        self.repo
            .get_fuel_expense(id)
            .await?
            .ok_or_else(|| AppError::FuelExpenseNotFound(id.to_string()))
    }

    pub async fn update_fuel_expense(
        &self,
        actor: &Actor,
        id: FuelExpenseId,
        request: UpdateFuelExpenseRequest,
    ) -> Result<FuelExpense, AppError> {
        Self::authorize(actor, Action::ManageFuelExpenses)?;
        request.validate()?;

        let mut expense = self.get_fuel_expense(id).await?;
        if let Some(date) = request.date {
            expense.date = date;
        }
        if let Some(liters) = request.liters {
            expense.liters = liters;
        }
        if let Some(cost) = request.cost {
            expense.cost = cost;
        }
        if let Some(odometer_reading) = request.odometer_reading {
            expense.odometer_reading = odometer_reading;
        }
        if let Some(station_name) = request.station_name {
            expense.station_name = station_name;
        }

        self.repo.update_fuel_expense(&expense).await?;
        info!(expense_id = %expense.id, by = %actor.name, "Updated fuel expense");
        Ok(expense)
    }

    pub async fn delete_fuel_expense(
        &self,
        actor: &Actor,
        id: FuelExpenseId,
    ) -> Result<FuelExpense, AppError> {
        Self::authorize(actor, Action::ManageFuelExpenses)?;
        let expense = self.get_fuel_expense(id).await?;
        if !self.repo.delete_fuel_expense(id).await? {
            return Err(AppError::FuelExpenseNotFound(id.to_string()));
        }
        info!(expense_id = %id, by = %actor.name, "Deleted fuel expense");
        Ok(expense)
    }

    pub async fn list_fuel_expenses(
        &self,
        filter: &FuelExpenseFilter,
    ) -> Result<Vec<FuelExpense>, AppError> {
        let expenses = match filter.vehicle_id {
            Some(vehicle_id) => self.repo.list_fuel_expenses_for_vehicle(vehicle_id).await?,
            None => self.repo.list_fuel_expenses().await?,
        };
        Ok(expenses.into_iter().filter(|e| filter.matches(e)).collect())
    }

    pub async fn list_fuel_expense_views(
        &self,
        filter: &FuelExpenseFilter,
    ) -> Result<Vec<FuelExpenseView>, AppError> {
        let expenses = self.list_fuel_expenses(filter).await?;
        let permits = self.repo.list_permits().await?;
        let vehicles = self.repo.list_vehicles().await?;
        Ok(fuel_expense_views(&expenses, &permits, &vehicles))
    }

    /// The odometer chain of one vehicle.
    pub async fn distance_segments(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Vec<DistanceSegment>, AppError> {
        let expenses = self.repo.list_fuel_expenses_for_vehicle(vehicle_id).await?;
        Ok(compute_distance_segments(vehicle_id, &expenses))
    }

    // ========================
    // Reports
    // ========================

    /// Fuel consumption per vehicle for one month.
    pub async fn monthly_fleet_report(&self, month: YearMonth) -> Result<FleetReport, AppError> {
        let vehicles = self.repo.list_vehicles().await?;
        let expenses = self.repo.list_fuel_expenses().await?;

        let report = build_monthly_report(month, &vehicles, &expenses);
        debug!(
            %month,
            vehicles = vehicles.len(),
            expenses = expenses.len(),
            lines = report.lines.len(),
            "Built monthly fleet report"
        );
        Ok(report)
    }
}
