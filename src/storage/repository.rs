use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Document, DocumentId, FuelExpense, FuelExpenseId, PermitId, StoredDocument, Vehicle,
    VehicleId, VehiclePermit,
};

use super::{MIGRATION_001_FLEET, MIGRATION_002_DOCUMENTS};

const PERMIT_COLUMNS: &str = "id, permit_number, employee_name, vehicle_id, purpose, destination, start_date, end_date, odometer_out, odometer_in, created_at";

const FUEL_COLUMNS: &str = "id, permit_id, vehicle_id, date, liters, cost, odometer_reading, station_name, created_at";

/// Repository for persisting the fleet ledger and the office document store.
///
/// Every method is a single independent statement; concurrent edits of the
/// same record resolve as last write wins.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_FLEET)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::raw_sql(MIGRATION_002_DOCUMENTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Get the next value of a named counter and increment it.
    async fn next_sequence(&self, name: &str) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = ?
            RETURNING value
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to get next value of sequence '{}'", name))?;

        Ok(row.get("value"))
    }

    // ========================
    // Vehicle operations
    // ========================

    pub async fn save_vehicle(&self, vehicle: &Vehicle) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO vehicles (id, vehicle_type, plate_number, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(vehicle.id.to_string())
        .bind(&vehicle.vehicle_type)
        .bind(&vehicle.plate_number)
        .bind(vehicle.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save vehicle")?;
        Ok(())
    }

    pub async fn update_vehicle(&self, vehicle: &Vehicle) -> Result<()> {
        sqlx::query("UPDATE vehicles SET vehicle_type = ?, plate_number = ? WHERE id = ?")
            .bind(&vehicle.vehicle_type)
            .bind(&vehicle.plate_number)
            .bind(vehicle.id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update vehicle")?;
        Ok(())
    }

    pub async fn get_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>> {
        let row = sqlx::query(
            "SELECT id, vehicle_type, plate_number, created_at FROM vehicles WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch vehicle")?;

        row.as_ref().map(Self::row_to_vehicle).transpose()
    }

    pub async fn get_vehicle_by_plate(&self, plate_number: &str) -> Result<Option<Vehicle>> {
        let row = sqlx::query(
            "SELECT id, vehicle_type, plate_number, created_at FROM vehicles WHERE plate_number = ?",
        )
        .bind(plate_number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch vehicle by plate")?;

        row.as_ref().map(Self::row_to_vehicle).transpose()
    }

    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        let rows = sqlx::query(
            "SELECT id, vehicle_type, plate_number, created_at FROM vehicles ORDER BY plate_number",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list vehicles")?;

        rows.iter().map(Self::row_to_vehicle).collect()
    }

    /// Delete a vehicle. Permits and fuel expenses referencing it are kept.
    /// Returns false if no such vehicle existed.
    pub async fn delete_vehicle(&self, id: VehicleId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete vehicle")?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_vehicle(row: &sqlx::sqlite::SqliteRow) -> Result<Vehicle> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Vehicle {
            id: Uuid::parse_str(&id_str).context("Invalid vehicle ID")?,
            vehicle_type: row.get("vehicle_type"),
            plate_number: row.get("plate_number"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
        })
    }

    // ========================
    // Permit operations
    // ========================

    /// Save a new permit. Assigns the next permit number.
    pub async fn save_permit(&self, permit: &mut VehiclePermit) -> Result<()> {
        permit.permit_number = self.next_sequence("permit_number").await?;

        sqlx::query(
            r#"
            INSERT INTO vehicle_permits (id, permit_number, employee_name, vehicle_id, purpose, destination, start_date, end_date, odometer_out, odometer_in, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(permit.id.to_string())
        .bind(permit.permit_number)
        .bind(&permit.employee_name)
        .bind(permit.vehicle_id.to_string())
        .bind(&permit.purpose)
        .bind(&permit.destination)
        .bind(permit.start_date.to_rfc3339())
        .bind(permit.end_date.map(|dt| dt.to_rfc3339()))
        .bind(permit.odometer_out)
        .bind(permit.odometer_in)
        .bind(permit.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save permit")?;

        Ok(())
    }

    /// Overwrite every mutable column of a permit. The permit number is never touched.
    pub async fn update_permit(&self, permit: &VehiclePermit) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE vehicle_permits
            SET employee_name = ?, vehicle_id = ?, purpose = ?, destination = ?,
                start_date = ?, end_date = ?, odometer_out = ?, odometer_in = ?
            WHERE id = ?
            "#,
        )
        .bind(&permit.employee_name)
        .bind(permit.vehicle_id.to_string())
        .bind(&permit.purpose)
        .bind(&permit.destination)
        .bind(permit.start_date.to_rfc3339())
        .bind(permit.end_date.map(|dt| dt.to_rfc3339()))
        .bind(permit.odometer_out)
        .bind(permit.odometer_in)
        .bind(permit.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update permit")?;
        Ok(())
    }

    pub async fn get_permit(&self, id: PermitId) -> Result<Option<VehiclePermit>> {
        let query = format!("SELECT {} FROM vehicle_permits WHERE id = ?", PERMIT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch permit")?;

        row.as_ref().map(Self::row_to_permit).transpose()
    }

    pub async fn get_permit_by_number(&self, permit_number: i64) -> Result<Option<VehiclePermit>> {
        let query = format!(
            "SELECT {} FROM vehicle_permits WHERE permit_number = ?",
            PERMIT_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(permit_number)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch permit by number")?;

        row.as_ref().map(Self::row_to_permit).transpose()
    }

    /// List all permits, ordered by permit number.
    pub async fn list_permits(&self) -> Result<Vec<VehiclePermit>> {
        let query = format!(
            "SELECT {} FROM vehicle_permits ORDER BY permit_number",
            PERMIT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list permits")?;

        rows.iter().map(Self::row_to_permit).collect()
    }

    pub async fn list_permits_for_vehicle(&self, vehicle_id: VehicleId) -> Result<Vec<VehiclePermit>> {
        let query = format!(
            "SELECT {} FROM vehicle_permits WHERE vehicle_id = ? ORDER BY permit_number",
            PERMIT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(vehicle_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list permits for vehicle")?;

        rows.iter().map(Self::row_to_permit).collect()
    }

    /// Delete a permit. Fuel expenses referencing it are kept.
    pub async fn delete_permit(&self, id: PermitId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM vehicle_permits WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete permit")?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_permit(row: &sqlx::sqlite::SqliteRow) -> Result<VehiclePermit> {
        let id_str: String = row.get("id");
        let vehicle_id_str: String = row.get("vehicle_id");
        let start_date_str: String = row.get("start_date");
        let end_date_str: Option<String> = row.get("end_date");
        let created_at_str: String = row.get("created_at");

        Ok(VehiclePermit {
            id: Uuid::parse_str(&id_str).context("Invalid permit ID")?,
            permit_number: row.get("permit_number"),
            employee_name: row.get("employee_name"),
            vehicle_id: Uuid::parse_str(&vehicle_id_str).context("Invalid vehicle ID")?,
            purpose: row.get("purpose"),
            destination: row.get("destination"),
            start_date: parse_timestamp(&start_date_str).context("Invalid start_date")?,
            end_date: end_date_str
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .context("Invalid end_date")?,
            odometer_out: row.get("odometer_out"),
            odometer_in: row.get("odometer_in"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
        })
    }

    // ========================
    // Fuel expense operations
    // ========================

    pub async fn save_fuel_expense(&self, expense: &FuelExpense) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fuel_expenses (id, permit_id, vehicle_id, date, liters, cost, odometer_reading, station_name, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(expense.permit_id.to_string())
        .bind(expense.vehicle_id.to_string())
        .bind(expense.date.to_rfc3339())
        .bind(expense.liters)
        .bind(expense.cost)
        .bind(expense.odometer_reading)
        .bind(&expense.station_name)
        .bind(expense.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save fuel expense")?;
        Ok(())
    }

    /// Overwrite the editable columns. Permit and vehicle references are fixed at creation.
    pub async fn update_fuel_expense(&self, expense: &FuelExpense) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE fuel_expenses
            SET date = ?, liters = ?, cost = ?, odometer_reading = ?, station_name = ?
            WHERE id = ?
            "#,
        )
        .bind(expense.date.to_rfc3339())
        .bind(expense.liters)
        .bind(expense.cost)
        .bind(expense.odometer_reading)
        .bind(&expense.station_name)
        .bind(expense.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update fuel expense")?;
        Ok(())
    }

    pub async fn get_fuel_expense(&self, id: FuelExpenseId) -> Result<Option<FuelExpense>> {
        let query = format!("SELECT {} FROM fuel_expenses WHERE id = ?", FUEL_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch fuel expense")?;

        row.as_ref().map(Self::row_to_fuel_expense).transpose()
    }

    /// List all fuel expenses. Callers sort as they need; odometer math sorts by reading.
    pub async fn list_fuel_expenses(&self) -> Result<Vec<FuelExpense>> {
        let query = format!("SELECT {} FROM fuel_expenses ORDER BY date", FUEL_COLUMNS);
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list fuel expenses")?;

        rows.iter().map(Self::row_to_fuel_expense).collect()
    }

    pub async fn list_fuel_expenses_for_vehicle(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Vec<FuelExpense>> {
        let query = format!(
            "SELECT {} FROM fuel_expenses WHERE vehicle_id = ? ORDER BY date",
            FUEL_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(vehicle_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list fuel expenses for vehicle")?;

        rows.iter().map(Self::row_to_fuel_expense).collect()
    }

    pub async fn delete_fuel_expense(&self, id: FuelExpenseId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM fuel_expenses WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete fuel expense")?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_fuel_expense(row: &sqlx::sqlite::SqliteRow) -> Result<FuelExpense> {
        let id_str: String = row.get("id");
        let permit_id_str: String = row.get("permit_id");
        let vehicle_id_str: String = row.get("vehicle_id");
        let date_str: String = row.get("date");
        let created_at_str: String = row.get("created_at");

        Ok(FuelExpense {
            id: Uuid::parse_str(&id_str).context("Invalid fuel expense ID")?,
            permit_id: Uuid::parse_str(&permit_id_str).context("Invalid permit ID")?,
            vehicle_id: Uuid::parse_str(&vehicle_id_str).context("Invalid vehicle ID")?,
            date: parse_timestamp(&date_str).context("Invalid date")?,
            liters: row.get("liters"),
            cost: row.get("cost"),
            odometer_reading: row.get("odometer_reading"),
            station_name: row.get("station_name"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
        })
    }

    // ========================
    // Document store
    // ========================

    pub async fn insert_document<T: Document>(&self, doc: &StoredDocument<T>) -> Result<()> {
        let payload = serde_json::to_string(&doc.data)
            .with_context(|| format!("Failed to serialize {}", T::KIND))?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, kind, payload, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(doc.id.to_string())
        .bind(T::KIND)
        .bind(&payload)
        .bind(doc.created_at.to_rfc3339())
        .bind(doc.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save {}", T::KIND))?;
        Ok(())
    }

    /// Overwrite the payload of an existing document and bump `updated_at`.
    pub async fn replace_document<T: Document>(&self, doc: &StoredDocument<T>) -> Result<bool> {
        let payload = serde_json::to_string(&doc.data)
            .with_context(|| format!("Failed to serialize {}", T::KIND))?;

        let result = sqlx::query(
            "UPDATE documents SET payload = ?, updated_at = ? WHERE id = ? AND kind = ?",
        )
        .bind(&payload)
        .bind(doc.updated_at.to_rfc3339())
        .bind(doc.id.to_string())
        .bind(T::KIND)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update {}", T::KIND))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_document<T: Document>(
        &self,
        id: DocumentId,
    ) -> Result<Option<StoredDocument<T>>> {
        let row = sqlx::query(
            "SELECT id, payload, created_at, updated_at FROM documents WHERE id = ? AND kind = ?",
        )
        .bind(id.to_string())
        .bind(T::KIND)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch {}", T::KIND))?;

        row.as_ref().map(Self::row_to_document::<T>).transpose()
    }

    /// All documents of one kind, oldest first.
    pub async fn list_documents<T: Document>(&self) -> Result<Vec<StoredDocument<T>>> {
        let rows = sqlx::query(
            "SELECT id, payload, created_at, updated_at FROM documents WHERE kind = ? ORDER BY created_at",
        )
        .bind(T::KIND)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to list {}", T::KIND))?;

        rows.iter().map(Self::row_to_document::<T>).collect()
    }

    pub async fn delete_document<T: Document>(&self, id: DocumentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ? AND kind = ?")
            .bind(id.to_string())
            .bind(T::KIND)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {}", T::KIND))?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_document<T: Document>(row: &sqlx::sqlite::SqliteRow) -> Result<StoredDocument<T>> {
        let id_str: String = row.get("id");
        let payload: String = row.get("payload");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(StoredDocument {
            id: Uuid::parse_str(&id_str).context("Invalid document ID")?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
            updated_at: parse_timestamp(&updated_at_str).context("Invalid updated_at")?,
            data: serde_json::from_str(&payload)
                .with_context(|| format!("Corrupt {} payload", T::KIND))?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
