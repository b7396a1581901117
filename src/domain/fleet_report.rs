use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Cents, FuelExpense, Kilometres, Millilitres, Vehicle, VehicleId, compute_distance_segments,
    litres_f64,
};

/// Calendar month used as a report key, written as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month a timestamp falls in (UTC).
    pub fn of(timestamp: DateTime<Utc>) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        Self::of(timestamp) == *self
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseYearMonthError(String);

impl fmt::Display for ParseYearMonthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid month '{}', expected YYYY-MM", self.0)
    }
}

impl std::error::Error for ParseYearMonthError {}

impl FromStr for YearMonth {
    type Err = ParseYearMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseYearMonthError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(err());
        }
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Self::new(year, month).ok_or_else(err)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetReport {
    pub month: YearMonth,
    pub lines: Vec<FleetReportLine>,
    pub totals: FleetTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetReportLine {
    pub vehicle_id: VehicleId,
    pub vehicle_name: String,
    pub total_distance: Kilometres,
    pub total_liters: Millilitres,
    pub total_cost: Cents,
    /// Kilometres per litre, 0.0 when no fuel was attributed
    pub consumption: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetTotals {
    pub distance: Kilometres,
    pub liters: Millilitres,
    pub cost: Cents,
}

impl FleetTotals {
    pub fn consumption(&self) -> f64 {
        consumption(self.distance, self.liters)
    }
}

/// Kilometres per litre. Zero fuel yields 0.0 rather than NaN or infinity.
pub fn consumption(distance: Kilometres, liters: Millilitres) -> f64 {
    if liters > 0 {
        distance as f64 / litres_f64(liters)
    } else {
        0.0
    }
}

/// Build the fuel consumption report for one month.
///
/// Each vehicle's full expense history is walked in odometer order; a segment
/// counts toward `month` when its later expense is dated inside the month and
/// the distance is positive. That expense's litres and cost are attributed to
/// the same segment. Vehicles with nothing attributed are left out.
pub fn build_monthly_report(
    month: YearMonth,
    vehicles: &[Vehicle],
    expenses: &[FuelExpense],
) -> FleetReport {
    let mut lines = Vec::new();
    let mut totals = FleetTotals::default();

    for vehicle in vehicles {
        let mut distance = 0;
        let mut liters = 0;
        let mut cost = 0;

        for segment in compute_distance_segments(vehicle.id, expenses) {
            if segment.is_positive() && month.contains(segment.date) {
                distance += segment.distance;
                liters += segment.liters;
                cost += segment.cost;
            }
        }

        if distance == 0 && liters == 0 {
            continue;
        }

        totals.distance += distance;
        totals.liters += liters;
        totals.cost += cost;

        lines.push(FleetReportLine {
            vehicle_id: vehicle.id,
            vehicle_name: vehicle.display_name(),
            total_distance: distance,
            total_liters: liters,
            total_cost: cost,
            consumption: consumption(distance, liters),
        });
    }

    FleetReport {
        month,
        lines,
        totals,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
            .and_utc()
    }

    fn expense(
        vehicle: &Vehicle,
        date: DateTime<Utc>,
        reading: i64,
        liters: Millilitres,
        cost: Cents,
    ) -> FuelExpense {
        FuelExpense::new(Uuid::new_v4(), vehicle.id, date, liters, cost, reading)
    }

    fn january() -> YearMonth {
        "2024-01".parse().unwrap()
    }

    #[test]
    fn test_year_month_parse_and_display() {
        let month: YearMonth = "2024-03".parse().unwrap();
        assert_eq!(month.year(), 2024);
        assert_eq!(month.month(), 3);
        assert_eq!(month.to_string(), "2024-03");

        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("2024-1".parse::<YearMonth>().is_err());
        assert!("March".parse::<YearMonth>().is_err());
        assert!(YearMonth::new(2024, 0).is_none());
    }

    #[test]
    fn test_year_month_contains() {
        let month = january();
        assert!(month.contains(day(2024, 1, 1)));
        assert!(month.contains(day(2024, 1, 31)));
        assert!(!month.contains(day(2024, 2, 1)));
        assert!(!month.contains(day(2023, 1, 15)));
    }

    #[test]
    fn test_january_scenario() {
        let vehicle = Vehicle::new("Pickup", "X-1");
        let expenses = vec![
            expense(&vehicle, day(2024, 1, 10), 1_000, 10_000, 300),
            expense(&vehicle, day(2024, 1, 20), 1_200, 15_000, 450),
        ];

        let report = build_monthly_report(january(), &[vehicle.clone()], &expenses);

        assert_eq!(report.lines.len(), 1);
        let line = &report.lines[0];
        assert_eq!(line.vehicle_name, "Pickup (X-1)");
        assert_eq!(line.total_distance, 200);
        assert_eq!(line.total_liters, 15_000);
        assert_eq!(line.total_cost, 450);
        assert!((line.consumption - 200.0 / 15.0).abs() < 1e-9);

        assert_eq!(
            report.totals,
            FleetTotals {
                distance: 200,
                liters: 15_000,
                cost: 450
            }
        );
    }

    #[test]
    fn test_vehicle_without_expenses_is_excluded() {
        let idle = Vehicle::new("Sedan", "IDLE");
        let report = build_monthly_report(january(), &[idle], &[]);

        assert!(report.lines.is_empty());
        assert_eq!(report.totals, FleetTotals::default());
    }

    #[test]
    fn test_distance_attributed_to_month_of_later_reading() {
        let vehicle = Vehicle::new("Minibus", "M-7");
        let expenses = vec![
            expense(&vehicle, day(2023, 12, 28), 5_000, 40_000, 1_200),
            expense(&vehicle, day(2024, 1, 3), 5_350, 30_000, 900),
            expense(&vehicle, day(2024, 2, 2), 5_700, 35_000, 1_050),
        ];

        let report = build_monthly_report(january(), &[vehicle], &expenses);

        assert_eq!(report.lines.len(), 1);
        assert_eq!(report.lines[0].total_distance, 350);
        assert_eq!(report.lines[0].total_liters, 30_000);
        assert_eq!(report.lines[0].total_cost, 900);
    }

    #[test]
    fn test_non_positive_segment_contributes_nothing() {
        let vehicle = Vehicle::new("Pickup", "Z-9");
        let expenses = vec![
            expense(&vehicle, day(2024, 1, 5), 2_000, 20_000, 600),
            expense(&vehicle, day(2024, 1, 6), 2_000, 5_000, 150),
        ];

        let report = build_monthly_report(january(), &[vehicle], &expenses);

        assert!(report.lines.is_empty());
        assert_eq!(report.totals, FleetTotals::default());
    }

    #[test]
    fn test_fleet_totals_sum_lines() {
        let a = Vehicle::new("Pickup", "A");
        let b = Vehicle::new("Sedan", "B");
        let expenses = vec![
            expense(&a, day(2024, 1, 1), 100, 10_000, 300),
            expense(&a, day(2024, 1, 15), 400, 20_000, 600),
            expense(&b, day(2024, 1, 2), 7_000, 8_000, 240),
            expense(&b, day(2024, 1, 20), 7_250, 12_500, 375),
        ];

        let report = build_monthly_report(january(), &[a, b], &expenses);

        assert_eq!(report.lines.len(), 2);
        assert_eq!(report.totals.distance, 550);
        assert_eq!(report.totals.liters, 32_500);
        assert_eq!(report.totals.cost, 975);
        let line_sum: i64 = report.lines.iter().map(|l| l.total_distance).sum();
        assert_eq!(line_sum, report.totals.distance);
    }

    #[test]
    fn test_expenses_of_unknown_vehicles_are_ignored() {
        let known = Vehicle::new("Pickup", "K");
        let orphan = Vehicle::new("Sedan", "gone");
        let expenses = vec![
            expense(&orphan, day(2024, 1, 1), 0, 10_000, 300),
            expense(&orphan, day(2024, 1, 9), 300, 10_000, 300),
        ];

        let report = build_monthly_report(january(), &[known], &expenses);
        assert!(report.lines.is_empty());
    }

    #[test]
    fn test_consumption_with_zero_liters() {
        assert_eq!(consumption(250, 0), 0.0);
        assert_eq!(consumption(0, 0), 0.0);
        assert!((consumption(300, 20_000) - 15.0).abs() < 1e-9);
        assert_eq!(FleetTotals::default().consumption(), 0.0);
    }

    #[test]
    fn test_report_is_idempotent() {
        let vehicle = Vehicle::new("Pickup", "X-1");
        let vehicles = vec![vehicle.clone()];
        let expenses = vec![
            expense(&vehicle, day(2024, 1, 10), 1_000, 10_000, 300),
            expense(&vehicle, day(2024, 1, 20), 1_200, 15_000, 450),
        ];

        let first = build_monthly_report(january(), &vehicles, &expenses);
        let second = build_monthly_report(january(), &vehicles, &expenses);
        assert_eq!(first, second);
    }
}
