use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Kilometres, VehicleId};

pub type PermitId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermitState {
    /// Vehicle is checked out, no return reading yet
    Open,
    /// Vehicle has been returned
    Closed,
}

impl PermitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermitState::Open => "open",
            PermitState::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(PermitState::Open),
            "closed" => Some(PermitState::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PermitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One checkout/check-in cycle of a vehicle by an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehiclePermit {
    pub id: PermitId,
    /// Display number, assigned by the repository at creation
    pub permit_number: i64,
    pub employee_name: String,
    /// Reference only; the vehicle may since have been deleted
    pub vehicle_id: VehicleId,
    pub purpose: String,
    pub destination: String,
    pub start_date: DateTime<Utc>,
    /// Absent while the vehicle is still checked out
    pub end_date: Option<DateTime<Utc>>,
    pub odometer_out: Kilometres,
    /// Present once the vehicle has returned
    pub odometer_in: Option<Kilometres>,
    pub created_at: DateTime<Utc>,
}

impl VehiclePermit {
    /// Create an open permit. Permit number must be assigned by the repository.
    pub fn checkout(
        employee_name: impl Into<String>,
        vehicle_id: VehicleId,
        purpose: impl Into<String>,
        start_date: DateTime<Utc>,
        odometer_out: Kilometres,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            permit_number: 0, // Will be set by repository
            employee_name: employee_name.into(),
            vehicle_id,
            purpose: purpose.into(),
            destination: String::new(),
            start_date,
            end_date: None,
            odometer_out,
            odometer_in: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Record the vehicle's return. Readings below `odometer_out` are kept
    /// as entered; see [`VehiclePermit::has_inconsistent_reading`].
    pub fn checkin(&mut self, end_date: DateTime<Utc>, odometer_in: Kilometres) {
        self.end_date = Some(end_date);
        self.odometer_in = Some(odometer_in);
    }

    pub fn state(&self) -> PermitState {
        if self.odometer_in.is_some() {
            PermitState::Closed
        } else {
            PermitState::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == PermitState::Open
    }

    /// Distance driven under this permit. `None` while open, and also when the
    /// return reading does not exceed the checkout reading.
    pub fn distance(&self) -> Option<Kilometres> {
        match self.odometer_in {
            Some(odometer_in) if odometer_in > self.odometer_out => {
                Some(odometer_in - self.odometer_out)
            }
            _ => None,
        }
    }

    /// True when the return reading is lower than the checkout reading.
    pub fn has_inconsistent_reading(&self) -> bool {
        matches!(self.odometer_in, Some(odometer_in) if odometer_in < self.odometer_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_permit(odometer_out: Kilometres) -> VehiclePermit {
        VehiclePermit::checkout("Khalid", Uuid::new_v4(), "Site visit", Utc::now(), odometer_out)
    }

    #[test]
    fn test_new_permit_is_open() {
        let permit = sample_permit(500).with_destination("Port office");
        assert_eq!(permit.state(), PermitState::Open);
        assert!(permit.is_open());
        assert_eq!(permit.distance(), None);
        assert_eq!(permit.destination, "Port office");
    }

    #[test]
    fn test_checkin_closes_permit() {
        let mut permit = sample_permit(500);
        permit.checkin(Utc::now(), 620);

        assert_eq!(permit.state(), PermitState::Closed);
        assert_eq!(permit.distance(), Some(120));
        assert!(!permit.has_inconsistent_reading());
    }

    #[test]
    fn test_reversed_reading_has_no_distance() {
        let mut permit = sample_permit(500);
        permit.checkin(Utc::now(), 480);

        assert_eq!(permit.state(), PermitState::Closed);
        assert_eq!(permit.distance(), None);
        assert!(permit.has_inconsistent_reading());
    }

    #[test]
    fn test_equal_reading_has_no_distance() {
        let mut permit = sample_permit(500);
        permit.checkin(Utc::now(), 500);

        assert_eq!(permit.distance(), None);
        assert!(!permit.has_inconsistent_reading());
    }

    #[test]
    fn test_permit_state_roundtrip() {
        for state in [PermitState::Open, PermitState::Closed] {
            assert_eq!(PermitState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(PermitState::from_str("pending"), None);
    }
}
