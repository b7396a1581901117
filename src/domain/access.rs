//! Coarse role-based authorization.
//!
//! Every gated operation goes through [`can_manage`]; callers never compare
//! roles inline.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    HeadOfDepartment,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::HeadOfDepartment => "head_of_department",
            Role::Employee => "employee",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "admin" => Some(Role::Admin),
            "head_of_department" | "head" => Some(Role::HeadOfDepartment),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operations that require more than being a signed-in employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Add, edit and delete vehicles
    ManageFleet,
    /// Edit or delete any permit
    EditPermit,
    /// Edit or delete fuel expenses
    ManageFuelExpenses,
    /// Approve or reject leave requests
    DecideLeave,
    /// Create, edit and delete office records (correspondence, training, ...)
    ManageRecords,
    /// Employees, public holidays and office settings
    ManageStaff,
    /// See records owned by other users
    ViewAllRecords,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ManageFleet => "manage_fleet",
            Action::EditPermit => "edit_permit",
            Action::ManageFuelExpenses => "manage_fuel_expenses",
            Action::DecideLeave => "decide_leave",
            Action::ManageRecords => "manage_records",
            Action::ManageStaff => "manage_staff",
            Action::ViewAllRecords => "view_all_records",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self::new(name, Role::Admin)
    }

    pub fn employee(name: impl Into<String>) -> Self {
        Self::new(name, Role::Employee)
    }
}

pub fn can_manage(actor: &Actor, action: Action) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::HeadOfDepartment => matches!(
            action,
            Action::DecideLeave | Action::ViewAllRecords | Action::ManageRecords
        ),
        Role::Employee => false,
    }
}
