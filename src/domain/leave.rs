use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Action, Document};
use super::records::midnight;

const SECONDS_PER_DAY: i64 = 86_400;

/// Longest leave (in days) printed on the short form.
pub const SHORT_LEAVE_MAX_DAYS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(LeaveStatus::Pending),
            "approved" => Some(LeaveStatus::Approved),
            "rejected" => Some(LeaveStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub employee_name: String,
    /// Free text: annual, sick, emergency, ...
    pub leave_type: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    pub fn duration_days(&self) -> i64 {
        calculate_duration(self.start_date, self.end_date)
    }

    pub fn template(&self) -> LeaveTemplate {
        LeaveTemplate::for_duration(self.duration_days())
    }
}

impl Document for LeaveRequest {
    const KIND: &'static str = "leave_request";
    const SELF_SERVICE: bool = true;

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        Some(self.start_date)
    }

    fn owner(&self) -> Option<&str> {
        Some(&self.employee_name)
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.employee_name,
            self.leave_type,
            self.reason.as_deref().unwrap_or("")
        )
    }

    fn is_initial(&self) -> bool {
        self.status == LeaveStatus::Pending && self.decided_by.is_none() && self.decided_at.is_none()
    }

    fn check(&self) -> Result<(), String> {
        if self.end_date < self.start_date {
            return Err("leave end date is before its start date".to_string());
        }
        Ok(())
    }
}

/// Inclusive calendar-day count: `ceil(|end - start| in days) + 1`.
/// Weekends and public holidays are counted like any other day.
pub fn calculate_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let seconds = (end - start).num_seconds().abs();
    (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY + 1
}

/// Which printed form a leave request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveTemplate {
    Short,
    Long,
}

impl LeaveTemplate {
    pub fn for_duration(days: i64) -> Self {
        if days <= SHORT_LEAVE_MAX_DAYS {
            LeaveTemplate::Short
        } else {
            LeaveTemplate::Long
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveTemplate::Short => "short",
            LeaveTemplate::Long => "long",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicHoliday {
    pub name: String,
    pub start_date: NaiveDate,
    /// Single-day holiday when absent
    pub end_date: Option<NaiveDate>,
}

impl PublicHoliday {
    pub fn last_day(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date).max(self.start_date)
    }

    /// True if any day of the holiday falls within `[first, last]`.
    pub fn overlaps(&self, first: NaiveDate, last: NaiveDate) -> bool {
        self.start_date <= last && self.last_day() >= first
    }
}

impl Document for PublicHoliday {
    const KIND: &'static str = "public_holiday";
    const MANAGED_BY: Action = Action::ManageStaff;

    fn date(&self) -> Option<DateTime<Utc>> {
        Some(midnight(self.start_date))
    }

    fn search_text(&self) -> String {
        self.name.clone()
    }
}

/// Public holidays touching the leave window, for display next to the request.
pub fn holidays_within<'a>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    holidays: &'a [PublicHoliday],
) -> Vec<&'a PublicHoliday> {
    let (first, last) = if start <= end {
        (start.date_naive(), end.date_naive())
    } else {
        (end.date_naive(), start.date_naive())
    };
    let mut found: Vec<&PublicHoliday> = holidays
        .iter()
        .filter(|h| h.overlaps(first, last))
        .collect();
    found.sort_by_key(|h| h.start_date);
    found
}
