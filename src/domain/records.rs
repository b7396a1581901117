use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Action, Role};

pub type DocumentId = Uuid;

/// A flat office record kept in the document store.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    /// Storage discriminator, unique per type
    const KIND: &'static str;

    /// Capability needed to create, edit or delete records of this kind.
    const MANAGED_BY: Action = Action::ManageRecords;

    /// Any user may create these for themselves; the creator becomes the owner.
    const SELF_SERVICE: bool = false;

    fn status(&self) -> Option<&str> {
        None
    }

    /// Date used for range filters. Records without one fall back to creation time.
    fn date(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Name of the user this record belongs to, for role-scoped listings.
    fn owner(&self) -> Option<&str> {
        None
    }

    /// Text matched by free-text search.
    fn search_text(&self) -> String;

    /// Whether the record is still in the state its owner filed it in.
    /// Owners without the managing capability may only create and edit
    /// records in this state.
    fn is_initial(&self) -> bool {
        true
    }

    /// Rules spanning several fields, checked on every create and update.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A document together with its store-assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument<T> {
    pub id: DocumentId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub data: T,
}

impl<T: Document> StoredDocument<T> {
    pub fn new(data: T) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            data,
        }
    }

    pub fn effective_date(&self) -> DateTime<Utc> {
        self.data.date().unwrap_or(self.created_at)
    }
}

/// List filter shared by every document kind. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub status: Option<String>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

impl RecordFilter {
    pub fn matches<T: Document>(&self, doc: &StoredDocument<T>) -> bool {
        if let Some(status) = &self.status {
            match doc.data.status() {
                Some(s) if s.eq_ignore_ascii_case(status) => {}
                _ => return false,
            }
        }

        let date = doc.effective_date();
        if self.from_date.is_some_and(|from| date < from) {
            return false;
        }
        if self.to_date.is_some_and(|to| date > to) {
            return false;
        }

        match &self.search {
            Some(needle) if !needle.trim().is_empty() => doc
                .data
                .search_text()
                .to_lowercase()
                .contains(&needle.trim().to_lowercase()),
            _ => true,
        }
    }
}

pub(crate) fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

// ========================
// Staff
// ========================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    pub job_title: String,
    pub department: String,
    pub role: Role,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hired_at: Option<NaiveDate>,
}

impl Document for Employee {
    const KIND: &'static str = "employee";
    const MANAGED_BY: Action = Action::ManageStaff;

    fn status(&self) -> Option<&str> {
        Some(self.role.as_str())
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        self.hired_at.map(midnight)
    }

    fn search_text(&self) -> String {
        format!("{} {} {}", self.name, self.job_title, self.department)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    Planned,
    InProgress,
    Completed,
}

impl TrainingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStatus::Planned => "planned",
            TrainingStatus::InProgress => "in_progress",
            TrainingStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub employee_name: String,
    pub course_name: String,
    pub provider: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: TrainingStatus,
}

impl Document for TrainingRecord {
    const KIND: &'static str = "training";

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        Some(midnight(self.start_date))
    }

    fn owner(&self) -> Option<&str> {
        Some(&self.employee_name)
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.employee_name, self.course_name, self.provider
        )
    }
}

// ========================
// Correspondence
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrespondenceKind {
    EntryPermit,
    CustomsLetter,
    RejectionNotice,
}

impl CorrespondenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrespondenceKind::EntryPermit => "entry_permit",
            CorrespondenceKind::CustomsLetter => "customs_letter",
            CorrespondenceKind::RejectionNotice => "rejection_notice",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrespondenceStatus {
    Draft,
    Issued,
}

impl CorrespondenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrespondenceStatus::Draft => "draft",
            CorrespondenceStatus::Issued => "issued",
        }
    }
}

/// Outgoing letter printed on office letterhead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub kind: CorrespondenceKind,
    pub reference_number: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub date: NaiveDate,
    pub status: CorrespondenceStatus,
}

impl Document for Correspondence {
    const KIND: &'static str = "correspondence";

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        Some(midnight(self.date))
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.kind.as_str(),
            self.reference_number,
            self.recipient,
            self.subject,
            self.body
        )
    }
}

// ========================
// Notices and requests
// ========================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub title: String,
    pub body: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
}

impl Document for Announcement {
    const KIND: &'static str = "announcement";

    fn date(&self) -> Option<DateTime<Utc>> {
        Some(self.published_at)
    }

    fn search_text(&self) -> String {
        format!("{} {} {}", self.title, self.body, self.author)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRequestStatus {
    Open,
    Resolved,
    Declined,
}

impl UserRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRequestStatus::Open => "open",
            UserRequestStatus::Resolved => "resolved",
            UserRequestStatus::Declined => "declined",
        }
    }
}

/// Free-form request from an employee to the administration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRequest {
    pub requester: String,
    pub subject: String,
    pub details: String,
    pub status: UserRequestStatus,
}

impl Document for UserRequest {
    const KIND: &'static str = "user_request";
    const SELF_SERVICE: bool = true;

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn owner(&self) -> Option<&str> {
        Some(&self.requester)
    }

    fn search_text(&self) -> String {
        format!("{} {} {}", self.requester, self.subject, self.details)
    }

    fn is_initial(&self) -> bool {
        self.status == UserRequestStatus::Open
    }
}

// ========================
// Settings
// ========================

/// Office-wide settings, stored as a single document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub office_name: String,
    pub department_name: String,
    pub manager_name: String,
    pub ramadan_start: Option<NaiveDate>,
    pub ramadan_end: Option<NaiveDate>,
}

impl Document for Settings {
    const KIND: &'static str = "settings";
    const MANAGED_BY: Action = Action::ManageStaff;

    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.office_name, self.department_name, self.manager_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(requester: &str, subject: &str, status: UserRequestStatus) -> StoredDocument<UserRequest> {
        StoredDocument::new(UserRequest {
            requester: requester.into(),
            subject: subject.into(),
            details: "Details".into(),
            status,
        })
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let doc = request("Sara", "New laptop", UserRequestStatus::Open);
        assert!(RecordFilter::default().matches(&doc));
    }

    #[test]
    fn test_status_filter_is_case_insensitive() {
        let doc = request("Sara", "New laptop", UserRequestStatus::Resolved);
        let filter = RecordFilter {
            status: Some("RESOLVED".into()),
            ..Default::default()
        };
        assert!(filter.matches(&doc));

        let filter = RecordFilter {
            status: Some("open".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&doc));
    }

    #[test]
    fn test_search_filter() {
        let doc = request("Sara", "Printer toner", UserRequestStatus::Open);
        let hit = RecordFilter {
            search: Some("toner".into()),
            ..Default::default()
        };
        let miss = RecordFilter {
            search: Some("vehicle".into()),
            ..Default::default()
        };
        assert!(hit.matches(&doc));
        assert!(!miss.matches(&doc));
    }

    #[test]
    fn test_date_range_uses_document_date() {
        let doc = StoredDocument::new(Correspondence {
            kind: CorrespondenceKind::CustomsLetter,
            reference_number: "C-12".into(),
            recipient: "Customs Directorate".into(),
            subject: "Equipment release".into(),
            body: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            status: CorrespondenceStatus::Issued,
        });

        let inside = RecordFilter {
            from_date: Some(midnight(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())),
            to_date: Some(midnight(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap())),
            ..Default::default()
        };
        let after = RecordFilter {
            from_date: Some(midnight(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap())),
            ..Default::default()
        };
        assert!(inside.matches(&doc));
        assert!(!after.matches(&doc));
    }

    #[test]
    fn test_status_filter_excludes_documents_without_status() {
        let doc = StoredDocument::new(Announcement {
            title: "Office closed".into(),
            body: "National day".into(),
            author: "Admin".into(),
            published_at: Utc::now(),
        });
        let filter = RecordFilter {
            status: Some("open".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&doc));
    }
}
