use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};
use validator::Validate;

use crate::domain::{
    Action, Actor, Document, DocumentId, LeaveRequest, LeaveStatus, PublicHoliday, RecordFilter,
    Settings, StoredDocument, can_manage, holidays_within,
};

use super::views::LeavePrintout;
use super::{AppError, OfficeService, SubmitLeaveRequest};

impl OfficeService {
    // ========================
    // Generic document operations
    // ========================

    /// Create a record. Anyone may file an undecided self-service record for
    /// themselves; everything else needs the kind's managing capability.
    pub async fn create_record<T: Document>(
        &self,
        actor: &Actor,
        data: T,
    ) -> Result<StoredDocument<T>, AppError> {
        Self::check_record(&data)?;
        Self::authorize_write(actor, &data)?;

        let doc = StoredDocument::new(data);
        self.repo.insert_document(&doc).await?;
        info!(kind = T::KIND, id = %doc.id, by = %actor.name, "Created record");
        Ok(doc)
    }

    /// Fetch one record the actor is allowed to see.
    pub async fn get_record<T: Document>(
        &self,
        actor: &Actor,
        id: DocumentId,
    ) -> Result<StoredDocument<T>, AppError> {
        let doc = self.load_record::<T>(id).await?;
        if !Self::is_visible(actor, &doc) {
            return Err(AppError::Forbidden {
                role: actor.role,
                action: Action::ViewAllRecords,
            });
        }
        Ok(doc)
    }

    /// Records matching the filter. Without `ViewAllRecords` an actor only
    /// sees their own records of owned kinds.
    pub async fn list_records<T: Document>(
        &self,
        actor: &Actor,
        filter: &RecordFilter,
    ) -> Result<Vec<StoredDocument<T>>, AppError> {
        let docs = self.repo.list_documents::<T>().await?;
        let total = docs.len();

        let visible: Vec<StoredDocument<T>> = docs
            .into_iter()
            .filter(|doc| Self::is_visible(actor, doc) && filter.matches(doc))
            .collect();
        debug!(kind = T::KIND, total, shown = visible.len(), "Listed records");
        Ok(visible)
    }

    /// Apply a partial update. Top-level fields present in `patch` replace
    /// the stored ones; everything else is kept.
    pub async fn update_record<T: Document>(
        &self,
        actor: &Actor,
        id: DocumentId,
        patch: Value,
    ) -> Result<StoredDocument<T>, AppError> {
        let mut doc = self.load_record::<T>(id).await?;
        Self::authorize_write(actor, &doc.data)?;

        let updated: T = merge_patch(&doc.data, patch)?;
        Self::check_record(&updated)?;
        // Owners may edit their own requests but not decide them or hand them over
        Self::authorize_write(actor, &updated)?;

        doc.data = updated;
        doc.updated_at = Utc::now();
        if !self.repo.replace_document(&doc).await? {
            return Err(AppError::RecordNotFound {
                kind: T::KIND,
                id: id.to_string(),
            });
        }
        info!(kind = T::KIND, id = %id, by = %actor.name, "Updated record");
        Ok(doc)
    }

    pub async fn delete_record<T: Document>(
        &self,
        actor: &Actor,
        id: DocumentId,
    ) -> Result<StoredDocument<T>, AppError> {
        let doc = self.load_record::<T>(id).await?;
        Self::authorize_write(actor, &doc.data)?;

        if !self.repo.delete_document::<T>(id).await? {
            return Err(AppError::RecordNotFound {
                kind: T::KIND,
                id: id.to_string(),
            });
        }
        info!(kind = T::KIND, id = %id, by = %actor.name, "Deleted record");
        Ok(doc)
    }

    async fn load_record<T: Document>(&self, id: DocumentId) -> Result<StoredDocument<T>, AppError> {
        self.repo
            .get_document::<T>(id)
            .await?
            .ok_or_else(|| AppError::RecordNotFound {
                kind: T::KIND,
                id: id.to_string(),
            })
    }

    /// Managers may write any record of the kind. Owners of self-service
    /// records may write their own while it is still undecided.
    fn authorize_write<T: Document>(actor: &Actor, data: &T) -> Result<(), AppError> {
        if can_manage(actor, T::MANAGED_BY) {
            return Ok(());
        }
        if T::SELF_SERVICE && data.owner() == Some(actor.name.as_str()) && data.is_initial() {
            return Ok(());
        }
        Err(AppError::Forbidden {
            role: actor.role,
            action: T::MANAGED_BY,
        })
    }

    fn check_record<T: Document>(data: &T) -> Result<(), AppError> {
        data.check()
            .map_err(|reason| AppError::InvalidInput(format!("{}: {}", T::KIND, reason)))
    }

    fn is_visible<T: Document>(actor: &Actor, doc: &StoredDocument<T>) -> bool {
        match doc.data.owner() {
            Some(owner) => owner == actor.name || can_manage(actor, Action::ViewAllRecords),
            None => true,
        }
    }

    // ========================
    // Leave
    // ========================

    /// File a leave request. It starts out pending.
    pub async fn submit_leave(
        &self,
        actor: &Actor,
        request: SubmitLeaveRequest,
    ) -> Result<StoredDocument<LeaveRequest>, AppError> {
        request.validate()?;

        let leave = LeaveRequest {
            employee_name: request.employee_name.unwrap_or_else(|| actor.name.clone()),
            leave_type: request.leave_type,
            start_date: request.start_date,
            end_date: request.end_date,
            reason: request.reason,
            status: LeaveStatus::Pending,
            decided_by: None,
            decided_at: None,
        };
        let days = leave.duration_days();
        let doc = self.create_record(actor, leave).await?;
        info!(id = %doc.id, employee = %doc.data.employee_name, days, "Leave request submitted");
        Ok(doc)
    }

    pub async fn approve_leave(
        &self,
        actor: &Actor,
        id: DocumentId,
    ) -> Result<StoredDocument<LeaveRequest>, AppError> {
        self.decide_leave(actor, id, LeaveStatus::Approved).await
    }

    pub async fn reject_leave(
        &self,
        actor: &Actor,
        id: DocumentId,
    ) -> Result<StoredDocument<LeaveRequest>, AppError> {
        self.decide_leave(actor, id, LeaveStatus::Rejected).await
    }

    async fn decide_leave(
        &self,
        actor: &Actor,
        id: DocumentId,
        decision: LeaveStatus,
    ) -> Result<StoredDocument<LeaveRequest>, AppError> {
        Self::authorize(actor, Action::DecideLeave)?;
        let mut doc = self.load_record::<LeaveRequest>(id).await?;

        if doc.data.status != LeaveStatus::Pending {
            return Err(AppError::LeaveAlreadyDecided {
                id: id.to_string(),
                status: doc.data.status.to_string(),
            });
        }

        let now = Utc::now();
        doc.data.status = decision;
        doc.data.decided_by = Some(actor.name.clone());
        doc.data.decided_at = Some(now);
        doc.updated_at = now;

        if !self.repo.replace_document(&doc).await? {
            return Err(AppError::RecordNotFound {
                kind: LeaveRequest::KIND,
                id: id.to_string(),
            });
        }
        info!(id = %id, decision = %decision, by = %actor.name, "Leave request decided");
        Ok(doc)
    }

    /// Everything needed to print the leave form.
    pub async fn leave_printout(
        &self,
        actor: &Actor,
        id: DocumentId,
    ) -> Result<LeavePrintout, AppError> {
        let request = self.get_record::<LeaveRequest>(actor, id).await?;
        let holidays: Vec<PublicHoliday> = self
            .repo
            .list_documents::<PublicHoliday>()
            .await?
            .into_iter()
            .map(|doc| doc.data)
            .collect();
        let settings = self.get_settings().await?;

        let bracketed: Vec<PublicHoliday> =
            holidays_within(request.data.start_date, request.data.end_date, &holidays)
                .into_iter()
                .cloned()
                .collect();

        let (first, last) = (
            request.data.start_date.date_naive().min(request.data.end_date.date_naive()),
            request.data.start_date.date_naive().max(request.data.end_date.date_naive()),
        );
        let overlaps_ramadan = match (settings.ramadan_start, settings.ramadan_end) {
            (Some(start), Some(end)) => start <= last && end >= first,
            _ => false,
        };

        Ok(LeavePrintout {
            duration_days: request.data.duration_days(),
            template: request.data.template(),
            holidays: bracketed,
            overlaps_ramadan,
            settings,
            request,
        })
    }

    // ========================
    // Settings
    // ========================

    /// Office settings, or defaults if never saved.
    pub async fn get_settings(&self) -> Result<Settings, AppError> {
        Ok(self
            .repo
            .list_documents::<Settings>()
            .await?
            .into_iter()
            .next()
            .map(|doc| doc.data)
            .unwrap_or_default())
    }

    pub async fn save_settings(&self, actor: &Actor, settings: Settings) -> Result<Settings, AppError> {
        Self::authorize(actor, Action::ManageStaff)?;

        match self.repo.list_documents::<Settings>().await?.into_iter().next() {
            Some(mut doc) => {
                doc.data = settings;
                doc.updated_at = Utc::now();
                self.repo.replace_document(&doc).await?;
                info!(by = %actor.name, "Updated settings");
                Ok(doc.data)
            }
            None => {
                let doc = StoredDocument::new(settings);
                self.repo.insert_document(&doc).await?;
                info!(by = %actor.name, "Saved settings");
                Ok(doc.data)
            }
        }
    }
}

/// Shallow JSON merge: object keys in `patch` overwrite those of `current`.
fn merge_patch<T: Document>(current: &T, patch: Value) -> Result<T, AppError> {
    let Value::Object(fields) = patch else {
        return Err(AppError::InvalidInput(format!(
            "{} update must be a JSON object",
            T::KIND
        )));
    };

    let mut value = serde_json::to_value(current)
        .map_err(|e| AppError::InvalidInput(format!("{}: {}", T::KIND, e)))?;
    if let Value::Object(target) = &mut value {
        for (key, field) in fields {
            target.insert(key, field);
        }
    }

    serde_json::from_value(value).map_err(|e| AppError::InvalidInput(format!("{}: {}", T::KIND, e)))
}
