//! RequestLedger: the durable collection of expense requests.
//!
//! The ledger enforces the request lifecycle (create as pending, complete once,
//! delete only while pending). Persisting it is the caller's job; it serializes
//! as a plain JSON array.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::finalize::ReportUpdate;
use crate::form::ValidatedRequest;
use crate::request::{ExpenseRequest, RequestStatus};

/// Figures for the start screen, computed as of `today`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSummary {
    pub pending_count: usize,
    pub pending_total: Decimal,
    /// Completed requests dated on or after the first of the current month.
    pub reported_this_month: Decimal,
    /// Pending request with the earliest due date, with that date.
    pub most_urgent: Option<(String, NaiveDate)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestLedger {
    requests: Vec<ExpenseRequest>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_requests(requests: Vec<ExpenseRequest>) -> Self {
        Self { requests }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn all(&self) -> &[ExpenseRequest] {
        &self.requests
    }

    pub fn find(&self, id: &str) -> Option<&ExpenseRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &ExpenseRequest> {
        self.requests.iter().filter(|r| r.is_pending())
    }

    pub fn completed(&self) -> impl Iterator<Item = &ExpenseRequest> {
        self.requests.iter().filter(|r| !r.is_pending())
    }

    pub fn summary(&self, today: NaiveDate, due_days: i64) -> LedgerSummary {
        let month_start = today.with_day(1).unwrap_or(today);
        let most_urgent = self
            .pending()
            .map(|r| (r.due_date(due_days), r))
            .min_by_key(|(due, _)| *due)
            .map(|(due, r)| (r.id.clone(), due));

        LedgerSummary {
            pending_count: self.pending().count(),
            pending_total: self.pending().map(|r| r.amount).sum(),
            reported_this_month: self
                .completed()
                .filter(|r| r.date >= month_start)
                .map(|r| r.amount)
                .sum(),
            most_urgent,
        }
    }

    /// Add a new pending request under `id`, which must not be in use.
    pub fn create(&mut self, form: ValidatedRequest, id: impl Into<String>) -> Result<&ExpenseRequest> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::validation("request id must not be empty"));
        }
        if self.find(&id).is_some() {
            return Err(CoreError::validation(format!("request id already in use: {id}")));
        }

        self.requests.push(ExpenseRequest {
            id,
            amount: form.amount,
            reason: form.reason,
            date: form.date,
            status: RequestStatus::Pending,
            applicant_name: form.applicant_name,
            payee_name: form.payee_name,
            organization: form.organization,
            receipt_images: Vec::new(),
            signature: None,
            leader_name: None,
            incident_occurred: None,
            incident_details: None,
            spiritual_experience: None,
        });

        let created = &self.requests[self.requests.len() - 1];
        info!(id = %created.id, amount = %created.amount, "request created");
        Ok(created)
    }

    /// Remove a pending request. Completed requests are kept as history.
    pub fn delete(&mut self, id: &str) -> Result<ExpenseRequest> {
        let pos = self
            .requests
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        if !self.requests[pos].is_pending() {
            return Err(CoreError::validation(format!(
                "request {id} is completed and cannot be deleted"
            )));
        }
        debug!(id, "request deleted");
        Ok(self.requests.remove(pos))
    }

    /// Apply a finalized report: the only Pending -> Completed transition.
    pub fn complete(&mut self, update: ReportUpdate) -> Result<&ExpenseRequest> {
        let req = self
            .requests
            .iter_mut()
            .find(|r| r.id == update.request_id)
            .ok_or_else(|| CoreError::NotFound(update.request_id.clone()))?;
        if !req.is_pending() {
            return Err(CoreError::finalization(format!(
                "request {} is already completed",
                req.id
            )));
        }

        let occurred = update.incident.occurred();
        req.receipt_images = update.receipt_images;
        req.signature = Some(update.signature);
        req.leader_name = Some(update.leader_name);
        req.incident_occurred = Some(occurred);
        req.incident_details = Some(update.incident.details().to_string());
        req.spiritual_experience = Some(update.experience);
        req.status = RequestStatus::Completed;

        info!(id = %req.id, "request completed");
        Ok(&*req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finalize::{finalize, Incident};
    use crate::request::{KnownOrganization, Organization, SpiritualExperience};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn form() -> ValidatedRequest {
        ValidatedRequest {
            applicant_name: "Juan Pérez".to_string(),
            payee_name: "Tienda El Sol".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            reason: "Materiales para la actividad de jóvenes".to_string(),
            organization: Organization::Known(KnownOrganization::Administration),
            amount: dec!(150.75),
        }
    }

    fn update_for(ledger: &RequestLedger, id: &str) -> ReportUpdate {
        finalize(
            ledger.find(id).unwrap(),
            &[],
            "sig",
            "Carlos Quispe",
            Incident::None,
            SpiritualExperience::new(NaiveDate::from_ymd_opt(2025, 2, 8).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_create_rejects_duplicate_id() {
        let mut ledger = RequestLedger::new();
        ledger.create(form(), "r1").unwrap();
        assert!(ledger.create(form(), "r1").is_err());
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.pending().count(), 1);
    }

    #[test]
    fn test_complete_only_once() {
        let mut ledger = RequestLedger::new();
        ledger.create(form(), "r1").unwrap();
        let update = update_for(&ledger, "r1");

        let done = ledger.complete(update.clone()).unwrap();
        assert_eq!(done.status, RequestStatus::Completed);
        assert_eq!(done.incident_occurred, Some(false));

        let snapshot = ledger.clone();
        let err = ledger.complete(update).unwrap_err();
        assert!(matches!(err, CoreError::Finalization(_)));
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn test_delete_only_pending() {
        let mut ledger = RequestLedger::new();
        ledger.create(form(), "r1").unwrap();
        ledger.create(form(), "r2").unwrap();
        let update = update_for(&ledger, "r2");
        ledger.complete(update).unwrap();

        assert!(ledger.delete("r2").is_err());
        assert_eq!(ledger.delete("r1").unwrap().id, "r1");
        assert!(matches!(ledger.delete("r1"), Err(CoreError::NotFound(_))));
        assert_eq!(ledger.completed().count(), 1);
    }

    #[test]
    fn test_summary_of_pending_and_reported() {
        let day = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();
        let mut ledger = RequestLedger::new();

        let mut early = form();
        early.date = day(3, 10);
        early.amount = dec!(40);
        let mut late = form();
        late.date = day(3, 20);
        late.amount = dec!(60.50);
        ledger.create(late, "late").unwrap();
        ledger.create(early, "early").unwrap();

        let mut old = form();
        old.date = day(2, 27);
        ledger.create(old, "old").unwrap();
        let mut recent = form();
        recent.date = day(3, 1);
        recent.amount = dec!(25);
        ledger.create(recent, "recent").unwrap();
        for id in ["old", "recent"] {
            let update = update_for(&ledger, id);
            ledger.complete(update).unwrap();
        }

        let s = ledger.summary(day(3, 22), 14);
        assert_eq!(s.pending_count, 2);
        assert_eq!(s.pending_total, dec!(100.50));
        assert_eq!(s.reported_this_month, dec!(25));
        assert_eq!(s.most_urgent, Some(("early".to_string(), day(3, 24))));
    }

    #[test]
    fn test_summary_of_empty_ledger() {
        let s = RequestLedger::new().summary(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(), 14);
        assert_eq!(s.pending_count, 0);
        assert_eq!(s.pending_total, Decimal::ZERO);
        assert_eq!(s.reported_this_month, Decimal::ZERO);
        assert_eq!(s.most_urgent, None);
    }

    #[test]
    fn test_serializes_as_array() {
        let mut ledger = RequestLedger::new();
        ledger.create(form(), "r1").unwrap();
        let json = serde_json::to_value(&ledger).unwrap();
        assert!(json.is_array());
        let back: RequestLedger = serde_json::from_value(json).unwrap();
        assert_eq!(back, ledger);
    }
}
