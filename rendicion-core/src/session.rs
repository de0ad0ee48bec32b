//! ReportSession: one report draft driven through the report wizard.
//!
//! The session owns the item store and every answer collected so far, and only
//! moves between steps through `wizard::transition`. Each input method checks
//! the step it belongs to and the data guard for leaving it.
//!
//! Scanning is asynchronous and may outlive the scan view. `begin_scan` hands
//! out a `ScanTicket`; closing the view invalidates it, and `confirm_scan` with
//! an invalidated ticket is rejected without touching the store.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::finalize::{Incident, ReportFinalizer, ReportUpdate};
use crate::form::has_first_and_last_name;
use crate::item_store::{ExpenseItem, ItemStore};
use crate::reconcile::{reconcile, ReconcileConfig, Reconciliation};
use crate::request::{ExpenseRequest, SpiritualExperience};
use crate::wizard::{transition, ReportStep, WizardEvent};

/// Proof that a scan result belongs to the scan view that is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTicket(u64);

impl ScanTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A manual expense being typed in over three steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntry {
    pub description: String,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSession {
    request_id: String,
    requested: Decimal,
    step: ReportStep,
    store: ItemStore,
    leader_name: String,
    incident: Option<bool>,
    incident_details: String,
    experience: SpiritualExperience,
    manual: ManualEntry,
    #[serde(default)]
    scan_generation: u64,
    // tickets never survive a snapshot
    #[serde(skip)]
    open_scan: Option<u64>,
}

impl ReportSession {
    /// Start a report for a pending request. `today` seeds the experience date.
    pub fn new(request: &ExpenseRequest, today: NaiveDate) -> Result<Self> {
        if !request.is_pending() {
            return Err(CoreError::finalization(format!(
                "request {} is already completed",
                request.id
            )));
        }
        Ok(Self {
            request_id: request.id.clone(),
            requested: request.amount,
            step: ReportStep::Welcome,
            store: ItemStore::new(),
            leader_name: String::new(),
            incident: None,
            incident_details: String::new(),
            experience: SpiritualExperience::new(today),
            manual: ManualEntry::default(),
            scan_generation: 0,
            open_scan: None,
        })
    }

    /// Prepare a session restored from a draft. A scan that was open when the
    /// draft was written cannot deliver anymore, so the session goes back to the hub.
    pub fn resumed(mut self) -> Self {
        if self.step == ReportStep::Scanning {
            self.step = ReportStep::ExpenseHub;
        }
        self.open_scan = None;
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn step(&self) -> ReportStep {
        self.step
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn leader_name(&self) -> &str {
        &self.leader_name
    }

    pub fn experience(&self) -> &SpiritualExperience {
        &self.experience
    }

    pub fn manual(&self) -> &ManualEntry {
        &self.manual
    }

    pub fn incident(&self) -> Incident {
        match self.incident {
            Some(true) => Incident::Occurred {
                details: self.incident_details.clone(),
            },
            _ => Incident::None,
        }
    }

    pub fn reconciliation(&self, config: &ReconcileConfig) -> Reconciliation {
        reconcile(self.store.items(), self.requested, config)
    }

    pub fn known_receipt_numbers(&self) -> HashSet<String> {
        self.store.known_receipt_numbers()
    }

    /// Walk back along the fixed predecessor map.
    pub fn previous(&mut self) -> Result<ReportStep> {
        self.apply(WizardEvent::Previous)
    }

    pub fn begin(&mut self) -> Result<ReportStep> {
        self.expect(ReportStep::Welcome, WizardEvent::Next)?;
        self.apply(WizardEvent::Next)
    }

    pub fn submit_leader_name(&mut self, name: &str) -> Result<ReportStep> {
        self.expect(ReportStep::LeaderName, WizardEvent::Next)?;
        if !has_first_and_last_name(name) {
            return Err(CoreError::validation(
                "leader name must include first and last name",
            ));
        }
        self.leader_name = name.trim().to_string();
        self.apply(WizardEvent::Next)
    }

    pub fn add_expense(&mut self) -> Result<ReportStep> {
        self.apply(WizardEvent::AddExpense)
    }

    /// Remove a whole receipt group from the hub.
    pub fn remove_group(&mut self, key: &str) -> Result<usize> {
        self.expect(ReportStep::ExpenseHub, WizardEvent::Next)?;
        Ok(self.store.remove_group(key))
    }

    /// Leave the hub for the incident question. Needs at least one expense.
    pub fn finish_expenses(&mut self) -> Result<ReportStep> {
        self.expect(ReportStep::ExpenseHub, WizardEvent::Next)?;
        if self.store.is_empty() {
            return Err(CoreError::validation("add at least one expense first"));
        }
        self.apply(WizardEvent::Next)
    }

    pub fn choose_manual(&mut self) -> Result<ReportStep> {
        self.manual = ManualEntry::default();
        self.apply(WizardEvent::ChooseManual)
    }

    pub fn submit_manual_description(&mut self, description: &str) -> Result<ReportStep> {
        self.expect(ReportStep::AddManualDesc, WizardEvent::Next)?;
        if description.trim().is_empty() {
            return Err(CoreError::validation("description must not be empty"));
        }
        self.manual.description = description.trim().to_string();
        self.apply(WizardEvent::Next)
    }

    pub fn submit_manual_amount(&mut self, amount: Decimal) -> Result<ReportStep> {
        self.expect(ReportStep::AddManualAmount, WizardEvent::Next)?;
        if amount <= Decimal::ZERO {
            return Err(CoreError::validation("amount must be greater than 0"));
        }
        self.manual.amount = Some(amount);
        self.apply(WizardEvent::Next)
    }

    /// Last manual step: commits the item to the store and returns to the hub.
    pub fn submit_manual_receipt_number(
        &mut self,
        receipt_number: Option<&str>,
    ) -> Result<ExpenseItem> {
        self.expect(ReportStep::AddManualReceiptNumber, WizardEvent::Next)?;
        let amount = self
            .manual
            .amount
            .ok_or_else(|| CoreError::validation("amount is missing"))?;
        let item = self
            .store
            .add_manual_item(&self.manual.description, amount, receipt_number)?;
        self.manual = ManualEntry::default();
        self.apply(WizardEvent::Next)?;
        Ok(item)
    }

    pub fn begin_scan(&mut self) -> Result<ScanTicket> {
        self.apply(WizardEvent::ChooseScan)?;
        self.scan_generation += 1;
        self.open_scan = Some(self.scan_generation);
        debug!(ticket = self.scan_generation, "scan opened");
        Ok(ScanTicket(self.scan_generation))
    }

    /// Close the scan view without adding anything. Outstanding tickets go stale.
    pub fn close_scan(&mut self) -> Result<ReportStep> {
        self.expect(ReportStep::Scanning, WizardEvent::ScanFinished)?;
        self.open_scan = None;
        self.apply(WizardEvent::ScanFinished)
    }

    /// Commit confirmed scan items. Rejected if `ticket` is no longer the open scan.
    pub fn confirm_scan(&mut self, ticket: ScanTicket, items: Vec<ExpenseItem>) -> Result<ReportStep> {
        if self.step != ReportStep::Scanning || self.open_scan != Some(ticket.0) {
            warn!(ticket = ticket.0, "discarding stale scan result");
            return Err(CoreError::StaleScan(ticket.0));
        }
        self.store.add_scanned_items(items)?;
        self.open_scan = None;
        self.apply(WizardEvent::ScanFinished)
    }

    pub fn answer_incident(&mut self, occurred: bool) -> Result<ReportStep> {
        let next = self.apply(WizardEvent::AnswerIncident(occurred))?;
        self.incident = Some(occurred);
        if !occurred {
            self.incident_details.clear();
        }
        Ok(next)
    }

    pub fn submit_incident_details(&mut self, details: &str) -> Result<ReportStep> {
        self.expect(ReportStep::IncidentDetails, WizardEvent::Next)?;
        self.incident_details = required_text("incident details", details)?;
        self.apply(WizardEvent::Next)
    }

    pub fn submit_experience_date(&mut self, date: NaiveDate) -> Result<ReportStep> {
        self.expect(ReportStep::ExperienceDate, WizardEvent::Next)?;
        self.experience.date = date;
        self.apply(WizardEvent::Next)
    }

    pub fn add_participant(&mut self, name: &str) -> Result<()> {
        self.expect(ReportStep::ExperienceParticipants, WizardEvent::Next)?;
        let name = required_text("participant name", name)?;
        self.experience.participants.push(name);
        Ok(())
    }

    pub fn remove_participant(&mut self, index: usize) -> Option<String> {
        (index < self.experience.participants.len())
            .then(|| self.experience.participants.remove(index))
    }

    pub fn submit_participants(&mut self) -> Result<ReportStep> {
        self.expect(ReportStep::ExperienceParticipants, WizardEvent::Next)?;
        self.apply(WizardEvent::Next)
    }

    pub fn submit_location(&mut self, location: &str) -> Result<ReportStep> {
        self.expect(ReportStep::ExperienceLocation, WizardEvent::Next)?;
        self.experience.location = required_text("location", location)?;
        self.apply(WizardEvent::Next)
    }

    pub fn submit_context(&mut self, context: &str) -> Result<ReportStep> {
        self.expect(ReportStep::ExperienceContext, WizardEvent::Next)?;
        self.experience.context = required_text("context", context)?;
        self.apply(WizardEvent::Next)
    }

    pub fn submit_learning(&mut self, learning: &str) -> Result<ReportStep> {
        self.expect(ReportStep::ExperienceLearning, WizardEvent::Next)?;
        self.experience.learning = required_text("learning", learning)?;
        self.apply(WizardEvent::Next)
    }

    pub fn add_photo(&mut self, reference: &str) -> Result<()> {
        self.expect(ReportStep::ExperiencePhotos, WizardEvent::Next)?;
        let reference = required_text("photo", reference)?;
        self.experience.photos.push(reference);
        Ok(())
    }

    pub fn remove_photo(&mut self, index: usize) -> Option<String> {
        (index < self.experience.photos.len()).then(|| self.experience.photos.remove(index))
    }

    pub fn submit_photos(&mut self) -> Result<ReportStep> {
        self.expect(ReportStep::ExperiencePhotos, WizardEvent::Next)?;
        self.apply(WizardEvent::Next)
    }

    /// Sign and finalize. On success the session is `Submitted` and the update
    /// must be applied to the ledger by the caller. On error nothing changes.
    pub fn submit(
        &mut self,
        request: &ExpenseRequest,
        signature: &str,
        finalizer: &ReportFinalizer,
    ) -> Result<ReportUpdate> {
        self.expect(ReportStep::Signature, WizardEvent::Next)?;
        if request.id != self.request_id {
            return Err(CoreError::finalization(format!(
                "session belongs to request {}, not {}",
                self.request_id, request.id
            )));
        }
        let update = finalizer.finalize(
            request,
            self.store.items(),
            signature,
            &self.leader_name,
            self.incident(),
            self.experience.clone(),
        )?;
        self.apply(WizardEvent::Next)?;
        Ok(update)
    }

    fn expect(&self, step: ReportStep, event: WizardEvent) -> Result<()> {
        if self.step != step {
            return Err(CoreError::InvalidTransition {
                from: self.step,
                event: event.to_string(),
            });
        }
        Ok(())
    }

    fn apply(&mut self, event: WizardEvent) -> Result<ReportStep> {
        let next = transition(self.step, event)?;
        debug!(from = ?self.step, to = ?next, %event, "report step");
        if self.step == ReportStep::Scanning {
            self.open_scan = None;
        }
        self.step = next;
        Ok(next)
    }
}

fn required_text(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}
