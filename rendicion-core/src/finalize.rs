//! Report finalizer: turns an accumulated report draft into one immutable update.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::form::has_first_and_last_name;
use crate::item_store::ExpenseItem;
use crate::reconcile::{reconcile, ReconcileConfig, Reconciliation};
use crate::request::{ExpenseRequest, SpiritualExperience};

/// Whether something went wrong during the activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Incident {
    None,
    Occurred { details: String },
}

impl Incident {
    pub fn occurred(&self) -> bool {
        matches!(self, Incident::Occurred { .. })
    }

    pub fn details(&self) -> &str {
        match self {
            Incident::None => "",
            Incident::Occurred { details } => details,
        }
    }
}

/// Everything needed to complete one request. Applied by `RequestLedger::complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportUpdate {
    pub request_id: String,
    pub receipt_images: Vec<String>,
    pub signature: String,
    pub leader_name: String,
    pub incident: Incident,
    pub experience: SpiritualExperience,
    pub reconciliation: Reconciliation,
}

/// Builds report updates, classifying the variance with `reconcile`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFinalizer {
    pub reconcile: ReconcileConfig,
}

impl ReportFinalizer {
    pub fn new(reconcile: ReconcileConfig) -> Self {
        Self { reconcile }
    }

    /// Validate the draft and build the update for `request`.
    ///
    /// Receipt images are deduplicated in first-seen order: several lines of one
    /// physical receipt share a single image.
    pub fn finalize(
        &self,
        request: &ExpenseRequest,
        items: &[ExpenseItem],
        signature: &str,
        leader_name: &str,
        incident: Incident,
        experience: SpiritualExperience,
    ) -> Result<ReportUpdate> {
        if !request.is_pending() {
            warn!(id = %request.id, "finalize attempted on a completed request");
            return Err(CoreError::finalization(format!(
                "request {} is already completed",
                request.id
            )));
        }
        if signature.trim().is_empty() {
            return Err(CoreError::finalization("a signature is required"));
        }
        if !has_first_and_last_name(leader_name) {
            return Err(CoreError::validation(
                "leader name must include first and last name",
            ));
        }

        let mut receipt_images: Vec<String> = Vec::new();
        for img in items.iter().filter_map(|i| i.receipt_image.as_ref()) {
            if !receipt_images.contains(img) {
                receipt_images.push(img.clone());
            }
        }

        Ok(ReportUpdate {
            request_id: request.id.clone(),
            receipt_images,
            signature: signature.to_string(),
            leader_name: leader_name.trim().to_string(),
            incident,
            experience,
            reconciliation: reconcile(items, request.amount, &self.reconcile),
        })
    }
}

/// `ReportFinalizer::finalize` with the default variance epsilon.
pub fn finalize(
    request: &ExpenseRequest,
    items: &[ExpenseItem],
    signature: &str,
    leader_name: &str,
    incident: Incident,
    experience: SpiritualExperience,
) -> Result<ReportUpdate> {
    ReportFinalizer::default().finalize(request, items, signature, leader_name, incident, experience)
}
