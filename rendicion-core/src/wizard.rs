//! Report wizard state machine.
//!
//! Pure transition table: (step, event) -> step. Data guards (is the name valid,
//! is there at least one item, ...) live in `ReportSession`, not here.
//!
//! Main path:
//!   welcome -> leader_name -> expense_hub -> incident_check -> [incident_details]
//!   -> experience_date -> experience_participants -> experience_location
//!   -> experience_context -> experience_learning -> experience_photos
//!   -> signature -> submitted
//!
//! Sub-flows off the hub:
//!   expense_hub -> add_method -> add_manual_desc -> add_manual_amount
//!   -> add_manual_receipt_number -> expense_hub
//!   add_method -> scanning -> expense_hub

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStep {
    Welcome,
    LeaderName,
    ExpenseHub,
    AddMethod,
    AddManualDesc,
    AddManualAmount,
    AddManualReceiptNumber,
    Scanning,
    IncidentCheck,
    IncidentDetails,
    ExperienceDate,
    ExperienceParticipants,
    ExperienceLocation,
    ExperienceContext,
    ExperienceLearning,
    ExperiencePhotos,
    Signature,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardEvent {
    Next,
    Previous,
    /// Leave the hub to add an expense.
    AddExpense,
    ChooseManual,
    ChooseScan,
    /// Scan view closed, confirmed or cancelled.
    ScanFinished,
    AnswerIncident(bool),
}

impl fmt::Display for WizardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardEvent::Next => f.write_str("next"),
            WizardEvent::Previous => f.write_str("previous"),
            WizardEvent::AddExpense => f.write_str("add expense"),
            WizardEvent::ChooseManual => f.write_str("choose manual"),
            WizardEvent::ChooseScan => f.write_str("choose scan"),
            WizardEvent::ScanFinished => f.write_str("scan finished"),
            WizardEvent::AnswerIncident(yes) => write!(f, "answer incident ({yes})"),
        }
    }
}

impl ReportStep {
    /// Fixed predecessor map followed by `Previous`.
    pub fn predecessor(self) -> Option<ReportStep> {
        use ReportStep::*;
        match self {
            LeaderName => Some(Welcome),
            ExpenseHub => Some(LeaderName),
            IncidentCheck => Some(ExpenseHub),
            IncidentDetails => Some(IncidentCheck),
            ExperienceDate => Some(IncidentCheck),
            ExperienceParticipants => Some(ExperienceDate),
            ExperienceLocation => Some(ExperienceParticipants),
            ExperienceContext => Some(ExperienceLocation),
            ExperienceLearning => Some(ExperienceContext),
            ExperiencePhotos => Some(ExperienceLearning),
            Signature => Some(ExperiencePhotos),
            AddMethod => Some(ExpenseHub),
            AddManualDesc => Some(AddMethod),
            AddManualAmount => Some(AddManualDesc),
            AddManualReceiptNumber => Some(AddManualAmount),
            Welcome | Scanning | Submitted => None,
        }
    }

    /// Successor on `Next`, for steps with a single forward exit.
    fn successor(self) -> Option<ReportStep> {
        use ReportStep::*;
        match self {
            Welcome => Some(LeaderName),
            LeaderName => Some(ExpenseHub),
            ExpenseHub => Some(IncidentCheck),
            AddManualDesc => Some(AddManualAmount),
            AddManualAmount => Some(AddManualReceiptNumber),
            AddManualReceiptNumber => Some(ExpenseHub),
            IncidentDetails => Some(ExperienceDate),
            ExperienceDate => Some(ExperienceParticipants),
            ExperienceParticipants => Some(ExperienceLocation),
            ExperienceLocation => Some(ExperienceContext),
            ExperienceContext => Some(ExperienceLearning),
            ExperienceLearning => Some(ExperiencePhotos),
            ExperiencePhotos => Some(Signature),
            Signature => Some(Submitted),
            // branching or terminal steps have no plain "next"
            AddMethod | Scanning | IncidentCheck | Submitted => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ReportStep::Submitted
    }

    /// Rough completion percentage, for progress display.
    pub fn progress(self) -> u8 {
        use ReportStep::*;
        match self {
            Welcome => 0,
            LeaderName => 5,
            ExpenseHub => 15,
            AddMethod => 16,
            AddManualDesc | Scanning => 20,
            AddManualAmount => 25,
            AddManualReceiptNumber => 30,
            IncidentCheck => 50,
            IncidentDetails => 55,
            ExperienceDate => 65,
            ExperienceParticipants => 70,
            ExperienceLocation => 75,
            ExperienceContext => 80,
            ExperienceLearning => 85,
            ExperiencePhotos => 90,
            Signature => 95,
            Submitted => 100,
        }
    }
}

/// Apply `event` to `step`. Unknown pairs are rejected and the caller keeps its step.
pub fn transition(step: ReportStep, event: WizardEvent) -> Result<ReportStep> {
    use ReportStep::*;

    let next = match (step, event) {
        (Submitted, _) => None,
        (_, WizardEvent::Previous) => step.predecessor(),
        (ExpenseHub, WizardEvent::AddExpense) => Some(AddMethod),
        (AddMethod, WizardEvent::ChooseManual) => Some(AddManualDesc),
        (AddMethod, WizardEvent::ChooseScan) => Some(Scanning),
        (Scanning, WizardEvent::ScanFinished) => Some(ExpenseHub),
        (IncidentCheck, WizardEvent::AnswerIncident(true)) => Some(IncidentDetails),
        (IncidentCheck, WizardEvent::AnswerIncident(false)) => Some(ExperienceDate),
        (_, WizardEvent::Next) => step.successor(),
        _ => None,
    };

    next.ok_or_else(|| CoreError::InvalidTransition {
        from: step,
        event: event.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReportStep::*;

    fn run(start: ReportStep, events: &[WizardEvent]) -> Result<ReportStep> {
        events.iter().try_fold(start, |s, e| transition(s, *e))
    }

    #[test]
    fn test_happy_path_without_incident() {
        use WizardEvent::*;
        let end = run(
            Welcome,
            &[
                Next,
                Next,
                AddExpense,
                ChooseManual,
                Next,
                Next,
                Next,
                Next,
                AnswerIncident(false),
                Next,
                Next,
                Next,
                Next,
                Next,
                Next,
                Next,
            ],
        )
        .unwrap();
        assert_eq!(end, Submitted);
    }

    #[test]
    fn test_incident_branch() {
        let s = transition(IncidentCheck, WizardEvent::AnswerIncident(true)).unwrap();
        assert_eq!(s, IncidentDetails);
        assert_eq!(transition(s, WizardEvent::Next).unwrap(), ExperienceDate);
        // both branches go back to the question
        assert_eq!(transition(ExperienceDate, WizardEvent::Previous).unwrap(), IncidentCheck);
        assert_eq!(transition(IncidentDetails, WizardEvent::Previous).unwrap(), IncidentCheck);
    }

    #[test]
    fn test_scan_subflow_returns_to_hub() {
        let s = run(ExpenseHub, &[WizardEvent::AddExpense, WizardEvent::ChooseScan]).unwrap();
        assert_eq!(s, Scanning);
        assert!(transition(Scanning, WizardEvent::Previous).is_err());
        assert_eq!(transition(Scanning, WizardEvent::ScanFinished).unwrap(), ExpenseHub);
    }

    #[test]
    fn test_only_hub_has_add_expense_exit() {
        for step in [Welcome, LeaderName, IncidentCheck, Signature, AddMethod, Scanning] {
            assert!(transition(step, WizardEvent::AddExpense).is_err());
        }
        assert_eq!(transition(ExpenseHub, WizardEvent::AddExpense).unwrap(), AddMethod);
    }

    #[test]
    fn test_submitted_is_terminal() {
        for e in [
            WizardEvent::Next,
            WizardEvent::Previous,
            WizardEvent::AddExpense,
            WizardEvent::ScanFinished,
            WizardEvent::AnswerIncident(true),
        ] {
            assert!(transition(Submitted, e).is_err());
        }
    }

    #[test]
    fn test_previous_walks_manual_subflow_back() {
        let s = run(
            AddManualReceiptNumber,
            &[WizardEvent::Previous, WizardEvent::Previous, WizardEvent::Previous],
        )
        .unwrap();
        assert_eq!(s, AddMethod);
        assert_eq!(transition(s, WizardEvent::Previous).unwrap(), ExpenseHub);
        assert!(transition(Welcome, WizardEvent::Previous).is_err());
    }

    #[test]
    fn test_invalid_transition_reports_step() {
        let err = transition(IncidentCheck, WizardEvent::Next).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidTransition {
                from: IncidentCheck,
                event: "next".to_string()
            }
        );
    }
}
