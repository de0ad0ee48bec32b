//! Expense requests: a funding request and, once reported, its reconciliation.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a request. Only ever moves Pending -> Completed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[serde(rename = "COMPLETADO")]
    Completed,
}

impl RequestStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Completed => "completed",
        }
    }
}

/// Organizations with a fixed name in the request form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownOrganization {
    ReliefSociety,
    EldersQuorum,
    YoungSingleAdults,
    Primary,
    Administration,
}

impl KnownOrganization {
    pub const ALL: [KnownOrganization; 5] = [
        KnownOrganization::ReliefSociety,
        KnownOrganization::EldersQuorum,
        KnownOrganization::YoungSingleAdults,
        KnownOrganization::Primary,
        KnownOrganization::Administration,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            KnownOrganization::ReliefSociety => "Sociedad de Socorro",
            KnownOrganization::EldersQuorum => "Cuórum de Elderes",
            KnownOrganization::YoungSingleAdults => "Jas",
            KnownOrganization::Primary => "Primaria",
            KnownOrganization::Administration => "Administración",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|o| o.name().eq_ignore_ascii_case(name))
    }
}

/// The organization a request is filed under.
///
/// Stored as a plain string; anything that is not a known name round-trips as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Organization {
    Known(KnownOrganization),
    Other(String),
}

impl Organization {
    pub fn name(&self) -> &str {
        match self {
            Organization::Known(k) => k.name(),
            Organization::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for Organization {
    fn from(s: String) -> Self {
        match KnownOrganization::from_name(&s) {
            Some(k) => Organization::Known(k),
            None => Organization::Other(s),
        }
    }
}

impl From<Organization> for String {
    fn from(o: Organization) -> Self {
        match o {
            Organization::Known(k) => k.name().to_string(),
            Organization::Other(s) => s,
        }
    }
}

impl fmt::Display for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened during the activity, as told by the reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpiritualExperience {
    pub date: NaiveDate,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub location: String,
    /// What the group was doing.
    #[serde(default)]
    pub context: String,
    /// What the group learned.
    #[serde(default)]
    pub learning: String,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl SpiritualExperience {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            participants: Vec::new(),
            location: String::new(),
            context: String::new(),
            learning: String::new(),
            photos: Vec::new(),
        }
    }
}

/// A funding request and its eventual reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRequest {
    pub id: String,
    pub amount: Decimal,
    pub reason: String,
    pub date: NaiveDate,
    pub status: RequestStatus,
    pub applicant_name: String,
    pub payee_name: String,
    pub organization: Organization,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receipt_images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_occurred: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spiritual_experience: Option<SpiritualExperience>,
}

impl ExpenseRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Last day to submit the report for this request.
    pub fn due_date(&self, due_days: i64) -> NaiveDate {
        self.date + Duration::days(due_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> ExpenseRequest {
        ExpenseRequest {
            id: "1700000000001".to_string(),
            amount: dec!(150.75),
            reason: "Materiales para actividad".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            status: RequestStatus::Pending,
            applicant_name: "Juan Pérez".to_string(),
            payee_name: "Tienda El Sol".to_string(),
            organization: Organization::Known(KnownOrganization::Primary),
            receipt_images: vec![],
            signature: None,
            leader_name: None,
            incident_occurred: None,
            incident_details: None,
            spiritual_experience: None,
        }
    }

    #[test]
    fn test_serializes_in_stored_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["status"], "PENDIENTE");
        assert_eq!(json["organization"], "Primaria");
        assert_eq!(json["applicantName"], "Juan Pérez");
        assert_eq!(json["amount"], 150.75);
        assert_eq!(json["date"], "2025-03-01");
        assert!(json.get("signature").is_none());
    }

    #[test]
    fn test_reads_legacy_record_with_free_text_organization() {
        let raw = r#"{
            "id": "1600000000001",
            "amount": 210.5,
            "reason": "Compra de manualidades",
            "date": "2025-01-10",
            "status": "COMPLETADO",
            "applicantName": "Ana Rodríguez",
            "payeeName": "Librería El Saber",
            "organization": "Hombres Jóvenes",
            "receiptImages": ["img-1"]
        }"#;
        let req: ExpenseRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.status, RequestStatus::Completed);
        assert_eq!(req.amount, dec!(210.5));
        assert_eq!(
            req.organization,
            Organization::Other("Hombres Jóvenes".to_string())
        );
        assert_eq!(req.receipt_images, vec!["img-1".to_string()]);
    }

    #[test]
    fn test_due_date_adds_days() {
        let req = sample();
        assert_eq!(
            req.due_date(14),
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_known_organization_lookup_ignores_ascii_case() {
        assert_eq!(
            KnownOrganization::from_name("primaria"),
            Some(KnownOrganization::Primary)
        );
        assert_eq!(KnownOrganization::from_name("Otros"), None);
    }
}
