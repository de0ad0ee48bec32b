//! Request form: field rules for a new funding request and the four-step request wizard.
//!
//! The form is filled step by step and may be saved as a draft at any point, so every
//! field is optional until `validate` turns it into a `ValidatedRequest`.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::request::Organization;

/// True if `name` has at least two whitespace-separated tokens (first and last name).
pub fn has_first_and_last_name(name: &str) -> bool {
    name.split_whitespace().count() >= 2
}

/// Thresholds for request validation. These are judgment calls, not invariants,
/// so they are loaded from config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub min_name_len: usize,
    pub max_name_len: usize,
    pub min_year: i32,
    pub min_reason_len: usize,
    pub max_reason_len: usize,
    /// Phrases that make a short purpose too vague to accept.
    pub generic_phrases: Vec<String>,
    /// A purpose at least this long is accepted even if it contains a generic phrase.
    pub generic_max_len: usize,
    pub max_amount: Decimal,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_name_len: 3,
            max_name_len: 100,
            min_year: 2024,
            min_reason_len: 10,
            max_reason_len: 200,
            generic_phrases: [
                "fortalecer la fe de los miembros a través de",
                "fortalecer la fe",
                "actividad para",
                "reunión de",
                "evento para",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            generic_max_len: 50,
            max_amount: Decimal::from(999_999),
        }
    }
}

impl ValidationRules {
    pub fn check_person_name(&self, field: &str, name: &str) -> Result<()> {
        let len = name.trim().chars().count();
        if len < self.min_name_len {
            return Err(CoreError::validation(format!(
                "{field} must have at least {} characters",
                self.min_name_len
            )));
        }
        if len > self.max_name_len {
            return Err(CoreError::validation(format!("{field} is too long")));
        }
        if !has_first_and_last_name(name) {
            return Err(CoreError::validation(format!(
                "{field} must include first and last name"
            )));
        }
        Ok(())
    }

    pub fn check_date(&self, date: NaiveDate) -> Result<()> {
        if date.year() < self.min_year {
            return Err(CoreError::validation(format!(
                "date must be in {} or later",
                self.min_year
            )));
        }
        Ok(())
    }

    pub fn check_reason(&self, reason: &str) -> Result<()> {
        let reason = reason.trim();
        let len = reason.chars().count();
        if len < self.min_reason_len {
            return Err(CoreError::validation(format!(
                "purpose must have at least {} characters",
                self.min_reason_len
            )));
        }
        if len > self.max_reason_len {
            return Err(CoreError::validation("purpose is too long"));
        }
        let lower = reason.to_lowercase();
        let generic = self
            .generic_phrases
            .iter()
            .any(|p| lower.contains(&p.to_lowercase()) && len < self.generic_max_len);
        if generic {
            return Err(CoreError::validation(
                "purpose is too generic; describe the expense more specifically",
            ));
        }
        Ok(())
    }

    pub fn check_organization(&self, org: &Organization) -> Result<()> {
        match org {
            Organization::Other(text) if text.trim().is_empty() => Err(CoreError::validation(
                "organization must be specified",
            )),
            _ => Ok(()),
        }
    }

    pub fn check_amount(&self, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(CoreError::validation("amount must be greater than 0"));
        }
        if amount > self.max_amount {
            return Err(CoreError::validation("amount is too high"));
        }
        Ok(())
    }
}

/// Steps of the request wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStep {
    PersonalData,
    Purpose,
    Amount,
    Review,
}

impl RequestStep {
    pub const COUNT: usize = 4;

    /// 1-based position, for "step N of 4".
    pub fn number(&self) -> usize {
        match self {
            RequestStep::PersonalData => 1,
            RequestStep::Purpose => 2,
            RequestStep::Amount => 3,
            RequestStep::Review => 4,
        }
    }

    pub fn next(self) -> Self {
        match self {
            RequestStep::PersonalData => RequestStep::Purpose,
            RequestStep::Purpose => RequestStep::Amount,
            RequestStep::Amount | RequestStep::Review => RequestStep::Review,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            RequestStep::PersonalData | RequestStep::Purpose => RequestStep::PersonalData,
            RequestStep::Amount => RequestStep::Purpose,
            RequestStep::Review => RequestStep::Amount,
        }
    }
}

/// A request as the wizard collects it; doubles as the request draft snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestForm {
    pub applicant_name: String,
    pub payee_name: String,
    pub date: Option<NaiveDate>,
    pub reason: String,
    pub organization: Option<Organization>,
    pub amount: Option<Decimal>,
}

/// A form that passed every rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub applicant_name: String,
    pub payee_name: String,
    pub date: NaiveDate,
    pub reason: String,
    pub organization: Organization,
    pub amount: Decimal,
}

impl RequestForm {
    /// Validate only the fields collected by `step`.
    pub fn validate_step(&self, step: RequestStep, rules: &ValidationRules) -> Result<()> {
        match step {
            RequestStep::PersonalData => {
                rules.check_person_name("applicant name", &self.applicant_name)?;
                rules.check_person_name("payee name", &self.payee_name)?;
                let date = self
                    .date
                    .ok_or_else(|| CoreError::validation("date is required"))?;
                rules.check_date(date)
            }
            RequestStep::Purpose => {
                rules.check_reason(&self.reason)?;
                let org = self
                    .organization
                    .as_ref()
                    .ok_or_else(|| CoreError::validation("organization is required"))?;
                rules.check_organization(org)
            }
            RequestStep::Amount => {
                let amount = self
                    .amount
                    .ok_or_else(|| CoreError::validation("amount is required"))?;
                rules.check_amount(amount)
            }
            RequestStep::Review => Ok(()),
        }
    }

    pub fn validate(&self, rules: &ValidationRules) -> Result<ValidatedRequest> {
        for step in [
            RequestStep::PersonalData,
            RequestStep::Purpose,
            RequestStep::Amount,
        ] {
            self.validate_step(step, rules)?;
        }

        // validate_step guarantees these are present
        let (Some(date), Some(organization), Some(amount)) =
            (self.date, self.organization.clone(), self.amount)
        else {
            return Err(CoreError::validation("form is incomplete"));
        };

        Ok(ValidatedRequest {
            applicant_name: self.applicant_name.trim().to_string(),
            payee_name: self.payee_name.trim().to_string(),
            date,
            reason: self.reason.trim().to_string(),
            organization: match organization {
                Organization::Other(text) => Organization::Other(text.trim().to_string()),
                known => known,
            },
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::KnownOrganization;
    use rust_decimal_macros::dec;

    fn filled() -> RequestForm {
        RequestForm {
            applicant_name: "Juan Pérez".to_string(),
            payee_name: "María García".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 5, 2),
            reason: "Compra de refrigerios para la clase de la Primaria del domingo".to_string(),
            organization: Some(Organization::Known(KnownOrganization::Primary)),
            amount: Some(dec!(85.20)),
        }
    }

    #[test]
    fn test_full_name_needs_two_tokens() {
        assert!(has_first_and_last_name("Ana  Rodríguez"));
        assert!(!has_first_and_last_name("  Ana "));
        assert!(!has_first_and_last_name(""));
    }

    #[test]
    fn test_valid_form_passes() {
        let v = filled().validate(&ValidationRules::default()).unwrap();
        assert_eq!(v.amount, dec!(85.20));
        assert_eq!(v.organization.name(), "Primaria");
    }

    #[test]
    fn test_rejects_old_date() {
        let mut f = filled();
        f.date = NaiveDate::from_ymd_opt(2023, 12, 31);
        let err = f.validate(&ValidationRules::default()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_rejects_short_generic_purpose() {
        let mut f = filled();
        f.reason = "Actividad para jóvenes".to_string();
        assert!(f.validate_step(RequestStep::Purpose, &ValidationRules::default()).is_err());

        // long enough to be specific despite the phrase
        f.reason = "Actividad para jóvenes: compra de pizarras y plumones para el taller".to_string();
        assert!(f.validate_step(RequestStep::Purpose, &ValidationRules::default()).is_ok());
    }

    #[test]
    fn test_other_organization_requires_text() {
        let mut f = filled();
        f.organization = Some(Organization::Other("  ".to_string()));
        assert!(f.validate(&ValidationRules::default()).is_err());
        f.organization = Some(Organization::Other(" Hombres Jóvenes ".to_string()));
        let v = f.validate(&ValidationRules::default()).unwrap();
        assert_eq!(v.organization, Organization::Other("Hombres Jóvenes".to_string()));
    }

    #[test]
    fn test_amount_bounds() {
        let rules = ValidationRules::default();
        assert!(rules.check_amount(Decimal::ZERO).is_err());
        assert!(rules.check_amount(dec!(0.01)).is_ok());
        assert!(rules.check_amount(dec!(999999)).is_ok());
        assert!(rules.check_amount(dec!(1000000)).is_err());
    }

    #[test]
    fn test_request_steps_clamp() {
        assert_eq!(RequestStep::PersonalData.previous(), RequestStep::PersonalData);
        assert_eq!(RequestStep::Review.next(), RequestStep::Review);
        assert_eq!(RequestStep::Purpose.next().number(), 3);
    }
}
