use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed vocabulary of application fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    MonthlyIncome,
    EmploymentYears,
    EmploymentType,
    DebtToIncome,
    ExistingLoans,
    LatePaymentCount,
    CreditUtilization,
    RequestedAmount,
    LoanPurpose,
    Age,
    EducationLevel,
    MaritalStatus,
    Dependents,
    HomeOwnership,
    SavingsBalance,
    CheckingBalance,
    CreditHistoryLength,
    PreviousDefaults,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Categorical,
}

impl Field {
    pub const ALL: [Field; 18] = [
        Field::MonthlyIncome,
        Field::EmploymentYears,
        Field::EmploymentType,
        Field::DebtToIncome,
        Field::ExistingLoans,
        Field::LatePaymentCount,
        Field::CreditUtilization,
        Field::RequestedAmount,
        Field::LoanPurpose,
        Field::Age,
        Field::EducationLevel,
        Field::MaritalStatus,
        Field::Dependents,
        Field::HomeOwnership,
        Field::SavingsBalance,
        Field::CheckingBalance,
        Field::CreditHistoryLength,
        Field::PreviousDefaults,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Field::MonthlyIncome => "monthly_income",
            Field::EmploymentYears => "employment_years",
            Field::EmploymentType => "employment_type",
            Field::DebtToIncome => "debt_to_income",
            Field::ExistingLoans => "existing_loans",
            Field::LatePaymentCount => "late_payment_count",
            Field::CreditUtilization => "credit_utilization",
            Field::RequestedAmount => "requested_amount",
            Field::LoanPurpose => "loan_purpose",
            Field::Age => "age",
            Field::EducationLevel => "education_level",
            Field::MaritalStatus => "marital_status",
            Field::Dependents => "dependents",
            Field::HomeOwnership => "home_ownership",
            Field::SavingsBalance => "savings_balance",
            Field::CheckingBalance => "checking_balance",
            Field::CreditHistoryLength => "credit_history_length",
            Field::PreviousDefaults => "previous_defaults",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == name.trim())
    }

    pub const fn kind(self) -> FieldKind {
        match self {
            Field::EmploymentType
            | Field::LoanPurpose
            | Field::EducationLevel
            | Field::MaritalStatus
            | Field::HomeOwnership => FieldKind::Categorical,
            _ => FieldKind::Numeric,
        }
    }

    /// Marital status feeds the scorer's record but is withheld from business rules.
    pub const fn is_rule_visible(self) -> bool {
        !matches!(self, Field::MaritalStatus)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw value held by an application field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            FieldValue::Number(_) => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

/// Flat, immutable view of an application as consumed by the scorer and rule evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplicationRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    application_id: Option<ApplicationId>,
    #[serde(flatten)]
    fields: BTreeMap<Field, FieldValue>,
}

impl ApplicationRecord {
    pub fn new(application_id: Option<ApplicationId>) -> Self {
        Self {
            application_id,
            fields: BTreeMap::new(),
        }
    }

    pub fn from_fields<I, V>(application_id: Option<ApplicationId>, fields: I) -> Self
    where
        I: IntoIterator<Item = (Field, V)>,
        V: Into<FieldValue>,
    {
        Self {
            application_id,
            fields: fields
                .into_iter()
                .map(|(field, value)| (field, value.into()))
                .collect(),
        }
    }

    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    /// Copy of this record with `changes` applied on top; the original is left untouched.
    pub fn with_changes<'a, I>(&self, changes: I) -> Self
    where
        I: IntoIterator<Item = (&'a Field, &'a FieldValue)>,
    {
        let mut modified = self.clone();
        for (field, value) in changes {
            modified.fields.insert(*field, value.clone());
        }
        modified
    }

    pub fn application_id(&self) -> Option<&ApplicationId> {
        self.application_id.as_ref()
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn number(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }
}

/// Caller-side contract violations detected before the decision core runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputContractError {
    #[error("risk score {score} is outside [0, 1]")]
    ScoreOutOfRange { score: f64 },
    #[error("invalid {field}: {reason}")]
    InvalidField { field: Field, reason: String },
}

impl InputContractError {
    fn invalid(field: Field, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

pub const EMPLOYMENT_TYPES: [&str; 3] = ["permanent", "contract", "self_employed"];
pub const LOAN_PURPOSES: [&str; 5] = ["home", "car", "education", "business", "personal"];
pub const EDUCATION_LEVELS: [&str; 4] = ["high_school", "bachelor", "master", "phd"];
pub const MARITAL_STATUSES: [&str; 4] = ["single", "married", "divorced", "widowed"];
pub const HOME_OWNERSHIP: [&str; 4] = ["own", "mortgage", "rent", "family"];

/// Typed intake form for a credit application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditApplication {
    #[serde(default)]
    pub application_id: Option<String>,
    pub monthly_income: f64,
    pub employment_years: u32,
    pub employment_type: String,
    pub debt_to_income: f64,
    pub existing_loans: u32,
    pub late_payment_count: u32,
    pub credit_utilization: f64,
    pub requested_amount: f64,
    pub loan_purpose: String,
    pub age: u32,
    pub education_level: String,
    pub marital_status: String,
    pub dependents: u32,
    pub home_ownership: String,
    pub savings_balance: f64,
    pub checking_balance: f64,
    pub credit_history_length: u32,
    pub previous_defaults: u32,
}

impl CreditApplication {
    /// Check value ranges and categorical enumerations.
    pub fn validate(&self) -> Result<(), InputContractError> {
        positive(Field::MonthlyIncome, self.monthly_income)?;
        within(Field::DebtToIncome, self.debt_to_income, 0.0, 2.0)?;
        within(Field::CreditUtilization, self.credit_utilization, 0.0, 1.5)?;
        positive(Field::RequestedAmount, self.requested_amount)?;
        within(Field::SavingsBalance, self.savings_balance, 0.0, f64::MAX)?;
        within(Field::CheckingBalance, self.checking_balance, 0.0, f64::MAX)?;

        if !(20..=70).contains(&self.age) {
            return Err(InputContractError::invalid(
                Field::Age,
                format!("{} is outside 20..=70", self.age),
            ));
        }

        one_of(Field::EmploymentType, &self.employment_type, &EMPLOYMENT_TYPES)?;
        one_of(Field::LoanPurpose, &self.loan_purpose, &LOAN_PURPOSES)?;
        one_of(Field::EducationLevel, &self.education_level, &EDUCATION_LEVELS)?;
        one_of(Field::MaritalStatus, &self.marital_status, &MARITAL_STATUSES)?;
        one_of(Field::HomeOwnership, &self.home_ownership, &HOME_OWNERSHIP)?;

        Ok(())
    }

    pub fn to_record(&self) -> ApplicationRecord {
        let id = self
            .application_id
            .as_ref()
            .map(|value| ApplicationId(value.clone()));

        ApplicationRecord::new(id)
            .with(Field::MonthlyIncome, self.monthly_income)
            .with(Field::EmploymentYears, self.employment_years)
            .with(Field::EmploymentType, self.employment_type.as_str())
            .with(Field::DebtToIncome, self.debt_to_income)
            .with(Field::ExistingLoans, self.existing_loans)
            .with(Field::LatePaymentCount, self.late_payment_count)
            .with(Field::CreditUtilization, self.credit_utilization)
            .with(Field::RequestedAmount, self.requested_amount)
            .with(Field::LoanPurpose, self.loan_purpose.as_str())
            .with(Field::Age, self.age)
            .with(Field::EducationLevel, self.education_level.as_str())
            .with(Field::MaritalStatus, self.marital_status.as_str())
            .with(Field::Dependents, self.dependents)
            .with(Field::HomeOwnership, self.home_ownership.as_str())
            .with(Field::SavingsBalance, self.savings_balance)
            .with(Field::CheckingBalance, self.checking_balance)
            .with(Field::CreditHistoryLength, self.credit_history_length)
            .with(Field::PreviousDefaults, self.previous_defaults)
    }
}

fn positive(field: Field, value: f64) -> Result<(), InputContractError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(InputContractError::invalid(
            field,
            format!("{value} must be greater than zero"),
        ))
    }
}

fn within(field: Field, value: f64, min: f64, max: f64) -> Result<(), InputContractError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else if max == f64::MAX {
        Err(InputContractError::invalid(
            field,
            format!("{value} must be at least {min}"),
        ))
    } else {
        Err(InputContractError::invalid(
            field,
            format!("{value} is outside {min}..={max}"),
        ))
    }
}

fn one_of(field: Field, value: &str, allowed: &[&str]) -> Result<(), InputContractError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(InputContractError::invalid(
            field,
            format!("'{value}' is not one of {}", allowed.join(", ")),
        ))
    }
}
