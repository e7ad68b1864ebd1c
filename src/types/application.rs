//! Credit application schema and its input contract.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Number of model input features.
pub const FEATURE_COUNT: usize = 10;

/// Field order shared by the scaler and the model artifact.
///
/// Changing this order requires re-exporting both artifacts.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "income",
    "loan_amount",
    "credit_history_length",
    "num_open_accounts",
    "debt_to_income",
    "num_late_payments",
    "employment_length",
    "num_credit_inquiries",
    "credit_utilization",
];

#[derive(Debug, Clone, Copy)]
enum Lower {
    Inclusive(f64),
    Exclusive(f64),
}

/// Bounds for one field of the application.
#[derive(Debug, Clone, Copy)]
struct FieldRule {
    name: &'static str,
    lower: Lower,
    upper: Option<f64>,
    integer: bool,
    constraint: &'static str,
}

impl FieldRule {
    fn check(&self, value: Option<f64>) -> Result<f64, ValidationError> {
        let value = value.ok_or(ValidationError::MissingField { field: self.name })?;

        let out_of_range = || ValidationError::OutOfRange {
            field: self.name,
            value,
            constraint: self.constraint,
        };

        if !value.is_finite() {
            return Err(out_of_range());
        }
        if self.integer && value.fract() != 0.0 {
            return Err(ValidationError::NotAnInteger {
                field: self.name,
                value,
            });
        }
        let above_lower = match self.lower {
            Lower::Inclusive(min) => value >= min,
            Lower::Exclusive(min) => value > min,
        };
        let below_upper = self.upper.map_or(true, |max| value <= max);
        if above_lower && below_upper {
            Ok(value)
        } else {
            Err(out_of_range())
        }
    }
}

const FIELD_RULES: [FieldRule; FEATURE_COUNT] = [
    FieldRule {
        name: "age",
        lower: Lower::Inclusive(18.0),
        upper: Some(100.0),
        integer: true,
        constraint: "18 <= age <= 100",
    },
    FieldRule {
        name: "income",
        lower: Lower::Exclusive(0.0),
        upper: None,
        integer: false,
        constraint: "income > 0",
    },
    FieldRule {
        name: "loan_amount",
        lower: Lower::Exclusive(0.0),
        upper: None,
        integer: false,
        constraint: "loan_amount > 0",
    },
    FieldRule {
        name: "credit_history_length",
        lower: Lower::Inclusive(0.0),
        upper: Some(50.0),
        integer: true,
        constraint: "0 <= credit_history_length <= 50",
    },
    FieldRule {
        name: "num_open_accounts",
        lower: Lower::Inclusive(0.0),
        upper: Some(50.0),
        integer: true,
        constraint: "0 <= num_open_accounts <= 50",
    },
    FieldRule {
        name: "debt_to_income",
        lower: Lower::Inclusive(0.0),
        upper: Some(1.0),
        integer: false,
        constraint: "0 <= debt_to_income <= 1",
    },
    FieldRule {
        name: "num_late_payments",
        lower: Lower::Inclusive(0.0),
        upper: Some(100.0),
        integer: true,
        constraint: "0 <= num_late_payments <= 100",
    },
    FieldRule {
        name: "employment_length",
        lower: Lower::Inclusive(0.0),
        upper: Some(50.0),
        integer: true,
        constraint: "0 <= employment_length <= 50",
    },
    FieldRule {
        name: "num_credit_inquiries",
        lower: Lower::Inclusive(0.0),
        upper: Some(50.0),
        integer: true,
        constraint: "0 <= num_credit_inquiries <= 50",
    },
    FieldRule {
        name: "credit_utilization",
        lower: Lower::Inclusive(0.0),
        upper: Some(1.0),
        integer: false,
        constraint: "0 <= credit_utilization <= 1",
    },
];

/// Unvalidated application as received on the wire.
///
/// Every field is optional so that a missing field is reported by name
/// instead of as a generic decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditApplicationPayload {
    pub age: Option<f64>,
    pub income: Option<f64>,
    pub loan_amount: Option<f64>,
    pub credit_history_length: Option<f64>,
    pub num_open_accounts: Option<f64>,
    pub debt_to_income: Option<f64>,
    pub num_late_payments: Option<f64>,
    pub employment_length: Option<f64>,
    pub num_credit_inquiries: Option<f64>,
    pub credit_utilization: Option<f64>,
}

impl CreditApplicationPayload {
    fn values(&self) -> [Option<f64>; FEATURE_COUNT] {
        [
            self.age,
            self.income,
            self.loan_amount,
            self.credit_history_length,
            self.num_open_accounts,
            self.debt_to_income,
            self.num_late_payments,
            self.employment_length,
            self.num_credit_inquiries,
            self.credit_utilization,
        ]
    }
}

/// Batch request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchPayload {
    pub applications: Option<Vec<CreditApplicationPayload>>,
}

/// A credit application that satisfied every field bound.
///
/// Only constructible through [`CreditApplication::validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditApplication {
    age: u32,
    income: f64,
    loan_amount: f64,
    credit_history_length: u32,
    num_open_accounts: u32,
    debt_to_income: f64,
    num_late_payments: u32,
    employment_length: u32,
    num_credit_inquiries: u32,
    credit_utilization: f64,
}

impl CreditApplication {
    /// Validate a single payload, failing on the first violated field in
    /// feature order.
    pub fn validate(payload: &CreditApplicationPayload) -> Result<Self, ValidationError> {
        let mut checked = [0.0_f64; FEATURE_COUNT];
        for ((rule, value), slot) in FIELD_RULES
            .iter()
            .zip(payload.values())
            .zip(checked.iter_mut())
        {
            *slot = rule.check(value)?;
        }

        // Integer fields are range checked above, so the casts are exact.
        Ok(Self {
            age: checked[0] as u32,
            income: checked[1],
            loan_amount: checked[2],
            credit_history_length: checked[3] as u32,
            num_open_accounts: checked[4] as u32,
            debt_to_income: checked[5],
            num_late_payments: checked[6] as u32,
            employment_length: checked[7] as u32,
            num_credit_inquiries: checked[8] as u32,
            credit_utilization: checked[9],
        })
    }

    /// Validate a batch in order. An empty batch, an oversized batch or any
    /// invalid item rejects the whole batch.
    pub fn validate_batch(
        payloads: &[CreditApplicationPayload],
        max_batch_size: usize,
    ) -> Result<Vec<Self>, ValidationError> {
        if payloads.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        if payloads.len() > max_batch_size {
            return Err(ValidationError::BatchTooLarge {
                size: payloads.len(),
                max: max_batch_size,
            });
        }

        payloads
            .iter()
            .enumerate()
            .map(|(index, payload)| Self::validate(payload).map_err(|e| e.at(index)))
            .collect()
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn income(&self) -> f64 {
        self.income
    }

    pub fn loan_amount(&self) -> f64 {
        self.loan_amount
    }

    pub fn credit_history_length(&self) -> u32 {
        self.credit_history_length
    }

    pub fn num_open_accounts(&self) -> u32 {
        self.num_open_accounts
    }

    pub fn debt_to_income(&self) -> f64 {
        self.debt_to_income
    }

    pub fn num_late_payments(&self) -> u32 {
        self.num_late_payments
    }

    pub fn employment_length(&self) -> u32 {
        self.employment_length
    }

    pub fn num_credit_inquiries(&self) -> u32 {
        self.num_credit_inquiries
    }

    pub fn credit_utilization(&self) -> f64 {
        self.credit_utilization
    }
}
