use chrono::NaiveDate;
use thiserror::Error;

/// Failures while turning catalog edges into chain records.
///
/// A failure is always scoped to one root; other roots keep building.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("malformed chain data for root {root_id}: {reason}")]
    MalformedChainData { root_id: i64, reason: String },
}

impl ChainError {
    pub fn malformed(root_id: i64, reason: impl Into<String>) -> Self {
        ChainError::MalformedChainData {
            root_id,
            reason: reason.into(),
        }
    }

    pub fn root_id(&self) -> i64 {
        match self {
            ChainError::MalformedChainData { root_id, .. } => *root_id,
        }
    }
}

/// Recoverable rounding failures. Every variant carries a message meant for
/// the person running the rounding, none of them are fatal to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundingError {
    #[error("missing configuration for physician {physician_id}: {reason}")]
    MissingConfiguration { physician_id: String, reason: String },

    #[error("no applicable code for {date}: {reason}, please configure an appropriate section/code")]
    NoApplicableCode { date: NaiveDate, reason: String },

    #[error("billing code {0} is not in the catalog")]
    UnknownCode(i64),

    #[error("service {0} is not in the ledger")]
    UnknownService(String),

    #[error("discharge date {requested} is before the current code started on {started}")]
    InvalidDischarge {
        requested: NaiveDate,
        started: NaiveDate,
    },

    #[error("service {service_id} changed concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        service_id: String,
        expected: u64,
        found: u64,
    },

    #[error("service {service_id} was discharged on {discharged_on}")]
    Discharged {
        service_id: String,
        discharged_on: NaiveDate,
    },
}

/// Errors that stop claim batch generation or verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("field {field} must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: i64 },

    #[error("trailer {field} is {found}, expected {expected}")]
    ChecksumMismatch {
        field: &'static str,
        expected: i64,
        found: i64,
    },

    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("billing code {0} is not in the catalog")]
    UnknownCode(i64),
}
