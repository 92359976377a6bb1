//! Day-range chaining of billing codes, daily rounding of hospital stays and
//! fixed-width claim batch files.

pub mod analysis;
pub mod batch;
pub mod chain;
pub mod config;
pub mod dates;
pub mod error;
pub mod json_faker;
pub mod ledger;
pub mod logging;
pub mod reader;
pub mod reporter;
pub mod scheduler;
pub mod schema;

pub use chain::{BillingCodeChain, ChainTable, build_all, build_chain};
pub use error::{ChainError, FormatError, RoundingError};
pub use ledger::ServiceLedger;
pub use scheduler::{RoundingContext, RoundingOutcome};
pub use schema::{BillingCode, Catalog, ChainEdge, PreferredSection, RecordType, Service, ServiceCodeInstance};
