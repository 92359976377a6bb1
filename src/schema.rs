use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Payer record shape a billing code is submitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RecordType {
    /// Standard claim / consultation codes
    Standard,
    /// Per-diem rounding codes
    PerDiem,
}

impl TryFrom<u8> for RecordType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            50 => Ok(RecordType::Standard),
            57 => Ok(RecordType::PerDiem),
            other => Err(format!("unknown billing record type {other}")),
        }
    }
}

impl From<RecordType> for u8 {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::Standard => 50,
            RecordType::PerDiem => 57,
        }
    }
}

/// A billing code from the reference catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingCode {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub day_range: Option<i64>,
    pub max_units: Option<u32>,
    #[serde(default)]
    pub multiple_unit_indicator: bool,
    pub billing_record_type: RecordType,
    #[serde(default)]
    pub fee_cents: Option<i64>,
    #[serde(default)]
    pub section: Option<String>,
}

impl BillingCode {
    pub fn is_per_diem(&self) -> bool {
        self.billing_record_type == RecordType::PerDiem
    }
}

/// Predecessor link between two catalog codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEdge {
    pub code_id: i64,
    pub previous_code_id: i64,
}

/// Codes a physician prefers to bill from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferredSection {
    pub physician_id: String,
    pub section: String,
    pub code_ids: Vec<i64>,
}

/// Reference data handed to the engine by the catalog loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub codes: Vec<BillingCode>,
    #[serde(default)]
    pub edges: Vec<ChainEdge>,
    #[serde(default)]
    pub preferred_sections: Vec<PreferredSection>,
}

impl Catalog {
    pub fn code(&self, id: i64) -> Option<&BillingCode> {
        self.codes.iter().find(|c| c.id == id)
    }

    pub fn code_map(&self) -> HashMap<i64, &BillingCode> {
        self.codes.iter().map(|c| (c.id, c)).collect()
    }

    pub fn sections_for<'a>(
        &'a self,
        physician_id: &'a str,
    ) -> impl Iterator<Item = &'a PreferredSection> + 'a {
        self.preferred_sections
            .iter()
            .filter(move |s| s.physician_id == physician_id)
    }
}

/// One applied billing code on a patient service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCodeInstance {
    pub service_id: String,
    pub code_id: i64,
    pub number_of_units: u32,
    pub service_date: NaiveDate,
    #[serde(default)]
    pub service_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub service_location: Option<char>,
    #[serde(default)]
    pub location_of_service: Option<char>,
}

impl ServiceCodeInstance {
    pub fn new(service_id: &str, code_id: i64, service_date: NaiveDate) -> Self {
        Self {
            service_id: service_id.to_string(),
            code_id,
            number_of_units: 1,
            service_date,
            service_end_date: None,
            service_location: None,
            location_of_service: None,
        }
    }
}

/// A patient stay: admission plus the codes billed against it so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub physician_id: String,
    pub admission_date: NaiveDate,
    #[serde(default)]
    pub instances: Vec<ServiceCodeInstance>,
    #[serde(default)]
    pub version: u64,
}

impl Service {
    pub fn new(id: &str, physician_id: &str, admission_date: NaiveDate) -> Self {
        Self {
            id: id.to_string(),
            physician_id: physician_id.to_string(),
            admission_date,
            instances: Vec::new(),
            version: 0,
        }
    }

    /// Index of the latest per-diem instance, by service date then insertion order.
    pub fn latest_per_diem(&self, catalog: &Catalog) -> Option<usize> {
        self.instances
            .iter()
            .enumerate()
            .filter(|(_, inst)| catalog.code(inst.code_id).is_some_and(BillingCode::is_per_diem))
            .max_by_key(|(idx, inst)| (inst.service_date, *idx))
            .map(|(idx, _)| idx)
    }

    /// A service is active until its latest per-diem code has an end date.
    pub fn is_active(&self, catalog: &Catalog) -> bool {
        match self.latest_per_diem(catalog) {
            Some(idx) => self.instances[idx].service_end_date.is_none(),
            None => true,
        }
    }
}
