use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::layout::{
    HEADER, HEADER_FILLER, HEADER_TYPE, SERVICE_50, SERVICE_50_TYPE, SERVICE_57, SERVICE_57_TYPE,
    SUBMISSION_TYPE, TRAILER, TRAILER_FILLER, TRAILER_TYPE,
};
use super::field::FieldSpec;
use crate::dates::{add_days, format_ddmmyy, format_hhmm, format_mmyy};
use crate::error::FormatError;
use crate::schema::{Catalog, RecordType, ServiceCodeInstance};

/// Practitioner block at the top of every batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PractitionerHeader {
    pub practitioner_number: u32,
    pub group_number: u32,
    pub clinic_number: u32,
    pub name: String,
    pub address: String,
    pub city_province: String,
    pub postal_code: String,
    #[serde(default)]
    pub corporation_indicator: Option<char>,
}

impl PractitionerHeader {
    pub fn layout(&self) -> (&'static str, &'static [FieldSpec], Vec<String>) {
        let values = vec![
            HEADER_TYPE.to_string(),
            self.practitioner_number.to_string(),
            self.group_number.to_string(),
            HEADER_FILLER.to_string(),
            self.clinic_number.to_string(),
            self.name.to_uppercase(),
            self.address.clone(),
            self.city_province.clone(),
            self.postal_code.replace(' ', "").to_uppercase(),
            SUBMISSION_TYPE.to_string(),
            optional_char(self.corporation_indicator),
        ];
        (HEADER_TYPE, HEADER, values)
    }
}

/// Paper-origin (`8`) or electronic (`E`) claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormType {
    #[default]
    #[serde(rename = "8")]
    Paper,
    #[serde(rename = "E")]
    Electronic,
}

impl FormType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::Paper => "8",
            FormType::Electronic => "E",
        }
    }
}

/// Fields shared by both service record shapes, through the date of service,
/// plus the billing fields both shapes carry after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLine {
    pub practitioner_number: u32,
    pub claim_number: u32,
    pub sequence: u8,
    pub hsn: String,
    pub birth_date: NaiveDate,
    pub sex: char,
    pub patient_name: String,
    pub diagnostic_code: String,
    #[serde(default)]
    pub referring_practitioner: Option<u32>,
    pub service_date: NaiveDate,
    pub units: u32,
    pub fee_code: String,
    pub fee_cents: i64,
    #[serde(default = "default_mode")]
    pub mode: u8,
    #[serde(default)]
    pub form_type: FormType,
    #[serde(default)]
    pub special_circumstances: Option<String>,
    #[serde(default)]
    pub facility_number: Option<u32>,
    #[serde(default)]
    pub claim_type: Option<char>,
    #[serde(default)]
    pub service_location: Option<char>,
}

fn default_mode() -> u8 {
    1
}

impl ServiceLine {
    fn prefix_values(&self, record_type: &str) -> Vec<String> {
        vec![
            record_type.to_string(),
            self.practitioner_number.to_string(),
            self.claim_number.to_string(),
            self.sequence.to_string(),
            self.hsn.clone(),
            format_mmyy(self.birth_date),
            self.sex.to_string(),
            self.patient_name.clone(),
            self.diagnostic_code.clone(),
            self.referring_practitioner.unwrap_or(0).to_string(),
            format_ddmmyy(self.service_date),
        ]
    }

    fn special_circumstances(&self) -> String {
        self.special_circumstances.clone().unwrap_or_default()
    }

    fn facility_number(&self) -> String {
        self.facility_number.unwrap_or(0).to_string()
    }
}

/// Claim and consultation codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord50 {
    #[serde(flatten)]
    pub line: ServiceLine,
    #[serde(default)]
    pub location_of_service: Option<char>,
    #[serde(default)]
    pub bilateral: Option<char>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub stop_time: Option<NaiveTime>,
}

/// Per-diem codes, billed as a run of days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord57 {
    #[serde(flatten)]
    pub line: ServiceLine,
    pub last_service_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "record_type")]
pub enum ServiceRecord {
    #[serde(rename = "50")]
    Type50(ServiceRecord50),
    #[serde(rename = "57")]
    Type57(ServiceRecord57),
}

impl ServiceRecord {
    pub fn line(&self) -> &ServiceLine {
        match self {
            ServiceRecord::Type50(record) => &record.line,
            ServiceRecord::Type57(record) => &record.line,
        }
    }

    pub fn fee_cents(&self) -> i64 {
        self.line().fee_cents
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        let fee = self.fee_cents();
        if fee < 0 {
            return Err(FormatError::NegativeAmount {
                field: "fee_cents",
                value: fee,
            });
        }
        Ok(())
    }

    /// Record type, field table and values in table order.
    pub fn layout(&self) -> (&'static str, &'static [FieldSpec], Vec<String>) {
        match self {
            ServiceRecord::Type50(record) => {
                let line = &record.line;
                let mut values = line.prefix_values(SERVICE_50_TYPE);
                values.extend([
                    line.units.to_string(),
                    optional_char(record.location_of_service),
                    line.fee_code.clone(),
                    line.fee_cents.to_string(),
                    line.mode.to_string(),
                    line.form_type.as_str().to_string(),
                    line.special_circumstances(),
                    optional_char(record.bilateral),
                    record.start_time.map(format_hhmm).unwrap_or_default(),
                    record.stop_time.map(format_hhmm).unwrap_or_default(),
                    line.facility_number(),
                    optional_char(line.claim_type),
                    optional_char(line.service_location),
                    String::new(),
                ]);
                (SERVICE_50_TYPE, SERVICE_50, values)
            }
            ServiceRecord::Type57(record) => {
                let line = &record.line;
                let mut values = line.prefix_values(SERVICE_57_TYPE);
                values.extend([
                    format_ddmmyy(record.last_service_date),
                    line.units.to_string(),
                    line.fee_code.clone(),
                    line.fee_cents.to_string(),
                    line.mode.to_string(),
                    line.form_type.as_str().to_string(),
                    line.special_circumstances(),
                    line.facility_number(),
                    optional_char(line.claim_type),
                    optional_char(line.service_location),
                    String::new(),
                ]);
                (SERVICE_57_TYPE, SERVICE_57, values)
            }
        }
    }
}

/// Closing totals of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTrailer {
    pub practitioner_number: u32,
    pub record_count: usize,
    pub service_count: usize,
    pub total_fee_cents: i64,
}

impl BatchTrailer {
    pub fn for_records(practitioner_number: u32, records: &[ServiceRecord]) -> Self {
        Self {
            practitioner_number,
            record_count: records.len() + 2,
            service_count: records.len(),
            total_fee_cents: records.iter().map(ServiceRecord::fee_cents).sum(),
        }
    }

    pub fn layout(&self) -> (&'static str, &'static [FieldSpec], Vec<String>) {
        let values = vec![
            TRAILER_TYPE.to_string(),
            self.practitioner_number.to_string(),
            TRAILER_FILLER.to_string(),
            self.record_count.to_string(),
            self.service_count.to_string(),
            self.total_fee_cents.to_string(),
            String::new(),
        ];
        (TRAILER_TYPE, TRAILER, values)
    }
}

fn optional_char(value: Option<char>) -> String {
    value.map(String::from).unwrap_or_default()
}

/// Patient and claim-level values that every line of a claim repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimContext {
    pub practitioner_number: u32,
    pub claim_number: u32,
    pub hsn: String,
    pub birth_date: NaiveDate,
    pub sex: char,
    pub patient_name: String,
    pub diagnostic_code: String,
    #[serde(default)]
    pub referring_practitioner: Option<u32>,
    #[serde(default = "default_mode")]
    pub mode: u8,
    #[serde(default)]
    pub form_type: FormType,
    #[serde(default)]
    pub facility_number: Option<u32>,
    #[serde(default)]
    pub claim_type: Option<char>,
    #[serde(default)]
    pub special_circumstances: Option<String>,
}

/// Turn billed code instances into payer lines. Per-diem codes become type
/// 57 records covering their run of days, everything else type 50. Fees are
/// the code's unit fee times the billed units.
pub fn records_from_instances(
    ctx: &ClaimContext,
    instances: &[ServiceCodeInstance],
    catalog: &Catalog,
) -> Result<Vec<ServiceRecord>, FormatError> {
    instances
        .iter()
        .enumerate()
        .map(|(index, instance)| {
            let code = catalog.code(instance.code_id).ok_or(FormatError::UnknownCode(instance.code_id))?;
            let unit_fee = code.fee_cents.unwrap_or_else(|| {
                log::warn!(target: "batch", "code {} has no fee, billing 0", code.code);
                0
            });
            let line = ServiceLine {
                practitioner_number: ctx.practitioner_number,
                claim_number: ctx.claim_number,
                sequence: (index % 10) as u8,
                hsn: ctx.hsn.clone(),
                birth_date: ctx.birth_date,
                sex: ctx.sex,
                patient_name: ctx.patient_name.clone(),
                diagnostic_code: ctx.diagnostic_code.clone(),
                referring_practitioner: ctx.referring_practitioner,
                service_date: instance.service_date,
                units: instance.number_of_units,
                fee_code: code.code.clone(),
                fee_cents: unit_fee * i64::from(instance.number_of_units),
                mode: ctx.mode,
                form_type: ctx.form_type,
                special_circumstances: ctx.special_circumstances.clone(),
                facility_number: ctx.facility_number,
                claim_type: ctx.claim_type,
                service_location: instance.service_location,
            };
            Ok(match code.billing_record_type {
                RecordType::PerDiem => {
                    let last_service_date = instance.service_end_date.unwrap_or_else(|| {
                        add_days(instance.service_date, i64::from(instance.number_of_units.max(1)) - 1)
                    });
                    ServiceRecord::Type57(ServiceRecord57 {
                        line,
                        last_service_date,
                    })
                }
                RecordType::Standard => ServiceRecord::Type50(ServiceRecord50 {
                    line,
                    location_of_service: instance.location_of_service,
                    bilateral: None,
                    start_time: None,
                    stop_time: None,
                }),
            })
        })
        .collect()
}
