//! Claim batch file generation.
//!
//! A batch is one practitioner header, the service records in the order
//! given, and a trailer whose counts and fee total act as the payer's
//! checksum. Every record is a fixed-width line ending in CRLF; see
//! [`layout`] for the field tables.

pub mod field;
pub mod layout;
pub mod parse;
pub mod record;

use std::iter;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::schema::{Catalog, ServiceCodeInstance};

pub use field::{FieldOverflow, FieldSpec, Justify};
pub use parse::{BatchSummary, ParsedLine, parse_batch, verify_batch};
pub use record::{
    BatchTrailer, ClaimContext, FormType, PractitionerHeader, ServiceLine, ServiceRecord,
    ServiceRecord50, ServiceRecord57, records_from_instances,
};

pub const LINE_END: &str = "\r\n";

/// A rendered batch and whatever had to be truncated to produce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimBatch {
    pub text: String,
    pub trailer: BatchTrailer,
    pub warnings: Vec<FieldOverflow>,
}

/// Render header, services and trailer.
///
/// Amounts are checked before any line is written; a negative fee aborts the
/// whole batch. Oversized values are truncated and reported, never fatal.
pub fn format_batch(
    header: &PractitionerHeader,
    records: &[ServiceRecord],
) -> Result<ClaimBatch, FormatError> {
    for record in records {
        record.validate()?;
    }

    let trailer = BatchTrailer::for_records(header.practitioner_number, records);
    let layouts = iter::once(header.layout())
        .chain(records.iter().map(ServiceRecord::layout))
        .chain(iter::once(trailer.layout()));

    let mut text = String::new();
    let mut warnings = Vec::new();
    for (index, (record_type, specs, values)) in layouts.enumerate() {
        let (line, overflows) = field::encode_line(specs, &values, index + 1, record_type);
        text.push_str(&line);
        text.push_str(LINE_END);
        warnings.extend(overflows);
    }

    log::debug!(
        target: "batch",
        "formatted {} service records, {} cents, {} warnings",
        trailer.service_count,
        trailer.total_fee_cents,
        warnings.len()
    );
    Ok(ClaimBatch {
        text,
        trailer,
        warnings,
    })
}

/// Everything needed to produce one submission: the practitioner, the
/// claim-level patient values, billed instances and any hand-entered lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimFile {
    pub header: PractitionerHeader,
    pub claim: ClaimContext,
    #[serde(default)]
    pub instances: Vec<ServiceCodeInstance>,
    #[serde(default)]
    pub records: Vec<ServiceRecord>,
}

impl ClaimFile {
    pub fn to_batch(&self, catalog: &Catalog) -> Result<ClaimBatch, FormatError> {
        let mut records = records_from_instances(&self.claim, &self.instances, catalog)?;
        records.extend(self.records.iter().cloned());
        format_batch(&self.header, &records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn header() -> PractitionerHeader {
        PractitionerHeader {
            practitioner_number: 123,
            group_number: 45,
            clinic_number: 6,
            name: "Dr. Jane Roe".to_string(),
            address: "123 Main St".to_string(),
            city_province: "Regina SK".to_string(),
            postal_code: "s4p 3y2".to_string(),
            corporation_indicator: None,
        }
    }

    fn line(fee_cents: i64) -> ServiceLine {
        ServiceLine {
            practitioner_number: 123,
            claim_number: 42,
            sequence: 0,
            hsn: "123456789".to_string(),
            birth_date: ymd(1987, 11, 30),
            sex: 'F',
            patient_name: "Doe, Jane".to_string(),
            diagnostic_code: "428".to_string(),
            referring_practitioner: None,
            service_date: ymd(2024, 1, 5),
            units: 1,
            fee_code: "5B".to_string(),
            fee_cents,
            mode: 1,
            form_type: FormType::Paper,
            special_circumstances: None,
            facility_number: None,
            claim_type: None,
            service_location: Some('R'),
        }
    }

    fn consult() -> ServiceRecord {
        ServiceRecord::Type50(ServiceRecord50 {
            line: line(4150),
            location_of_service: Some('3'),
            bilateral: None,
            start_time: Some(NaiveTime::from_hms_opt(9, 5, 0).unwrap()),
            stop_time: None,
        })
    }

    #[test]
    fn test_header_line() {
        let batch = format_batch(&header(), &[]).unwrap();
        let first = batch.text.split(LINE_END).next().unwrap();
        let expected = format!(
            "10{}{}000{}{:<25}{:<25}{:<25}S4P3Y28 ",
            "0123", "045", "006", "DR. JANE ROE", "123 Main St", "Regina SK"
        );
        assert_eq!(first, expected);
        assert_eq!(first.len(), 98);
    }

    #[test]
    fn test_type_50_line() {
        let batch = format_batch(&header(), &[consult()]).unwrap();
        let service = batch.text.split(LINE_END).nth(1).unwrap();
        let expected = [
            "50", "0123", "00042", "0", "123456789", "1187", "F",
            "Doe, Jane                ", "428", "0000", "050124", "01", "3", "5B  ",
            "004150", "1", "8", "  ", " ", "0905", "    ", "00000", " ", "R", " ",
        ]
        .concat();
        assert_eq!(service, expected);
        assert_eq!(service.len(), 98);
    }

    #[test]
    fn test_type_57_line() {
        let mut per_diem = line(9000);
        per_diem.units = 3;
        per_diem.fee_code = "0201".to_string();
        let record = ServiceRecord::Type57(ServiceRecord57 {
            line: per_diem,
            last_service_date: ymd(2024, 1, 7),
        });
        let batch = format_batch(&header(), &[record]).unwrap();
        let service = batch.text.split(LINE_END).nth(1).unwrap();
        let expected = [
            "57", "0123", "00042", "0", "123456789", "1187", "F",
            "Doe, Jane                ", "428", "0000", "050124", "070124", "03", "0201",
            "009000", "1", "8", "  ", "00000", " ", "R", " ",
        ]
        .concat();
        assert_eq!(service, expected);
        assert_eq!(service.len(), 94);
    }

    #[test]
    fn test_patient_fields_are_written_as_given() {
        let mut given = line(4150);
        given.patient_name = "McLeod-d'Arcy, Ann".to_string();
        given.sex = 'm';
        let record = ServiceRecord::Type50(ServiceRecord50 {
            line: given,
            location_of_service: None,
            bilateral: None,
            start_time: None,
            stop_time: None,
        });
        let batch = format_batch(&header(), &[record]).unwrap();
        let lines = parse_batch(&batch.text).unwrap();
        assert_eq!(lines[1].text("patient_name"), Some("McLeod-d'Arcy, Ann"));
        assert_eq!(lines[1].raw("sex"), Some("m"));
    }

    #[test]
    fn test_trailer_totals() {
        let records = vec![consult(), consult(), consult()];
        let batch = format_batch(&header(), &records).unwrap();
        let lines: Vec<&str> = batch.text.split(LINE_END).collect();
        assert_eq!(lines.len(), 6, "five records and the empty tail after the last CRLF");
        assert_eq!(lines[5], "");
        let trailer = lines[4];
        let padding = " ".repeat(69);
        let expected = ["90", "0123", "999999", "00005", "00003", "0012450", padding.as_str()].concat();
        assert_eq!(trailer, expected);
        assert_eq!(batch.trailer.record_count, 5);
        assert_eq!(batch.trailer.total_fee_cents, 12_450);
        assert!(batch.text.ends_with("\r\n"));
    }

    #[test]
    fn test_negative_fee_fails_before_output() {
        let mut bad = line(-100);
        bad.fee_code = "0005".to_string();
        let records = vec![
            consult(),
            ServiceRecord::Type50(ServiceRecord50 {
                line: bad,
                location_of_service: None,
                bilateral: None,
                start_time: None,
                stop_time: None,
            }),
        ];
        let err = format_batch(&header(), &records).unwrap_err();
        assert_eq!(
            err,
            FormatError::NegativeAmount {
                field: "fee_cents",
                value: -100
            }
        );
    }

    #[test]
    fn test_overflow_is_truncated_and_reported() {
        let mut header = header();
        header.name = "Doctor Bartholomew Fitzgerald-Smythe".to_string();
        let batch = format_batch(&header, &[]).unwrap();
        assert_eq!(batch.warnings.len(), 1);
        assert_eq!(batch.warnings[0].field, "name");
        assert!(batch.text.starts_with("100123045000006DOCTOR BARTHOLOMEW FITZGE123 Main St"));
    }
}
