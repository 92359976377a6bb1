//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;

use claimchain::batch::{ClaimContext, ClaimFile, FormType, PractitionerHeader};
use claimchain::{BillingCode, Catalog, ChainEdge, PreferredSection, RecordType, ServiceCodeInstance};

pub const PHYSICIAN: &str = "dr-1";

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn per_diem(id: i64, day_range: Option<i64>) -> BillingCode {
    BillingCode {
        id,
        code: format!("{id:04}"),
        title: format!("Hospital care period {id}"),
        day_range,
        max_units: None,
        multiple_unit_indicator: true,
        billing_record_type: RecordType::PerDiem,
        fee_cents: Some(3000),
        section: Some("hospital".to_string()),
    }
}

pub fn consult(id: i64) -> BillingCode {
    BillingCode {
        id,
        code: "5B".to_string(),
        title: "Consultation".to_string(),
        day_range: None,
        max_units: Some(1),
        multiple_unit_indicator: false,
        billing_record_type: RecordType::Standard,
        fee_cents: Some(4150),
        section: None,
    }
}

/// `edges` are `(previous, next)` pairs.
pub fn catalog(codes: Vec<BillingCode>, edges: &[(i64, i64)], preferred: &[i64]) -> Catalog {
    Catalog {
        codes,
        edges: edges
            .iter()
            .map(|&(previous_code_id, code_id)| ChainEdge {
                code_id,
                previous_code_id,
            })
            .collect(),
        preferred_sections: vec![PreferredSection {
            physician_id: PHYSICIAN.to_string(),
            section: "hospital".to_string(),
            code_ids: preferred.to_vec(),
        }],
    }
}

/// 1 (5 days) -> 2 (5 days) -> 3 (open ended), windows [0,5) [5,10) [10,..).
pub fn five_five_open() -> Catalog {
    catalog(
        vec![per_diem(1, Some(5)), per_diem(2, Some(5)), per_diem(3, None)],
        &[(1, 2), (2, 3)],
        &[1, 2, 3],
    )
}

/// Root 10 branches into 11 and 12; 11 continues to 13. 30 -> 31 is a second
/// short chain. Consult 20 has no edges.
pub fn branching() -> Catalog {
    catalog(
        vec![
            per_diem(10, Some(2)),
            per_diem(11, Some(3)),
            per_diem(12, Some(7)),
            per_diem(13, None),
            consult(20),
            per_diem(30, Some(4)),
            per_diem(31, Some(1)),
        ],
        &[(10, 11), (10, 12), (11, 13), (30, 31)],
        &[10, 11, 13],
    )
}

pub fn practitioner() -> PractitionerHeader {
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

pub fn claim_context() -> ClaimContext {
    ClaimContext {
        practitioner_number: 123,
        claim_number: 42,
        hsn: "123456789".to_string(),
        birth_date: ymd(1987, 11, 30),
        sex: 'F',
        patient_name: "Doe, Jane".to_string(),
        diagnostic_code: "428".to_string(),
        referring_practitioner: Some(77),
        mode: 1,
        form_type: FormType::Paper,
        facility_number: None,
        claim_type: None,
        special_circumstances: None,
    }
}

/// A consultation and three days of per-diem care starting on admission.
pub fn claim_file(admission: NaiveDate) -> ClaimFile {
    let mut care = ServiceCodeInstance::new("svc-1", 1, admission);
    care.number_of_units = 3;
    ClaimFile {
        header: practitioner(),
        claim: claim_context(),
        instances: vec![ServiceCodeInstance::new("svc-1", 20, admission), care],
        records: Vec::new(),
    }
}
