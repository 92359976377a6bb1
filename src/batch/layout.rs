//! Record layouts of the payer's claim batch file.
//!
//! Header, type 50 and trailer records are 98 characters; type 57 records
//! carry the last service date instead of the location, bilateral and time
//! fields and come out at 94.

use super::field::FieldSpec;

pub const HEADER_TYPE: &str = "10";
pub const SERVICE_50_TYPE: &str = "50";
pub const SERVICE_57_TYPE: &str = "57";
pub const TRAILER_TYPE: &str = "90";

pub const SUBMISSION_TYPE: &str = "8";
pub const HEADER_FILLER: &str = "000";
pub const TRAILER_FILLER: &str = "999999";

pub const HEADER: &[FieldSpec] = &[
    FieldSpec::text("record_type", 2),
    FieldSpec::numeric("practitioner_number", 4),
    FieldSpec::numeric("group_number", 3),
    FieldSpec::numeric("filler", 3),
    FieldSpec::numeric("clinic_number", 3),
    FieldSpec::text("name", 25),
    FieldSpec::text("address", 25),
    FieldSpec::text("city_province", 25),
    FieldSpec::text("postal_code", 6),
    FieldSpec::text("submission_type", 1),
    FieldSpec::text("corporation_indicator", 1),
];

pub const SERVICE_50: &[FieldSpec] = &[
    FieldSpec::text("record_type", 2),
    FieldSpec::numeric("practitioner_number", 4),
    FieldSpec::numeric("claim_number", 5),
    FieldSpec::numeric("sequence", 1),
    FieldSpec::numeric("hsn", 9),
    FieldSpec::numeric("birth_date", 4),
    FieldSpec::text("sex", 1),
    FieldSpec::text("patient_name", 25),
    FieldSpec::text("diagnostic_code", 3),
    FieldSpec::numeric("referring_practitioner", 4),
    FieldSpec::numeric("service_date", 6),
    FieldSpec::numeric("units", 2),
    FieldSpec::text("location_of_service", 1),
    FieldSpec::text("fee_code", 4),
    FieldSpec::numeric("fee_cents", 6),
    FieldSpec::numeric("mode", 1),
    FieldSpec::text("form_type", 1),
    FieldSpec::text("special_circumstances", 2),
    FieldSpec::text("bilateral", 1),
    FieldSpec::text("start_time", 4),
    FieldSpec::text("stop_time", 4),
    FieldSpec::numeric("facility_number", 5),
    FieldSpec::text("claim_type", 1),
    FieldSpec::text("service_location", 1),
    FieldSpec::text("filler", 1),
];

pub const SERVICE_57: &[FieldSpec] = &[
    FieldSpec::text("record_type", 2),
    FieldSpec::numeric("practitioner_number", 4),
    FieldSpec::numeric("claim_number", 5),
    FieldSpec::numeric("sequence", 1),
    FieldSpec::numeric("hsn", 9),
    FieldSpec::numeric("birth_date", 4),
    FieldSpec::text("sex", 1),
    FieldSpec::text("patient_name", 25),
    FieldSpec::text("diagnostic_code", 3),
    FieldSpec::numeric("referring_practitioner", 4),
    FieldSpec::numeric("service_date", 6),
    FieldSpec::numeric("last_service_date", 6),
    FieldSpec::numeric("units", 2),
    FieldSpec::text("fee_code", 4),
    FieldSpec::numeric("fee_cents", 6),
    FieldSpec::numeric("mode", 1),
    FieldSpec::text("form_type", 1),
    FieldSpec::text("special_circumstances", 2),
    FieldSpec::numeric("facility_number", 5),
    FieldSpec::text("claim_type", 1),
    FieldSpec::text("service_location", 1),
    FieldSpec::text("filler", 1),
];

pub const TRAILER: &[FieldSpec] = &[
    FieldSpec::text("record_type", 2),
    FieldSpec::numeric("practitioner_number", 4),
    FieldSpec::text("filler", 6),
    FieldSpec::numeric("record_count", 5),
    FieldSpec::numeric("service_count", 5),
    FieldSpec::numeric("total_fee_cents", 7),
    FieldSpec::text("padding", 69),
];

pub fn layout_for(record_type: &str) -> Option<&'static [FieldSpec]> {
    match record_type {
        HEADER_TYPE => Some(HEADER),
        SERVICE_50_TYPE => Some(SERVICE_50),
        SERVICE_57_TYPE => Some(SERVICE_57),
        TRAILER_TYPE => Some(TRAILER),
        _ => None,
    }
}
