use std::path::Path;

use chrono::NaiveDate;
use fake::Fake;
use fake::faker::address::en::{CityName, StateAbbr, StreetName};
use fake::faker::name::en::{FirstName, LastName};
use fake::faker::number::en::NumberWithFormat;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::batch::{ClaimContext, ClaimFile, FormType, PractitionerHeader};
use crate::dates::add_days;
use crate::reader::write_json;
use crate::schema::{
    BillingCode, Catalog, ChainEdge, PreferredSection, RecordType, Service, ServiceCodeInstance,
};

const DAY_RANGES: [i64; 5] = [3, 5, 7, 10, 14];
const CARE_TITLES: [&str; 4] = [
    "Hospital care",
    "Intensive care",
    "Palliative care",
    "Rehabilitation care",
];
const POSTAL_CODES: [&str; 4] = ["S4P 3Y2", "S7N 5A9", "S4S 0A2", "S9H 4G3"];

/// Id of the consultation code every fake catalog carries.
pub const CONSULT_CODE_ID: i64 = 900;

/// Generate a catalog of `chains` per-diem chains plus one consultation code.
///
/// Every chain runs two to four codes with random day ranges and ends in an
/// open-ended code. One physician prefers the first chain's section.
pub fn fake_catalog(chains: usize) -> Catalog {
    let mut rng = rand::rng();
    let mut catalog = Catalog::default();

    for chain in 0..chains {
        let section = format!("{}", (b'A' + (chain % 26) as u8) as char);
        let title = CARE_TITLES.choose(&mut rng).copied().unwrap_or("Hospital care");
        let length = rng.random_range(2..=4);
        let base = (chain as i64 + 1) * 100;

        for step in 0..length {
            let id = base + step as i64 + 1;
            let last = step + 1 == length;
            catalog.codes.push(BillingCode {
                id,
                code: format!("{id:04}"),
                title: format!("{title}, period {}", step + 1),
                day_range: if last {
                    None
                } else {
                    DAY_RANGES.choose(&mut rng).copied()
                },
                max_units: None,
                multiple_unit_indicator: true,
                billing_record_type: RecordType::PerDiem,
                fee_cents: Some(rng.random_range(20..=90) * 100),
                section: Some(section.clone()),
            });
            if step > 0 {
                catalog.edges.push(ChainEdge {
                    code_id: id,
                    previous_code_id: id - 1,
                });
            }
        }
    }

    catalog.codes.push(BillingCode {
        id: CONSULT_CODE_ID,
        code: "5B".to_string(),
        title: "Consultation".to_string(),
        day_range: None,
        max_units: Some(1),
        multiple_unit_indicator: false,
        billing_record_type: RecordType::Standard,
        fee_cents: Some(rng.random_range(40..=120) * 100),
        section: None,
    });

    if chains > 0 {
        catalog.preferred_sections.push(PreferredSection {
            physician_id: fake_physician_id(),
            section: "A".to_string(),
            code_ids: catalog
                .codes
                .iter()
                .filter(|c| c.section.as_deref() == Some("A"))
                .map(|c| c.id)
                .collect(),
        });
    }
    catalog
}

fn fake_physician_id() -> String {
    format!("dr-{}", NumberWithFormat("####").fake::<String>())
}

/// An admission from the last two weeks for the catalog's configured physician.
pub fn fake_service(catalog: &Catalog, today: NaiveDate) -> Service {
    let physician_id = catalog
        .preferred_sections
        .first()
        .map(|s| s.physician_id.clone())
        .unwrap_or_else(fake_physician_id);
    let id = format!("svc-{}", NumberWithFormat("######").fake::<String>());
    let admitted = add_days(today, -(0..14).fake::<i64>());
    Service::new(&id, &physician_id, admitted)
}

/// A claim for the service: a consultation on admission and the first code of
/// the physician's chain billed for three days.
pub fn fake_claim(catalog: &Catalog, service: &Service) -> ClaimFile {
    let mut rng = rand::rng();
    let practitioner_number = rng.random_range(1..=9999);
    let birth_date = NaiveDate::from_ymd_opt(
        rng.random_range(1940..=2005),
        rng.random_range(1..=12),
        rng.random_range(1..=28),
    )
    .unwrap_or(service.admission_date);

    let mut instances = vec![ServiceCodeInstance::new(
        &service.id,
        CONSULT_CODE_ID,
        service.admission_date,
    )];
    if let Some(first) = catalog
        .preferred_sections
        .first()
        .and_then(|s| s.code_ids.first())
    {
        let mut per_diem = ServiceCodeInstance::new(&service.id, *first, service.admission_date);
        per_diem.number_of_units = 3;
        instances.push(per_diem);
    }

    ClaimFile {
        header: PractitionerHeader {
            practitioner_number,
            group_number: rng.random_range(0..=999),
            clinic_number: rng.random_range(0..=999),
            name: format!(
                "Dr. {} {}",
                FirstName().fake::<String>(),
                LastName().fake::<String>()
            ),
            address: format!(
                "{} {}",
                (1..999).fake::<u16>(),
                StreetName().fake::<String>()
            ),
            city_province: format!(
                "{} {}",
                CityName().fake::<String>(),
                StateAbbr().fake::<String>()
            ),
            postal_code: POSTAL_CODES
                .choose(&mut rng)
                .copied()
                .unwrap_or("S4P 3Y2")
                .to_string(),
            corporation_indicator: None,
        },
        claim: ClaimContext {
            practitioner_number,
            claim_number: rng.random_range(1..=99999),
            hsn: NumberWithFormat("#########").fake(),
            birth_date,
            sex: ['M', 'F'].choose(&mut rng).copied().unwrap_or('F'),
            patient_name: format!(
                "{}, {}",
                LastName().fake::<String>(),
                FirstName().fake::<String>()
            ),
            diagnostic_code: NumberWithFormat("###").fake(),
            referring_practitioner: None,
            mode: 1,
            form_type: FormType::Paper,
            facility_number: None,
            claim_type: None,
            special_circumstances: None,
        },
        instances,
        records: Vec::new(),
    }
}

/// Write `catalog.json`, `service.json` and `claim.json` into `dir`.
pub async fn write_fake_files(dir: impl AsRef<Path>, chains: usize, today: NaiveDate) -> anyhow::Result<()> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;

    let catalog = fake_catalog(chains);
    let service = fake_service(&catalog, today);
    let claim = fake_claim(&catalog, &service);

    write_json(dir.join("catalog.json"), &catalog).await?;
    write_json(dir.join("service.json"), &service).await?;
    write_json(dir.join("claim.json"), &claim).await?;
    log::info!(
        target: "faker",
        "wrote {} codes, service {} and claim {} to {}",
        catalog.codes.len(),
        service.id,
        claim.claim.claim_number,
        dir.display()
    );
    Ok(())
}
