use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::chain::{BillingCodeChain, ChainTable};
use crate::dates::{DayWindow, days_between};
use crate::error::RoundingError;
use crate::logging::log_service_event;
use crate::schema::{BillingCode, Catalog, Service, ServiceCodeInstance};

/// What a rounding pass decided for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RoundingOutcome {
    /// Start billing a new per-diem code.
    Created { instance: ServiceCodeInstance },
    /// Bill one more unit of the current code.
    Incremented {
        index: usize,
        code_id: i64,
        number_of_units: u32,
    },
    /// The current code is already at its ceiling; nothing changes.
    MaxUnitsReached {
        index: usize,
        code_id: i64,
        max_units: u32,
    },
}

impl RoundingOutcome {
    pub fn mutates(&self) -> bool {
        !matches!(self, RoundingOutcome::MaxUnitsReached { .. })
    }
}

/// Reference data a rounding pass reads from.
#[derive(Clone, Copy)]
pub struct RoundingContext<'a> {
    pub catalog: &'a Catalog,
    pub chains: &'a ChainTable,
}

/// The chain a physician rounds on, plus the codes their sections prefer.
struct ChainSelection {
    root_id: i64,
    preferred: HashSet<i64>,
}

impl<'a> RoundingContext<'a> {
    pub fn new(catalog: &'a Catalog, chains: &'a ChainTable) -> Self {
        Self { catalog, chains }
    }

    fn code(&self, code_id: i64) -> Result<&'a BillingCode, RoundingError> {
        self.catalog
            .code(code_id)
            .ok_or(RoundingError::UnknownCode(code_id))
    }

    fn select_chain(&self, physician_id: &str) -> Result<ChainSelection, RoundingError> {
        let missing = |reason: &str| RoundingError::MissingConfiguration {
            physician_id: physician_id.to_string(),
            reason: reason.to_string(),
        };

        let mut sections = self.catalog.sections_for(physician_id).peekable();
        if sections.peek().is_none() {
            return Err(missing("no preferred billing code section is configured"));
        }

        let per_diem: Vec<i64> = sections
            .flat_map(|s| s.code_ids.iter().copied())
            .filter(|id| self.catalog.code(*id).is_some_and(BillingCode::is_per_diem))
            .collect();
        if per_diem.is_empty() {
            return Err(missing("preferred sections contain no type 57 codes"));
        }

        let root_id = per_diem
            .iter()
            .find_map(|id| self.chains.roots_of(*id).first().copied())
            .ok_or_else(|| missing("preferred type 57 codes are not part of any chain"))?;

        Ok(ChainSelection {
            root_id,
            preferred: per_diem.into_iter().collect(),
        })
    }

    fn path_from(&self, selection: &ChainSelection, root_id: i64, from: i64) -> Vec<&'a BillingCodeChain> {
        self.chains
            .path_from(root_id, from, |id| selection.preferred.contains(&id))
    }
}

/// Decide today's rounding action without touching the service.
pub fn plan_rounding(
    ctx: &RoundingContext<'_>,
    service: &Service,
    today: NaiveDate,
) -> Result<RoundingOutcome, RoundingError> {
    let selection = ctx.select_chain(&service.physician_id)?;

    let Some(index) = service.latest_per_diem(ctx.catalog) else {
        return first_instance(ctx, &selection, service, today);
    };

    let current = &service.instances[index];
    if let Some(discharged_on) = current.service_end_date {
        return Err(RoundingError::Discharged {
            service_id: service.id.clone(),
            discharged_on,
        });
    }

    let code = ctx.code(current.code_id)?;
    let window = DayWindow::from_range(current.service_date, code.day_range);

    if today < current.service_date {
        return Err(RoundingError::NoApplicableCode {
            date: today,
            reason: format!("code {} only starts on {}", code.code, current.service_date),
        });
    }

    if window.contains(today) {
        return Ok(continue_current(index, code, current));
    }

    next_instance(ctx, &selection, service, index, window, today)
}

/// One more unit of the current code, unless it is at its ceiling.
fn continue_current(index: usize, code: &BillingCode, current: &ServiceCodeInstance) -> RoundingOutcome {
    match code.max_units {
        Some(max_units) if current.number_of_units >= max_units => RoundingOutcome::MaxUnitsReached {
            index,
            code_id: code.id,
            max_units,
        },
        _ => RoundingOutcome::Incremented {
            index,
            code_id: code.id,
            number_of_units: current.number_of_units + 1,
        },
    }
}

/// Where `today` lands when the codes of `path` are laid end to end from
/// `start`.
enum Placement<'a> {
    /// The code whose window holds today, and that window's first day.
    Within(&'a BillingCodeChain, NaiveDate),
    /// Today is after every window; the last code walked and its first day.
    PastEnd(&'a BillingCodeChain, NaiveDate),
}

fn place<'a>(
    ctx: &RoundingContext<'a>,
    path: &[&'a BillingCodeChain],
    start: NaiveDate,
    today: NaiveDate,
) -> Result<Option<Placement<'a>>, RoundingError> {
    let mut cursor = start;
    let mut last = None;
    for &record in path {
        let window = DayWindow::from_range(cursor, ctx.code(record.code_id)?.day_range);
        if window.contains(today) {
            return Ok(Some(Placement::Within(record, cursor)));
        }
        last = Some((record, cursor));
        match window.next_start() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    Ok(last.map(|(record, start)| Placement::PastEnd(record, start)))
}

/// Admission-relative pick for a service with no per-diem code yet.
fn first_instance(
    ctx: &RoundingContext<'_>,
    selection: &ChainSelection,
    service: &Service,
    today: NaiveDate,
) -> Result<RoundingOutcome, RoundingError> {
    if days_between(service.admission_date, today) < 0 {
        return Err(RoundingError::NoApplicableCode {
            date: today,
            reason: format!("admission on {} has not happened yet", service.admission_date),
        });
    }

    let path = ctx.path_from(selection, selection.root_id, selection.root_id);
    match place(ctx, &path, service.admission_date, today)? {
        Some(Placement::Within(record, start) | Placement::PastEnd(record, start)) => {
            Ok(created(service, None, record.code_id, start))
        }
        None => Err(RoundingError::NoApplicableCode {
            date: today,
            reason: format!("chain rooted at code {} is empty", selection.root_id),
        }),
    }
}

/// The current code's window has closed: walk on from the day after it.
fn next_instance(
    ctx: &RoundingContext<'_>,
    selection: &ChainSelection,
    service: &Service,
    index: usize,
    window: DayWindow,
    today: NaiveDate,
) -> Result<RoundingOutcome, RoundingError> {
    let current = &service.instances[index];
    let no_code = |reason: String| RoundingError::NoApplicableCode { date: today, reason };

    let root_id = if ctx.chains.record(selection.root_id, current.code_id).is_some() {
        selection.root_id
    } else {
        ctx.chains
            .roots_of(current.code_id)
            .first()
            .copied()
            .ok_or_else(|| no_code(format!("code {} is not part of any chain", current.code_id)))?
    };

    let cursor = window
        .next_start()
        .ok_or_else(|| no_code("current code never ends".to_string()))?;

    let path = ctx.path_from(selection, root_id, current.code_id);
    let successors = path.get(1..).unwrap_or_default();
    match place(ctx, successors, cursor, today)? {
        Some(Placement::Within(record, start) | Placement::PastEnd(record, start)) => {
            Ok(created(service, Some(current), record.code_id, start))
        }
        // Already on the last code of the chain: keep billing it.
        None => Ok(continue_current(index, ctx.code(current.code_id)?, current)),
    }
}

fn created(
    service: &Service,
    previous: Option<&ServiceCodeInstance>,
    code_id: i64,
    start: NaiveDate,
) -> RoundingOutcome {
    let mut instance = ServiceCodeInstance::new(&service.id, code_id, start);
    if let Some(previous) = previous {
        instance.service_location = previous.service_location;
        instance.location_of_service = previous.location_of_service;
    }
    RoundingOutcome::Created { instance }
}

/// Write a planned outcome into the service. Returns whether anything changed.
pub fn apply_outcome(service: &mut Service, outcome: &RoundingOutcome) -> bool {
    match outcome {
        RoundingOutcome::Created { instance } => {
            service.instances.push(instance.clone());
        }
        RoundingOutcome::Incremented {
            index,
            number_of_units,
            ..
        } => match service.instances.get_mut(*index) {
            Some(instance) => instance.number_of_units = *number_of_units,
            None => return false,
        },
        RoundingOutcome::MaxUnitsReached { .. } => return false,
    }
    service.version += 1;
    true
}

/// Plan and apply one rounding pass.
pub fn round(
    ctx: &RoundingContext<'_>,
    service: &mut Service,
    today: NaiveDate,
) -> Result<RoundingOutcome, RoundingError> {
    let outcome = plan_rounding(ctx, service, today)?;
    apply_outcome(service, &outcome);

    let message = match &outcome {
        RoundingOutcome::Created { instance } => {
            format!("started code {} on {}", instance.code_id, instance.service_date)
        }
        RoundingOutcome::Incremented {
            code_id,
            number_of_units,
            ..
        } => format!("code {code_id} now at {number_of_units} units"),
        RoundingOutcome::MaxUnitsReached {
            code_id, max_units, ..
        } => format!("maximum units reached for code {code_id} ({max_units})"),
    };
    log_service_event("scheduler", &service.id, "round", &message);
    Ok(outcome)
}

/// End the current per-diem code. The end date is never later than the
/// code's own window, so an early discharge sticks but an extension does not.
pub fn discharge(
    catalog: &Catalog,
    service: &mut Service,
    requested: NaiveDate,
) -> Result<NaiveDate, RoundingError> {
    let index = service
        .latest_per_diem(catalog)
        .ok_or_else(|| RoundingError::NoApplicableCode {
            date: requested,
            reason: "service has no per-diem code to discharge".to_string(),
        })?;
    let instance = &mut service.instances[index];
    let code = catalog
        .code(instance.code_id)
        .ok_or(RoundingError::UnknownCode(instance.code_id))?;

    if requested < instance.service_date {
        return Err(RoundingError::InvalidDischarge {
            requested,
            started: instance.service_date,
        });
    }

    let end = DayWindow::from_range(instance.service_date, code.day_range).clamp_end(requested);
    instance.service_end_date = Some(end);
    service.version += 1;

    let message = if end < requested {
        format!("requested {requested}, clamped to {end}")
    } else {
        format!("discharged on {end}")
    };
    log_service_event("scheduler", &service.id, "discharge", &message);
    Ok(end)
}
