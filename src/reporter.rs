use colored::Colorize;
use prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE;
use prettytable::{Table, row};

use crate::analysis::{ChainStatistics, RootChain, RootSummary};
use crate::batch::{BatchSummary, FieldOverflow};
use crate::chain::BillingCodeChain;
use crate::error::ChainError;
use crate::scheduler::RoundingOutcome;

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_format(*FORMAT_NO_LINESEP_WITH_TITLE);
    table
}

/// One row per chain record, in table order.
pub fn records_table(records: &[BillingCodeChain]) -> Table {
    let mut table = new_table();
    table.set_titles(row![
        "root", "code", "title", "previous", "days", "from day", "through day", "last"
    ]);
    for r in records {
        let previous = r.previous_code_id.map(|id| id.to_string()).unwrap_or_default();
        let last = if r.is_last { "yes" } else { "" };
        table.add_row(row![
            r.root_id,
            r.code,
            r.title,
            previous,
            r.day_range,
            r.previous_day_range,
            r.cumulative_day_range,
            last
        ]);
    }
    table
}

pub fn summaries_table(summaries: &[RootSummary]) -> Table {
    let mut table = new_table();
    table.set_titles(row!["root", "code", "title", "codes", "max day"]);
    for s in summaries {
        table.add_row(row![
            s.root_id,
            s.root_code,
            s.root_title,
            s.length,
            s.max_cumulative_day_range
        ]);
    }
    table
}

pub fn statistics_table(stats: &ChainStatistics) -> Table {
    let mut table = new_table();
    table.set_titles(row!["metric", "value"]);
    table.add_row(row!["chains", stats.total_chains]);
    table.add_row(row!["distinct codes", stats.total_codes]);
    table.add_row(row!["chain records", stats.total_records]);
    let average = format!("{:.2}", stats.average_chain_length);
    table.add_row(row!["average chain length", average]);
    table.add_row(row!["furthest day", stats.max_cumulative_day_range]);
    table
}

pub fn print_records(records: &[BillingCodeChain]) {
    if records.is_empty() {
        println!("{}", "no matching chain records".dimmed());
        return;
    }
    records_table(records).printstd();
}

pub fn print_summaries(summaries: &[RootSummary]) {
    summaries_table(summaries).printstd();
}

pub fn print_root_chains(chains: &[RootChain]) {
    if chains.is_empty() {
        println!("{}", "code is not part of any chain".dimmed());
    }
    for chain in chains {
        println!(
            "\n{} {} {}",
            "chain".bold(),
            chain.summary.root_code.bold(),
            chain.summary.root_title
        );
        records_table(&chain.records).printstd();
    }
}

pub fn print_statistics(stats: &ChainStatistics) {
    statistics_table(stats).printstd();
}

pub fn print_build_failures(failures: &[ChainError]) {
    for failure in failures {
        eprintln!("{} {failure}", "skipped".yellow());
    }
}

pub fn print_outcome(service_id: &str, outcome: &RoundingOutcome) {
    let line = match outcome {
        RoundingOutcome::Created { instance } => format!(
            "started code {} on {}",
            instance.code_id, instance.service_date
        )
        .green(),
        RoundingOutcome::Incremented {
            code_id,
            number_of_units,
            ..
        } => format!("code {code_id} billed for {number_of_units} units").green(),
        RoundingOutcome::MaxUnitsReached {
            code_id, max_units, ..
        } => format!("code {code_id} already at its maximum of {max_units} units").yellow(),
    };
    println!("{service_id}: {line}");
}

pub fn print_overflows(warnings: &[FieldOverflow]) {
    for w in warnings {
        eprintln!(
            "{} line {} record {}: {} {:?} truncated to {} characters",
            "warning".yellow(),
            w.line,
            w.record_type,
            w.field,
            w.value,
            w.width
        );
    }
}

pub fn print_batch_summary(summary: &BatchSummary) {
    let mut table = new_table();
    table.set_titles(row!["practitioner", "records", "services", "total fee"]);
    let fee = format!("{}.{:02}", summary.total_fee_cents / 100, summary.total_fee_cents % 100);
    table.add_row(row![
        summary.practitioner_number,
        summary.record_count,
        summary.service_count,
        fee
    ]);
    table.printstd();
}
