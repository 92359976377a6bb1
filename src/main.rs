use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use claimchain::analysis::Page;
use claimchain::batch::{ClaimFile, verify_batch};
use claimchain::config::{self, ChainQuery, Command};
use claimchain::dates::{parse_flexible_date, parse_utc_offset, today_in};
use claimchain::{ChainTable, ServiceLedger, build_all, json_faker, logging, reader, reporter};
use claimchain::schema::{Catalog, Service};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::config();
    logging::init(config.verbose);

    let offset = parse_utc_offset(&config.utc_offset)?;
    let today = today_in(offset, Utc::now());

    match config.command {
        Command::Chains { catalog, query, json } => {
            let (_, chains) = load_chains(&catalog).await?;
            run_query(&chains, query, json)?;
        }
        Command::Round {
            catalog,
            service,
            today: date,
            write,
        } => {
            let date = match date {
                Some(input) => parse_flexible_date(&input, today)?,
                None => today,
            };
            let (catalog, chains) = load_chains(&catalog).await?;
            let ledger = ServiceLedger::new(Arc::new(catalog), Arc::new(chains));
            if service.extension().is_some_and(|ext| ext == "jsonl") {
                round_many(&ledger, &service, date, write).await?;
            } else {
                round_one(&ledger, &service, date, write).await?;
            }
        }
        Command::Discharge {
            catalog,
            service,
            date,
            write,
        } => {
            let requested = parse_flexible_date(&date, today)?;
            let (catalog, chains) = load_chains(&catalog).await?;
            let ledger = ServiceLedger::new(Arc::new(catalog), Arc::new(chains));
            let loaded: Service = reader::read_json(&service).await?;
            let (id, version) = (loaded.id.clone(), loaded.version);
            ledger.insert(loaded).await;

            let (end, _) = ledger.discharge(&id, Some(version), requested).await?;
            println!("{id}: discharged on {end}");
            if write {
                reader::write_json(&service, &ledger.snapshot(&id).await?).await?;
            }
        }
        Command::Batch { catalog, claim, out } => {
            let catalog = reader::read_catalog(&catalog).await?;
            let claim: ClaimFile = reader::read_json(&claim).await?;
            let batch = claim.to_batch(&catalog)?;
            reporter::print_overflows(&batch.warnings);
            match out {
                Some(path) => {
                    tokio::fs::write(&path, &batch.text)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!(
                        "wrote {} records ({} services) to {}",
                        batch.trailer.record_count,
                        batch.trailer.service_count,
                        path.display()
                    );
                }
                None => print!("{}", batch.text),
            }
        }
        Command::Verify { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let summary = verify_batch(&text)?;
            reporter::print_batch_summary(&summary);
        }
        Command::Fake { dir, chains } => {
            json_faker::write_fake_files(&dir, chains, today).await?;
            println!("fake catalog, service and claim written to {}", dir.display());
        }
    }

    Ok(())
}

async fn load_chains(path: &Path) -> anyhow::Result<(Catalog, ChainTable)> {
    let catalog = reader::read_catalog(path).await?;
    let build = build_all(&catalog);
    reporter::print_build_failures(&build.failures);
    Ok((catalog, build.table))
}

fn emit<T: Serialize + ?Sized>(value: &T, json: bool, table: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        table(value);
    }
    Ok(())
}

fn run_query(chains: &ChainTable, query: ChainQuery, json: bool) -> anyhow::Result<()> {
    match query {
        ChainQuery::Stats => emit(&chains.statistics(), json, reporter::print_statistics),
        ChainQuery::Root { id, offset, limit } => emit(
            chains.chain_by_root(id, Page::new(offset, limit)).as_slice(),
            json,
            reporter::print_records,
        ),
        ChainQuery::Code { id } => {
            let record = chains.chain_by_code(id);
            emit(&record, json, |record| match record {
                Some(record) => reporter::print_records(std::slice::from_ref(record)),
                None => println!("code {id} is not part of any chain"),
            })
        }
        ChainQuery::Containing { id } => emit(
            chains.chains_containing_code(id).as_slice(),
            json,
            reporter::print_root_chains,
        ),
        ChainQuery::Longest { limit } => emit(
            chains.longest_chains(limit).as_slice(),
            json,
            reporter::print_summaries,
        ),
        ChainQuery::Highest { limit } => emit(
            chains.chains_with_highest_day_ranges(limit).as_slice(),
            json,
            reporter::print_summaries,
        ),
        ChainQuery::Range {
            min,
            max,
            offset,
            limit,
        } => emit(
            chains
                .day_range_analysis(min, max, Page::new(offset, limit))
                .as_slice(),
            json,
            reporter::print_records,
        ),
        ChainQuery::Search {
            term,
            offset,
            limit,
        } => emit(
            chains.search(&term, Page::new(offset, limit)).as_slice(),
            json,
            reporter::print_records,
        ),
    }
}

async fn round_one(ledger: &ServiceLedger, path: &Path, date: NaiveDate, write: bool) -> anyhow::Result<()> {
    let service: Service = reader::read_json(path).await?;
    let (id, version) = (service.id.clone(), service.version);
    ledger.insert(service).await;

    let (outcome, new_version) = ledger.round(&id, Some(version), date).await?;
    reporter::print_outcome(&id, &outcome);
    if write && new_version != version {
        reader::write_json(path, &ledger.snapshot(&id).await?).await?;
    }
    Ok(())
}

async fn round_many(ledger: &ServiceLedger, path: &Path, date: NaiveDate, write: bool) -> anyhow::Result<()> {
    for service in reader::read_services_jsonl(path).await? {
        ledger.insert(service).await;
    }

    for (id, result) in ledger.round_all(date).await {
        match result {
            Ok(outcome) => reporter::print_outcome(&id, &outcome),
            Err(err) => log::error!(target: "scheduler", "[service:{id}] {err}"),
        }
    }

    if write {
        let mut services = Vec::new();
        for id in ledger.service_ids().await {
            services.push(ledger.snapshot(&id).await?);
        }
        reader::write_services_jsonl(path, &services).await?;
    }
    Ok(())
}
