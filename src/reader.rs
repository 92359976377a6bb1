use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::schema::{Catalog, Service};

/// Read one JSON document from disk.
pub async fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Write a value as pretty JSON, replacing the file.
pub async fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> anyhow::Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;
    let mut file = File::create(path)
        .await
        .with_context(|| format!("creating {}", path.display()))?;
    file.write_all(json.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await?;
    Ok(())
}

pub async fn read_catalog(path: impl AsRef<Path>) -> anyhow::Result<Catalog> {
    let catalog: Catalog = read_json(path).await?;
    log::debug!(
        target: "reader",
        "loaded {} codes, {} edges, {} preferred sections",
        catalog.codes.len(),
        catalog.edges.len(),
        catalog.preferred_sections.len()
    );
    Ok(catalog)
}

/// Read services one JSON object per line. Lines that do not parse are
/// skipped with a warning.
pub async fn read_services_jsonl(path: impl AsRef<Path>) -> anyhow::Result<Vec<Service>> {
    let path = path.as_ref();
    let file = File::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    let mut services = Vec::new();
    let mut number = 0;
    while let Some(line) = lines.next_line().await? {
        number += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Service>(&line) {
            Ok(service) => services.push(service),
            Err(err) => log::warn!(target: "reader", "invalid service skipped on line {number}: {err}"),
        }
    }
    Ok(services)
}

pub async fn write_services_jsonl(path: impl AsRef<Path>, services: &[Service]) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut out = String::new();
    for service in services {
        out.push_str(&serde_json::to_string(service)?);
        out.push('\n');
    }
    fs::write(path, out)
        .await
        .with_context(|| format!("writing {}", path.display()))
}
