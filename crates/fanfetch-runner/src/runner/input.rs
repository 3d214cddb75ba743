//! Route files and seed messages.

use anyhow::{Context, bail};
use bytes::Bytes;
use fanfetch::{Route, memory::MemoryBroker};
use serde::Deserialize;
use std::path::Path;

/// One line of the `INPUT` file.
///
/// String payloads are published as their UTF-8 bytes; any other JSON value is
/// published in its compact JSON form.
#[derive(Debug, Deserialize, PartialEq)]
pub struct InputRecord {
    pub topic: String,
    #[serde(default)]
    pub key: Option<String>,
    pub payload: serde_json::Value,
}

impl InputRecord {
    fn payload_bytes(&self) -> anyhow::Result<Bytes> {
        match &self.payload {
            serde_json::Value::String(text) => Ok(Bytes::from(text.clone())),
            other => Ok(Bytes::from(serde_json::to_vec(other)?)),
        }
    }
}

/// Parses a JSON array of routes.
pub fn parse_routes(raw: &str) -> anyhow::Result<Vec<Route>> {
    serde_json::from_str(raw).context("ROUTES_FILE must hold a JSON array of routes")
}

/// Parses JSON-lines input. Blank lines are skipped.
pub fn parse_records(raw: &str) -> anyhow::Result<Vec<InputRecord>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid input record on line {}", index + 1))
        })
        .collect()
}

/// Publishes `records` to `broker` in order. A record for a topic that no
/// route subscribes to is an error.
pub fn seed(
    broker: &MemoryBroker,
    routes: &[Route],
    records: &[InputRecord],
) -> anyhow::Result<usize> {
    for record in records {
        if !routes.iter().any(|route| route.topic() == record.topic) {
            bail!("Input record targets unrouted topic `{}`", record.topic);
        }
        broker.publish(
            &record.topic,
            record.key.clone().map(Bytes::from),
            record.payload_bytes()?,
        )?;
    }
    Ok(records.len())
}

/// Reads `path` and seeds every record it holds.
pub fn seed_from_file(
    broker: &MemoryBroker,
    routes: &[Route],
    path: &Path,
) -> anyhow::Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read INPUT `{}`", path.display()))?;
    seed(broker, routes, &parse_records(&raw)?)
}
