//! CSV files produced by a run. All writers truncate existing files.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;

use crate::aggregate::{ClassificationSummary, FrequencyTable, JoinedRecord};
use crate::publications::Mission;

pub const JOINED_FILENAME: &str = "affiliations_kepler_k2.csv";
pub const SUMMARY_FILENAME: &str = "affiliations_carnegie.csv";

const FREQUENCY_HEADER: [&str; 2] = ["affiliation", "count"];
const JOINED_HEADER: [&str; 4] = ["Affiliation", "K2_count", "Kepler_count", "CarnegieClass"];
const SUMMARY_HEADER: [&str; 4] = ["Label", "Value", "K2_count", "Kepler_count"];

pub fn frequency_path(dir: &Path, mission: Mission) -> PathBuf {
    dir.join(format!("affiliations_{}.csv", mission.as_str()))
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Create dir {}", dir.display()))
}

#[derive(Serialize)]
struct FrequencyRow<'a> {
    affiliation: &'a str,
    count: u64,
}

/// `affiliation,count` table preceded by a comment naming the mission.
pub fn write_frequency_table(
    path: &Path,
    mission: Mission,
    author_limit: usize,
    table: &FrequencyTable,
) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Open {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(
        out,
        "# Affiliations for {}, first {} authors of each paper",
        mission, author_limit
    )?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(FREQUENCY_HEADER)?;
    for (affiliation, count) in table.sorted() {
        writer.serialize(FrequencyRow { affiliation, count })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_joined(path: &Path, rows: &[JoinedRecord]) -> Result<()> {
    write_csv_records(path, &JOINED_HEADER, rows)
}

/// Reads back a joined table written by [`write_joined`]. Blank counts are
/// taken as zero. The joined table carries no comment lines, so a leading `#`
/// is part of the affiliation.
pub fn read_joined(path: &Path) -> Result<Vec<JoinedRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize::<RawJoinedRecord>() {
        let raw = record.with_context(|| format!("Malformed row in {}", path.display()))?;
        rows.push(JoinedRecord {
            affiliation: raw.affiliation,
            k2_count: raw.k2_count.unwrap_or(0),
            kepler_count: raw.kepler_count.unwrap_or(0),
            carnegie_class: raw.carnegie_class,
        });
    }
    Ok(rows)
}

#[derive(serde::Deserialize)]
struct RawJoinedRecord {
    #[serde(rename = "Affiliation")]
    affiliation: String,
    #[serde(rename = "K2_count")]
    k2_count: Option<u64>,
    #[serde(rename = "Kepler_count")]
    kepler_count: Option<u64>,
    #[serde(rename = "CarnegieClass")]
    carnegie_class: i32,
}

pub fn write_summary(path: &Path, rows: &[ClassificationSummary]) -> Result<()> {
    write_csv_records(path, &SUMMARY_HEADER, rows)
}

/// The header is written explicitly so that empty tables still carry one.
fn write_csv_records<T: Serialize>(path: &Path, header: &[&str], records: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Open {}", path.display()))?;
    writer.write_record(header)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
