//! Alias/equivalence table: maps variant spellings of an institution onto the
//! canonical name used by the reference table, and optionally carries a
//! classification code known ahead of time.

use std::path::Path;

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{TableError, TableResult};
use crate::reference::{column_index, open_table, optional_column_index, parse_code};

/// Separator used inside a merge name to fan one affiliation out to several
/// institutions.
pub const COMPOUND_SEPARATOR: char = ';';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub affiliation: String,
    pub merge_name: Option<String>,
    pub carnegie_class: Option<i32>,
}

/// Lookup indexes over the alias rows. Every index keeps the first row seen
/// for a key, so duplicate rows lower in the file never change a result.
#[derive(Debug, Default)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
    first_rows: FxHashMap<String, usize>,
    merge_targets: FxHashMap<String, String>,
    merge_name_classes: FxHashMap<String, i32>,
}

impl AliasTable {
    pub fn load(path: &Path) -> TableResult<Self> {
        let mut reader = open_table(path)?;
        let headers = reader.headers()?.clone();
        let affiliation_idx = column_index(&headers, "Affiliation", path)?;
        let merge_idx = optional_column_index(&headers, "MergeName");
        let class_idx = optional_column_index(&headers, "CarnegieClass");

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let affiliation = record.get(affiliation_idx).unwrap_or("").trim();
            if affiliation.is_empty() {
                continue;
            }
            let merge_name = merge_idx
                .and_then(|idx| record.get(idx))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            let carnegie_class = match class_idx.and_then(|idx| record.get(idx)) {
                Some(raw) if !raw.trim().is_empty() => Some(parse_code(raw, line, path)?),
                _ => None,
            };
            entries.push(AliasEntry {
                affiliation: affiliation.to_string(),
                merge_name,
                carnegie_class,
            });
        }
        let table = Self::from_entries(entries)?;
        info!(
            "Loaded {} alias rows ({} distinct names) from {}",
            table.entries.len(),
            table.first_rows.len(),
            path.display()
        );
        Ok(table)
    }

    /// Builds the indexes and collapses merge chains so every stored target
    /// is terminal. A chain that loops back on itself is rejected.
    pub fn from_entries(entries: Vec<AliasEntry>) -> TableResult<Self> {
        let mut first_rows = FxHashMap::default();
        let mut raw_targets: FxHashMap<String, String> = FxHashMap::default();
        let mut merge_name_classes = FxHashMap::default();

        for (idx, entry) in entries.iter().enumerate() {
            if first_rows.contains_key(&entry.affiliation) {
                debug!("Ignoring duplicate alias row for '{}'", entry.affiliation);
                continue;
            }
            first_rows.insert(entry.affiliation.clone(), idx);
            if let Some(merge) = &entry.merge_name {
                raw_targets.insert(entry.affiliation.clone(), merge.clone());
                if let Some(code) = entry.carnegie_class {
                    merge_name_classes.entry(merge.clone()).or_insert(code);
                }
            }
        }

        let mut merge_targets = FxHashMap::default();
        for key in raw_targets.keys() {
            let terminal = terminal_target(&raw_targets, key)?;
            merge_targets.insert(key.clone(), terminal);
        }

        Ok(Self {
            entries,
            first_rows,
            merge_targets,
            merge_name_classes,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First alias row whose `Affiliation` equals `name`.
    pub fn entry(&self, name: &str) -> Option<&AliasEntry> {
        self.first_rows.get(name).map(|&idx| &self.entries[idx])
    }

    /// Canonical form of `name`, or `name` itself when no alias applies.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.merge_targets
            .get(name)
            .map(String::as_str)
            .unwrap_or(name)
    }

    /// Resolves `name` and fans a compound canonical name out into its parts.
    /// Each part is resolved again, so a part that is itself an alias still
    /// comes out canonical.
    pub fn resolve_all(&self, name: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for part in self.resolve(name).split(COMPOUND_SEPARATOR).map(str::trim) {
            if part.is_empty() {
                continue;
            }
            let canonical = self.resolve(part);
            if !names.iter().any(|seen| seen == canonical) {
                names.push(canonical.to_string());
            }
        }
        names
    }

    /// Code attached directly to the row whose `Affiliation` is `name`.
    pub fn class_for_affiliation(&self, name: &str) -> Option<i32> {
        self.entry(name).and_then(|entry| entry.carnegie_class)
    }

    /// Code attached to the first row whose `MergeName` is `name`.
    pub fn class_for_merge_name(&self, name: &str) -> Option<i32> {
        self.merge_name_classes.get(name).copied()
    }
}

fn terminal_target(targets: &FxHashMap<String, String>, start: &str) -> TableResult<String> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    seen.insert(start);
    let mut current = start;
    while let Some(next) = targets.get(current) {
        if next == current {
            break;
        }
        if !seen.insert(next.as_str()) {
            return Err(TableError::AliasCycle(start.to_string()));
        }
        current = next.as_str();
    }
    Ok(current.to_string())
}
