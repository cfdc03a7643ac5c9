//! Per-mission frequency tables, the K2/Kepler outer join, and the roll-up
//! of joined rows into Carnegie classification buckets.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::matcher::{Matcher, NOT_FOUND};
use crate::reference::ClassLabel;

/// Occurrence counts of institution names across one mission's
/// publications. Each publication contributes at most once per name.
#[derive(Debug, Default, Clone)]
pub struct FrequencyTable {
    counts: FxHashMap<String, u64>,
    publications: u64,
}

impl FrequencyTable {
    pub fn add_publication<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.publications += 1;
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for name in names {
            let name = name.into();
            if seen.insert(name.clone()) {
                *self.counts.entry(name).or_insert(0) += 1;
            }
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn publications(&self) -> u64 {
        self.publications
    }

    /// Entries ordered by count descending, then name.
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut items: Vec<_> = self
            .counts
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        items
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinedRecord {
    #[serde(rename = "Affiliation")]
    pub affiliation: String,
    #[serde(rename = "K2_count")]
    pub k2_count: u64,
    #[serde(rename = "Kepler_count")]
    pub kepler_count: u64,
    #[serde(rename = "CarnegieClass")]
    pub carnegie_class: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
    #[serde(rename = "Label")]
    pub label: String,
    #[serde(rename = "Value")]
    pub value: i32,
    #[serde(rename = "K2_count")]
    pub k2_count: u64,
    #[serde(rename = "Kepler_count")]
    pub kepler_count: u64,
}

/// Outer join of the two mission tables on affiliation name, missing counts
/// filled with zero. Rows are ordered by K2 count then Kepler count, both
/// descending, with the name as the final ascending tie-break. Every row
/// starts out unclassified.
pub fn outer_join(k2: &FrequencyTable, kepler: &FrequencyTable) -> Vec<JoinedRecord> {
    let names: FxHashSet<&str> = k2
        .counts
        .keys()
        .chain(kepler.counts.keys())
        .map(String::as_str)
        .collect();
    let mut rows: Vec<JoinedRecord> = names
        .into_iter()
        .map(|name| JoinedRecord {
            affiliation: name.to_string(),
            k2_count: k2.get(name),
            kepler_count: kepler.get(name),
            carnegie_class: NOT_FOUND,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.k2_count
            .cmp(&a.k2_count)
            .then_with(|| b.kepler_count.cmp(&a.kepler_count))
            .then_with(|| a.affiliation.cmp(&b.affiliation))
    });
    rows
}

/// Attaches a classification code to every joined row. Returns the number of
/// rows that matched the taxonomy or the non-academic list.
pub fn classify_rows(rows: &mut [JoinedRecord], matcher: &Matcher<'_>) -> usize {
    let mut matched = 0;
    for row in rows.iter_mut() {
        let result = matcher.classify_logged(&row.affiliation);
        if result.is_matched() {
            matched += 1;
        }
        row.carnegie_class = result.code;
    }
    matched
}

/// One summary row per reference code, in label order. Rows carrying a
/// negative (sentinel) code never contribute.
pub fn summarize(rows: &[JoinedRecord], labels: &[ClassLabel]) -> Vec<ClassificationSummary> {
    let mut totals: FxHashMap<i32, (u64, u64)> = FxHashMap::default();
    for row in rows.iter().filter(|r| r.carnegie_class >= 0) {
        let entry = totals.entry(row.carnegie_class).or_insert((0, 0));
        entry.0 += row.k2_count;
        entry.1 += row.kepler_count;
    }
    labels
        .iter()
        .map(|class| {
            let (k2_count, kepler_count) = if class.value >= 0 {
                totals.get(&class.value).copied().unwrap_or((0, 0))
            } else {
                (0, 0)
            };
            ClassificationSummary {
                label: class.label.clone(),
                value: class.value,
                k2_count,
                kepler_count,
            }
        })
        .collect()
}
