//! Heuristic segmentation of raw author affiliation strings into candidate
//! institution names.

use clap::ValueEnum;
use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::aliases::AliasTable;

/// Sub-fields containing any of these are street addresses or departments.
/// Checked before [`INSTITUTION_MARKERS`], so they always win.
pub const ADDRESS_MARKERS: [&str; 11] = [
    "Depart",
    "Str.",
    "Street",
    "Rue",
    "Ave.",
    "Ave ",
    "College St",
    "Drive",
    "Avenue",
    "Centre-ville",
    "Camino",
];

pub const INSTITUTION_MARKERS: [&str; 6] = [
    "Univers", "College", "Center", "Instit", "Centre", "Observ",
];

pub const DEFAULT_AUTHOR_LIMIT: usize = 3;

lazy_static! {
    static ref LEADING_ARTICLE: Regex = Regex::new(r"^The\b\s*").unwrap();
}

/// Which `;`-separated locations of a raw affiliation are examined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SegmentPolicy {
    /// Only the text before the first `;`.
    #[default]
    First,
    /// Every `;`-separated location.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubfieldKind {
    Address,
    Institution,
    Other,
}

pub fn classify_subfield(subfield: &str) -> SubfieldKind {
    if ADDRESS_MARKERS.iter().any(|m| subfield.contains(m)) {
        SubfieldKind::Address
    } else if INSTITUTION_MARKERS.iter().any(|m| subfield.contains(m)) {
        SubfieldKind::Institution
    } else {
        SubfieldKind::Other
    }
}

/// Drops a leading "The", quote characters and surrounding whitespace.
pub fn clean_candidate(subfield: &str) -> Option<String> {
    let unquoted = subfield.replace('"', "");
    let stripped = LEADING_ARTICLE.replace(unquoted.trim(), "");
    let cleaned = stripped.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

pub struct Extractor<'a> {
    aliases: &'a AliasTable,
    author_limit: usize,
    segments: SegmentPolicy,
}

impl<'a> Extractor<'a> {
    pub fn new(aliases: &'a AliasTable) -> Self {
        Self {
            aliases,
            author_limit: DEFAULT_AUTHOR_LIMIT,
            segments: SegmentPolicy::default(),
        }
    }

    pub fn with_author_limit(mut self, limit: usize) -> Self {
        self.author_limit = limit;
        self
    }

    pub fn with_segments(mut self, segments: SegmentPolicy) -> Self {
        self.segments = segments;
        self
    }

    pub fn author_limit(&self) -> usize {
        self.author_limit
    }

    /// Unique canonical institution names for one publication, in the order
    /// they were first seen.
    pub fn candidates<S: AsRef<str>>(&self, affiliations: &[S]) -> Vec<String> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut names = Vec::new();
        for raw in affiliations.iter().take(self.author_limit) {
            for segment in self.segments_of(raw.as_ref()) {
                for subfield in segment.split(',') {
                    if classify_subfield(subfield) != SubfieldKind::Institution {
                        continue;
                    }
                    let Some(candidate) = clean_candidate(subfield) else {
                        continue;
                    };
                    for name in self.aliases.resolve_all(&candidate) {
                        if seen.insert(name.clone()) {
                            names.push(name);
                        }
                    }
                }
            }
        }
        names
    }

    fn segments_of<'s>(&self, raw: &'s str) -> Vec<&'s str> {
        match self.segments {
            SegmentPolicy::First => raw.split(';').take(1).collect(),
            SegmentPolicy::All => raw.split(';').collect(),
        }
    }
}
