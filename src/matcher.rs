//! Layered lookup of a canonical institution name against the Carnegie
//! reference table.

use deunicode::deunicode;
use log::{debug, warn};

use crate::aliases::AliasTable;
use crate::reference::ReferenceTable;

/// Name is not in the taxonomy, or could not be matched.
pub const NOT_FOUND: i32 = -2;
/// Research institute, observatory or agency centre deliberately kept out of
/// the university classification.
pub const NON_ACADEMIC: i32 = -3;

/// How a name reached its code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchLayer {
    NonAcademic,
    Exact,
    AliasClass,
    Variant(String),
    MergeName,
    Unmatched { looks_academic: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub code: i32,
    pub layer: MatchLayer,
}

impl Classification {
    fn new(code: i32, layer: MatchLayer) -> Self {
        Self { code, layer }
    }

    pub fn is_matched(&self) -> bool {
        !matches!(self.layer, MatchLayer::Unmatched { .. })
    }

    /// Unmatched names that read like a university or college; these are the
    /// ones worth adding to the alias table.
    pub fn needs_review(&self) -> bool {
        matches!(self.layer, MatchLayer::Unmatched { looks_academic: true })
    }
}

pub fn looks_academic(name: &str) -> bool {
    name.contains("University") || name.contains("College")
}

/// Deterministic spelling rewrites tried against the reference table, in
/// priority order. Rewrites that leave the name unchanged are omitted.
pub fn surface_variants(name: &str) -> Vec<String> {
    let candidates = [
        format!("The {}", name),
        name.replace(" at ", "-"),
        name.replace('-', " at "),
        name.replace('-', " "),
        name.replace(" at ", " "),
        name.replace('\'', ""),
        name.replace('`', ""),
        name.replace("State University of New York", "SUNY"),
        name.replace(" &amp", ""),
        deunicode(name),
    ];
    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if candidate != name && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

pub struct Matcher<'a> {
    reference: &'a ReferenceTable,
    aliases: &'a AliasTable,
}

impl<'a> Matcher<'a> {
    pub fn new(reference: &'a ReferenceTable, aliases: &'a AliasTable) -> Self {
        Self { reference, aliases }
    }

    /// Classifies `name`. Alias rows carrying [`NON_ACADEMIC`] take precedence
    /// over every other layer; otherwise the first layer that hits wins.
    pub fn classify(&self, name: &str) -> Classification {
        let alias_class = self.aliases.class_for_affiliation(name);
        if alias_class == Some(NON_ACADEMIC) {
            return Classification::new(NON_ACADEMIC, MatchLayer::NonAcademic);
        }
        if let Some(code) = self.reference.get(name) {
            return Classification::new(code, MatchLayer::Exact);
        }
        if let Some(code) = alias_class {
            return Classification::new(code, MatchLayer::AliasClass);
        }
        for variant in surface_variants(name) {
            if let Some(code) = self.reference.get(&variant) {
                return Classification::new(code, MatchLayer::Variant(variant));
            }
        }
        if let Some(code) = self.aliases.class_for_merge_name(name) {
            return Classification::new(code, MatchLayer::MergeName);
        }
        Classification::new(
            NOT_FOUND,
            MatchLayer::Unmatched {
                looks_academic: looks_academic(name),
            },
        )
    }

    /// Classifies `name` and logs the outcome. Only academic-looking misses
    /// produce a warning; anything else is assumed to be a street or
    /// department that slipped through extraction.
    pub fn classify_logged(&self, name: &str) -> Classification {
        let result = self.classify(name);
        if result.needs_review() {
            warn!("Not found: {}", name);
        } else {
            debug!("{} -> {} via {:?}", name, result.code, result.layer);
        }
        result
    }
}
