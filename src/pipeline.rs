//! End-to-end batch run: publications → per-mission frequency tables →
//! joined K2/Kepler table → Carnegie classification summary.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::aggregate::{classify_rows, outer_join, summarize, FrequencyTable, JoinedRecord};
use crate::aliases::AliasTable;
use crate::extract::{Extractor, SegmentPolicy};
use crate::matcher::Matcher;
use crate::output::{
    ensure_dir, frequency_path, read_joined, write_frequency_table, write_joined, write_summary,
    JOINED_FILENAME, SUMMARY_FILENAME,
};
use crate::publications::{open_source, Mission, PublicationSource};
use crate::reference::{load_class_labels, ReferenceTable};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub publications: PathBuf,
    pub reference: PathBuf,
    pub aliases: PathBuf,
    pub classifications: PathBuf,
    pub output_dir: PathBuf,
    pub author_limit: usize,
    pub segments: SegmentPolicy,
    pub recompute: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub joined_rows: usize,
    pub matched_rows: usize,
    pub reused_joined: bool,
    pub summary_rows: usize,
}

pub fn run(config: &PipelineConfig) -> Result<RunReport> {
    let start_time = Instant::now();
    ensure_dir(&config.output_dir)?;
    let mut report = RunReport::default();

    let joined_path = config.output_dir.join(JOINED_FILENAME);
    let rows = if joined_path.exists() && !config.recompute {
        info!(
            "Reusing joined table {}; pass --recompute to rebuild it",
            joined_path.display()
        );
        report.reused_joined = true;
        read_joined(&joined_path)?
    } else {
        let (rows, matched) = build_joined(config)?;
        report.matched_rows = matched;
        write_joined(&joined_path, &rows)?;
        info!("Wrote {} joined rows to {}", rows.len(), joined_path.display());
        rows
    };
    report.joined_rows = rows.len();

    let labels = load_class_labels(&config.classifications).with_context(|| {
        format!(
            "Load classification labels from {}",
            config.classifications.display()
        )
    })?;
    let summary = summarize(&rows, &labels);
    for class in summary.iter().filter(|s| s.k2_count > 0 || s.kepler_count > 0) {
        info!(
            "{} ({}): Kepler {} K2 {}",
            class.label, class.value, class.kepler_count, class.k2_count
        );
    }
    let summary_path = config.output_dir.join(SUMMARY_FILENAME);
    write_summary(&summary_path, &summary)?;
    report.summary_rows = summary.len();

    info!(
        "Finished in {}. Wrote {}",
        format_elapsed(start_time.elapsed()),
        summary_path.display()
    );
    Ok(report)
}

fn build_joined(config: &PipelineConfig) -> Result<(Vec<JoinedRecord>, usize)> {
    let aliases = AliasTable::load(&config.aliases)
        .with_context(|| format!("Load alias table from {}", config.aliases.display()))?;
    let source = open_source(&config.publications).with_context(|| {
        format!(
            "Open publication store {}",
            config.publications.display()
        )
    })?;
    let extractor = Extractor::new(&aliases)
        .with_author_limit(config.author_limit)
        .with_segments(config.segments);

    let k2 = count_mission(source.as_ref(), Mission::K2, &extractor)?;
    let kepler = count_mission(source.as_ref(), Mission::Kepler, &extractor)?;
    for (mission, table) in [(Mission::K2, &k2), (Mission::Kepler, &kepler)] {
        let path = frequency_path(&config.output_dir, mission);
        write_frequency_table(&path, mission, extractor.author_limit(), table)?;
        info!("Wrote {}", path.display());
    }

    let reference = ReferenceTable::load(&config.reference)
        .with_context(|| format!("Load reference table from {}", config.reference.display()))?;
    let matcher = Matcher::new(&reference, &aliases);
    let mut rows = outer_join(&k2, &kepler);
    let matched = classify_rows(&mut rows, &matcher);
    info!("Classified {} of {} affiliations", matched, rows.len());
    Ok((rows, matched))
}

/// Runs the extractor over every publication of `mission`.
pub fn count_mission(
    source: &dyn PublicationSource,
    mission: Mission,
    extractor: &Extractor<'_>,
) -> Result<FrequencyTable> {
    let publications = source
        .publications(mission)
        .with_context(|| format!("Read {} publications", mission))?;
    info!("Processing {} {} publications", publications.len(), mission);

    let progress_bar = ProgressBar::new(publications.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );
    progress_bar.set_message(mission.to_string());

    let mut table = FrequencyTable::default();
    for publication in &publications {
        table.add_publication(extractor.candidates(publication.aff.as_slice()));
        progress_bar.inc(1);
    }
    progress_bar.finish_and_clear();

    info!("Found {} unique locations for {}", table.len(), mission);
    Ok(table)
}

fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs() % 60;
    let minutes = (elapsed.as_secs() / 60) % 60;
    let hours = elapsed.as_secs() / 3600;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, elapsed.subsec_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aliases::AliasEntry;
    use crate::matcher::NON_ACADEMIC;
    use crate::publications::Publication;

    struct FixedSource(Vec<(Mission, Vec<&'static str>)>);

    impl PublicationSource for FixedSource {
        fn publications(&self, mission: Mission) -> crate::error::TableResult<Vec<Publication>> {
            Ok(self
                .0
                .iter()
                .filter(|(m, _)| *m == mission)
                .map(|(m, aff)| Publication {
                    bibcode: None,
                    mission: Some(m.to_string()),
                    aff: aff.iter().map(|s| s.to_string()).collect(),
                })
                .collect())
        }
    }

    #[test]
    fn counts_each_mission_separately() {
        let source = FixedSource(vec![
            (Mission::K2, vec!["Department of Astronomy, Columbia University, New York, NY"]),
            (Mission::K2, vec!["Columbia University", "Columbia University"]),
            (Mission::Kepler, vec!["NASA Ames Research Center, Moffett Field, CA"]),
        ]);
        let aliases = AliasTable::default();
        let extractor = Extractor::new(&aliases);
        let k2 = count_mission(&source, Mission::K2, &extractor).unwrap();
        let kepler = count_mission(&source, Mission::Kepler, &extractor).unwrap();
        assert_eq!(k2.get("Columbia University"), 2);
        assert_eq!(k2.publications(), 2);
        assert_eq!(kepler.get("NASA Ames Research Center"), 1);
        assert_eq!(kepler.get("Columbia University"), 0);
    }

    #[test]
    fn extracted_names_classify_end_to_end() {
        let source = FixedSource(vec![
            (Mission::K2, vec!["University of Texas, Austin, TX 78712"]),
            (Mission::Kepler, vec!["NASA Goddard Space Flight Center, Greenbelt, MD"]),
        ]);
        let aliases = AliasTable::from_entries(vec![
            AliasEntry {
                affiliation: "University of Texas".to_string(),
                merge_name: Some("The University of Texas at Austin".to_string()),
                carnegie_class: None,
            },
            AliasEntry {
                affiliation: "NASA Goddard Space Flight Center".to_string(),
                merge_name: None,
                carnegie_class: Some(NON_ACADEMIC),
            },
        ])
        .unwrap();
        let reference = ReferenceTable::from_pairs([("The University of Texas at Austin", 15)]);
        let extractor = Extractor::new(&aliases);
        let k2 = count_mission(&source, Mission::K2, &extractor).unwrap();
        let kepler = count_mission(&source, Mission::Kepler, &extractor).unwrap();

        let mut rows = outer_join(&k2, &kepler);
        let matched = classify_rows(&mut rows, &Matcher::new(&reference, &aliases));
        assert_eq!(matched, 2);
        let codes: Vec<(&str, i32)> = rows
            .iter()
            .map(|r| (r.affiliation.as_str(), r.carnegie_class))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("The University of Texas at Austin", 15),
                ("NASA Goddard Space Flight Center", -3),
            ]
        );
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.500s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
