//! Read-only access to the publication store: either a kpub SQLite database
//! or JSON Lines exports of it (plain or gzip-compressed).

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use flate2::read::GzDecoder;
use glob::glob;
use log::{info, warn};
use rusqlite::{Connection, OpenFlags};
use serde::Deserialize;

use crate::error::{TableError, TableResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mission {
    K2,
    Kepler,
}

impl Mission {
    /// Key used by kpub and in output filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mission::K2 => "k2",
            Mission::Kepler => "kepler",
        }
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mission {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "k2" => Ok(Mission::K2),
            "kepler" => Ok(Mission::Kepler),
            other => Err(TableError::UnknownMission(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Publication {
    #[serde(default)]
    pub bibcode: Option<String>,
    #[serde(default)]
    pub mission: Option<String>,
    #[serde(default)]
    pub aff: Vec<String>,
}

pub trait PublicationSource {
    /// All publications of `mission`, in a stable order.
    fn publications(&self, mission: Mission) -> TableResult<Vec<Publication>>;
}

/// kpub database: table `pubs` with a `mission` column and the ADS record as
/// JSON in `metrics`.
pub struct KpubDatabase {
    conn: Connection,
}

impl KpubDatabase {
    pub fn open(path: &Path) -> TableResult<Self> {
        if !path.exists() {
            return Err(TableError::FileNotFound(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self { conn })
    }
}

impl PublicationSource for KpubDatabase {
    fn publications(&self, mission: Mission) -> TableResult<Vec<Publication>> {
        let mut stmt = self.conn.prepare(
            "SELECT bibcode, metrics FROM pubs WHERE mission = ?1 ORDER BY date DESC, bibcode",
        )?;
        let rows = stmt.query_map([mission.as_str()], |row| {
            Ok((row.get::<_, Option<String>>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut publications = Vec::new();
        for row in rows {
            let (bibcode, metrics) = row?;
            let mut publication: Publication = serde_json::from_str(&metrics)?;
            if publication.bibcode.is_none() {
                publication.bibcode = bibcode;
            }
            publication.mission = Some(mission.as_str().to_string());
            publications.push(publication);
        }
        Ok(publications)
    }
}

/// One or more `.jsonl` / `.jsonl.gz` files, one publication per line, each
/// carrying its own `mission` field.
pub struct JsonlSource {
    files: Vec<PathBuf>,
}

impl JsonlSource {
    pub fn open(path: &Path) -> TableResult<Self> {
        if !path.exists() {
            return Err(TableError::FileNotFound(path.to_path_buf()));
        }
        let files = if path.is_dir() {
            find_jsonl_files(path)?
        } else {
            vec![path.to_path_buf()]
        };
        info!("Found {} publication files under {}", files.len(), path.display());
        Ok(Self { files })
    }

    fn read_file(&self, path: &Path, mission: Mission, out: &mut Vec<Publication>) -> TableResult<()> {
        let file = File::open(path)?;
        let reader: Box<dyn Read> = if is_gzip(path) {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        for (line_num, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let publication: Publication = match serde_json::from_str(&line) {
                Ok(p) => p,
                Err(e) => {
                    warn!(
                        "Skipping malformed line {} in {}: {}",
                        line_num + 1,
                        path.display(),
                        e
                    );
                    continue;
                }
            };
            let matches_mission = publication
                .mission
                .as_deref()
                .and_then(|m| m.parse::<Mission>().ok())
                == Some(mission);
            if matches_mission {
                out.push(publication);
            }
        }
        Ok(())
    }
}

impl PublicationSource for JsonlSource {
    fn publications(&self, mission: Mission) -> TableResult<Vec<Publication>> {
        let mut publications = Vec::new();
        for path in &self.files {
            self.read_file(path, mission, &mut publications)?;
        }
        Ok(publications)
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

fn is_jsonl(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".jsonl") || name.ends_with(".jsonl.gz")
}

fn find_jsonl_files(directory: &Path) -> TableResult<Vec<PathBuf>> {
    let pattern = directory.join("**/*.jsonl*");
    let mut files: Vec<PathBuf> = glob(&pattern.to_string_lossy())?
        .filter_map(Result::ok)
        .filter(|p| is_jsonl(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Picks the reader for `path`: directories and JSON Lines files are read as
/// exports, anything else is opened as a kpub database.
pub fn open_source(path: &Path) -> TableResult<Box<dyn PublicationSource>> {
    if path.is_dir() || is_jsonl(path) {
        Ok(Box::new(JsonlSource::open(path)?))
    } else {
        Ok(Box::new(KpubDatabase::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn mission_names_parse_case_insensitively() {
        assert_eq!("K2".parse::<Mission>().unwrap(), Mission::K2);
        assert_eq!(" kepler ".parse::<Mission>().unwrap(), Mission::Kepler);
        assert!("tess".parse::<Mission>().is_err());
    }

    #[test]
    fn reads_plain_and_gzip_jsonl_filtered_by_mission() {
        let dir = tempdir().unwrap();
        let mut plain = File::create(dir.path().join("a.jsonl")).unwrap();
        writeln!(plain, r#"{{"bibcode":"2019A","mission":"k2","aff":["Yale University"]}}"#).unwrap();
        writeln!(plain, r#"{{"bibcode":"2019B","mission":"kepler","aff":["Rice University"]}}"#).unwrap();
        writeln!(plain, "not json").unwrap();

        let gz = File::create(dir.path().join("b.jsonl.gz")).unwrap();
        let mut encoder = GzEncoder::new(gz, Compression::default());
        writeln!(encoder, r#"{{"bibcode":"2020C","mission":"K2","aff":[]}}"#).unwrap();
        encoder.finish().unwrap();

        let source = open_source(dir.path()).unwrap();
        let k2 = source.publications(Mission::K2).unwrap();
        let bibcodes: Vec<_> = k2.iter().filter_map(|p| p.bibcode.clone()).collect();
        assert_eq!(bibcodes, vec!["2019A".to_string(), "2020C".to_string()]);
        assert_eq!(source.publications(Mission::Kepler).unwrap().len(), 1);
    }

    #[test]
    fn reads_kpub_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("kpub.db");
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE pubs (id UNIQUE, bibcode UNIQUE, year, month, date, mission, science, metrics);",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO pubs VALUES (?1, ?2, '2018', '2018-01', '2018-01-01', 'k2', 'exoplanets', ?3)",
            rusqlite::params![
                "1",
                "2018AJ....155..136M",
                r#"{"aff": ["Department of Astronomy, Columbia University, New York, NY"], "title": ["A"]}"#
            ],
        )
        .unwrap();
        drop(conn);

        let source = open_source(&db_path).unwrap();
        let pubs = source.publications(Mission::K2).unwrap();
        assert_eq!(pubs.len(), 1);
        assert_eq!(pubs[0].bibcode.as_deref(), Some("2018AJ....155..136M"));
        assert_eq!(pubs[0].aff.len(), 1);
        assert!(source.publications(Mission::Kepler).unwrap().is_empty());
    }

    #[test]
    fn missing_store_is_fatal() {
        assert!(matches!(
            open_source(Path::new("/nonexistent/kpub.db")),
            Err(TableError::FileNotFound(_))
        ));
    }
}
