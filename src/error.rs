use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite Error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Input file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Missing '{column}' column in {path}")]
    MissingColumn { column: String, path: PathBuf },
    #[error("Invalid classification code '{value}' on line {line} of {path}")]
    InvalidCode {
        value: String,
        line: u64,
        path: PathBuf,
    },
    #[error("Alias cycle involving '{0}'")]
    AliasCycle(String),
    #[error("Unknown mission '{0}'")]
    UnknownMission(String),
}

pub type TableResult<T> = std::result::Result<T, TableError>;
