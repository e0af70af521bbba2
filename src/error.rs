//! All error types for the langsync crate.
//!
//! These are returned from all fallible operations (parsing, serialization,
//! ledger persistence, file I/O). Synchronization and merging never fail.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown format `{0}`")]
    UnknownFormat(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("CSV parse error: {0}")]
    CsvParse(#[from] csv::Error),

    #[error("PO parse error at line {line}: {message}")]
    PoParse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on `{}`: {source}", path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid data: {0}")]
    DataMismatch(String),

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("malformed change ledger `{}`: {source}", path.display())]
    LedgerParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("change ledger `{}` has version {found}, newer than supported {supported}", path.display())]
    LedgerVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },
}

impl Error {
    /// Wraps an I/O error with the path it happened on.
    pub fn file_io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::FileIo {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a PO parse error for a 1-based line number.
    pub fn po_parse(line: usize, message: impl Into<String>) -> Self {
        Error::PoParse {
            line,
            message: message.into(),
        }
    }

    /// Returns the path the error relates to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::FileIo { path, .. }
            | Error::LedgerParse { path, .. }
            | Error::LedgerVersion { path, .. } => Some(path),
            _ => None,
        }
    }
}
