//! All supported localization file formats for langsync.
//!
//! This module re-exports the main types for each format and provides
//! the [`FormatType`] enum for generic format handling across the crate.

pub mod android_strings;
pub mod csv;
pub mod json;
pub mod markdown;
pub mod po;
pub mod yaml;

use std::{
    fmt::{Display, Formatter},
    path::Path,
    str::FromStr,
};

// Reexporting the formats for easier access
pub use android_strings::Format as AndroidStringsFormat;
pub use csv::CSVRecord;
pub use json::Format as JsonFormat;
pub use markdown::Format as MarkdownFormat;
pub use po::PoFile;
pub use yaml::Format as YamlFormat;

use crate::Error;

/// Represents all supported localization file formats for generic handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatType {
    /// Android `strings.xml` format, with optional language code.
    AndroidStrings(Option<String>),
    /// Two-column CSV, with optional language code.
    CSV(Option<String>),
    /// i18next JSON, with optional language code.
    Json(Option<String>),
    /// Rails i18n YAML, with optional language code.
    Yaml(Option<String>),
    /// Markdown document, with optional language code.
    Markdown(Option<String>),
    /// gettext PO catalog, with optional language code.
    Po(Option<String>),
    /// gettext POT template (no language code).
    Pot,
}

/// Implements [`std::fmt::Display`] for [`FormatType`].
///
/// # Example
/// ```rust
/// use langsync::formats::FormatType;
/// assert_eq!(FormatType::AndroidStrings(None).to_string(), "android");
/// assert_eq!(FormatType::Po(None).to_string(), "po");
/// assert_eq!(FormatType::Pot.to_string(), "pot");
/// ```
impl Display for FormatType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatType::AndroidStrings(_) => write!(f, "android"),
            FormatType::CSV(_) => write!(f, "csv"),
            FormatType::Json(_) => write!(f, "json"),
            FormatType::Yaml(_) => write!(f, "yaml"),
            FormatType::Markdown(_) => write!(f, "markdown"),
            FormatType::Po(_) => write!(f, "po"),
            FormatType::Pot => write!(f, "pot"),
        }
    }
}

/// Accepts format names and their usual aliases, case-insensitively.
///
/// # Example
/// ```rust
/// use langsync::formats::FormatType;
/// use std::str::FromStr;
/// assert_eq!(FormatType::from_str("xml").unwrap(), FormatType::AndroidStrings(None));
/// assert_eq!(FormatType::from_str("YML").unwrap(), FormatType::Yaml(None));
/// assert!(FormatType::from_str("foobar").is_err());
/// ```
impl FromStr for FormatType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "android" | "androidstrings" | "xml" => Ok(FormatType::AndroidStrings(None)),
            "csv" => Ok(FormatType::CSV(None)),
            "json" | "i18next" => Ok(FormatType::Json(None)),
            "yaml" | "yml" | "rails" => Ok(FormatType::Yaml(None)),
            "markdown" | "md" => Ok(FormatType::Markdown(None)),
            "po" | "gettext" => Ok(FormatType::Po(None)),
            "pot" => Ok(FormatType::Pot),
            other => Err(Error::UnknownFormat(other.to_string())),
        }
    }
}

impl FormatType {
    /// Returns the typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatType::AndroidStrings(_) => "xml",
            FormatType::CSV(_) => "csv",
            FormatType::Json(_) => "json",
            FormatType::Yaml(_) => "yml",
            FormatType::Markdown(_) => "md",
            FormatType::Po(_) => "po",
            FormatType::Pot => "pot",
        }
    }

    /// Infers the format from a file's extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| Error::UnknownFormat(path.display().to_string()))?;
        match extension.to_ascii_lowercase().as_str() {
            "yaml" => Ok(FormatType::Yaml(None)),
            "markdown" => Ok(FormatType::Markdown(None)),
            ext => ext.parse(),
        }
    }

    /// Returns the language code for this format, if available.
    pub fn language(&self) -> Option<&String> {
        match self {
            FormatType::AndroidStrings(lang)
            | FormatType::CSV(lang)
            | FormatType::Json(lang)
            | FormatType::Yaml(lang)
            | FormatType::Markdown(lang)
            | FormatType::Po(lang) => lang.as_ref(),
            FormatType::Pot => None,
        }
    }

    /// Recreates the format type with a new language code, if applicable.
    pub fn with_language(&self, lang: Option<String>) -> Self {
        match self {
            FormatType::AndroidStrings(_) => FormatType::AndroidStrings(lang),
            FormatType::CSV(_) => FormatType::CSV(lang),
            FormatType::Json(_) => FormatType::Json(lang),
            FormatType::Yaml(_) => FormatType::Yaml(lang),
            FormatType::Markdown(_) => FormatType::Markdown(lang),
            FormatType::Po(_) => FormatType::Po(lang),
            FormatType::Pot => FormatType::Pot,
        }
    }

    /// Whether files of this format are source templates rather than
    /// translations.
    pub fn is_template(&self) -> bool {
        matches!(self, FormatType::Pot)
    }
}
