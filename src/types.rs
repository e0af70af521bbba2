//! Core, format-agnostic types for langsync.
//! Parsers decode into these; encoders serialize these; the synchronizer and
//! the change ledger only ever look at these.

use std::{collections::HashMap, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::{error::Error, traits::Parser};

impl Parser for Vec<Document> {
    /// Parse from any reader.
    fn from_reader<R: std::io::BufRead>(reader: R) -> Result<Self, Error> {
        serde_json::from_reader(reader).map_err(Error::Parse)
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: std::io::Write>(&self, mut writer: W) -> Result<(), Error> {
        serde_json::to_writer(&mut writer, self).map_err(Error::Parse)
    }
}

/// A complete parsed translation file (a `strings.xml`, a `.po`, a Rails
/// locale file, ...) for a single language.
///
/// Translation units and purely structural elements are kept together in
/// source order, so adapters can write the file back faithfully.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Document {
    /// Header-level metadata (language code, root locale key, etc.).
    pub metadata: Metadata,

    /// Ordered list of all nodes in this document.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn new(language: impl Into<String>) -> Self {
        Document {
            metadata: Metadata {
                language: language.into(),
                ..Metadata::default()
            },
            nodes: Vec::new(),
        }
    }

    pub fn push_unit(&mut self, unit: TranslationUnit) {
        self.nodes.push(Node::Unit(unit));
    }

    pub fn push_comment(&mut self, comment: impl Into<String>) {
        self.nodes.push(Node::Comment(comment.into()));
    }

    pub fn push_verbatim(&mut self, text: impl Into<String>) {
        self.nodes.push(Node::Verbatim(text.into()));
    }

    /// All units, translatable or not, in document order.
    pub fn units(&self) -> impl Iterator<Item = &TranslationUnit> {
        self.nodes.iter().filter_map(Node::as_unit)
    }

    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut TranslationUnit> {
        self.nodes.iter_mut().filter_map(Node::as_unit_mut)
    }

    pub fn find_unit(&self, key: &str) -> Option<&TranslationUnit> {
        self.units().find(|u| u.key == key)
    }

    pub fn find_unit_mut(&mut self, key: &str) -> Option<&mut TranslationUnit> {
        self.units_mut().find(|u| u.key == key)
    }

    /// Returns a copy without the non-translatable units.
    pub fn without_non_translatable(&self) -> Document {
        Document {
            metadata: self.metadata.clone(),
            nodes: self
                .nodes
                .iter()
                .filter(|node| node.as_unit().is_none_or(|u| u.translatable))
                .cloned()
                .collect(),
        }
    }

    pub fn parse_language_identifier(&self) -> Option<LanguageIdentifier> {
        self.metadata.language.parse().ok()
    }

    /// Check if this document has a specific language.
    pub fn has_language(&self, lang: &str) -> bool {
        match (
            self.parse_language_identifier(),
            lang.parse::<LanguageIdentifier>(),
        ) {
            (Some(lang_id), Ok(target_lang)) => lang_id.language == target_lang.language,
            _ => false,
        }
    }
}

/// Free-form metadata for the document as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Metadata {
    /// The language code (e.g. "en", "fr", "pt-BR").
    pub language: String,

    /// Top-level locale key all content lives under (Rails i18n style YAML).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub root_key: Option<String>,

    /// Any other metadata fields not covered by the above.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    #[serde(default)]
    pub custom: HashMap<String, String>,
}

impl Display for Metadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map_all = self.custom.clone();
        map_all.insert("language".to_string(), self.language.clone());
        if let Some(root_key) = &self.root_key {
            map_all.insert("root_key".to_string(), root_key.clone());
        }
        let mut pairs = map_all
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>();
        pairs.sort();
        write!(f, "Metadata {{ {} }}", pairs.join(", "))
    }
}

/// One element of a document, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Unit(TranslationUnit),
    /// A comment the adapter wants to write back where it was found.
    Comment(String),
    /// Raw text the adapter round-trips without interpretation.
    Verbatim(String),
}

impl Node {
    pub fn as_unit(&self) -> Option<&TranslationUnit> {
        match self {
            Node::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn as_unit_mut(&mut self) -> Option<&mut TranslationUnit> {
        match self {
            Node::Unit(unit) => Some(unit),
            _ => None,
        }
    }
}

/// A single translatable (or explicitly non-translatable) item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TranslationUnit {
    /// Identifier, unique within its document. Shape depends on the format:
    /// dotted path, `sec:N`, `fm:title`, `msgctxt|msgid`, ...
    pub key: String,

    /// Current content; its variant is the unit's kind.
    pub value: UnitValue,

    /// Non-translatable units are carried through untouched.
    #[serde(default = "default_translatable")]
    pub translatable: bool,

    /// Optional comment for translators.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub comment: Option<String>,

    /// Format-specific data needed to write the unit back (nesting path,
    /// gettext flags, formatting hints). Never interpreted by the core.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    #[serde(default)]
    pub custom: HashMap<String, String>,
}

fn default_translatable() -> bool {
    true
}

impl TranslationUnit {
    pub fn new(key: impl Into<String>, value: UnitValue) -> Self {
        TranslationUnit {
            key: key.into(),
            value,
            translatable: true,
            comment: None,
            custom: HashMap::new(),
        }
    }

    pub fn scalar(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, UnitValue::Scalar(value.into()))
    }

    pub fn with_translatable(mut self, translatable: bool) -> Self {
        self.translatable = translatable;
        self
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> UnitKind {
        self.value.kind()
    }

    pub fn is_untranslated(&self) -> bool {
        self.value.is_untranslated()
    }

    /// A copy of this unit with the same kind and shape but no content.
    pub fn cleared(&self) -> TranslationUnit {
        TranslationUnit {
            value: self.value.cleared(),
            ..self.clone()
        }
    }
}

impl Display for TranslationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TranslationUnit {{ key: {}, kind: {:?}, value: {} }}",
            self.key,
            self.kind(),
            self.value
        )
    }
}

/// The kind of a unit, derived from its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Scalar,
    OrderedList,
    QuantitySet,
    StructuredBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitValue {
    /// A single string.
    Scalar(String),

    /// An ordered list of strings (Android `<string-array>`, YAML sequence).
    List(Vec<String>),

    /// Plural forms keyed by quantity, in display order.
    Quantities(Vec<(PluralCategory, String)>),

    /// A heading plus body, e.g. a markdown section.
    Block(Block),
}

impl UnitValue {
    pub fn kind(&self) -> UnitKind {
        match self {
            UnitValue::Scalar(_) => UnitKind::Scalar,
            UnitValue::List(_) => UnitKind::OrderedList,
            UnitValue::Quantities(_) => UnitKind::QuantitySet,
            UnitValue::Block(_) => UnitKind::StructuredBlock,
        }
    }

    /// Blank means untranslated. For lists and quantity sets a single blank
    /// member is enough; a block counts by its body alone.
    pub fn is_untranslated(&self) -> bool {
        match self {
            UnitValue::Scalar(value) => is_blank(value),
            UnitValue::List(items) => items.is_empty() || items.iter().any(|i| is_blank(i)),
            UnitValue::Quantities(forms) => {
                forms.is_empty() || forms.iter().any(|(_, v)| is_blank(v))
            }
            UnitValue::Block(block) => is_blank(&block.body),
        }
    }

    /// Same kind and shape, no content.
    pub fn cleared(&self) -> UnitValue {
        match self {
            UnitValue::Scalar(_) => UnitValue::Scalar(String::new()),
            UnitValue::List(items) => UnitValue::List(vec![String::new(); items.len()]),
            UnitValue::Quantities(forms) => UnitValue::Quantities(
                forms
                    .iter()
                    .map(|(category, _)| (*category, String::new()))
                    .collect(),
            ),
            UnitValue::Block(block) => UnitValue::Block(Block {
                level: block.level,
                heading: String::new(),
                body: String::new(),
            }),
        }
    }

    /// Kind, list length, quantity categories and heading level all match.
    pub fn same_shape(&self, other: &UnitValue) -> bool {
        match (self, other) {
            (UnitValue::Scalar(_), UnitValue::Scalar(_)) => true,
            (UnitValue::List(a), UnitValue::List(b)) => a.len() == b.len(),
            (UnitValue::Quantities(a), UnitValue::Quantities(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|((ca, _), (cb, _))| ca == cb)
            }
            (UnitValue::Block(a), UnitValue::Block(b)) => a.level == b.level,
            _ => false,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            UnitValue::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

impl Display for UnitValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitValue::Scalar(value) => write!(f, "{}", value),
            UnitValue::List(items) => write!(f, "[{}]", items.join(", ")),
            UnitValue::Quantities(forms) => write!(
                f,
                "{{{}}}",
                forms
                    .iter()
                    .map(|(c, v)| format!("{}: {}", c, v))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            UnitValue::Block(block) => write!(f, "{}", block.heading),
        }
    }
}

/// Heading plus body text of a structured section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Block {
    /// Heading depth; 0 for text before the first heading.
    pub level: u8,
    pub heading: String,
    pub body: String,
}

/// Standard CLDR plural forms.
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Clone, Copy, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub const ALL: [PluralCategory; 6] = [
        PluralCategory::Zero,
        PluralCategory::One,
        PluralCategory::Two,
        PluralCategory::Few,
        PluralCategory::Many,
        PluralCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }
}

impl Display for PluralCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluralCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ZERO" => Ok(PluralCategory::Zero),
            "ONE" => Ok(PluralCategory::One),
            "TWO" => Ok(PluralCategory::Two),
            "FEW" => Ok(PluralCategory::Few),
            "MANY" => Ok(PluralCategory::Many),
            "OTHER" => Ok(PluralCategory::Other),
            _ => Err(format!("Unknown plural category: {}", s)),
        }
    }
}

/// Translation counts over translatable units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total: usize,
    pub translated: usize,
    pub untranslated: usize,
}

impl Stats {
    /// Percentage of translated units, 100 for an empty document.
    pub fn percent_translated(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.translated as f64 * 100.0 / self.total as f64
        }
    }
}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
