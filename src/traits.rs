//! Traits for format-agnostic parsing, serialization and unit access.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Cursor, Write},
    path::Path,
};

use crate::{
    error::Error,
    options::{NonTranslatablePolicy, SyncOptions},
    sync,
    types::{Block, Document, Node, PluralCategory, Stats, TranslationUnit, UnitValue},
};

/// A trait for parsing and writing one localization file in its native shape.
///
/// # Example
///
/// ```rust,no_run
/// use langsync::traits::Parser;
/// let format = langsync::formats::po::PoFile::read_from("po/ru.po")?;
/// format.write_to("po/ru.copy.po")?;
/// Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait Parser {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error>
    where
        Self: Sized;

    /// Parse from file path. BOM-aware: UTF-16 files are decoded transparently.
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::file_io(path, e))?;
        let decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
            .encoding(Some(encoding_rs::UTF_8))
            .bom_override(true)
            .build(file);
        Self::from_reader(BufReader::new(decoder))
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error>;

    /// Write to file path, creating parent directories.
    fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::file_io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| Error::file_io(path, e))?;
        let mut writer = BufWriter::new(file);
        self.to_writer(&mut writer)?;
        writer.flush().map_err(|e| Error::file_io(path, e))
    }

    /// Parse from a string.
    fn from_str(s: &str) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(s))
    }

    /// Parse from bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(bytes))
    }
}

/// Read/write access to the translation units of a document.
///
/// Everything but node access is provided; the synchronizer and the ledger
/// helpers are written once against this trait.
pub trait Catalog {
    fn nodes(&self) -> &[Node];

    fn nodes_mut(&mut self) -> &mut Vec<Node>;

    /// Translatable units in document order.
    fn translatable_units(&self) -> Vec<&TranslationUnit> {
        self.nodes()
            .iter()
            .filter_map(Node::as_unit)
            .filter(|u| u.translatable)
            .collect()
    }

    /// Keys of translatable units, in document order.
    fn keys(&self) -> Vec<&str> {
        self.translatable_units()
            .into_iter()
            .map(|u| u.key.as_str())
            .collect()
    }

    /// Keys of translatable units whose value (or any member of it) is blank.
    fn untranslated_keys(&self) -> Vec<&str> {
        self.translatable_units()
            .into_iter()
            .filter(|u| u.is_untranslated())
            .map(|u| u.key.as_str())
            .collect()
    }

    /// Looks up a translatable unit's value.
    fn get(&self, key: &str) -> Option<&UnitValue> {
        self.nodes()
            .iter()
            .filter_map(Node::as_unit)
            .find(|u| u.translatable && u.key == key)
            .map(|u| &u.value)
    }

    /// Sets a scalar value. Returns `false` if the key is unknown, not
    /// translatable, or not a scalar.
    fn set(&mut self, key: &str, value: &str) -> bool {
        replace_value(self, key, UnitValue::Scalar(value.to_string()))
    }

    /// Sets the items of an ordered list; the length must match.
    fn set_items(&mut self, key: &str, items: Vec<String>) -> bool {
        replace_value(self, key, UnitValue::List(items))
    }

    /// Sets the forms of a quantity set; categories and their order must match.
    fn set_plurals(&mut self, key: &str, forms: Vec<(PluralCategory, String)>) -> bool {
        replace_value(self, key, UnitValue::Quantities(forms))
    }

    /// Sets the heading and body of a structured block.
    fn set_block(&mut self, key: &str, heading: &str, body: &str) -> bool {
        let Some(level) = self.get(key).and_then(|value| match value {
            UnitValue::Block(block) => Some(block.level),
            _ => None,
        }) else {
            return false;
        };
        replace_value(
            self,
            key,
            UnitValue::Block(Block {
                level,
                heading: heading.to_string(),
                body: body.to_string(),
            }),
        )
    }

    fn stats(&self) -> Stats {
        let units = self.translatable_units();
        let untranslated = units.iter().filter(|u| u.is_untranslated()).count();
        Stats {
            total: units.len(),
            translated: units.len() - untranslated,
            untranslated,
        }
    }
}

fn replace_value<C: Catalog + ?Sized>(catalog: &mut C, key: &str, value: UnitValue) -> bool {
    let unit = catalog
        .nodes_mut()
        .iter_mut()
        .filter_map(Node::as_unit_mut)
        .find(|u| u.translatable && u.key == key);
    match unit {
        Some(unit) if unit.value.same_shape(&value) => {
            unit.value = value;
            true
        }
        _ => false,
    }
}

impl Catalog for Document {
    fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.nodes
    }
}

/// The capability surface every format adapter exposes.
///
/// Adapters only supply their native model (`Parser` plus conversions to and
/// from [`Document`]) and their non-translatable policy.
pub trait ResourceFormat: Parser + Into<Document> + TryFrom<Document, Error = Error> {
    /// How target files treat non-translatable units.
    const NON_TRANSLATABLE: NonTranslatablePolicy;

    fn parse(bytes: &[u8]) -> Result<Document, Error>
    where
        Self: Sized,
    {
        Ok(Self::from_bytes(bytes)?.into())
    }

    /// Serializes a source document, non-translatable units included.
    fn marshal(document: &Document) -> Result<Vec<u8>, Error>
    where
        Self: Sized,
    {
        let format = Self::try_from(document.clone())?;
        let mut out = Vec::new();
        format.to_writer(&mut out)?;
        Ok(out)
    }

    /// Serializes a target document, applying the non-translatable policy.
    fn marshal_target(document: &Document) -> Result<Vec<u8>, Error>
    where
        Self: Sized,
    {
        match Self::NON_TRANSLATABLE {
            NonTranslatablePolicy::Copy => Self::marshal(document),
            NonTranslatablePolicy::Omit => Self::marshal(&document.without_non_translatable()),
        }
    }

    fn new_translation_file(source: &Document, language: &str) -> Document
    where
        Self: Sized,
    {
        let options = SyncOptions::new()
            .with_target_language(Some(language.to_string()))
            .with_non_translatable(Self::NON_TRANSLATABLE);
        sync::new_translation_file(source, &options)
    }

    fn sync_keys(source: &Document, target: &mut Document) -> usize
    where
        Self: Sized,
    {
        sync::sync_keys(source, target)
    }
}
