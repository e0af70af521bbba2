//! Support for two-column `key,value` CSV files.
//!
//! Only scalar units can be represented; other unit kinds are rejected on
//! conversion.
use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    options::NonTranslatablePolicy,
    traits::{Parser, ResourceFormat},
    types::{Document, Node, TranslationUnit, UnitValue},
};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CSVRecord {
    pub key: String,
    pub value: String,
}

/// A CSV file is just its rows.
pub type Format = Vec<CSVRecord>;

impl Parser for Vec<CSVRecord> {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut records = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let key = record.get(0).unwrap_or_default().to_string();
            if key.is_empty() {
                continue;
            }
            records.push(CSVRecord {
                key,
                value: record.get(1).unwrap_or_default().to_string(),
            });
        }
        Ok(records)
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: std::io::Write>(&self, writer: W) -> Result<(), Error> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        for record in self {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl From<Vec<CSVRecord>> for Document {
    fn from(value: Vec<CSVRecord>) -> Self {
        let mut document = Document::default();
        for record in value {
            document.push_unit(TranslationUnit::scalar(record.key, record.value));
        }
        document
    }
}

impl TryFrom<Document> for Vec<CSVRecord> {
    type Error = Error;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        value
            .nodes
            .into_iter()
            .filter_map(|node| match node {
                Node::Unit(unit) => Some(unit),
                _ => None,
            })
            .map(|unit| match unit.value {
                UnitValue::Scalar(value) => Ok(CSVRecord {
                    key: unit.key,
                    value,
                }),
                other => Err(Error::DataMismatch(format!(
                    "`{}`: CSV only holds scalar values, got {:?}",
                    unit.key,
                    other.kind()
                ))),
            })
            .collect()
    }
}

impl ResourceFormat for Vec<CSVRecord> {
    const NON_TRANSLATABLE: NonTranslatablePolicy = NonTranslatablePolicy::Copy;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Catalog, Parser};
    use std::io::Cursor;

    #[test]
    fn test_parse_simple_csv() {
        let csv_content = "hello,Hello\nbye,Goodbye\n";
        let records = Vec::<CSVRecord>::from_reader(Cursor::new(csv_content)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "hello");
        assert_eq!(records[0].value, "Hello");
        assert_eq!(records[1].key, "bye");
        assert_eq!(records[1].value, "Goodbye");
    }

    #[test]
    fn test_round_trip_csv_document_csv() {
        let csv_content = "hello,Hello\nbye,\"Good, bye\"\n";
        let records = Vec::<CSVRecord>::from_reader(Cursor::new(csv_content)).unwrap();
        let document = Document::from(records.clone());
        let serialized: Vec<CSVRecord> = TryFrom::try_from(document).unwrap();
        assert_eq!(records, serialized);
    }

    #[test]
    fn test_csv_row_with_empty_value() {
        let csv_content = "empty,\nhello,Hello\nlonely\n";
        let document = Format::parse(csv_content.as_bytes()).unwrap();
        assert_eq!(document.keys(), vec!["empty", "hello", "lonely"]);
        assert_eq!(document.untranslated_keys(), vec!["empty", "lonely"]);
    }

    #[test]
    fn test_non_scalar_rejected() {
        let mut document = Document::new("en");
        document.push_unit(TranslationUnit::new(
            "days",
            UnitValue::List(vec!["Mon".to_string()]),
        ));
        assert!(matches!(
            Format::marshal(&document),
            Err(Error::DataMismatch(_))
        ));
    }
}
