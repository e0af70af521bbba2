//! Support for Rails i18n YAML locale files.
//!
//! ```yaml
//! en:
//!   greeting: Hello
//!   inbox:
//!     one: "%{count} message"
//!     other: "%{count} messages"
//! ```
//!
//! The single top-level locale key becomes the document's `root_key`. Nested
//! mappings flatten to dotted keys, sequences of strings become ordered lists,
//! and mappings keyed only by plural categories become quantity sets.

use std::io::{BufRead, Read, Write};

use serde_yaml::{Mapping, Value};
use unic_langid::LanguageIdentifier;

use crate::{
    error::Error,
    options::NonTranslatablePolicy,
    traits::{Parser, ResourceFormat},
    types::{Document, Metadata, Node, PluralCategory, TranslationUnit, UnitValue},
};

const RAW_KEY: &str = "yaml.raw";
const SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Format {
    /// Top-level locale key, when the file has one.
    pub root_key: Option<String>,
    pub content: Mapping,
}

impl Parser for Format {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let value: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(&text)?
        };
        let mapping = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => Mapping::new(),
            other => {
                return Err(Error::InvalidResource(format!(
                    "expected a YAML mapping at the top level, got {other:?}"
                )));
            }
        };

        if mapping.len() == 1
            && let Some((Value::String(key), Value::Mapping(inner))) = mapping.iter().next()
            && is_locale_key(key)
        {
            return Ok(Format {
                root_key: Some(key.clone()),
                content: inner.clone(),
            });
        }
        Ok(Format {
            root_key: None,
            content: mapping,
        })
    }

    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        let value = match &self.root_key {
            Some(root) => {
                let mut wrapper = Mapping::new();
                wrapper.insert(
                    Value::String(root.clone()),
                    Value::Mapping(self.content.clone()),
                );
                Value::Mapping(wrapper)
            }
            None => Value::Mapping(self.content.clone()),
        };
        serde_yaml::to_writer(writer, &value)?;
        Ok(())
    }
}

/// `en`, `pt-BR`, `zh_Hant`; not `title`, which is a valid but unlikely
/// five-letter language subtag.
fn is_locale_key(key: &str) -> bool {
    let language = key.split(['-', '_']).next().unwrap_or_default();
    (2..=3).contains(&language.len())
        && key.replace('_', "-").parse::<LanguageIdentifier>().is_ok()
}

fn key_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn as_quantities(mapping: &Mapping) -> Option<Vec<(PluralCategory, String)>> {
    let forms = mapping
        .iter()
        .map(|(k, v)| {
            let category = k.as_str()?.parse::<PluralCategory>().ok()?;
            Some((category, v.as_str()?.to_string()))
        })
        .collect::<Option<Vec<_>>>()?;
    forms
        .iter()
        .any(|(c, _)| *c == PluralCategory::Other)
        .then_some(forms)
}

fn flatten(prefix: &str, mapping: &Mapping, document: &mut Document) {
    for (key, value) in mapping {
        let key = key_string(key);
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}{SEPARATOR}{key}")
        };
        match value {
            Value::String(s) => document.push_unit(TranslationUnit::scalar(path, s.as_str())),
            Value::Mapping(child) => match as_quantities(child) {
                Some(forms) => {
                    document.push_unit(TranslationUnit::new(path, UnitValue::Quantities(forms)))
                }
                None => flatten(&path, child, document),
            },
            Value::Sequence(items) if items.iter().all(Value::is_string) => {
                let items = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
                document.push_unit(TranslationUnit::new(path, UnitValue::List(items)));
            }
            other => {
                let raw = serde_yaml::to_string(other).unwrap_or_default();
                document.push_unit(
                    TranslationUnit::scalar(path, raw.trim_end())
                        .with_translatable(false)
                        .with_custom(RAW_KEY, raw),
                );
            }
        }
    }
}

impl From<Format> for Document {
    fn from(value: Format) -> Self {
        let mut document = Document {
            metadata: Metadata {
                language: value.root_key.clone().unwrap_or_default(),
                root_key: value.root_key,
                ..Metadata::default()
            },
            nodes: Vec::new(),
        };
        flatten("", &value.content, &mut document);
        document
    }
}

fn insert(root: &mut Mapping, key: &str, value: Value) -> Result<(), Error> {
    let mut segments: Vec<&str> = key.split(SEPARATOR).collect();
    let last = segments.pop().unwrap_or_default();
    let mut current = root;
    for segment in segments {
        let entry = current
            .entry(Value::String(segment.to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        current = match entry {
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(Error::DataMismatch(format!(
                    "`{key}`: `{segment}` is both a value and a parent key"
                )));
            }
        };
    }
    current.insert(Value::String(last.to_string()), value);
    Ok(())
}

impl TryFrom<Document> for Format {
    type Error = Error;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        let mut content = Mapping::new();
        for node in value.nodes {
            let Node::Unit(unit) = node else {
                continue;
            };
            let yaml = match unit.value {
                UnitValue::Scalar(text) => match unit.custom.get(RAW_KEY) {
                    Some(raw) if !unit.translatable => serde_yaml::from_str(raw)?,
                    _ => Value::String(text),
                },
                UnitValue::List(items) => {
                    Value::Sequence(items.into_iter().map(Value::String).collect())
                }
                UnitValue::Quantities(forms) => Value::Mapping(
                    forms
                        .into_iter()
                        .map(|(category, text)| {
                            (Value::String(category.to_string()), Value::String(text))
                        })
                        .collect(),
                ),
                UnitValue::Block(_) => {
                    return Err(Error::DataMismatch(format!(
                        "`{}`: structured blocks cannot be written to YAML",
                        unit.key
                    )));
                }
            };
            insert(&mut content, &unit.key, yaml)?;
        }
        Ok(Format {
            root_key: value.metadata.root_key,
            content,
        })
    }
}

impl ResourceFormat for Format {
    const NON_TRANSLATABLE: NonTranslatablePolicy = NonTranslatablePolicy::Copy;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Catalog;

    const YAML: &str = r#"en:
  greeting: Hello
  inbox:
    one: "%{count} message"
    other: "%{count} messages"
  date:
    abbr_day_names:
      - Sun
      - Mon
    order: 3
  profile:
    title: ""
"#;

    #[test]
    fn test_root_key_detected() {
        let format = Format::from_str(YAML).unwrap();
        assert_eq!(format.root_key.as_deref(), Some("en"));

        let document = Document::from(format);
        assert_eq!(document.metadata.root_key.as_deref(), Some("en"));
        assert_eq!(document.metadata.language, "en");
    }

    #[test]
    fn test_keys_and_kinds() {
        let document = Format::parse(YAML.as_bytes()).unwrap();
        assert_eq!(
            document.keys(),
            vec!["greeting", "inbox", "date.abbr_day_names", "profile.title"]
        );
        assert_eq!(document.untranslated_keys(), vec!["profile.title"]);
        assert!(matches!(
            document.get("inbox"),
            Some(UnitValue::Quantities(forms)) if forms.len() == 2
        ));
        assert!(!document.find_unit("date.order").unwrap().translatable);
    }

    #[test]
    fn test_without_root_key() {
        let document = Format::parse(b"title: Hi\nbody: There\n").unwrap();
        assert_eq!(document.metadata.root_key, None);
        assert_eq!(document.keys(), vec!["title", "body"]);

        let nested = Format::from_str("title:\n  main: Hi\n").unwrap();
        assert_eq!(nested.root_key, None);
    }

    #[test]
    fn test_new_translation_file_renames_root() {
        let source = Format::parse(YAML.as_bytes()).unwrap();
        let target = Format::new_translation_file(&source, "de");
        let bytes = Format::marshal_target(&target).unwrap();
        let format = Format::from_bytes(&bytes).unwrap();

        assert_eq!(format.root_key.as_deref(), Some("de"));
        let document = Document::from(format);
        assert_eq!(
            document.untranslated_keys(),
            vec!["greeting", "inbox", "date.abbr_day_names", "profile.title"]
        );
        assert_eq!(
            document.find_unit("date.order").map(|u| u.value.to_string()),
            Some("3".to_string())
        );
    }

    #[test]
    fn test_round_trip() {
        let format = Format::from_str(YAML).unwrap();
        let back = Format::try_from(Document::from(format.clone())).unwrap();
        assert_eq!(back, format);
    }

    #[test]
    fn test_empty_file() {
        let document = Format::parse(b"").unwrap();
        assert!(document.nodes.is_empty());
    }
}
