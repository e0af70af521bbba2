//! Support for i18next-style JSON resources.
//!
//! Nested objects flatten to dotted keys, arrays of strings become ordered
//! lists, and `key_one`/`key_other` style suffix groups become quantity sets.
//! Numbers, booleans and nulls are carried as non-translatable units so they
//! survive a round trip untouched.

use std::{
    collections::HashSet,
    io::{BufRead, Write},
};

use serde_json::{Map, Value};

use crate::{
    error::Error,
    options::NonTranslatablePolicy,
    traits::{Parser, ResourceFormat},
    types::{Document, Metadata, Node, PluralCategory, TranslationUnit, UnitValue},
};

const RAW_KEY: &str = "json.raw";
const SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    pub language: String,
    pub root: Map<String, Value>,
}

impl Parser for Format {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        match serde_json::from_reader(reader)? {
            Value::Object(root) => Ok(Format {
                language: String::new(),
                root,
            }),
            other => Err(Error::InvalidResource(format!(
                "expected a JSON object at the top level, got `{other}`"
            ))),
        }
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        serde_json::to_writer_pretty(&mut writer, &self.root)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{SEPARATOR}{key}")
    }
}

/// Splits `base_category` if `base` is a known plural group.
fn plural_member<'a>(key: &'a str, bases: &HashSet<&str>) -> Option<(&'a str, PluralCategory)> {
    let (base, suffix) = key.rsplit_once('_')?;
    let category = suffix.parse::<PluralCategory>().ok()?;
    bases.contains(base).then_some((base, category))
}

fn flatten(prefix: &str, object: &Map<String, Value>, document: &mut Document) {
    // A group needs an `_other` form; `count_one` alone is an ordinary key.
    let bases: HashSet<&str> = object
        .iter()
        .filter(|(_, v)| v.is_string())
        .filter_map(|(k, _)| k.strip_suffix("_other"))
        .collect();
    let mut emitted = HashSet::new();

    for (key, value) in object {
        if let Some((base, _)) = plural_member(key, &bases)
            && value.is_string()
        {
            if emitted.insert(base) {
                let forms = object
                    .iter()
                    .filter_map(|(k, v)| {
                        let (b, category) = plural_member(k, &bases)?;
                        (b == base).then_some((category, v.as_str()?.to_string()))
                    })
                    .collect();
                document.push_unit(TranslationUnit::new(
                    join(prefix, base),
                    UnitValue::Quantities(forms),
                ));
            }
            continue;
        }

        let path = join(prefix, key);
        match value {
            Value::String(s) => document.push_unit(TranslationUnit::scalar(path, s.as_str())),
            Value::Object(child) => flatten(&path, child, document),
            Value::Array(items) if items.iter().all(Value::is_string) => {
                let items = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
                document.push_unit(TranslationUnit::new(path, UnitValue::List(items)));
            }
            other => document.push_unit(
                TranslationUnit::scalar(path, other.to_string())
                    .with_translatable(false)
                    .with_custom(RAW_KEY, other.to_string()),
            ),
        }
    }
}

impl From<Format> for Document {
    fn from(value: Format) -> Self {
        let mut document = Document {
            metadata: Metadata {
                language: value.language,
                ..Metadata::default()
            },
            nodes: Vec::new(),
        };
        flatten("", &value.root, &mut document);
        document
    }
}

fn insert(root: &mut Map<String, Value>, key: &str, value: Value) -> Result<(), Error> {
    let mut segments: Vec<&str> = key.split(SEPARATOR).collect();
    let last = segments.pop().unwrap_or_default();
    let mut current = root;
    for segment in segments {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(Error::DataMismatch(format!(
                    "`{key}`: `{segment}` is both a value and a parent key"
                )));
            }
        };
    }
    if matches!(current.get(last), Some(Value::Object(_))) {
        return Err(Error::DataMismatch(format!(
            "`{key}` is both a value and a parent key"
        )));
    }
    current.insert(last.to_string(), value);
    Ok(())
}

impl TryFrom<Document> for Format {
    type Error = Error;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        let mut root = Map::new();
        for node in value.nodes {
            let Node::Unit(unit) = node else {
                continue;
            };
            match unit.value {
                UnitValue::Scalar(text) => {
                    let json = match unit.custom.get(RAW_KEY) {
                        Some(raw) if !unit.translatable => serde_json::from_str(raw)?,
                        _ => Value::String(text),
                    };
                    insert(&mut root, &unit.key, json)?;
                }
                UnitValue::List(items) => {
                    let items = items.into_iter().map(Value::String).collect();
                    insert(&mut root, &unit.key, Value::Array(items))?;
                }
                UnitValue::Quantities(forms) => {
                    for (category, text) in forms {
                        insert(
                            &mut root,
                            &format!("{}_{category}", unit.key),
                            Value::String(text),
                        )?;
                    }
                }
                UnitValue::Block(_) => {
                    return Err(Error::DataMismatch(format!(
                        "`{}`: structured blocks cannot be written to JSON",
                        unit.key
                    )));
                }
            }
        }
        Ok(Format {
            language: value.metadata.language,
            root,
        })
    }
}

impl ResourceFormat for Format {
    const NON_TRANSLATABLE: NonTranslatablePolicy = NonTranslatablePolicy::Copy;
}
