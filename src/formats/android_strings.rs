//! Support for Android `strings.xml` resources.
//!
//! Handles `<string>`, `<string-array>` and `<plurals>` elements, the
//! `translatable="false"` attribute, and XML comments between resources.
//! Target files omit non-translatable resources; Android falls back to the
//! default `values/` file for them.

use quick_xml::{
    Reader, Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use std::{
    io::{BufRead, Write},
    str::FromStr,
};

use crate::{
    error::Error,
    options::NonTranslatablePolicy,
    traits::{Parser, ResourceFormat},
    types::{Document, Metadata, Node, PluralCategory, TranslationUnit, UnitValue},
};

const INDENT: &str = "\n    ";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    pub language: String,
    pub items: Vec<Item>,
}

/// One child of `<resources>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    String(StringResource),
    Array(StringArray),
    Plurals(PluralsResource),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringResource {
    pub name: String,
    pub value: String,
    pub translatable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringArray {
    pub name: String,
    pub items: Vec<String>,
    pub translatable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluralsResource {
    pub name: String,
    pub items: Vec<(PluralCategory, String)>,
    pub translatable: Option<bool>,
}

impl Parser for Format {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut items = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => match e.name().as_ref() {
                    b"string" => {
                        let (name, translatable) = parse_attributes(e)?;
                        let value = read_text(&mut xml_reader, b"string")?;
                        items.push(Item::String(StringResource {
                            name,
                            value,
                            translatable,
                        }));
                    }
                    b"string-array" => {
                        let (name, translatable) = parse_attributes(e)?;
                        let values = read_children(&mut xml_reader, b"string-array")?;
                        items.push(Item::Array(StringArray {
                            name,
                            items: values.into_iter().map(|(_, v)| v).collect(),
                            translatable,
                        }));
                    }
                    b"plurals" => {
                        let (name, translatable) = parse_attributes(e)?;
                        let values = read_children(&mut xml_reader, b"plurals")?;
                        let items_by_quantity = values
                            .into_iter()
                            .map(|(quantity, value)| {
                                let quantity = quantity.ok_or_else(|| {
                                    Error::InvalidResource(format!(
                                        "plurals `{name}` has an item without quantity"
                                    ))
                                })?;
                                let category = PluralCategory::from_str(&quantity)
                                    .map_err(Error::InvalidResource)?;
                                Ok((category, value))
                            })
                            .collect::<Result<Vec<_>, Error>>()?;
                        items.push(Item::Plurals(PluralsResource {
                            name,
                            items: items_by_quantity,
                            translatable,
                        }));
                    }
                    _ => {}
                },
                Ok(Event::Empty(ref e)) if e.name().as_ref() == b"string" => {
                    let (name, translatable) = parse_attributes(e)?;
                    items.push(Item::String(StringResource {
                        name,
                        value: String::new(),
                        translatable,
                    }));
                }
                Ok(Event::Comment(ref c)) => {
                    items.push(Item::Comment(
                        String::from_utf8_lossy(c).trim().to_string(),
                    ));
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(Error::XmlParse(e)),
            }
            buf.clear();
        }
        Ok(Format {
            language: String::new(), // strings.xml does not contain language metadata
            items,
        })
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut xml_writer = Writer::new(&mut writer);

        xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        xml_writer.write_event(Event::Text(BytesText::new("\n")))?;
        xml_writer.write_event(Event::Start(BytesStart::new("resources")))?;

        for item in &self.items {
            xml_writer.write_event(Event::Text(BytesText::new(INDENT)))?;
            match item {
                Item::String(sr) => {
                    xml_writer.write_event(Event::Start(element(
                        "string",
                        &sr.name,
                        sr.translatable,
                    )))?;
                    xml_writer.write_event(Event::Text(BytesText::new(&sr.value)))?;
                    xml_writer.write_event(Event::End(BytesEnd::new("string")))?;
                }
                Item::Array(array) => {
                    xml_writer.write_event(Event::Start(element(
                        "string-array",
                        &array.name,
                        array.translatable,
                    )))?;
                    for value in &array.items {
                        write_item(&mut xml_writer, BytesStart::new("item"), value)?;
                    }
                    xml_writer.write_event(Event::Text(BytesText::new(INDENT)))?;
                    xml_writer.write_event(Event::End(BytesEnd::new("string-array")))?;
                }
                Item::Plurals(plurals) => {
                    xml_writer.write_event(Event::Start(element(
                        "plurals",
                        &plurals.name,
                        plurals.translatable,
                    )))?;
                    for (quantity, value) in &plurals.items {
                        let mut item = BytesStart::new("item");
                        item.push_attribute(("quantity", quantity.as_str()));
                        write_item(&mut xml_writer, item, value)?;
                    }
                    xml_writer.write_event(Event::Text(BytesText::new(INDENT)))?;
                    xml_writer.write_event(Event::End(BytesEnd::new("plurals")))?;
                }
                Item::Comment(comment) => {
                    xml_writer.write_event(Event::Comment(BytesText::from_escaped(format!(
                        " {comment} "
                    ))))?;
                }
            }
        }

        xml_writer.write_event(Event::Text(BytesText::new("\n")))?;
        xml_writer.write_event(Event::End(BytesEnd::new("resources")))?;
        xml_writer.write_event(Event::Text(BytesText::new("\n")))?;
        Ok(())
    }
}

fn element<'a>(tag: &'a str, name: &'a str, translatable: Option<bool>) -> BytesStart<'a> {
    let mut elem = BytesStart::new(tag);
    elem.push_attribute(("name", name));
    if let Some(trans) = translatable {
        elem.push_attribute(("translatable", if trans { "true" } else { "false" }));
    }
    elem
}

fn write_item<W: Write>(
    xml_writer: &mut Writer<W>,
    item: BytesStart<'_>,
    value: &str,
) -> Result<(), Error> {
    xml_writer.write_event(Event::Text(BytesText::new("\n        ")))?;
    xml_writer.write_event(Event::Start(item))?;
    xml_writer.write_event(Event::Text(BytesText::new(value)))?;
    xml_writer.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

impl From<Format> for Document {
    fn from(value: Format) -> Self {
        let mut document = Document {
            metadata: Metadata {
                language: value.language,
                ..Metadata::default()
            },
            nodes: Vec::with_capacity(value.items.len()),
        };
        for item in value.items {
            let (name, unit_value, translatable) = match item {
                Item::Comment(comment) => {
                    document.push_comment(comment);
                    continue;
                }
                Item::String(sr) => (sr.name, UnitValue::Scalar(sr.value), sr.translatable),
                Item::Array(array) => {
                    (array.name, UnitValue::List(array.items), array.translatable)
                }
                Item::Plurals(plurals) => (
                    plurals.name,
                    UnitValue::Quantities(plurals.items),
                    plurals.translatable,
                ),
            };
            document.push_unit(
                TranslationUnit::new(name, unit_value)
                    .with_translatable(translatable.unwrap_or(true)),
            );
        }
        document
    }
}

impl TryFrom<Document> for Format {
    type Error = Error;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        let mut items = Vec::with_capacity(value.nodes.len());
        for node in value.nodes {
            let unit = match node {
                Node::Unit(unit) => unit,
                Node::Comment(comment) => {
                    items.push(Item::Comment(comment));
                    continue;
                }
                Node::Verbatim(_) => {
                    log::debug!("strings.xml has no verbatim blocks; skipping one");
                    continue;
                }
            };
            let translatable = (!unit.translatable).then_some(false);
            items.push(match unit.value {
                UnitValue::Scalar(value) => Item::String(StringResource {
                    name: unit.key,
                    value,
                    translatable,
                }),
                UnitValue::List(values) => Item::Array(StringArray {
                    name: unit.key,
                    items: values,
                    translatable,
                }),
                UnitValue::Quantities(forms) => Item::Plurals(PluralsResource {
                    name: unit.key,
                    items: forms,
                    translatable,
                }),
                UnitValue::Block(_) => {
                    return Err(Error::DataMismatch(format!(
                        "`{}`: structured blocks cannot be written to strings.xml",
                        unit.key
                    )));
                }
            });
        }
        Ok(Format {
            language: value.metadata.language,
            items,
        })
    }
}

impl ResourceFormat for Format {
    const NON_TRANSLATABLE: NonTranslatablePolicy = NonTranslatablePolicy::Omit;
}

fn parse_attributes(e: &BytesStart) -> Result<(String, Option<bool>), Error> {
    let mut name = None;
    let mut translatable = None;

    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::DataMismatch(e.to_string()))?;
        match attr.key.as_ref() {
            b"name" => name = Some(attr.unescape_value()?.to_string()),
            b"translatable" => {
                let v = attr.unescape_value()?.to_string();
                translatable = Some(v == "true");
            }
            _ => {}
        }
    }
    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let name = name.ok_or_else(|| Error::InvalidResource(format!("{tag} tag missing 'name'")))?;
    Ok((name, translatable))
}

/// Collects the text content up to the closing `end` tag, including text
/// inside nested markup such as `<b>` or `<xliff:g>`.
fn read_text<R: BufRead>(xml_reader: &mut Reader<R>, end: &[u8]) -> Result<String, Error> {
    let mut buf = Vec::new();
    let mut value = String::new();
    let mut depth = 0usize;
    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Text(e)) => value.push_str(&e.unescape().map_err(Error::XmlParse)?),
            Ok(Event::CData(e)) => value.push_str(&String::from_utf8_lossy(&e)),
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(e)) if depth == 0 && e.name().as_ref() == end => break,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => return Err(Error::InvalidResource("Unexpected EOF".to_string())),
            Ok(_) => (),
            Err(e) => return Err(Error::XmlParse(e)),
        }
        buf.clear();
    }
    Ok(value)
}

/// Reads `<item>` children up to the closing `end` tag, with their optional
/// `quantity` attribute.
fn read_children<R: BufRead>(
    xml_reader: &mut Reader<R>,
    end: &[u8],
) -> Result<Vec<(Option<String>, String)>, Error> {
    let mut buf = Vec::new();
    let mut children = Vec::new();
    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"item" => {
                let quantity = quantity_attribute(e)?;
                let value = read_text(xml_reader, b"item")?;
                children.push((quantity, value));
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"item" => {
                children.push((quantity_attribute(e)?, String::new()));
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == end => break,
            Ok(Event::Eof) => return Err(Error::InvalidResource("Unexpected EOF".to_string())),
            Ok(_) => (),
            Err(e) => return Err(Error::XmlParse(e)),
        }
        buf.clear();
    }
    Ok(children)
}

fn quantity_attribute(e: &BytesStart) -> Result<Option<String>, Error> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::DataMismatch(e.to_string()))?;
        if attr.key.as_ref() == b"quantity" {
            return Ok(Some(attr.unescape_value()?.to_string()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Catalog, Parser};

    const XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <!-- Main screen -->
    <string name="hello">Hello</string>
    <string name="app_name" translatable="false">Demo</string>
    <string name="empty"></string>
    <string-array name="days">
        <item>Mon</item>
        <item>Tue</item>
    </string-array>
    <plurals name="apples">
        <item quantity="one">One apple</item>
        <item quantity="other">%d apples</item>
    </plurals>
</resources>
"#;

    #[test]
    fn test_parse_all_resource_kinds() {
        let format = Format::from_str(XML).unwrap();
        assert_eq!(format.items.len(), 6);
        assert_eq!(format.items[0], Item::Comment("Main screen".to_string()));
        match &format.items[2] {
            Item::String(sr) => {
                assert_eq!(sr.name, "app_name");
                assert_eq!(sr.translatable, Some(false));
            }
            other => panic!("unexpected item {other:?}"),
        }
        match &format.items[4] {
            Item::Array(array) => assert_eq!(array.items, vec!["Mon", "Tue"]),
            other => panic!("unexpected item {other:?}"),
        }
        match &format.items[5] {
            Item::Plurals(plurals) => {
                assert_eq!(plurals.items[0].0, PluralCategory::One);
                assert_eq!(plurals.items[1].1, "%d apples");
            }
            other => panic!("unexpected item {other:?}"),
        }
    }

    #[test]
    fn test_nested_markup_text_is_kept() {
        let xml = r#"<resources><string name="bold"><b>OK</b></string><string name="next">Next</string></resources>"#;
        let format = Format::from_str(xml).unwrap();
        assert_eq!(format.items.len(), 2);
        match &format.items[0] {
            Item::String(sr) => assert_eq!(sr.value, "OK"),
            other => panic!("unexpected item {other:?}"),
        }
    }

    #[test]
    fn test_missing_name_attribute() {
        let xml = r#"
        <resources>
            <string>No name attr</string>
        </resources>
        "#;
        let result = Format::from_str(xml);
        assert!(result.is_err());
        let err = format!("{:?}", result.unwrap_err());
        assert!(err.contains("missing 'name'"));
    }

    #[test]
    fn test_unknown_quantity_is_an_error() {
        let xml = r#"<resources><plurals name="p"><item quantity="lots">x</item></plurals></resources>"#;
        assert!(Format::from_str(xml).is_err());
    }

    #[test]
    fn test_document_keys_skip_non_translatable() {
        let document = Format::parse(XML.as_bytes()).unwrap();
        assert_eq!(document.keys(), vec!["hello", "empty", "days", "apples"]);
        assert_eq!(document.untranslated_keys(), vec!["empty"]);
        assert!(matches!(document.nodes[0], Node::Comment(_)));
    }

    #[test]
    fn test_round_trip_serialization() {
        let format = Format::from_str(XML).unwrap();
        let mut out = Vec::new();
        format.to_writer(&mut out).unwrap();
        let out_str = String::from_utf8(out).unwrap();
        let reparsed = Format::from_str(&out_str).unwrap();
        assert_eq!(format, reparsed);
    }

    #[test]
    fn test_target_file_omits_non_translatable() {
        let source = Format::parse(XML.as_bytes()).unwrap();
        let target = Format::new_translation_file(&source, "de");
        let bytes = Format::marshal_target(&target).unwrap();
        let written = String::from_utf8(bytes).unwrap();
        assert!(!written.contains("app_name"));
        assert!(written.contains(r#"<string name="hello"></string>"#));
        assert!(written.contains(r#"<item quantity="other"></item>"#));

        let source_bytes = Format::marshal(&source).unwrap();
        assert!(String::from_utf8(source_bytes).unwrap().contains("app_name"));
    }
}
