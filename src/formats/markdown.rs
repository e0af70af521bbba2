//! Support for Markdown documents.
//!
//! An optional `---` front matter block contributes `fm:<field>` scalar units.
//! The body is split at ATX headings into structured blocks keyed `sec:<n>`,
//! numbered from 1 in document order. Fenced code blocks stay inside their
//! section; headings inside them are ignored. Text before the first heading
//! is carried verbatim.

use std::io::{BufRead, Read, Write};

use lazy_static::lazy_static;
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::{
    error::Error,
    options::NonTranslatablePolicy,
    traits::{Parser, ResourceFormat},
    types::{Block, Document, Node, TranslationUnit, UnitValue},
};

lazy_static! {
    static ref HEADING_REGEX: Regex = Regex::new(r"^(#{1,6})(?:[ \t]+(.*?))?[ \t]*$").unwrap();
    static ref FENCE_REGEX: Regex = Regex::new(r"^[ ]{0,3}(```|~~~)").unwrap();
}

pub const FRONT_MATTER_PREFIX: &str = "fm:";
pub const SECTION_PREFIX: &str = "sec:";
const RAW_KEY: &str = "markdown.raw";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Format {
    pub front_matter: Mapping,
    /// Text before the first heading.
    pub preamble: String,
    pub sections: Vec<Block>,
}

/// The text between the leading and trailing blank lines.
fn trim_blank_lines(lines: &[&str]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n"),
        _ => String::new(),
    }
}

fn split_front_matter(text: &str) -> Result<(Mapping, &str), Error> {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return Ok((Mapping::new(), text));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let mapping = if yaml.trim().is_empty() {
                Mapping::new()
            } else {
                match serde_yaml::from_str(yaml)? {
                    Value::Mapping(mapping) => mapping,
                    _ => {
                        return Err(Error::InvalidResource(
                            "front matter is not a mapping".to_string(),
                        ));
                    }
                }
            };
            return Ok((mapping, &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(Error::InvalidResource(
        "unterminated front matter".to_string(),
    ))
}

struct Section<'a> {
    level: u8,
    heading: &'a str,
    lines: Vec<&'a str>,
}

impl Parser for Format {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let (front_matter, body) = split_front_matter(&text)?;

        let mut preamble = Vec::new();
        let mut sections: Vec<Section> = Vec::new();
        let mut fence: Option<&str> = None;

        for line in body.lines() {
            let is_heading = fence.is_none() && HEADING_REGEX.is_match(line);
            if let Some(marker) = fence {
                if line.trim_start().starts_with(marker) {
                    fence = None;
                }
            } else if let Some(captures) = FENCE_REGEX.captures(line) {
                fence = captures.get(1).map(|m| m.as_str());
            } else if is_heading && let Some(captures) = HEADING_REGEX.captures(line) {
                sections.push(Section {
                    level: captures.get(1).map_or(1, |m| m.as_str().len() as u8),
                    heading: captures.get(2).map_or("", |m| m.as_str()),
                    lines: Vec::new(),
                });
                continue;
            }

            match sections.last_mut() {
                Some(section) => section.lines.push(line),
                None => preamble.push(line),
            }
        }

        if fence.is_some() {
            log::warn!("markdown document ends inside a fenced code block");
        }

        Ok(Format {
            front_matter,
            preamble: trim_blank_lines(&preamble),
            sections: sections
                .into_iter()
                .map(|section| Block {
                    level: section.level,
                    heading: section.heading.to_string(),
                    body: trim_blank_lines(&section.lines),
                })
                .collect(),
        })
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut out = String::new();
        if !self.front_matter.is_empty() {
            out.push_str("---\n");
            out.push_str(&serde_yaml::to_string(&self.front_matter)?);
            out.push_str("---\n");
        }

        let mut blocks = Vec::with_capacity(self.sections.len() + 1);
        if !self.preamble.is_empty() {
            blocks.push(self.preamble.clone());
        }
        for section in &self.sections {
            let mut block = "#".repeat(section.level.clamp(1, 6) as usize);
            if !section.heading.is_empty() {
                block.push(' ');
                block.push_str(&section.heading);
            }
            if !section.body.is_empty() {
                block.push_str("\n\n");
                block.push_str(&section.body);
            }
            blocks.push(block);
        }

        if !blocks.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&blocks.join("\n\n"));
            out.push('\n');
        }
        writer.write_all(out.as_bytes())?;
        Ok(())
    }
}

impl From<Format> for Document {
    fn from(value: Format) -> Self {
        let mut document = Document::default();
        for (key, field) in &value.front_matter {
            let key = format!(
                "{FRONT_MATTER_PREFIX}{}",
                key.as_str().unwrap_or_default()
            );
            match field {
                Value::String(text) => {
                    document.push_unit(TranslationUnit::scalar(key, text.as_str()))
                }
                other => {
                    let raw = serde_yaml::to_string(other).unwrap_or_default();
                    document.push_unit(
                        TranslationUnit::scalar(key, raw.trim_end())
                            .with_translatable(false)
                            .with_custom(RAW_KEY, raw),
                    );
                }
            }
        }
        if !value.preamble.is_empty() {
            document.push_verbatim(value.preamble);
        }
        for (index, block) in value.sections.into_iter().enumerate() {
            document.push_unit(TranslationUnit::new(
                format!("{SECTION_PREFIX}{}", index + 1),
                UnitValue::Block(block),
            ));
        }
        document
    }
}

impl TryFrom<Document> for Format {
    type Error = Error;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        let mut format = Format::default();
        let mut preamble = Vec::new();
        for node in value.nodes {
            let unit = match node {
                Node::Unit(unit) => unit,
                Node::Verbatim(text) => {
                    preamble.push(text);
                    continue;
                }
                Node::Comment(_) => continue,
            };
            match unit.value {
                UnitValue::Block(block) => format.sections.push(block),
                UnitValue::Scalar(text) if unit.key.starts_with(FRONT_MATTER_PREFIX) => {
                    let field = unit.key[FRONT_MATTER_PREFIX.len()..].to_string();
                    let yaml = match unit.custom.get(RAW_KEY) {
                        Some(raw) if !unit.translatable => serde_yaml::from_str(raw)?,
                        _ => Value::String(text),
                    };
                    format.front_matter.insert(Value::String(field), yaml);
                }
                other => {
                    return Err(Error::DataMismatch(format!(
                        "`{}`: markdown holds front matter scalars and sections, got {:?}",
                        unit.key,
                        other.kind()
                    )));
                }
            }
        }
        format.preamble = preamble.join("\n\n");
        Ok(format)
    }
}

impl ResourceFormat for Format {
    const NON_TRANSLATABLE: NonTranslatablePolicy = NonTranslatablePolicy::Copy;
}
