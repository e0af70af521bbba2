//! Support for gettext PO/POT files.
//!
//! Parses and writes the full entry model (translator and extracted comments,
//! references, flags, previous msgids, contexts, plural forms, obsolete `#~`
//! entries) and converts to/from the [`Document`] model for key-level access.
//! Template merging lives in [`crate::msgmerge`].

use std::{
    collections::BTreeMap,
    io::{BufRead, Write},
};

use indoc::formatdoc;

use crate::{
    error::Error,
    options::NonTranslatablePolicy,
    traits::{Parser, ResourceFormat},
    types::{Document, Metadata, Node, TranslationUnit, UnitValue},
};

const MSGID_KEY: &str = "po.msgid";
const MSGCTXT_KEY: &str = "po.msgctxt";
const MSGID_PLURAL_KEY: &str = "po.msgid_plural";
const FLAGS_KEY: &str = "po.flags";
const REFERENCES_KEY: &str = "po.references";
const EXTRACTED_KEY: &str = "po.extracted";
const PREVIOUS_KEY: &str = "po.previous";
const HEADER_KEY: &str = "po.header";
const HEADER_COMMENTS_KEY: &str = "po.header_comments";
const HEADER_FLAGS_KEY: &str = "po.header_flags";

pub const FUZZY: &str = "fuzzy";

/// Separates `msgctxt` from `msgid` in unit keys.
pub const CONTEXT_SEPARATOR: char = '|';

/// A parsed PO or POT file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PoFile {
    pub header: PoHeader,
    pub entries: Vec<PoEntry>,
}

impl PoFile {
    /// Non-obsolete entries.
    pub fn active_entries(&self) -> impl Iterator<Item = &PoEntry> {
        self.entries.iter().filter(|e| !e.obsolete)
    }

    pub fn find(&self, msgctxt: Option<&str>, msgid: &str) -> Option<&PoEntry> {
        self.active_entries()
            .find(|e| e.msgid == msgid && e.msgctxt.as_deref() == msgctxt)
    }

    /// A header for a new translation file of a template.
    pub fn default_header(language: &str) -> PoHeader {
        let raw = formatdoc!(
            "
            Project-Id-Version: PACKAGE VERSION
            PO-Revision-Date: YEAR-MO-DA HO:MI+ZONE
            Last-Translator: FULL NAME <EMAIL@ADDRESS>
            Language-Team: LANGUAGE <LL@li.org>
            Language: {}
            MIME-Version: 1.0
            Content-Type: text/plain; charset=UTF-8
            Content-Transfer-Encoding: 8bit
            ",
            language
        );
        PoHeader::from_msgstr(&raw)
    }
}

/// The header entry (`msgid ""`): an ordered raw key/value block plus the
/// comments and flags attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PoHeader {
    pub comments: Vec<String>,
    pub flags: Vec<String>,
    pub fields: Vec<(String, String)>,
}

impl PoHeader {
    pub fn from_msgstr(msgstr: &str) -> Self {
        let fields = msgstr
            .lines()
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        PoHeader {
            fields,
            ..PoHeader::default()
        }
    }

    pub fn to_msgstr(&self) -> String {
        self.fields
            .iter()
            .map(|(name, value)| format!("{name}: {value}\n"))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty() && self.flags.is_empty() && self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replaces the field in place, or appends it.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .fields
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// `nplurals` from the `Plural-Forms` field.
    pub fn nplurals(&self) -> Option<usize> {
        let forms = self.get("Plural-Forms")?;
        forms
            .split(';')
            .filter_map(|part| part.trim().strip_prefix("nplurals="))
            .find_map(|n| n.trim().parse().ok())
    }
}

/// One PO entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PoEntry {
    pub msgctxt: Option<String>,
    pub msgid: String,
    pub msgid_plural: Option<String>,
    pub msgstr: PoMessage,
    /// `# ` comments, written by translators.
    pub translator_comments: Vec<String>,
    /// `#.` comments, written by the extraction tool.
    pub extracted_comments: Vec<String>,
    /// `#:` source references (`file:line`).
    pub references: Vec<String>,
    /// `#,` flags such as `fuzzy` or `c-format`.
    pub flags: Vec<String>,
    /// `#|` previous-msgid lines, kept verbatim.
    pub previous: Vec<String>,
    pub obsolete: bool,
}

/// Translated text of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoMessage {
    Singular(String),
    /// `msgstr[n]` by index.
    Plural(BTreeMap<usize, String>),
}

impl Default for PoMessage {
    fn default() -> Self {
        PoMessage::Singular(String::new())
    }
}

impl PoMessage {
    /// An empty plural message with `nplurals` forms.
    pub fn empty_plural(nplurals: usize) -> Self {
        PoMessage::Plural((0..nplurals.max(1)).map(|i| (i, String::new())).collect())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PoMessage::Singular(value) => value.is_empty(),
            PoMessage::Plural(forms) => forms.values().all(String::is_empty),
        }
    }

    /// Translated when every form is non-empty.
    pub fn is_complete(&self) -> bool {
        match self {
            PoMessage::Singular(value) => !value.is_empty(),
            PoMessage::Plural(forms) => !forms.is_empty() && forms.values().all(|v| !v.is_empty()),
        }
    }
}

impl PoEntry {
    pub fn new(msgid: impl Into<String>) -> Self {
        PoEntry {
            msgid: msgid.into(),
            ..PoEntry::default()
        }
    }

    pub fn with_msgstr(mut self, msgstr: impl Into<String>) -> Self {
        self.msgstr = PoMessage::Singular(msgstr.into());
        self
    }

    pub fn with_context(mut self, msgctxt: impl Into<String>) -> Self {
        self.msgctxt = Some(msgctxt.into());
        self
    }

    pub fn with_plural(mut self, msgid_plural: impl Into<String>, forms: &[&str]) -> Self {
        self.msgid_plural = Some(msgid_plural.into());
        self.msgstr = PoMessage::Plural(
            forms
                .iter()
                .enumerate()
                .map(|(i, f)| (i, f.to_string()))
                .collect(),
        );
        self
    }

    pub fn with_flags(mut self, flags: &[&str]) -> Self {
        self.flags = flags.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_references(mut self, references: &[&str]) -> Self {
        self.references = references.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_obsolete(mut self, obsolete: bool) -> Self {
        self.obsolete = obsolete;
        self
    }

    /// Unit key: `msgctxt|msgid`, or just `msgid` without a context.
    pub fn key(&self) -> String {
        match &self.msgctxt {
            Some(ctxt) => format!("{ctxt}{CONTEXT_SEPARATOR}{}", self.msgid),
            None => self.msgid.clone(),
        }
    }

    pub fn is_fuzzy(&self) -> bool {
        self.flags.iter().any(|f| f == FUZZY)
    }

    pub fn is_translated(&self) -> bool {
        self.msgstr.is_complete()
    }

    /// Source text the change ledger fingerprints: the msgid, plus the plural
    /// msgid when there is one.
    pub fn fingerprint_content(&self) -> String {
        match &self.msgid_plural {
            Some(plural) => crate::ledger::plural_content(&self.msgid, plural),
            None => self.msgid.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Msgctxt,
    Msgid,
    MsgidPlural,
    Msgstr,
    MsgstrIndex(usize),
}

#[derive(Default)]
struct PoParser {
    header: Option<PoHeader>,
    entries: Vec<PoEntry>,
    current: PoEntry,
    field: Option<Field>,
    has_lines: bool,
    seen_msgid: bool,
    seen_msgstr: bool,
}

impl PoParser {
    fn feed(&mut self, line_no: usize, raw: &str) -> Result<(), Error> {
        let line = raw.trim();
        if line.is_empty() {
            return self.flush(line_no);
        }

        let (line, obsolete) = match line.strip_prefix("#~") {
            Some(rest) => (rest.trim_start(), true),
            None => (line, false),
        };

        let comment = line
            .strip_prefix('#')
            .or_else(|| line.starts_with('|').then_some(line).filter(|_| obsolete));
        if let Some(comment) = comment {
            if self.seen_msgstr {
                self.flush(line_no)?;
            }
            self.push_comment(comment);
        } else if line.starts_with('"') {
            let value = unquote(line, line_no)?;
            self.append(line_no, &value)?;
        } else {
            let (keyword, rest) = line
                .split_once(|c: char| c.is_whitespace())
                .ok_or_else(|| Error::po_parse(line_no, format!("unexpected line `{line}`")))?;
            let value = unquote(rest, line_no)?;
            self.keyword(line_no, keyword, value)?;
        }

        self.has_lines = true;
        if obsolete {
            self.current.obsolete = true;
        }
        Ok(())
    }

    fn push_comment(&mut self, comment: &str) {
        let strip = |s: &str| s.strip_prefix(' ').unwrap_or(s).to_string();
        match comment.chars().next() {
            Some(',') => self.current.flags.extend(
                comment[1..]
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string),
            ),
            Some(':') => self
                .current
                .references
                .extend(comment[1..].split_whitespace().map(str::to_string)),
            Some('.') => self.current.extracted_comments.push(strip(&comment[1..])),
            Some('|') => self.current.previous.push(strip(&comment[1..])),
            _ => self.current.translator_comments.push(strip(comment)),
        }
    }

    fn keyword(&mut self, line_no: usize, keyword: &str, value: String) -> Result<(), Error> {
        match keyword {
            "msgctxt" | "msgid" if self.seen_msgstr => {
                self.flush(line_no)?;
                return self.keyword(line_no, keyword, value);
            }
            "msgctxt" => {
                self.current.msgctxt = Some(value);
                self.field = Some(Field::Msgctxt);
            }
            "msgid" => {
                self.current.msgid = value;
                self.seen_msgid = true;
                self.field = Some(Field::Msgid);
            }
            "msgid_plural" if self.seen_msgid => {
                self.current.msgid_plural = Some(value);
                self.field = Some(Field::MsgidPlural);
            }
            "msgstr" if self.seen_msgid => {
                self.current.msgstr = PoMessage::Singular(value);
                self.seen_msgstr = true;
                self.field = Some(Field::Msgstr);
            }
            other if self.seen_msgid && other.starts_with("msgstr[") => {
                let index = other
                    .strip_prefix("msgstr[")
                    .and_then(|s| s.strip_suffix(']'))
                    .and_then(|s| s.parse::<usize>().ok())
                    .ok_or_else(|| {
                        Error::po_parse(line_no, format!("invalid plural index `{other}`"))
                    })?;
                match &mut self.current.msgstr {
                    PoMessage::Plural(forms) if self.seen_msgstr => {
                        forms.insert(index, value);
                    }
                    msgstr => *msgstr = PoMessage::Plural(BTreeMap::from([(index, value)])),
                }
                self.seen_msgstr = true;
                self.field = Some(Field::MsgstrIndex(index));
            }
            other => {
                return Err(Error::po_parse(
                    line_no,
                    format!("unexpected keyword `{other}`"),
                ));
            }
        }
        Ok(())
    }

    fn append(&mut self, line_no: usize, value: &str) -> Result<(), Error> {
        let target = match self.field {
            Some(Field::Msgctxt) => self.current.msgctxt.get_or_insert_with(String::new),
            Some(Field::Msgid) => &mut self.current.msgid,
            Some(Field::MsgidPlural) => self.current.msgid_plural.get_or_insert_with(String::new),
            Some(Field::Msgstr) => match &mut self.current.msgstr {
                PoMessage::Singular(s) => s,
                PoMessage::Plural(_) => {
                    return Err(Error::po_parse(line_no, "continuation of plural msgstr"));
                }
            },
            Some(Field::MsgstrIndex(index)) => match &mut self.current.msgstr {
                PoMessage::Plural(forms) => forms.entry(index).or_default(),
                PoMessage::Singular(_) => {
                    return Err(Error::po_parse(line_no, "continuation of singular msgstr"));
                }
            },
            None => {
                return Err(Error::po_parse(line_no, "string without a keyword"));
            }
        };
        target.push_str(value);
        Ok(())
    }

    fn flush(&mut self, line_no: usize) -> Result<(), Error> {
        let entry = std::mem::take(&mut self.current);
        let (has_lines, seen_msgid, seen_msgstr) =
            (self.has_lines, self.seen_msgid, self.seen_msgstr);
        self.field = None;
        self.has_lines = false;
        self.seen_msgid = false;
        self.seen_msgstr = false;

        if !has_lines {
            return Ok(());
        }
        if !seen_msgid {
            log::debug!("dropping comments without an entry before line {line_no}");
            return Ok(());
        }
        if !seen_msgstr {
            return Err(Error::po_parse(
                line_no,
                format!("msgid `{}` has no msgstr", entry.msgid),
            ));
        }

        let is_header = self.header.is_none()
            && self.entries.is_empty()
            && entry.msgid.is_empty()
            && entry.msgctxt.is_none()
            && !entry.obsolete;
        if is_header {
            let msgstr = match &entry.msgstr {
                PoMessage::Singular(s) => s.clone(),
                PoMessage::Plural(forms) => forms.values().cloned().collect(),
            };
            let mut header = PoHeader::from_msgstr(&msgstr);
            header.comments = entry.translator_comments;
            header.flags = entry.flags;
            self.header = Some(header);
        } else {
            self.entries.push(entry);
        }
        Ok(())
    }

    fn finish(mut self, line_no: usize) -> Result<PoFile, Error> {
        self.flush(line_no)?;
        Ok(PoFile {
            header: self.header.unwrap_or_default(),
            entries: self.entries,
        })
    }
}

/// Removes the surrounding quotes and resolves escape sequences.
fn unquote(s: &str, line_no: usize) -> Result<String, Error> {
    let s = s.trim();
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .filter(|_| s.len() >= 2)
        .ok_or_else(|| Error::po_parse(line_no, format!("expected a quoted string, got `{s}`")))?;

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('a') => result.push('\u{07}'),
            Some('b') => result.push('\u{08}'),
            Some('f') => result.push('\u{0C}'),
            Some('v') => result.push('\u{0B}'),
            Some('"') => result.push('"'),
            Some('\\') => result.push('\\'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    Ok(result)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

fn write_string(out: &mut String, prefix: &str, keyword: &str, value: &str) {
    let multiline = value.find('\n').is_some_and(|i| i + 1 < value.len());
    if multiline {
        out.push_str(&format!("{prefix}{keyword} \"\"\n"));
        for segment in value.split_inclusive('\n') {
            out.push_str(&format!("{prefix}\"{}\"\n", escape(segment)));
        }
    } else {
        out.push_str(&format!("{prefix}{keyword} \"{}\"\n", escape(value)));
    }
}

fn write_comment(out: &mut String, marker: &str, text: &str) {
    if text.is_empty() {
        out.push_str(&format!("{marker}\n"));
    } else {
        out.push_str(&format!("{marker} {text}\n"));
    }
}

fn render_header(header: &PoHeader) -> String {
    let mut out = String::new();
    for comment in &header.comments {
        write_comment(&mut out, "#", comment);
    }
    if !header.flags.is_empty() {
        out.push_str(&format!("#, {}\n", header.flags.join(", ")));
    }
    out.push_str("msgid \"\"\n");
    out.push_str("msgstr \"\"\n");
    for (name, value) in &header.fields {
        out.push_str(&format!("\"{}\"\n", escape(&format!("{name}: {value}\n"))));
    }
    out
}

/// Renders one entry, including its comment block.
pub fn render_entry(entry: &PoEntry) -> String {
    let mut out = String::new();
    for comment in &entry.translator_comments {
        write_comment(&mut out, "#", comment);
    }
    for comment in &entry.extracted_comments {
        write_comment(&mut out, "#.", comment);
    }
    if !entry.references.is_empty() {
        out.push_str(&format!("#: {}\n", entry.references.join(" ")));
    }
    if !entry.flags.is_empty() {
        out.push_str(&format!("#, {}\n", entry.flags.join(", ")));
    }

    let prefix = if entry.obsolete { "#~ " } else { "" };
    for previous in &entry.previous {
        let marker = if entry.obsolete { "#~|" } else { "#|" };
        write_comment(&mut out, marker, previous);
    }
    if let Some(ctxt) = &entry.msgctxt {
        write_string(&mut out, prefix, "msgctxt", ctxt);
    }
    write_string(&mut out, prefix, "msgid", &entry.msgid);
    if let Some(plural) = &entry.msgid_plural {
        write_string(&mut out, prefix, "msgid_plural", plural);
    }
    match &entry.msgstr {
        PoMessage::Singular(value) => write_string(&mut out, prefix, "msgstr", value),
        PoMessage::Plural(forms) => {
            for (index, value) in forms {
                write_string(&mut out, prefix, &format!("msgstr[{index}]"), value);
            }
        }
    }
    out
}

impl Parser for PoFile {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut parser = PoParser::default();
        let mut line_no = 0;
        for line in reader.lines() {
            line_no += 1;
            parser.feed(line_no, &line?)?;
        }
        parser.finish(line_no + 1)
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut blocks = Vec::with_capacity(self.entries.len() + 1);
        if !self.header.is_empty() {
            blocks.push(render_header(&self.header));
        }
        blocks.extend(self.entries.iter().map(render_entry));
        writer
            .write_all(blocks.join("\n").as_bytes())
            .map_err(Error::Io)
    }
}

impl From<PoFile> for Document {
    fn from(value: PoFile) -> Self {
        let mut custom = std::collections::HashMap::new();
        custom.insert(HEADER_KEY.to_string(), value.header.to_msgstr());
        if !value.header.comments.is_empty() {
            custom.insert(
                HEADER_COMMENTS_KEY.to_string(),
                value.header.comments.join("\n"),
            );
        }
        if !value.header.flags.is_empty() {
            custom.insert(HEADER_FLAGS_KEY.to_string(), value.header.flags.join(", "));
        }

        let mut document = Document {
            metadata: Metadata {
                language: value.header.get("Language").unwrap_or_default().to_string(),
                root_key: None,
                custom,
            },
            nodes: Vec::with_capacity(value.entries.len()),
        };

        for entry in value.entries {
            if entry.obsolete {
                document.push_verbatim(render_entry(&entry));
            } else {
                document.push_unit(entry_to_unit(entry));
            }
        }
        document
    }
}

fn entry_to_unit(entry: PoEntry) -> TranslationUnit {
    let key = entry.key();
    let value = match entry.msgstr {
        PoMessage::Singular(value) => UnitValue::Scalar(value),
        PoMessage::Plural(forms) => UnitValue::List(forms.into_values().collect()),
    };
    let comment = if entry.translator_comments.is_empty() {
        None
    } else {
        Some(entry.translator_comments.join("\n"))
    };

    let mut unit = TranslationUnit::new(key, value)
        .with_comment(comment)
        .with_custom(MSGID_KEY, entry.msgid);
    let optional = [
        (MSGCTXT_KEY, entry.msgctxt),
        (MSGID_PLURAL_KEY, entry.msgid_plural),
        (FLAGS_KEY, non_empty(entry.flags.join(", "))),
        (REFERENCES_KEY, non_empty(entry.references.join(" "))),
        (EXTRACTED_KEY, non_empty(entry.extracted_comments.join("\n"))),
        (PREVIOUS_KEY, non_empty(entry.previous.join("\n"))),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            unit.custom.insert(name.to_string(), value);
        }
    }
    unit
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn split_lines(value: Option<&String>, separator: &str) -> Vec<String> {
    value
        .map(|v| {
            v.split(separator)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn unit_to_entry(unit: &TranslationUnit) -> Result<PoEntry, Error> {
    let (msgctxt, msgid) = match unit.custom.get(MSGID_KEY) {
        Some(msgid) => (unit.custom.get(MSGCTXT_KEY).cloned(), msgid.clone()),
        None => match unit.key.split_once(CONTEXT_SEPARATOR) {
            Some((ctxt, msgid)) => (Some(ctxt.to_string()), msgid.to_string()),
            None => (None, unit.key.clone()),
        },
    };
    let msgstr = match &unit.value {
        UnitValue::Scalar(value) => PoMessage::Singular(value.clone()),
        UnitValue::List(forms) => PoMessage::Plural(forms.iter().cloned().enumerate().collect()),
        UnitValue::Quantities(forms) => PoMessage::Plural(
            forms
                .iter()
                .map(|(_, value)| value.clone())
                .enumerate()
                .collect(),
        ),
        UnitValue::Block(_) => {
            return Err(Error::DataMismatch(format!(
                "`{}`: structured blocks cannot be written to PO",
                unit.key
            )));
        }
    };
    let msgid_plural = unit.custom.get(MSGID_PLURAL_KEY).cloned().or_else(|| {
        matches!(msgstr, PoMessage::Plural(_)).then(|| msgid.clone())
    });

    Ok(PoEntry {
        msgctxt,
        msgid,
        msgid_plural,
        msgstr,
        translator_comments: split_lines(unit.comment.as_ref(), "\n"),
        extracted_comments: split_lines(unit.custom.get(EXTRACTED_KEY), "\n"),
        references: split_lines(unit.custom.get(REFERENCES_KEY), " "),
        flags: split_lines(unit.custom.get(FLAGS_KEY), ","),
        previous: split_lines(unit.custom.get(PREVIOUS_KEY), "\n"),
        obsolete: false,
    })
}

impl TryFrom<Document> for PoFile {
    type Error = Error;

    fn try_from(value: Document) -> Result<Self, Self::Error> {
        let custom = &value.metadata.custom;
        let language = value.metadata.language.as_str();
        let mut header = custom
            .get(HEADER_KEY)
            .map(|raw| PoHeader::from_msgstr(raw))
            .unwrap_or_default();
        if !language.is_empty() {
            if header.fields.is_empty() {
                header = PoFile::default_header(language);
            } else {
                header.set("Language", language);
            }
        }
        header.comments = custom
            .get(HEADER_COMMENTS_KEY)
            .map(|c| c.split('\n').map(str::to_string).collect())
            .unwrap_or_default();
        header.flags = split_lines(custom.get(HEADER_FLAGS_KEY), ",");

        let mut entries = Vec::new();
        for node in &value.nodes {
            match node {
                Node::Unit(unit) => entries.push(unit_to_entry(unit)?),
                Node::Verbatim(text) => entries.extend(PoFile::from_str(text)?.entries),
                Node::Comment(_) => {}
            }
        }
        Ok(PoFile { header, entries })
    }
}

impl ResourceFormat for PoFile {
    const NON_TRANSLATABLE: NonTranslatablePolicy = NonTranslatablePolicy::Copy;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Catalog;

    const SAMPLE: &str = r#"# Russian translation.
# Copyright (C) 2024
#, fuzzy
msgid ""
msgstr ""
"Project-Id-Version: demo 1.0\n"
"POT-Creation-Date: 2024-01-01 10:00+0000\n"
"Language: ru\n"
"Plural-Forms: nplurals=3; plural=(n%10==1 && n%100!=11 ? 0 : 1);\n"

# Greeting on the start screen
#. TRANSLATORS: keep it short
#: src/main.go:10 src/main.go:42
#, c-format
msgid "Hello, %s"
msgstr "Привет, %s"

msgctxt "menu"
msgid "File"
msgstr "Файл"

#: src/files.go:3
msgid "%d file"
msgid_plural "%d files"
msgstr[0] "%d файл"
msgstr[1] "%d файла"
msgstr[2] "%d файлов"

msgid ""
"Line one\n"
"Line two"
msgstr ""

#~ msgid "Old"
#~ msgstr "Старый"
"#;

    #[test]
    fn test_parse_header() {
        let po = PoFile::from_str(SAMPLE).unwrap();
        assert_eq!(po.header.get("Language"), Some("ru"));
        assert_eq!(po.header.get("language"), Some("ru"));
        assert_eq!(po.header.nplurals(), Some(3));
        assert_eq!(po.header.flags, vec!["fuzzy".to_string()]);
        assert_eq!(po.header.comments.len(), 2);
    }

    #[test]
    fn test_parse_entries() {
        let po = PoFile::from_str(SAMPLE).unwrap();
        assert_eq!(po.entries.len(), 5);

        let hello = &po.entries[0];
        assert_eq!(hello.msgid, "Hello, %s");
        assert_eq!(hello.msgstr, PoMessage::Singular("Привет, %s".to_string()));
        assert_eq!(hello.translator_comments, vec!["Greeting on the start screen"]);
        assert_eq!(hello.extracted_comments, vec!["TRANSLATORS: keep it short"]);
        assert_eq!(hello.references, vec!["src/main.go:10", "src/main.go:42"]);
        assert_eq!(hello.flags, vec!["c-format"]);

        assert_eq!(po.entries[1].key(), "menu|File");

        let files = &po.entries[2];
        assert_eq!(files.msgid_plural.as_deref(), Some("%d files"));
        match &files.msgstr {
            PoMessage::Plural(forms) => assert_eq!(forms.len(), 3),
            other => panic!("unexpected msgstr {other:?}"),
        }

        assert_eq!(po.entries[3].msgid, "Line one\nLine two");
        assert!(po.entries[4].obsolete);
        assert_eq!(po.find(None, "Old"), None);
    }

    #[test]
    fn test_write_round_trip() {
        let po = PoFile::from_str(SAMPLE).unwrap();
        let mut out = Vec::new();
        po.to_writer(&mut out).unwrap();
        let written = String::from_utf8(out).unwrap();
        assert!(written.contains("#~ msgid \"Old\""));
        assert!(written.contains("msgid \"\"\n\"Line one\\n\"\n\"Line two\"\n"));
        let reparsed = PoFile::from_str(&written).unwrap();
        assert_eq!(reparsed, po);
    }

    #[test]
    fn test_entries_without_blank_lines() {
        let content = "msgid \"a\"\nmsgstr \"A\"\nmsgid \"b\"\nmsgstr \"B\"\n";
        let po = PoFile::from_str(content).unwrap();
        assert!(po.header.is_empty());
        assert_eq!(po.entries.len(), 2);
        assert_eq!(po.entries[1].msgstr, PoMessage::Singular("B".to_string()));
    }

    #[test]
    fn test_escapes() {
        let content = r#"msgid "Say \"hi\"\tnow\\"
msgstr "Dis \"salut\""
"#;
        let po = PoFile::from_str(content).unwrap();
        assert_eq!(po.entries[0].msgid, "Say \"hi\"\tnow\\");
        assert_eq!(escape(&po.entries[0].msgid), r#"Say \"hi\"\tnow\\"#);
    }

    #[test]
    fn test_parse_errors_report_line() {
        let err = PoFile::from_str("msgid \"a\"\nmsgstr \"A\nmsgid \"b\"\n").unwrap_err();
        assert!(matches!(err, Error::PoParse { line: 2, .. }));

        let err = PoFile::from_str("msgid \"a\"\n\nmsgid \"b\"\nmsgstr \"\"\n").unwrap_err();
        assert!(matches!(err, Error::PoParse { line: 2, .. }));

        let err = PoFile::from_str("garbage\n").unwrap_err();
        assert!(matches!(err, Error::PoParse { line: 1, .. }));
    }

    #[test]
    fn test_fingerprint_content() {
        let singular = PoEntry::new("Hello");
        assert_eq!(singular.fingerprint_content(), "Hello");
        let plural = PoEntry::new("%d file").with_plural("%d files", &["", ""]);
        assert_eq!(plural.fingerprint_content(), "%d file\0%d files");
    }

    #[test]
    fn test_document_conversion() {
        let po = PoFile::from_str(SAMPLE).unwrap();
        let document = Document::from(po.clone());

        assert_eq!(document.metadata.language, "ru");
        assert_eq!(
            document.keys(),
            vec!["Hello, %s", "menu|File", "%d file", "Line one\nLine two"]
        );
        assert_eq!(document.untranslated_keys(), vec!["Line one\nLine two"]);
        assert!(matches!(document.nodes.last(), Some(Node::Verbatim(_))));

        let back = PoFile::try_from(document).unwrap();
        assert_eq!(back, po);
    }

    #[test]
    fn test_new_translation_file_from_template() {
        let template = PoFile::from_str(
            "#: a.go:1\nmsgid \"Hello\"\nmsgstr \"\"\n\nmsgid \"%d item\"\nmsgid_plural \"%d items\"\nmsgstr[0] \"\"\nmsgstr[1] \"\"\n",
        )
        .unwrap();
        let document = PoFile::new_translation_file(&Document::from(template), "de");
        let bytes = PoFile::marshal_target(&document).unwrap();
        let po = PoFile::from_bytes(&bytes).unwrap();

        assert_eq!(po.entries.len(), 2);
        assert_eq!(po.entries[0].references, vec!["a.go:1"]);
        assert_eq!(po.entries[1].msgid_plural.as_deref(), Some("%d items"));
    }

    #[test]
    fn test_default_header() {
        let header = PoFile::default_header("fr");
        assert_eq!(header.get("Language"), Some("fr"));
        assert_eq!(header.get("Content-Type"), Some("text/plain; charset=UTF-8"));
    }
}
