//! Reconciles a translated PO file against a fresh POT template.
//!
//! The template decides which entries exist and where they come from; the
//! target contributes translations and translator state. Target entries the
//! template no longer has are kept as obsolete (`#~`) entries.

use std::collections::{HashMap, HashSet};

use crate::formats::po::{FUZZY, PoEntry, PoFile, PoMessage};

const POT_CREATION_DATE: &str = "POT-Creation-Date";
const DEFAULT_NPLURALS: usize = 2;

/// Counts from one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeReport {
    /// Template entries that found a translation in the target.
    pub matched: usize,
    /// Template entries new to the target.
    pub added: usize,
    /// Target entries obsoleted by this merge.
    pub obsoleted: usize,
    /// Target entries that were already obsolete.
    pub kept_obsolete: usize,
}

/// Merges `template` into `target`; see [`merge_with_report`].
pub fn merge(target: &PoFile, template: &PoFile) -> PoFile {
    merge_with_report(target, template).0
}

/// Merges `template` into `target`.
///
/// Active entries follow the template's order. Matched entries keep the
/// target's msgstr and comments, take the template's references and extracted
/// comments, and carry the union of both flag sets with `fuzzy` first.
/// Target entries are matched by msgid alone; the first active occurrence
/// wins and its context is replaced by the template's. Template entries
/// without a match get an empty msgstr.
///
/// The trailing block holds every obsolete entry in the target's order, so
/// previously obsolete entries may come before ones obsoleted by this merge.
/// Newly obsoleted entries, including later duplicates of a matched msgid,
/// lose their references.
pub fn merge_with_report(target: &PoFile, template: &PoFile) -> (PoFile, MergeReport) {
    let mut report = MergeReport::default();

    let mut header = target.header.clone();
    if let Some(date) = template.header.get(POT_CREATION_DATE) {
        header.set(POT_CREATION_DATE, date);
    }
    let nplurals = header.nplurals().unwrap_or(DEFAULT_NPLURALS);

    // msgid -> index of its first active occurrence in the target.
    let mut lookup: HashMap<&str, usize> = HashMap::new();
    for (index, entry) in target.entries.iter().enumerate() {
        if !entry.obsolete {
            lookup.entry(entry.msgid.as_str()).or_insert(index);
        }
    }

    let mut used: HashSet<usize> = HashSet::new();
    let mut entries = Vec::with_capacity(template.entries.len());
    for template_entry in template.active_entries() {
        match lookup.get(template_entry.msgid.as_str()) {
            Some(&index) => {
                used.insert(index);
                report.matched += 1;
                entries.push(merge_entry(&target.entries[index], template_entry, nplurals));
            }
            None => {
                report.added += 1;
                entries.push(new_entry(template_entry, nplurals));
            }
        }
    }

    for (index, entry) in target.entries.iter().enumerate() {
        if entry.obsolete {
            report.kept_obsolete += 1;
            entries.push(entry.clone());
        } else if !used.contains(&index) {
            report.obsoleted += 1;
            entries.push(PoEntry {
                references: Vec::new(),
                obsolete: true,
                ..entry.clone()
            });
        }
    }

    log::debug!(
        "msgmerge: {} matched, {} added, {} obsoleted, {} already obsolete",
        report.matched,
        report.added,
        report.obsoleted,
        report.kept_obsolete
    );

    (PoFile { header, entries }, report)
}

fn merge_entry(existing: &PoEntry, template: &PoEntry, nplurals: usize) -> PoEntry {
    PoEntry {
        msgctxt: template.msgctxt.clone(),
        msgid: template.msgid.clone(),
        msgid_plural: template.msgid_plural.clone(),
        msgstr: reshape(&existing.msgstr, template.msgid_plural.is_some(), nplurals),
        translator_comments: existing.translator_comments.clone(),
        extracted_comments: template.extracted_comments.clone(),
        references: template.references.clone(),
        flags: merge_flags(&existing.flags, &template.flags),
        previous: existing.previous.clone(),
        obsolete: false,
    }
}

fn new_entry(template: &PoEntry, nplurals: usize) -> PoEntry {
    let msgstr = if template.msgid_plural.is_some() {
        PoMessage::empty_plural(nplurals)
    } else {
        PoMessage::default()
    };
    PoEntry {
        msgstr,
        obsolete: false,
        ..template.clone()
    }
}

/// Converts a msgstr between singular and plural shape when the template
/// added or dropped `msgid_plural`. The existing text lands in form 0.
fn reshape(msgstr: &PoMessage, plural: bool, nplurals: usize) -> PoMessage {
    match (msgstr, plural) {
        (PoMessage::Singular(text), true) => {
            let mut forms = match PoMessage::empty_plural(nplurals) {
                PoMessage::Plural(forms) => forms,
                PoMessage::Singular(_) => Default::default(),
            };
            forms.insert(0, text.clone());
            PoMessage::Plural(forms)
        }
        (PoMessage::Plural(forms), false) => {
            PoMessage::Singular(forms.get(&0).cloned().unwrap_or_default())
        }
        (msgstr, _) => msgstr.clone(),
    }
}

/// Union of both flag lists, `fuzzy` first, otherwise first-seen order.
fn merge_flags(target: &[String], template: &[String]) -> Vec<String> {
    let mut flags = Vec::with_capacity(target.len() + template.len());
    if target.iter().chain(template).any(|f| f == FUZZY) {
        flags.push(FUZZY.to_string());
    }
    for flag in target.iter().chain(template) {
        if !flags.contains(flag) {
            flags.push(flag.clone());
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::po::PoHeader;
    use crate::traits::Parser;

    fn po(header: PoHeader, entries: Vec<PoEntry>) -> PoFile {
        PoFile { header, entries }
    }

    #[test]
    fn test_merge_flags_fuzzy_first() {
        let flags = merge_flags(
            &["c-format".to_string(), "fuzzy".to_string()],
            &["python-format".to_string(), "c-format".to_string()],
        );
        assert_eq!(flags, vec!["fuzzy", "c-format", "python-format"]);
        assert!(merge_flags(&[], &[]).is_empty());
    }

    #[test]
    fn test_merge_keeps_translation_and_takes_template_refs() {
        let target = po(
            PoHeader::default(),
            vec![
                PoEntry::new("A")
                    .with_msgstr("ok")
                    .with_flags(&["fuzzy", "c-format"])
                    .with_references(&["old.go:1"]),
                PoEntry::new("B").with_msgstr("bee").with_obsolete(true),
            ],
        );
        let template = po(
            PoHeader::default(),
            vec![
                PoEntry::new("A")
                    .with_references(&["new.go:10"])
                    .with_flags(&["python-format"]),
                PoEntry::new("C"),
            ],
        );

        let (merged, report) = merge_with_report(&target, &template);

        assert_eq!(merged.entries.len(), 3);
        let a = &merged.entries[0];
        assert_eq!(a.msgstr, PoMessage::Singular("ok".to_string()));
        assert_eq!(a.flags, vec!["fuzzy", "c-format", "python-format"]);
        assert_eq!(a.references, vec!["new.go:10"]);

        let c = &merged.entries[1];
        assert_eq!(c.msgid, "C");
        assert_eq!(c.msgstr, PoMessage::Singular(String::new()));
        assert!(!c.obsolete);

        let b = &merged.entries[2];
        assert!(b.obsolete);
        assert_eq!(b.msgstr, PoMessage::Singular("bee".to_string()));

        assert_eq!(
            report,
            MergeReport {
                matched: 1,
                added: 1,
                obsoleted: 0,
                kept_obsolete: 1,
            }
        );
    }

    #[test]
    fn test_unmatched_target_entries_become_obsolete() {
        let target = po(
            PoHeader::default(),
            vec![
                PoEntry::new("gone")
                    .with_msgstr("weg")
                    .with_references(&["a.go:1"]),
                PoEntry::new("old").with_msgstr("alt").with_obsolete(true),
                PoEntry::new("kept").with_msgstr("bleibt"),
            ],
        );
        let template = po(PoHeader::default(), vec![PoEntry::new("kept")]);

        let (merged, report) = merge_with_report(&target, &template);
        let ids: Vec<_> = merged
            .entries
            .iter()
            .map(|e| (e.msgid.as_str(), e.obsolete))
            .collect();
        assert_eq!(ids, vec![("kept", false), ("gone", true), ("old", true)]);
        assert!(merged.entries[1].references.is_empty());
        assert_eq!(
            merged.entries[1].msgstr,
            PoMessage::Singular("weg".to_string())
        );
        assert_eq!(report.obsoleted, 1);
    }

    #[test]
    fn test_header_creation_date_overlay() {
        let mut target_header = PoHeader::from_msgstr(
            "Project-Id-Version: demo\nPOT-Creation-Date: 2023-01-01\nLanguage: de\n",
        );
        target_header.comments = vec!["German translation".to_string()];
        let template_header = PoHeader::from_msgstr("POT-Creation-Date: 2024-06-01\n");

        let merged = merge(&po(target_header, vec![]), &po(template_header, vec![]));
        assert_eq!(merged.header.get("POT-Creation-Date"), Some("2024-06-01"));
        assert_eq!(merged.header.get("Language"), Some("de"));
        assert_eq!(merged.header.fields[1].0, "POT-Creation-Date");
        assert_eq!(merged.header.comments, vec!["German translation"]);
    }

    #[test]
    fn test_header_creation_date_appended_when_missing() {
        let target_header = PoHeader::from_msgstr("Language: de\n");
        let template_header = PoHeader::from_msgstr("POT-Creation-Date: 2024-06-01\n");
        let merged = merge(&po(target_header, vec![]), &po(template_header, vec![]));
        assert_eq!(merged.header.fields.len(), 2);
        assert_eq!(merged.header.get("POT-Creation-Date"), Some("2024-06-01"));
    }

    #[test]
    fn test_new_plural_entry_uses_header_nplurals() {
        let target = po(
            PoHeader::from_msgstr("Plural-Forms: nplurals=3; plural=n%10==1 ? 0 : 1;\n"),
            vec![],
        );
        let template = po(
            PoHeader::default(),
            vec![PoEntry::new("%d file").with_plural("%d files", &["", ""])],
        );
        let merged = merge(&target, &template);
        assert_eq!(merged.entries[0].msgstr, PoMessage::empty_plural(3));
    }

    #[test]
    fn test_reshape_when_plural_added() {
        let target = po(
            PoHeader::default(),
            vec![PoEntry::new("%d file").with_msgstr("%d Datei")],
        );
        let template = po(
            PoHeader::default(),
            vec![PoEntry::new("%d file").with_plural("%d files", &["", ""])],
        );
        let merged = merge(&target, &template);
        match &merged.entries[0].msgstr {
            PoMessage::Plural(forms) => {
                assert_eq!(forms.get(&0).map(String::as_str), Some("%d Datei"));
                assert_eq!(forms.len(), 2);
            }
            other => panic!("unexpected msgstr {other:?}"),
        }
    }

    #[test]
    fn test_match_by_msgid_ignores_context() {
        let target = po(
            PoHeader::default(),
            vec![PoEntry::new("Open").with_context("menu").with_msgstr("Öffnen")],
        );
        let template = po(PoHeader::default(), vec![PoEntry::new("Open")]);
        let (merged, report) = merge_with_report(&target, &template);

        assert_eq!(report.matched, 1);
        assert_eq!(report.obsoleted, 0);
        assert_eq!(merged.entries.len(), 1);
        let open = &merged.entries[0];
        assert_eq!(open.msgctxt, None);
        assert_eq!(open.msgstr, PoMessage::Singular("Öffnen".to_string()));
        assert!(!open.obsolete);
    }

    #[test]
    fn test_duplicate_target_entries_are_obsoleted() {
        let target = po(
            PoHeader::default(),
            vec![
                PoEntry::new("A").with_msgstr("x").with_references(&["a.c:1"]),
                PoEntry::new("A").with_msgstr("y").with_references(&["a.c:2"]),
            ],
        );
        let template = po(PoHeader::default(), vec![PoEntry::new("A")]);
        let (merged, report) = merge_with_report(&target, &template);

        assert_eq!(report.matched, 1);
        assert_eq!(report.obsoleted, 1);
        assert_eq!(merged.entries.len(), 2);
        assert_eq!(merged.entries[0].msgstr, PoMessage::Singular("x".to_string()));
        let duplicate = &merged.entries[1];
        assert!(duplicate.obsolete);
        assert_eq!(duplicate.msgstr, PoMessage::Singular("y".to_string()));
        assert!(duplicate.references.is_empty());
    }

    #[test]
    fn test_merge_is_stable() {
        let target = PoFile::from_str(
            "msgid \"a\"\nmsgstr \"A\"\n\n#: x.go:1\nmsgid \"b\"\nmsgstr \"B\"\n",
        )
        .unwrap();
        let template = PoFile::from_str(
            "#: y.go:2\nmsgid \"a\"\nmsgstr \"\"\n\nmsgid \"c\"\nmsgstr \"\"\n",
        )
        .unwrap();
        let once = merge(&target, &template);
        let twice = merge(&once, &template);
        assert_eq!(once, twice);
    }
}
