use indoc::indoc;
use langsync::formats::po::{PoFile, PoMessage};
use langsync::{Error, Parser, SyncOutcome, merge, sync_file};
use std::fs;
use tempfile::tempdir;

const TARGET: &str = indoc! {r#"
    msgid ""
    msgstr ""
    "Language: ru\n"
    "POT-Creation-Date: 2024-01-01 00:00+0000\n"

    # checked by the translator
    #: old.go:1
    #, fuzzy, c-format
    msgid "A"
    msgstr "ok"

    #~ msgid "B"
    #~ msgstr "old"
"#};

const TEMPLATE: &str = indoc! {r#"
    msgid ""
    msgstr ""
    "POT-Creation-Date: 2025-06-01 12:00+0000\n"

    #: new.go:10
    #, python-format
    msgid "A"
    msgstr ""

    #: new.go:20
    msgid "C"
    msgstr ""
"#};

#[test]
fn test_merge_parsed_files() {
    let target = PoFile::from_str(TARGET).unwrap();
    let template = PoFile::from_str(TEMPLATE).unwrap();
    let merged = merge(&target, &template);

    assert_eq!(
        merged.header.get("POT-Creation-Date"),
        Some("2025-06-01 12:00+0000")
    );
    assert_eq!(merged.header.get("Language"), Some("ru"));

    let ids: Vec<_> = merged
        .entries
        .iter()
        .map(|e| (e.msgid.as_str(), e.obsolete))
        .collect();
    assert_eq!(ids, vec![("A", false), ("C", false), ("B", true)]);

    let a = &merged.entries[0];
    assert_eq!(a.msgstr, PoMessage::Singular("ok".to_string()));
    assert_eq!(a.flags, vec!["fuzzy", "c-format", "python-format"]);
    assert_eq!(a.references, vec!["new.go:10"]);
    assert_eq!(a.translator_comments, vec!["checked by the translator"]);
    assert!(merged.entries[1].msgstr.is_empty());
    assert_eq!(merged.entries[2], target.entries[1]);
}

#[test]
fn test_sync_file_merges_existing_po() {
    let dir = tempdir().unwrap();
    let pot = dir.path().join("messages.pot");
    let po = dir.path().join("ru.po");
    fs::write(&pot, TEMPLATE).unwrap();
    fs::write(&po, TARGET).unwrap();

    let outcome = sync_file(&pot, &po, "ru").unwrap();
    let SyncOutcome::Merged(report) = outcome else {
        panic!("expected a merge, got {outcome:?}");
    };
    assert_eq!(report.matched, 1);
    assert_eq!(report.added, 1);
    assert_eq!(report.obsoleted, 0);
    assert_eq!(report.kept_obsolete, 1);

    let written = fs::read_to_string(&po).unwrap();
    assert!(written.contains(indoc! {r#"
        # checked by the translator
        #: new.go:10
        #, fuzzy, c-format, python-format
        msgid "A"
        msgstr "ok"
    "#}));
    assert!(written.contains("#~ msgid \"B\"\n#~ msgstr \"old\"\n"));
    assert!(!written.contains("old.go:1"));

    // A second run has nothing left to do.
    let first = written.clone();
    sync_file(&pot, &po, "ru").unwrap();
    assert_eq!(fs::read_to_string(&po).unwrap(), first);
}

#[test]
fn test_sync_file_obsoletes_removed_entries() {
    let dir = tempdir().unwrap();
    let pot = dir.path().join("messages.pot");
    let po = dir.path().join("de.po");
    fs::write(
        &pot,
        indoc! {r#"
            #: main.c:3
            msgid "Kept"
            msgstr ""
        "#},
    )
    .unwrap();
    fs::write(
        &po,
        indoc! {r#"
            #: main.c:1
            msgid "Kept"
            msgstr "Behalten"

            #: main.c:2
            msgid "Gone"
            msgstr "Weg"
        "#},
    )
    .unwrap();

    let SyncOutcome::Merged(report) = sync_file(&pot, &po, "de").unwrap() else {
        panic!("expected a merge");
    };
    assert_eq!(report.obsoleted, 1);

    let merged = PoFile::read_from(&po).unwrap();
    let gone = merged.entries.iter().find(|e| e.msgid == "Gone").unwrap();
    assert!(gone.obsolete);
    assert!(gone.references.is_empty());
    assert_eq!(gone.msgstr, PoMessage::Singular("Weg".to_string()));
}

#[test]
fn test_sync_file_creates_po_from_template() {
    let dir = tempdir().unwrap();
    let pot = dir.path().join("messages.pot");
    let po = dir.path().join("fr.po");
    fs::write(&pot, TEMPLATE).unwrap();

    let outcome = sync_file(&pot, &po, "fr").unwrap();
    assert_eq!(outcome, SyncOutcome::Created { keys: 2 });

    let created = PoFile::read_from(&po).unwrap();
    assert_eq!(created.header.get("Language"), Some("fr"));
    assert!(created.active_entries().all(|e| e.msgstr.is_empty()));
}

#[test]
fn test_template_cannot_be_a_target() {
    let dir = tempdir().unwrap();
    let pot = dir.path().join("messages.pot");
    fs::write(&pot, TEMPLATE).unwrap();
    assert!(matches!(
        sync_file(&pot, dir.path().join("other.pot"), "fr"),
        Err(Error::UnsupportedFormat(_))
    ));
}
