//! File-level entry points.
//!
//! This module provides the [`Codec`] struct plus free functions for reading
//! and writing [`Document`]s by [`FormatType`], inferring formats from file
//! extensions and languages from path conventions (`values-de/strings.xml`,
//! `po/ru.po`, `config/locales/fr.yml`, `locales/es/common.json`,
//! `guide.de.md`), and for synchronizing a target file against its source in
//! one call.

use std::{
    fs,
    path::{Path, PathBuf},
};

use lazy_static::lazy_static;
use regex::Regex;
use unic_langid::LanguageIdentifier;

use crate::{
    error::Error,
    formats::*,
    msgmerge::{self, MergeReport},
    sync::{self, SyncReport},
    traits::{Catalog, Parser, ResourceFormat},
    types::Document,
};

lazy_static! {
    static ref LANGUAGE_REGEX: Regex =
        Regex::new(r"^[a-z]{2,3}(?:[-_][A-Za-z0-9]{2,8})*$").unwrap();
}

/// Whether a document is a source file or a per-language target file.
/// Targets apply their format's non-translatable policy on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Source,
    Target,
}

/// A document together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub format: FormatType,
    pub role: Role,
    pub document: Document,
}

/// A collection of documents read from disk, written back to the same paths.
#[derive(Debug, Default)]
pub struct Codec {
    pub documents: Vec<LoadedDocument>,
}

impl Codec {
    /// Creates a new, empty `Codec`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a file with an explicit format type.
    pub fn read_file_by_type<P: AsRef<Path>>(
        &mut self,
        path: P,
        format_type: FormatType,
    ) -> Result<&mut LoadedDocument, Error> {
        let path = path.as_ref();
        let document = read_document(path, &format_type)?;
        self.documents.push(LoadedDocument {
            path: path.to_path_buf(),
            format: format_type,
            role: Role::Source,
            document,
        });
        let index = self.documents.len() - 1;
        Ok(&mut self.documents[index])
    }

    /// Reads a file, inferring its format from the extension.
    pub fn read_file_by_extension<P: AsRef<Path>>(
        &mut self,
        path: P,
        lang: Option<String>,
    ) -> Result<&mut LoadedDocument, Error> {
        let format_type = FormatType::from_path(&path)?.with_language(lang);
        self.read_file_by_type(path, format_type)
    }

    /// Reads every file, inferring formats from extensions. A file that
    /// fails to read is logged and reported back; the others still load.
    pub fn read_many<I, P>(&mut self, paths: I) -> Vec<(PathBuf, Error)>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut failures = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if let Err(err) = self.read_file_by_extension(path, None) {
                log::warn!("skipping {}: {err}", path.display());
                failures.push((path.to_path_buf(), err));
            }
        }
        failures
    }

    pub fn find(&self, path: &Path) -> Option<&LoadedDocument> {
        self.documents.iter().find(|d| d.path == path)
    }

    /// Writes every document back to the path it was read from.
    pub fn write_to_file(&self) -> Result<(), Error> {
        for loaded in &self.documents {
            write_document(&loaded.document, &loaded.path, &loaded.format, loaded.role)?;
        }
        Ok(())
    }

    /// Dumps all documents as JSON, for debugging and caching.
    pub fn cache_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let documents: Vec<Document> = self.documents.iter().map(|d| d.document.clone()).collect();
        documents.write_to(path)
    }

    /// Loads documents written by [`Codec::cache_to_file`].
    pub fn load_cache<P: AsRef<Path>>(path: P) -> Result<Vec<Document>, Error> {
        Vec::<Document>::read_from(path)
    }
}

/// Reads one file into a [`Document`].
///
/// The language is taken from the format type if given, otherwise from the
/// file itself (PO header, YAML root key), otherwise from the path.
pub fn read_document<P: AsRef<Path>>(path: P, format: &FormatType) -> Result<Document, Error> {
    let path = path.as_ref();
    let mut document = match format {
        FormatType::AndroidStrings(_) => Document::from(AndroidStringsFormat::read_from(path)?),
        FormatType::CSV(_) => Document::from(Vec::<CSVRecord>::read_from(path)?),
        FormatType::Json(_) => Document::from(JsonFormat::read_from(path)?),
        FormatType::Yaml(_) => Document::from(YamlFormat::read_from(path)?),
        FormatType::Markdown(_) => Document::from(MarkdownFormat::read_from(path)?),
        FormatType::Po(_) | FormatType::Pot => Document::from(PoFile::read_from(path)?),
    };

    if let Some(lang) = format.language() {
        document.metadata.language = lang.clone();
    } else if document.metadata.language.is_empty()
        && let Some(lang) = infer_language_from_path(path, format)
    {
        document.metadata.language = lang;
    }

    log::debug!(
        "read {} as {format} ({} nodes, language `{}`)",
        path.display(),
        document.nodes.len(),
        document.metadata.language
    );
    Ok(document)
}

fn encode<F: ResourceFormat>(document: &Document, role: Role) -> Result<Vec<u8>, Error> {
    match role {
        Role::Source => F::marshal(document),
        Role::Target => F::marshal_target(document),
    }
}

/// Serializes a document in the given format.
pub fn marshal(document: &Document, format: &FormatType, role: Role) -> Result<Vec<u8>, Error> {
    match format {
        FormatType::AndroidStrings(_) => encode::<AndroidStringsFormat>(document, role),
        FormatType::CSV(_) => encode::<Vec<CSVRecord>>(document, role),
        FormatType::Json(_) => encode::<JsonFormat>(document, role),
        FormatType::Yaml(_) => encode::<YamlFormat>(document, role),
        FormatType::Markdown(_) => encode::<MarkdownFormat>(document, role),
        FormatType::Po(_) | FormatType::Pot => encode::<PoFile>(document, role),
    }
}

/// Writes a document to `path`, creating parent directories.
pub fn write_document<P: AsRef<Path>>(
    document: &Document,
    path: P,
    format: &FormatType,
    role: Role,
) -> Result<(), Error> {
    let path = path.as_ref();
    let bytes = marshal(document, format, role)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::file_io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| Error::file_io(path, e))
}

/// An empty target document for `language`, shaped by the format's
/// non-translatable policy.
pub fn new_translation_file(source: &Document, format: &FormatType, language: &str) -> Document {
    match format {
        FormatType::AndroidStrings(_) => {
            AndroidStringsFormat::new_translation_file(source, language)
        }
        FormatType::CSV(_) => Vec::<CSVRecord>::new_translation_file(source, language),
        FormatType::Json(_) => JsonFormat::new_translation_file(source, language),
        FormatType::Yaml(_) => YamlFormat::new_translation_file(source, language),
        FormatType::Markdown(_) => MarkdownFormat::new_translation_file(source, language),
        FormatType::Po(_) | FormatType::Pot => PoFile::new_translation_file(source, language),
    }
}

/// What [`sync_file`] did to the target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The target did not exist and was created with this many keys.
    Created { keys: usize },
    /// The target was reconciled with [`sync::sync_keys_with_report`].
    Synced(SyncReport),
    /// The PO target was merged against its template.
    Merged(MergeReport),
}

/// Brings the target file for `language` in line with the source file.
///
/// PO targets of a PO/POT source go through [`msgmerge::merge`]; everything
/// else goes through the key synchronizer. A missing target is created. The
/// target is only rewritten when something changed.
pub fn sync_file<P: AsRef<Path>, Q: AsRef<Path>>(
    source_path: P,
    target_path: Q,
    language: &str,
) -> Result<SyncOutcome, Error> {
    let (source_path, target_path) = (source_path.as_ref(), target_path.as_ref());
    let source_format = FormatType::from_path(source_path)?;
    let target_format = match FormatType::from_path(target_path)? {
        FormatType::Pot => {
            return Err(Error::UnsupportedFormat(format!(
                "{} is a template and cannot be a translation target",
                target_path.display()
            )));
        }
        format => format.with_language(Some(language.to_string())),
    };
    let exists = target_path.exists();

    if matches!(target_format, FormatType::Po(_))
        && matches!(source_format, FormatType::Po(_) | FormatType::Pot)
        && exists
    {
        let template = PoFile::read_from(source_path)?;
        let existing = PoFile::read_from(target_path)?;
        let (merged, report) = msgmerge::merge_with_report(&existing, &template);
        if merged != existing {
            merged.write_to(target_path)?;
        }
        log::info!("merged {} into {}", source_path.display(), target_path.display());
        return Ok(SyncOutcome::Merged(report));
    }

    let source = read_document(source_path, &source_format)?;
    if !exists {
        let target = new_translation_file(&source, &target_format, language);
        write_document(&target, target_path, &target_format, Role::Target)?;
        let keys = target.keys().len();
        log::info!("created {} with {keys} keys", target_path.display());
        return Ok(SyncOutcome::Created { keys });
    }

    let mut target = read_document(target_path, &target_format)?;
    let report = sync::sync_keys_for_language_with_report(&source, &mut target, language);
    if !report.is_noop() {
        write_document(&target, target_path, &target_format, Role::Target)?;
    }
    log::info!(
        "synced {}: {} added, {} replaced, {} removed",
        target_path.display(),
        report.added,
        report.replaced,
        report.removed
    );
    Ok(SyncOutcome::Synced(report))
}

fn normalize_language(candidate: &str) -> Option<String> {
    if !LANGUAGE_REGEX.is_match(candidate) {
        return None;
    }
    candidate
        .parse::<LanguageIdentifier>()
        .ok()
        .map(|lang| lang.to_string())
}

/// Android resource qualifiers: `values-de`, `values-pt-rBR`, `values-b+sr+Latn`.
fn android_language(component: &str) -> Option<String> {
    let qualifier = component.strip_prefix("values-")?;
    let candidate = match qualifier.strip_prefix("b+") {
        Some(bcp47) => bcp47.replace('+', "-"),
        None => qualifier
            .split('-')
            .map(|part| match part.strip_prefix('r') {
                Some(region) if region.len() == 2 => region,
                _ => part,
            })
            .collect::<Vec<_>>()
            .join("-"),
    };
    normalize_language(&candidate)
}

/// Attempts to infer the language from the file path based on format
/// conventions. Templates have no language.
pub fn infer_language_from_path<P: AsRef<Path>>(
    path: P,
    format_type: &FormatType,
) -> Option<String> {
    let path = path.as_ref();
    match format_type {
        FormatType::Pot => None,
        FormatType::AndroidStrings(_) => path
            .components()
            .rev()
            .find_map(|c| android_language(c.as_os_str().to_str()?)),
        _ => {
            let stem = path.file_stem().and_then(|s| s.to_str())?;
            let from_stem = normalize_language(stem).or_else(|| {
                let (_, suffix) = stem.rsplit_once('.')?;
                normalize_language(suffix)
            });
            from_stem.or_else(|| {
                let parent = path.parent()?.file_name()?.to_str()?;
                normalize_language(parent)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_infer_android_language() {
        let format = FormatType::AndroidStrings(None);
        assert_eq!(
            infer_language_from_path("res/values-de/strings.xml", &format),
            Some("de".to_string())
        );
        assert_eq!(
            infer_language_from_path("res/values-pt-rBR/strings.xml", &format),
            Some("pt-BR".to_string())
        );
        assert_eq!(
            infer_language_from_path("res/values-b+sr+Latn/strings.xml", &format),
            Some("sr-Latn".to_string())
        );
        assert_eq!(infer_language_from_path("res/values/strings.xml", &format), None);
        assert_eq!(
            infer_language_from_path("res/values-night/strings.xml", &format),
            None
        );
    }

    #[test]
    fn test_infer_language_from_file_names() {
        assert_eq!(
            infer_language_from_path("po/ru.po", &FormatType::Po(None)),
            Some("ru".to_string())
        );
        assert_eq!(
            infer_language_from_path("po/pt_BR.po", &FormatType::Po(None)),
            Some("pt-BR".to_string())
        );
        assert_eq!(
            infer_language_from_path("config/locales/fr.yml", &FormatType::Yaml(None)),
            Some("fr".to_string())
        );
        assert_eq!(
            infer_language_from_path("locales/es/common.json", &FormatType::Json(None)),
            Some("es".to_string())
        );
        assert_eq!(
            infer_language_from_path("docs/guide.de.md", &FormatType::Markdown(None)),
            Some("de".to_string())
        );
        assert_eq!(
            infer_language_from_path("po/messages.pot", &FormatType::Pot),
            None
        );
    }

    #[test]
    fn test_read_document_infers_language() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("values-fr").join("strings.xml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"<resources><string name="hi">Salut</string></resources>"#).unwrap();

        let document = read_document(&path, &FormatType::AndroidStrings(None)).unwrap();
        assert_eq!(document.metadata.language, "fr");

        let explicit =
            read_document(&path, &FormatType::AndroidStrings(Some("ca".to_string()))).unwrap();
        assert_eq!(explicit.metadata.language, "ca");
    }

    #[test]
    fn test_read_many_collects_failures() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("en.yml");
        let bad = dir.path().join("broken.json");
        let unknown = dir.path().join("notes.txt");
        fs::write(&good, "en:\n  hello: Hello\n").unwrap();
        fs::write(&bad, "{ not json").unwrap();
        fs::write(&unknown, "whatever").unwrap();

        let mut codec = Codec::new();
        let failures = codec.read_many([&good, &bad, &unknown]);

        assert_eq!(codec.documents.len(), 1);
        assert_eq!(codec.documents[0].document.keys(), vec!["hello"]);
        assert_eq!(failures.len(), 2);
        assert!(matches!(failures[0].1, Error::Parse(_)));
        assert!(matches!(failures[1].1, Error::UnknownFormat(_)));
    }

    #[test]
    fn test_codec_write_back_and_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.yml");
        fs::write(&path, "en:\n  hello: Hello\n").unwrap();

        let mut codec = Codec::new();
        let loaded = codec.read_file_by_extension(&path, None).unwrap();
        loaded.document.set("hello", "Hi");
        codec.write_to_file().unwrap();

        let reread = read_document(&path, &FormatType::Yaml(None)).unwrap();
        assert_eq!(reread.get("hello").and_then(|v| v.as_scalar()), Some("Hi"));

        let cache = dir.path().join("cache.json");
        codec.cache_to_file(&cache).unwrap();
        let cached = Codec::load_cache(&cache).unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0], reread);
    }

    #[test]
    fn test_sync_file_creates_then_syncs() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("values").join("strings.xml");
        let target = dir.path().join("values-de").join("strings.xml");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(
            &source,
            r#"<resources>
    <string name="app_name" translatable="false">Demo</string>
    <string name="hello">Hello</string>
</resources>"#,
        )
        .unwrap();

        let outcome = sync_file(&source, &target, "de").unwrap();
        assert_eq!(outcome, SyncOutcome::Created { keys: 1 });
        let written = fs::read_to_string(&target).unwrap();
        assert!(!written.contains("app_name"));

        let again = sync_file(&source, &target, "de").unwrap();
        assert!(matches!(again, SyncOutcome::Synced(report) if report.is_noop()));
    }

    #[test]
    fn test_sync_file_merges_po() {
        let dir = tempdir().unwrap();
        let template = dir.path().join("messages.pot");
        let target = dir.path().join("de.po");
        fs::write(&template, "msgid \"Hello\"\nmsgstr \"\"\n\nmsgid \"New\"\nmsgstr \"\"\n").unwrap();
        fs::write(&target, "msgid \"Hello\"\nmsgstr \"Hallo\"\n\nmsgid \"Gone\"\nmsgstr \"Weg\"\n").unwrap();

        let outcome = sync_file(&template, &target, "de").unwrap();
        match outcome {
            SyncOutcome::Merged(report) => {
                assert_eq!(report.matched, 1);
                assert_eq!(report.added, 1);
                assert_eq!(report.obsoleted, 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        let merged = PoFile::read_from(&target).unwrap();
        assert_eq!(merged.active_entries().count(), 2);
        assert!(merged.entries[2].obsolete);
    }

    #[test]
    fn test_sync_file_rejects_template_target() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("de.po");
        fs::write(&source, "").unwrap();
        assert!(matches!(
            sync_file(&source, dir.path().join("out.pot"), "de"),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
