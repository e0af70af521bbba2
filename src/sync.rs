//! Reconciles a per-language target document against its source document.
//!
//! The target's translatable keys converge on the source's: new keys are
//! added with empty values, keys gone from the source are pruned, and
//! existing translations are kept unless the unit's shape changed (its kind,
//! list length, quantity categories or block level).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    options::{NonTranslatablePolicy, SyncOptions},
    traits::Catalog,
    types::{Document, Node, TranslationUnit},
};

/// Counters describing what [`sync_keys_with_report`] did to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Keys that were missing from the target.
    pub added: usize,
    /// Keys whose shape changed in the source; their old value was dropped.
    pub replaced: usize,
    /// Keys no longer present in the source.
    pub removed: usize,
    /// Keys kept as they were.
    pub unchanged: usize,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.replaced == 0 && self.removed == 0
    }
}

/// Makes `target`'s translatable keys exactly equal `source`'s and returns the
/// number of keys added (replacements count as added).
///
/// Calling it twice in a row is a no-op the second time.
pub fn sync_keys<S, T>(source: &S, target: &mut T) -> usize
where
    S: Catalog + ?Sized,
    T: Catalog + ?Sized,
{
    let report = sync_keys_with_report(source, target);
    report.added + report.replaced
}

/// Like [`sync_keys`], returning the full report.
pub fn sync_keys_with_report<S, T>(source: &S, target: &mut T) -> SyncReport
where
    S: Catalog + ?Sized,
    T: Catalog + ?Sized,
{
    let source_units: HashMap<&str, &TranslationUnit> = source
        .translatable_units()
        .into_iter()
        .map(|u| (u.key.as_str(), u))
        .collect();

    let mut report = SyncReport::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(source_units.len());

    let nodes = std::mem::take(target.nodes_mut());
    let mut synced = Vec::with_capacity(nodes.len() + source_units.len());

    for node in nodes {
        let Node::Unit(unit) = node else {
            synced.push(node);
            continue;
        };

        let Some(source_unit) = source_units.get(unit.key.as_str()) else {
            if unit.translatable {
                report.removed += 1;
            } else {
                synced.push(Node::Unit(unit));
            }
            continue;
        };

        if seen.contains(&unit.key) {
            // Duplicate key in the target; the first occurrence wins.
            report.removed += 1;
            continue;
        }
        seen.insert(unit.key.clone());

        if !unit.translatable || !unit.value.same_shape(&source_unit.value) {
            log::debug!(
                "replacing `{}`: target shape {:?} no longer matches source {:?}",
                unit.key,
                unit.kind(),
                source_unit.kind()
            );
            synced.push(Node::Unit(source_unit.cleared()));
            report.replaced += 1;
        } else {
            synced.push(Node::Unit(unit));
            report.unchanged += 1;
        }
    }

    for source_unit in source.translatable_units() {
        if !seen.contains(&source_unit.key) {
            seen.insert(source_unit.key.clone());
            synced.push(Node::Unit(source_unit.cleared()));
            report.added += 1;
        }
    }

    *target.nodes_mut() = synced;

    log::debug!(
        "synced keys: {} added, {} replaced, {} removed, {} unchanged",
        report.added,
        report.replaced,
        report.removed,
        report.unchanged
    );
    report
}

/// [`sync_keys`] for documents that also carry a Rails-style root locale
/// key: the target's root key is rewritten to `language`.
pub fn sync_keys_for_language(source: &Document, target: &mut Document, language: &str) -> usize {
    let report = sync_keys_for_language_with_report(source, target, language);
    report.added + report.replaced
}

/// [`sync_keys_for_language`] returning the full [`SyncReport`].
pub fn sync_keys_for_language_with_report(
    source: &Document,
    target: &mut Document,
    language: &str,
) -> SyncReport {
    let report = sync_keys_with_report(source, target);
    if source.metadata.root_key.is_some() {
        target.metadata.root_key = Some(language.to_string());
    }
    if !language.is_empty() {
        target.metadata.language = language.to_string();
    }
    report
}

/// Builds an empty target document from `source`.
///
/// Translatable units keep their kind and shape with cleared values.
/// Non-translatable units are copied or omitted per `options`. Comments,
/// verbatim blocks and metadata are preserved, with the language (and root
/// locale key, if any) rewritten to the target language.
pub fn new_translation_file(source: &Document, options: &SyncOptions) -> Document {
    let mut metadata = source.metadata.clone();
    if let Some(language) = options.target_language.as_deref() {
        metadata.language = language.to_string();
        if metadata.root_key.is_some() {
            metadata.root_key = Some(language.to_string());
        }
    }

    let nodes = source
        .nodes
        .iter()
        .filter_map(|node| match node {
            Node::Unit(unit) if unit.translatable => Some(Node::Unit(unit.cleared())),
            Node::Unit(unit) => match options.non_translatable {
                NonTranslatablePolicy::Copy => Some(Node::Unit(unit.clone())),
                NonTranslatablePolicy::Omit => None,
            },
            other => Some(other.clone()),
        })
        .collect();

    Document { metadata, nodes }
}
