//! Persistent content fingerprints deciding which units need (re-)translation.
//!
//! The ledger maps `target → unit key → sha256 hex` and lives in a single JSON
//! file per project:
//!
//! ```json
//! {
//!   "version": 1,
//!   "checksums": {
//!     "po/ru.po": { "Hello": "185f8db3..." }
//!   }
//! }
//! ```
//!
//! Record a fingerprint only after the translation it vouches for has been
//! written to the target file; recording earlier can mask an untranslated
//! unit as done forever.

use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::{Error, Result},
    options::LedgerOptions,
    traits::Catalog,
    types::{TranslationUnit, UnitValue},
};

/// Current on-disk format version.
pub const LEDGER_VERSION: u32 = 1;

const SEPARATOR: char = '\0';

/// Hex sha256 of `content`.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Content of a plural message: either form changing invalidates it.
pub fn plural_content(singular: &str, plural: &str) -> String {
    format!("{singular}{SEPARATOR}{plural}")
}

/// Content for key-value formats: renaming a key invalidates it too.
pub fn keyed_content(key: &str, value: &str) -> String {
    format!("{key}{SEPARATOR}{value}")
}

/// How a unit's identity takes part in its fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentScheme {
    /// Only the value.
    #[default]
    Value,
    /// Key and value, for key-value formats.
    KeyValue,
}

/// Fingerprint input for a source unit. Every member of lists, quantity sets
/// and blocks takes part.
pub fn unit_content(unit: &TranslationUnit, scheme: ContentScheme) -> String {
    let value = match &unit.value {
        UnitValue::Scalar(value) => value.clone(),
        UnitValue::List(items) => items.join(&SEPARATOR.to_string()),
        UnitValue::Quantities(forms) => forms
            .iter()
            .map(|(category, value)| format!("{category}={value}"))
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string()),
        UnitValue::Block(block) => plural_content(&block.heading, &block.body),
    };
    match scheme {
        ContentScheme::Value => value,
        ContentScheme::KeyValue => keyed_content(&unit.key, &value),
    }
}

/// Normalizes a target identifier to forward slashes without a leading `./`.
pub fn normalize_target(target: &str) -> String {
    let normalized = target.replace('\\', "/");
    normalized
        .strip_prefix("./")
        .map(str::to_string)
        .unwrap_or(normalized)
}

/// Target identifier for `file`, relative to `project_dir` when possible.
pub fn target_id(project_dir: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(project_dir).unwrap_or(file);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    normalize_target(&joined)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    checksums: BTreeMap<String, BTreeMap<String, String>>,
}

/// Number of targets and recorded keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerStats {
    pub targets: usize,
    pub keys: usize,
}

/// The change ledger. All methods take `&self`; one lock guards the whole
/// map, so it can be shared between worker threads behind an `Arc`.
#[derive(Debug)]
pub struct ChangeLedger {
    path: PathBuf,
    pretty: bool,
    state: Mutex<LedgerFile>,
}

impl ChangeLedger {
    /// An empty ledger that will be saved to `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ChangeLedger {
            path: path.as_ref().to_path_buf(),
            pretty: LedgerOptions::default().pretty,
            state: Mutex::new(LedgerFile {
                version: LEDGER_VERSION,
                checksums: BTreeMap::new(),
            }),
        }
    }

    /// Loads the ledger from `dir` using the default file name.
    ///
    /// A missing file yields an empty ledger. A malformed file is an error:
    /// treating it as empty would silently re-translate everything.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::load_with(dir, &LedgerOptions::default())
    }

    pub fn load_with<P: AsRef<Path>>(dir: P, options: &LedgerOptions) -> Result<Self> {
        let path = dir.as_ref().join(&options.file_name);
        let mut ledger = ChangeLedger::new(&path);
        ledger.pretty = options.pretty;

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("no change ledger at {}, starting empty", path.display());
                return Ok(ledger);
            }
            Err(e) => return Err(Error::file_io(&path, e)),
        };
        let mut file: LedgerFile =
            serde_json::from_slice(&bytes).map_err(|source| Error::LedgerParse {
                path: path.clone(),
                source,
            })?;

        if file.version > LEDGER_VERSION {
            return Err(Error::LedgerVersion {
                path,
                found: file.version,
                supported: LEDGER_VERSION,
            });
        }
        file.version = LEDGER_VERSION;

        log::info!(
            "loaded change ledger {} ({} targets)",
            path.display(),
            file.checksums.len()
        );
        ledger.state = Mutex::new(file);
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> u32 {
        self.state().version
    }

    fn state(&self) -> MutexGuard<'_, LedgerFile> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True when no fingerprint is recorded for `(target, key)` or the
    /// recorded one differs from `content`'s.
    pub fn is_changed(&self, target: &str, key: &str, content: &str) -> bool {
        let target = normalize_target(target);
        let state = self.state();
        state
            .checksums
            .get(&target)
            .and_then(|keys| keys.get(key))
            .is_none_or(|recorded| *recorded != fingerprint(content))
    }

    /// The subset of `entries` (key → content) that needs translation. Use it
    /// as the single gate in front of any translation provider.
    pub fn filter_changed(
        &self,
        target: &str,
        entries: &HashMap<String, String>,
    ) -> HashMap<String, String> {
        let target = normalize_target(target);
        let state = self.state();
        let recorded = state.checksums.get(&target);
        entries
            .iter()
            .filter(|(key, content)| {
                recorded
                    .and_then(|keys| keys.get(key.as_str()))
                    .is_none_or(|hash| *hash != fingerprint(content))
            })
            .map(|(key, content)| (key.clone(), content.clone()))
            .collect()
    }

    /// Keys of `source`'s translatable units that changed since they were
    /// last recorded for `target`, in document order.
    pub fn changed_units<C: Catalog + ?Sized>(
        &self,
        target: &str,
        source: &C,
        scheme: ContentScheme,
    ) -> Vec<String> {
        let target = normalize_target(target);
        let state = self.state();
        let recorded = state.checksums.get(&target);
        source
            .translatable_units()
            .into_iter()
            .filter(|unit| {
                recorded
                    .and_then(|keys| keys.get(&unit.key))
                    .is_none_or(|hash| *hash != fingerprint(&unit_content(unit, scheme)))
            })
            .map(|unit| unit.key.clone())
            .collect()
    }

    /// Records the fingerprint of one unit's content.
    pub fn update(&self, target: &str, key: &str, content: &str) {
        self.update_batch(target, [(key, content)]);
    }

    /// Records fingerprints for many units under one lock acquisition.
    pub fn update_batch<I, K, V>(&self, target: &str, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let target = normalize_target(target);
        let mut state = self.state();
        let keys = state.checksums.entry(target).or_default();
        for (key, content) in entries {
            keys.insert(key.as_ref().to_string(), fingerprint(content.as_ref()));
        }
    }

    /// Records fingerprints for the given units of `source`.
    pub fn record_units<C: Catalog + ?Sized>(
        &self,
        target: &str,
        source: &C,
        keys: &[String],
        scheme: ContentScheme,
    ) {
        let units = source.translatable_units();
        let entries = units
            .into_iter()
            .filter(|unit| keys.contains(&unit.key))
            .map(|unit| (unit.key.clone(), unit_content(unit, scheme)));
        self.update_batch(target, entries);
    }

    /// Drops fingerprints of keys not in `current_keys`. Returns how many
    /// were removed.
    pub fn clean<I, K>(&self, target: &str, current_keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let target = normalize_target(target);
        let current: std::collections::HashSet<String> = current_keys
            .into_iter()
            .map(|k| k.as_ref().to_string())
            .collect();
        let mut state = self.state();
        let Some(keys) = state.checksums.get_mut(&target) else {
            return 0;
        };
        let before = keys.len();
        keys.retain(|key, _| current.contains(key));
        let removed = before - keys.len();
        if keys.is_empty() {
            state.checksums.remove(&target);
        }
        if removed > 0 {
            log::debug!("cleaned {} stale fingerprints from {}", removed, target);
        }
        removed
    }

    /// Drops every fingerprint of `target`. Returns whether it existed.
    pub fn remove_target(&self, target: &str) -> bool {
        let target = normalize_target(target);
        self.state().checksums.remove(&target).is_some()
    }

    pub fn targets(&self) -> Vec<String> {
        self.state().checksums.keys().cloned().collect()
    }

    pub fn stats(&self) -> LedgerStats {
        let state = self.state();
        LedgerStats {
            targets: state.checksums.len(),
            keys: state.checksums.values().map(BTreeMap::len).sum(),
        }
    }

    /// Rewrites the whole ledger file (temp file, then rename).
    pub fn save(&self) -> Result<()> {
        let bytes = {
            let state = self.state();
            if self.pretty {
                serde_json::to_vec_pretty(&*state)?
            } else {
                serde_json::to_vec(&*state)?
            }
        };
        write_atomic(&self.path, &bytes)?;
        log::info!("saved change ledger {}", self.path.display());
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::file_io(parent, e))?;
    }

    let tmp = tmp_path(path);
    fs::write(&tmp, bytes).map_err(|e| Error::file_io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::file_io(path, e))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "ledger".to_string());
    path.with_file_name(format!("{file_name}.tmp"))
}
