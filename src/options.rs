//! Options controlling target-file creation and ledger persistence.

use serde::{Deserialize, Serialize};

/// What a format does with non-translatable units in target files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonTranslatablePolicy {
    /// Copy them verbatim from the source.
    #[default]
    Copy,
    /// Leave them out; the platform falls back to the source file.
    Omit,
}

/// Behavior options for [`crate::sync::new_translation_file`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncOptions {
    /// Language written into the new document's metadata (and its root
    /// locale key, when the source has one).
    pub target_language: Option<String>,
    pub non_translatable: NonTranslatablePolicy,
}

impl SyncOptions {
    /// Creates default sync options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target language.
    pub fn with_target_language(mut self, language: Option<String>) -> Self {
        self.target_language = language;
        self
    }

    /// Sets the non-translatable policy.
    pub fn with_non_translatable(mut self, policy: NonTranslatablePolicy) -> Self {
        self.non_translatable = policy;
        self
    }
}

/// Default file name of the change ledger inside a project directory.
pub const DEFAULT_LEDGER_FILE: &str = ".langsync-checksums.json";

/// Options for [`crate::ledger::ChangeLedger::load_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOptions {
    pub file_name: String,
    /// Pretty-print the JSON on save, for readable diffs in version control.
    pub pretty: bool,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        LedgerOptions {
            file_name: DEFAULT_LEDGER_FILE.to_string(),
            pretty: true,
        }
    }
}

impl LedgerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}
