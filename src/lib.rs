#![forbid(unsafe_code)]
//! Translation synchronization and change tracking for localization files.
//!
//! Keeps per-language target files structurally in line with an evolving
//! source file, and remembers what was last translated so only stale units
//! are sent for re-translation. All formats go through the unified
//! [`Document`] model.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use langsync::{ChangeLedger, codec};
//!
//! // Create or update res/values-de/strings.xml from the default strings.
//! codec::sync_file("res/values/strings.xml", "res/values-de/strings.xml", "de")?;
//!
//! // Only re-translate what changed since the last run.
//! let ledger = ChangeLedger::load(".")?;
//! if ledger.is_changed("res/values-de/strings.xml", "hello", "Hello") {
//!     // ... translate, then record it
//!     ledger.update("res/values-de/strings.xml", "hello", "Hello");
//! }
//! ledger.save()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Supported Formats
//!
//! - **gettext PO/POT**: full entry model, plus `msgmerge`-style template merging
//! - **Android `strings.xml`**: strings, string arrays and plurals
//! - **Rails YAML**, **i18next JSON**, **Markdown** and two-column **CSV**

pub mod codec;
pub mod error;
pub mod formats;
pub mod ledger;
pub mod msgmerge;
pub mod options;
pub mod sync;
pub mod traits;
pub mod types;

// Re-export most used types for easy consumption
pub use crate::{
    codec::{Codec, SyncOutcome, sync_file},
    error::{Error, Result},
    formats::FormatType,
    ledger::{ChangeLedger, LedgerStats},
    msgmerge::{MergeReport, merge},
    options::{LedgerOptions, NonTranslatablePolicy, SyncOptions},
    sync::{SyncReport, new_translation_file, sync_keys},
    traits::{Catalog, Parser, ResourceFormat},
    types::{Block, Document, Metadata, Node, PluralCategory, Stats, TranslationUnit, UnitValue},
};
