//! # sift - locator queries over JSON and YAML records
//!
//! The `sift` binary runs `sift-locator` finders over records described by a
//! YAML schema. This library holds everything but argument parsing so it can
//! be tested without spawning the binary.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let finder = sift_cli::load_finder(
//!     Path::new("builds.schema.yaml"),
//!     Path::new("builds.json"),
//!     None,
//! )?;
//! let report = sift_cli::commands::find(&finder, "status:failure,count:10")?;
//! println!("{}", report.summary());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod commands;
pub mod entity;
pub mod error;
pub mod output;
pub mod record;
pub mod schema;

use std::path::Path;

use sift_locator::{EngineSettings, Finder};
use tracing::debug;

pub use entity::record_finder;
pub use error::ConfigError;
pub use output::{render, Format, TextView};
pub use record::Record;
pub use schema::{Field, FieldKind, Schema};

/// Loads the schema, the records and optional settings overrides.
///
/// Values in the settings file replace the schema's `settings:` block.
pub fn load_finder(
    schema: &Path,
    items: &Path,
    settings: Option<&Path>,
) -> Result<Finder<Record>, ConfigError> {
    let mut schema = Schema::load(schema)?;
    if let Some(path) = settings {
        let overrides = EngineSettings::from_yaml(&error::read_file(path)?)?;
        schema.settings = schema.settings.overlay(overrides);
    }
    let records = record::load(items)?;
    debug!(records = records.len(), settings = ?schema.settings, "loaded");
    record_finder(&schema, records)
}

/// Loads the schema and builds a finder without records, for `describe`.
pub fn load_schema_finder(schema: &Path) -> Result<Finder<Record>, ConfigError> {
    record_finder(&Schema::load(schema)?, Vec::new())
}
