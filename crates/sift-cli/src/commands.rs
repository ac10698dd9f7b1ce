//! Command implementations. Each returns a serializable view; rendering is
//! left to [`crate::output`].

use serde::Serialize;
use sift_locator::syntax::{self, ParsedLocator, RawValue};
use sift_locator::{DimensionKind, DimensionSpec, Finder};
use tracing::info;

use crate::record::Record;

/// One page of `find` results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindReport {
    pub items: Vec<Record>,
    pub count: usize,
    pub processed: usize,
    pub lookup_limit_reached: bool,
}

impl FindReport {
    /// One-line summary, e.g. `3 items (12 processed, lookup limit reached)`.
    pub fn summary(&self) -> String {
        let noun = if self.count == 1 { "item" } else { "items" };
        let limit = if self.lookup_limit_reached {
            ", lookup limit reached"
        } else {
            ""
        };
        format!("{} {noun} ({} processed{limit})", self.count, self.processed)
    }
}

pub fn find(finder: &Finder<Record>, locator: &str) -> sift_locator::Result<FindReport> {
    let result = finder.get_items(locator)?;
    info!(
        locator,
        count = result.len(),
        processed = result.processed,
        "find"
    );
    Ok(FindReport {
        count: result.len(),
        processed: result.processed,
        lookup_limit_reached: result.lookup_limit_reached,
        items: result.items,
    })
}

pub fn get(finder: &Finder<Record>, locator: &str) -> sift_locator::Result<Record> {
    finder.get_item(locator)
}

/// An advertised dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionInfo {
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub multiple: bool,
    pub default_filter: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&DimensionSpec> for DimensionInfo {
    fn from(spec: &DimensionSpec) -> Self {
        let values = match spec.kind() {
            DimensionKind::EnumSet(legal) => legal.clone(),
            _ => Vec::new(),
        };
        DimensionInfo {
            name: spec.name().to_string(),
            kind: spec.kind().to_string(),
            values,
            default: spec.default().map(str::to_string),
            multiple: spec.is_multiple(),
            default_filter: spec.participates_in_default_filter(),
            description: spec.get_description().map(str::to_string),
        }
    }
}

pub fn describe(finder: &Finder<Record>) -> Vec<DimensionInfo> {
    finder.describe().into_iter().map(DimensionInfo::from).collect()
}

/// The top level of a parsed locator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single: Option<ParsedValue>,
    pub dimensions: Vec<ParsedDimension>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedValue {
    pub value: String,
    /// Base64-decoded, never parsed again.
    pub literal: bool,
}

impl From<RawValue> for ParsedValue {
    fn from(raw: RawValue) -> Self {
        ParsedValue {
            value: raw.text,
            literal: raw.literal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDimension {
    pub name: String,
    #[serde(flatten)]
    pub value: ParsedValue,
}

pub fn parse(locator: &str) -> sift_locator::Result<ParsedView> {
    let view = match syntax::parse(locator)? {
        ParsedLocator::Single(raw) => ParsedView {
            single: Some(raw.into()),
            dimensions: Vec::new(),
        },
        ParsedLocator::Dimensions(entries) => ParsedView {
            single: None,
            dimensions: entries
                .into_iter()
                .map(|(name, raw)| ParsedDimension {
                    name,
                    value: raw.into(),
                })
                .collect(),
        },
    };
    Ok(view)
}
