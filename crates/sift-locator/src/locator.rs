//! The parsed, retrieval-scoped view of one locator.
//!
//! A [`Locator`] is immutable apart from its bookkeeping: every getter marks
//! the dimension it reads as used, and [`Locator::check_unused`] reports the
//! dimensions nobody read. Marking is idempotent, so reading a dimension twice
//! is harmless.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::condition::{ConditionDefaults, ValueCondition};
use crate::dimension::{self, BooleanFilter, DimensionEnum};
use crate::error::{LocatorError, Result};
use crate::syntax::{self, ParsedLocator, RawValue, BASE64_PREFIX};
use crate::time::{TimeCondition, TimeConditionParser};

/// A parsed locator.
///
/// Not `Sync`: the used-set is interior mutable and belongs to one retrieval.
///
/// # Example
///
/// ```
/// use sift_locator::Locator;
///
/// let locator = Locator::parse("name:abc,count:10").unwrap();
/// assert_eq!(locator.get_long("count").unwrap(), Some(10));
/// assert_eq!(locator.unused_dimensions(), vec!["name"]);
/// ```
#[derive(Debug, Clone)]
pub struct Locator {
    text: String,
    single: Option<RawValue>,
    entries: Vec<(String, RawValue)>,
    used: RefCell<BTreeSet<String>>,
    ignored: RefCell<BTreeSet<String>>,
}

impl Locator {
    /// Parses locator text.
    pub fn parse(text: &str) -> Result<Self> {
        let locator = match syntax::parse(text)? {
            ParsedLocator::Single(value) => Locator::with_single(text.to_string(), value),
            ParsedLocator::Dimensions(entries) => Locator::with_entries(text.to_string(), entries),
        };
        Ok(locator)
    }

    /// Builds a locator from one dimension value.
    ///
    /// Literal (base64-decoded) values become single-value locators and are
    /// never parsed again.
    pub fn from_raw(value: &RawValue) -> Result<Self> {
        if value.literal {
            let text = syntax::escape_single_value(&value.text);
            return Ok(Locator::with_single(text, value.clone()));
        }
        Locator::parse(&value.text)
    }

    /// A locator with exactly one `name:value` dimension.
    pub fn from_dimension(name: &str, value: &str) -> Self {
        Locator::from_entries(vec![(name.to_string(), RawValue::plain(value))])
    }

    /// A locator over already split dimension entries.
    pub(crate) fn from_entries(entries: Vec<(String, RawValue)>) -> Self {
        let text = render(&entries);
        Locator::with_entries(text, entries)
    }

    fn with_single(text: String, value: RawValue) -> Self {
        Locator {
            text,
            single: Some(value),
            entries: Vec::new(),
            used: RefCell::default(),
            ignored: RefCell::default(),
        }
    }

    fn with_entries(text: String, entries: Vec<(String, RawValue)>) -> Self {
        Locator {
            text,
            single: None,
            entries,
            used: RefCell::default(),
            ignored: RefCell::default(),
        }
    }

    /// The text this locator was parsed from.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_single_value(&self) -> bool {
        self.single.is_some()
    }

    /// `true` for the empty locator, which matches every item.
    pub fn is_empty(&self) -> bool {
        self.single.is_none() && self.entries.is_empty()
    }

    /// The single value, if the locator has no dimension structure.
    pub fn single_value(&self) -> Option<&str> {
        self.single.as_ref().map(|v| v.text.as_str())
    }

    /// Distinct dimension names in order of first appearance.
    pub fn dimension_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in &self.entries {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    pub fn has_dimension(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// All dimension entries in the order given.
    pub(crate) fn entries(&self) -> &[(String, RawValue)] {
        &self.entries
    }

    /// Values of a dimension without marking it used.
    pub(crate) fn raw_values(&self, name: &str) -> Vec<&RawValue> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v)
            .collect()
    }

    /// Marks a dimension as consumed.
    pub fn mark_used(&self, name: &str) {
        if !self.used.borrow().contains(name) {
            self.used.borrow_mut().insert(name.to_string());
        }
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.borrow().contains(name)
    }

    /// Exempts a dimension from the unused check.
    pub fn ignore(&self, name: &str) {
        self.ignored.borrow_mut().insert(name.to_string());
    }

    fn single_raw(&self, name: &str) -> Result<Option<&RawValue>> {
        let values = self.raw_values(name);
        match values.len() {
            0 => Ok(None),
            1 => {
                self.mark_used(name);
                Ok(Some(values[0]))
            }
            count => Err(LocatorError::RepeatedDimension {
                name: name.to_string(),
                count,
            }),
        }
    }

    /// Value of a dimension that may be given at most once.
    pub fn get_single_dimension_value(&self, name: &str) -> Result<Option<String>> {
        Ok(self.single_raw(name)?.map(|v| v.text.clone()))
    }

    /// All values of a possibly repeated dimension.
    pub fn get_dimension_values(&self, name: &str) -> Vec<String> {
        let values: Vec<String> = self
            .raw_values(name)
            .into_iter()
            .map(|v| v.text.clone())
            .collect();
        if !values.is_empty() {
            self.mark_used(name);
        }
        values
    }

    pub fn get_long(&self, name: &str) -> Result<Option<i64>> {
        self.single_raw(name)?
            .map(|v| dimension::parse_long(name, &v.text))
            .transpose()
    }

    /// Tri-state boolean; an absent dimension is [`BooleanFilter::Any`].
    pub fn get_boolean(&self, name: &str) -> Result<BooleanFilter> {
        match self.single_raw(name)? {
            Some(v) => dimension::parse_boolean(name, &v.text),
            None => Ok(BooleanFilter::Any),
        }
    }

    /// Enum tokens from every occurrence of the dimension, in their legal
    /// spelling.
    pub fn get_enum_values(&self, name: &str, legal: &[String]) -> Result<Option<Vec<String>>> {
        let values = self.raw_values(name);
        if values.is_empty() {
            return Ok(None);
        }
        self.mark_used(name);
        let mut tokens = Vec::new();
        for value in values {
            for token in dimension::parse_enum_tokens(name, &value.text, legal)? {
                if !tokens.contains(&token) {
                    tokens.push(token);
                }
            }
        }
        Ok(Some(tokens))
    }

    /// Typed variant of [`Locator::get_enum_values`].
    pub fn get_enum_set<E: DimensionEnum>(&self, name: &str) -> Result<Option<Vec<E>>> {
        let legal = E::symbol_names();
        let Some(tokens) = self.get_enum_values(name, &legal)? else {
            return Ok(None);
        };
        Ok(Some(
            tokens.iter().filter_map(|t| E::from_symbol(t)).collect(),
        ))
    }

    /// A single nested locator.
    pub fn get_nested(&self, name: &str) -> Result<Option<Locator>> {
        self.single_raw(name)?.map(Locator::from_raw).transpose()
    }

    /// Every occurrence of a repeatable nested locator dimension.
    pub fn get_nested_all(&self, name: &str) -> Result<Vec<Locator>> {
        let values = self.raw_values(name);
        if !values.is_empty() {
            self.mark_used(name);
        }
        values.into_iter().map(Locator::from_raw).collect()
    }

    pub fn get_value_condition(
        &self,
        name: &str,
        defaults: &ConditionDefaults,
    ) -> Result<Option<ValueCondition>> {
        self.single_raw(name)?
            .map(|v| ValueCondition::parse(name, v, defaults))
            .transpose()
    }

    pub fn get_time_condition(
        &self,
        name: &str,
        parser: &TimeConditionParser,
    ) -> Result<Option<TimeCondition>> {
        self.single_raw(name)?
            .map(|v| parser.parse(name, v))
            .transpose()
    }

    /// Names present but neither used nor ignored, in order of appearance.
    pub fn unused_dimensions(&self) -> Vec<String> {
        let used = self.used.borrow();
        let ignored = self.ignored.borrow();
        self.dimension_names()
            .into_iter()
            .filter(|name| !used.contains(*name) && !ignored.contains(*name))
            .map(str::to_string)
            .collect()
    }

    pub fn check_unused(&self) -> Result<()> {
        let names = self.unused_dimensions();
        if names.is_empty() {
            Ok(())
        } else {
            Err(LocatorError::UnusedDimension { names })
        }
    }

    /// Adds `name:value` unless the dimension is already present.
    pub fn with_default(mut self, name: &str, value: &str) -> Self {
        if !self.is_single_value() && !self.has_dimension(name) {
            self.entries
                .push((name.to_string(), RawValue::plain(value)));
        }
        self
    }

    /// A fresh locator over the entries whose name is not in `names`.
    pub(crate) fn without(&self, names: &[&str]) -> Locator {
        Locator::from_entries(
            self.entries
                .iter()
                .filter(|(n, _)| !names.contains(&n.as_str()))
                .cloned()
                .collect(),
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

fn render(entries: &[(String, RawValue)]) -> String {
    entries
        .iter()
        .map(|(name, value)| format!("{name}:{}", render_value(value)))
        .collect::<Vec<_>>()
        .join(",")
}

// Plain values always have balanced parentheses, so wrapping keeps them intact.
fn render_value(value: &RawValue) -> String {
    if value.literal {
        format!("{BASE64_PREFIX}{}", URL_SAFE_NO_PAD.encode(&value.text))
    } else if value.text.contains(',') || value.text.starts_with(['(', '$']) {
        format!("({})", value.text)
    } else {
        value.text.clone()
    }
}
