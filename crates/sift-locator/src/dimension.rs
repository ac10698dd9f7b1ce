//! Dimension declarations and typed dimension values.
//!
//! A [`DimensionSpec`] declares one dimension a finder understands: its name,
//! the [`DimensionKind`] of its value, an optional default and whether it is
//! advertised. Declarations are what the finder checks a locator against
//! before any item is looked at.

use std::fmt;

use crate::condition::{self, ConditionDefaults};
use crate::error::{LocatorError, Result};
use crate::locator::Locator;
use crate::syntax::RawValue;
use crate::time;

/// Value type of a dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionKind {
    /// Free text.
    String,
    /// Signed 64-bit integer.
    Long,
    /// Tri-state boolean: `true`, `false` or `any`.
    Boolean,
    /// One or more tokens from a fixed, case-insensitive set.
    EnumSet(Vec<String>),
    /// A nested locator resolved by the finder itself.
    Nested,
    /// A date/time filter with the names of its anchor dimensions, see
    /// [`crate::time`].
    TimeCondition(Vec<String>),
    /// A text matching condition, see [`crate::condition`].
    ValueCondition(ConditionDefaults),
}

impl DimensionKind {
    /// Enum set from any list of string-like symbols.
    pub fn enum_set<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DimensionKind::EnumSet(values.into_iter().map(Into::into).collect())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionKind::String => "string",
            DimensionKind::Long => "long",
            DimensionKind::Boolean => "boolean",
            DimensionKind::EnumSet(_) => "enum",
            DimensionKind::Nested => "locator",
            DimensionKind::TimeCondition(_) => "time condition",
            DimensionKind::ValueCondition(_) => "value condition",
        }
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declaration of one dimension.
///
/// # Example
///
/// ```
/// use sift_locator::{DimensionKind, DimensionSpec};
///
/// let spec = DimensionSpec::new("personal", DimensionKind::Boolean)
///     .default_value("false")
///     .in_default_filter()
///     .description("include personal builds");
/// assert!(spec.participates_in_default_filter());
/// ```
#[derive(Debug, Clone)]
pub struct DimensionSpec {
    name: String,
    kind: DimensionKind,
    default: Option<String>,
    hidden: bool,
    multiple: bool,
    default_filter: bool,
    description: Option<String>,
}

impl DimensionSpec {
    pub fn new(name: impl Into<String>, kind: DimensionKind) -> Self {
        DimensionSpec {
            name: name.into(),
            kind,
            default: None,
            hidden: false,
            multiple: false,
            default_filter: false,
            description: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, DimensionKind::String)
    }

    pub fn long(name: impl Into<String>) -> Self {
        Self::new(name, DimensionKind::Long)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, DimensionKind::Boolean)
    }

    pub fn nested(name: impl Into<String>) -> Self {
        Self::new(name, DimensionKind::Nested)
    }

    pub fn time(name: impl Into<String>) -> Self {
        Self::new(name, DimensionKind::TimeCondition(Vec::new()))
    }

    /// A time dimension whose conditions may name the given anchors, e.g.
    /// `build` for `finishDate:(build:(id:1))`.
    pub fn anchored_time<I, S>(name: impl Into<String>, anchors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            DimensionKind::TimeCondition(anchors.into_iter().map(Into::into).collect()),
        )
    }

    /// Value applied when the dimension is absent.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Accepted but not advertised, and exempt from the unused check.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// The dimension may be given more than once.
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// The default value applies only while default filtering is active.
    pub fn in_default_filter(mut self) -> Self {
        self.default_filter = true;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &DimensionKind {
        &self.kind
    }

    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub fn participates_in_default_filter(&self) -> bool {
        self.default_filter
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Checks repetition and value syntax without marking the dimension used.
    pub fn validate(&self, locator: &Locator) -> Result<()> {
        let values = locator.raw_values(&self.name);
        if values.len() > 1 && !self.multiple {
            return Err(LocatorError::RepeatedDimension {
                name: self.name.clone(),
                count: values.len(),
            });
        }
        for value in values {
            self.validate_value(value)?;
        }
        Ok(())
    }

    fn validate_value(&self, value: &RawValue) -> Result<()> {
        match &self.kind {
            DimensionKind::String => Ok(()),
            DimensionKind::Long => parse_long(&self.name, &value.text).map(|_| ()),
            DimensionKind::Boolean => parse_boolean(&self.name, &value.text).map(|_| ()),
            DimensionKind::EnumSet(legal) => {
                parse_enum_tokens(&self.name, &value.text, legal).map(|_| ())
            }
            DimensionKind::Nested => Locator::from_raw(value).map(|_| ()),
            DimensionKind::TimeCondition(anchors) => time::validate(&self.name, value, anchors),
            DimensionKind::ValueCondition(defaults) => {
                condition::validate(&self.name, value, defaults)
            }
        }
    }
}

/// Tri-state boolean filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BooleanFilter {
    /// Do not filter on this dimension.
    #[default]
    Any,
    True,
    False,
}

impl BooleanFilter {
    /// Returns `true` if an item with the given property value passes.
    pub fn includes(self, actual: bool) -> bool {
        is_included_by_boolean_filter(self.as_option(), actual)
    }

    pub fn as_option(self) -> Option<bool> {
        match self {
            BooleanFilter::Any => None,
            BooleanFilter::True => Some(true),
            BooleanFilter::False => Some(false),
        }
    }

    pub fn is_any(self) -> bool {
        self == BooleanFilter::Any
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BooleanFilter::Any => "any",
            BooleanFilter::True => "true",
            BooleanFilter::False => "false",
        }
    }
}

impl From<Option<bool>> for BooleanFilter {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => BooleanFilter::Any,
            Some(true) => BooleanFilter::True,
            Some(false) => BooleanFilter::False,
        }
    }
}

impl fmt::Display for BooleanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `None` always includes; otherwise the item's value must be equal.
pub fn is_included_by_boolean_filter(filter: Option<bool>, actual: bool) -> bool {
    match filter {
        None => true,
        Some(expected) => expected == actual,
    }
}

/// Enum types usable with [`Locator::get_enum_set`].
///
/// # Example
///
/// ```
/// use sift_locator::DimensionEnum;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum State {
///     Queued,
///     Running,
///     Finished,
/// }
///
/// impl DimensionEnum for State {
///     fn symbols() -> &'static [(&'static str, Self)] {
///         &[
///             ("queued", State::Queued),
///             ("running", State::Running),
///             ("finished", State::Finished),
///         ]
///     }
/// }
///
/// assert_eq!(State::from_symbol("RUNNING"), Some(State::Running));
/// ```
pub trait DimensionEnum: Sized + Copy + 'static {
    /// Locator spelling of every variant.
    fn symbols() -> &'static [(&'static str, Self)];

    /// Case-insensitive lookup.
    fn from_symbol(token: &str) -> Option<Self> {
        Self::symbols()
            .iter()
            .find(|(symbol, _)| symbol.eq_ignore_ascii_case(token))
            .map(|(_, value)| *value)
    }

    /// All symbols, for error messages and dimension declarations.
    fn symbol_names() -> Vec<String> {
        Self::symbols().iter().map(|(s, _)| s.to_string()).collect()
    }
}

pub(crate) fn parse_long(dimension: &str, text: &str) -> Result<i64> {
    text.trim()
        .parse::<i64>()
        .map_err(|e| LocatorError::conversion(dimension, text, format!("not a number: {e}")))
}

pub(crate) fn parse_boolean(dimension: &str, text: &str) -> Result<BooleanFilter> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => Ok(BooleanFilter::True),
        "false" | "off" | "no" => Ok(BooleanFilter::False),
        "any" | "all" => Ok(BooleanFilter::Any),
        _ => Err(LocatorError::conversion(
            dimension,
            text,
            "expected one of: true, false, any",
        )),
    }
}

/// Splits an enum value into tokens and maps each to its legal spelling.
pub(crate) fn parse_enum_tokens(
    dimension: &str,
    text: &str,
    legal: &[String],
) -> Result<Vec<String>> {
    text.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            legal
                .iter()
                .find(|symbol| symbol.eq_ignore_ascii_case(token))
                .cloned()
                .ok_or_else(|| {
                    LocatorError::conversion(
                        dimension,
                        token,
                        format!("expected one of: {}", legal.join(", ")),
                    )
                })
        })
        .collect()
}
