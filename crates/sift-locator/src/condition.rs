//! Text matching conditions.
//!
//! A value condition is given either as a bare value (`tag:aaa`) or as a
//! structured sub-locator (`tag:(name:aaa,matchType:starts-with,ignoreCase:true)`).
//! Which match type and which case sensitivity apply by default is decided by
//! the call site through [`ConditionDefaults`], separately for the two forms.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};

use crate::dimension::{parse_boolean, BooleanFilter};
use crate::error::{LocatorError, Result};
use crate::locator::Locator;
use crate::syntax::RawValue;

/// How a condition compares its value with an item's value.
///
/// - **Text**: `Equals`, `DoesNotEqual`, `StartsWith`, `EndsWith`, `Contains`,
///   `DoesNotContain`, `Matches`, `DoesNotMatch`
/// - **Numeric**: `MoreThan`, `NoMoreThan`, `LessThan`, `NoLessThan`
/// - **Presence**: `Exists`, `NotExists`, `Any`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchType {
    Equals,
    DoesNotEqual,
    StartsWith,
    EndsWith,
    Contains,
    DoesNotContain,
    /// Whole value matches a regular expression.
    Matches,
    DoesNotMatch,
    MoreThan,
    NoMoreThan,
    LessThan,
    NoLessThan,
    Exists,
    NotExists,
    Any,
}

impl MatchType {
    pub const ALL: [MatchType; 15] = [
        MatchType::Equals,
        MatchType::DoesNotEqual,
        MatchType::StartsWith,
        MatchType::EndsWith,
        MatchType::Contains,
        MatchType::DoesNotContain,
        MatchType::Matches,
        MatchType::DoesNotMatch,
        MatchType::MoreThan,
        MatchType::NoMoreThan,
        MatchType::LessThan,
        MatchType::NoLessThan,
        MatchType::Exists,
        MatchType::NotExists,
        MatchType::Any,
    ];

    /// Returns `true` for the match types that compare numbers.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            MatchType::MoreThan | MatchType::NoMoreThan | MatchType::LessThan | MatchType::NoLessThan
        )
    }

    /// Returns `true` if the condition needs a value to compare with.
    pub fn needs_value(self) -> bool {
        !matches!(self, MatchType::Exists | MatchType::NotExists | MatchType::Any)
    }

    /// Evaluates a numeric comparison given `actual.cmp(expected)`.
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            MatchType::MoreThan => ordering == Ordering::Greater,
            MatchType::NoMoreThan => ordering != Ordering::Greater,
            MatchType::LessThan => ordering == Ordering::Less,
            MatchType::NoLessThan => ordering != Ordering::Less,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Equals => "equals",
            MatchType::DoesNotEqual => "does-not-equal",
            MatchType::StartsWith => "starts-with",
            MatchType::EndsWith => "ends-with",
            MatchType::Contains => "contains",
            MatchType::DoesNotContain => "does-not-contain",
            MatchType::Matches => "matches",
            MatchType::DoesNotMatch => "does-not-match",
            MatchType::MoreThan => "more-than",
            MatchType::NoMoreThan => "no-more-than",
            MatchType::LessThan => "less-than",
            MatchType::NoLessThan => "no-less-than",
            MatchType::Exists => "exists",
            MatchType::NotExists => "not-exists",
            MatchType::Any => "any",
        }
    }
}

impl FromStr for MatchType {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self> {
        MatchType::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let legal: Vec<&str> = MatchType::ALL.iter().map(|m| m.as_str()).collect();
                LocatorError::conversion(
                    "matchType",
                    s,
                    format!("expected one of: {}", legal.join(", ")),
                )
            })
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per call-site defaults for [`ValueCondition`] parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionDefaults {
    pub match_type: MatchType,
    /// Case handling for the bare-value form.
    pub single_ignore_case: bool,
    /// Case handling for the structured form without `ignoreCase`.
    pub structured_ignore_case: bool,
    /// Name of the value dimension in the structured form. `value` is always
    /// accepted as well.
    pub value_dimension: &'static str,
}

impl ConditionDefaults {
    /// Tag matching: a bare tag is exact and case-sensitive, the structured
    /// form `(name:...)` ignores case.
    pub const TAG: ConditionDefaults = ConditionDefaults {
        match_type: MatchType::Equals,
        single_ignore_case: false,
        structured_ignore_case: true,
        value_dimension: "name",
    };

    pub const fn new(match_type: MatchType) -> Self {
        ConditionDefaults {
            match_type,
            single_ignore_case: true,
            structured_ignore_case: false,
            value_dimension: "value",
        }
    }

    pub const fn ignore_case(mut self, single: bool, structured: bool) -> Self {
        self.single_ignore_case = single;
        self.structured_ignore_case = structured;
        self
    }

    pub const fn value_dimension(mut self, name: &'static str) -> Self {
        self.value_dimension = name;
        self
    }
}

impl Default for ConditionDefaults {
    fn default() -> Self {
        ConditionDefaults::new(MatchType::Contains)
    }
}

/// A compiled value condition.
///
/// # Example
///
/// ```
/// use sift_locator::{MatchType, ValueCondition};
///
/// let condition = ValueCondition::new(Some("rel"), MatchType::StartsWith, true).unwrap();
/// assert!(condition.matches(Some("Release-1")));
/// assert!(!condition.matches(None));
/// ```
#[derive(Debug, Clone)]
pub struct ValueCondition {
    value: Option<String>,
    match_type: MatchType,
    ignore_case: bool,
    regex: Option<Regex>,
    number: Option<f64>,
}

impl ValueCondition {
    /// Creates a condition, compiling the pattern for regex match types.
    pub fn new(value: Option<&str>, match_type: MatchType, ignore_case: bool) -> Result<Self> {
        let value = value.map(str::to_string);
        let Some(text) = value.as_deref() else {
            if match_type.needs_value() {
                return Err(LocatorError::conversion(
                    "matchType",
                    match_type.as_str(),
                    "a value is required for this match type",
                ));
            }
            return Ok(ValueCondition {
                value,
                match_type,
                ignore_case,
                regex: None,
                number: None,
            });
        };

        let regex = match match_type {
            MatchType::Matches | MatchType::DoesNotMatch => Some(
                RegexBuilder::new(&format!("^(?:{text})$"))
                    .case_insensitive(ignore_case)
                    .build()?,
            ),
            _ => None,
        };
        let number = if match_type.is_numeric() {
            Some(text.trim().parse::<f64>().map_err(|_| {
                LocatorError::conversion("value", text, "a number is required for numeric match")
            })?)
        } else {
            None
        };

        Ok(ValueCondition {
            value,
            match_type,
            ignore_case,
            regex,
            number,
        })
    }

    /// Parses a condition from a dimension value.
    pub fn parse(dimension: &str, raw: &RawValue, defaults: &ConditionDefaults) -> Result<Self> {
        let nested = Locator::from_raw(raw)?;
        if let Some(value) = nested.single_value() {
            return ValueCondition::new(
                Some(value),
                defaults.match_type,
                defaults.single_ignore_case,
            );
        }
        if nested.is_empty() {
            return ValueCondition::new(Some(""), defaults.match_type, defaults.single_ignore_case);
        }

        let supported = [defaults.value_dimension, "value", "matchType", "ignoreCase"];
        if let Some(unknown) = nested
            .dimension_names()
            .into_iter()
            .find(|name| !supported.contains(name))
        {
            return Err(LocatorError::UnknownDimension {
                name: format!("{dimension}:{unknown}"),
                supported: supported.iter().map(|s| s.to_string()).collect(),
            });
        }

        let mut value = nested.get_single_dimension_value(defaults.value_dimension)?;
        if value.is_none() && defaults.value_dimension != "value" {
            value = nested.get_single_dimension_value("value")?;
        }
        let match_type = match nested.get_single_dimension_value("matchType")? {
            Some(text) => text.parse()?,
            None => defaults.match_type,
        };
        let ignore_case = match parse_optional_boolean(&nested, "ignoreCase")? {
            Some(flag) => flag,
            None => defaults.structured_ignore_case,
        };
        ValueCondition::new(value.as_deref(), match_type, ignore_case)
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Evaluates the condition against an item's value. A missing value only
    /// satisfies `not-exists` and `any`.
    pub fn matches(&self, actual: Option<&str>) -> bool {
        match self.match_type {
            MatchType::Any => return true,
            MatchType::Exists => return actual.is_some(),
            MatchType::NotExists => return actual.is_none(),
            _ => {}
        }
        let Some(actual) = actual else {
            return false;
        };

        if let Some(expected) = self.number {
            return match actual.trim().parse::<f64>() {
                Ok(number) => number
                    .partial_cmp(&expected)
                    .is_some_and(|ordering| self.match_type.eval_ordering(ordering)),
                Err(_) => false,
            };
        }
        if let Some(regex) = &self.regex {
            let found = regex.is_match(actual);
            return match self.match_type {
                MatchType::Matches => found,
                _ => !found,
            };
        }
        self.match_text(actual)
    }

    /// `true` if any of the values matches, used for multi-valued properties
    /// such as tags.
    pub fn matches_any<'a, I>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            return self.matches(None);
        }
        values.any(|v| self.matches(Some(v)))
    }

    fn match_text(&self, actual: &str) -> bool {
        let expected = self.value.as_deref().unwrap_or_default();
        let (actual, expected) = if self.ignore_case {
            (actual.to_lowercase(), expected.to_lowercase())
        } else {
            (actual.to_string(), expected.to_string())
        };
        match self.match_type {
            MatchType::Equals => actual == expected,
            MatchType::DoesNotEqual => actual != expected,
            MatchType::StartsWith => actual.starts_with(&expected),
            MatchType::EndsWith => actual.ends_with(&expected),
            MatchType::Contains => actual.contains(&expected),
            MatchType::DoesNotContain => !actual.contains(&expected),
            _ => false,
        }
    }
}

fn parse_optional_boolean(locator: &Locator, name: &str) -> Result<Option<bool>> {
    match locator.get_single_dimension_value(name)? {
        Some(text) => Ok(match parse_boolean(name, &text)? {
            BooleanFilter::Any => None,
            other => other.as_option(),
        }),
        None => Ok(None),
    }
}

/// Checks that a dimension value is a well-formed condition.
pub(crate) fn validate(dimension: &str, raw: &RawValue, defaults: &ConditionDefaults) -> Result<()> {
    ValueCondition::parse(dimension, raw, defaults).map(|_| ())
}
