//! Date/time filter conditions.
//!
//! ```text
//! finishDate:20160224T164803.050+0100
//! finishDate:(date:2016-02-24,condition:after,shift:-1d)
//! startDate:(build:(id:42),condition:before,includeInitial:true)
//! ```
//!
//! A bare value is the same as `date:<value>`. Instead of `date`, a
//! registered anchor dimension (such as `build`) resolves a nested locator to
//! the base timestamp.

use std::fmt;

use chrono::{
    DateTime, Duration, DurationRound, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dimension::{parse_boolean, BooleanFilter};
use crate::error::{LocatorError, Result};
use crate::locator::Locator;
use crate::syntax::RawValue;

const DATE: &str = "date";
const SHIFT: &str = "shift";
const CONDITION: &str = "condition";
const INCLUDE_INITIAL: &str = "includeInitial";

static SHIFT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+(?:ms|w|d|h|m|s))+$").expect("shift pattern"));
static SHIFT_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(ms|w|d|h|m|s)").expect("shift part pattern"));

/// Resolves an anchor locator to a timestamp.
pub type AnchorResolver = Box<dyn Fn(&Locator) -> Result<DateTime<Utc>>>;

/// Source of "now" for time-of-day dates.
pub type Clock = Box<dyn Fn() -> DateTime<Utc>>;

/// How an item's time is compared with the base time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeComparison {
    Before,
    After,
    Equals,
    /// Both times fall into the same minute.
    SameMinute,
}

impl TimeComparison {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeComparison::Before => "before",
            TimeComparison::After => "after",
            TimeComparison::Equals => "equals",
            TimeComparison::SameMinute => "same-minute",
        }
    }
}

impl fmt::Display for TimeComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved time condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeCondition {
    base: DateTime<Utc>,
    comparison: TimeComparison,
    include_initial: bool,
    truncate_to_seconds: bool,
}

impl TimeCondition {
    pub fn new(base: DateTime<Utc>, comparison: TimeComparison) -> Self {
        TimeCondition {
            base,
            comparison,
            include_initial: false,
            truncate_to_seconds: false,
        }
    }

    pub fn include_initial(mut self, include: bool) -> Self {
        self.include_initial = include;
        self
    }

    pub fn base(&self) -> DateTime<Utc> {
        self.base
    }

    pub fn comparison(&self) -> TimeComparison {
        self.comparison
    }

    /// Evaluates the condition; items without a time never match.
    pub fn matches(&self, time: Option<DateTime<Utc>>) -> bool {
        let Some(time) = time else {
            return false;
        };
        let time = if self.truncate_to_seconds {
            truncate(time, Duration::seconds(1))
        } else {
            time
        };
        match self.comparison {
            TimeComparison::Before if self.include_initial => time <= self.base,
            TimeComparison::Before => time < self.base,
            TimeComparison::After if self.include_initial => time >= self.base,
            TimeComparison::After => time > self.base,
            TimeComparison::Equals => time == self.base,
            TimeComparison::SameMinute => {
                truncate(time, Duration::minutes(1)) == truncate(self.base, Duration::minutes(1))
            }
        }
    }

    /// The lower bound of matching times, when the condition has one.
    ///
    /// A scan over items sorted by descending time can stop once it passes
    /// this date.
    pub fn limiting_date(&self) -> Option<DateTime<Utc>> {
        match self.comparison {
            TimeComparison::After => Some(self.base),
            _ => None,
        }
    }
}

fn truncate(time: DateTime<Utc>, unit: Duration) -> DateTime<Utc> {
    time.duration_trunc(unit).unwrap_or(time)
}

/// Parses time conditions, resolving registered anchors.
pub struct TimeConditionParser {
    anchors: Vec<(String, AnchorResolver)>,
    clock: Clock,
}

impl TimeConditionParser {
    pub fn new() -> Self {
        TimeConditionParser {
            anchors: Vec::new(),
            clock: Box::new(Utc::now),
        }
    }

    /// Registers an anchor dimension, e.g. `build` for `build:(id:1)`.
    pub fn anchor<F>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(&Locator) -> Result<DateTime<Utc>> + 'static,
    {
        self.anchors.push((name.into(), Box::new(resolver)));
        self
    }

    /// Replaces the clock used for bare `HH:mm` dates.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn anchor_names(&self) -> Vec<&str> {
        self.anchors.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn parse(&self, dimension: &str, raw: &RawValue) -> Result<TimeCondition> {
        let now = (self.clock)();
        if let Some(base) = bare_date(raw, now) {
            return Ok(literal_condition(base, TimeComparison::Equals, false));
        }

        let nested = Locator::from_raw(raw)?;
        if let Some(text) = nested.single_value() {
            let base = parse_date(dimension, text, now)?;
            return Ok(literal_condition(base, TimeComparison::Equals, false));
        }

        let mut supported = vec![DATE, SHIFT, CONDITION, INCLUDE_INITIAL];
        supported.extend(self.anchor_names());
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

        let comparison = parse_comparison(dimension, &nested)?;
        let include_initial = parse_include_initial(dimension, &nested)?;
        let shift = match nested.get_single_dimension_value(SHIFT)? {
            Some(text) => Some(parse_shift(dimension, &text)?),
            None => None,
        };

        let date = nested.get_single_dimension_value(DATE)?;
        let mut anchored = None;
        for (name, resolver) in &self.anchors {
            if let Some(anchor) = nested.get_nested(name)? {
                if date.is_some() || anchored.is_some() {
                    return Err(conflicting_bases(dimension));
                }
                anchored = Some(resolver(&anchor)?);
            }
        }

        let (base, literal) = match (date, anchored) {
            (Some(text), None) => (parse_date(dimension, &text, now)?, true),
            (None, Some(time)) => (time, false),
            _ => return Err(missing_base(dimension, nested.text())),
        };
        let base = apply_shift(dimension, base, shift)?;

        let condition = if literal {
            literal_condition(base, comparison.unwrap_or(TimeComparison::Equals), include_initial)
        } else {
            TimeCondition::new(base, comparison.unwrap_or(TimeComparison::SameMinute))
                .include_initial(include_initial)
        };
        Ok(condition)
    }
}

impl Default for TimeConditionParser {
    fn default() -> Self {
        TimeConditionParser::new()
    }
}

impl fmt::Debug for TimeConditionParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeConditionParser")
            .field("anchors", &self.anchor_names())
            .finish_non_exhaustive()
    }
}

// A literal without milliseconds compares at whole-second precision.
fn literal_condition(
    base: DateTime<Utc>,
    comparison: TimeComparison,
    include_initial: bool,
) -> TimeCondition {
    TimeCondition {
        base,
        comparison,
        include_initial,
        truncate_to_seconds: base.timestamp_subsec_millis() == 0,
    }
}

fn parse_comparison(dimension: &str, nested: &Locator) -> Result<Option<TimeComparison>> {
    let Some(text) = nested.get_single_dimension_value(CONDITION)? else {
        return Ok(None);
    };
    match text.to_ascii_lowercase().as_str() {
        "before" => Ok(Some(TimeComparison::Before)),
        "after" => Ok(Some(TimeComparison::After)),
        "equals" => Ok(Some(TimeComparison::Equals)),
        _ => Err(LocatorError::conversion(
            format!("{dimension}:{CONDITION}"),
            text,
            "expected one of: before, after, equals",
        )),
    }
}

fn parse_include_initial(dimension: &str, nested: &Locator) -> Result<bool> {
    match nested.get_single_dimension_value(INCLUDE_INITIAL)? {
        Some(text) => Ok(parse_boolean(&format!("{dimension}:{INCLUDE_INITIAL}"), &text)?
            == BooleanFilter::True),
        None => Ok(false),
    }
}

fn conflicting_bases(dimension: &str) -> LocatorError {
    LocatorError::unsupported(format!(
        "time condition '{dimension}' must have exactly one of 'date' or an anchor dimension"
    ))
}

fn missing_base(dimension: &str, text: &str) -> LocatorError {
    LocatorError::conversion(dimension, text, "either 'date' or an anchor dimension is required")
}

fn apply_shift(
    dimension: &str,
    base: DateTime<Utc>,
    shift: Option<Duration>,
) -> Result<DateTime<Utc>> {
    match shift {
        None => Ok(base),
        Some(delta) => base.checked_add_signed(delta).ok_or_else(|| {
            LocatorError::conversion(dimension, delta.to_string(), "shift is out of range")
        }),
    }
}

/// Parses an absolute date.
///
/// Accepted forms: `20160224T164803.050+0100`, RFC 3339, ISO 8601 without
/// zone (UTC), `2016-02-24`, ISO week `2016-W08` (its Monday) and `16:48`
/// (today).
pub fn parse_date(dimension: &str, text: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    try_parse_date(text.trim(), now).ok_or_else(|| {
        LocatorError::conversion(
            dimension,
            text,
            "unsupported date format; use yyyyMMdd'T'HHmmss.SSSZ, ISO 8601, yyyy-MM-dd, yyyy-'W'ww or HH:mm",
        )
    })
}

// `16:48` would otherwise parse as a dimension list.
fn bare_date(raw: &RawValue, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if raw.literal {
        return None;
    }
    try_parse_date(raw.text.trim(), now)
}

fn try_parse_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let compact = match text.strip_suffix('Z') {
        Some(head) if text.contains('T') && !text.contains('-') => format!("{head}+0000"),
        _ => text.to_string(),
    };
    for format in ["%Y%m%dT%H%M%S%.f%z", "%Y%m%dT%H%M%S%z"] {
        if let Ok(time) = DateTime::parse_from_str(&compact, format) {
            return Some(time.with_timezone(&Utc));
        }
    }
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Some(time.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"] {
        if let Ok(time) = DateTime::parse_from_str(text, format) {
            return Some(time.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(time) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&time));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    if let Some((year, week)) = text.split_once("-W") {
        let date = NaiveDate::from_isoywd_opt(year.parse().ok()?, week.parse().ok()?, Weekday::Mon)?;
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    if let Ok(time) = NaiveTime::parse_from_str(text, "%H:%M") {
        return Some(Utc.from_utc_datetime(&now.date_naive().and_time(time)));
    }
    None
}

/// Parses a shift such as `-10m`, `+1d10s1ms` or `48h`.
pub fn parse_shift(dimension: &str, text: &str) -> Result<Duration> {
    let invalid = |reason: &str| {
        LocatorError::conversion(format!("{dimension}:{SHIFT}"), text, reason.to_string())
    };
    if !SHIFT_PATTERN.is_match(text) {
        return Err(invalid("expected [+-]<number><w|d|h|m|s|ms>..."));
    }

    let mut total = Duration::zero();
    for caps in SHIFT_PART.captures_iter(text) {
        let amount: i64 = caps[1]
            .parse()
            .map_err(|_| invalid("number is out of range"))?;
        let delta = match &caps[2] {
            "w" => Duration::try_weeks(amount),
            "d" => Duration::try_days(amount),
            "h" => Duration::try_hours(amount),
            "m" => Duration::try_minutes(amount),
            "s" => Duration::try_seconds(amount),
            _ => Duration::try_milliseconds(amount),
        };
        total = delta
            .and_then(|d| total.checked_add(&d))
            .ok_or_else(|| invalid("shift is out of range"))?;
    }
    if text.starts_with('-') {
        total = -total;
    }
    Ok(total)
}

/// Checks the syntax of a time condition without resolving anchors.
pub(crate) fn validate(dimension: &str, raw: &RawValue, anchors: &[String]) -> Result<()> {
    let now = Utc::now();
    if bare_date(raw, now).is_some() {
        return Ok(());
    }
    let nested = Locator::from_raw(raw)?;
    if let Some(text) = nested.single_value() {
        return parse_date(dimension, text, now).map(|_| ());
    }
    for (name, value) in nested.entries() {
        match name.as_str() {
            DATE => {
                parse_date(dimension, &value.text, now)?;
            }
            SHIFT => {
                parse_shift(dimension, &value.text)?;
            }
            CONDITION => {
                parse_comparison(dimension, &Locator::from_dimension(CONDITION, &value.text))?;
            }
            INCLUDE_INITIAL => {
                parse_boolean(&format!("{dimension}:{INCLUDE_INITIAL}"), &value.text)?;
            }
            other if anchors.iter().any(|a| a == other) => {}
            other => {
                let mut supported: Vec<String> =
                    [DATE, SHIFT, CONDITION, INCLUDE_INITIAL].map(String::from).to_vec();
                supported.extend(anchors.iter().cloned());
                return Err(LocatorError::UnknownDimension {
                    name: format!("{dimension}:{other}"),
                    supported,
                });
            }
        }
    }
    if nested.is_empty() {
        return Err(missing_base(dimension, nested.text()));
    }
    Ok(())
}
