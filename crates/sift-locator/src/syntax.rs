//! Locator text grammar.
//!
//! ```text
//! locator       := singleValue | dimensionList
//! dimensionList := dimension (',' dimension)*
//! dimension     := name ':' value
//! value         := scalar | '(' locator ')' | '$base64:' text
//! ```
//!
//! [`parse`] turns text into a [`ParsedLocator`]: either a single value or an
//! ordered list of `(name, value)` pairs. Values inside parentheses are kept
//! verbatim so that nested locators are only parsed by whoever consumes them.
//!
//! The rendering helpers ([`escape_value`], [`LocatorBuilder`]) produce text
//! that parses back to the same logical values.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;

use crate::error::{LocatorError, Result};

/// Prefix marking a base64-encoded value.
pub const BASE64_PREFIX: &str = "$base64:";

/// One raw dimension value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    /// The value text with one level of parentheses (or base64) removed.
    pub text: String,
    /// Set when the value was base64-decoded; literal values are never
    /// parsed again as locators.
    pub literal: bool,
}

impl RawValue {
    pub fn plain(text: impl Into<String>) -> Self {
        RawValue {
            text: text.into(),
            literal: false,
        }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        RawValue {
            text: text.into(),
            literal: true,
        }
    }
}

/// Result of parsing locator text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLocator {
    /// The whole text is one value without dimension structure.
    Single(RawValue),
    /// `name:value` pairs in the order given. Names may repeat.
    Dimensions(Vec<(String, RawValue)>),
}

/// Parses locator text.
///
/// Empty text is an empty dimension list.
pub fn parse(text: &str) -> Result<ParsedLocator> {
    if text.is_empty() {
        return Ok(ParsedLocator::Dimensions(Vec::new()));
    }

    if let Some(encoded) = text.strip_prefix(BASE64_PREFIX) {
        return Ok(ParsedLocator::Single(RawValue::literal(decode_base64(
            encoded, 0,
        )?)));
    }

    if text.starts_with('(') {
        let close = matching_paren(text, 0)?;
        if close == text.len() - 1 {
            return Ok(ParsedLocator::Single(RawValue::plain(&text[1..close])));
        }
    }

    if !has_top_level_colon(text)? {
        return Ok(ParsedLocator::Single(RawValue::plain(text)));
    }

    Parser::new(text).dimensions().map(ParsedLocator::Dimensions)
}

/// Returns `true` if `c` may appear in a dimension name.
pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '$')
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Parser { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn dimensions(mut self) -> Result<Vec<(String, RawValue)>> {
        let mut out = Vec::new();
        loop {
            let name = self.name()?;
            let value = self.value(&name)?;
            out.push((name, value));

            if self.pos >= self.text.len() {
                return Ok(out);
            }
            // value() stops only at a top-level comma or the end
            self.pos += 1;
            if self.pos >= self.text.len() {
                return Err(LocatorError::malformed_at(
                    "dimension expected after ','",
                    self.pos,
                ));
            }
        }
    }

    fn name(&mut self) -> Result<String> {
        let start = self.pos;
        let rest = self.rest();
        let Some(colon) = rest.find(':') else {
            return Err(LocatorError::malformed_at(
                format!("dimension '{rest}' has no value"),
                start,
            ));
        };
        let name = &rest[..colon];
        if let Some(comma) = name.find(',') {
            return Err(LocatorError::malformed_at(
                format!("dimension '{}' has no value", &name[..comma]),
                start,
            ));
        }
        if name.is_empty() {
            return Err(LocatorError::malformed_at("empty dimension name", start));
        }
        if let Some(bad) = name.chars().find(|c| !is_name_char(*c)) {
            return Err(LocatorError::malformed_at(
                format!("invalid character '{bad}' in dimension name '{name}'"),
                start,
            ));
        }
        self.pos += colon + 1;
        Ok(name.to_string())
    }

    fn value(&mut self, name: &str) -> Result<RawValue> {
        let start = self.pos;
        let rest = self.rest();

        if rest.starts_with('(') {
            let close = start + matching_paren(rest, 0)?;
            let inner = &self.text[start + 1..close];
            self.pos = close + 1;
            if self.pos < self.text.len() && !self.rest().starts_with(',') {
                return Err(LocatorError::malformed_at(
                    format!("unexpected text after the value of '{name}'"),
                    self.pos,
                ));
            }
            return Ok(RawValue::plain(inner));
        }

        let end = start + scalar_end(rest, start)?;
        let scalar = &self.text[start..end];
        self.pos = end;

        match scalar.strip_prefix(BASE64_PREFIX) {
            Some(encoded) => Ok(RawValue::literal(decode_base64(
                encoded,
                start + BASE64_PREFIX.len(),
            )?)),
            None => Ok(RawValue::plain(scalar)),
        }
    }
}

/// Finds the byte offset of the `)` matching the `(` at `open`.
fn matching_paren(text: &str, open: usize) -> Result<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(LocatorError::malformed_at("unclosed parenthesis", open))
}

/// Length of a scalar value: up to the next top-level comma or the end.
fn scalar_end(text: &str, offset: usize) -> Result<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Err(LocatorError::malformed_at(
                        "unbalanced closing parenthesis",
                        offset + i,
                    ));
                }
                depth -= 1;
            }
            ',' if depth == 0 => return Ok(i),
            _ => {}
        }
    }
    if depth > 0 {
        return Err(LocatorError::malformed_at("unclosed parenthesis", offset));
    }
    Ok(text.len())
}

fn has_top_level_colon(text: &str) -> Result<bool> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Err(LocatorError::malformed_at(
                        "unbalanced closing parenthesis",
                        i,
                    ));
                }
                depth -= 1;
            }
            ':' if depth == 0 => return Ok(true),
            _ => {}
        }
    }
    Ok(false)
}

fn decode_base64(encoded: &str, position: usize) -> Result<String> {
    let trimmed = encoded.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD.decode(encoded))
        .map_err(|e| LocatorError::malformed_at(format!("invalid base64 value: {e}"), position))?;
    String::from_utf8(bytes).map_err(|_| {
        LocatorError::malformed_at("base64 value does not decode to UTF-8 text", position)
    })
}

/// Returns `true` if parentheses in `text` are balanced.
fn parens_balanced(text: &str) -> bool {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    depth == 0
}

/// Renders a dimension value so that it parses back to exactly `value`.
///
/// Safe text is returned as is, text with balanced parentheses is wrapped in
/// parentheses, anything else is base64-encoded.
pub fn escape_value(value: &str) -> String {
    let needs_escape = value.starts_with('$')
        || value
            .chars()
            .any(|c| matches!(c, ',' | ':' | '(' | ')'));
    if !needs_escape {
        return value.to_string();
    }
    if parens_balanced(value) {
        format!("({value})")
    } else {
        format!("{BASE64_PREFIX}{}", URL_SAFE_NO_PAD.encode(value))
    }
}

/// Renders a single value locator so that it parses back to `value`.
pub fn escape_single_value(value: &str) -> String {
    if value.is_empty() {
        return BASE64_PREFIX.to_string();
    }
    let plain = !value.starts_with('(')
        && !value.starts_with('$')
        && matches!(has_top_level_colon(value), Ok(false))
        && parens_balanced(value);
    if plain {
        value.to_string()
    } else if parens_balanced(value) {
        format!("({value})")
    } else {
        format!("{BASE64_PREFIX}{}", URL_SAFE_NO_PAD.encode(value))
    }
}

/// Builds locator text from dimensions.
///
/// # Example
///
/// ```
/// use sift_locator::syntax::LocatorBuilder;
///
/// let text = LocatorBuilder::new()
///     .dimension("name", "a,b")
///     .dimension("count", "10")
///     .build();
/// assert_eq!(text, "name:(a,b),count:10");
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocatorBuilder {
    parts: Vec<String>,
}

impl LocatorBuilder {
    pub fn new() -> Self {
        LocatorBuilder::default()
    }

    /// Adds a dimension; the value is escaped as needed.
    pub fn dimension(mut self, name: &str, value: impl AsRef<str>) -> Self {
        self.parts
            .push(format!("{name}:{}", escape_value(value.as_ref())));
        self
    }

    /// Adds a dimension whose value is locator text, wrapped in parentheses.
    pub fn nested(mut self, name: &str, locator: &str) -> Self {
        self.parts.push(format!("{name}:({locator})"));
        self
    }

    /// Appends already rendered dimensions (e.g. another locator's text).
    pub fn raw(mut self, text: &str) -> Self {
        if !text.is_empty() {
            self.parts.push(text.to_string());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn build(self) -> String {
        self.parts.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(text: &str) -> Vec<(String, String)> {
        match parse(text).unwrap() {
            ParsedLocator::Dimensions(d) => d.into_iter().map(|(n, v)| (n, v.text)).collect(),
            ParsedLocator::Single(v) => panic!("expected dimensions, got single value {v:?}"),
        }
    }

    fn single(text: &str) -> RawValue {
        match parse(text).unwrap() {
            ParsedLocator::Single(v) => v,
            other => panic!("expected single value, got {other:?}"),
        }
    }

    fn pair(n: &str, v: &str) -> (String, String) {
        (n.to_string(), v.to_string())
    }

    mod single_values {
        use super::*;

        #[test]
        fn bare_text() {
            assert_eq!(single("abc").text, "abc");
        }

        #[test]
        fn commas_without_colon() {
            assert_eq!(single("a,b").text, "a,b");
        }

        #[test]
        fn parenthesised() {
            let v = single("(a:b)");
            assert_eq!(v.text, "a:b");
            assert!(!v.literal);
        }

        #[test]
        fn colon_only_inside_parens() {
            assert_eq!(single("x(a:b)").text, "x(a:b)");
        }

        #[test]
        fn base64() {
            let v = single("$base64:YTpi");
            assert_eq!(v.text, "a:b");
            assert!(v.literal);
        }
    }

    mod dimension_lists {
        use super::*;

        #[test]
        fn simple_pairs() {
            assert_eq!(dims("a:1,b:2"), vec![pair("a", "1"), pair("b", "2")]);
        }

        #[test]
        fn repeated_names_kept_in_order() {
            assert_eq!(
                dims("item:1,x:y,item:2"),
                vec![pair("item", "1"), pair("x", "y"), pair("item", "2")]
            );
        }

        #[test]
        fn nested_values_verbatim() {
            assert_eq!(
                dims("or:(id:1,name:(a,b)),count:3"),
                vec![pair("or", "id:1,name:(a,b)"), pair("count", "3")]
            );
        }

        #[test]
        fn empty_value() {
            assert_eq!(dims("a:,b:1"), vec![pair("a", ""), pair("b", "1")]);
        }

        #[test]
        fn scalar_with_inner_parens() {
            assert_eq!(dims("name:a(b,c)d"), vec![pair("name", "a(b,c)d")]);
        }

        #[test]
        fn colon_inside_scalar() {
            assert_eq!(dims("date:12:30"), vec![pair("date", "12:30")]);
        }

        #[test]
        fn base64_value_decoded_once() {
            // "$base64:YQ" encoded again
            let encoded = URL_SAFE_NO_PAD.encode("$base64:YQ");
            let parsed = parse(&format!("name:$base64:{encoded}")).unwrap();
            let ParsedLocator::Dimensions(d) = parsed else {
                panic!("expected dimensions")
            };
            assert_eq!(d[0].1, RawValue::literal("$base64:YQ"));
        }

        #[test]
        fn base64_standard_alphabet_with_padding() {
            let encoded = STANDARD.encode("a,b!");
            assert_eq!(
                dims(&format!("name:$base64:{encoded}")),
                vec![pair("name", "a,b!")]
            );
        }
    }

    mod malformed {
        use super::*;
        use crate::error::ErrorKind;

        fn kind(text: &str) -> ErrorKind {
            parse(text).unwrap_err().kind()
        }

        #[test]
        fn unclosed_paren() {
            assert_eq!(kind("a:(b"), ErrorKind::Malformed);
            assert_eq!(kind("a:x(b"), ErrorKind::Malformed);
        }

        #[test]
        fn stray_close_paren() {
            assert_eq!(kind("a:b)"), ErrorKind::Malformed);
            assert_eq!(kind("a)"), ErrorKind::Malformed);
        }

        #[test]
        fn text_after_nested_value() {
            assert_eq!(kind("a:(b)c"), ErrorKind::Malformed);
        }

        #[test]
        fn dimension_without_value() {
            assert_eq!(kind("a:1,b"), ErrorKind::Malformed);
            assert_eq!(kind("b,a:1"), ErrorKind::Malformed);
        }

        #[test]
        fn trailing_comma() {
            assert_eq!(kind("a:1,"), ErrorKind::Malformed);
        }

        #[test]
        fn bad_name() {
            assert_eq!(kind(":1"), ErrorKind::Malformed);
            assert_eq!(kind("a b:1"), ErrorKind::Malformed);
        }

        #[test]
        fn bad_base64() {
            assert_eq!(kind("a:$base64:%%%"), ErrorKind::Malformed);
        }
    }

    mod rendering {
        use super::*;

        #[test]
        fn safe_values_unchanged() {
            assert_eq!(escape_value("abc"), "abc");
            assert_eq!(escape_value(""), "");
        }

        #[test]
        fn balanced_values_wrapped() {
            assert_eq!(escape_value("a,b"), "(a,b)");
            assert_eq!(escape_value("a:(b)"), "(a:(b))");
        }

        #[test]
        fn unbalanced_values_encoded() {
            assert!(escape_value("a)b").starts_with(BASE64_PREFIX));
        }

        #[test]
        fn builder_output_parses_back() {
            let text = LocatorBuilder::new()
                .dimension("name", "x)y")
                .dimension("tag", "a,b")
                .nested("build", "id:1")
                .build();
            assert_eq!(
                dims(&text),
                vec![pair("name", "x)y"), pair("tag", "a,b"), pair("build", "id:1")]
            );
        }

        #[test]
        fn single_value_escaping() {
            for value in ["abc", "a:b", "(x)", "a)b", "$base64:YQ", "", "a,b"] {
                let text = escape_single_value(value);
                assert_eq!(single(&text).text, value, "rendered as {text}");
            }
        }
    }
}
