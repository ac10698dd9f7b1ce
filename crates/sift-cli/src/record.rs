//! Schemaless records read from JSON or YAML files.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sift_locator::parse_date;

use crate::error::{read_file, ConfigError};

/// One record: a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    /// Field as text. Numbers and booleans are rendered, arrays and objects
    /// have no text form.
    pub fn text(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Every text value of a field; an array contributes each element.
    pub fn texts(&self, field: &str) -> Vec<String> {
        match self.get(field) {
            Some(Value::Array(values)) => values.iter().filter_map(scalar_text).collect(),
            Some(value) => scalar_text(value).into_iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn long(&self, field: &str) -> Option<i64> {
        match self.get(field)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn boolean(&self, field: &str) -> Option<bool> {
        match self.get(field)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Field as a timestamp: any date text the locator accepts, or epoch
    /// milliseconds.
    pub fn time(&self, field: &str) -> Option<DateTime<Utc>> {
        match self.get(field)? {
            Value::String(s) => parse_date(field, s, Utc::now()).ok(),
            Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?),
            _ => None,
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads an array of records, picking the format by file extension.
pub fn load(path: &Path) -> Result<Vec<Record>, ConfigError> {
    let text = read_file(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "json" => Ok(serde_json::from_str(&text)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(&text)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    mod access {
        use super::*;

        #[test]
        fn text_renders_scalars() {
            let r = record(json!({"a": "x", "b": 3, "c": true, "d": null, "e": [1]}));
            assert_eq!(r.text("a").as_deref(), Some("x"));
            assert_eq!(r.text("b").as_deref(), Some("3"));
            assert_eq!(r.text("c").as_deref(), Some("true"));
            assert_eq!(r.text("d"), None);
            assert_eq!(r.text("e"), None);
            assert_eq!(r.text("missing"), None);
        }

        #[test]
        fn texts_flatten_arrays() {
            let r = record(json!({"tags": ["a", 1, {"x": 1}], "one": "b"}));
            assert_eq!(r.texts("tags"), vec!["a", "1"]);
            assert_eq!(r.texts("one"), vec!["b"]);
            assert!(r.texts("none").is_empty());
        }

        #[test]
        fn long_and_boolean() {
            let r = record(json!({"n": 12, "s": " 7 ", "f": 1.5, "b": "TRUE"}));
            assert_eq!(r.long("n"), Some(12));
            assert_eq!(r.long("s"), Some(7));
            assert_eq!(r.long("f"), None);
            assert_eq!(r.boolean("b"), Some(true));
            assert_eq!(r.boolean("n"), None);
        }

        #[test]
        fn time_forms() {
            let expected = Utc.with_ymd_and_hms(2016, 2, 24, 15, 48, 3).unwrap();
            let r = record(json!({
                "rfc": "2016-02-24T15:48:03Z",
                "compact": "20160224T164803+0100",
                "millis": expected.timestamp_millis(),
                "bad": "yesterday",
            }));
            assert_eq!(r.time("rfc"), Some(expected));
            assert_eq!(r.time("compact"), Some(expected));
            assert_eq!(r.time("millis"), Some(expected));
            assert_eq!(r.time("bad"), None);
        }
    }

    mod loading {
        use super::*;
        use std::io::Write;

        fn write(suffix: &str, content: &str) -> tempfile::NamedTempFile {
            let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
            file.write_all(content.as_bytes()).unwrap();
            file
        }

        #[test]
        fn json_and_yaml() {
            let json = write(".json", r#"[{"id": 1}, {"id": 2}]"#);
            assert_eq!(load(json.path()).unwrap().len(), 2);

            let yaml = write(".yml", "- id: 1\n  name: a\n");
            let records = load(yaml.path()).unwrap();
            assert_eq!(records[0].text("name").as_deref(), Some("a"));
        }

        #[test]
        fn unknown_extension() {
            let file = write(".csv", "id\n1\n");
            assert!(matches!(
                load(file.path()),
                Err(ConfigError::UnsupportedFormat(ext)) if ext == "csv"
            ));
        }

        #[test]
        fn missing_file() {
            let err = load(Path::new("/nonexistent/records.json")).unwrap_err();
            assert!(matches!(err, ConfigError::Read { .. }));
            assert!(err.to_string().contains("records.json"));
        }
    }
}
