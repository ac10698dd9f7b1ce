//! Rendering command views as text, JSON or YAML.

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

use crate::commands::{DimensionInfo, FindReport, ParsedView};
use crate::record::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One line per item.
    #[default]
    Text,
    Json,
    Yaml,
}

/// Plain-text form of a view.
pub trait TextView {
    fn write_text(&self, out: &mut dyn Write) -> io::Result<()>;
}

pub fn render<V>(view: &V, format: Format, out: &mut dyn Write) -> anyhow::Result<()>
where
    V: Serialize + TextView + ?Sized,
{
    match format {
        Format::Text => view.write_text(out)?,
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, view)?;
            writeln!(out)?;
        }
        Format::Yaml => serde_yaml::to_writer(&mut *out, view)?,
    }
    Ok(())
}

impl TextView for Record {
    fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
        let line = serde_json::to_string(self).map_err(io::Error::other)?;
        writeln!(out, "{line}")
    }
}

impl TextView for FindReport {
    // The summary goes to stderr so the item lines stay pipeable.
    fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
        for item in &self.items {
            item.write_text(out)?;
        }
        Ok(())
    }
}

impl TextView for [DimensionInfo] {
    fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
        let width = self.iter().map(|d| d.name.len()).max().unwrap_or(0);
        for info in self {
            let mut line = format!("{:width$}  {}", info.name, info.kind);
            if !info.values.is_empty() {
                line.push_str(&format!(" [{}]", info.values.join(", ")));
            }
            if let Some(default) = &info.default {
                let scope = if info.default_filter { "default filter" } else { "default" };
                line.push_str(&format!(" ({scope}: {default})"));
            }
            if info.multiple {
                line.push_str(" (repeatable)");
            }
            if let Some(text) = &info.description {
                line.push_str(&format!(" - {text}"));
            }
            writeln!(out, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

impl TextView for ParsedView {
    fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
        if let Some(single) = &self.single {
            let marker = if single.literal { " (literal)" } else { "" };
            return writeln!(out, "single value: {}{marker}", single.value);
        }
        for dimension in &self.dimensions {
            let marker = if dimension.value.literal { " (literal)" } else { "" };
            writeln!(out, "{}: {}{marker}", dimension.name, dimension.value.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{self, ParsedDimension, ParsedValue};
    use serde_json::json;

    fn to_string<V: Serialize + TextView + ?Sized>(view: &V, format: Format) -> String {
        let mut out = Vec::new();
        render(view, format, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn info(name: &str) -> DimensionInfo {
        DimensionInfo {
            name: name.into(),
            kind: "long".into(),
            values: Vec::new(),
            default: None,
            multiple: false,
            default_filter: false,
            description: None,
        }
    }

    #[test]
    fn record_text_is_compact_json() {
        let record: Record = serde_json::from_value(json!({"id": 1, "name": "a"})).unwrap();
        assert_eq!(to_string(&record, Format::Text), "{\"id\":1,\"name\":\"a\"}\n");
    }

    #[test]
    fn report_formats() {
        let record: Record = serde_json::from_value(json!({"id": 1})).unwrap();
        let report = FindReport {
            items: vec![record.clone(), record],
            count: 2,
            processed: 5,
            lookup_limit_reached: false,
        };
        assert_eq!(to_string(&report, Format::Text), "{\"id\":1}\n{\"id\":1}\n");

        let parsed: serde_json::Value =
            serde_json::from_str(&to_string(&report, Format::Json)).unwrap();
        assert_eq!(parsed["processed"], json!(5));

        let yaml = to_string(&report, Format::Yaml);
        assert!(yaml.contains("lookupLimitReached: false"));
    }

    #[test]
    fn dimension_table_aligns_names() {
        let mut personal = info("personal");
        personal.kind = "boolean".into();
        personal.default = Some("false".into());
        personal.default_filter = true;
        let infos = vec![info("id"), personal];
        assert_eq!(
            to_string(infos.as_slice(), Format::Text),
            "id        long\npersonal  boolean (default filter: false)\n"
        );
    }

    #[test]
    fn parsed_view_text() {
        let view = ParsedView {
            single: None,
            dimensions: vec![ParsedDimension {
                name: "id".into(),
                value: ParsedValue {
                    value: "a,b".into(),
                    literal: true,
                },
            }],
        };
        assert_eq!(to_string(&view, Format::Text), "id: a,b (literal)\n");

        let single = commands::parse("abc").unwrap();
        assert_eq!(to_string(&single, Format::Text), "single value: abc\n");
    }
}
