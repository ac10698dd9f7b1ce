//! Finders over schema-described records.

use std::cmp::Ordering;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use sift_locator::syntax::LocatorBuilder;
use sift_locator::{
    holder, path_compare, BooleanFilter, ConditionDefaults, Finder, FinderBuilder, Locator,
    LocatorError, MultiCheckerFilter, TimeConditionParser,
};
use tracing::debug;

use crate::error::ConfigError;
use crate::record::Record;
use crate::schema::{Field, FieldKind, Schema};

/// Builds the finder for `records` as described by `schema`.
///
/// Time fields accept the entity name as an anchor, so with `entity: build`
/// `finishDate:(build:(id:3),condition:before)` compares against the
/// `finishDate` of the record found by `id:3`.
pub fn record_finder(schema: &Schema, records: Vec<Record>) -> Result<Finder<Record>, ConfigError> {
    let anchors = Rc::new(assemble(schema, records.clone(), None)?);
    assemble(schema, records, Some(anchors))
}

fn assemble(
    schema: &Schema,
    records: Vec<Record>,
    anchors: Option<Rc<Finder<Record>>>,
) -> Result<Finder<Record>, ConfigError> {
    let identity = schema.identity_field()?.clone();
    let matchers = schema
        .fields
        .iter()
        .map(|field| Matcher::new(field, &schema.entity, anchors.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(entity = %schema.entity, fields = matchers.len(), records = records.len(), "record finder");

    let lookup = records.clone();
    let mut builder = FinderBuilder::new(schema.entity.clone(), move || holder(records.clone()))
        .settings(schema.settings)
        .identity_dimensions([identity.name.clone()]);
    let anchor_names = match anchors {
        Some(_) => vec![schema.entity.as_str()],
        None => Vec::new(),
    };
    for field in &schema.fields {
        builder = builder.dimension(field.spec(&anchor_names)?);
    }

    let key = identity.name.clone();
    builder = builder
        .single_value(move |text| {
            Ok(lookup
                .iter()
                .find(|r| r.text(&key).as_deref() == Some(text))
                .cloned())
        })
        .identity(compare_by(&identity))
        .item_locator(render_identity(&identity))
        .filter(move |locator, filter| {
            for matcher in &matchers {
                matcher.apply(locator, filter)?;
            }
            Ok(())
        });

    if let Some(name) = &schema.order_by {
        if let Some(field) = schema.field(name) {
            builder = builder.ordering(compare_by(field));
        }
    }
    Ok(builder.build())
}

/// Turns one field's dimension into record predicates.
struct Matcher {
    field: Field,
    defaults: ConditionDefaults,
    times: Option<TimeConditionParser>,
}

impl Matcher {
    fn new(
        field: &Field,
        entity: &str,
        anchors: Option<Rc<Finder<Record>>>,
    ) -> Result<Self, ConfigError> {
        let times = (field.kind == FieldKind::Time).then(|| {
            let parser = TimeConditionParser::new();
            match anchors {
                Some(finder) => {
                    let name = field.name.clone();
                    parser.anchor(entity, move |locator| anchor_time(&finder, locator, &name))
                }
                None => parser,
            }
        });
        Ok(Matcher {
            field: field.clone(),
            defaults: field.condition_defaults()?,
            times,
        })
    }

    fn apply(
        &self,
        locator: &Locator,
        filter: &mut MultiCheckerFilter<Record>,
    ) -> sift_locator::Result<()> {
        let name = self.field.name.clone();
        match self.field.kind {
            FieldKind::Long => {
                if let Some(expected) = locator.get_long(&name)? {
                    filter.add_predicate(move |r: &Record| r.long(&name) == Some(expected));
                }
            }
            FieldKind::String | FieldKind::Path => {
                if let Some(condition) = locator.get_value_condition(&name, &self.defaults)? {
                    filter.add_predicate(move |r: &Record| {
                        condition.matches_any(r.texts(&name).iter().map(String::as_str))
                    });
                }
            }
            FieldKind::Boolean => {
                let wanted = locator.get_boolean(&name)?;
                if wanted != BooleanFilter::Any {
                    filter.add_predicate(move |r: &Record| {
                        wanted.includes(r.boolean(&name).unwrap_or(false))
                    });
                }
            }
            FieldKind::Enum => {
                if let Some(values) = locator.get_enum_values(&name, &self.field.values)? {
                    filter.add_predicate(move |r: &Record| {
                        r.text(&name)
                            .is_some_and(|v| values.iter().any(|x| x.eq_ignore_ascii_case(&v)))
                    });
                }
            }
            FieldKind::Time => {
                let Some(parser) = &self.times else {
                    return Ok(());
                };
                if let Some(condition) = locator.get_time_condition(&name, parser)? {
                    filter.add_predicate(move |r: &Record| condition.matches(r.time(&name)));
                }
            }
        }
        Ok(())
    }
}

fn anchor_time(
    finder: &Finder<Record>,
    locator: &Locator,
    field: &str,
) -> sift_locator::Result<DateTime<Utc>> {
    let record = finder.get_item(locator.text())?;
    record
        .time(field)
        .ok_or_else(|| LocatorError::NotFound(locator.text().to_string()))
}

/// Total order over one field; records without the field sort first.
fn compare_by(field: &Field) -> impl Fn(&Record, &Record) -> Ordering + 'static {
    let name = field.name.clone();
    let kind = field.kind;
    move |a, b| match kind {
        FieldKind::Long => a.long(&name).cmp(&b.long(&name)),
        FieldKind::Time => a.time(&name).cmp(&b.time(&name)),
        _ => match (a.text(&name), b.text(&name)) {
            (Some(x), Some(y)) => path_compare(&x, &y),
            (x, y) => x.cmp(&y),
        },
    }
}

/// Text fields render as an exact, case-sensitive match so the locator finds
/// the record and nothing else.
fn render_identity(field: &Field) -> impl Fn(&Record) -> String + 'static {
    let name = field.name.clone();
    let kind = field.kind;
    move |record| {
        let value = record.text(&name).unwrap_or_default();
        match kind {
            FieldKind::String | FieldKind::Path => {
                let exact = LocatorBuilder::new()
                    .dimension("value", &value)
                    .dimension("matchType", "equals")
                    .build();
                LocatorBuilder::new().nested(&name, &exact).build()
            }
            _ => LocatorBuilder::new().dimension(&name, &value).build(),
        }
    }
}
