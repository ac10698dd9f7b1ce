//! Sample entity finders shared by the integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sift_locator::syntax::LocatorBuilder;
use sift_locator::{
    holder, path_compare, ConditionDefaults, DimensionEnum, DimensionKind, DimensionSpec, Finder,
    FinderBuilder, LocatorError, MatchType, TimeConditionParser,
};

// ============================================================================
// Files
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub path: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

pub fn file(path: &str, size: u64) -> File {
    File {
        path: path.to_string(),
        size,
        modified: None,
    }
}

/// A bare size is an upper bound.
pub const SIZE: ConditionDefaults = ConditionDefaults::new(MatchType::NoMoreThan);

pub fn file_finder(files: Vec<File>) -> Finder<File> {
    let lookup = files.clone();
    FinderBuilder::new("file", move || holder(files.clone()))
        .dimension(DimensionSpec::new("size", DimensionKind::ValueCondition(SIZE)))
        .dimension(DimensionSpec::new(
            "path",
            DimensionKind::ValueCondition(ConditionDefaults::default()),
        ))
        .dimension(DimensionSpec::time("modified"))
        .identity(|a: &File, b: &File| path_compare(&a.path, &b.path))
        .item_locator(|f: &File| LocatorBuilder::new().dimension("path", &f.path).build())
        .ordering(|a: &File, b: &File| path_compare(&a.path, &b.path))
        .single_value(move |path| Ok(lookup.iter().find(|f| f.path == path).cloned()))
        .filter(|locator, filter| {
            if let Some(size) = locator.get_value_condition("size", &SIZE)? {
                filter.add_predicate(move |f: &File| size.matches(Some(&f.size.to_string())));
            }
            if let Some(path) = locator.get_value_condition("path", &ConditionDefaults::default())? {
                filter.add_predicate(move |f: &File| path.matches(Some(&f.path)));
            }
            if let Some(modified) = locator.get_time_condition("modified", &TimeConditionParser::new())? {
                filter.add_predicate(move |f: &File| modified.matches(f.modified));
            }
            Ok(())
        })
        .build()
}

pub fn paths(files: &[File]) -> Vec<&str> {
    files.iter().map(|f| f.path.as_str()).collect()
}

// ============================================================================
// Builds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
    Unknown,
}

impl DimensionEnum for Status {
    fn symbols() -> &'static [(&'static str, Self)] {
        &[
            ("SUCCESS", Status::Success),
            ("FAILURE", Status::Failure),
            ("UNKNOWN", Status::Unknown),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Build {
    pub id: i64,
    pub build_type: &'static str,
    pub branch: &'static str,
    pub status: Status,
    pub personal: bool,
    pub canceled: bool,
    pub restricted: bool,
    pub tags: Vec<&'static str>,
    /// `None` while running.
    pub finish: Option<DateTime<Utc>>,
}

impl Build {
    pub fn new(id: i64, build_type: &'static str) -> Self {
        Build {
            id,
            build_type,
            branch: "main",
            status: Status::Success,
            personal: false,
            canceled: false,
            restricted: false,
            tags: Vec::new(),
            finish: Some(minute(id as u32)),
        }
    }

    pub fn branch(mut self, branch: &'static str) -> Self {
        self.branch = branch;
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn personal(mut self) -> Self {
        self.personal = true;
        self
    }

    pub fn canceled(mut self) -> Self {
        self.canceled = true;
        self
    }

    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }

    pub fn tags(mut self, tags: &[&'static str]) -> Self {
        self.tags = tags.to_vec();
        self
    }

    pub fn finish(mut self, finish: Option<DateTime<Utc>>) -> Self {
        self.finish = finish;
        self
    }
}

/// 2016-02-24 12:00 UTC plus `n` minutes.
pub fn minute(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 2, 24, 12, 0, 0).unwrap() + chrono::Duration::minutes(n as i64)
}

pub fn ids(builds: &[Build]) -> Vec<i64> {
    builds.iter().map(|b| b.id).collect()
}

fn denied(id: i64) -> LocatorError {
    LocatorError::access_denied(format!("build {id} is not visible"))
}

/// A build history, newest first.
pub fn history() -> Vec<Build> {
    vec![
        Build::new(10, "bt1").finish(None),
        Build::new(9, "bt2").branch("feature"),
        Build::new(8, "bt1").status(Status::Failure).tags(&["aaa"]),
        Build::new(7, "bt1").personal(),
        Build::new(6, "bt2").canceled().tags(&["aAa"]),
        Build::new(5, "bt1").restricted(),
        Build::new(4, "bt2").status(Status::Failure),
        Build::new(3, "bt1").branch("feature").tags(&["release"]),
        Build::new(2, "bt2"),
        Build::new(1, "bt1"),
    ]
}

pub fn build_finder(builds: Vec<Build>) -> Finder<Build> {
    let anchors = builds.clone();
    let times = TimeConditionParser::new().anchor("build", move |locator| {
        let id = locator.get_long("id")?;
        anchors
            .iter()
            .find(|b| Some(b.id) == id)
            .and_then(|b| b.finish)
            .ok_or_else(|| LocatorError::NotFound(locator.text().to_string()))
    });

    let lookup = builds.clone();
    let by_type = builds.clone();
    let branches = builds.clone();
    FinderBuilder::new("build", move || holder(builds.clone()))
        .dimension(DimensionSpec::long("id"))
        .dimension(DimensionSpec::string("buildType"))
        .dimension(DimensionSpec::new(
            "branch",
            DimensionKind::ValueCondition(ConditionDefaults::new(MatchType::Equals)),
        ))
        .dimension(DimensionSpec::new("status", DimensionKind::enum_set(Status::symbol_names())).multiple())
        .dimension(
            DimensionSpec::boolean("personal")
                .default_value("false")
                .in_default_filter(),
        )
        .dimension(
            DimensionSpec::boolean("canceled")
                .default_value("false")
                .in_default_filter(),
        )
        .dimension(DimensionSpec::new("tag", DimensionKind::ValueCondition(ConditionDefaults::TAG)))
        .dimension(DimensionSpec::time("finishDate"))
        .dimension(DimensionSpec::string("agentPool").hidden())
        .identity_dimensions(["id"])
        .identity(|a: &Build, b: &Build| a.id.cmp(&b.id))
        .item_locator(|b: &Build| format!("id:{}", b.id))
        .default_filter_predicate(|b: &Build| b.finish.is_some())
        .ordering(|a: &Build, b: &Build| a.id.cmp(&b.id))
        .single_value(move |text| {
            let Ok(id) = text.parse::<i64>() else {
                return Ok(None);
            };
            match lookup.iter().find(|b| b.id == id) {
                Some(b) if b.restricted => Err(denied(b.id)),
                found => Ok(found.cloned()),
            }
        })
        .prefilter(move |locator| {
            let Some(build_type) = locator.get_single_dimension_value("buildType")? else {
                return Ok(None);
            };
            let matching: Vec<Build> = by_type
                .iter()
                .filter(|b| b.build_type == build_type)
                .cloned()
                .collect();
            Ok(Some(holder(matching)))
        })
        .strob(|streams| {
            let Some(types) = streams.get_nested("buildType")? else {
                return Ok(Vec::new());
            };
            let names = match types.single_value() {
                Some(name) => vec![name.to_string()],
                None => types.get_dimension_values("name"),
            };
            Ok(names
                .iter()
                .map(|name| LocatorBuilder::new().dimension("buildType", name).build())
                .collect())
        })
        .sequence_dimension(DimensionSpec::nested("sameBranchAs"), move |locator, finder| {
            let Some(anchor) = locator.get_nested("sameBranchAs")? else {
                return Ok(holder(Vec::new()));
            };
            let anchor = finder.get_item(anchor.text())?;
            let same: Vec<Build> = branches
                .iter()
                .filter(|b| b.branch == anchor.branch && b.id != anchor.id)
                .cloned()
                .collect();
            Ok(holder(same))
        })
        .filter(move |locator, filter| {
            filter.add(|b: &Build| if b.restricted { Err(denied(b.id)) } else { Ok(true) });
            if let Some(id) = locator.get_long("id")? {
                filter.add_predicate(move |b: &Build| b.id == id);
            }
            if let Some(build_type) = locator.get_single_dimension_value("buildType")? {
                filter.add_predicate(move |b: &Build| b.build_type == build_type);
            }
            let defaults = ConditionDefaults::new(MatchType::Equals);
            if let Some(branch) = locator.get_value_condition("branch", &defaults)? {
                filter.add_predicate(move |b: &Build| branch.matches(Some(b.branch)));
            }
            if let Some(statuses) = locator.get_enum_set::<Status>("status")? {
                filter.add_predicate(move |b: &Build| statuses.contains(&b.status));
            }
            let personal = locator.get_boolean("personal")?;
            filter.add_predicate(move |b: &Build| personal.includes(b.personal));
            let canceled = locator.get_boolean("canceled")?;
            filter.add_predicate(move |b: &Build| canceled.includes(b.canceled));
            if let Some(tag) = locator.get_value_condition("tag", &ConditionDefaults::TAG)? {
                filter.add_predicate(move |b: &Build| tag.matches_any(b.tags.iter().copied()));
            }
            if let Some(finish) = locator.get_time_condition("finishDate", &times)? {
                if let Some(limit) = finish.limiting_date() {
                    filter.add_stop_condition(move |b: &Build| b.finish.is_some_and(|f| f < limit));
                }
                filter.add_predicate(move |b: &Build| finish.matches(b.finish));
            }
            Ok(())
        })
        .build()
}
