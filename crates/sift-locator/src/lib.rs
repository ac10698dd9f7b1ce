//! Sift - locator query engine for build-server style collections.
//!
//! A *locator* is a compact text query such as
//! `buildType:(id:bt1),status:SUCCESS,count:10` or a single value like `12345`.
//! This crate parses locators, validates them against the dimensions a
//! collection declares, and retrieves matching items lazily with paging and a
//! lookup limit. It supports:
//!
//! - Nested values in parentheses and `$base64:` literal values
//! - Typed dimensions: strings, longs, tri-state booleans, enum sets, times
//!   and value conditions
//! - Structural combinators: `and`, `or`, `not`, `item`, `unique` and
//!   `defaultFilter`
//! - Unknown and unused dimension detection, so typos never pass silently
//! - A natural path ordering with a strict total order
//!
//! # Quick Start
//!
//! ```rust
//! use sift_locator::{holder, DimensionSpec, FinderBuilder};
//!
//! #[derive(Debug, Clone)]
//! struct Build {
//!     id: i64,
//!     branch: &'static str,
//!     personal: bool,
//! }
//!
//! let builds = vec![
//!     Build { id: 1, branch: "main", personal: false },
//!     Build { id: 2, branch: "main", personal: true },
//!     Build { id: 3, branch: "dev", personal: false },
//! ];
//!
//! let finder = FinderBuilder::new("build", move || holder(builds.clone()))
//!     .dimension(DimensionSpec::long("id"))
//!     .dimension(DimensionSpec::string("branch"))
//!     .dimension(
//!         DimensionSpec::boolean("personal")
//!             .default_value("false")
//!             .in_default_filter(),
//!     )
//!     .identity_dimensions(["id"])
//!     .filter(|locator, filter| {
//!         if let Some(id) = locator.get_long("id")? {
//!             filter.add_predicate(move |b: &Build| b.id == id);
//!         }
//!         if let Some(branch) = locator.get_single_dimension_value("branch")? {
//!             filter.add_predicate(move |b: &Build| b.branch == branch);
//!         }
//!         let personal = locator.get_boolean("personal")?;
//!         filter.add_predicate(move |b: &Build| personal.includes(b.personal));
//!         Ok(())
//!     })
//!     .build();
//!
//! // personal builds are hidden by default
//! let ids: Vec<i64> = finder.get_items("branch:main").unwrap().iter().map(|b| b.id).collect();
//! assert_eq!(ids, vec![1]);
//!
//! // asking for an id switches the default filter off
//! assert_eq!(finder.get_item("id:2").unwrap().id, 2);
//!
//! // typos are rejected rather than ignored
//! assert!(finder.get_items("brnach:main").is_err());
//! ```
//!
//! # Retrieval Semantics
//!
//! ```text
//! result = page(start, count,
//!            dedupe(evaluate(tree(locator)) limited by lookupLimit))
//! ```
//!
//! - **Leaf**: the finder's prefilter (or all items), then every check the
//!   filter registered for the leaf's dimensions
//! - **or**: union of the alternatives, in order
//! - **and**: items of the first set-producing child, filtered by the rest
//! - **not**: complement within the enclosing retrieval
//! - **item**: concatenation of independent lookups
//!
//! Every dimension must be read by someone; dimensions left unread fail the
//! whole retrieval with [`LocatorError::UnusedDimension`].

mod condition;
mod dedup;
mod dimension;
mod error;
mod filter;
mod finder;
mod holder;
mod locator;
mod node;
mod ordering;
mod paging;
mod settings;
pub mod syntax;
mod time;

// Re-export public API
pub use condition::{ConditionDefaults, MatchType, ValueCondition};
pub use dedup::{Comparator, DuplicateChecker};
pub use dimension::{
    is_included_by_boolean_filter, BooleanFilter, DimensionEnum, DimensionKind, DimensionSpec,
};
pub use error::{ErrorKind, LocatorError, Result};
pub use filter::{ItemFilter, MultiCheckerFilter};
pub use finder::{Finder, FinderBuilder, ORDERED, STROB};
pub use holder::{empty, holder, ItemHolder};
pub use locator::Locator;
pub use node::{
    LeafNode, LocatorNode, AND, DEFAULT_FILTER, ITEM, NOT, OR, RESERVED, STRUCTURAL, UNIQUE,
};
pub use ordering::{path_compare, PathKey, PathOrder};
pub use paging::{PagedResult, PagingRequest, COUNT, LOOKUP_LIMIT, START};
pub use settings::EngineSettings;
pub use time::{
    parse_date, parse_shift, AnchorResolver, Clock, TimeComparison, TimeCondition,
    TimeConditionParser,
};
