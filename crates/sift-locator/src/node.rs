//! Structural combinators as a small AST.
//!
//! `and`, `or`, `not` and `item` combine whole retrievals rather than
//! single-item predicates. [`NodeBuilder`] turns a locator into a
//! [`LocatorNode`] tree once, so the rest of the pipeline never has to ask
//! whether a dimension is a combinator.

use std::fmt;

use crate::dimension::BooleanFilter;
use crate::error::{LocatorError, Result};
use crate::locator::Locator;
use crate::paging::{COUNT, LOOKUP_LIMIT, START};

pub const AND: &str = "and";
pub const OR: &str = "or";
pub const NOT: &str = "not";
pub const ITEM: &str = "item";
pub const UNIQUE: &str = "unique";
pub const DEFAULT_FILTER: &str = "defaultFilter";

/// Names always legal on a top-level locator.
pub const RESERVED: [&str; 5] = [COUNT, START, LOOKUP_LIMIT, ITEM, UNIQUE];

/// Combinator names handled by the engine itself.
pub const STRUCTURAL: [&str; 4] = [AND, OR, NOT, DEFAULT_FILTER];

const PAGING: [&str; 3] = [COUNT, START, LOOKUP_LIMIT];

/// One retrieval in the tree.
#[derive(Debug, Clone)]
pub enum LocatorNode {
    Leaf(LeafNode),
    /// Items of the first set-producing child, filtered by the others.
    And(Vec<LocatorNode>),
    /// Union of independently retrieved alternatives, in order.
    Or(Vec<LocatorNode>),
    /// Complement within the enclosing retrieval.
    Not(Box<LocatorNode>),
    /// Concatenation of independent lookups.
    ItemList(Vec<LocatorNode>),
}

/// Plain dimensions evaluated by the finder's own prefilter and filter.
#[derive(Debug, Clone)]
pub struct LeafNode {
    pub locator: Locator,
    /// Whether the finder's default filter applies.
    pub default_filter: bool,
    /// Dimension that produces the candidates instead of the prefilter.
    pub sequence: Option<String>,
}

impl LocatorNode {
    /// Every leaf, depth first.
    pub fn leaves(&self) -> Vec<&LeafNode> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a LeafNode>) {
        match self {
            LocatorNode::Leaf(leaf) => out.push(leaf),
            LocatorNode::And(children)
            | LocatorNode::Or(children)
            | LocatorNode::ItemList(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            LocatorNode::Not(inner) => inner.collect_leaves(out),
        }
    }

    /// `true` if the tree merges several retrievals, which makes results
    /// unique by default.
    pub fn merges_sets(&self) -> bool {
        match self {
            LocatorNode::Or(_) | LocatorNode::ItemList(_) => true,
            LocatorNode::And(children) => children.iter().any(LocatorNode::merges_sets),
            LocatorNode::Leaf(_) | LocatorNode::Not(_) => false,
        }
    }

    /// Reports unused dimensions of all leaves at once.
    pub fn check_unused(&self) -> Result<()> {
        let mut names: Vec<String> = Vec::new();
        for leaf in self.leaves() {
            for name in leaf.locator.unused_dimensions() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        if names.is_empty() {
            Ok(())
        } else {
            Err(LocatorError::UnusedDimension { names })
        }
    }
}

impl fmt::Display for LocatorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorNode::Leaf(leaf) => write!(f, "[{}]", leaf.locator.text()),
            LocatorNode::And(children) => write_list(f, AND, children),
            LocatorNode::Or(children) => write_list(f, OR, children),
            LocatorNode::ItemList(children) => write_list(f, ITEM, children),
            LocatorNode::Not(inner) => write!(f, "not({inner})"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, tag: &str, children: &[LocatorNode]) -> fmt::Result {
    write!(f, "{tag}(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{child}")?;
    }
    write!(f, ")")
}

/// A dimension value applied when the dimension is absent.
#[derive(Debug, Clone)]
pub(crate) struct DefaultValue {
    pub name: String,
    pub value: String,
    /// Applies only while default filtering is active.
    pub filter_only: bool,
}

/// Finder-specific inputs to tree construction.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeBuilder {
    pub identity: Vec<String>,
    pub sequences: Vec<String>,
    pub defaults: Vec<DefaultValue>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    group: Option<&'static str>,
    in_and: bool,
    or_in_and: bool,
    negated: bool,
    forced: BooleanFilter,
}

impl Scope {
    fn enter(self, group: &'static str) -> Self {
        Scope {
            group: Some(group),
            in_and: self.in_and || group == AND,
            or_in_and: self.or_in_and || (group == OR && self.in_and),
            negated: self.negated || group == NOT,
            forced: self.forced,
        }
    }
}

impl NodeBuilder {
    /// Builds the tree for a top-level locator.
    ///
    /// Paging and `unique` must already have been read from `locator`.
    pub fn build(&self, locator: &Locator) -> Result<LocatorNode> {
        self.node(locator, Scope::default())
    }

    fn node(&self, locator: &Locator, scope: Scope) -> Result<LocatorNode> {
        if locator.is_single_value() {
            return Ok(LocatorNode::Leaf(LeafNode {
                locator: locator.clone(),
                default_filter: false,
                sequence: None,
            }));
        }

        if let Some(group) = scope.group {
            if let Some(name) = PAGING.into_iter().find(|n| locator.has_dimension(n)) {
                return Err(LocatorError::unsupported(format!(
                    "'{name}' is not supported inside '{group}'"
                )));
            }
        }

        let scope = Scope {
            forced: match locator.get_boolean(DEFAULT_FILTER)? {
                BooleanFilter::Any => scope.forced,
                explicit => explicit,
            },
            ..scope
        };

        let mut sets = Vec::new();
        let mut negations = Vec::new();

        for inner in locator.get_nested_all(AND)? {
            if scope.or_in_and {
                return Err(LocatorError::unsupported(
                    "'and' inside 'or' inside 'and' is not supported",
                ));
            }
            sets.push(self.node(&inner, scope.enter(AND))?);
        }

        let groups = locator.get_nested_all(OR)?;
        if groups.len() > 1 {
            return Err(LocatorError::unsupported("only one 'or' group is supported"));
        }
        if let Some(group) = groups.into_iter().next() {
            sets.push(self.alternatives(&group, scope.enter(OR))?);
        }

        let items = locator.get_nested_all(ITEM)?;
        if !items.is_empty() {
            let children = items
                .iter()
                .map(|item| self.node(item, scope.enter(ITEM)))
                .collect::<Result<Vec<_>>>()?;
            sets.push(LocatorNode::ItemList(children));
        }

        for inner in locator.get_nested_all(NOT)? {
            negations.push(LocatorNode::Not(Box::new(
                self.node(&inner, scope.enter(NOT))?,
            )));
        }

        if sets.is_empty() && negations.is_empty() {
            let leaf = self.leaf(locator.clone(), scope, true);
            // the leaf tracks its own copy from here on
            for name in locator.dimension_names() {
                locator.mark_used(name);
            }
            return Ok(LocatorNode::Leaf(leaf));
        }

        let mut excluded: Vec<&str> = STRUCTURAL.to_vec();
        excluded.extend([ITEM, UNIQUE]);
        excluded.extend(PAGING);
        let rest = locator.without(&excluded);
        for name in rest.dimension_names() {
            locator.mark_used(name);
        }

        let mut children = sets;
        let source_present = !children.is_empty();
        if !rest.is_empty() || !source_present {
            // the explicit sets carry their own defaults
            children.push(LocatorNode::Leaf(self.leaf(rest, scope, !source_present)));
        }
        children.extend(negations);

        Ok(match children.len() {
            1 => children.remove(0),
            _ => LocatorNode::And(children),
        })
    }

    fn alternatives(&self, group: &Locator, scope: Scope) -> Result<LocatorNode> {
        if group.is_single_value() || group.is_empty() {
            return Err(LocatorError::unsupported(format!(
                "'or' expects dimensions, got '{}'",
                group.text()
            )));
        }
        let children = group
            .entries()
            .iter()
            .map(|entry| {
                let alternative = Locator::from_entries(vec![entry.clone()]);
                self.node(&alternative, scope)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(LocatorNode::Or(children))
    }

    fn leaf(&self, locator: Locator, scope: Scope, source: bool) -> LeafNode {
        let has_identity = self.identity.iter().any(|n| locator.has_dimension(n));
        let default_filter = source
            && !scope.negated
            && match scope.forced {
                BooleanFilter::True => true,
                BooleanFilter::False => false,
                BooleanFilter::Any => !has_identity,
            };

        let mut locator = locator;
        for default in &self.defaults {
            if default.filter_only && !default_filter {
                continue;
            }
            if !locator.has_dimension(&default.name) {
                locator = locator.with_default(&default.name, &default.value);
                locator.ignore(&default.name);
            }
        }

        let sequence = self
            .sequences
            .iter()
            .find(|name| locator.has_dimension(name))
            .cloned();

        LeafNode {
            locator,
            default_filter,
            sequence,
        }
    }
}
