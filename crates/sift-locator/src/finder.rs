//! The retrieval pipeline.
//!
//! A [`Finder`] is assembled from dimension declarations and a handful of
//! collaborator closures with [`FinderBuilder`]. Every retrieval runs the
//! same stages:
//!
//! ```text
//! parse -> unknown-dimension check -> single-value bypass -> paging
//!       -> locator tree -> validation -> candidate streams -> unused check
//!       -> dedupe -> paginate
//! ```
//!
//! Candidate streams are lazy: nothing is pulled from a source until the
//! page is being filled, and pulling stops once the page is full or the
//! lookup limit is spent.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::dedup::{dedupe, Comparator, DuplicateChecker};
use crate::dimension::{BooleanFilter, DimensionSpec};
use crate::error::{LocatorError, Result};
use crate::filter::{ItemFilter, MultiCheckerFilter};
use crate::holder::{holder, infallible, ItemHolder, ItemStream};
use crate::locator::Locator;
use crate::node::{
    DefaultValue, LeafNode, LocatorNode, NodeBuilder, RESERVED, STRUCTURAL, UNIQUE,
};
use crate::paging::{paginate, Budget, PagedResult, PagingRequest, COUNT};
use crate::settings::EngineSettings;
use crate::syntax::LocatorBuilder;

/// `ordered:(<locator>)`: the result of the inner locator, re-sorted.
pub const ORDERED: &str = "ordered";
/// `strob:(<streams>,locator:(<per stream>))`: one retrieval per stream.
pub const STROB: &str = "strob";
const STROB_LOCATOR: &str = "locator";

type AllItems<T> = Box<dyn Fn() -> ItemHolder<T>>;
type Prefilter<T> = Box<dyn Fn(&Locator) -> Result<Option<ItemHolder<T>>>>;
type FilterFactory<T> = Box<dyn Fn(&Locator, &mut MultiCheckerFilter<T>) -> Result<()>>;
type SingleValueLookup<T> = Box<dyn Fn(&str) -> Result<Option<T>>>;
type ItemLocator<T> = Rc<dyn Fn(&T) -> String>;
type DefaultPredicate<T> = Rc<dyn Fn(&T) -> bool>;
type StrobExpander = Box<dyn Fn(&Locator) -> Result<Vec<String>>>;
type SequenceSource<T> = Box<dyn Fn(&Locator, &Finder<T>) -> Result<ItemHolder<T>>>;
type Predicate<T> = Box<dyn Fn(&T) -> Result<bool>>;

/// Assembles a [`Finder`].
pub struct FinderBuilder<T> {
    name: String,
    specs: Vec<DimensionSpec>,
    all_items: AllItems<T>,
    prefilter: Option<Prefilter<T>>,
    filter: Option<FilterFactory<T>>,
    single_value: Option<SingleValueLookup<T>>,
    identity: Option<Comparator<T>>,
    item_locator: Option<ItemLocator<T>>,
    identity_dimensions: Vec<String>,
    default_predicate: Option<DefaultPredicate<T>>,
    ordering: Option<Comparator<T>>,
    strob: Option<StrobExpander>,
    sequences: Vec<(String, SequenceSource<T>)>,
    settings: EngineSettings,
}

impl<T: Clone + 'static> FinderBuilder<T> {
    /// Starts a finder whose full candidate set comes from `all_items`.
    pub fn new<F>(name: impl Into<String>, all_items: F) -> Self
    where
        F: Fn() -> ItemHolder<T> + 'static,
    {
        FinderBuilder {
            name: name.into(),
            specs: Vec::new(),
            all_items: Box::new(all_items),
            prefilter: None,
            filter: None,
            single_value: None,
            identity: None,
            item_locator: None,
            identity_dimensions: Vec::new(),
            default_predicate: None,
            ordering: None,
            strob: None,
            sequences: Vec::new(),
            settings: EngineSettings::default(),
        }
    }

    pub fn dimension(mut self, spec: DimensionSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Narrows the candidates for a locator, or returns `None` to scan
    /// everything. Dimensions read here must still be honored by the filter.
    pub fn prefilter<F>(mut self, prefilter: F) -> Self
    where
        F: Fn(&Locator) -> Result<Option<ItemHolder<T>>> + 'static,
    {
        self.prefilter = Some(Box::new(prefilter));
        self
    }

    /// Adds the checks for every dimension of a locator.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Locator, &mut MultiCheckerFilter<T>) -> Result<()> + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Resolves a single-value locator such as an id or a name.
    pub fn single_value<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Result<Option<T>> + 'static,
    {
        self.single_value = Some(Box::new(lookup));
        self
    }

    /// Identity comparator used for deduplication and set membership.
    pub fn identity<F>(mut self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + 'static,
    {
        self.identity = Some(Rc::new(compare));
        self
    }

    /// Renders the locator that finds exactly this item.
    pub fn item_locator<F>(mut self, render: F) -> Self
    where
        F: Fn(&T) -> String + 'static,
    {
        self.item_locator = Some(Rc::new(render));
        self
    }

    /// Dimensions that select specific items and so disable default
    /// filtering.
    pub fn identity_dimensions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identity_dimensions = names.into_iter().map(Into::into).collect();
        self
    }

    /// Extra check applied while default filtering is active.
    pub fn default_filter_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.default_predicate = Some(Rc::new(predicate));
        self
    }

    /// Enables `ordered:(<locator>)` with this ordering.
    pub fn ordering<F>(mut self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + 'static,
    {
        self.ordering = Some(Rc::new(compare));
        self
    }

    /// Enables `strob:(...)`; the expander maps the streams locator to one
    /// locator fragment per stream.
    pub fn strob<F>(mut self, expander: F) -> Self
    where
        F: Fn(&Locator) -> Result<Vec<String>> + 'static,
    {
        self.strob = Some(Box::new(expander));
        self
    }

    /// Registers a dimension that produces its own candidate sequence.
    ///
    /// The source receives the whole leaf locator and must mark the
    /// dimension used.
    pub fn sequence_dimension<F>(mut self, spec: DimensionSpec, source: F) -> Self
    where
        F: Fn(&Locator, &Finder<T>) -> Result<ItemHolder<T>> + 'static,
    {
        self.sequences.push((spec.name().to_string(), Box::new(source)));
        self.specs.push(spec);
        self
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn default_count(mut self, count: usize) -> Self {
        self.settings.default_count = Some(count);
        self
    }

    pub fn default_lookup_limit(mut self, limit: usize) -> Self {
        self.settings.default_lookup_limit = Some(limit);
        self
    }

    pub fn build(self) -> Finder<T> {
        let mut sequences: Vec<String> = self.sequences.iter().map(|(n, _)| n.clone()).collect();
        if self.ordering.is_some() {
            sequences.push(ORDERED.to_string());
        }
        if self.strob.is_some() {
            sequences.push(STROB.to_string());
        }

        let defaults = self
            .specs
            .iter()
            .filter_map(|spec| {
                spec.default().map(|value| DefaultValue {
                    name: spec.name().to_string(),
                    value: value.to_string(),
                    filter_only: spec.participates_in_default_filter(),
                })
            })
            .collect();

        let mut known: Vec<String> = self.specs.iter().map(|s| s.name().to_string()).collect();
        let mut advertised: Vec<String> = self
            .specs
            .iter()
            .filter(|s| !s.is_hidden())
            .map(|s| s.name().to_string())
            .collect();
        for name in RESERVED.iter().chain(STRUCTURAL.iter()) {
            known.push(name.to_string());
            advertised.push(name.to_string());
        }
        for name in [ORDERED, STROB] {
            if sequences.iter().any(|s| s == name) {
                known.push(name.to_string());
                advertised.push(name.to_string());
            }
        }

        let identity = self.identity.or_else(|| {
            self.item_locator.clone().map(|render| {
                Rc::new(move |a: &T, b: &T| render(a).cmp(&render(b))) as Comparator<T>
            })
        });

        Finder {
            rules: NodeBuilder {
                identity: self.identity_dimensions,
                sequences,
                defaults,
            },
            name: self.name,
            specs: self.specs,
            known,
            advertised,
            all_items: self.all_items,
            prefilter: self.prefilter,
            filter: self.filter,
            single_value: self.single_value,
            identity,
            item_locator: self.item_locator,
            default_predicate: self.default_predicate,
            ordering: self.ordering,
            strob: self.strob,
            sequences: self.sequences,
            settings: self.settings,
        }
    }
}

/// Locator-driven retrieval over items of type `T`.
pub struct Finder<T> {
    name: String,
    specs: Vec<DimensionSpec>,
    known: Vec<String>,
    advertised: Vec<String>,
    rules: NodeBuilder,
    all_items: AllItems<T>,
    prefilter: Option<Prefilter<T>>,
    filter: Option<FilterFactory<T>>,
    single_value: Option<SingleValueLookup<T>>,
    identity: Option<Comparator<T>>,
    item_locator: Option<ItemLocator<T>>,
    default_predicate: Option<DefaultPredicate<T>>,
    ordering: Option<Comparator<T>>,
    strob: Option<StrobExpander>,
    sequences: Vec<(String, SequenceSource<T>)>,
    settings: EngineSettings,
}

impl<T: Clone + 'static> Finder<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Advertised dimension declarations.
    pub fn describe(&self) -> Vec<&DimensionSpec> {
        self.specs.iter().filter(|s| !s.is_hidden()).collect()
    }

    /// The locator that finds exactly `item`, if the finder can render one.
    pub fn item_locator(&self, item: &T) -> Option<String> {
        self.item_locator.as_ref().map(|render| render(item))
    }

    /// Parses `text` and retrieves one page of items.
    pub fn get_items(&self, text: &str) -> Result<PagedResult<T>> {
        let locator = Locator::parse(text)?;
        self.retrieve(&locator)
    }

    /// Retrieves one page of items for a parsed locator.
    pub fn retrieve(&self, locator: &Locator) -> Result<PagedResult<T>> {
        tracing::debug!(finder = %self.name, locator = %locator, "retrieving items");
        let result = self.run(locator, None, &self.settings)?;
        tracing::debug!(
            finder = %self.name,
            items = result.len(),
            processed = result.processed,
            lookup_limit_reached = result.lookup_limit_reached,
            "retrieval finished"
        );
        Ok(result)
    }

    /// Retrieves exactly one item.
    ///
    /// Without an explicit `count` the search stops after the second match.
    pub fn get_item(&self, text: &str) -> Result<T> {
        let locator = Locator::parse(text)?.with_default(COUNT, "2");
        let mut items = self.retrieve(&locator)?.into_items();
        match items.len() {
            0 => Err(LocatorError::NotFound(text.to_string())),
            1 => Ok(items.remove(0)),
            _ => Err(LocatorError::MultipleMatches {
                locator: text.to_string(),
            }),
        }
    }

    fn run(
        &self,
        locator: &Locator,
        budget: Option<&Rc<Budget>>,
        settings: &EngineSettings,
    ) -> Result<PagedResult<T>> {
        if let Some(value) = locator.single_value() {
            let items: Vec<T> = self.lookup_single(value)?.into_iter().collect();
            return Ok(PagedResult {
                processed: items.len(),
                items,
                lookup_limit_reached: false,
                count: None,
                start: 0,
                lookup_limit: None,
            });
        }

        self.check_known(locator)?;
        let paging = PagingRequest::from_locator(locator, settings)?;
        let budget = match budget {
            Some(shared) => Rc::clone(shared),
            None => Budget::new(paging.lookup_limit),
        };
        let stream = self.prepare(locator, &budget)?;
        paginate(stream, &paging, &budget)
    }

    /// Builds the deduplicated candidate stream and runs every check that
    /// must pass before the first item is pulled.
    fn prepare(&self, locator: &Locator, budget: &Rc<Budget>) -> Result<ItemStream<T>> {
        let unique = locator.get_boolean(UNIQUE)?;
        let node = self.rules.build(locator)?;
        tracing::debug!(finder = %self.name, tree = %node, "locator tree built");

        for leaf in node.leaves() {
            self.check_known(&leaf.locator)?;
            self.validate(&leaf.locator)?;
        }

        let stream = self.stream(&node, budget)?;
        locator.check_unused()?;
        node.check_unused()?;

        let unique = match unique {
            BooleanFilter::Any => node.merges_sets(),
            explicit => explicit == BooleanFilter::True,
        };
        if !unique {
            return Ok(stream);
        }
        match &self.identity {
            Some(compare) => Ok(Box::new(dedupe(stream, Rc::clone(compare)))),
            None => Err(LocatorError::unsupported(format!(
                "'{}' cannot remove duplicates without an identity comparator",
                self.name
            ))),
        }
    }

    fn check_known(&self, locator: &Locator) -> Result<()> {
        match locator
            .dimension_names()
            .into_iter()
            .find(|name| !self.known.iter().any(|k| k == name))
        {
            Some(name) => Err(LocatorError::UnknownDimension {
                name: name.to_string(),
                supported: self.advertised.clone(),
            }),
            None => Ok(()),
        }
    }

    fn validate(&self, locator: &Locator) -> Result<()> {
        for spec in &self.specs {
            spec.validate(locator)?;
            if spec.is_hidden() {
                locator.ignore(spec.name());
            }
        }
        Ok(())
    }

    fn lookup_single(&self, value: &str) -> Result<Option<T>> {
        match &self.single_value {
            Some(lookup) => lookup(value),
            None => Err(LocatorError::unsupported(format!(
                "'{}' does not support single value locators",
                self.name
            ))),
        }
    }

    fn all_stream(&self, budget: &Rc<Budget>) -> ItemStream<T> {
        infallible(budget.wrap((self.all_items)()))
    }

    fn stream(&self, node: &LocatorNode, budget: &Rc<Budget>) -> Result<ItemStream<T>> {
        match node {
            LocatorNode::Leaf(leaf) => self.leaf_stream(leaf, budget),
            LocatorNode::Or(children) | LocatorNode::ItemList(children) => {
                let streams = children
                    .iter()
                    .map(|child| self.stream(child, budget))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Box::new(streams.into_iter().flatten()))
            }
            LocatorNode::And(children) => {
                let source = source_index(children);
                let mut predicates = Vec::new();
                for (i, child) in children.iter().enumerate() {
                    if Some(i) != source {
                        predicates.push(self.predicate(child, budget)?);
                    }
                }
                let candidates = match source {
                    Some(i) => self.stream(&children[i], budget)?,
                    None => self.all_stream(budget),
                };
                Ok(restrict(candidates, predicates))
            }
            LocatorNode::Not(_) => {
                let predicate = self.predicate(node, budget)?;
                Ok(restrict(self.all_stream(budget), vec![predicate]))
            }
        }
    }

    fn leaf_stream(&self, leaf: &LeafNode, budget: &Rc<Budget>) -> Result<ItemStream<T>> {
        if let Some(value) = leaf.locator.single_value() {
            return match self.lookup_single(value) {
                Ok(Some(item)) => Ok(infallible(budget.wrap(holder(Some(item))))),
                Ok(None) => Err(LocatorError::NotFound(value.to_string())),
                Err(err) if err.is_access_denied() => {
                    tracing::trace!(finder = %self.name, error = %err, "item skipped");
                    Ok(Box::new(std::iter::empty()))
                }
                Err(err) => Err(err),
            };
        }

        let candidates = match &leaf.sequence {
            Some(name) => self.sequence_source(name, &leaf.locator, budget)?,
            None => {
                let prefiltered = match &self.prefilter {
                    Some(prefilter) => prefilter(&leaf.locator)?,
                    None => None,
                };
                match prefiltered {
                    Some(items) => {
                        tracing::debug!(finder = %self.name, locator = %leaf.locator, "prefiltered");
                        budget.wrap(items)
                    }
                    None => budget.wrap((self.all_items)()),
                }
            }
        };
        let filter = self.leaf_filter(leaf)?;
        Ok(scan(candidates, filter))
    }

    fn leaf_filter(&self, leaf: &LeafNode) -> Result<MultiCheckerFilter<T>> {
        let mut filter = MultiCheckerFilter::new();
        if let Some(factory) = &self.filter {
            factory(&leaf.locator, &mut filter)?;
        }
        if leaf.default_filter {
            if let Some(predicate) = &self.default_predicate {
                let predicate = Rc::clone(predicate);
                filter.add_predicate(move |item| predicate(item));
            }
        }
        Ok(filter)
    }

    /// A check equivalent to membership in the node's result.
    fn predicate(&self, node: &LocatorNode, budget: &Rc<Budget>) -> Result<Predicate<T>> {
        match node {
            LocatorNode::Leaf(leaf) if leaf.locator.is_single_value() || leaf.sequence.is_some() => {
                self.membership(self.leaf_stream(leaf, budget)?)
            }
            LocatorNode::Leaf(leaf) => {
                let filter = self.leaf_filter(leaf)?;
                Ok(Box::new(move |item| filter.is_included(item)))
            }
            LocatorNode::And(children) => {
                let checks = children
                    .iter()
                    .map(|child| self.predicate(child, budget))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Box::new(move |item| all(&checks, item)))
            }
            LocatorNode::Or(children) => {
                let checks = children
                    .iter()
                    .map(|child| self.predicate(child, budget))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Box::new(move |item| {
                    for check in &checks {
                        if check(item)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }))
            }
            LocatorNode::Not(inner) => {
                let check = self.predicate(inner, budget)?;
                Ok(Box::new(move |item| check(item).map(|included| !included)))
            }
            LocatorNode::ItemList(_) => self.membership(self.stream(node, budget)?),
        }
    }

    fn membership(&self, items: ItemStream<T>) -> Result<Predicate<T>> {
        let compare = self.identity.clone().ok_or_else(|| {
            LocatorError::unsupported(format!("'{}' cannot compare items by identity", self.name))
        })?;
        let mut members = DuplicateChecker::new(compare);
        for item in items {
            members.check_and_add(&item?);
        }
        Ok(Box::new(move |item| Ok(members.contains(item))))
    }

    fn sequence_source(
        &self,
        name: &str,
        locator: &Locator,
        budget: &Rc<Budget>,
    ) -> Result<ItemHolder<T>> {
        match (name, &self.ordering, &self.strob) {
            (ORDERED, Some(compare), _) => {
                let Some(inner) = locator.get_nested(ORDERED)? else {
                    return Ok(holder(Vec::new()));
                };
                let mut items = self
                    .run(&inner, Some(budget), &EngineSettings::default())?
                    .into_items();
                items.sort_by(|a, b| compare(a, b));
                Ok(holder(items))
            }
            (STROB, _, Some(expander)) => self.strob_items(expander, locator, budget),
            _ => {
                let Some((_, source)) = self.sequences.iter().find(|(n, _)| n == name) else {
                    return Err(LocatorError::unsupported(format!(
                        "'{name}' is not supported by '{}'",
                        self.name
                    )));
                };
                Ok(budget.wrap(source(locator, self)?))
            }
        }
    }

    fn strob_items(
        &self,
        expander: &StrobExpander,
        locator: &Locator,
        budget: &Rc<Budget>,
    ) -> Result<ItemHolder<T>> {
        let Some(spec) = locator.get_nested(STROB)? else {
            return Ok(holder(Vec::new()));
        };
        let per_stream = spec.get_nested(STROB_LOCATOR)?;
        let streams = if spec.is_single_value() {
            spec.clone()
        } else {
            let streams = spec.without(&[STROB_LOCATOR]);
            for name in streams.dimension_names() {
                spec.mark_used(name);
            }
            streams
        };
        spec.check_unused()?;

        let fragments = expander(&streams)?;
        streams.check_unused()?;
        tracing::debug!(finder = %self.name, streams = fragments.len(), "expanded strob");

        let mut items = Vec::new();
        for fragment in fragments {
            let text = LocatorBuilder::new()
                .raw(&fragment)
                .raw(per_stream.as_ref().map(Locator::text).unwrap_or_default())
                .build();
            let combined = Locator::parse(&text)?;
            items.extend(self.run(&combined, Some(budget), &self.settings)?.into_items());
        }
        Ok(holder(items))
    }
}

impl<T> fmt::Debug for Finder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finder")
            .field("name", &self.name)
            .field("dimensions", &self.advertised)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// Priority: explicit item lists, then `or` groups, then plain leaves.
fn source_index(children: &[LocatorNode]) -> Option<usize> {
    let position = |wanted: fn(&LocatorNode) -> bool| children.iter().position(|c| wanted(c));
    position(|c| matches!(c, LocatorNode::ItemList(_)))
        .or_else(|| position(|c| matches!(c, LocatorNode::Or(_))))
        .or_else(|| position(|c| matches!(c, LocatorNode::Leaf(_))))
        .or_else(|| position(|c| matches!(c, LocatorNode::And(_))))
}

fn all<T>(checks: &[Predicate<T>], item: &T) -> Result<bool> {
    for check in checks {
        if !check(item)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Access denial excludes the item instead of failing the retrieval.
fn keep<T>(verdict: Result<bool>, item: T) -> Option<Result<T>> {
    match verdict {
        Ok(true) => Some(Ok(item)),
        Ok(false) => None,
        Err(err) if err.is_access_denied() => {
            tracing::trace!(error = %err, "item skipped");
            None
        }
        Err(err) => Some(Err(err)),
    }
}

fn scan<T: 'static>(candidates: ItemHolder<T>, filter: MultiCheckerFilter<T>) -> ItemStream<T> {
    let filter = Rc::new(filter);
    let stop = Rc::clone(&filter);
    Box::new(
        candidates
            .take_while(move |item| !stop.should_stop(item))
            .filter_map(move |item| keep(filter.is_included(&item), item)),
    )
}

fn restrict<T: 'static>(candidates: ItemStream<T>, checks: Vec<Predicate<T>>) -> ItemStream<T> {
    if checks.is_empty() {
        return candidates;
    }
    Box::new(candidates.filter_map(move |item| match item {
        Ok(item) => keep(all(&checks, &item), item),
        Err(err) => Some(Err(err)),
    }))
}
