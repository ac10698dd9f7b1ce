//! Paging, lookup-limit accounting and paged results.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::{LocatorError, Result};
use crate::holder::{ItemHolder, ItemStream};
use crate::locator::Locator;
use crate::settings::EngineSettings;

pub const COUNT: &str = "count";
pub const START: &str = "start";
pub const LOOKUP_LIMIT: &str = "lookupLimit";

/// Resolved paging dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PagingRequest {
    /// Page size; `None` is unbounded.
    pub count: Option<usize>,
    /// Matches to skip.
    pub start: usize,
    /// Candidates to scan at most; `None` is unlimited.
    pub lookup_limit: Option<usize>,
}

impl PagingRequest {
    pub fn unlimited() -> Self {
        PagingRequest::default()
    }

    /// Reads `count`, `start` and `lookupLimit`, applying the defaults.
    ///
    /// A negative `count` or `lookupLimit` explicitly means "no limit".
    pub fn from_locator(locator: &Locator, settings: &EngineSettings) -> Result<Self> {
        let count = match locator.get_long(COUNT)? {
            Some(n) => usize::try_from(n).ok(),
            None => settings.default_count,
        };
        let start = match locator.get_long(START)? {
            Some(n) => usize::try_from(n).map_err(|_| {
                LocatorError::conversion(START, n.to_string(), "must not be negative")
            })?,
            None => 0,
        };
        let lookup_limit = match locator.get_long(LOOKUP_LIMIT)? {
            Some(n) => settings.cap_lookup_limit(usize::try_from(n).ok()),
            None => settings.cap_lookup_limit(settings.default_lookup_limit),
        };
        Ok(PagingRequest {
            count,
            start,
            lookup_limit,
        })
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Candidates pulled from the sources.
    pub processed: usize,
    /// The scan ended because of the lookup limit while candidates remained.
    pub lookup_limit_reached: bool,
    pub count: Option<usize>,
    pub start: usize,
    pub lookup_limit: Option<usize>,
}

impl<T> PagedResult<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> IntoIterator for PagedResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Lookup budget shared by every source of one retrieval.
#[derive(Debug)]
pub(crate) struct Budget {
    limit: Option<usize>,
    processed: Cell<usize>,
    reached: Cell<bool>,
}

impl Budget {
    pub(crate) fn new(limit: Option<usize>) -> Rc<Self> {
        Rc::new(Budget {
            limit,
            processed: Cell::new(0),
            reached: Cell::new(false),
        })
    }

    pub(crate) fn processed(&self) -> usize {
        self.processed.get()
    }

    pub(crate) fn limit_reached(&self) -> bool {
        self.reached.get()
    }

    /// Counts every pull from `items` against this budget.
    pub(crate) fn wrap<T: 'static>(self: &Rc<Self>, items: ItemHolder<T>) -> ItemHolder<T> {
        Box::new(Budgeted {
            inner: items,
            budget: Rc::clone(self),
        })
    }
}

struct Budgeted<T> {
    inner: ItemHolder<T>,
    budget: Rc<Budget>,
}

impl<T> Iterator for Budgeted<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let budget = &self.budget;
        if let Some(limit) = budget.limit {
            if budget.processed.get() >= limit {
                // nothing is pulled past the limit: a source is truncated
                // unless its size hint says it is exhausted
                if !budget.reached.get() && self.inner.size_hint().1 != Some(0) {
                    budget.reached.set(true);
                    tracing::debug!(limit, "lookup limit reached");
                }
                return None;
            }
        }
        let item = self.inner.next()?;
        budget.processed.set(budget.processed.get() + 1);
        Some(item)
    }
}

/// Skips `start` matches and collects up to `count`, pulling no further.
pub(crate) fn paginate<T>(
    stream: ItemStream<T>,
    paging: &PagingRequest,
    budget: &Budget,
) -> Result<PagedResult<T>> {
    let mut items = Vec::new();
    if paging.count != Some(0) {
        let mut skipped = 0;
        for item in stream {
            let item = item?;
            if skipped < paging.start {
                skipped += 1;
                continue;
            }
            items.push(item);
            if paging.count == Some(items.len()) {
                break;
            }
        }
    }
    Ok(PagedResult {
        items,
        processed: budget.processed(),
        lookup_limit_reached: budget.limit_reached(),
        count: paging.count,
        start: paging.start,
        lookup_limit: paging.lookup_limit,
    })
}
