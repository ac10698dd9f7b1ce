//! Lazy candidate sequences.
//!
//! Sources hand the engine an [`ItemHolder`]: a boxed iterator that may be
//! long or unbounded. The engine only pulls as many items as the page and
//! the lookup limit need.

use crate::error::Result;

/// A lazily produced sequence of candidate items.
pub type ItemHolder<T> = Box<dyn Iterator<Item = T>>;

/// Candidates after filtering; errors abort the retrieval.
pub(crate) type ItemStream<T> = Box<dyn Iterator<Item = Result<T>>>;

/// Holder over any owned iterable.
pub fn holder<I>(items: I) -> ItemHolder<I::Item>
where
    I: IntoIterator,
    I::IntoIter: 'static,
{
    Box::new(items.into_iter())
}

pub fn empty<T: 'static>() -> ItemHolder<T> {
    Box::new(std::iter::empty())
}

pub(crate) fn infallible<T: 'static>(items: ItemHolder<T>) -> ItemStream<T> {
    Box::new(items.map(Ok))
}
