//! Comparator-driven duplicate detection.

use std::cmp::Ordering;
use std::rc::Rc;

/// Identity comparator: `Equal` means "same item".
pub type Comparator<T> = Rc<dyn Fn(&T, &T) -> Ordering>;

/// Remembers seen items in comparator order for O(log n) lookups.
///
/// Callers keep their own output order; the checker only answers "seen
/// before?".
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use sift_locator::DuplicateChecker;
///
/// let mut checker = DuplicateChecker::new(Rc::new(|a: &u32, b: &u32| a.cmp(b)));
/// let unique: Vec<u32> = [3, 1, 3, 2, 1]
///     .into_iter()
///     .filter(|n| checker.check_and_add(n))
///     .collect();
/// assert_eq!(unique, vec![3, 1, 2]);
/// ```
pub struct DuplicateChecker<T> {
    compare: Comparator<T>,
    seen: Vec<T>,
}

impl<T: Clone> DuplicateChecker<T> {
    pub fn new(compare: Comparator<T>) -> Self {
        DuplicateChecker {
            compare,
            seen: Vec::new(),
        }
    }

    /// Returns `true` and remembers the item if it was not seen before.
    pub fn check_and_add(&mut self, item: &T) -> bool {
        match self
            .seen
            .binary_search_by(|probe| (self.compare)(probe, item))
        {
            Ok(_) => false,
            Err(position) => {
                self.seen.insert(position, item.clone());
                true
            }
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.seen
            .binary_search_by(|probe| (self.compare)(probe, item))
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Drops items already produced earlier in the stream.
pub(crate) fn dedupe<T, I>(items: I, compare: Comparator<T>) -> impl Iterator<Item = crate::Result<T>>
where
    T: Clone,
    I: Iterator<Item = crate::Result<T>>,
{
    let mut checker = DuplicateChecker::new(compare);
    items.filter(move |item| match item {
        Ok(item) => checker.check_and_add(item),
        Err(_) => true,
    })
}
