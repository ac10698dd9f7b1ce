//! Per-item predicates.

use crate::error::Result;

/// A predicate over items plus an early-termination signal.
pub trait ItemFilter<T> {
    /// Returns `true` if the item passes.
    fn is_included(&self, item: &T) -> Result<bool>;

    /// Returns `true` if the scan should end before this item. Used with
    /// sorted sources, e.g. builds in descending finish order.
    fn should_stop(&self, _item: &T) -> bool {
        false
    }
}

type Checker<T> = Box<dyn Fn(&T) -> Result<bool>>;
type StopCondition<T> = Box<dyn Fn(&T) -> bool>;

/// Conjunction of independent checks.
///
/// An empty filter includes everything.
///
/// # Example
///
/// ```
/// use sift_locator::{ItemFilter, MultiCheckerFilter};
///
/// let mut filter = MultiCheckerFilter::new();
/// filter.add_predicate(|n: &i32| *n > 2);
/// filter.add_predicate(|n: &i32| n % 2 == 0);
/// assert!(filter.is_included(&4).unwrap());
/// assert!(!filter.is_included(&3).unwrap());
/// ```
pub struct MultiCheckerFilter<T> {
    checkers: Vec<Checker<T>>,
    stops: Vec<StopCondition<T>>,
}

impl<T> MultiCheckerFilter<T> {
    pub fn new() -> Self {
        MultiCheckerFilter {
            checkers: Vec::new(),
            stops: Vec::new(),
        }
    }

    /// Adds a check that may fail, e.g. with an access denial.
    pub fn add<F>(&mut self, checker: F) -> &mut Self
    where
        F: Fn(&T) -> Result<bool> + 'static,
    {
        self.checkers.push(Box::new(checker));
        self
    }

    pub fn add_predicate<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.add(move |item| Ok(predicate(item)))
    }

    pub fn add_stop_condition<F>(&mut self, condition: F) -> &mut Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.stops.push(Box::new(condition));
        self
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty() && self.stops.is_empty()
    }
}

impl<T> Default for MultiCheckerFilter<T> {
    fn default() -> Self {
        MultiCheckerFilter::new()
    }
}

impl<T> ItemFilter<T> for MultiCheckerFilter<T> {
    fn is_included(&self, item: &T) -> Result<bool> {
        for checker in &self.checkers {
            if !checker(item)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn should_stop(&self, item: &T) -> bool {
        self.stops.iter().any(|stop| stop(item))
    }
}

impl<T> std::fmt::Debug for MultiCheckerFilter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiCheckerFilter")
            .field("checkers", &self.checkers.len())
            .field("stop_conditions", &self.stops.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LocatorError;

    #[test]
    fn empty_includes_everything() {
        let filter = MultiCheckerFilter::<i32>::new();
        assert!(filter.is_empty());
        assert!(filter.is_included(&1).unwrap());
        assert!(!filter.should_stop(&1));
    }

    #[test]
    fn checks_short_circuit() {
        let mut filter = MultiCheckerFilter::new();
        filter
            .add_predicate(|n: &i32| *n > 0)
            .add(|_: &i32| Err(LocatorError::access_denied("second check ran")));
        assert!(!filter.is_included(&-1).unwrap());
        assert!(filter.is_included(&1).unwrap_err().is_access_denied());
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn stop_conditions() {
        let mut filter = MultiCheckerFilter::new();
        filter.add_stop_condition(|n: &i32| *n < 10);
        assert!(filter.should_stop(&5));
        assert!(!filter.should_stop(&15));
    }
}
