//! Property-based tests for the locator engine using proptest.

use std::cmp::Ordering;

use proptest::prelude::*;
use sift_locator::syntax::{escape_value, LocatorBuilder};
use sift_locator::{
    holder, is_included_by_boolean_filter, path_compare, BooleanFilter, DimensionEnum,
    DimensionSpec, Finder, FinderBuilder, Locator,
};

// ============================================================================
// Test helpers
// ============================================================================

fn number_finder(values: Vec<u32>) -> Finder<u32> {
    FinderBuilder::new("number", move || holder(values.clone()))
        .dimension(DimensionSpec::long("mod"))
        .dimension(DimensionSpec::long("rem"))
        .identity(|a: &u32, b: &u32| a.cmp(b))
        .filter(|locator, filter| {
            let modulus = locator.get_long("mod")?.unwrap_or(1);
            let rem = locator.get_long("rem")?.unwrap_or(0);
            filter.add_predicate(move |n: &u32| i64::from(*n) % modulus == rem);
            Ok(())
        })
        .build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Low,
    Mid,
    High,
}

impl DimensionEnum for Level {
    fn symbols() -> &'static [(&'static str, Self)] {
        &[("LOW", Level::Low), ("MID", Level::Mid), ("HIGH", Level::High)]
    }
}

fn first_occurrences(values: impl IntoIterator<Item = u32>) -> Vec<u32> {
    let mut seen = Vec::new();
    for v in values {
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen
}

fn adversarial_path() -> impl Strategy<Value = String> {
    "[a-cA-C0-9_()/.-]{0,8}"
}

// ============================================================================
// Comparator contract
// ============================================================================

proptest! {
    #[test]
    fn comparator_is_antisymmetric(a in adversarial_path(), b in adversarial_path()) {
        prop_assert_eq!(path_compare(&a, &b), path_compare(&b, &a).reverse());
    }

    #[test]
    fn comparator_equal_only_for_identical(a in adversarial_path(), b in adversarial_path()) {
        prop_assert_eq!(path_compare(&a, &b) == Ordering::Equal, a == b);
    }

    #[test]
    fn comparator_is_transitive(paths in prop::collection::vec(adversarial_path(), 0..12)) {
        for a in &paths {
            for b in &paths {
                for c in &paths {
                    if path_compare(a, b) != Ordering::Greater
                        && path_compare(b, c) != Ordering::Greater
                    {
                        prop_assert_ne!(path_compare(a, c), Ordering::Greater, "{} {} {}", a, b, c);
                    }
                }
            }
        }
    }

    #[test]
    fn sorting_is_consistent(paths in prop::collection::vec(adversarial_path(), 0..30)) {
        let mut sorted = paths.clone();
        sorted.sort_by(|a, b| path_compare(a, b));
        for pair in sorted.windows(2) {
            prop_assert_ne!(path_compare(&pair[0], &pair[1]), Ordering::Greater);
        }
        let mut reversed: Vec<String> = paths.into_iter().rev().collect();
        reversed.sort_by(|a, b| path_compare(a, b));
        prop_assert_eq!(sorted, reversed);
    }
}

// ============================================================================
// Pagination and lookup limit
// ============================================================================

proptest! {
    #[test]
    fn pagination_law(
        values in prop::collection::vec(0u32..50, 0..40),
        start in 0usize..10,
        count in 0usize..10,
    ) {
        let text = format!("mod:2,rem:0,start:{start},count:{count}");
        let result = number_finder(values.clone()).get_items(&text).unwrap();

        let matches: Vec<u32> = values.iter().copied().filter(|n| n % 2 == 0).collect();
        let expected: Vec<u32> = matches.iter().copied().skip(start).take(count).collect();
        prop_assert_eq!(&result.items, &expected);

        if count > 0 && matches.len() >= start + count {
            prop_assert!(result.processed >= start + count);
        } else if count > 0 {
            prop_assert_eq!(result.processed, values.len());
        }
    }

    #[test]
    fn lookup_limit_law(
        values in prop::collection::vec(0u32..50, 0..40),
        limit in 0usize..30,
        count in 1usize..10,
    ) {
        let text = format!("mod:2,rem:0,lookupLimit:{limit},count:{count}");
        let result = number_finder(values.clone()).get_items(&text).unwrap();

        prop_assert!(result.processed <= limit);
        prop_assert!(result.len() <= count);
        let expected: Vec<u32> = values
            .iter()
            .copied()
            .take(limit)
            .filter(|n| n % 2 == 0)
            .take(count)
            .collect();
        prop_assert_eq!(&result.items, &expected);
        if result.lookup_limit_reached {
            prop_assert_eq!(result.processed, limit);
            prop_assert!(values.len() > limit);
        }
    }

    #[test]
    fn unlimited_count_drains_source(values in prop::collection::vec(0u32..50, 0..40)) {
        let result = number_finder(values.clone()).get_items("count:-1").unwrap();
        prop_assert_eq!(result.items, values.clone());
        prop_assert_eq!(result.processed, values.len());
    }
}

// ============================================================================
// Structural combinators
// ============================================================================

proptest! {
    #[test]
    fn or_is_ordered_union(values in prop::collection::vec(0u32..30, 0..30)) {
        let finder = number_finder(values.clone());
        let evens = values.iter().copied().filter(|n| n % 2 == 0);
        let threes = values.iter().copied().filter(|n| n % 3 == 0);

        let union = finder
            .get_items("or:(and:(mod:2,rem:0),and:(mod:3,rem:0))")
            .unwrap();
        prop_assert_eq!(union.items, first_occurrences(evens.clone().chain(threes.clone())));

        let concatenated = finder
            .get_items("or:(and:(mod:2,rem:0),and:(mod:3,rem:0)),unique:false")
            .unwrap();
        prop_assert_eq!(concatenated.items, evens.chain(threes).collect::<Vec<_>>());
    }

    #[test]
    fn not_is_complement(values in prop::collection::vec(0u32..30, 0..30)) {
        let result = number_finder(values.clone())
            .get_items("not:(mod:2,rem:0)")
            .unwrap();
        let expected: Vec<u32> = values.into_iter().filter(|n| n % 2 == 1).collect();
        prop_assert_eq!(result.items, expected);
    }
}

// ============================================================================
// Dimension values
// ============================================================================

proptest! {
    #[test]
    fn string_round_trip(value in "[a-zA-Z0-9_()/.,:$ -]{1,16}") {
        let text = LocatorBuilder::new().dimension("name", &value).build();
        let locator = Locator::parse(&text).unwrap();
        prop_assert_eq!(locator.get_single_dimension_value("name").unwrap(), Some(value));
    }

    #[test]
    fn long_round_trip(value in any::<i64>()) {
        let text = LocatorBuilder::new().dimension("n", value.to_string()).build();
        let locator = Locator::parse(&text).unwrap();
        prop_assert_eq!(locator.get_long("n").unwrap(), Some(value));
    }

    #[test]
    fn bool_round_trip(value in any::<bool>()) {
        let text = format!("flag:{}", escape_value(&value.to_string()));
        let parsed = Locator::parse(&text).unwrap().get_boolean("flag").unwrap();
        prop_assert_eq!(parsed.as_option(), Some(value));
    }

    #[test]
    fn enum_round_trip(
        levels in prop::sample::subsequence(vec![Level::Low, Level::Mid, Level::High], 1..=3),
        lowercase in any::<bool>(),
    ) {
        let rendered: Vec<String> = levels
            .iter()
            .map(|level| {
                let (symbol, _) = Level::symbols().iter().find(|(_, l)| l == level).unwrap();
                if lowercase { symbol.to_lowercase() } else { symbol.to_string() }
            })
            .collect();
        let text = LocatorBuilder::new().dimension("level", rendered.join(",")).build();
        let locator = Locator::parse(&text).unwrap();
        prop_assert_eq!(locator.get_enum_set::<Level>("level").unwrap(), Some(levels));
    }

    #[test]
    fn nested_round_trip(value in "[a-z0-9,:()]{1,12}") {
        let inner = LocatorBuilder::new().dimension("name", &value).build();
        let text = LocatorBuilder::new().nested("project", &inner).build();
        let locator = Locator::parse(&text).unwrap();
        let nested = locator.get_nested("project").unwrap().unwrap();
        prop_assert_eq!(nested.get_single_dimension_value("name").unwrap(), Some(value));
    }

    #[test]
    fn tri_state_law(actual in any::<bool>(), filter in prop::option::of(any::<bool>())) {
        let text = match filter {
            Some(flag) => format!("flag:{flag}"),
            None => "flag:any".to_string(),
        };
        let parsed = Locator::parse(&text).unwrap().get_boolean("flag").unwrap();
        prop_assert_eq!(parsed.as_option(), filter);
        prop_assert_eq!(parsed.includes(actual), filter.map_or(true, |f| f == actual));
        prop_assert_eq!(is_included_by_boolean_filter(filter, actual), parsed.includes(actual));
        prop_assert!(BooleanFilter::Any.includes(actual));
    }

    #[test]
    fn marking_is_idempotent(
        reads in prop::collection::vec((0usize..4, 1usize..4), 0..8),
    ) {
        let names = ["a", "b", "c", "d"];
        let locator = Locator::parse("a:1,b:2,c:3,d:4").unwrap();
        let mut read = Vec::new();
        for (index, times) in reads {
            for _ in 0..times {
                locator.get_single_dimension_value(names[index]).unwrap();
            }
            read.push(names[index]);
        }
        let expected: Vec<String> = names
            .iter()
            .filter(|n| !read.contains(n))
            .map(|n| n.to_string())
            .collect();
        prop_assert_eq!(locator.unused_dimensions(), expected);
    }
}
