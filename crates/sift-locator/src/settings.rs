//! Engine-wide paging defaults.

use serde::{Deserialize, Serialize};

/// Paging defaults and caps.
///
/// Every field is optional; `None` means "no default" or "no cap".
///
/// ```yaml
/// defaultCount: 100
/// defaultLookupLimit: 5000
/// maxLookupLimit: 50000
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Page size when the locator has no `count`.
    pub default_count: Option<usize>,
    /// Scan cap when the locator has no `lookupLimit`.
    pub default_lookup_limit: Option<usize>,
    /// Hard cap on any `lookupLimit`, including an explicit unlimited one.
    pub max_lookup_limit: Option<usize>,
}

impl EngineSettings {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Values set in `other` replace the ones in `self`.
    pub fn overlay(self, other: EngineSettings) -> Self {
        EngineSettings {
            default_count: other.default_count.or(self.default_count),
            default_lookup_limit: other.default_lookup_limit.or(self.default_lookup_limit),
            max_lookup_limit: other.max_lookup_limit.or(self.max_lookup_limit),
        }
    }

    /// Applies the cap to a requested lookup limit.
    pub fn cap_lookup_limit(&self, requested: Option<usize>) -> Option<usize> {
        match (requested, self.max_lookup_limit) {
            (Some(n), Some(max)) => Some(n.min(max)),
            (None, max) => max,
            (n, None) => n,
        }
    }
}
