//! `include` / `exclude` key filters

use vmixlink_store::{Items, Payload};

/// Key filter built from comma-separated query parameters
///
/// An absent or empty include list admits every key; exclude always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl KeyFilter {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include: split_keys(include),
            exclude: split_keys(exclude),
        }
    }

    /// True when the filter admits every key
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn allows(&self, key: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|k| k == key);
        included && !self.exclude.iter().any(|k| k == key)
    }

    pub fn apply(&self, items: &Items) -> Items {
        let mut filtered = items.clone();
        if !self.is_empty() {
            filtered.retain(|key| self.allows(key));
        }
        filtered
    }

    /// Filter every mapping of a payload
    pub fn apply_payload(&self, payload: &[Items]) -> Payload {
        payload.iter().map(|items| self.apply(items)).collect()
    }
}

fn split_keys(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
