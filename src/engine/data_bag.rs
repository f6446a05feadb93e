// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Key holding the request input.
pub const INPUT_KEY: &str = "input";
/// Key holding the latest step output.
pub const CURRENT_KEY: &str = "$";
/// Alias of [`CURRENT_KEY`].
pub const PIPE_KEY: &str = "pipe";
pub const CLAIMS_KEY: &str = "claims";

/// Mutable key/value state threaded through one pipeline run.
///
/// Owned by the run's task; never shared between concurrent runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataBag(pub HashMap<String, Value>);

impl DataBag {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// A bag pre-seeded with the request input (also current output) and claims.
    pub fn seeded(input: Value, claims: Value) -> Self {
        let mut bag = Self::new();
        bag.insert(INPUT_KEY, input.clone());
        bag.insert(CLAIMS_KEY, claims);
        bag.advance(input);
        bag
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// The latest step output, or the input before any step produced one.
    pub fn current(&self) -> Option<&Value> {
        self.get(CURRENT_KEY)
    }

    /// Record `output` as the latest step output.
    pub fn advance(&mut self, output: Value) {
        self.insert(PIPE_KEY, output.clone());
        self.insert(CURRENT_KEY, output);
    }

    /// Resolve a dotted path such as `input.customer.id` against the bag.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let root = self.get(segments.next()?)?;
        segments.try_fold(root, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone().into_iter().collect::<Map<String, Value>>())
    }
}

impl From<HashMap<String, Value>> for DataBag {
    fn from(map: HashMap<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seeded_bag_exposes_input_as_current() {
        let bag = DataBag::seeded(json!({"id": 7}), json!({"sub": "alice"}));
        assert_eq!(bag.get(INPUT_KEY), Some(&json!({"id": 7})));
        assert_eq!(bag.current(), Some(&json!({"id": 7})));
        assert_eq!(bag.get(PIPE_KEY), Some(&json!({"id": 7})));
        assert_eq!(bag.get(CLAIMS_KEY), Some(&json!({"sub": "alice"})));
    }

    #[test]
    fn test_lookup_dotted_paths() {
        let mut bag = DataBag::new();
        bag.insert("order", json!({"lines": [{"sku": "A1"}, {"sku": "B2"}], "total": 12}));

        assert_eq!(bag.lookup("order.total"), Some(&json!(12)));
        assert_eq!(bag.lookup("order.lines.1.sku"), Some(&json!("B2")));
        assert_eq!(bag.lookup("order.missing"), None);
        assert_eq!(bag.lookup("nothing"), None);
    }
}
