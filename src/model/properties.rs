use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied key/value pairs layered over builder defaults.
///
/// Merging is a shallow override: a key present here replaces the target's
/// value for that key wholesale, nested objects included. Keys absent here
/// are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdditionalProperties(Map<String, Value>);

impl AdditionalProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Shallow-overrides `target` with every pair held here.
    pub fn merge_into(&self, target: &mut Map<String, Value>) {
        for (key, value) in &self.0 {
            target.insert(key.clone(), value.clone());
        }
    }

    /// Parses a `key=value` pair. The value is read as JSON when it parses
    /// (numbers, booleans, arrays...) and kept as a string otherwise.
    pub fn parse_pair(pair: &str) -> Option<(String, Value)> {
        let (key, raw) = pair.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        Some((key.to_string(), value))
    }
}

impl FromIterator<(String, Value)> for AdditionalProperties {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
