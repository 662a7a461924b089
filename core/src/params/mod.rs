//! Flat key to value-list encoding for path and query parameters.
//!
//! # Design
//! A parameter shape is any `Serialize`/`Deserialize` record. serde's derive
//! already produces the per-type field table (names in declaration order plus
//! the per-field encode/decode routine), so the codec is a serde `Serializer`
//! and `Deserializer` pair over `ParameterMap` instead of runtime introspection.
//!
//! Encoding rules:
//! - scalars become a single string via their `Display` form
//! - unit enum variants become their declared (serde) name
//! - sequences and tuples become one value per member, in order
//! - `None` fields and `None` members are skipped entirely
//!
//! Nested records are rejected, the encoding is one level deep.

mod decode;
mod encode;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::form_urlencoded;

use crate::error::ParamError;

/// Encode a structure into a `ParameterMap`.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<ParameterMap, ParamError> {
    let mut map = ParameterMap::new();
    value.serialize(encode::ParameterSerializer::new(&mut map))?;
    Ok(map)
}

/// Reconstruct a structure from a `ParameterMap`.
///
/// Fields without an entry, or whose entry holds no values, are missing.
pub fn decode<T: DeserializeOwned>(map: &ParameterMap) -> Result<T, ParamError> {
    T::deserialize(decode::ParameterDeserializer::new(map))
}

/// Insertion-ordered mapping from field name to its string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMap {
    entries: Vec<(String, Vec<String>)>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` under `key`, creating the entry on first use.
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| name == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key.to_string(), vec![value])),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, values)| values.as_slice())
    }

    /// First value under `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Every `(key, value)` pair, keys repeated once per value.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .flat_map(|(name, values)| values.iter().map(move |value| (name, value.as_str())))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    pub fn from_query(query: &str) -> Self {
        form_urlencoded::parse(query.as_bytes()).collect()
    }

    /// Render as a query string, one `key=value` pair per value.
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterMap
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ParameterMap::new();
        for (key, value) in iter {
            map.append(key.as_ref(), value);
        }
        map
    }
}
