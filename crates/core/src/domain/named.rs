use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Ordered `name -> value` entries.
///
/// Serialized as a JSON object. Deserialization keeps the order the keys appear on the wire;
/// a repeated key overwrites the earlier value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Named<T>(Vec<(String, T)>);

/// Asset-class name to fraction of the portfolio.
pub type Allocation = Named<f64>;

impl<T> Named<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: T) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn first(&self) -> Option<(&str, &T)> {
        self.0.first().map(|(n, v)| (n.as_str(), v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Named<f64> {
    pub fn total(&self) -> f64 {
        self.0.iter().map(|(_, v)| *v).sum()
    }

    /// Fractions are non-negative and sum to 1 within `eps`.
    pub fn is_normalized(&self, eps: f64) -> bool {
        self.0.iter().all(|(_, v)| *v >= 0.0) && (self.total() - 1.0).abs() <= eps
    }
}

impl<T> Default for Named<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(String, T)> for Named<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (name, value) in iter {
            out.insert(name, value);
        }
        out
    }
}

impl<K: Into<String>, T, const N: usize> From<[(K, T); N]> for Named<T> {
    fn from(entries: [(K, T); N]) -> Self {
        entries
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect()
    }
}

impl<T: Serialize> Serialize for Named<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Named<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NamedVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for NamedVisitor<T> {
            type Value = Named<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Named::new();
                while let Some((name, value)) = access.next_entry::<String, T>()? {
                    out.insert(name, value);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(NamedVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_wire_order_instead_of_sorting() {
        let parsed: Allocation =
            serde_json::from_str(r#"{"equity": 0.6, "bonds": 0.35, "cash": 0.05}"#).unwrap();
        let names: Vec<_> = parsed.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["equity", "bonds", "cash"]);
        assert_eq!(
            serde_json::to_string(&parsed).unwrap(),
            r#"{"equity":0.6,"bonds":0.35,"cash":0.05}"#
        );
    }

    #[test]
    fn repeated_key_overwrites_in_place() {
        let parsed: Allocation =
            serde_json::from_str(r#"{"equity": 0.1, "cash": 0.2, "equity": 0.8}"#).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.first(), Some(("equity", &0.8)));
    }

    #[test]
    fn normalization_tolerates_small_drift_only() {
        let ok = Allocation::from([("equity", 0.6), ("bonds", 0.3999), ("cash", 0.0)]);
        assert!(ok.is_normalized(1e-3));

        let off = Allocation::from([("equity", 0.7), ("bonds", 0.4)]);
        assert!(!off.is_normalized(1e-3));

        let negative = Allocation::from([("equity", 1.2), ("cash", -0.2)]);
        assert!(!negative.is_normalized(1e-3));
    }
}
