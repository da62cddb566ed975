//! [`ExchangeSnapshot`]: a batch of named values crossing the store boundary.

use smallvec::SmallVec;

use crate::value::Value;

/// An immutable batch of `(name, value)` pairs read from or written to the
/// store in one critical section.
///
/// Snapshots are built once (via [`FromIterator`] or [`push`](Self::push)
/// while under construction) and then handed across the boundary by value.
/// Entries keep insertion order; names are expected to be unique.
///
/// # Examples
///
/// ```
/// use twinsync_core::{ExchangeSnapshot, Value};
///
/// let snap: ExchangeSnapshot = [
///     ("T_supply_secondary".to_string(), Value::Real(340.0)),
///     ("m_flow_return_primary".to_string(), Value::Real(0.8)),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(snap.len(), 2);
/// assert_eq!(snap.get("T_supply_secondary"), Some(Value::Real(340.0)));
/// assert_eq!(snap.get("missing"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExchangeSnapshot {
    entries: SmallVec<[(String, Value); 8]>,
}

impl ExchangeSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty snapshot with room for `n` entries.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            entries: SmallVec::with_capacity(n),
        }
    }

    /// Append an entry.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.entries.push((name.into(), value));
    }

    /// Look up a value by name.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the snapshot holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> + '_ {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Iterate over entry names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl FromIterator<(String, Value)> for ExchangeSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, Value)> for ExchangeSnapshot {
    fn from_iter<I: IntoIterator<Item = (&'a str, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, v)| (n.to_string(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut snap = ExchangeSnapshot::new();
        snap.push("b", Value::Real(2.0));
        snap.push("a", Value::Boolean(true));
        let names: Vec<_> = snap.names().collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn empty_snapshot() {
        let snap = ExchangeSnapshot::with_capacity(4);
        assert!(snap.is_empty());
        assert_eq!(snap.iter().count(), 0);
    }

    #[test]
    fn spills_past_inline_capacity() {
        let snap: ExchangeSnapshot = (0..20)
            .map(|i| (format!("v{i}"), Value::Real(i as f64)))
            .collect();
        assert_eq!(snap.len(), 20);
        assert_eq!(snap.get("v19"), Some(Value::Real(19.0)));
    }
}
