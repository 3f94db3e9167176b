//! Named counters collected from solver components.

use std::fmt;

/// Ordered list of named counters. Updating an existing key adds to it.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    entries: Vec<(String, u64)>,
}

impl Statistics {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to the counter `key`, creating it if needed.
    pub fn update(&mut self, key: &str, value: u64) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v += value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Current value of `key`.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries.iter().find(|(k, _)| k == key).map(|&(_, v)| v)
    }

    /// Counters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of counters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no counter was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.entries {
            writeln!(f, "  {:<24} {}", k, v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_accumulates() {
        let mut st = Statistics::new();
        st.update("q-num-instantiations", 2);
        st.update("oracle-checks", 1);
        st.update("q-num-instantiations", 3);
        assert_eq!(st.get("q-num-instantiations"), Some(5));
        assert_eq!(st.len(), 2);
        assert_eq!(st.get("missing"), None);
    }
}
