//! Case-insensitive HTTP header map.
//!
//! Header names compare case-insensitively per RFC 9110 §5; insertion order
//! is preserved.

/// An order-preserving HTTP header map with case-insensitive name lookup.
///
/// # Examples
///
/// ```
/// use pushwire::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("X-Push-Transport", "long-polling");
/// assert_eq!(headers.get("x-push-transport"), Some("long-polling"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a header map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends a header entry.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Returns the first value for `name` (case-insensitive), or `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if at least one entry with `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Number of header entries (not unique names).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut h = Headers::new();
        h.insert("X-Push-Transport", "sse");
        assert_eq!(h.get("x-push-transport"), Some("sse"));
        assert_eq!(h.get("X-PUSH-TRANSPORT"), Some("sse"));
    }

    #[test]
    fn first_value_wins_on_duplicates() {
        let mut h = Headers::new();
        h.insert("Accept", "text/event-stream");
        h.insert("accept", "application/json");
        assert_eq!(h.get("accept"), Some("text/event-stream"));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn missing_header() {
        let h = Headers::new();
        assert_eq!(h.get("host"), None);
        assert!(!h.contains("host"));
        assert!(h.is_empty());
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut h = Headers::new();
        h.insert("A", "1");
        h.insert("B", "2");
        let pairs: Vec<_> = h.iter().collect();
        assert_eq!(pairs, vec![("A", "1"), ("B", "2")]);
    }
}
