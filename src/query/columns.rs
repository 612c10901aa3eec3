/// Mapping from logical attribute names to physical column expressions
///
/// Built once from the administrator's `attribute=column` list and read-only
/// afterwards. Iteration follows configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    entries: Vec<(String, String)>,
}

impl ColumnMapping {
    /// Parse `attribute=column` entries
    ///
    /// Each entry is split on its first `=`; both sides are trimmed and must be
    /// non-empty, otherwise the entry is dropped without error. A repeated
    /// attribute keeps its first position and takes the last column.
    pub fn parse<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mapping = Self::default();

        for entry in entries {
            let Some((attribute, column)) = entry.as_ref().split_once('=') else {
                continue;
            };
            let (attribute, column) = (attribute.trim(), column.trim());
            if attribute.is_empty() || column.is_empty() {
                continue;
            }
            mapping.insert(attribute, column);
        }

        mapping
    }

    fn insert(&mut self, attribute: &str, column: &str) {
        match self.entries.iter_mut().find(|(a, _)| a == attribute) {
            Some(existing) => existing.1 = column.to_string(),
            None => self
                .entries
                .push((attribute.to_string(), column.to_string())),
        }
    }

    /// Physical column for an attribute
    pub fn column(&self, attribute: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(a, _)| a == attribute)
            .map(|(_, c)| c.as_str())
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.column(attribute).is_some()
    }

    /// `(attribute, column)` pairs in configuration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, c)| (a.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
