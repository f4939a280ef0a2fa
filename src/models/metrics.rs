use serde::Serialize;
use serde::ser::SerializeMap;

/// Per-file aggregate for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetrics {
    /// Sum of added + deleted lines over retained commits.
    pub churn: u64,
    /// Change events per author, in first-seen order.
    pub author_counts: Vec<(String, u64)>,
    /// Structural complexity of the current content (>= 1).
    pub complexity: u32,
}

impl FileMetrics {
    pub fn risk_score(&self) -> u64 {
        self.churn * u64::from(self.complexity)
    }

    pub fn total_changes(&self) -> u64 {
        self.author_counts.iter().map(|(_, n)| n).sum()
    }
}

/// Ordered author -> count mapping, serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopAuthors(pub Vec<(String, u64)>);

impl TopAuthors {
    pub fn get(&self, name: &str) -> Option<u64> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, c)| *c)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for TopAuthors {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, count) in &self.0 {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}
