//! Node, edge and CPD records
//!
//! All records derive `PartialEq` over owned data so that comparisons are
//! always structural. Ordered maps keep serialization deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Node category (open set)
///
/// The four well-known categories are matched case-insensitively; any other
/// label is preserved verbatim in [`Category::Other`]. An `Other` holding a
/// well-known label in any casing compares equal to that category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Communities, support, awareness
    Social,
    /// Governance and management actions
    Management,
    /// Physical and ecological variables
    Environmental,
    /// Money flows and livelihoods
    Economic,
    /// Any other label
    Other(String),
}

const KNOWN: [Category; 4] = [
    Category::Social,
    Category::Management,
    Category::Environmental,
    Category::Economic,
];

impl Category {
    /// Display label
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Social => "Social",
            Self::Management => "Management",
            Self::Environmental => "Environmental",
            Self::Economic => "Economic",
            Self::Other(label) => label,
        }
    }

    fn known_index(label: &str) -> Option<usize> {
        let label = label.trim();
        KNOWN
            .iter()
            .position(|known| known.label().eq_ignore_ascii_case(label))
    }

    /// Known categories by index, anything else by its verbatim label
    fn key(&self) -> (Option<usize>, &str) {
        match self {
            Self::Social => (Some(0), ""),
            Self::Management => (Some(1), ""),
            Self::Environmental => (Some(2), ""),
            Self::Economic => (Some(3), ""),
            Self::Other(label) => match Self::known_index(label) {
                Some(index) => (Some(index), ""),
                None => (None, label),
            },
        }
    }
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Category {}

impl Hash for Category {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::Other("Uncategorized".to_string())
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match Self::known_index(&value) {
            Some(index) => KNOWN[index].clone(),
            None => Self::Other(value),
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A network variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique id
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    #[serde(default)]
    pub category: Category,
    /// Mutually exclusive discrete states, in order
    #[serde(default)]
    pub states: Vec<String>,
    /// Marginal probability per state label
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub probabilities: BTreeMap<String, f64>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Node {
    /// Create node with no states
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            states: Vec::new(),
            probabilities: BTreeMap::new(),
            description: None,
        }
    }

    /// With state labels
    #[inline]
    #[must_use]
    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.states = states.into_iter().map(Into::into).collect();
        self
    }

    /// With marginal probability for one state
    #[inline]
    #[must_use]
    pub fn with_probability(mut self, state: impl Into<String>, p: f64) -> Self {
        self.probabilities.insert(state.into(), p);
        self
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Edge probability: unconditional scalar or conditional table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeProbability {
    /// Unconditional strength
    Scalar(f64),
    /// Parent state -> (child state -> probability)
    Table(BTreeMap<String, BTreeMap<String, f64>>),
}

impl EdgeProbability {
    /// Build a conditional table from nested rows
    #[must_use]
    pub fn table<P, C, R>(rows: R) -> Self
    where
        P: Into<String>,
        C: Into<String>,
        R: IntoIterator<Item = (P, Vec<(C, f64)>)>,
    {
        Self::Table(
            rows.into_iter()
                .map(|(parent, row)| {
                    let row = row.into_iter().map(|(c, p)| (c.into(), p)).collect();
                    (parent.into(), row)
                })
                .collect(),
        )
    }

    /// Sum of each conditional row
    ///
    /// Rows should sum to 1 but nothing enforces it; callers use this for
    /// presentation hints only. A scalar yields no rows.
    #[must_use]
    pub fn row_sums(&self) -> BTreeMap<String, f64> {
        match self {
            Self::Scalar(_) => BTreeMap::new(),
            Self::Table(rows) => rows
                .iter()
                .map(|(parent, row)| (parent.clone(), row.values().sum()))
                .collect(),
        }
    }
}

/// A directed causal relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique id
    pub id: String,
    /// Parent node id
    pub from: String,
    /// Child node id
    pub to: String,
    /// Optional probability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<EdgeProbability>,
}

impl Edge {
    /// Create edge without probability
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            probability: None,
        }
    }

    /// With probability
    #[inline]
    #[must_use]
    pub fn with_probability(mut self, probability: EdgeProbability) -> Self {
        self.probability = Some(probability);
        self
    }
}

/// Conditional probability distribution for one node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cpd {
    /// Parent node ids
    #[serde(default)]
    pub parents: Vec<String>,
    /// Parent-state combination -> distribution over the node's states
    #[serde(default)]
    pub probabilities: BTreeMap<String, Vec<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_known_labels_case_insensitively() {
        assert_eq!(Category::from("social"), Category::Social);
        assert_eq!(Category::from("ECONOMIC"), Category::Economic);
        assert_eq!(
            Category::from("Cultural"),
            Category::Other("Cultural".to_string())
        );
    }

    #[test]
    fn category_serializes_as_plain_string() {
        let json = serde_json::to_string(&Category::Management).unwrap();
        assert_eq!(json, "\"Management\"");

        let other: Category = serde_json::from_str("\"Policy\"").unwrap();
        assert_eq!(other.label(), "Policy");
    }

    #[test]
    fn raw_other_with_known_label_matches_after_json() {
        let raw = Category::Other("social".to_string());
        assert_eq!(raw, Category::Social);

        let json = serde_json::to_string(&raw).unwrap();
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, raw);
        assert_eq!(back.label(), "Social");

        let mut seen = std::collections::HashSet::new();
        seen.insert(Category::Other(" ECONOMIC ".to_string()));
        assert!(seen.contains(&Category::Economic));
        assert_ne!(
            Category::Other("Policy".to_string()),
            Category::Other("policy".to_string())
        );
    }

    #[test]
    fn edge_probability_untagged_forms() {
        let scalar: EdgeProbability = serde_json::from_str("0.7").unwrap();
        assert_eq!(scalar, EdgeProbability::Scalar(0.7));

        let table: EdgeProbability =
            serde_json::from_str(r#"{"Poor": {"Low": 0.6, "High": 0.4}}"#).unwrap();
        assert_eq!(
            table,
            EdgeProbability::table([("Poor", vec![("Low", 0.6), ("High", 0.4)])])
        );
    }

    #[test]
    fn row_sums_are_advisory() {
        let table = EdgeProbability::table([
            ("Weak", vec![("Limited", 0.8), ("Adequate", 0.2)]),
            ("Strong", vec![("Limited", 0.5), ("Adequate", 0.2)]),
        ]);
        let sums = table.row_sums();
        assert!((sums["Weak"] - 1.0).abs() < 1e-9);
        assert!((sums["Strong"] - 0.7).abs() < 1e-9);
        assert!(EdgeProbability::Scalar(0.3).row_sums().is_empty());
    }

    #[test]
    fn node_defaults_on_sparse_json() {
        let node: Node = serde_json::from_str(r#"{"id": "n1", "name": "Rain"}"#).unwrap();
        assert!(node.states.is_empty());
        assert!(node.probabilities.is_empty());
        assert_eq!(node.category, Category::default());
    }
}
