//! Wrapper validation and update normalisation
//!
//! Agents reply with loosely shaped JSON. This module decides whether a
//! located object is a reply at all, then coerces its `updated_network`
//! into a [`Network`] that satisfies every model invariant.
//!
//! Normalisation is lenient about shape and strict about references:
//! missing lists become empty, ids and names stand in for each other, and
//! endpoints may name a node instead of giving its id. Anything that still
//! dangles after that is a malformed update.

use crate::error::IngestError;
use cbn_model::{Category, Cpd, Edge, EdgeProbability, Network, Node};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Keys that mark an object as an agent reply
pub const RECOGNISED_KEYS: [&str; 5] = [
    "updated_network",
    "updated_cbn",
    "tentative_suggestions",
    "reflection_prompts",
    "subclaims",
];

/// A reply that passed schema validation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidatedReply {
    /// Replacement network, if the reply carried one
    pub network: Option<Network>,
    /// Tentative suggestions
    pub tentative_suggestions: Vec<String>,
    /// Reflection prompts
    pub reflection_prompts: Vec<String>,
    /// Subclaims
    pub subclaims: Vec<String>,
    /// Prose preceding the reply object
    pub preamble: Option<String>,
}

/// Validate a located object as a reply
///
/// # Errors
///
/// [`IngestError::MalformedPayload`] when no recognised key is present,
/// [`IngestError::MalformedUpdate`] when the network cannot be normalised.
pub fn validate_reply(
    object: &Map<String, Value>,
    preamble: Option<String>,
) -> Result<ValidatedReply, IngestError> {
    if !RECOGNISED_KEYS.iter().any(|key| object.contains_key(*key)) {
        return Err(IngestError::malformed_payload(
            "object carries none of the reply keys",
        ));
    }

    let update = match object.get("updated_network") {
        None | Some(Value::Null) => object.get("updated_cbn"),
        present => present,
    };
    let network = match update {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(normalize_network(map)?),
        Some(other) => {
            return Err(IngestError::malformed_update(format!(
                "updated network must be an object, got {}",
                json_type(other)
            )))
        }
    };

    Ok(ValidatedReply {
        network,
        tentative_suggestions: string_list(object.get("tentative_suggestions")),
        reflection_prompts: string_list(object.get("reflection_prompts")),
        subclaims: string_list(object.get("subclaims")),
        preamble,
    })
}

/// Coerce a JSON network object into a valid [`Network`]
///
/// # Errors
///
/// [`IngestError::MalformedUpdate`] for non-object items, nodes with
/// neither id nor name, edges without endpoints, or any model invariant
/// violated after resolution.
pub fn normalize_network(map: &Map<String, Value>) -> Result<Network, IngestError> {
    let mut nodes = Vec::new();
    for (index, raw) in array_field(map, "nodes").iter().enumerate() {
        let Value::Object(obj) = raw else {
            return Err(IngestError::malformed_update(format!(
                "node #{index} is not an object"
            )));
        };
        nodes.push(normalize_node(index, obj)?);
    }

    let resolver = Resolver::new(&nodes);

    let mut edges = Vec::new();
    for (index, raw) in array_field(map, "edges").iter().enumerate() {
        let Value::Object(obj) = raw else {
            return Err(IngestError::malformed_update(format!(
                "edge #{index} is not an object"
            )));
        };
        edges.push(normalize_edge(index, obj, &resolver)?);
    }

    let mut cpds = BTreeMap::new();
    if let Some(Value::Object(raw_cpds)) = map.get("cpds") {
        for (key, raw) in raw_cpds {
            let Value::Object(obj) = raw else {
                return Err(IngestError::malformed_update(format!(
                    "cpd for {key} is not an object"
                )));
            };
            cpds.insert(resolver.resolve(key), normalize_cpd(obj, &resolver));
        }
    }

    let network = Network::new(nodes, edges).with_cpds(cpds);
    network.validate()?;
    Ok(network)
}

fn normalize_node(index: usize, obj: &Map<String, Value>) -> Result<Node, IngestError> {
    let (id, name) = match (text_field(obj, "id"), text_field(obj, "name")) {
        (Some(id), Some(name)) => (id, name),
        (Some(id), None) => (id.clone(), id),
        (None, Some(name)) => (name.clone(), name),
        (None, None) => {
            return Err(IngestError::malformed_update(format!(
                "node #{index} has neither id nor name"
            )))
        }
    };

    let category = obj
        .get("category")
        .and_then(Value::as_str)
        .map(Category::from)
        .unwrap_or_default();

    let states: Vec<String> = match obj.get("states") {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        _ => Vec::new(),
    };

    let probabilities = match obj.get("probabilities") {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(state, p)| p.as_f64().map(|p| (state.clone(), p)))
            .collect(),
        // Positional list, aligned with states
        Some(Value::Array(items)) => states
            .iter()
            .zip(items)
            .filter_map(|(state, p)| p.as_f64().map(|p| (state.clone(), p)))
            .collect(),
        _ => BTreeMap::new(),
    };

    let mut node = Node::new(id, name, category).with_states(states);
    node.probabilities = probabilities;
    node.description = obj
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(node)
}

fn normalize_edge(
    index: usize,
    obj: &Map<String, Value>,
    resolver: &Resolver,
) -> Result<Edge, IngestError> {
    let endpoint = |primary: &str, alias: &str| {
        text_field(obj, primary)
            .or_else(|| text_field(obj, alias))
            .map(|raw| resolver.resolve(&raw))
    };
    let (Some(from), Some(to)) = (endpoint("from", "source"), endpoint("to", "target")) else {
        return Err(IngestError::malformed_update(format!(
            "edge #{index} is missing an endpoint"
        )));
    };

    let id = text_field(obj, "id").unwrap_or_else(|| format!("{from}->{to}"));
    let probability = obj.get("probability").and_then(edge_probability);

    Ok(Edge {
        id,
        from,
        to,
        probability,
    })
}

fn normalize_cpd(obj: &Map<String, Value>, resolver: &Resolver) -> Cpd {
    let parents = match obj.get("parents") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_string)
            .map(|p| resolver.resolve(&p))
            .filter(|p| !p.is_empty())
            .collect(),
        _ => Vec::new(),
    };
    let probabilities = match obj.get("probabilities") {
        Some(Value::Object(rows)) => rows
            .iter()
            .filter_map(|(combo, row)| {
                row.as_array().map(|row| {
                    let row: Vec<f64> = row.iter().filter_map(Value::as_f64).collect();
                    (combo.trim().to_string(), row)
                })
            })
            .collect(),
        _ => BTreeMap::new(),
    };
    Cpd {
        parents,
        probabilities,
    }
}

fn edge_probability(value: &Value) -> Option<EdgeProbability> {
    match value {
        Value::Number(n) => n.as_f64().map(EdgeProbability::Scalar),
        Value::Object(rows) => {
            let table: BTreeMap<String, BTreeMap<String, f64>> = rows
                .iter()
                .filter_map(|(parent, row)| {
                    row.as_object().map(|row| {
                        let row = row
                            .iter()
                            .filter_map(|(child, p)| p.as_f64().map(|p| (child.clone(), p)))
                            .collect();
                        (parent.clone(), row)
                    })
                })
                .collect();
            (!table.is_empty()).then_some(EdgeProbability::Table(table))
        }
        _ => None,
    }
}

/// Maps raw endpoint references to node ids
struct Resolver {
    ids: HashSet<String>,
    by_name: HashMap<String, String>,
}

impl Resolver {
    fn new(nodes: &[Node]) -> Self {
        let mut by_name = HashMap::new();
        for node in nodes {
            // First node wins on a shared name
            by_name
                .entry(node.name.clone())
                .or_insert_with(|| node.id.clone());
        }
        Self {
            ids: nodes.iter().map(|n| n.id.clone()).collect(),
            by_name,
        }
    }

    /// Id match first, then name match, else the trimmed reference
    fn resolve(&self, raw: &str) -> String {
        let raw = raw.trim();
        if self.ids.contains(raw) {
            return raw.to_string();
        }
        self.by_name
            .get(raw)
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }
}

fn array_field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    match map.get(key) {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

/// Non-empty string or number field, trimmed
fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(scalar_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => vec![single.clone()],
        _ => Vec::new(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
