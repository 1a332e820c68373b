//! Per-entity key/value extension storage.
//!
//! Nodes, links and the topology itself each carry a [`Properties`]
//! bag. Values are restricted to the small set of kinds behaviors
//! actually exchange ([`PropertyValue`]). The bag itself is passive:
//! change notification is done by the [`Topology`](crate::Topology)
//! setters, which emit `PropertyChanged` events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::link::LinkId;
use crate::node::NodeId;

/// A property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
    Flag(bool),
    Point(Point),
    Node(NodeId),
    Nodes(Vec<NodeId>),
}

impl PropertyValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            PropertyValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<Point> {
        match self {
            PropertyValue::Point(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            PropertyValue::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_nodes(&self) -> Option<&[NodeId]> {
        match self {
            PropertyValue::Nodes(ids) => Some(ids),
            _ => None,
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Number(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Flag(v)
    }
}

impl From<Point> for PropertyValue {
    fn from(v: Point) -> Self {
        PropertyValue::Point(v)
    }
}

impl From<NodeId> for PropertyValue {
    fn from(v: NodeId) -> Self {
        PropertyValue::Node(v)
    }
}

impl From<Vec<NodeId>> for PropertyValue {
    fn from(v: Vec<NodeId>) -> Self {
        PropertyValue::Nodes(v)
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::Text(s) => write!(f, "{:?}", s),
            PropertyValue::Flag(b) => write!(f, "{}", b),
            PropertyValue::Point(p) => write!(f, "{}", p),
            PropertyValue::Node(id) => write!(f, "{}", id),
            PropertyValue::Nodes(ids) => {
                write!(f, "[")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", id)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Which entity a property bag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyOwner {
    Topology,
    Node(NodeId),
    Link(LinkId),
}

impl std::fmt::Display for PropertyOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyOwner::Topology => write!(f, "topology"),
            PropertyOwner::Node(id) => write!(f, "{}", id),
            PropertyOwner::Link(id) => write!(f, "{}", id),
        }
    }
}

/// A string-keyed bag of [`PropertyValue`]s, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    values: BTreeMap<String, PropertyValue>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Store `value` under `key`, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: PropertyValue) -> Option<PropertyValue> {
        self.values.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.values.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_returns_previous_value() {
        let mut props = Properties::new();
        assert_eq!(props.set("hops", 1.0.into()), None);
        assert_eq!(props.set("hops", 2.0.into()), Some(PropertyValue::Number(1.0)));
        assert_eq!(props.get("hops").and_then(PropertyValue::as_number), Some(2.0));
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_typed_accessors_reject_other_kinds() {
        let v = PropertyValue::from("leader");
        assert_eq!(v.as_text(), Some("leader"));
        assert_eq!(v.as_number(), None);
        assert_eq!(v.as_flag(), None);

        let parents = PropertyValue::from(vec![NodeId::new(1), NodeId::new(4)]);
        assert_eq!(parents.as_nodes().map(<[NodeId]>::len), Some(2));
        assert_eq!(parents.to_string(), "[N1, N4]");
    }

    #[test]
    fn test_iteration_is_key_ordered() {
        let mut props = Properties::new();
        props.set("zeta", true.into());
        props.set("alpha", Point::new(1.0, 2.0).into());
        let keys: Vec<&str> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);

        assert!(props.remove("zeta").is_some());
        assert!(!props.contains("zeta"));
    }
}
