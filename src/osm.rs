//! Tagged map entities and the ingestion database they are collected into.
//!
//! An external parser calls the [`OsmHandler`] methods in any order, then
//! [`OsmHandler::second_phase`] once everything has been delivered.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use geo::{Coord, Point};
use log::debug;
use strum::{Display, EnumString};

/// Key/value attributes of a node, way or relation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Tags(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// `yes`, `true` and `1` all read as true.
    pub fn is_true(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_true_value)
    }

    /// `no`, `false` and `0` all read as false.
    pub fn is_false(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_false_value)
    }

    /// Whether a mode tag explicitly grants access, e.g. `bicycle=designated`.
    pub fn allows_access(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| {
            is_true_value(value) || matches!(value, "designated" | "official" | "permissive")
        })
    }

    /// Tags whose key starts with `prefix`, in key order.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.0
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn is_true_value(value: &str) -> bool {
    matches!(value, "yes" | "true" | "1")
}

pub fn is_false_value(value: &str) -> bool {
    matches!(value, "no" | "false" | "0")
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Tags(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                f.write_str(";")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

/// Anything carrying tags can be matched against the rule table.
pub trait Tagged {
    fn id(&self) -> i64;
    fn tags(&self) -> &Tags;
}

#[derive(Clone, Debug)]
pub struct OsmNode {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tags: Tags,
}

impl OsmNode {
    pub fn new(id: i64, lat: f64, lon: f64, tags: Tags) -> Self {
        OsmNode { id, lat, lon, tags }
    }

    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }

    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// Elevators are decomposed into one vertex per level.
    pub fn is_multi_level(&self) -> bool {
        self.tags.is("highway", "elevator")
    }
}

#[derive(Clone, Debug)]
pub struct OsmWay {
    pub id: i64,
    pub nodes: Vec<i64>,
    pub tags: Tags,
}

impl OsmWay {
    pub fn new(id: i64, nodes: Vec<i64>, tags: Tags) -> Self {
        OsmWay { id, nodes, tags }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

#[derive(Clone, Debug)]
pub struct RelationMember {
    pub member_type: MemberType,
    pub id: i64,
    pub role: String,
}

impl RelationMember {
    pub fn new(member_type: MemberType, id: i64, role: impl Into<String>) -> Self {
        RelationMember {
            member_type,
            id,
            role: role.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OsmRelation {
    pub id: i64,
    pub members: Vec<RelationMember>,
    pub tags: Tags,
}

impl OsmRelation {
    pub fn new(id: i64, members: Vec<RelationMember>, tags: Tags) -> Self {
        OsmRelation { id, members, tags }
    }
}

impl Tagged for OsmNode {
    fn id(&self) -> i64 {
        self.id
    }
    fn tags(&self) -> &Tags {
        &self.tags
    }
}

impl Tagged for OsmWay {
    fn id(&self) -> i64 {
        self.id
    }
    fn tags(&self) -> &Tags {
        &self.tags
    }
}

impl Tagged for OsmRelation {
    fn id(&self) -> i64 {
        self.id
    }
    fn tags(&self) -> &Tags {
        &self.tags
    }
}

/// Callback interface driven by a map parser.
pub trait OsmHandler {
    fn add_node(&mut self, node: OsmNode);
    fn add_way(&mut self, way: OsmWay);
    fn add_relation(&mut self, relation: OsmRelation);
    /// Called once after all entities were delivered.
    fn second_phase(&mut self);
}

/// Raw entity tables filled during ingestion.
#[derive(Debug, Default)]
pub struct OsmDatabase {
    pub nodes: HashMap<i64, OsmNode>,
    pub ways: HashMap<i64, OsmWay>,
    pub relations: HashMap<i64, OsmRelation>,
}

impl OsmDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: i64) -> Option<&OsmNode> {
        self.nodes.get(&id)
    }

    pub fn way(&self, id: i64) -> Option<&OsmWay> {
        self.ways.get(&id)
    }
}

/// Only ways carrying traversal-relevant tags are kept.
pub fn is_way_routable(tags: &Tags) -> bool {
    if !(tags.has("highway") || tags.is("railway", "platform")) {
        return false;
    }
    if let Some("conveyer" | "proposed" | "raceway") = tags.get("highway") {
        return false;
    }
    if let Some("no" | "license") = tags.get("access") {
        return ["motorcar", "bicycle", "foot"]
            .iter()
            .any(|mode| tags.allows_access(mode));
    }
    true
}

fn is_relevant_relation(tags: &Tags) -> bool {
    tags.is("type", "restriction")
        || (tags.is("type", "route") && tags.is("route", "road"))
        || tags.is("type", "level_map")
}

impl OsmHandler for OsmDatabase {
    fn add_node(&mut self, node: OsmNode) {
        self.nodes.entry(node.id).or_insert(node);

        if self.nodes.len() % 100_000 == 0 {
            debug!("nodes={}", self.nodes.len());
        }
    }

    fn add_way(&mut self, way: OsmWay) {
        if self.ways.contains_key(&way.id) || !is_way_routable(&way.tags) {
            return;
        }
        self.ways.insert(way.id, way);

        if self.ways.len() % 10_000 == 0 {
            debug!("ways={}", self.ways.len());
        }
    }

    fn add_relation(&mut self, relation: OsmRelation) {
        if self.relations.contains_key(&relation.id) || !is_relevant_relation(&relation.tags) {
            return;
        }
        self.relations.insert(relation.id, relation);
    }

    fn second_phase(&mut self) {
        let keep = self
            .ways
            .values()
            .filter(|way| way.nodes.len() > 1)
            .flat_map(|way| way.nodes.iter().copied())
            .collect::<HashSet<_>>();

        let before = self.nodes.len();
        self.nodes.retain(|id, _| keep.contains(id));
        debug!(
            "second phase kept {} of {} nodes, {} ways, {} relations",
            self.nodes.len(),
            before,
            self.ways.len(),
            self.relations.len()
        );
    }
}
