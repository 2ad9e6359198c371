use std::collections::HashMap;

use bitflags::bitflags;
use geo::prelude::*;
use geo::{Coord, LineString, Point};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::permission::Permission;

pub type VertexId = NodeIndex;
pub type EdgeId = EdgeIndex;

#[derive(Debug, Clone, PartialEq)]
pub enum VertexKind {
    Intersection { osm_id: i64 },
    /// Where an elevator is entered from its level.
    ElevatorOffboard { level: String },
    /// Inside the car at a given level.
    ElevatorOnboard { level: String },
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub label: String,
    pub coord: Coord<f64>,
    pub kind: VertexKind,
}

impl Vertex {
    pub fn point(&self) -> Point<f64> {
        Point::from(self.coord)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Street,
    /// Free link between an elevator level's intersection and its platform.
    PassThrough,
    Board,
    Alight,
    Hop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreetClass {
    Crossing,
    Street,
    OtherPath,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EdgeFlags: u16 {
        /// Generated against the way's node order.
        const BACK = 1 << 0;
        const STAIRS = 1 << 1;
        const ROUNDABOUT = 1 << 2;
        const NO_THRU_TRAFFIC = 1 << 3;
        const WHEELCHAIR_ACCESSIBLE = 1 << 4;
        /// The display name was generated, not tagged.
        const BOGUS_NAME = 1 << 5;
        const SLOPE_OVERRIDE = 1 << 6;
        const PLATFORM = 1 << 7;
    }
}

#[derive(Debug, Clone)]
pub struct StreetEdge {
    pub kind: EdgeKind,
    pub name: String,
    pub way_id: Option<i64>,
    pub geometry: LineString<f64>,
    /// Meters along the geometry; doubled for stairs.
    pub length: f64,
    pub permission: Permission,
    /// Raw safety multiplier from the rule table.
    pub safety: f64,
    /// `length * safety`, divided once by the best multiplier.
    pub effective_length: f64,
    pub flags: EdgeFlags,
    pub street_class: StreetClass,
    pub notes: Vec<String>,
    pub in_bearing: f64,
    pub out_bearing: f64,
}

impl StreetEdge {
    pub fn street(
        name: String,
        way_id: i64,
        geometry: LineString<f64>,
        length: f64,
        permission: Permission,
        safety: f64,
    ) -> Self {
        let (in_bearing, out_bearing) = end_bearings(&geometry);
        StreetEdge {
            kind: EdgeKind::Street,
            name,
            way_id: Some(way_id),
            geometry,
            length,
            permission,
            safety,
            effective_length: length * safety,
            flags: EdgeFlags::WHEELCHAIR_ACCESSIBLE,
            street_class: StreetClass::OtherPath,
            notes: vec![],
            in_bearing,
            out_bearing,
        }
    }

    /// A zero-length elevator connector at `coord`.
    pub fn connector(kind: EdgeKind, name: String, coord: Coord<f64>, permission: Permission) -> Self {
        StreetEdge {
            kind,
            name,
            way_id: None,
            geometry: LineString::new(vec![coord, coord]),
            length: 0.0,
            permission,
            safety: 1.0,
            effective_length: 0.0,
            flags: EdgeFlags::WHEELCHAIR_ACCESSIBLE,
            street_class: StreetClass::OtherPath,
            notes: vec![],
            in_bearing: 0.0,
            out_bearing: 0.0,
        }
    }

    pub fn is_back(&self) -> bool {
        self.flags.contains(EdgeFlags::BACK)
    }

    pub fn is_wheelchair_accessible(&self) -> bool {
        self.flags.contains(EdgeFlags::WHEELCHAIR_ACCESSIBLE)
    }
}

/// Sum of great-circle distances along `line`, in meters.
pub fn haversine_length(line: &LineString<f64>) -> f64 {
    line.lines()
        .map(|segment| Point::from(segment.start).haversine_distance(&Point::from(segment.end)))
        .sum()
}

/// Initial bearing from `a` to `b`, clockwise from north in [0, 360).
pub fn bearing(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Point::from(a)
        .haversine_bearing(Point::from(b))
        .rem_euclid(360.0)
}

/// Bearing of the first and of the last segment.
fn end_bearings(line: &LineString<f64>) -> (f64, f64) {
    let coords = &line.0;
    if coords.len() < 2 {
        return (0.0, 0.0);
    }
    let first = bearing(coords[0], coords[1]);
    let last = bearing(coords[coords.len() - 2], coords[coords.len() - 1]);
    (first, last)
}

/// Vertex/edge arena with vertices deduplicated by label.
#[derive(Debug, Default)]
pub struct StreetGraph {
    graph: DiGraph<Vertex, StreetEdge>,
    labels: HashMap<String, VertexId>,
}

impl StreetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the vertex labelled `label`, creating it if needed.
    pub fn vertex_or_insert(&mut self, label: &str, coord: Coord<f64>, kind: VertexKind) -> VertexId {
        if let Some(&id) = self.labels.get(label) {
            return id;
        }
        let id = self.graph.add_node(Vertex {
            label: label.to_string(),
            coord,
            kind,
        });
        self.labels.insert(label.to_string(), id);
        id
    }

    pub fn add_edge(&mut self, from: VertexId, to: VertexId, edge: StreetEdge) -> EdgeId {
        self.graph.add_edge(from, to, edge)
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.graph[id]
    }

    pub fn vertex_by_label(&self, label: &str) -> Option<VertexId> {
        self.labels.get(label).copied()
    }

    pub fn edge(&self, id: EdgeId) -> &StreetEdge {
        &self.graph[id]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut StreetEdge {
        &mut self.graph[id]
    }

    pub fn endpoints(&self, id: EdgeId) -> Option<(VertexId, VertexId)> {
        self.graph.edge_endpoints(id)
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> {
        self.graph.node_indices().map(|id| (id, &self.graph[id]))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &StreetEdge)> {
        self.graph.edge_references().map(|e| (e.id(), e.weight()))
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut StreetEdge> {
        self.graph.edge_weights_mut()
    }

    pub fn outgoing(&self, id: VertexId) -> impl Iterator<Item = (EdgeId, &StreetEdge)> {
        self.graph.edges(id).map(|e| (e.id(), e.weight()))
    }

    pub fn edges_of_way(&self, way_id: i64) -> impl Iterator<Item = (EdgeId, &StreetEdge)> {
        self.edges().filter(move |(_, e)| e.way_id == Some(way_id))
    }

    pub fn inner(&self) -> &DiGraph<Vertex, StreetEdge> {
        &self.graph
    }
}
