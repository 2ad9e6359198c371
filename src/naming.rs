//! Hooks for renaming edges during and after assembly.

use log::debug;
use petgraph::Direction;
use petgraph::visit::EdgeRef;
use strum::Display;

use crate::graph::{EdgeFlags, EdgeId, StreetClass, StreetGraph};
use crate::osm::OsmWay;

pub trait CustomNamer {
    /// Name for an edge of `way`, given the name the builder would use.
    fn name(&mut self, _way: &OsmWay, default: &str) -> String {
        default.to_string()
    }

    /// Called for every street edge right after it is added.
    fn name_with_edge(&mut self, _way: &OsmWay, _edge: EdgeId, _graph: &StreetGraph) {}

    /// Called once after all edges exist.
    fn postprocess(&mut self, _graph: &mut StreetGraph) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
enum Qualifier {
    Sidewalk,
    Path,
}

impl Qualifier {
    fn of(way: &OsmWay) -> Option<Qualifier> {
        let tags = &way.tags;
        if tags.is("footway", "sidewalk") || tags.is("path", "sidewalk") {
            return Some(Qualifier::Sidewalk);
        }
        match tags.get("highway") {
            Some("footway" | "path" | "cycleway" | "pedestrian") => Some(Qualifier::Path),
            _ => None,
        }
    }
}

/// Renames unnamed sidewalks and paths after an adjacent named street,
/// e.g. `Main Street (sidewalk)`.
#[derive(Debug, Default)]
pub struct QualifierNamer {
    candidates: Vec<(EdgeId, Qualifier)>,
}

impl QualifierNamer {
    pub fn new() -> Self {
        Self::default()
    }

    fn adjacent_street_name(graph: &StreetGraph, edge: EdgeId) -> Option<String> {
        let (from, to) = graph.endpoints(edge)?;
        let inner = graph.inner();

        [from, to]
            .into_iter()
            .flat_map(|v| {
                inner
                    .edges_directed(v, Direction::Outgoing)
                    .chain(inner.edges_directed(v, Direction::Incoming))
            })
            .map(|e| e.weight())
            .filter(|e| {
                e.street_class == StreetClass::Street && !e.flags.contains(EdgeFlags::BOGUS_NAME)
            })
            .map(|e| e.name.clone())
            .min()
    }
}

impl CustomNamer for QualifierNamer {
    fn name_with_edge(&mut self, way: &OsmWay, edge: EdgeId, graph: &StreetGraph) {
        if !graph.edge(edge).flags.contains(EdgeFlags::BOGUS_NAME) {
            return;
        }
        if let Some(qualifier) = Qualifier::of(way) {
            self.candidates.push((edge, qualifier));
        }
    }

    fn postprocess(&mut self, graph: &mut StreetGraph) {
        let mut renamed = 0;
        for (edge, qualifier) in self.candidates.drain(..) {
            if let Some(street) = Self::adjacent_street_name(graph, edge) {
                graph.edge_mut(edge).name = format!("{street} ({qualifier})");
                renamed += 1;
            }
        }
        debug!("qualified {renamed} generated names");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{StreetEdge, VertexKind};
    use crate::osm::Tags;
    use crate::permission::Permission;
    use geo::{Coord, LineString};

    fn add_edge(graph: &mut StreetGraph, a: &str, b: &str, name: &str, class: StreetClass, bogus: bool) -> EdgeId {
        let ca = Coord { x: 0.0, y: 0.0 };
        let cb = Coord { x: 0.001, y: 0.0 };
        let va = graph.vertex_or_insert(a, ca, VertexKind::Intersection { osm_id: 1 });
        let vb = graph.vertex_or_insert(b, cb, VertexKind::Intersection { osm_id: 2 });
        let mut edge = StreetEdge::street(
            name.into(),
            1,
            LineString::new(vec![ca, cb]),
            100.0,
            Permission::ALL,
            1.0,
        );
        edge.street_class = class;
        if bogus {
            edge.flags |= EdgeFlags::BOGUS_NAME;
        }
        graph.add_edge(va, vb, edge)
    }

    #[test]
    fn test_sidewalk_takes_street_name() {
        let mut graph = StreetGraph::new();
        add_edge(&mut graph, "a", "b", "Main Street", StreetClass::Street, false);
        let sidewalk = add_edge(&mut graph, "b", "c", "sidewalk", StreetClass::OtherPath, true);

        let way = OsmWay::new(
            2,
            vec![],
            [("highway", "footway"), ("footway", "sidewalk")].into_iter().collect::<Tags>(),
        );
        let mut namer = QualifierNamer::new();
        assert_eq!(namer.name(&way, "sidewalk"), "sidewalk");
        namer.name_with_edge(&way, sidewalk, &graph);
        namer.postprocess(&mut graph);

        assert_eq!(graph.edge(sidewalk).name, "Main Street (sidewalk)");
    }

    #[test]
    fn test_named_or_isolated_edges_are_untouched() {
        let mut graph = StreetGraph::new();
        let named = add_edge(&mut graph, "a", "b", "Riverside Trail", StreetClass::OtherPath, false);
        let lonely = add_edge(&mut graph, "x", "y", "path", StreetClass::OtherPath, true);

        let way = OsmWay::new(3, vec![], [("highway", "path")].into_iter().collect::<Tags>());
        let mut namer = QualifierNamer::new();
        namer.name_with_edge(&way, named, &graph);
        namer.name_with_edge(&way, lonely, &graph);
        namer.postprocess(&mut graph);

        assert_eq!(graph.edge(named).name, "Riverside Trail");
        assert_eq!(graph.edge(lonely).name, "path");
    }
}
