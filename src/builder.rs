//! Assembles the street graph from an ingested [`OsmDatabase`].
//!
//! Ways are split at intersection nodes into segments. Each segment yields
//! a forward and/or a backward edge depending on the resolved permissions.
//! Elevator nodes are split into one vertex per level of the ways that touch
//! them, and linked together afterwards.

use std::collections::{HashMap, HashSet};

use geo::LineString;
use itertools::Itertools;
use log::{debug, info, warn};

use crate::access::{self, DirectionalPermission};
use crate::config::BuildConfig;
use crate::error::Result;
use crate::graph::{
    EdgeFlags, EdgeId, EdgeKind, StreetClass, StreetEdge, StreetGraph, VertexId, VertexKind,
    haversine_length,
};
use crate::level::{Level, LevelResolver, MultiLevelTable};
use crate::naming::CustomNamer;
use crate::osm::{MemberType, OsmDatabase, OsmNode, OsmRelation, OsmWay, Tags};
use crate::permission::Permission;
use crate::restriction::{PendingRestriction, RestrictionTable, TurnRestriction};
use crate::rules::{RuleTable, WayProperties};
use crate::safety::UnnormalizedGraph;

/// Tag carrying the rule-generated name of an unnamed way.
pub const GENERATED_NAME_TAG: &str = "generated:name";
pub const ROUTE_NAME_TAG: &str = "relation:route_name";
pub const ROUTE_REF_TAG: &str = "relation:route_ref";

const STREET_HIGHWAYS: &[&str] = &[
    "residential",
    "tertiary",
    "secondary",
    "secondary_link",
    "primary",
    "primary_link",
    "trunk",
    "trunk_link",
];

/// The final graph and the turn restrictions between its edges.
#[derive(Debug)]
pub struct BuiltGraph {
    pub graph: StreetGraph,
    pub restrictions: Vec<TurnRestriction>,
}

/// Turns a finished street graph into the edge-based form a router needs.
pub trait EdgeBasedConverter {
    type Output;

    fn convert(&mut self, graph: StreetGraph, restrictions: Vec<TurnRestriction>) -> Self::Output;
}

impl BuiltGraph {
    pub fn into_edge_based<C: EdgeBasedConverter>(self, converter: &mut C) -> C::Output {
        converter.convert(self.graph, self.restrictions)
    }
}

/// Mutable state threaded through one build.
#[derive(Debug)]
pub struct BuildContext {
    pub graph: StreetGraph,
    intersections: HashSet<i64>,
    multi_level: MultiLevelTable,
    way_levels: HashMap<i64, Level>,
    levels: LevelResolver,
    restrictions: RestrictionTable,
    relation_tags: HashMap<i64, Tags>,
    best_safety: f64,
}

impl BuildContext {
    pub fn new(config: &BuildConfig) -> Self {
        BuildContext {
            graph: StreetGraph::new(),
            intersections: HashSet::new(),
            multi_level: MultiLevelTable::new(),
            way_levels: HashMap::new(),
            levels: LevelResolver::new(config.one_based_levels),
            restrictions: RestrictionTable::new(),
            relation_tags: HashMap::new(),
            best_safety: 1.0,
        }
    }

    pub fn best_safety(&self) -> f64 {
        self.best_safety
    }

    pub fn is_intersection(&self, node: i64) -> bool {
        self.intersections.contains(&node)
    }
}

pub struct GraphBuilder<'a> {
    db: &'a OsmDatabase,
    rules: &'a RuleTable,
    config: &'a BuildConfig,
    namer: Option<Box<dyn CustomNamer + 'a>>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(db: &'a OsmDatabase, rules: &'a RuleTable, config: &'a BuildConfig) -> Self {
        GraphBuilder {
            db,
            rules,
            config,
            namer: None,
        }
    }

    pub fn with_namer(mut self, namer: impl CustomNamer + 'a) -> Self {
        self.namer = Some(Box::new(namer));
        self
    }

    pub fn build(mut self) -> Result<UnnormalizedGraph> {
        let mut ctx = BuildContext::new(self.config);

        self.process_relations(&mut ctx);
        self.init_intersections(&mut ctx);

        let db = self.db;
        for way in db.ways.values().sorted_by_key(|way| way.id) {
            self.build_way(&mut ctx, way)?;
        }

        self.build_elevator_edges(&mut ctx);

        let BuildContext {
            mut graph,
            restrictions,
            best_safety,
            ..
        } = ctx;

        let restrictions = restrictions.resolve(&graph);
        if let Some(namer) = self.namer.as_mut() {
            namer.postprocess(&mut graph);
        }

        info!(
            "Graph built: {} vertices, {} edges, {} turn restrictions",
            graph.vertex_count(),
            graph.edge_count(),
            restrictions.len()
        );

        Ok(UnnormalizedGraph::new(graph, restrictions, best_safety))
    }

    fn process_relations(&self, ctx: &mut BuildContext) {
        let relations = self
            .db
            .relations
            .values()
            .sorted_by_key(|relation| relation.id);

        for relation in relations {
            let tags = &relation.tags;
            if tags.is("type", "restriction") {
                if let Some(restriction) = PendingRestriction::from_relation(relation) {
                    ctx.restrictions.insert(restriction);
                }
            } else if tags.is("type", "level_map") {
                ctx.levels.apply_level_map(relation, &mut ctx.way_levels);
            } else if tags.is("type", "route") && tags.is("route", "road") {
                self.process_road(ctx, relation);
            }
        }

        debug!(
            "{} pending turn restrictions, {} ways with mapped levels",
            ctx.restrictions.len(),
            ctx.way_levels.len()
        );
    }

    /// Appends the route's name and ref to its member ways.
    fn process_road(&self, ctx: &mut BuildContext, relation: &OsmRelation) {
        for member in &relation.members {
            if member.member_type != MemberType::Way || self.db.way(member.id).is_none() {
                continue;
            }
            let tags = ctx.relation_tags.entry(member.id).or_default();
            for (source, target) in [("name", ROUTE_NAME_TAG), ("ref", ROUTE_REF_TAG)] {
                let Some(value) = relation.tags.get(source) else {
                    continue;
                };
                let merged = match tags.get(target) {
                    None => value.to_string(),
                    Some(existing) if existing.split(", ").any(|v| v == value) => continue,
                    Some(existing) => format!("{existing}, {value}"),
                };
                tags.insert(target, merged);
            }
        }
    }

    /// Nodes referenced more than once (by any ways, or twice by one way)
    /// and elevator nodes split ways.
    fn init_intersections(&self, ctx: &mut BuildContext) {
        let mut seen = HashSet::new();
        for way in self.db.ways.values() {
            for &node in &way.nodes {
                if !seen.insert(node) {
                    ctx.intersections.insert(node);
                }
            }
        }

        let elevators = seen
            .into_iter()
            .filter(|id| self.db.node(*id).is_some_and(OsmNode::is_multi_level));
        ctx.intersections.extend(elevators);
    }

    /// Way tags plus generated relation tags and the generated name.
    fn effective_tags(&self, ctx: &BuildContext, way: &OsmWay) -> Tags {
        let mut tags = way.tags.clone();
        if let Some(extra) = ctx.relation_tags.get(&way.id) {
            for (key, value) in extra.iter() {
                tags.insert(key, value);
            }
        }
        if !tags.has("name") {
            if let Some(name) = self.rules.resolve_creative_name(&tags) {
                tags.insert(GENERATED_NAME_TAG, name);
            }
        }
        tags
    }

    /// Resolves the way's nodes, dropping consecutive duplicates. `None` if
    /// any node is missing.
    fn clean_nodes(&self, way: &OsmWay) -> Option<Vec<&'a OsmNode>> {
        let mut nodes: Vec<&'a OsmNode> = Vec::with_capacity(way.nodes.len());
        for &id in &way.nodes {
            let Some(node) = self.db.node(id) else {
                debug!("way {} references missing node {id}", way.id);
                return None;
            };
            if let Some(prev) = nodes.last() {
                let same_spot = prev.coord() == node.coord()
                    && prev.tags.get("level") == node.tags.get("level");
                if prev.id == node.id || same_spot {
                    continue;
                }
            }
            nodes.push(node);
        }
        Some(nodes)
    }

    fn build_way(&mut self, ctx: &mut BuildContext, way: &OsmWay) -> Result<()> {
        let tags = self.effective_tags(ctx, way);
        let properties = self.rules.resolve_properties(&tags);
        let permissions = access::resolve(way.id, &tags, properties.permission);
        if permissions.is_none() {
            debug!("way {} has no permissions", way.id);
            return Ok(());
        }

        let Some(nodes) = self.clean_nodes(way) else {
            return Ok(());
        };
        if nodes.len() < 2 {
            return Ok(());
        }

        let way = OsmWay {
            tags,
            ..way.clone()
        };
        let level = match ctx.way_levels.get(&way.id) {
            Some(level) => level.clone(),
            None => ctx.levels.for_tags(&way.tags),
        };

        let mut notes = self.rules.resolve_notes(&way.tags);
        notes.extend(
            way.tags
                .with_prefix("wheelchair:description")
                .map(|(_, value)| value.to_string()),
        );

        let segment = WaySegmentInput {
            way: &way,
            properties,
            permissions,
            notes: &notes,
            slope_override: self.rules.resolve_slope_override(&way.tags),
        };

        let mut start_index = 0;
        let mut start_vertex = vertex_for_node(ctx, nodes[0], &level)?;
        let mut geometry = vec![nodes[0].coord()];

        for (i, node) in nodes.iter().enumerate().skip(1) {
            geometry.push(node.coord());
            let is_last = i == nodes.len() - 1;
            if !is_last && !ctx.is_intersection(node.id) {
                continue;
            }

            let end_vertex = vertex_for_node(ctx, node, &level)?;
            let line = LineString::new(std::mem::replace(&mut geometry, vec![node.coord()]));
            let (forward, backward) =
                self.add_segment_edges(ctx, &segment, start_index, start_vertex, end_vertex, line);

            ctx.restrictions
                .bind_segment(way.id, nodes[start_index].id, node.id, forward, backward);

            start_index = i;
            start_vertex = end_vertex;
        }

        Ok(())
    }

    fn add_segment_edges(
        &mut self,
        ctx: &mut BuildContext,
        segment: &WaySegmentInput<'_>,
        index: usize,
        start: VertexId,
        end: VertexId,
        line: LineString<f64>,
    ) -> (Option<EdgeId>, Option<EdgeId>) {
        let way = segment.way;
        let label = format!("way {} from {index}", way.id);
        let default_name = way
            .tags
            .get("name")
            .or_else(|| way.tags.get(GENERATED_NAME_TAG))
            .unwrap_or(label.as_str())
            .to_string();
        let name = match self.namer.as_mut() {
            Some(namer) => namer.name(way, &default_name),
            None => default_name,
        };

        let length = haversine_length(&line);
        let safety = segment.properties.safety;

        let forward = (!segment.permissions.forward.is_none()).then(|| {
            let edge = street_edge(
                segment,
                name.clone(),
                line.clone(),
                length,
                segment.permissions.forward,
                safety.forward,
                false,
            );
            self.add_street_edge(ctx, way, start, end, edge)
        });

        let backward = (!segment.permissions.backward.is_none()).then(|| {
            let mut reversed = line.clone();
            reversed.0.reverse();
            let edge = street_edge(
                segment,
                name.clone(),
                reversed,
                length,
                segment.permissions.backward,
                safety.backward,
                true,
            );
            self.add_street_edge(ctx, way, end, start, edge)
        });

        (forward, backward)
    }

    fn add_street_edge(
        &mut self,
        ctx: &mut BuildContext,
        way: &OsmWay,
        from: VertexId,
        to: VertexId,
        edge: StreetEdge,
    ) -> EdgeId {
        ctx.best_safety = ctx.best_safety.min(edge.safety);
        let id = ctx.graph.add_edge(from, to, edge);
        if let Some(namer) = self.namer.as_mut() {
            namer.name_with_edge(way, id, &ctx.graph);
        }
        id
    }

    /// Links the per-level vertices of every elevator node.
    fn build_elevator_edges(&self, ctx: &mut BuildContext) {
        let BuildContext {
            graph, multi_level, ..
        } = ctx;

        for (node_id, levels) in multi_level.iter() {
            let Some(node) = self.db.node(node_id) else {
                warn!("elevator node {node_id} vanished");
                continue;
            };

            let permission = if node.tags.is_false("bicycle") {
                Permission::PEDESTRIAN
            } else {
                Permission::PEDESTRIAN_AND_BICYCLE
            };
            let wheelchair = !node.tags.is_false("wheelchair");

            let mut onboard_vertices = vec![];
            for level_vertex in levels {
                let source = graph.vertex(level_vertex.vertex);
                let (label, coord) = (source.label.clone(), source.coord);
                let level_name = level_vertex.level.label.clone();

                let offboard = graph.vertex_or_insert(
                    &format!("{label}_offboard"),
                    coord,
                    VertexKind::ElevatorOffboard {
                        level: level_name.clone(),
                    },
                );
                let pass = StreetEdge::connector(EdgeKind::PassThrough, label.clone(), coord, Permission::ALL);
                graph.add_edge(level_vertex.vertex, offboard, pass.clone());
                graph.add_edge(offboard, level_vertex.vertex, pass);

                let onboard = graph.vertex_or_insert(
                    &format!("{label}_onboard"),
                    coord,
                    VertexKind::ElevatorOnboard {
                        level: level_name.clone(),
                    },
                );
                graph.add_edge(
                    offboard,
                    onboard,
                    StreetEdge::connector(EdgeKind::Board, "elevator".into(), coord, permission),
                );
                graph.add_edge(
                    onboard,
                    offboard,
                    StreetEdge::connector(EdgeKind::Alight, level_name, coord, permission),
                );

                onboard_vertices.push((onboard, coord));
            }

            for (&(lower, coord), &(upper, _)) in onboard_vertices.iter().tuple_windows() {
                let mut hop = StreetEdge::connector(EdgeKind::Hop, "elevator".into(), coord, permission);
                hop.flags.set(EdgeFlags::WHEELCHAIR_ACCESSIBLE, wheelchair);
                graph.add_edge(lower, upper, hop.clone());
                graph.add_edge(upper, lower, hop);
            }
        }
    }
}

/// Per-way data shared by every segment of the way.
struct WaySegmentInput<'w> {
    way: &'w OsmWay,
    properties: WayProperties,
    permissions: DirectionalPermission,
    notes: &'w [String],
    slope_override: bool,
}

fn vertex_for_node(ctx: &mut BuildContext, node: &OsmNode, level: &Level) -> Result<VertexId> {
    let kind = VertexKind::Intersection { osm_id: node.id };
    if !node.is_multi_level() {
        return Ok(ctx
            .graph
            .vertex_or_insert(&format!("osm node {}", node.id), node.coord(), kind));
    }

    let label = format!("osm node {} at level {}", node.id, level.label);
    let vertex = ctx.graph.vertex_or_insert(&label, node.coord(), kind);
    ctx.multi_level.record(node.id, level, vertex)?;
    Ok(vertex)
}

fn street_class(tags: &Tags) -> StreetClass {
    let crossing = (tags.is("highway", "crossing")
        || (tags.is("highway", "footway") && tags.is("footway", "crossing")))
        && !tags.is("bicycle", "designated");
    if crossing {
        StreetClass::Crossing
    } else if tags.get("highway").is_some_and(|h| STREET_HIGHWAYS.contains(&h)) {
        StreetClass::Street
    } else {
        StreetClass::OtherPath
    }
}

fn is_platform(tags: &Tags) -> bool {
    tags.is("railway", "platform")
        || tags.is("highway", "platform")
        || tags.is("public_transport", "platform")
}

fn street_edge(
    segment: &WaySegmentInput<'_>,
    name: String,
    geometry: LineString<f64>,
    length: f64,
    permission: Permission,
    safety: f64,
    back: bool,
) -> StreetEdge {
    let tags = &segment.way.tags;
    let stairs = tags.is("highway", "steps");
    let length = if stairs { length * 2.0 } else { length };

    let mut edge = StreetEdge::street(name, segment.way.id, geometry, length, permission, safety);
    edge.street_class = street_class(tags);
    edge.notes = segment.notes.to_vec();

    let wheelchair = !(tags.is_false("wheelchair") || (stairs && !tags.is_true("wheelchair")));
    let flags = &mut edge.flags;
    flags.set(EdgeFlags::WHEELCHAIR_ACCESSIBLE, wheelchair);
    flags.set(EdgeFlags::BACK, back);
    flags.set(EdgeFlags::STAIRS, stairs);
    flags.set(EdgeFlags::ROUNDABOUT, tags.is("junction", "roundabout"));
    flags.set(EdgeFlags::NO_THRU_TRAFFIC, access::is_no_thru_traffic(tags));
    flags.set(EdgeFlags::BOGUS_NAME, !tags.has("name"));
    flags.set(EdgeFlags::PLATFORM, is_platform(tags));
    flags.set(EdgeFlags::SLOPE_OVERRIDE, segment.slope_override);

    edge
}
