use approx::assert_relative_eq;
use streetgraph::graph::StreetClass;
use streetgraph::osm::{MemberType, RelationMember};
use streetgraph::{
    BuildConfig, BuildError, BuiltGraph, EdgeBasedConverter, EdgeFlags, EdgeKind, GraphBuilder,
    OsmDatabase, OsmHandler, OsmNode, OsmRelation, OsmWay, Permission, QualifierNamer,
    RestrictionKind, RuleTable, StreetGraph, Tags, TurnRestriction, VertexKind,
};

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs.iter().copied().collect()
}

struct Fixture {
    db: OsmDatabase,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            db: OsmDatabase::new(),
        }
    }

    fn node(mut self, id: i64, lat: f64, lon: f64, pairs: &[(&str, &str)]) -> Self {
        self.db.add_node(OsmNode::new(id, lat, lon, tags(pairs)));
        self
    }

    fn way(mut self, id: i64, nodes: &[i64], pairs: &[(&str, &str)]) -> Self {
        self.db.add_way(OsmWay::new(id, nodes.to_vec(), tags(pairs)));
        self
    }

    fn relation(mut self, id: i64, members: Vec<RelationMember>, pairs: &[(&str, &str)]) -> Self {
        self.db.add_relation(OsmRelation::new(id, members, tags(pairs)));
        self
    }

    fn build_with(mut self, config: &BuildConfig) -> Result<BuiltGraph, BuildError> {
        self.db.second_phase();
        let rules = RuleTable::builtin()?;
        Ok(GraphBuilder::new(&self.db, &rules, config).build()?.normalize())
    }

    fn build(self) -> BuiltGraph {
        self.build_with(&BuildConfig::default()).unwrap()
    }
}

#[test_log::test]
fn residential_way_yields_two_equal_edges() {
    let built = Fixture::new()
        .node(1, 45.0, -122.0, &[])
        .node(2, 45.001, -122.0, &[])
        .way(10, &[1, 2], &[("highway", "residential"), ("name", "Elm Street")])
        .build();

    let edges = built.graph.edges().map(|(_, e)| e).collect::<Vec<_>>();
    assert_eq!(edges.len(), 2);
    assert!(edges.iter().all(|e| e.permission == Permission::ALL));
    assert_relative_eq!(edges[0].length, edges[1].length);
    assert!(!edges[0].is_back());
    assert!(edges[1].is_back());
    assert!(edges.iter().all(|e| e.name == "Elm Street"));
    assert!(edges.iter().all(|e| e.street_class == StreetClass::Street));
    assert!(!edges[0].flags.contains(EdgeFlags::BOGUS_NAME));
}

#[test_log::test]
fn oneway_motorway_yields_one_car_edge() {
    let built = Fixture::new()
        .node(1, 45.0, -122.0, &[])
        .node(2, 45.001, -122.0, &[])
        .way(10, &[1, 2], &[("highway", "motorway"), ("oneway", "yes")])
        .build();

    let edges = built.graph.edges().map(|(_, e)| e).collect::<Vec<_>>();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].permission, Permission::CAR);
    assert!(!edges[0].is_back());
    assert_eq!(edges[0].geometry.0[0].y, 45.0);
}

fn turn_fixture(restriction: &str) -> Fixture {
    Fixture::new()
        .node(1, 0.0, 0.0, &[])
        .node(2, 0.001, 0.0, &[])
        .node(3, 0.001, -0.001, &[])
        .way(10, &[1, 2], &[("highway", "residential")])
        .way(11, &[2, 3], &[("highway", "residential")])
        .relation(
            40,
            vec![
                RelationMember::new(MemberType::Way, 10, "from"),
                RelationMember::new(MemberType::Node, 2, "via"),
                RelationMember::new(MemberType::Way, 11, "to"),
            ],
            &[("type", "restriction"), ("restriction", restriction)],
        )
}

#[test_log::test]
fn no_left_turn_binds_one_restriction() {
    let built = turn_fixture("no_left_turn").build();

    assert_eq!(built.restrictions.len(), 1);
    let restriction = built.restrictions[0];
    assert_eq!(restriction.kind, RestrictionKind::NoTurn);
    assert_eq!(restriction.modes, Permission::BICYCLE_AND_CAR);

    let from = built.graph.edge(restriction.from);
    let to = built.graph.edge(restriction.to);
    assert_eq!(from.way_id, Some(10));
    assert!(!from.is_back());
    assert_eq!(to.way_id, Some(11));
    assert!(!to.is_back());

    let (_, via) = built.graph.endpoints(restriction.from).unwrap();
    let (via_again, _) = built.graph.endpoints(restriction.to).unwrap();
    assert_eq!(via, via_again);
    assert_eq!(built.graph.vertex(via).label, "osm node 2");
}

#[test_log::test]
fn turn_direction_must_match_geometry() {
    // the same geometry is a left turn, so a right-turn ban binds nothing
    let built = turn_fixture("no_right_turn").build();
    assert!(built.restrictions.is_empty());
}

fn elevator_fixture(lower: &str, upper: &str) -> Fixture {
    Fixture::new()
        .node(1, 0.0, 0.0, &[])
        .node(5, 0.0005, 0.0, &[("highway", "elevator"), ("wheelchair", "no")])
        .node(2, 0.001, 0.0, &[])
        .way(20, &[1, 5], &[("highway", "footway"), ("level", lower)])
        .way(21, &[5, 2], &[("highway", "footway"), ("level", upper)])
}

#[test_log::test]
fn elevator_is_decomposed_per_level() {
    let built = elevator_fixture("0", "1").build();
    let graph = &built.graph;

    let lower = graph.vertex_by_label("osm node 5 at level 0").unwrap();
    let upper = graph.vertex_by_label("osm node 5 at level 1").unwrap();
    assert!(graph.vertex_by_label("osm node 5").is_none());

    let offboard = graph.vertex_by_label("osm node 5 at level 0_offboard").unwrap();
    let onboard_low = graph.vertex_by_label("osm node 5 at level 0_onboard").unwrap();
    let onboard_high = graph.vertex_by_label("osm node 5 at level 1_onboard").unwrap();
    assert_eq!(
        graph.vertex(offboard).kind,
        VertexKind::ElevatorOffboard { level: "0".into() }
    );
    assert_eq!(graph.vertex_count(), 8);

    let count = |kind: EdgeKind| graph.edges().filter(|(_, e)| e.kind == kind).count();
    assert_eq!(count(EdgeKind::Street), 4);
    assert_eq!(count(EdgeKind::PassThrough), 4);
    assert_eq!(count(EdgeKind::Board), 2);
    assert_eq!(count(EdgeKind::Alight), 2);
    assert_eq!(count(EdgeKind::Hop), 2);

    let hops = graph
        .edges()
        .filter(|(_, e)| e.kind == EdgeKind::Hop)
        .collect::<Vec<_>>();
    for (id, hop) in &hops {
        assert_eq!(hop.permission, Permission::PEDESTRIAN_AND_BICYCLE);
        assert!(!hop.is_wheelchair_accessible());
        let (a, b) = graph.endpoints(*id).unwrap();
        assert!(
            (a, b) == (onboard_low, onboard_high) || (a, b) == (onboard_high, onboard_low)
        );
    }

    let street_into_lower = graph
        .edges_of_way(20)
        .filter(|(id, _)| graph.endpoints(*id).unwrap().1 == lower)
        .count();
    assert_eq!(street_into_lower, 1);
    assert!(graph.edges_of_way(21).all(|(id, _)| {
        let (a, b) = graph.endpoints(id).unwrap();
        a == upper || b == upper
    }));
}

#[test_log::test]
fn one_based_levels_relabel_elevator_vertices() {
    let config = BuildConfig {
        one_based_levels: true,
        ..BuildConfig::default()
    };
    let built = elevator_fixture("0", "1").build_with(&config).unwrap();
    assert!(built.graph.vertex_by_label("osm node 5 at level 1").is_some());
    assert!(built.graph.vertex_by_label("osm node 5 at level 2").is_some());
}

#[test_log::test]
fn conflicting_level_labels_abort_the_build() {
    let err = elevator_fixture("1@Lobby", "1@Mezzanine")
        .build_with(&BuildConfig::default())
        .unwrap_err();
    assert!(matches!(err, BuildError::LevelConflict { node: 5, level: 1001, .. }));
}

#[test_log::test]
fn safety_is_normalized_by_best_multiplier() {
    let built = Fixture::new()
        .node(1, 0.0, 0.0, &[])
        .node(2, 0.001, 0.0, &[])
        .node(3, 0.002, 0.0, &[])
        .node(4, 0.003, 0.0, &[])
        .way(30, &[1, 2], &[("highway", "cycleway")])
        .way(31, &[2, 3], &[("highway", "residential")])
        .way(32, &[3, 4], &[("highway", "primary")])
        .build();

    let ratio = |way: i64| {
        let (_, edge) = built.graph.edges_of_way(way).next().unwrap();
        edge.effective_length / edge.length
    };
    assert_relative_eq!(ratio(30), 1.0, epsilon = 1e-9);
    assert_relative_eq!(ratio(31), 0.98 / 0.6, epsilon = 1e-9);
    assert_relative_eq!(ratio(32), 2.06 / 0.6, epsilon = 1e-9);
    assert!(ratio(30) < ratio(31) && ratio(31) < ratio(32));
    assert!(built.graph.edges().all(|(_, e)| e.effective_length >= e.length - 1e-9));
}

#[test_log::test]
fn sidewalks_borrow_adjacent_street_names() {
    let mut db = OsmDatabase::new();
    db.add_node(OsmNode::new(1, 0.0, 0.0, Tags::new()));
    db.add_node(OsmNode::new(2, 0.001, 0.0, Tags::new()));
    db.add_node(OsmNode::new(3, 0.001, 0.001, Tags::new()));
    db.add_way(OsmWay::new(
        10,
        vec![1, 2],
        tags(&[("highway", "residential"), ("name", "Oak Avenue")]),
    ));
    db.add_way(OsmWay::new(
        11,
        vec![2, 3],
        tags(&[("highway", "footway"), ("footway", "sidewalk")]),
    ));
    db.second_phase();

    let rules = RuleTable::builtin().unwrap();
    let config = BuildConfig::default();
    let built = GraphBuilder::new(&db, &rules, &config)
        .with_namer(QualifierNamer::new())
        .build()
        .unwrap()
        .normalize();

    let (_, sidewalk) = built.graph.edges_of_way(11).next().unwrap();
    assert_eq!(sidewalk.name, "Oak Avenue (sidewalk)");
    assert!(sidewalk.flags.contains(EdgeFlags::BOGUS_NAME));
    assert_eq!(sidewalk.permission, Permission::PEDESTRIAN);
}

struct EdgeCounter;

impl EdgeBasedConverter for EdgeCounter {
    type Output = (usize, usize);

    fn convert(&mut self, graph: StreetGraph, restrictions: Vec<TurnRestriction>) -> (usize, usize) {
        (graph.edge_count(), restrictions.len())
    }
}

#[test]
fn built_graph_is_handed_to_converter() {
    let built = turn_fixture("no_left_turn").build();
    assert_eq!(built.into_edge_based(&mut EdgeCounter), (4, 1));
}
