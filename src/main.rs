use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use log::info;
use osmpbf::{Element, ElementReader, RelMemberType};
use petgraph::Direction;
use streetgraph::osm::{MemberType, RelationMember};
use streetgraph::{
    BuildConfig, EdgeBasedConverter, GraphBuilder, OsmDatabase, OsmHandler, OsmNode, OsmRelation,
    OsmWay, QualifierNamer, RestrictionKind, StreetGraph, Tags, TurnRestriction,
};

/// Builds a routable street graph from an OpenStreetMap PBF extract and
/// reports what was built.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The `.osm.pbf` file to read.
    input: PathBuf,

    /// JSON build configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON rule table, overriding the configuration and the built-in rules.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Label numeric levels starting from 1.
    #[arg(long)]
    one_based_levels: bool,

    /// Qualify generated sidewalk and path names with nearby street names.
    #[arg(long)]
    qualify_names: bool,
}

fn member_type(kind: RelMemberType) -> MemberType {
    match kind {
        RelMemberType::Node => MemberType::Node,
        RelMemberType::Way => MemberType::Way,
        RelMemberType::Relation => MemberType::Relation,
    }
}

fn load(path: &Path) -> anyhow::Result<OsmDatabase> {
    info!("Parsing OSM PBF: {}", path.display());

    let mut db = OsmDatabase::new();
    let reader = ElementReader::from_path(path)
        .with_context(|| format!("cannot open {}", path.display()))?;

    reader.for_each(|element| match element {
        Element::Node(node) => db.add_node(OsmNode::new(
            node.id(),
            node.lat(),
            node.lon(),
            node.tags().collect(),
        )),
        Element::DenseNode(node) => db.add_node(OsmNode::new(
            node.id(),
            node.lat(),
            node.lon(),
            node.tags().collect(),
        )),
        Element::Way(way) => db.add_way(OsmWay::new(
            way.id(),
            way.refs().collect(),
            way.tags().collect(),
        )),
        Element::Relation(relation) => {
            let members = relation
                .members()
                .map(|m| {
                    let role = m.role().unwrap_or_default();
                    RelationMember::new(member_type(m.member_type), m.member_id, role)
                })
                .collect();
            db.add_relation(OsmRelation::new(
                relation.id(),
                members,
                relation.tags().collect::<Tags>(),
            ));
        }
    })?;

    db.second_phase();
    info!(
        "Loaded {} nodes, {} ways, {} relations",
        db.nodes.len(),
        db.ways.len(),
        db.relations.len()
    );
    Ok(db)
}

/// Counts the vertex-to-vertex turns a router would expand, minus the ones
/// forbidden outright.
struct TurnCounter;

struct TurnSummary {
    turns: usize,
    forbidden: usize,
    only_turns: usize,
}

impl EdgeBasedConverter for TurnCounter {
    type Output = TurnSummary;

    fn convert(&mut self, graph: StreetGraph, restrictions: Vec<TurnRestriction>) -> TurnSummary {
        let forbidden = restrictions
            .iter()
            .filter(|r| r.kind == RestrictionKind::NoTurn)
            .map(|r| (r.from, r.to))
            .collect::<HashSet<_>>();
        let only_turns = restrictions
            .iter()
            .filter(|r| r.kind == RestrictionKind::OnlyTurn)
            .count();

        let inner = graph.inner();
        let turns = inner
            .node_indices()
            .map(|v| {
                inner.edges_directed(v, Direction::Incoming).count()
                    * inner.edges_directed(v, Direction::Outgoing).count()
            })
            .sum::<usize>();

        TurnSummary {
            turns: turns - forbidden.len().min(turns),
            forbidden: forbidden.len(),
            only_turns,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => BuildConfig::from_json_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => BuildConfig::default(),
    };
    if args.rules.is_some() {
        config.rules = args.rules.clone();
    }
    config.one_based_levels |= args.one_based_levels;
    config.qualify_names |= args.qualify_names;

    let rules = config.rule_table().context("cannot load rule table")?;
    let db = load(&args.input)?;

    let mut builder = GraphBuilder::new(&db, &rules, &config);
    if config.qualify_names {
        builder = builder.with_namer(QualifierNamer::new());
    }
    let built = builder.build()?.normalize();

    info!(
        "Graph built: {} vertices, {} edges",
        built.graph.vertex_count(),
        built.graph.edge_count()
    );

    let summary = built.into_edge_based(&mut TurnCounter);
    info!(
        "{} turns, {} forbidden, {} only-turn restrictions",
        summary.turns, summary.forbidden, summary.only_turns
    );

    Ok(())
}
