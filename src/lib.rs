//! Compiles tagged map data into a directed street graph for pedestrian,
//! bicycle and car routing.
//!
//! A parser feeds nodes, ways and relations into an [`OsmDatabase`]. A
//! [`GraphBuilder`] then turns the database into a [`StreetGraph`], using a
//! [`RuleTable`] for permissions, safety and names.
//!
//! ```no_run
//! use streetgraph::{BuildConfig, GraphBuilder, OsmDatabase, OsmHandler, RuleTable};
//!
//! # fn main() -> streetgraph::Result<()> {
//! let mut db = OsmDatabase::new();
//! // ... db.add_node / db.add_way / db.add_relation ...
//! db.second_phase();
//!
//! let config = BuildConfig::default();
//! let rules = RuleTable::builtin()?;
//! let built = GraphBuilder::new(&db, &rules, &config).build()?.normalize();
//! println!("{} edges", built.graph.edge_count());
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod builder;
pub mod config;
mod defaults;
pub mod error;
pub mod graph;
pub mod level;
pub mod naming;
pub mod osm;
pub mod permission;
pub mod restriction;
pub mod rules;
pub mod safety;
pub mod specifier;

pub use builder::{BuiltGraph, EdgeBasedConverter, GraphBuilder};
pub use config::BuildConfig;
pub use error::{BuildError, Result};
pub use graph::{EdgeFlags, EdgeKind, StreetEdge, StreetGraph, Vertex, VertexKind};
pub use naming::{CustomNamer, QualifierNamer};
pub use osm::{OsmDatabase, OsmHandler, OsmNode, OsmRelation, OsmWay, Tags};
pub use permission::Permission;
pub use restriction::{RestrictionKind, TurnRestriction};
pub use rules::RuleTable;
pub use safety::UnnormalizedGraph;
pub use specifier::Specifier;
