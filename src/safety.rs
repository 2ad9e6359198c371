use log::info;

use crate::builder::BuiltGraph;
use crate::graph::{EdgeKind, StreetGraph};
use crate::restriction::TurnRestriction;

/// An assembled graph whose safety-weighted lengths still carry raw
/// multipliers. [`UnnormalizedGraph::normalize`] consumes it, so the
/// division can only ever happen once.
#[derive(Debug)]
pub struct UnnormalizedGraph {
    graph: StreetGraph,
    restrictions: Vec<TurnRestriction>,
    best_safety: f64,
}

impl UnnormalizedGraph {
    pub(crate) fn new(graph: StreetGraph, restrictions: Vec<TurnRestriction>, best_safety: f64) -> Self {
        UnnormalizedGraph {
            graph,
            restrictions,
            best_safety,
        }
    }

    /// Smallest multiplier seen during assembly, never above 1.0.
    pub fn best_safety(&self) -> f64 {
        self.best_safety
    }

    pub fn graph(&self) -> &StreetGraph {
        &self.graph
    }

    /// Divides every street edge's safety-weighted length by the best
    /// multiplier, so the safest edge costs exactly its length.
    pub fn normalize(self) -> BuiltGraph {
        let UnnormalizedGraph {
            mut graph,
            restrictions,
            best_safety,
        } = self;

        info!("Normalizing bike safety by {best_safety}");

        if best_safety > 0.0 {
            for edge in graph.edges_mut().filter(|e| e.kind == EdgeKind::Street) {
                edge.effective_length /= best_safety;
            }
        }

        BuiltGraph {
            graph,
            restrictions,
        }
    }
}
