//! Turn restrictions: parsed from relations before assembly, bound to edges
//! while ways are split, and resolved into edge pairs afterwards.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};
use strum::{Display, EnumString};

use crate::graph::{EdgeId, StreetGraph};
use crate::osm::OsmRelation;
use crate::permission::Permission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RestrictionKind {
    NoTurn,
    OnlyTurn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TurnDirection {
    Left,
    Right,
    Straight,
    U,
}

impl TurnDirection {
    /// `angle` is the out-bearing of the from edge minus the in-bearing of
    /// the to edge, in [0, 360).
    pub fn matches(self, angle: f64) -> bool {
        match self {
            TurnDirection::Left => angle < 160.0,
            TurnDirection::Right => angle > 200.0,
            TurnDirection::U => angle > 150.0 && angle <= 210.0,
            TurnDirection::Straight => !(30.0..330.0).contains(&angle),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
enum RestrictionKeyword {
    NoRightTurn,
    NoLeftTurn,
    NoStraightOn,
    NoUTurn,
    OnlyRightTurn,
    OnlyLeftTurn,
    OnlyStraightOn,
    OnlyUTurn,
}

impl RestrictionKeyword {
    fn meaning(self) -> (RestrictionKind, TurnDirection) {
        use RestrictionKind::*;
        use TurnDirection::*;
        match self {
            RestrictionKeyword::NoRightTurn => (NoTurn, Right),
            RestrictionKeyword::NoLeftTurn => (NoTurn, Left),
            RestrictionKeyword::NoStraightOn => (NoTurn, Straight),
            RestrictionKeyword::NoUTurn => (NoTurn, U),
            RestrictionKeyword::OnlyRightTurn => (OnlyTurn, Right),
            RestrictionKeyword::OnlyLeftTurn => (OnlyTurn, Left),
            RestrictionKeyword::OnlyStraightOn => (OnlyTurn, Straight),
            RestrictionKeyword::OnlyUTurn => (OnlyTurn, U),
        }
    }
}

/// A restriction relation waiting for its edges to be built.
#[derive(Debug, Clone)]
pub struct PendingRestriction {
    pub relation_id: i64,
    pub from_way: i64,
    pub to_way: i64,
    pub via: i64,
    pub kind: RestrictionKind,
    pub direction: TurnDirection,
    pub modes: Permission,
    pub possible_from: Vec<EdgeId>,
    pub possible_to: Vec<EdgeId>,
}

impl PendingRestriction {
    /// Reads a `type=restriction` relation. Incomplete relations and unknown
    /// keywords are logged and yield `None`.
    pub fn from_relation(relation: &OsmRelation) -> Option<Self> {
        let (mut from, mut to, mut via) = (None, None, None);
        for member in &relation.members {
            match member.role.as_str() {
                "from" => from = Some(member.id),
                "to" => to = Some(member.id),
                "via" => via = Some(member.id),
                _ => {}
            }
        }
        let (Some(from_way), Some(to_way), Some(via)) = (from, to, via) else {
            warn!("turn restriction {} lacks a from, to or via member", relation.id);
            return None;
        };

        let mut modes = Permission::BICYCLE_AND_CAR;
        if let Some(except) = relation.tags.get("except") {
            for mode in except.split(';').map(str::trim) {
                match mode {
                    "motorcar" => modes = modes.remove_modes(Permission::CAR),
                    "bicycle" => {
                        modes = modes.remove_modes(Permission::BICYCLE);
                        warn!(
                            "turn restriction {} at node {via} from way {from_way} exempts bicycles",
                            relation.id
                        );
                    }
                    _ => {}
                }
            }
        }

        let keyword = relation.tags.get("restriction").unwrap_or_default();
        let Ok(keyword) = keyword.parse::<RestrictionKeyword>() else {
            warn!("turn restriction {} has unknown type {keyword:?}", relation.id);
            return None;
        };
        let (kind, direction) = keyword.meaning();

        Some(PendingRestriction {
            relation_id: relation.id,
            from_way,
            to_way,
            via,
            kind,
            direction,
            modes,
            possible_from: vec![],
            possible_to: vec![],
        })
    }
}

/// A restriction between two concrete edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnRestriction {
    pub from: EdgeId,
    pub to: EdgeId,
    pub kind: RestrictionKind,
    pub modes: Permission,
}

/// Pending restrictions indexed by their from-way and to-way.
#[derive(Debug, Default)]
pub struct RestrictionTable {
    pending: BTreeMap<i64, PendingRestriction>,
    by_from_way: HashMap<i64, Vec<i64>>,
    by_to_way: HashMap<i64, Vec<i64>>,
}

impl RestrictionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, restriction: PendingRestriction) {
        let id = restriction.relation_id;
        self.by_from_way
            .entry(restriction.from_way)
            .or_default()
            .push(id);
        self.by_to_way.entry(restriction.to_way).or_default().push(id);
        self.pending.insert(id, restriction);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn get(&self, relation_id: i64) -> Option<&PendingRestriction> {
        self.pending.get(&relation_id)
    }

    /// Records the edges of one segment of `way_id` running from node
    /// `start` to node `end` as candidates.
    pub fn bind_segment(
        &mut self,
        way_id: i64,
        start: i64,
        end: i64,
        forward: Option<EdgeId>,
        backward: Option<EdgeId>,
    ) {
        if let Some(ids) = self.by_from_way.get(&way_id) {
            for id in ids {
                let Some(tag) = self.pending.get_mut(id) else {
                    continue;
                };
                let candidate = if tag.via == start {
                    backward
                } else if tag.via == end {
                    forward
                } else {
                    None
                };
                tag.possible_from.extend(candidate);
            }
        }

        if let Some(ids) = self.by_to_way.get(&way_id) {
            for id in ids {
                let Some(tag) = self.pending.get_mut(id) else {
                    continue;
                };
                let candidate = if tag.via == start {
                    forward
                } else if tag.via == end {
                    backward
                } else {
                    None
                };
                tag.possible_to.extend(candidate);
            }
        }
    }

    /// Pairs every bound from edge with every bound to edge whose turn angle
    /// fits the restriction's direction. Unbound restrictions are dropped.
    pub fn resolve(self, graph: &StreetGraph) -> Vec<TurnRestriction> {
        let mut restrictions = vec![];

        for tag in self.pending.into_values() {
            if tag.possible_from.is_empty() {
                warn!("no from edge found for turn restriction {}", tag.relation_id);
                continue;
            }
            if tag.possible_to.is_empty() {
                warn!("no to edge found for turn restriction {}", tag.relation_id);
                continue;
            }

            for &from in &tag.possible_from {
                for &to in &tag.possible_to {
                    let angle = turn_angle(graph, from, to);
                    if !tag.direction.matches(angle) {
                        debug!(
                            "turn restriction {}: {angle:.0} degrees is not a {} turn",
                            tag.relation_id, tag.direction
                        );
                        continue;
                    }
                    restrictions.push(TurnRestriction {
                        from,
                        to,
                        kind: tag.kind,
                        modes: tag.modes,
                    });
                }
            }
        }

        restrictions
    }
}

fn turn_angle(graph: &StreetGraph, from: EdgeId, to: EdgeId) -> f64 {
    (graph.edge(from).out_bearing - graph.edge(to).in_bearing).rem_euclid(360.0)
}
