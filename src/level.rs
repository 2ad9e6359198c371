//! Vertical levels of ways, and the per-level vertices of elevator nodes.
//!
//! Every level has a numeric key, used for ordering and conflict detection,
//! and a display label. Each source is shifted by its own offset, which keeps
//! keys apart as long as numeric values stay within (-500, 500):
//!
//! | source          | key                        |
//! |-----------------|----------------------------|
//! | level map       | the map's own number       |
//! | `level` tag     | value + 1000               |
//! | `layer` tag     | value + 2000               |
//! | untagged        | 3000 (`ground`)            |
//! | unparseable     | 10000, 10001, ...          |
//!
//! Numbers whose key would overflow are treated as unparseable.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};

use crate::error::{BuildError, Result};
use crate::graph::VertexId;
use crate::osm::{MemberType, OsmRelation, Tags};

const LEVEL_TAG_OFFSET: i64 = 1000;
const LAYER_TAG_OFFSET: i64 = 2000;
const GROUND_LEVEL: i64 = 3000;
const FIRST_SYNTHETIC_LEVEL: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelSource {
    LevelMap,
    LevelTag,
    LayerTag,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Level {
    pub number: i64,
    pub label: String,
    pub source: LevelSource,
}

impl Level {
    pub fn ground() -> Self {
        Level {
            number: GROUND_LEVEL,
            label: "ground".to_string(),
            source: LevelSource::Default,
        }
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then_with(|| self.label.cmp(&other.label))
    }
}

/// Parses level strings, minting stable keys for unparseable ones.
#[derive(Debug)]
pub struct LevelResolver {
    one_based: bool,
    synthetic: HashMap<(LevelSource, String), i64>,
    next_synthetic: i64,
}

impl LevelResolver {
    pub fn new(one_based: bool) -> Self {
        LevelResolver {
            one_based,
            synthetic: HashMap::new(),
            next_synthetic: FIRST_SYNTHETIC_LEVEL,
        }
    }

    fn synthetic_number(&mut self, source: LevelSource, text: &str) -> i64 {
        let key = (source, text.to_string());
        if let Some(&number) = self.synthetic.get(&key) {
            return number;
        }
        let number = self.next_synthetic;
        self.next_synthetic += 1;
        debug!("unparseable level {text:?} ({source:?}) assigned key {number}");
        self.synthetic.insert(key, number);
        number
    }

    /// Parses `text` as `short` or `short@long`. `offset` is added to a
    /// numeric `short`.
    fn parse(&mut self, text: &str, source: LevelSource, offset: i64) -> Level {
        let (short, long) = match text.split_once('@') {
            Some((short, long)) => (short.trim(), Some(long.trim())),
            None => (text.trim(), None),
        };

        let numeric = short.parse::<i64>().ok().and_then(|value| {
            let number = value.checked_add(offset);
            if number.is_none() {
                warn!("level {text:?} ({source:?}) is out of range");
            }
            number.map(|number| (value, number))
        });

        match numeric {
            Some((value, number)) => {
                let label = match long {
                    Some(long) => long.to_string(),
                    None if self.one_based && value >= 0 && source != LevelSource::LevelMap => {
                        value.saturating_add(1).to_string()
                    }
                    None => value.to_string(),
                };
                Level {
                    number,
                    label,
                    source,
                }
            }
            None => Level {
                number: self.synthetic_number(source, text),
                label: long.unwrap_or(short).to_string(),
                source,
            },
        }
    }

    pub fn from_level_tag(&mut self, text: &str) -> Level {
        self.parse(text, LevelSource::LevelTag, LEVEL_TAG_OFFSET)
    }

    pub fn from_layer_tag(&mut self, text: &str) -> Level {
        self.parse(text, LevelSource::LayerTag, LAYER_TAG_OFFSET)
    }

    /// Level of a way from its own tags: `level`, then `layer`, then ground.
    pub fn for_tags(&mut self, tags: &Tags) -> Level {
        if let Some(text) = tags.get("level") {
            self.from_level_tag(text)
        } else if let Some(text) = tags.get("layer") {
            self.from_layer_tag(text)
        } else {
            Level::ground()
        }
    }

    /// Entries of a level map's `levels` tag, keyed by short name.
    pub fn parse_level_list(&mut self, spec: &str) -> HashMap<String, Level> {
        spec.split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let short = entry.split_once('@').map_or(entry, |(s, _)| s.trim());
                (short.to_string(), self.parse(entry, LevelSource::LevelMap, 0))
            })
            .collect()
    }

    /// Assigns levels from a `type=level_map` relation to its member ways.
    /// Members whose role has a `role:<role>` tag on the relation span
    /// several levels and are left alone.
    pub fn apply_level_map(&mut self, relation: &OsmRelation, way_levels: &mut HashMap<i64, Level>) {
        let levels = self.parse_level_list(relation.tags.get("levels").unwrap_or_default());

        for member in &relation.members {
            if member.member_type != MemberType::Way {
                continue;
            }
            if relation.tags.has(&format!("role:{}", member.role)) {
                continue;
            }
            match levels.get(&member.role) {
                Some(level) => {
                    way_levels.insert(member.id, level.clone());
                }
                None => warn!(
                    "way {} has undefined level {:?} in level map {}",
                    member.id, member.role, relation.id
                ),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LevelVertex {
    pub level: Level,
    pub vertex: VertexId,
}

/// Per-level vertices of every multi-level node, both in ascending order.
#[derive(Debug, Default)]
pub struct MultiLevelTable {
    nodes: BTreeMap<i64, BTreeMap<i64, LevelVertex>>,
}

impl MultiLevelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails if `node` already has a different label at the same key.
    pub fn record(&mut self, node: i64, level: &Level, vertex: VertexId) -> Result<()> {
        let levels = self.nodes.entry(node).or_default();
        match levels.get(&level.number) {
            Some(existing) if existing.level.label != level.label => Err(BuildError::LevelConflict {
                node,
                level: level.number,
                existing: existing.level.label.clone(),
                claimed: level.label.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                levels.insert(
                    level.number,
                    LevelVertex {
                        level: level.clone(),
                        vertex,
                    },
                );
                Ok(())
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, impl Iterator<Item = &LevelVertex>)> {
        self.nodes.iter().map(|(&node, levels)| (node, levels.values()))
    }

    pub fn levels_of(&self, node: i64) -> Vec<&Level> {
        self.nodes
            .get(&node)
            .map(|levels| levels.values().map(|lv| &lv.level).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::RelationMember;
    use petgraph::graph::NodeIndex;

    #[test]
    fn test_numeric_levels() {
        let mut zero = LevelResolver::new(false);
        let level = zero.from_level_tag("2");
        assert_eq!(level.number, 1002);
        assert_eq!(level.label, "2");

        let mut one = LevelResolver::new(true);
        let level = one.from_level_tag("2");
        assert_eq!(level.number, 1002);
        assert_eq!(level.label, "3");

        assert_eq!(one.from_level_tag("-1").label, "-1");
        assert_eq!(one.from_layer_tag("1").number, 2001);
    }

    #[test]
    fn test_short_and_long_names() {
        let mut resolver = LevelResolver::new(true);
        let level = resolver.from_level_tag("1@Mezzanine");
        assert_eq!(level.number, 1001);
        assert_eq!(level.label, "Mezzanine");
    }

    #[test]
    fn test_synthetic_levels_in_first_seen_order() {
        let mut resolver = LevelResolver::new(false);
        let numbers = ["Garage", "Basement", "Lobby"]
            .iter()
            .map(|text| resolver.from_level_tag(text).number)
            .collect::<Vec<_>>();
        assert_eq!(numbers, vec![10_000, 10_001, 10_002]);
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));

        assert_eq!(resolver.from_level_tag("Basement").number, 10_001);
        assert_eq!(resolver.from_layer_tag("Basement").number, 10_003);
        assert_eq!(resolver.from_level_tag("Lobby").label, "Lobby");
    }

    #[test_log::test]
    fn test_out_of_range_levels_become_synthetic() {
        let mut resolver = LevelResolver::new(true);
        let huge = resolver.from_level_tag("9223372036854775807");
        assert_eq!(huge.number, 10_000);
        assert_eq!(huge.label, "9223372036854775807");

        let tiny = resolver.from_layer_tag("-9223372036854775807@Deep");
        assert_eq!(tiny.number, 2000 - 9_223_372_036_854_775_807);
        assert_eq!(tiny.label, "Deep");

        let way = [("level", "9223372036854775807")].into_iter().collect();
        assert_eq!(resolver.for_tags(&way).number, 10_000);
    }

    #[test]
    fn test_sources_stay_apart_within_range() {
        let mut resolver = LevelResolver::new(false);
        assert!(resolver.from_level_tag("499").number < resolver.from_layer_tag("-499").number);
        assert!(resolver.from_layer_tag("499").number < Level::ground().number);

        // beyond the range a level tag can land on a layer key
        assert_eq!(
            resolver.from_level_tag("1000").number,
            resolver.from_layer_tag("0").number
        );
    }

    #[test]
    fn test_way_level_precedence() {
        let mut resolver = LevelResolver::new(false);
        let both: Tags = [("level", "1"), ("layer", "-1")].into_iter().collect();
        assert_eq!(resolver.for_tags(&both).number, 1001);
        let layer: Tags = [("layer", "-1")].into_iter().collect();
        assert_eq!(resolver.for_tags(&layer).number, 1999);
        assert_eq!(resolver.for_tags(&Tags::new()), Level::ground());
    }

    #[test_log::test]
    fn test_level_map_roles() {
        let mut resolver = LevelResolver::new(true);
        let relation = OsmRelation::new(
            50,
            vec![
                RelationMember::new(MemberType::Way, 1, "-1"),
                RelationMember::new(MemberType::Way, 2, "0"),
                RelationMember::new(MemberType::Way, 3, "ramp"),
                RelationMember::new(MemberType::Way, 4, "X"),
            ],
            [
                ("type", "level_map"),
                ("levels", "-1@Parking;0;ramp"),
                ("role:ramp", "-1;0"),
            ]
            .into_iter()
            .collect(),
        );

        let mut way_levels = HashMap::new();
        resolver.apply_level_map(&relation, &mut way_levels);

        assert_eq!(way_levels[&1].number, -1);
        assert_eq!(way_levels[&1].label, "Parking");
        assert_eq!(way_levels[&2].number, 0);
        assert_eq!(way_levels[&2].label, "0");
        assert!(!way_levels.contains_key(&3));
        assert!(!way_levels.contains_key(&4));
    }

    #[test]
    fn test_conflicting_labels_are_fatal() {
        let mut table = MultiLevelTable::new();
        let level = Level {
            number: 1001,
            label: "1".into(),
            source: LevelSource::LevelTag,
        };
        table.record(7, &level, NodeIndex::new(0)).unwrap();
        table.record(7, &level, NodeIndex::new(0)).unwrap();

        let clash = Level {
            label: "Mezzanine".into(),
            ..level
        };
        let err = table.record(7, &clash, NodeIndex::new(1)).unwrap_err();
        assert!(matches!(err, BuildError::LevelConflict { node: 7, level: 1001, .. }));
    }

    #[test]
    fn test_levels_iterate_ascending() {
        let mut table = MultiLevelTable::new();
        for (i, number) in [1003, 1001, 1002].into_iter().enumerate() {
            let level = Level {
                number,
                label: number.to_string(),
                source: LevelSource::LevelTag,
            };
            table.record(3, &level, NodeIndex::new(i)).unwrap();
        }
        let numbers = table.levels_of(3).iter().map(|l| l.number).collect::<Vec<_>>();
        assert_eq!(numbers, vec![1001, 1002, 1003]);
    }
}
