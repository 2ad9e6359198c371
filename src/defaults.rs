//! Built-in rule table for general-purpose street networks.
//!
//! Rows are registered in order, so among equally specific specifiers the
//! earlier row wins.

use crate::error::Result;
use crate::permission::Permission;
use crate::rules::{RuleTable, Template, WayProperties};
use crate::specifier::Specifier;

const NONE: Permission = Permission::NONE;
const ALL: Permission = Permission::ALL;
const PEDESTRIAN: Permission = Permission::PEDESTRIAN;
const WALK_BIKE: Permission = Permission::PEDESTRIAN_AND_BICYCLE;
const CAR: Permission = Permission::CAR;
const BIKE_CAR: Permission = Permission::BICYCLE_AND_CAR;

type PropertyRow = (&'static str, Permission, f64, f64);

const PROPERTIES: &[PropertyRow] = &[
    ("highway=raceway", NONE, 1.0, 1.0),
    ("highway=construction", NONE, 1.0, 1.0),
    ("highway=steps", PEDESTRIAN, 1.0, 1.0),
    ("highway=crossing", PEDESTRIAN, 1.0, 1.0),
    ("highway=platform", PEDESTRIAN, 1.0, 1.0),
    ("public_transport=platform", PEDESTRIAN, 1.0, 1.0),
    ("railway=platform", PEDESTRIAN, 1.0, 1.0),
    ("footway=sidewalk;highway=footway", PEDESTRIAN, 1.0, 1.0),
    ("highway=cycleway", WALK_BIKE, 0.60, 0.60),
    ("highway=path", WALK_BIKE, 0.75, 0.75),
    ("highway=pedestrian", WALK_BIKE, 0.90, 0.90),
    ("highway=footway", WALK_BIKE, 1.1, 1.1),
    ("highway=bridleway", WALK_BIKE, 1.3, 1.3),
    ("highway=living_street", ALL, 0.90, 0.90),
    ("highway=unclassified", ALL, 1.0, 1.0),
    ("highway=road", ALL, 1.0, 1.0),
    ("highway=byway", ALL, 1.3, 1.3),
    ("highway=track", ALL, 1.3, 1.3),
    ("highway=service", ALL, 1.1, 1.1),
    ("highway=residential", ALL, 0.98, 0.98),
    ("highway=residential_link", ALL, 0.98, 0.98),
    ("highway=tertiary", ALL, 1.0, 1.0),
    ("highway=tertiary_link", ALL, 1.0, 1.0),
    ("highway=secondary", ALL, 1.5, 1.5),
    ("highway=secondary_link", ALL, 1.5, 1.5),
    ("highway=primary", ALL, 2.06, 2.06),
    ("highway=primary_link", ALL, 2.06, 2.06),
    // links are short and often the only connection
    ("highway=trunk_link", CAR, 2.06, 2.06),
    ("highway=motorway_link", CAR, 2.06, 2.06),
    ("highway=trunk", CAR, 7.47, 7.47),
    ("highway=motorway", CAR, 8.0, 8.0),
    // cycleway=lane
    ("highway=*;cycleway=lane", WALK_BIKE, 0.87, 0.87),
    ("highway=service;cycleway=lane", ALL, 0.77, 0.77),
    ("highway=residential;cycleway=lane", ALL, 0.77, 0.77),
    ("highway=residential_link;cycleway=lane", ALL, 0.77, 0.77),
    ("highway=tertiary;cycleway=lane", ALL, 0.87, 0.87),
    ("highway=tertiary_link;cycleway=lane", ALL, 0.87, 0.87),
    ("highway=secondary;cycleway=lane", ALL, 0.96, 0.96),
    ("highway=secondary_link;cycleway=lane", ALL, 0.96, 0.96),
    ("highway=primary;cycleway=lane", ALL, 1.15, 1.15),
    ("highway=primary_link;cycleway=lane", ALL, 1.15, 1.15),
    ("highway=trunk;cycleway=lane", BIKE_CAR, 1.5, 1.5),
    ("highway=trunk_link;cycleway=lane", BIKE_CAR, 1.15, 1.15),
    ("highway=motorway;cycleway=lane", BIKE_CAR, 2.0, 2.0),
    ("highway=motorway_link;cycleway=lane", BIKE_CAR, 1.15, 1.15),
    // cycleway=share_busway
    ("highway=*;cycleway=share_busway", WALK_BIKE, 0.92, 0.92),
    ("highway=service;cycleway=share_busway", ALL, 0.85, 0.85),
    ("highway=residential;cycleway=share_busway", ALL, 0.85, 0.85),
    ("highway=residential_link;cycleway=share_busway", ALL, 0.85, 0.85),
    ("highway=tertiary;cycleway=share_busway", ALL, 0.92, 0.92),
    ("highway=tertiary_link;cycleway=share_busway", ALL, 0.92, 0.92),
    ("highway=secondary;cycleway=share_busway", ALL, 0.99, 0.99),
    ("highway=secondary_link;cycleway=share_busway", ALL, 0.99, 0.99),
    ("highway=primary;cycleway=share_busway", ALL, 1.25, 1.25),
    ("highway=primary_link;cycleway=share_busway", ALL, 1.25, 1.25),
    ("highway=trunk;cycleway=share_busway", BIKE_CAR, 1.75, 1.75),
    ("highway=trunk_link;cycleway=share_busway", BIKE_CAR, 1.25, 1.25),
    ("highway=motorway;cycleway=share_busway", BIKE_CAR, 2.5, 2.5),
    ("highway=motorway_link;cycleway=share_busway", BIKE_CAR, 1.25, 1.25),
    // cycleway=opposite_lane
    ("highway=*;cycleway=opposite_lane", WALK_BIKE, 1.0, 0.87),
    ("highway=service;cycleway=opposite_lane", ALL, 1.1, 0.77),
    ("highway=residential;cycleway=opposite_lane", ALL, 0.98, 0.77),
    ("highway=residential_link;cycleway=opposite_lane", ALL, 0.98, 0.77),
    ("highway=tertiary;cycleway=opposite_lane", ALL, 1.0, 0.87),
    ("highway=tertiary_link;cycleway=opposite_lane", ALL, 1.0, 0.87),
    ("highway=secondary;cycleway=opposite_lane", ALL, 1.5, 0.96),
    ("highway=secondary_link;cycleway=opposite_lane", ALL, 1.5, 0.96),
    ("highway=primary;cycleway=opposite_lane", ALL, 2.06, 1.15),
    ("highway=primary_link;cycleway=opposite_lane", ALL, 2.06, 1.15),
    ("highway=trunk;cycleway=opposite_lane", BIKE_CAR, 7.47, 1.5),
    ("highway=trunk_link;cycleway=opposite_lane", BIKE_CAR, 2.06, 1.15),
    // cycleway=track
    ("highway=*;cycleway=track", WALK_BIKE, 0.75, 0.75),
    ("highway=service;cycleway=track", ALL, 0.65, 0.65),
    ("highway=residential;cycleway=track", ALL, 0.65, 0.65),
    ("highway=residential_link;cycleway=track", ALL, 0.65, 0.65),
    ("highway=tertiary;cycleway=track", ALL, 0.75, 0.75),
    ("highway=tertiary_link;cycleway=track", ALL, 0.75, 0.75),
    ("highway=secondary;cycleway=track", ALL, 0.8, 0.8),
    ("highway=secondary_link;cycleway=track", ALL, 0.8, 0.8),
    ("highway=primary;cycleway=track", ALL, 0.85, 0.85),
    ("highway=primary_link;cycleway=track", ALL, 0.85, 0.85),
    ("highway=trunk;cycleway=track", BIKE_CAR, 0.95, 0.95),
    ("highway=trunk_link;cycleway=track", BIKE_CAR, 0.85, 0.85),
    // cycleway=opposite_track
    ("highway=*;cycleway=opposite_track", WALK_BIKE, 1.0, 0.75),
    ("highway=service;cycleway=opposite_track", ALL, 1.1, 0.65),
    ("highway=residential;cycleway=opposite_track", ALL, 0.98, 0.65),
    ("highway=residential_link;cycleway=opposite_track", ALL, 0.98, 0.65),
    ("highway=tertiary;cycleway=opposite_track", ALL, 1.0, 0.75),
    ("highway=tertiary_link;cycleway=opposite_track", ALL, 1.0, 0.75),
    ("highway=secondary;cycleway=opposite_track", ALL, 1.5, 0.8),
    ("highway=secondary_link;cycleway=opposite_track", ALL, 1.5, 0.8),
    ("highway=primary;cycleway=opposite_track", ALL, 2.06, 0.85),
    ("highway=primary_link;cycleway=opposite_track", ALL, 2.06, 0.85),
    ("highway=trunk;cycleway=opposite_track", BIKE_CAR, 7.47, 0.95),
    ("highway=trunk_link;cycleway=opposite_track", BIKE_CAR, 2.06, 0.85),
    // cycleway=shared_lane, i.e. bike boulevards
    ("highway=*;cycleway=shared_lane", WALK_BIKE, 0.77, 0.77),
    ("highway=service;cycleway=shared_lane", ALL, 0.73, 0.73),
    ("highway=residential;cycleway=shared_lane", ALL, 0.77, 0.77),
    ("highway=residential_link;cycleway=shared_lane", ALL, 0.77, 0.77),
    ("highway=tertiary;cycleway=shared_lane", ALL, 0.83, 0.83),
    ("highway=tertiary_link;cycleway=shared_lane", ALL, 0.83, 0.83),
    ("highway=secondary;cycleway=shared_lane", ALL, 1.25, 1.25),
    ("highway=secondary_link;cycleway=shared_lane", ALL, 1.25, 1.25),
    ("highway=primary;cycleway=shared_lane", ALL, 1.75, 1.75),
    ("highway=primary_link;cycleway=shared_lane", ALL, 1.75, 1.75),
    // cycleway=opposite
    ("highway=*;cycleway=opposite", WALK_BIKE, 1.0, 1.4),
    ("highway=service;cycleway=opposite", ALL, 1.1, 1.1),
    ("highway=residential;cycleway=opposite", ALL, 0.98, 0.98),
    ("highway=residential_link;cycleway=opposite", ALL, 0.98, 0.98),
    ("highway=tertiary;cycleway=opposite", ALL, 1.0, 1.0),
    ("highway=tertiary_link;cycleway=opposite", ALL, 1.0, 1.0),
    ("highway=secondary;cycleway=opposite", ALL, 1.5, 1.71),
    ("highway=secondary_link;cycleway=opposite", ALL, 1.5, 1.71),
    ("highway=primary;cycleway=opposite", ALL, 2.06, 2.99),
    ("highway=primary_link;cycleway=opposite", ALL, 2.06, 2.99),
    // multi-use paths count as cycleways
    ("highway=path;bicycle=designated", WALK_BIKE, 0.60, 0.60),
    ("highway=footway;bicycle=designated", WALK_BIKE, 0.75, 0.75),
    ("highway=footway;bicycle=yes;area=yes", WALK_BIKE, 0.9, 0.9),
    ("highway=pedestrian;bicycle=designated", WALK_BIKE, 0.75, 0.75),
    // sidewalks and crosswalks
    ("footway=sidewalk;highway=footway;bicycle=yes", WALK_BIKE, 2.5, 2.5),
    ("footway=sidewalk;highway=footway;bicycle=designated", WALK_BIKE, 1.1, 1.1),
    ("highway=footway;footway=crossing", WALK_BIKE, 2.5, 2.5),
    ("highway=footway;footway=crossing;bicycle=designated", WALK_BIKE, 1.1, 1.1),
    // tracks already carry the unpaved penalty
    ("highway=track;bicycle=yes", WALK_BIKE, 1.18, 1.18),
    ("highway=track;bicycle=designated", WALK_BIKE, 0.99, 0.99),
    ("highway=track;bicycle=yes;surface=*", WALK_BIKE, 1.18, 1.18),
    ("highway=track;bicycle=designated;surface=*", WALK_BIKE, 0.99, 0.99),
    ("highway=track;surface=*", WALK_BIKE, 1.3, 1.3),
    // bicycle=designated without infrastructure
    ("highway=*;bicycle=designated", WALK_BIKE, 0.97, 0.97),
    ("highway=service;bicycle=designated", ALL, 0.84, 0.84),
    ("highway=residential;bicycle=designated", ALL, 0.95, 0.95),
    ("highway=residential_link;bicycle=designated", ALL, 0.95, 0.95),
    ("highway=tertiary;bicycle=designated", ALL, 0.97, 0.97),
    ("highway=tertiary_link;bicycle=designated", ALL, 0.97, 0.97),
    ("highway=secondary;bicycle=designated", ALL, 1.46, 1.46),
    ("highway=secondary_link;bicycle=designated", ALL, 1.46, 1.46),
    ("highway=primary;bicycle=designated", ALL, 2.0, 2.0),
    ("highway=primary_link;bicycle=designated", ALL, 2.0, 2.0),
    ("highway=trunk;bicycle=designated", BIKE_CAR, 7.25, 7.25),
    ("highway=trunk_link;bicycle=designated", BIKE_CAR, 2.0, 2.0),
    ("highway=motorway;bicycle=designated", BIKE_CAR, 7.76, 7.76),
    ("highway=motorway_link;bicycle=designated", BIKE_CAR, 2.0, 2.0),
];

/// Surface and local-dataset penalties, multiplied onto the winning row.
const MIXINS: &[PropertyRow] = &[
    ("surface=unpaved", ALL, 1.18, 1.18),
    ("surface=compacted", ALL, 1.18, 1.18),
    ("surface=wood", ALL, 1.18, 1.18),
    ("surface=cobblestone", ALL, 1.3, 1.3),
    ("surface=cobblestone:flattened", ALL, 1.3, 1.3),
    ("surface=grass_paver", ALL, 1.3, 1.3),
    ("surface=pebblestone", ALL, 1.3, 1.3),
    ("surface=metal", ALL, 1.3, 1.3),
    ("surface=ground", ALL, 1.5, 1.5),
    ("surface=dirt", ALL, 1.5, 1.5),
    ("surface=earth", ALL, 1.5, 1.5),
    ("surface=grass", ALL, 1.5, 1.5),
    ("surface=mud", ALL, 1.5, 1.5),
    ("surface=woodchip", ALL, 1.5, 1.5),
    ("surface=gravel", ALL, 1.5, 1.5),
    ("surface=artifical_turf", ALL, 1.5, 1.5),
    ("surface=sand", ALL, 100.0, 100.0),
    ("RLIS:bicycle=caution_area", ALL, 1.45, 1.45),
    ("RLIS:bicycle:right=caution_area", ALL, 1.45, 1.0),
    ("RLIS:bicycle:left=caution_area", ALL, 1.0, 1.45),
    ("CCGIS:bicycle=caution_area", ALL, 1.45, 1.45),
    ("CCGIS:bicycle:right=caution_area", ALL, 1.45, 1.0),
    ("CCGIS:bicycle:left=caution_area", ALL, 1.0, 1.45),
];

const NOTES: &[(&str, &str)] = &[
    ("note=*", "{note}"),
    ("notes=*", "{notes}"),
    ("RLIS:bicycle=caution_area", "Caution!"),
    ("CCGIS:bicycle=caution_area", "Caution!"),
    ("surface=unpaved", "Unpaved surface"),
    ("surface=compacted", "Unpaved surface"),
    ("surface=ground", "Unpaved surface"),
    ("surface=dirt", "Unpaved surface"),
    ("surface=earth", "Unpaved surface"),
    ("surface=grass", "Unpaved surface"),
    ("surface=mud", "Unpaved surface -- muddy!"),
];

const NAMES: &[(&str, &str)] = &[
    ("highway=cycleway", "bike path"),
    ("cycleway=track", "bike path"),
    ("highway=pedestrian", "path"),
    ("highway=pedestrian;area=yes", "open area"),
    ("highway=path", "path"),
    ("highway=footway", "path"),
    ("highway=bridleway", "bridleway"),
    ("highway=footway;bicycle=no", "footpath"),
    ("relation:route_ref=*", "Route {relation:route_ref}"),
    ("highway=platform;ref=*", "Platform {ref}"),
    ("railway=platform;ref=*", "Platform {ref}"),
    ("railway=platform;highway=footway;footway=sidewalk", "platform"),
    ("railway=platform;highway=path;path=sidewalk", "platform"),
    ("railway=platform;highway=pedestrian", "platform"),
    ("railway=platform;highway=path", "platform"),
    ("railway=platform;highway=footway", "platform"),
    ("highway=platform", "platform"),
    ("railway=platform", "platform"),
    ("railway=platform;highway=footway;bicycle=no", "platform"),
    ("highway=pedestrian;bridge=*", "footbridge"),
    ("highway=path;bridge=*", "footbridge"),
    ("highway=footway;bridge=*", "footbridge"),
    ("highway=pedestrian;tunnel=*", "underpass"),
    ("highway=path;tunnel=*", "underpass"),
    ("highway=footway;tunnel=*", "underpass"),
    ("highway=motorway", "road"),
    ("highway=motorway_link", "ramp"),
    ("highway=trunk", "road"),
    ("highway=trunk_link", "ramp"),
    ("highway=primary", "road"),
    ("highway=primary_link", "link"),
    ("highway=secondary", "road"),
    ("highway=secondary_link", "link"),
    ("highway=tertiary", "road"),
    ("highway=tertiary_link", "link"),
    ("highway=unclassified", "road"),
    ("highway=residential", "road"),
    ("highway=living_street", "road"),
    ("highway=road", "road"),
    ("highway=service", "service road"),
    ("highway=service;service=alley", "alley"),
    ("highway=service;service=parking_aisle", "parking aisle"),
    ("highway=byway", "byway"),
    ("highway=track", "track"),
    ("highway=footway;footway=sidewalk", "sidewalk"),
    ("highway=path;path=sidewalk", "sidewalk"),
    ("highway=steps", "steps"),
];

const SLOPE_OVERRIDES: &[&str] = &["bridge=*", "embankment=*", "tunnel=*"];

impl RuleTable {
    /// The built-in table. Unmatched ways default to [`Permission::ALL`].
    pub fn builtin() -> Result<RuleTable> {
        let mut table = RuleTable::new().with_default_permission(ALL);

        for &(spec, permission, forward, backward) in PROPERTIES {
            table.add_properties(
                Specifier::parse(spec)?,
                WayProperties::new(permission, forward, backward),
                false,
            );
        }
        for &(spec, permission, forward, backward) in MIXINS {
            table.add_properties(
                Specifier::parse(spec)?,
                WayProperties::new(permission, forward, backward),
                true,
            );
        }
        for &(spec, note) in NOTES {
            table.add_note(Specifier::parse(spec)?, Template::new(note));
        }
        for &(spec, name) in NAMES {
            table.add_name(Specifier::parse(spec)?, Template::new(name));
        }
        for &spec in SLOPE_OVERRIDES {
            table.add_slope_override(Specifier::parse(spec)?, true);
        }

        Ok(table)
    }
}
