//! Resolution of access and oneway tags into per-direction permissions.

use log::warn;
use strum::{AsRefStr, Display, EnumString};

use crate::osm::Tags;
use crate::permission::Permission;

/// Values of `access` and per-mode access keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum AccessValue {
    Yes,
    No,
    /// Legal access restricted to licensed users
    License,
    Private,
    Permissive,
    Designated,
    Official,
    Customers,
    Destination,
    Agricultural,
    Forestry,
    Delivery,
    /// Must use a parallel way instead
    UseSidepath,
    /// Must dismount and walk
    Dismount,
}

impl AccessValue {
    fn of(tags: &Tags, key: &str) -> Option<AccessValue> {
        tags.get(key).and_then(|value| value.parse().ok())
    }

    pub fn denies(self) -> bool {
        matches!(self, AccessValue::No | AccessValue::License)
    }

    /// Only local traffic may pass.
    pub fn is_no_thru(self) -> bool {
        matches!(
            self,
            AccessValue::Destination
                | AccessValue::Private
                | AccessValue::Customers
                | AccessValue::Delivery
                | AccessValue::Forestry
                | AccessValue::Agricultural
        )
    }
}

fn denies_access(tags: &Tags, key: &str) -> bool {
    AccessValue::of(tags, key).is_some_and(AccessValue::denies)
}

fn is_under_construction(tags: &Tags) -> bool {
    tags.is("highway", "construction")
        || (!tags.has("highway") && tags.is("cycleway", "construction"))
}

pub fn is_no_thru_traffic(tags: &Tags) -> bool {
    AccessValue::of(tags, "access").is_some_and(AccessValue::is_no_thru)
}

/// Permissions for travel along and against a way's node order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionalPermission {
    pub forward: Permission,
    pub backward: Permission,
}

impl DirectionalPermission {
    pub fn both(permission: Permission) -> Self {
        DirectionalPermission {
            forward: permission,
            backward: permission,
        }
    }

    pub fn is_none(&self) -> bool {
        self.forward.is_none() && self.backward.is_none()
    }
}

/// Direction-free permission of any tagged entity: general access denial
/// with per-mode exceptions, then per-mode overrides, then construction.
pub fn entity_permission(tags: &Tags, base: Permission) -> Permission {
    let mut permission = if denies_access(tags, "access") {
        let mut granted = Permission::NONE;
        if tags.allows_access("motorcar") {
            granted = granted.add(Permission::CAR);
        }
        if tags.allows_access("bicycle") {
            granted = granted.add(Permission::BICYCLE);
        }
        if tags.allows_access("foot") {
            granted = granted.add(Permission::PEDESTRIAN);
        }
        granted
    } else {
        base
    };

    if denies_access(tags, "motorcar") {
        permission = permission.remove_modes(Permission::CAR);
    } else if tags.has("motorcar") {
        permission = permission.add(Permission::CAR);
    }

    if denies_access(tags, "bicycle") {
        permission = permission.remove_modes(Permission::BICYCLE);
    } else if tags.has("bicycle") {
        permission = permission.add(Permission::BICYCLE);
    }

    if denies_access(tags, "foot") {
        permission = permission.remove_modes(Permission::PEDESTRIAN);
    } else if tags.has("foot") {
        permission = permission.add(Permission::PEDESTRIAN);
    }

    if is_under_construction(tags) {
        permission = Permission::NONE;
    }

    permission
}

/// [`entity_permission`] plus the way-only foot, bicycle and dismount rules.
pub fn way_permission(way_id: i64, tags: &Tags, base: Permission) -> Permission {
    let mut permission = entity_permission(tags, base);
    if permission.is_none() {
        return permission;
    }

    if tags.allows_access("foot") {
        permission = permission.add(Permission::PEDESTRIAN);
    } else if denies_access(tags, "foot") || tags.is_false("foot") {
        permission = permission.remove_modes(Permission::PEDESTRIAN);
    }

    let force_bikes = tags.allows_access("bicycle");
    if force_bikes {
        permission = permission.add(Permission::BICYCLE);
    }

    if tags.is("cycleway", "dismount") || tags.is("bicycle", "dismount") {
        permission = permission.remove_modes(Permission::BICYCLE);
        if force_bikes {
            warn!("way {way_id} has conflicting bicycle tags, dismount wins");
        }
    }

    permission
}

fn is_oneway_forward(tags: &Tags) -> bool {
    tags.is_true("oneway") || tags.is("junction", "roundabout")
}

fn is_opposable_cycleway(tags: &Tags) -> bool {
    ["cycleway", "cycleway:left", "cycleway:right"]
        .iter()
        .filter_map(|key| tags.get(key))
        .any(|value| value.starts_with("opposite"))
}

/// Splits a symmetric permission by the oneway family of tags.
pub fn split_directions(tags: &Tags, permission: Permission) -> DirectionalPermission {
    let mut forward = permission;
    let mut backward = permission;

    if is_oneway_forward(tags) {
        backward = backward.remove_modes(Permission::BICYCLE_AND_CAR);
    }
    if tags.is("oneway", "-1") {
        forward = forward.remove_modes(Permission::BICYCLE_AND_CAR);
    }

    if tags.is_true("oneway:bicycle") || tags.is_false("bicycle:backwards") {
        backward = backward.remove_modes(Permission::BICYCLE);
    }
    if tags.is("oneway:bicycle", "-1") {
        forward = forward.remove_modes(Permission::BICYCLE);
    }
    if (tags.is_false("oneway:bicycle") || tags.is_true("bicycle:backwards"))
        && permission.allows(Permission::BICYCLE)
    {
        forward = forward.add(Permission::BICYCLE);
        backward = backward.add(Permission::BICYCLE);
    }

    if is_opposable_cycleway(tags) {
        backward = backward.add(Permission::BICYCLE);
    }

    DirectionalPermission { forward, backward }
}

/// Full resolution of a way's permissions, starting from `base`.
pub fn resolve(way_id: i64, tags: &Tags, base: Permission) -> DirectionalPermission {
    let symmetric = way_permission(way_id, tags, base);
    if symmetric.is_none() {
        return DirectionalPermission::both(Permission::NONE);
    }
    split_directions(tags, symmetric)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_access_no_then_bicycle_then_oneway() {
        let denied = resolve(1, &tags(&[("access", "no")]), Permission::ALL);
        assert_eq!(denied, DirectionalPermission::both(Permission::NONE));

        let bikes = resolve(
            1,
            &tags(&[("access", "no"), ("bicycle", "yes")]),
            Permission::ALL,
        );
        assert_eq!(bikes, DirectionalPermission::both(Permission::BICYCLE));

        let oneway = resolve(
            1,
            &tags(&[("access", "no"), ("bicycle", "yes"), ("oneway", "yes")]),
            Permission::ALL,
        );
        assert_eq!(oneway.forward, Permission::BICYCLE);
        assert_eq!(oneway.backward, Permission::NONE);
    }

    #[test]
    fn test_license_is_restrictive() {
        let p = entity_permission(
            &tags(&[("access", "license"), ("motorcar", "designated")]),
            Permission::ALL,
        );
        assert_eq!(p, Permission::CAR);
    }

    #[test]
    fn test_other_access_values_keep_base() {
        let p = entity_permission(&tags(&[("access", "destination")]), Permission::ALL);
        assert_eq!(p, Permission::ALL);
        assert!(is_no_thru_traffic(&tags(&[("access", "destination")])));
        assert!(!is_no_thru_traffic(&tags(&[("access", "yes")])));
    }

    #[test]
    fn test_mode_tags_override_base() {
        let p = entity_permission(
            &tags(&[("motorcar", "no"), ("foot", "something")]),
            Permission::BICYCLE_AND_CAR,
        );
        assert_eq!(p, Permission::PEDESTRIAN_AND_BICYCLE);

        // only no and license deny a mode
        let p = entity_permission(
            &tags(&[("bicycle", "use_sidepath")]),
            Permission::PEDESTRIAN_AND_CAR,
        );
        assert_eq!(p, Permission::ALL);
    }

    #[test]
    fn test_false_foot_removes_pedestrians() {
        for value in ["no", "false", "0"] {
            let p = resolve(
                1,
                &tags(&[("highway", "residential"), ("foot", value)]),
                Permission::ALL,
            );
            assert_eq!(p, DirectionalPermission::both(Permission::BICYCLE_AND_CAR), "foot={value}");
        }

        let p = resolve(1, &tags(&[("foot", "designated")]), Permission::BICYCLE_AND_CAR);
        assert_eq!(p, DirectionalPermission::both(Permission::ALL));
    }

    #[test]
    fn test_construction_forces_none() {
        let p = entity_permission(
            &tags(&[("highway", "construction"), ("foot", "yes")]),
            Permission::ALL,
        );
        assert!(p.is_none());

        let p = entity_permission(&tags(&[("cycleway", "construction")]), Permission::ALL);
        assert!(p.is_none());

        let p = entity_permission(
            &tags(&[("highway", "primary"), ("cycleway", "construction")]),
            Permission::ALL,
        );
        assert_eq!(p, Permission::ALL);
    }

    #[test_log::test]
    fn test_dismount_removes_bicycle() {
        let p = way_permission(
            7,
            &tags(&[("cycleway", "dismount"), ("bicycle", "yes")]),
            Permission::ALL,
        );
        assert_eq!(p, Permission::PEDESTRIAN_AND_CAR);
    }

    #[test]
    fn test_reverse_oneway() {
        let d = split_directions(&tags(&[("oneway", "-1")]), Permission::ALL);
        assert_eq!(d.forward, Permission::PEDESTRIAN);
        assert_eq!(d.backward, Permission::ALL);
    }

    #[test]
    fn test_roundabout_is_oneway() {
        let d = split_directions(&tags(&[("junction", "roundabout")]), Permission::ALL);
        assert_eq!(d.forward, Permission::ALL);
        assert_eq!(d.backward, Permission::PEDESTRIAN);
    }

    #[test]
    fn test_bicycle_oneway_overrides() {
        let d = split_directions(
            &tags(&[("oneway", "yes"), ("oneway:bicycle", "no")]),
            Permission::ALL,
        );
        assert_eq!(d.backward, Permission::PEDESTRIAN_AND_BICYCLE);

        let d = split_directions(&tags(&[("oneway:bicycle", "yes")]), Permission::ALL);
        assert_eq!(d.forward, Permission::ALL);
        assert_eq!(d.backward, Permission::PEDESTRIAN_AND_CAR);

        let d = split_directions(&tags(&[("oneway:bicycle", "-1")]), Permission::ALL);
        assert_eq!(d.forward, Permission::PEDESTRIAN_AND_CAR);
    }

    #[test]
    fn test_contraflow_cycleway() {
        let d = split_directions(
            &tags(&[("oneway", "yes"), ("cycleway:left", "opposite_lane")]),
            Permission::ALL,
        );
        assert_eq!(d.forward, Permission::ALL);
        assert_eq!(d.backward, Permission::PEDESTRIAN_AND_BICYCLE);
    }
}
