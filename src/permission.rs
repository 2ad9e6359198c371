use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::error::BuildError;

bitflags! {
    /// Travel modes allowed to traverse a way or edge.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Permission: u8 {
        const PEDESTRIAN = 0b001;
        const BICYCLE = 0b010;
        const CAR = 0b100;

        const PEDESTRIAN_AND_BICYCLE = Self::PEDESTRIAN.bits() | Self::BICYCLE.bits();
        const PEDESTRIAN_AND_CAR = Self::PEDESTRIAN.bits() | Self::CAR.bits();
        const BICYCLE_AND_CAR = Self::BICYCLE.bits() | Self::CAR.bits();
    }
}

impl Permission {
    pub const NONE: Permission = Permission::empty();
    pub const ALL: Permission = Permission::all();

    pub fn allows(&self, other: Permission) -> bool {
        self.contains(other)
    }

    pub fn is_none(&self) -> bool {
        self.is_empty()
    }

    pub fn add(self, other: Permission) -> Permission {
        self | other
    }

    pub fn remove_modes(self, other: Permission) -> Permission {
        self - other
    }
}

impl FromStr for Permission {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "NONE" => Ok(Permission::NONE),
            "ALL" => Ok(Permission::ALL),
            name => Permission::from_name(name)
                .ok_or_else(|| BuildError::UnknownPermission(name.to_string())),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        if *self == Permission::ALL {
            return f.write_str("ALL");
        }

        let names = [
            (Permission::PEDESTRIAN, "PEDESTRIAN"),
            (Permission::BICYCLE, "BICYCLE"),
            (Permission::CAR, "CAR"),
        ];
        let joined = names
            .iter()
            .filter(|(mode, _)| self.contains(*mode))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join("_AND_");
        f.write_str(&joined)
    }
}
