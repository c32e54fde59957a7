//! Data-driven unit and building definitions.
//!
//! Every spawnable or placeable kind is described by one table entry; the
//! simulation reads costs, stats and production rules from here instead of
//! hard-coding them per kind.

use crate::entities::{BuildingKind, Resources, UnitKind};

/// Which entity record a unit kind is instantiated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRole {
    Fighter,
    Builder,
}

/// Per-unit tuning. Fields that do not apply to a role are zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitStats {
    pub max_health: f64,
    pub speed: f64,
    pub strength: f64,
    pub attack_range: f64,
    pub attack_delay: f64,
    pub carrying_capacity: f64,
    pub reach: f64,
    pub mine_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    pub kind: UnitKind,
    pub role: UnitRole,
    pub cost: Resources,
    /// Building kind whose cooldown throttles production of this unit.
    pub produced_by: BuildingKind,
    pub stats: UnitStats,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildingDef {
    pub kind: BuildingKind,
    pub cost: Resources,
    pub max_health: f64,
    pub max_cooldown: f64,
    /// Whether `placeBuilding` may create this kind.
    pub placeable: bool,
}

pub static KNIGHT: UnitDef = UnitDef {
    kind: UnitKind::Knight,
    role: UnitRole::Fighter,
    cost: Resources::new(50.0, 0.0, 20.0),
    produced_by: BuildingKind::Barracks,
    stats: UnitStats {
        max_health: 100.0,
        speed: 1.0,
        strength: 10.0,
        attack_range: 1.0,
        attack_delay: 1.0,
        carrying_capacity: 0.0,
        reach: 0.0,
        mine_rate: 0.0,
    },
};

pub static BUILDER: UnitDef = UnitDef {
    kind: UnitKind::Builder,
    role: UnitRole::Builder,
    cost: Resources::new(50.0, 0.0, 0.0),
    produced_by: BuildingKind::TownHall,
    stats: UnitStats {
        max_health: 100.0,
        speed: 1.0,
        strength: 0.0,
        attack_range: 0.0,
        attack_delay: 0.0,
        carrying_capacity: 20.0,
        reach: 0.5,
        mine_rate: 1.0,
    },
};

pub static HOUSE: BuildingDef = BuildingDef {
    kind: BuildingKind::House,
    cost: Resources::new(100.0, 0.0, 50.0),
    max_health: 500.0,
    max_cooldown: 10.0,
    placeable: true,
};

pub static TOWN_HALL: BuildingDef = BuildingDef {
    kind: BuildingKind::TownHall,
    cost: Resources::new(500.0, 400.0, 200.0),
    max_health: 1000.0,
    max_cooldown: 5.0,
    placeable: true,
};

pub static BARRACKS: BuildingDef = BuildingDef {
    kind: BuildingKind::Barracks,
    cost: Resources::new(100.0, 100.0, 50.0),
    max_health: 500.0,
    max_cooldown: 10.0,
    placeable: true,
};

pub static MINE: BuildingDef = BuildingDef {
    kind: BuildingKind::Mine,
    cost: Resources::new(150.0, 50.0, 50.0),
    max_health: 500.0,
    max_cooldown: 0.0,
    placeable: false,
};

pub fn unit_def(kind: UnitKind) -> &'static UnitDef {
    match kind {
        UnitKind::Knight => &KNIGHT,
        UnitKind::Builder => &BUILDER,
    }
}

pub fn building_def(kind: BuildingKind) -> &'static BuildingDef {
    match kind {
        BuildingKind::House => &HOUSE,
        BuildingKind::TownHall => &TOWN_HALL,
        BuildingKind::Barracks => &BARRACKS,
        BuildingKind::Mine => &MINE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_matches_kind() {
        for kind in [UnitKind::Knight, UnitKind::Builder] {
            assert_eq!(unit_def(kind).kind, kind);
        }
        for kind in [
            BuildingKind::House,
            BuildingKind::TownHall,
            BuildingKind::Barracks,
            BuildingKind::Mine,
        ] {
            assert_eq!(building_def(kind).kind, kind);
        }
    }

    #[test]
    fn test_town_hall_cost() {
        assert_eq!(TOWN_HALL.cost, Resources::new(500.0, 400.0, 200.0));
    }

    #[test]
    fn test_producers() {
        assert_eq!(KNIGHT.produced_by, BuildingKind::Barracks);
        assert_eq!(KNIGHT.role, UnitRole::Fighter);
        assert_eq!(BUILDER.produced_by, BuildingKind::TownHall);
        assert_eq!(BUILDER.role, UnitRole::Builder);
        assert!(!MINE.placeable);
    }
}
