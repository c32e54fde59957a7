//! Entity records shared by the simulation and the snapshot wire format.
//!
//! Units (fighters, builders) live on the free 3D plane; buildings and
//! resource nodes sit on the integer grid. Capabilities are expressed as
//! traits: [`Movable`] for anything with a goal and a speed, [`Killable`]
//! for anything with clamped health.

use crate::catalog::{BuildingDef, UnitDef};
use crate::math::{GridLocation, Vector3};
use crate::EntityId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Knight,
    Builder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingKind {
    House,
    TownHall,
    Barracks,
    Mine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Gold,
    Stone,
    Wood,
}

impl std::fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BuildingKind::House => "house",
            BuildingKind::TownHall => "townhall",
            BuildingKind::Barracks => "barracks",
            BuildingKind::Mine => "mine",
        };
        f.write_str(name)
    }
}

/// An amount of each resource type. Used for stockpiles, costs, carried loads
/// and node contents alike.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Resources {
    pub gold: f64,
    pub stone: f64,
    pub wood: f64,
}

/// Price of a unit or building.
pub type Cost = Resources;

impl Resources {
    pub const ZERO: Resources = Resources::new(0.0, 0.0, 0.0);

    pub const fn new(gold: f64, stone: f64, wood: f64) -> Self {
        Self { gold, stone, wood }
    }

    /// A bundle holding `amount` of a single type.
    pub fn of(kind: ResourceKind, amount: f64) -> Self {
        let mut resources = Resources::ZERO;
        *resources.get_mut(kind) = amount;
        resources
    }

    pub fn total(&self) -> f64 {
        self.gold + self.stone + self.wood
    }

    pub fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Stone => self.stone,
            ResourceKind::Wood => self.wood,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Stone => &mut self.stone,
            ResourceKind::Wood => &mut self.wood,
        }
    }

    /// True when every component is at least the matching component of `cost`.
    pub fn covers(&self, cost: &Resources) -> bool {
        self.gold >= cost.gold && self.stone >= cost.stone && self.wood >= cost.wood
    }

    pub fn add(&mut self, other: &Resources) {
        self.gold += other.gold;
        self.stone += other.stone;
        self.wood += other.wood;
    }

    pub fn subtract(&mut self, other: &Resources) {
        self.gold -= other.gold;
        self.stone -= other.stone;
        self.wood -= other.wood;
    }
}

/// Clamps a proposed health value into `[0, max_health]`.
pub fn clamp_health(health: f64, max_health: f64) -> f64 {
    health.max(0.0).min(max_health)
}

pub trait Positioned {
    fn position(&self) -> Vector3;
}

/// Entities advanced toward a goal by the movement system.
pub trait Movable: Positioned {
    fn set_position(&mut self, position: Vector3);
    fn goal_position(&self) -> Vector3;
    fn set_goal_position(&mut self, goal: Vector3);
    fn speed(&self) -> f64;
    fn set_aggro(&mut self, aggro: bool);
}

/// Entities that can be damaged and swept when dead.
pub trait Killable: Positioned {
    fn health(&self) -> f64;
    fn max_health(&self) -> f64;
    /// Stores `health` clamped to `[0, max_health]`.
    fn set_health(&mut self, health: f64);

    fn is_dead(&self) -> bool {
        self.health() <= 0.0
    }

    fn apply_damage(&mut self, amount: f64) {
        self.set_health(self.health() - amount);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fighter {
    pub id: EntityId,
    pub unit_type: UnitKind,
    pub position: Vector3,
    pub goal_position: Vector3,
    pub target_entity_id: Option<EntityId>,
    pub aggro: bool,
    pub strength: f64,
    pub speed: f64,
    #[serde(rename = "timeTillNextAttack")]
    pub cooldown_remaining: f64,
    #[serde(rename = "areaOfAttack")]
    pub attack_range: f64,
    #[serde(rename = "attackSpeed")]
    pub attack_delay: f64,
    pub max_health: f64,
    health: f64,
}

impl Fighter {
    /// Creates a fighter standing still at `position` with the stats of `def`.
    pub fn spawn(id: EntityId, def: &UnitDef, position: Vector3) -> Self {
        Self {
            id,
            unit_type: def.kind,
            position,
            goal_position: position,
            target_entity_id: None,
            aggro: false,
            strength: def.stats.strength,
            speed: def.stats.speed,
            cooldown_remaining: 0.0,
            attack_range: def.stats.attack_range,
            attack_delay: def.stats.attack_delay,
            max_health: def.stats.max_health,
            health: def.stats.max_health,
        }
    }

    pub fn is_at_goal(&self) -> bool {
        self.position.distance(self.goal_position) == 0.0
    }
}

impl Positioned for Fighter {
    fn position(&self) -> Vector3 {
        self.position
    }
}

impl Movable for Fighter {
    fn set_position(&mut self, position: Vector3) {
        self.position = position;
    }

    fn goal_position(&self) -> Vector3 {
        self.goal_position
    }

    fn set_goal_position(&mut self, goal: Vector3) {
        self.goal_position = goal;
    }

    fn speed(&self) -> f64 {
        self.speed
    }

    fn set_aggro(&mut self, aggro: bool) {
        self.aggro = aggro;
    }
}

impl Killable for Fighter {
    fn health(&self) -> f64 {
        self.health
    }

    fn max_health(&self) -> f64 {
        self.max_health
    }

    fn set_health(&mut self, health: f64) {
        self.health = clamp_health(health, self.max_health);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Builder {
    pub id: EntityId,
    pub unit_type: UnitKind,
    pub position: Vector3,
    pub goal_position: Vector3,
    pub carried: Resources,
    pub aggro: bool,
    pub speed: f64,
    pub carrying_capacity: f64,
    pub reach: f64,
    pub mine_rate: f64,
    /// Resource node the builder is currently heading for or mining.
    pub resource_target: Option<EntityId>,
    pub max_health: f64,
    health: f64,
}

impl Builder {
    pub fn spawn(id: EntityId, def: &UnitDef, position: Vector3) -> Self {
        Self {
            id,
            unit_type: def.kind,
            position,
            goal_position: position,
            carried: Resources::ZERO,
            aggro: false,
            speed: def.stats.speed,
            carrying_capacity: def.stats.carrying_capacity,
            reach: def.stats.reach,
            mine_rate: def.stats.mine_rate,
            resource_target: None,
            max_health: def.stats.max_health,
            health: def.stats.max_health,
        }
    }

    pub fn carried_total(&self) -> f64 {
        self.carried.total()
    }

    pub fn is_full(&self) -> bool {
        self.carried_total() >= self.carrying_capacity
    }

    /// Room left before the builder reaches its carrying capacity.
    pub fn free_capacity(&self) -> f64 {
        (self.carrying_capacity - self.carried_total()).max(0.0)
    }

    /// Empties the builder's load, returning what it carried.
    pub fn unload(&mut self) -> Resources {
        std::mem::take(&mut self.carried)
    }
}

impl Positioned for Builder {
    fn position(&self) -> Vector3 {
        self.position
    }
}

impl Movable for Builder {
    fn set_position(&mut self, position: Vector3) {
        self.position = position;
    }

    fn goal_position(&self) -> Vector3 {
        self.goal_position
    }

    fn set_goal_position(&mut self, goal: Vector3) {
        self.goal_position = goal;
    }

    fn speed(&self) -> f64 {
        self.speed
    }

    fn set_aggro(&mut self, aggro: bool) {
        self.aggro = aggro;
    }
}

impl Killable for Builder {
    fn health(&self) -> f64 {
        self.health
    }

    fn max_health(&self) -> f64 {
        self.max_health
    }

    fn set_health(&mut self, health: f64) {
        self.health = clamp_health(health, self.max_health);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub id: EntityId,
    pub building_type: BuildingKind,
    pub position: GridLocation,
    pub cost: Cost,
    pub max_health: f64,
    health: f64,
    /// Construction progress in `[0, 1]`.
    pub progress: f64,
    /// Seconds until the building may produce again.
    pub cooldown: f64,
    pub max_cooldown: f64,
}

impl Building {
    /// A completed building of the given definition, ready to produce.
    pub fn new(id: EntityId, def: &BuildingDef, position: GridLocation) -> Self {
        Self {
            id,
            building_type: def.kind,
            position,
            cost: def.cost,
            max_health: def.max_health,
            health: def.max_health,
            progress: 1.0,
            cooldown: 0.0,
            max_cooldown: def.max_cooldown,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown <= 0.0
    }
}

impl Positioned for Building {
    fn position(&self) -> Vector3 {
        self.position.to_vector3()
    }
}

impl Killable for Building {
    fn health(&self) -> f64 {
        self.health
    }

    fn max_health(&self) -> f64 {
        self.max_health
    }

    fn set_health(&mut self, health: f64) {
        self.health = clamp_health(health, self.max_health);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNode {
    pub id: EntityId,
    pub resource_type: ResourceKind,
    pub position: GridLocation,
    /// Only the component matching `resource_type` is ever non-zero.
    pub remaining: Resources,
}

impl ResourceNode {
    pub fn new(id: EntityId, kind: ResourceKind, position: GridLocation, amount: f64) -> Self {
        Self {
            id,
            resource_type: kind,
            position,
            remaining: Resources::of(kind, amount.max(0.0)),
        }
    }

    pub fn total_remaining(&self) -> f64 {
        self.remaining.total()
    }
}

impl Positioned for ResourceNode {
    fn position(&self) -> Vector3 {
        self.position.to_vector3()
    }
}
