//! Types shared between the game server and its clients: geometry, entity
//! records, the unit/building catalog and the wire protocol.

pub mod catalog;
pub mod entities;
pub mod math;
pub mod protocol;

pub use catalog::{building_def, unit_def, BuildingDef, UnitDef, UnitRole, UnitStats};
pub use entities::{
    clamp_health, Builder, Building, BuildingKind, Cost, Fighter, Killable, Movable, Positioned,
    ResourceKind, ResourceNode, Resources, UnitKind,
};
pub use math::{GridLocation, Vector3};
pub use protocol::{
    parse_client_frame, Command, CommandRequest, CommandResponse, GameSnapshot, PlayerSnapshot,
    ProtocolError, ServerMessage,
};

/// Globally unique across every entity kind and player in a game.
pub type EntityId = u32;
/// Player slot, numbered from 1.
pub type PlayerId = u32;

/// Maximum distance at which an idle or aggressive fighter acquires a target.
pub const AGGRO_RADIUS: f64 = 10.0;
/// Resource amounts at or below this are treated as exhausted.
pub const DEPLETION_THRESHOLD: f64 = 1.0;
/// Fighters walk toward `target - (offset, offset, offset)` when out of range.
pub const APPROACH_OFFSET: f64 = 0.5;
/// Units spawn within this distance of their spawn point on X and Z.
pub const SPAWN_JITTER: f64 = 1.0;
/// Resource nodes are scattered in `[-MAP_HALF_EXTENT, MAP_HALF_EXTENT)` on both axes.
pub const MAP_HALF_EXTENT: i32 = 100;
/// Grid distance between consecutive players' starting town halls.
pub const TOWN_HALL_SPACING: i32 = 20;
/// Starting amounts of each resource node type.
pub const GOLD_NODE_AMOUNT: f64 = 300.0;
pub const STONE_NODE_AMOUNT: f64 = 300.0;
pub const WOOD_NODE_AMOUNT: f64 = 100.0;
