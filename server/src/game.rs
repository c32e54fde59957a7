//! Authoritative world state and the per-tick simulation pass.

use crate::combat;
use crate::economy;
use crate::error::{GameError, GameResult};
use crate::movement;
use crate::registry::EntityRegistry;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::catalog::{BuildingDef, UnitDef, TOWN_HALL};
use shared::{
    Builder, Building, BuildingKind, Cost, EntityId, Fighter, GameSnapshot, GridLocation,
    Killable, PlayerId, PlayerSnapshot, Positioned, ResourceKind, ResourceNode, Resources,
    Vector3, AGGRO_RADIUS, DEPLETION_THRESHOLD, GOLD_NODE_AMOUNT, MAP_HALF_EXTENT,
    SPAWN_JITTER, STONE_NODE_AMOUNT, TOWN_HALL_SPACING, WOOD_NODE_AMOUNT,
};
use std::collections::{BTreeMap, HashSet};

/// Settings for a new game instance.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub players: u32,
    pub resource_nodes: usize,
    pub map_half_extent: i32,
    pub starting_stockpile: Resources,
    /// Fixed seed for world generation and spawn jitter; random when `None`.
    pub seed: Option<u64>,
    pub allow_cheats: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            players: 2,
            resource_nodes: 100,
            map_half_extent: MAP_HALF_EXTENT,
            starting_stockpile: Resources::new(200.0, 100.0, 100.0),
            seed: None,
            allow_cheats: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub stockpile: Resources,
    /// Town hall builders deposit at and units spawn from.
    pub primary_town_hall: Option<EntityId>,
    pub fighters: BTreeMap<EntityId, Fighter>,
    pub builders: BTreeMap<EntityId, Builder>,
    pub buildings: BTreeMap<EntityId, Building>,
}

impl Player {
    pub fn new(id: PlayerId, stockpile: Resources) -> Self {
        Self {
            id,
            stockpile,
            primary_town_hall: None,
            fighters: BTreeMap::new(),
            builders: BTreeMap::new(),
            buildings: BTreeMap::new(),
        }
    }

    pub fn can_afford(&self, cost: &Cost) -> bool {
        self.stockpile.covers(cost)
    }

    /// Deducts `cost` in full, or nothing at all.
    pub fn pay(&mut self, cost: &Cost) -> GameResult<()> {
        if !self.can_afford(cost) {
            return Err(GameError::InsufficientResources {
                required: *cost,
                available: self.stockpile,
            });
        }
        self.stockpile.subtract(cost);
        Ok(())
    }

    pub fn town_hall_position(&self) -> Option<Vector3> {
        self.primary_town_hall
            .and_then(|id| self.buildings.get(&id))
            .map(|hall| hall.position())
    }

    fn rebind_town_hall(&mut self) {
        self.primary_town_hall = self
            .buildings
            .values()
            .find(|b| b.building_type == BuildingKind::TownHall)
            .map(|b| b.id);
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            gold: self.stockpile.gold,
            stone: self.stockpile.stone,
            wood: self.stockpile.wood,
            fighters: self.fighters.clone(),
            builders: self.builders.clone(),
            buildings: self.buildings.clone(),
        }
    }
}

/// One running game: players, world resources and the id registry.
///
/// All maps are ordered by id, which fixes the iteration order of every
/// simulation pass and makes ticks deterministic for a given seed.
#[derive(Debug)]
pub struct Game {
    pub elapsed_time: f64,
    /// Ids removed by the most recent death sweep.
    pub deceased: Vec<EntityId>,
    pub players: BTreeMap<PlayerId, Player>,
    pub resources: BTreeMap<EntityId, ResourceNode>,
    pub allow_cheats: bool,
    registry: EntityRegistry,
    rng: StdRng,
}

impl Game {
    /// Creates players `1..=config.players`, each with a starting town hall,
    /// and scatters the configured number of resource nodes.
    pub fn new(config: &GameConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut game = Self {
            elapsed_time: 0.0,
            deceased: Vec::new(),
            players: BTreeMap::new(),
            resources: BTreeMap::new(),
            allow_cheats: config.allow_cheats,
            registry: EntityRegistry::new(),
            rng,
        };

        for index in 0..config.players {
            let location = GridLocation::new(index as i32 * TOWN_HALL_SPACING, 0);
            game.add_player(index + 1, location, config.starting_stockpile);
        }
        game.add_resources(config.resource_nodes, config.map_half_extent);

        info!(
            "Created game with {} players and {} resource nodes",
            game.players.len(),
            game.resources.len()
        );
        game
    }

    /// Adds a player with a free starting town hall at `town_hall`.
    pub fn add_player(
        &mut self,
        id: PlayerId,
        town_hall: GridLocation,
        stockpile: Resources,
    ) -> EntityId {
        let hall_id = self.registry.allocate();
        let mut hall = Building::new(hall_id, &TOWN_HALL, town_hall);
        hall.cost = Cost::ZERO;

        let mut player = Player::new(id, stockpile);
        player.buildings.insert(hall_id, hall);
        player.primary_town_hall = Some(hall_id);
        self.players.insert(id, player);
        hall_id
    }

    /// Places up to `count` nodes on distinct free tiles in
    /// `[-half_extent, half_extent)` on both axes.
    pub fn add_resources(&mut self, count: usize, half_extent: i32) {
        if half_extent <= 0 {
            return;
        }
        let in_bounds = |tile: &GridLocation| {
            (-half_extent..half_extent).contains(&tile.x)
                && (-half_extent..half_extent).contains(&tile.z)
        };
        let mut taken: HashSet<GridLocation> =
            self.occupied_tiles().into_iter().filter(in_bounds).collect();
        let area = (2 * half_extent as usize).pow(2);

        for _ in 0..count {
            if taken.len() >= area {
                break;
            }
            let location = loop {
                let candidate = GridLocation::new(
                    self.rng.gen_range(-half_extent..half_extent),
                    self.rng.gen_range(-half_extent..half_extent),
                );
                if !taken.contains(&candidate) {
                    break candidate;
                }
            };
            taken.insert(location);

            let roll: f64 = self.rng.gen();
            let (kind, amount) = if roll < 0.3 {
                (ResourceKind::Gold, GOLD_NODE_AMOUNT)
            } else if roll < 0.6 {
                (ResourceKind::Stone, STONE_NODE_AMOUNT)
            } else {
                (ResourceKind::Wood, WOOD_NODE_AMOUNT)
            };
            self.add_resource_node(kind, location, amount);
        }
    }

    pub fn add_resource_node(
        &mut self,
        kind: ResourceKind,
        location: GridLocation,
        amount: f64,
    ) -> EntityId {
        let id = self.registry.allocate();
        self.resources
            .insert(id, ResourceNode::new(id, kind, location, amount));
        id
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn insert_fighter(
        &mut self,
        owner: PlayerId,
        def: &UnitDef,
        position: Vector3,
    ) -> GameResult<EntityId> {
        if !self.players.contains_key(&owner) {
            return Err(GameError::Validation(format!("unknown player {}", owner)));
        }
        let id = self.registry.allocate();
        let fighter = Fighter::spawn(id, def, position);
        if let Some(player) = self.players.get_mut(&owner) {
            player.fighters.insert(id, fighter);
        }
        Ok(id)
    }

    pub fn insert_builder(
        &mut self,
        owner: PlayerId,
        def: &UnitDef,
        position: Vector3,
    ) -> GameResult<EntityId> {
        if !self.players.contains_key(&owner) {
            return Err(GameError::Validation(format!("unknown player {}", owner)));
        }
        let id = self.registry.allocate();
        let builder = Builder::spawn(id, def, position);
        if let Some(player) = self.players.get_mut(&owner) {
            player.builders.insert(id, builder);
        }
        Ok(id)
    }

    /// Adds a building without charging for it. A town hall becomes primary
    /// when the owner has none.
    pub fn insert_building(
        &mut self,
        owner: PlayerId,
        def: &BuildingDef,
        location: GridLocation,
    ) -> GameResult<EntityId> {
        if !self.players.contains_key(&owner) {
            return Err(GameError::Validation(format!("unknown player {}", owner)));
        }
        let id = self.registry.allocate();
        let building = Building::new(id, def, location);
        if let Some(player) = self.players.get_mut(&owner) {
            player.buildings.insert(id, building);
            if def.kind == BuildingKind::TownHall && player.primary_town_hall.is_none() {
                player.primary_town_hall = Some(id);
            }
        }
        Ok(id)
    }

    /// Position near `center` offset by up to [`SPAWN_JITTER`] on X and Z.
    pub fn jitter_around(&mut self, center: Vector3) -> Vector3 {
        let dx = self.rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER);
        let dz = self.rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER);
        center.add(Vector3::new(dx, 0.0, dz))
    }

    /// Mutable access to a killable entity not owned by `exclude`.
    pub fn killable_mut(
        &mut self,
        id: EntityId,
        exclude: PlayerId,
    ) -> Option<&mut dyn Killable> {
        for player in self.players.values_mut() {
            if player.id == exclude {
                continue;
            }
            if let Some(fighter) = player.fighters.get_mut(&id) {
                return Some(fighter);
            }
            if let Some(builder) = player.builders.get_mut(&id) {
                return Some(builder);
            }
            if let Some(building) = player.buildings.get_mut(&id) {
                return Some(building);
            }
        }
        None
    }

    pub fn killable(&self, id: EntityId) -> Option<&dyn Killable> {
        for player in self.players.values() {
            if let Some(fighter) = player.fighters.get(&id) {
                return Some(fighter);
            }
            if let Some(builder) = player.builders.get(&id) {
                return Some(builder);
            }
            if let Some(building) = player.buildings.get(&id) {
                return Some(building);
            }
        }
        None
    }

    /// Nearest living enemy of `owner` within [`AGGRO_RADIUS`] of `from`.
    ///
    /// Players are scanned in id order and within a player fighters, then
    /// builders, then buildings, each by id; the first of equally near
    /// candidates wins.
    pub fn nearest_enemy(&self, owner: PlayerId, from: Vector3) -> Option<EntityId> {
        let mut closest: Option<(EntityId, f64)> = None;
        let mut consider = |id: EntityId, target: &dyn Killable| {
            if target.is_dead() {
                return;
            }
            let distance = target.position().distance(from);
            if distance > AGGRO_RADIUS {
                return;
            }
            if closest.map_or(true, |(_, best)| distance < best) {
                closest = Some((id, distance));
            }
        };

        for player in self.players.values().filter(|p| p.id != owner) {
            for (id, fighter) in &player.fighters {
                consider(*id, fighter);
            }
            for (id, builder) in &player.builders {
                consider(*id, builder);
            }
            for (id, building) in &player.buildings {
                consider(*id, building);
            }
        }
        closest.map(|(id, _)| id)
    }

    /// Nearest node with anything left, measured to its ground position.
    pub fn nearest_resource(&self, from: Vector3) -> Option<(EntityId, Vector3)> {
        let mut closest: Option<(EntityId, Vector3, f64)> = None;
        for (id, node) in &self.resources {
            if node.total_remaining() <= 0.0 {
                continue;
            }
            let position = node.position();
            let distance = position.distance(from);
            if closest.map_or(true, |(_, _, best)| distance < best) {
                closest = Some((*id, position, distance));
            }
        }
        closest.map(|(id, position, _)| (id, position))
    }

    pub fn town_hall_position(&self, owner: PlayerId) -> Option<Vector3> {
        self.players.get(&owner).and_then(Player::town_hall_position)
    }

    pub fn tile_occupied(&self, location: GridLocation) -> bool {
        self.resources.values().any(|node| node.position == location)
            || self
                .players
                .values()
                .flat_map(|p| p.buildings.values())
                .any(|b| b.position == location)
    }

    fn occupied_tiles(&self) -> HashSet<GridLocation> {
        self.resources
            .values()
            .map(|node| node.position)
            .chain(
                self.players
                    .values()
                    .flat_map(|p| p.buildings.values())
                    .map(|b| b.position),
            )
            .collect()
    }

    /// Removes `id` from every collection and frees it in the registry.
    /// Unknown ids are ignored.
    pub fn delete_entity(&mut self, id: EntityId) {
        self.registry.release(id);
        for player in self.players.values_mut() {
            player.fighters.remove(&id);
            player.builders.remove(&id);
            if player.buildings.remove(&id).is_some() && player.primary_town_hall == Some(id) {
                player.rebind_town_hall();
                info!(
                    "Player {} lost its primary town hall; now {:?}",
                    player.id, player.primary_town_hall
                );
            }
        }
        self.resources.remove(&id);
    }

    /// Advances the world by `dt` seconds.
    ///
    /// For each player: movement then combat for every fighter, movement then
    /// economy for every builder. Afterwards building cooldowns decay and the
    /// death sweep runs.
    pub fn update(&mut self, dt: f64) {
        self.elapsed_time += dt;

        let player_ids: Vec<PlayerId> = self.players.keys().copied().collect();
        for player_id in player_ids {
            self.update_fighters(player_id, dt);
            self.update_builders(player_id, dt);
        }

        self.decay_cooldowns(dt);
        self.sweep_deceased();
    }

    fn update_fighters(&mut self, owner: PlayerId, dt: f64) {
        let ids: Vec<EntityId> = match self.players.get(&owner) {
            Some(player) => player.fighters.keys().copied().collect(),
            None => return,
        };

        for id in ids {
            // Work on a copy so combat can borrow the rest of the world mutably.
            let Some(mut fighter) = self
                .players
                .get(&owner)
                .and_then(|p| p.fighters.get(&id))
                .cloned()
            else {
                continue;
            };

            movement::advance(&mut fighter, dt);
            combat::update_fighter(self, owner, &mut fighter, dt);

            if let Some(slot) = self
                .players
                .get_mut(&owner)
                .and_then(|p| p.fighters.get_mut(&id))
            {
                *slot = fighter;
            }
        }
    }

    fn update_builders(&mut self, owner: PlayerId, dt: f64) {
        let ids: Vec<EntityId> = match self.players.get(&owner) {
            Some(player) => player.builders.keys().copied().collect(),
            None => return,
        };

        for id in ids {
            let Some(mut builder) = self
                .players
                .get(&owner)
                .and_then(|p| p.builders.get(&id))
                .cloned()
            else {
                continue;
            };

            movement::advance(&mut builder, dt);
            economy::update_builder(self, owner, &mut builder, dt);

            if let Some(slot) = self
                .players
                .get_mut(&owner)
                .and_then(|p| p.builders.get_mut(&id))
            {
                *slot = builder;
            }
        }
    }

    fn decay_cooldowns(&mut self, dt: f64) {
        for building in self
            .players
            .values_mut()
            .flat_map(|p| p.buildings.values_mut())
        {
            building.cooldown = (building.cooldown - dt).max(0.0);
        }
    }

    /// Collects dead units and buildings plus exhausted nodes, releases them,
    /// and replaces the deceased list with this tick's removals.
    fn sweep_deceased(&mut self) {
        let mut deceased = Vec::new();
        for player in self.players.values() {
            deceased.extend(
                player
                    .fighters
                    .values()
                    .filter(|f| f.is_dead())
                    .map(|f| f.id),
            );
            deceased.extend(
                player
                    .builders
                    .values()
                    .filter(|b| b.is_dead())
                    .map(|b| b.id),
            );
            deceased.extend(
                player
                    .buildings
                    .values()
                    .filter(|b| b.is_dead())
                    .map(|b| b.id),
            );
        }
        deceased.extend(
            self.resources
                .values()
                .filter(|node| node.total_remaining() <= DEPLETION_THRESHOLD)
                .map(|node| node.id),
        );

        for id in &deceased {
            debug!("Entity {} removed at t={:.2}", id, self.elapsed_time);
            self.delete_entity(*id);
        }
        self.deceased = deceased;
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            elapsed_time: self.elapsed_time,
            deceased: self.deceased.clone(),
            players: self
                .players
                .iter()
                .map(|(id, player)| (*id, player.snapshot()))
                .collect(),
            resources: self.resources.clone(),
        }
    }
}
