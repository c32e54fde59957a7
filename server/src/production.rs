//! Building placement and unit production, driven by the catalog.

use crate::error::{GameError, GameResult};
use crate::game::Game;
use log::info;
use shared::catalog::{building_def, unit_def, UnitRole};
use shared::{Building, BuildingKind, EntityId, GridLocation, PlayerId, Positioned, UnitKind};

/// Pays for and places a building of `kind` on an empty tile.
pub fn place_building(
    game: &mut Game,
    owner: PlayerId,
    kind: BuildingKind,
    location: GridLocation,
) -> GameResult<EntityId> {
    let def = building_def(kind);
    if !def.placeable {
        return Err(GameError::Validation(format!("{} cannot be placed", kind)));
    }
    if game.tile_occupied(location) {
        return Err(GameError::Validation(format!(
            "tile ({}, {}) is occupied",
            location.x, location.z
        )));
    }

    game.player_mut(owner)
        .ok_or_else(|| GameError::Validation(format!("unknown player {}", owner)))?
        .pay(&def.cost)?;

    let id = game.insert_building(owner, def, location)?;
    info!(
        "Player {} placed {} {} at ({}, {})",
        owner, kind, id, location.x, location.z
    );
    Ok(id)
}

/// Trains a unit of `kind` and places it next to the owner's primary town
/// hall.
///
/// The producer is the primary town hall when it is the right kind and
/// ready, otherwise the lowest-id ready building of that kind. Its cooldown
/// is reset to the maximum on success. A player who has lost every town hall
/// gets the unit at the producer instead. Nothing changes when the building
/// is missing, cooling down, or the player cannot pay.
pub fn spawn_unit(game: &mut Game, owner: PlayerId, kind: UnitKind) -> GameResult<EntityId> {
    let def = unit_def(kind);
    let player = game
        .player_mut(owner)
        .ok_or_else(|| GameError::Validation(format!("unknown player {}", owner)))?;

    let primary = player.primary_town_hall;
    let mut producers: Vec<&Building> = player
        .buildings
        .values()
        .filter(|b| b.building_type == def.produced_by)
        .collect();
    if producers.is_empty() {
        return Err(GameError::MissingBuilding(def.produced_by));
    }
    producers.sort_by_key(|b| Some(b.id) != primary);

    let Some(producer_id) = producers.iter().find(|b| b.is_ready()).map(|b| b.id) else {
        let soonest = producers
            .iter()
            .min_by(|a, b| a.cooldown.total_cmp(&b.cooldown))
            .map_or((0, 0.0), |b| (b.id, b.cooldown));
        return Err(GameError::CooldownActive {
            building: soonest.0,
            remaining: soonest.1,
        });
    };

    player.pay(&def.cost)?;

    let town_hall = player.town_hall_position();
    let Some(producer) = player.buildings.get_mut(&producer_id) else {
        return Err(GameError::EntityNotFound(producer_id));
    };
    producer.cooldown = producer.max_cooldown;
    let origin = town_hall.unwrap_or_else(|| producer.position());

    let position = game.jitter_around(origin);
    let id = match def.role {
        UnitRole::Fighter => game.insert_fighter(owner, def, position)?,
        UnitRole::Builder => game.insert_builder(owner, def, position)?,
    };
    info!(
        "Player {} trained {:?} {} at building {}",
        owner, kind, id, producer_id
    );
    Ok(id)
}
