//! Player command dispatch.
//!
//! Requests arrive as loosely typed `{operation, args}` pairs. They are
//! validated into a [`Command`], applied to the game on the tick loop, and
//! answered with a [`CommandOutcome`] for the submitting client.

use crate::error::{GameError, GameResult};
use crate::game::Game;
use crate::production;
use log::{debug, info, warn};
use shared::{
    Command, CommandRequest, CommandResponse, EntityId, Movable, PlayerId, UnitKind, Vector3,
};

/// Result of one serviced command as reported to the submitter.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
}

impl CommandOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(error: &GameError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
        }
    }

    pub fn into_response(self, operation: impl Into<String>) -> CommandResponse {
        CommandResponse {
            operation: operation.into(),
            success: self.success,
            message: self.message,
        }
    }
}

/// Validates and applies `request` on behalf of `player`. Never panics and
/// never fails the caller; errors become an unsuccessful outcome.
pub fn execute(game: &mut Game, player: PlayerId, request: &CommandRequest) -> CommandOutcome {
    let result = Command::from_request(request)
        .map_err(GameError::from)
        .and_then(|command| apply(game, player, &command));

    match result {
        Ok(message) => {
            debug!(
                "Player {} {}: {}",
                player, request.operation, message
            );
            CommandOutcome::ok(message)
        }
        Err(err) => {
            match err {
                GameError::Validation(_) => warn!(
                    "Player {} {} rejected: {}",
                    player, request.operation, err
                ),
                _ => debug!(
                    "Player {} {} refused: {}",
                    player, request.operation, err
                ),
            }
            CommandOutcome::failed(&err)
        }
    }
}

pub fn apply(game: &mut Game, player: PlayerId, command: &Command) -> GameResult<String> {
    if game.player(player).is_none() {
        return Err(GameError::Validation(format!("unknown player {}", player)));
    }

    match command {
        Command::MoveUnit { id, goal, aggro } => {
            move_unit(game, player, *id, *goal, *aggro)?;
            Ok(format!("unit {} moving", id))
        }
        Command::PlaceBuilding { kind, position } => {
            let id = production::place_building(game, player, *kind, *position)?;
            Ok(format!("placed {} {}", kind, id))
        }
        Command::CreateKnight => {
            let id = production::spawn_unit(game, player, UnitKind::Knight)?;
            Ok(format!("created knight {}", id))
        }
        Command::CreateBuilder => {
            let id = production::spawn_unit(game, player, UnitKind::Builder)?;
            Ok(format!("created builder {}", id))
        }
        Command::Attack { attacker, target } => {
            info!(
                "Player {} requested attack {:?} -> {:?}",
                player, attacker, target
            );
            Ok("attack acknowledged".to_string())
        }
        Command::GrantResources(amount) => {
            if !game.allow_cheats {
                return Err(GameError::Validation("cheats are disabled".to_string()));
            }
            let owner = game
                .player_mut(player)
                .ok_or_else(|| GameError::Validation(format!("unknown player {}", player)))?;
            owner.stockpile.add(amount);
            Ok(format!("granted {:?}", amount))
        }
    }
}

/// Retargets one of `player`'s own units. Passive moves drop any current
/// fighter target.
fn move_unit(
    game: &mut Game,
    player: PlayerId,
    id: EntityId,
    goal: Vector3,
    aggro: bool,
) -> GameResult<()> {
    let owner = game
        .player_mut(player)
        .ok_or_else(|| GameError::Validation(format!("unknown player {}", player)))?;

    if let Some(fighter) = owner.fighters.get_mut(&id) {
        if !aggro {
            fighter.target_entity_id = None;
        }
        steer(fighter, goal, aggro);
    } else if let Some(builder) = owner.builders.get_mut(&id) {
        steer(builder, goal, aggro);
    } else {
        return Err(GameError::EntityNotFound(id));
    }
    Ok(())
}

fn steer(unit: &mut dyn Movable, goal: Vector3, aggro: bool) {
    unit.set_goal_position(goal);
    unit.set_aggro(aggro);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameConfig;
    use serde_json::json;
    use shared::catalog::{BUILDER, KNIGHT};
    use shared::Resources;

    fn test_game(allow_cheats: bool) -> Game {
        Game::new(&GameConfig {
            resource_nodes: 0,
            seed: Some(2),
            allow_cheats,
            ..GameConfig::default()
        })
    }

    fn request(operation: &str, args: serde_json::Value) -> CommandRequest {
        CommandRequest::new(operation, args)
    }

    #[test]
    fn test_move_unit_sets_goal_and_aggro() {
        let mut game = test_game(false);
        let knight = game.insert_fighter(1, &KNIGHT, Vector3::ZERO).unwrap();

        let outcome = execute(
            &mut game,
            1,
            &request(
                "moveUnit",
                json!({"id": knight, "type": "aggressive", "pos": {"x": 5.0, "y": 0.0, "z": -2.0}}),
            ),
        );
        assert!(outcome.success, "{}", outcome.message);

        let fighter = &game.player(1).unwrap().fighters[&knight];
        assert_eq!(fighter.goal_position, Vector3::new(5.0, 0.0, -2.0));
        assert!(fighter.aggro);
    }

    #[test]
    fn test_passive_move_clears_target() {
        let mut game = test_game(false);
        let knight = game.insert_fighter(1, &KNIGHT, Vector3::ZERO).unwrap();
        {
            let fighter = game.player_mut(1).unwrap().fighters.get_mut(&knight).unwrap();
            fighter.target_entity_id = Some(77);
            fighter.aggro = true;
        }

        let command = Command::MoveUnit {
            id: knight,
            goal: Vector3::new(1.0, 0.0, 1.0),
            aggro: false,
        };
        apply(&mut game, 1, &command).unwrap();

        let fighter = &game.player(1).unwrap().fighters[&knight];
        assert_eq!(fighter.target_entity_id, None);
        assert!(!fighter.aggro);
    }

    #[test]
    fn test_cannot_move_enemy_units() {
        let mut game = test_game(false);
        let enemy = game.insert_builder(2, &BUILDER, Vector3::ZERO).unwrap();

        let command = Command::MoveUnit {
            id: enemy,
            goal: Vector3::new(9.0, 0.0, 9.0),
            aggro: false,
        };
        assert_eq!(
            apply(&mut game, 1, &command),
            Err(GameError::EntityNotFound(enemy))
        );
        assert_eq!(game.player(2).unwrap().builders[&enemy].goal_position, Vector3::ZERO);
    }

    #[test]
    fn test_unknown_operation_fails_without_side_effects() {
        let mut game = test_game(false);
        let before = game.snapshot();

        let outcome = execute(&mut game, 1, &request("launchNukes", json!({})));
        assert!(!outcome.success);
        assert!(outcome.message.contains("launchNukes"));
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_malformed_arguments_fail() {
        let mut game = test_game(false);
        let outcome = execute(&mut game, 1, &request("placeBuilding", json!({"type": "castle"})));
        assert!(!outcome.success);
    }

    #[test]
    fn test_create_builder_through_request() {
        let mut game = test_game(false);
        let outcome = execute(&mut game, 2, &request("createBuilder", json!({})));
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(game.player(2).unwrap().builders.len(), 1);
        assert_eq!(game.player(1).unwrap().builders.len(), 0);
    }

    #[test]
    fn test_place_building_reports_insufficient_resources() {
        let mut game = test_game(false);
        let outcome = execute(
            &mut game,
            1,
            &request("placeBuilding", json!({"type": "townhall", "pos": {"x": 4.0, "z": 4.0}})),
        );
        assert!(!outcome.success);
        assert!(outcome.message.contains("insufficient"));
    }

    #[test]
    fn test_attack_is_acknowledged() {
        let mut game = test_game(false);
        let outcome = execute(&mut game, 1, &request("attack", json!(null)));
        assert!(outcome.success);
    }

    #[test]
    fn test_grant_resources_requires_cheats() {
        let mut game = test_game(false);
        let grant = request("grantResources", json!({"gold": 10.0}));
        assert!(!execute(&mut game, 1, &grant).success);

        let mut game = test_game(true);
        assert!(execute(&mut game, 1, &grant).success);
        assert_eq!(
            game.player(1).unwrap().stockpile,
            Resources::new(210.0, 100.0, 100.0)
        );
    }

    #[test]
    fn test_unknown_player_rejected() {
        let mut game = test_game(true);
        let outcome = execute(&mut game, 9, &request("createBuilder", json!({})));
        assert!(!outcome.success);
    }

    #[test]
    fn test_outcome_into_response() {
        let response = CommandOutcome::failed(&GameError::GameStopped).into_response("moveUnit");
        assert_eq!(response.operation, "moveUnit");
        assert!(!response.success);
        assert_eq!(response.message, "game has stopped");
    }
}
