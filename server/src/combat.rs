//! Fighter targeting and melee.

use crate::game::Game;
use log::debug;
use shared::{Fighter, Killable, PlayerId, Positioned, Vector3, APPROACH_OFFSET};

/// Where a fighter ended up after its combat pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatPhase {
    Idle,
    Seeking,
    Attacking,
}

/// Runs one combat step for `fighter`, owned by `owner`.
///
/// The fighter is detached from the world while this runs, so `game` only
/// ever hands out enemies of `owner`.
pub fn update_fighter(
    game: &mut Game,
    owner: PlayerId,
    fighter: &mut Fighter,
    dt: f64,
) -> CombatPhase {
    if fighter.target_entity_id.is_none() && (fighter.is_at_goal() || fighter.aggro) {
        fighter.target_entity_id = game.nearest_enemy(owner, fighter.position);
        if let Some(target) = fighter.target_entity_id {
            debug!("Fighter {} acquired target {}", fighter.id, target);
        }
    }

    let phase = hunt(game, owner, fighter);
    fighter.cooldown_remaining = (fighter.cooldown_remaining - dt).max(0.0);
    phase
}

fn hunt(game: &mut Game, owner: PlayerId, fighter: &mut Fighter) -> CombatPhase {
    let Some(target_id) = fighter.target_entity_id else {
        return CombatPhase::Idle;
    };

    // Ids owned by `owner` (including reused ones) resolve to nothing here.
    let Some(target) = game.killable_mut(target_id, owner) else {
        fighter.target_entity_id = None;
        return CombatPhase::Idle;
    };
    if target.is_dead() {
        fighter.target_entity_id = None;
        return CombatPhase::Idle;
    }

    let target_position = target.position();
    if fighter.position.distance(target_position) > fighter.attack_range {
        fighter.goal_position = target_position.subtract(Vector3::new(
            APPROACH_OFFSET,
            APPROACH_OFFSET,
            APPROACH_OFFSET,
        ));
        return CombatPhase::Seeking;
    }

    if fighter.cooldown_remaining <= 0.0 {
        target.apply_damage(fighter.strength);
        fighter.cooldown_remaining = fighter.attack_delay;
        debug!(
            "Fighter {} hit {} for {} ({} left)",
            fighter.id,
            target_id,
            fighter.strength,
            target.health()
        );
        if target.is_dead() {
            fighter.target_entity_id = None;
            return CombatPhase::Idle;
        }
    }
    CombatPhase::Attacking
}
