//! Builder gather/deposit cycle.

use crate::game::Game;
use log::{debug, trace};
use shared::{Builder, PlayerId, ResourceNode, DEPLETION_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EconomyPhase {
    Idle,
    SeekingResource,
    Mining,
    Returning,
    Depositing,
}

/// Runs one economy step for `builder`, owned by `owner`.
pub fn update_builder(
    game: &mut Game,
    owner: PlayerId,
    builder: &mut Builder,
    dt: f64,
) -> EconomyPhase {
    if builder.is_full() {
        return return_load(game, owner, builder);
    }

    let Some((node_id, node_position)) = game.nearest_resource(builder.position) else {
        builder.resource_target = None;
        return EconomyPhase::Idle;
    };
    builder.resource_target = Some(node_id);
    builder.goal_position = node_position;

    if builder.position.distance(node_position) > builder.reach {
        return EconomyPhase::SeekingResource;
    }

    let Some(node) = game.resources.get_mut(&node_id) else {
        return EconomyPhase::Idle;
    };
    let requested = (builder.mine_rate * dt).min(builder.free_capacity());
    let mined = extract(node, requested);
    *builder.carried.get_mut(node.resource_type) += mined;
    trace!(
        "Builder {} mined {:.2} {:?} from node {}",
        builder.id,
        mined,
        node.resource_type,
        node_id
    );
    EconomyPhase::Mining
}

fn return_load(game: &mut Game, owner: PlayerId, builder: &mut Builder) -> EconomyPhase {
    let Some(town_hall) = game.town_hall_position(owner) else {
        return EconomyPhase::Idle;
    };
    builder.goal_position = town_hall;

    if builder.position.distance(town_hall) > builder.reach {
        return EconomyPhase::Returning;
    }

    let load = builder.unload();
    if let Some(player) = game.player_mut(owner) {
        player.stockpile.add(&load);
        debug!(
            "Builder {} deposited {:?} for player {}",
            builder.id, load, owner
        );
    }
    EconomyPhase::Depositing
}

/// Takes up to `requested` from the node's single resource type. A remainder
/// at or below the depletion threshold is discarded.
fn extract(node: &mut ResourceNode, requested: f64) -> f64 {
    let mined = node.total_remaining().min(requested).max(0.0);
    let remaining = node.remaining.get_mut(node.resource_type);
    *remaining -= mined;
    if *remaining <= DEPLETION_THRESHOLD {
        *remaining = 0.0;
    }
    mined
}
