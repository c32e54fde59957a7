use shared::Movable;

///Advances a movable entity toward its goal at its own speed.
///
///If the goal is within `speed * dt` the entity snaps onto it exactly, so it
///never overshoots or oscillates around the goal. Only the position changes.
pub fn advance<M: Movable + ?Sized>(entity: &mut M, dt: f64) {
    let position = entity.position();
    let delta = entity.goal_position().subtract(position);
    let step = entity.speed() * dt;

    if delta.length() <= step {
        entity.set_position(entity.goal_position());
    } else if step > 0.0 {
        let new_position = position.add(delta.normalize().scale(step));
        entity.set_position(new_position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::catalog::{BUILDER, KNIGHT};
    use shared::{Builder, Fighter, Vector3};

    fn knight_at(position: Vector3, goal: Vector3) -> Fighter {
        let mut knight = Fighter::spawn(1, &KNIGHT, position);
        knight.goal_position = goal;
        knight
    }

    #[test]
    fn test_reaches_goal_exactly_after_ten_ticks() {
        let goal = Vector3::new(10.0, 0.0, 0.0);
        let mut knight = knight_at(Vector3::ZERO, goal);
        knight.speed = 1.0;

        for _ in 0..10 {
            advance(&mut knight, 1.0);
        }
        assert_eq!(knight.position, goal);

        advance(&mut knight, 1.0);
        assert_eq!(knight.position, goal);
    }

    #[test]
    fn test_snaps_when_within_one_step() {
        let goal = Vector3::new(0.3, 0.1, -0.2);
        let mut knight = knight_at(Vector3::ZERO, goal);
        knight.speed = 5.0;

        advance(&mut knight, 0.1);
        assert_eq!(knight.position, goal);
    }

    #[test]
    fn test_partial_step_moves_along_direction() {
        let mut knight = knight_at(Vector3::ZERO, Vector3::new(3.0, 0.0, 4.0));
        knight.speed = 2.0;

        advance(&mut knight, 0.5);
        assert_approx_eq!(knight.position.x, 0.6, 1e-12);
        assert_approx_eq!(knight.position.z, 0.8, 1e-12);
        assert_approx_eq!(knight.position.length(), 1.0, 1e-12);
    }

    #[test]
    fn test_zero_speed_stays_put() {
        let start = Vector3::new(1.0, 0.0, 1.0);
        let mut knight = knight_at(start, Vector3::new(5.0, 0.0, 5.0));
        knight.speed = 0.0;

        advance(&mut knight, 1.0);
        assert_eq!(knight.position, start);

        knight.speed = 1.0;
        advance(&mut knight, 0.0);
        assert_eq!(knight.position, start);
    }

    #[test]
    fn test_goal_and_health_untouched() {
        let goal = Vector3::new(-4.0, 0.0, 2.0);
        let mut builder = Builder::spawn(2, &BUILDER, Vector3::ZERO);
        builder.goal_position = goal;
        let health = shared::Killable::health(&builder);

        advance(&mut builder, 0.25);
        assert_eq!(builder.goal_position, goal);
        assert_eq!(shared::Killable::health(&builder), health);
        assert_ne!(builder.position, Vector3::ZERO);
    }
}
