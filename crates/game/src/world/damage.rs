use glam::Vec2;

/// Applies a damage amount to an authoritative health value. Returns the
/// new health and whether the target was destroyed by this hit.
///
/// This is the single place health arithmetic happens on the server, so
/// the authority step can be exercised without a transport.
pub fn apply_damage(health: i32, amount: i32) -> (i32, bool) {
    let new_health = health - amount;
    (new_health, new_health <= 0)
}

/// Computes a projectile velocity from its origin toward a target at the
/// given speed. A degenerate target on top of the origin launches the
/// projectile along +X so it still expires by leaving the arena.
pub fn attack_velocity(origin: Vec2, target: Vec2, speed: f32) -> Vec2 {
    let delta = target - origin;
    if delta.length_squared() < f32::EPSILON {
        return Vec2::new(speed, 0.0);
    }
    delta.normalize() * speed
}
