/// Aim pitch animation and throw vector.
///
/// Pitch is measured in a right-facing frame, y-down: `-π/2` is straight
/// up, `+π/2` straight down. The world-space throw angle mirrors the pitch
/// across the vertical axis when facing left.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use glam::Vec2;

use super::entity::Facing;
use super::intent::Intents;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct AimState {
    pub pitch: f32,
    pub target: f32,
}

/// Target pitch for the current intents. Diagonal aim (±45°) while a
/// horizontal direction is held, vertical (±90°) otherwise.
pub fn target_pitch(intents: &Intents) -> f32 {
    let moving = intents.left || intents.right;
    match (intents.up, intents.down) {
        (true, false) => if moving { -FRAC_PI_4 } else { -FRAC_PI_2 },
        (false, true) => if moving { FRAC_PI_4 } else { FRAC_PI_2 },
        _ => 0.0,
    }
}

/// Move `current` toward `target` by at most `max_step`, never past it.
pub fn approach(current: f32, target: f32, max_step: f32) -> f32 {
    if current < target {
        (current + max_step).min(target)
    } else {
        (current - max_step).max(target)
    }
}

/// World-space angle for a pitch and facing.
pub fn throw_angle(pitch: f32, facing: Facing) -> f32 {
    match facing {
        Facing::Right => pitch,
        Facing::Left => PI - pitch,
    }
}

/// Velocity handed to a released object: the aim direction at full
/// strength plus a damped share of the thrower's own velocity.
pub fn release_velocity(angle: f32, strength: f32, thrower_velocity: Vec2, dampening: f32) -> Vec2 {
    Vec2::from_angle(angle) * strength + thrower_velocity / dampening
}

impl AimState {
    /// Re-evaluate the target from intents and animate the pitch toward it.
    pub fn update(&mut self, intents: &Intents, dt: f32, pitch_speed: f32) {
        self.target = target_pitch(intents);
        self.pitch = approach(self.pitch, self.target, pitch_speed * dt)
            .clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    pub fn angle(&self, facing: Facing) -> f32 {
        throw_angle(self.pitch, facing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn intents(up: bool, down: bool, side: bool) -> Intents {
        Intents { up, down, right: side, ..Intents::default() }
    }

    #[test]
    fn targets_by_intent() {
        assert_eq!(target_pitch(&intents(true, false, false)), -FRAC_PI_2);
        assert_eq!(target_pitch(&intents(true, false, true)), -FRAC_PI_4);
        assert_eq!(target_pitch(&intents(false, true, false)), FRAC_PI_2);
        assert_eq!(target_pitch(&intents(false, true, true)), FRAC_PI_4);
        assert_eq!(target_pitch(&intents(true, true, false)), 0.0);
        assert_eq!(target_pitch(&intents(false, false, true)), 0.0);
    }

    #[test]
    fn pitch_never_overshoots_for_any_step() {
        let targets = [-FRAC_PI_2, -FRAC_PI_4, 0.0, FRAC_PI_4, FRAC_PI_2];
        let starts = [-FRAC_PI_2, -1.0, -0.1, 0.0, 0.3, 1.2, FRAC_PI_2];
        let dts = [0.001, 1.0 / 60.0, 0.1, 0.5, 10.0];
        for &t in &targets {
            for &s in &starts {
                for &dt in &dts {
                    let next = approach(s, t, 6.0 * dt);
                    let before = (t - s).abs();
                    let after = (t - next).abs();
                    assert!(after <= before + EPS, "moved away: {s} -> {next} (target {t})");
                    if s <= t { assert!(next <= t + EPS); } else { assert!(next >= t - EPS); }
                }
            }
        }
    }

    #[test]
    fn update_animates_at_fixed_rate() {
        let mut aim = AimState::default();
        let up = intents(true, false, false);
        aim.update(&up, 0.1, 6.0);
        assert!((aim.pitch - (-0.6)).abs() < EPS);
        for _ in 0..10 { aim.update(&up, 0.1, 6.0); }
        assert_eq!(aim.pitch, -FRAC_PI_2);
        aim.update(&Intents::default(), 0.1, 6.0);
        assert!((aim.pitch - (-FRAC_PI_2 + 0.6)).abs() < EPS);
    }

    #[test]
    fn left_facing_mirrors_angle() {
        assert!((throw_angle(0.0, Facing::Left) - PI).abs() < EPS);
        assert!((throw_angle(-FRAC_PI_4, Facing::Left) - (PI + FRAC_PI_4)).abs() < EPS);
        assert_eq!(throw_angle(0.3, Facing::Right), 0.3);
    }

    #[test]
    fn release_matches_formula() {
        let p = -0.4_f32;
        let v = release_velocity(p, 220.0, Vec2::new(50.0, -30.0), 2.0);
        assert!((v.x - (p.cos() * 220.0 + 25.0)).abs() < EPS);
        assert!((v.y - (p.sin() * 220.0 - 15.0)).abs() < EPS);
    }
}
