//! Cubic container holding the specks.
//!
//! The walls sit at `±half_extent` on every axis and act in two steps:
//!
//! - a spring (`stiffness * penetration`) in the velocity pass pushes escaped
//!   specks back toward the inside;
//! - a hard clamp in the position pass snaps a speck that crossed a wall back
//!   onto it, and reflects its outward velocity component scaled by
//!   `restitution`.
//!
//! With zero stiffness, a speck that hits a wall at speed `v` leaves it at
//! `restitution * v`.

use bevy::prelude::*;

/// Axis-aligned cube centered on the origin.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct BoxBoundary {
    /// Half the container width.
    pub half_extent: f32,
    /// Spring constant of the soft wall.
    pub stiffness: f32,
    /// Restitution coefficient for collisions (0 = no bounce, 1 = perfect bounce).
    pub restitution: f32,
}

impl Default for BoxBoundary {
    fn default() -> Self {
        Self {
            half_extent: 0.5,
            stiffness: 0.0,
            restitution: 0.2,
        }
    }
}

impl BoxBoundary {
    /// Create a box boundary of the given width.
    pub fn new(width: f32) -> Self {
        Self {
            half_extent: width / 2.0,
            ..default()
        }
    }

    /// Set the wall spring stiffness.
    pub fn with_stiffness(mut self, stiffness: f32) -> Self {
        self.stiffness = stiffness;
        self
    }

    /// Set restitution.
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Check if a point is inside the boundary.
    pub fn contains(&self, point: Vec3) -> bool {
        point.abs().max_element() <= self.half_extent
    }

    /// Per-axis distance a point lies beyond the walls, signed outward.
    pub fn penetration(&self, point: Vec3) -> Vec3 {
        let h = self.half_extent;
        Vec3::select(
            point.cmpgt(Vec3::splat(h)),
            point - Vec3::splat(h),
            Vec3::select(
                point.cmplt(Vec3::splat(-h)),
                point + Vec3::splat(h),
                Vec3::ZERO,
            ),
        )
    }

    /// Spring force pulling an escaped point back inside.
    pub fn spring_force(&self, point: Vec3) -> Vec3 {
        -self.penetration(point) * self.stiffness
    }

    /// Clamp a point onto the walls and reflect its outward velocity.
    pub fn apply_collision(&self, position: &mut Vec3, velocity: &mut Vec3) {
        let h = self.half_extent;
        for axis in 0..3 {
            if position[axis] > h {
                position[axis] = h;
                if velocity[axis] > 0.0 {
                    velocity[axis] *= -self.restitution;
                }
            } else if position[axis] < -h {
                position[axis] = -h;
                if velocity[axis] < 0.0 {
                    velocity[axis] *= -self.restitution;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_boundary_contains() {
        let boundary = BoxBoundary::new(1.0);

        assert!(boundary.contains(Vec3::splat(0.5)));
        assert!(!boundary.contains(Vec3::new(0.6, 0.0, 0.0)));
    }

    #[test]
    fn test_box_boundary_collision() {
        let boundary = BoxBoundary::new(1.0).with_restitution(0.5);

        let mut pos = Vec3::new(-0.7, 0.2, 0.9);
        let mut vel = Vec3::new(-2.0, 1.0, 4.0);

        boundary.apply_collision(&mut pos, &mut vel);

        assert_eq!(pos, Vec3::new(-0.5, 0.2, 0.5));
        assert_eq!(vel, Vec3::new(1.0, 1.0, -2.0));
    }

    #[test]
    fn test_inward_velocity_is_kept() {
        let boundary = BoxBoundary::new(1.0).with_restitution(0.5);

        let mut pos = Vec3::new(0.8, 0.0, 0.0);
        let mut vel = Vec3::new(-1.0, 0.0, 0.0);

        boundary.apply_collision(&mut pos, &mut vel);

        assert_eq!(pos.x, 0.5);
        assert_eq!(vel.x, -1.0);
    }

    #[test]
    fn test_spring_points_inward() {
        let boundary = BoxBoundary::new(2.0).with_stiffness(10.0);

        assert_eq!(boundary.spring_force(Vec3::ZERO), Vec3::ZERO);
        let force = boundary.spring_force(Vec3::new(1.5, -1.25, 0.0));
        assert_eq!(force, Vec3::new(-5.0, 2.5, 0.0));
    }
}
