//! Container geometry: the walls pieces bounce off
//!
//! The container is open at the top. Walls extend far above the visible
//! area so a high throw cannot escape sideways.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::tuning::ContainerTuning;

/// Static, immovable axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub min: Vec2,
    pub max: Vec2,
}

impl Wall {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Closest point on (or inside) the rectangle
    #[inline]
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn extent(&self) -> Vec2 {
        self.max - self.min
    }
}

/// The play area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub width: f32,
    pub height: f32,
    pub spawn_y: f32,
    pub overflow_line: f32,
    pub walls: Vec<Wall>,
}

impl Container {
    pub fn new(tuning: &ContainerTuning) -> Self {
        let w = tuning.width;
        let h = tuning.height;
        let t = tuning.wall_thickness;
        let sky = -h;
        let walls = vec![
            // Left
            Wall::new(Vec2::new(0.0, sky), Vec2::new(t, h)),
            // Right
            Wall::new(Vec2::new(w - t, sky), Vec2::new(w, h)),
            // Floor
            Wall::new(Vec2::new(0.0, h - t), Vec2::new(w, h)),
        ];
        Self {
            width: w,
            height: h,
            spawn_y: tuning.spawn_y,
            overflow_line: tuning.overflow_line,
            walls,
        }
    }

    /// Inner horizontal bounds (between the side walls)
    pub fn inner_x(&self) -> (f32, f32) {
        let left = self.walls.first().map_or(0.0, |w| w.max.x);
        let right = self.walls.get(1).map_or(self.width, |w| w.min.x);
        (left, right)
    }

    /// Centre of a piece of the given radius at spawn height
    pub fn spawn_point(&self, radius: f32) -> Vec2 {
        Vec2::new(self.width / 2.0, self.spawn_y + radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_point_clears_walls() {
        let container = Container::new(&ContainerTuning::default());
        let r = 46.0;
        let p = container.spawn_point(r);
        let (left, right) = container.inner_x();
        assert!(p.x - r > left && p.x + r < right);
        assert!((p.y - r - container.spawn_y).abs() < 1e-4);
    }

    #[test]
    fn test_wall_contains() {
        let wall = Wall::new(Vec2::ZERO, Vec2::new(10.0, 10.0));
        assert!(wall.contains(Vec2::new(5.0, 5.0)));
        assert!(!wall.contains(Vec2::new(11.0, 5.0)));
        assert_eq!(wall.closest_point(Vec2::new(20.0, -3.0)), Vec2::new(10.0, 0.0));
    }
}
