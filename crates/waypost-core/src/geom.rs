//! Positions and the distance-projection transform.
//!
//! Continuous positions ([`Vec3`]) come from the host's world view; markers
//! are transmitted at integer coordinates ([`BlockPos`]). [`project_within`]
//! clamps a far-away target to a bounded distance from the viewer while
//! preserving direction, so a marker can be rendered without transmitting
//! full-range coordinates.

use std::fmt;

/// Below this separation the projection returns the target unscaled,
/// avoiding a division by a near-zero distance.
const PROJECTION_EPSILON: f64 = 0.01;

/// A continuous position within a dimension.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    /// East-west coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// North-south coordinate.
    pub z: f64,
}

impl Vec3 {
    /// Construct from components.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Vec3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// An integer marker coordinate.
///
/// This is the only position form that crosses the transport boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockPos {
    /// East-west coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// North-south coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Construct from components.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The block containing a continuous position (per-axis floor).
    pub fn containing(pos: Vec3) -> Self {
        Self {
            x: pos.x.floor() as i32,
            y: pos.y.floor() as i32,
            z: pos.z.floor() as i32,
        }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Truncate a continuous position toward zero on each axis.
fn truncate(x: f64, y: f64, z: f64) -> BlockPos {
    BlockPos {
        x: x as i32,
        y: y as i32,
        z: z as i32,
    }
}

/// Project `target` to within `max_distance` of `viewer`, preserving
/// direction.
///
/// If the separation is below 0.01 the target's own coordinates are returned
/// (truncated), sidestepping the division by a near-zero distance. Otherwise
/// the direction vector is rescaled to exactly `max_distance` and added to
/// the viewer position.
///
/// The result depends on the viewer's own position, so callers recompute it
/// every tick rather than caching it.
///
/// # Examples
///
/// ```
/// use waypost_core::geom::{project_within, BlockPos, Vec3};
///
/// let viewer = Vec3::new(0.0, 0.0, 0.0);
/// let target = Vec3::new(100.0, 0.0, 0.0);
/// assert_eq!(project_within(viewer, target, 50.0), BlockPos::new(50, 0, 0));
/// ```
pub fn project_within(viewer: Vec3, target: Vec3, max_distance: f64) -> BlockPos {
    let dx = target.x - viewer.x;
    let dy = target.y - viewer.y;
    let dz = target.z - viewer.z;
    let dist = (dx * dx + dy * dy + dz * dz).sqrt();

    if dist < PROJECTION_EPSILON {
        return truncate(target.x, target.y, target.z);
    }

    let scale = max_distance / dist;
    truncate(
        viewer.x + dx * scale,
        viewer.y + dy * scale,
        viewer.z + dz * scale,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn projects_along_axis() {
        let viewer = Vec3::new(0.0, 0.0, 0.0);
        let target = Vec3::new(100.0, 0.0, 0.0);
        assert_eq!(project_within(viewer, target, 50.0), BlockPos::new(50, 0, 0));
    }

    #[test]
    fn coincident_points_do_not_divide_by_zero() {
        let p = Vec3::new(12.7, -3.4, 0.2);
        assert_eq!(project_within(p, p, 50.0), BlockPos::new(12, -3, 0));
    }

    #[test]
    fn preserves_direction_in_three_axes() {
        let viewer = Vec3::new(10.0, 10.0, 10.0);
        let target = Vec3::new(10.0, 10.0, 110.0);
        assert_eq!(
            project_within(viewer, target, 25.0),
            BlockPos::new(10, 10, 35)
        );
    }

    #[test]
    fn nearby_target_still_pushed_to_max_distance() {
        // Projection always lands at max_distance, even for a close target;
        // the marker direction matters, not the true range.
        let viewer = Vec3::new(0.0, 0.0, 0.0);
        let target = Vec3::new(2.0, 0.0, 0.0);
        assert_eq!(project_within(viewer, target, 50.0), BlockPos::new(50, 0, 0));
    }

    #[test]
    fn containing_floors_negative_coordinates() {
        assert_eq!(
            BlockPos::containing(Vec3::new(-0.5, 64.9, -10.0)),
            BlockPos::new(-1, 64, -10)
        );
    }

    proptest! {
        #[test]
        fn projected_point_is_bounded(
            vx in -1000.0..1000.0f64, vy in -1000.0..1000.0f64, vz in -1000.0..1000.0f64,
            tx in -1000.0..1000.0f64, ty in -1000.0..1000.0f64, tz in -1000.0..1000.0f64,
        ) {
            let viewer = Vec3::new(vx, vy, vz);
            let target = Vec3::new(tx, ty, tz);
            let max = 50.0;
            let p = project_within(viewer, target, max);

            if viewer.distance_to(&target) >= 0.01 {
                // Truncation moves each axis by less than one block.
                let landed = Vec3::new(p.x as f64, p.y as f64, p.z as f64);
                prop_assert!(viewer.distance_to(&landed) <= max + 2.0);
            } else {
                prop_assert_eq!(p, truncate(target.x, target.y, target.z));
            }
        }
    }
}
