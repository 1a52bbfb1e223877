use glam::{Mat4, Vec3};

use crate::mesh::Aabb;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Ray-AABB intersection using the slab method.
    /// Transforms the ray into the box's local space via the inverse world matrix.
    /// Returns the distance along the ray if there's a hit.
    pub fn intersect_aabb(&self, aabb: &Aabb, world: &Mat4) -> Option<f32> {
        if aabb.is_empty() {
            return None;
        }

        let inv = world.inverse();
        let lo = inv.transform_point3(self.origin);
        let ld = inv.transform_vector3(self.dir);
        let t1 = (aabb.min - lo) / ld;
        let t2 = (aabb.max - lo) / ld;
        let tmin = t1.min(t2);
        let tmax = t1.max(t2);
        let enter = tmin.x.max(tmin.y).max(tmin.z);
        let exit = tmax.x.min(tmax.y).min(tmax.z);
        if exit >= enter.max(0.0) {
            // local t is world t scaled by the local direction length
            let hit = world.transform_point3(lo + ld * enter.max(0.0));
            Some((hit - self.origin).length())
        } else {
            None
        }
    }

    /// Where the ray crosses the horizontal plane at height `y`, if it
    /// does so in front of the origin.
    pub fn intersect_horizontal_plane(&self, y: f32) -> Option<Vec3> {
        if self.dir.y.abs() < 1e-6 {
            return None;
        }
        let t = (y - self.origin.y) / self.dir.y;
        if t < 0.0 {
            return None;
        }
        Some(self.at(t))
    }
}
