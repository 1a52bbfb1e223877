use glam::{Mat4, Vec3};

/// CPU-side triangle geometry. Normals are optional until
/// [`Geometry::compute_vertex_normals`] fills them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals: Vec::new(),
            indices,
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    pub fn has_normals(&self) -> bool {
        !self.positions.is_empty() && self.normals.len() == self.positions.len()
    }

    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Smooth per-vertex normals from area-weighted face normals.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        for tri in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if i0 >= normals.len() || i1 >= normals.len() || i2 >= normals.len() {
                continue;
            }

            let p0 = self.positions[i0];
            let e1 = self.positions[i1] - p0;
            let e2 = self.positions[i2] - p0;

            // cross product length is twice the triangle area, which is the weight we want
            let face = e1.cross(e2);
            normals[i0] += face;
            normals[i1] += face;
            normals[i2] += face;
        }

        for n in &mut normals {
            *n = n.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = normals;
    }

    pub fn bounds(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for p in &self.positions {
            bounds.include_point(*p);
        }
        bounds
    }

    /// A `width` x `height` quad in the XY plane, centered, facing +Z.
    pub fn plane(width: f32, height: f32) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        let positions = vec![
            Vec3::new(-hw, -hh, 0.0),
            Vec3::new(hw, -hh, 0.0),
            Vec3::new(hw, hh, 0.0),
            Vec3::new(-hw, hh, 0.0),
        ];
        Self::new(positions, vec![0, 1, 2, 0, 2, 3]).with_normals(vec![Vec3::Z; 4])
    }

    /// Axis-aligned box centered on the origin with flat face normals.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let half = Vec3::new(width, height, depth) * 0.5;

        // (normal, u, v) with u x v == normal so faces wind counter-clockwise
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in faces {
            let base = positions.len() as u32;
            let center = normal * half;
            let u = u * half;
            let v = v * half;

            positions.extend([center - u - v, center + u - v, center + u + v, center - u + v]);
            normals.extend([normal; 4]);
            indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(positions, indices).with_normals(normals)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn include_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn radius(&self) -> f32 {
        self.half_extents().length()
    }

    /// Bounds of this box after transforming all eight corners.
    pub fn transformed(&self, m: &Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }

        let mut out = Aabb::empty();
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.include_point(m.transform_point3(corner));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn cuboid_bounds_match_dimensions() {
        let g = Geometry::cuboid(2.0, 1.0, 4.0);
        let b = g.bounds();
        assert_eq!(b.min, Vec3::new(-1.0, -0.5, -2.0));
        assert_eq!(b.max, Vec3::new(1.0, 0.5, 2.0));
        assert_eq!(g.num_triangles(), 12);
        assert!(g.has_normals());
    }

    #[test]
    fn cuboid_faces_point_outward() {
        let g = Geometry::cuboid(1.0, 1.0, 1.0);
        for tri in g.indices.chunks_exact(3) {
            let p0 = g.positions[tri[0] as usize];
            let p1 = g.positions[tri[1] as usize];
            let p2 = g.positions[tri[2] as usize];
            let face = (p1 - p0).cross(p2 - p0).normalize();
            let centroid = (p0 + p1 + p2) / 3.0;
            assert!(face.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn computed_normals_match_plane_facing() {
        let mut g = Geometry::plane(2.0, 2.0);
        g.normals.clear();
        assert!(!g.has_normals());

        g.compute_vertex_normals();
        assert!(g.has_normals());
        for n in &g.normals {
            assert!((*n - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn empty_bounds_stay_empty_when_transformed() {
        let b = Aabb::empty();
        assert!(b.is_empty());
        assert!(b.transformed(&Mat4::from_scale(Vec3::splat(2.0))).is_empty());
    }

    #[test]
    fn transformed_bounds_follow_rotation() {
        let b = Aabb::new(Vec3::new(-1.0, 0.0, -0.5), Vec3::new(1.0, 1.0, 0.5));
        let m = Mat4::from_quat(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let t = b.transformed(&m);
        assert!((t.size().x - 1.0).abs() < 1e-5);
        assert!((t.size().z - 2.0).abs() < 1e-5);
        assert!((t.min.y - 0.0).abs() < 1e-5);
    }
}
