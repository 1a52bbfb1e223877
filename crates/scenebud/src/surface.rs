use glam::{Mat4, Vec3};

use crate::light::Lighting;
use crate::resources::{GeometryId, MaterialId};
use crate::world::{NodeId, World};

/// Where frames end up. A windowed host wraps its GPU swapchain in this;
/// headless hosts and tests use [`NullSurface`].
pub trait RenderSurface {
    /// Current drawable size in pixels.
    fn size(&self) -> (u32, u32);

    fn present(&mut self, frame: &Frame);
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    pub world: Mat4,
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub transparent: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    /// Distance from the camera eye, used to order transparent draws.
    pub depth: f32,
}

/// Everything a backend needs to draw one frame. Built from a read-only
/// borrow of the world.
#[derive(Debug, Clone)]
pub struct Frame {
    pub size: (u32, u32),
    pub eye: Vec3,
    pub view_proj: Mat4,
    pub lighting: Lighting,
    pub shadow_view_proj: Mat4,
    /// Opaque draws first, then transparent ones back to front.
    pub draws: Vec<DrawItem>,
}

impl Frame {
    /// Call after `World::update_world_transforms()` so cached matrices
    /// are current.
    pub fn collect(world: &World, lighting: &Lighting, size: (u32, u32), shadow_extent: f32) -> Self {
        let (w, h) = (size.0 as f32, size.1 as f32);
        let eye = world.camera.eye;

        let mut opaque = Vec::new();
        let mut transparent = Vec::new();

        for &id in world.renderables() {
            if !world.is_effectively_visible(id) {
                continue;
            }
            let Some(node) = world.get_node(id) else {
                continue;
            };
            let Some(mesh) = node.mesh else {
                continue;
            };
            let is_transparent = world
                .resources
                .material(mesh.material)
                .is_some_and(|m| m.transparent);

            let world_matrix = node.world_matrix();
            let item = DrawItem {
                node: id,
                world: world_matrix,
                geometry: mesh.geometry,
                material: mesh.material,
                transparent: is_transparent,
                cast_shadow: mesh.cast_shadow,
                receive_shadow: mesh.receive_shadow,
                depth: (world_matrix.w_axis.truncate() - eye).length(),
            };

            if is_transparent {
                transparent.push(item);
            } else {
                opaque.push(item);
            }
        }

        transparent.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        opaque.extend(transparent);

        Self {
            size,
            eye,
            view_proj: world.camera.view_proj(w, h),
            lighting: *lighting,
            shadow_view_proj: lighting.shadow_view_proj(shadow_extent),
            draws: opaque,
        }
    }
}

/// Surface that draws nothing and remembers what it was given.
#[derive(Debug, Default)]
pub struct NullSurface {
    pub size: (u32, u32),
    pub frames_presented: u64,
    pub last_draw_count: usize,
}

impl NullSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            ..Default::default()
        }
    }
}

impl RenderSurface for NullSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn present(&mut self, frame: &Frame) {
        self.frames_presented += 1;
        self.last_draw_count = frame.draws.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::material::{Color, Material};
    use crate::mesh::Geometry;
    use crate::world::{MeshBinding, Transform};
    use std::sync::Arc;

    fn add(world: &mut World, z: f32, opacity: f32) -> NodeId {
        let mesh = MeshBinding {
            geometry: world
                .resources
                .add_geometry(Arc::new(Geometry::plane(1.0, 1.0))),
            material: world
                .resources
                .add_material(Material::solid("m", Color::WHITE).with_opacity(opacity)),
            cast_shadow: false,
            receive_shadow: false,
        };
        world.create_mesh("m", mesh, Transform::from_translation(Vec3::new(0.0, 0.0, z)), None)
    }

    #[test]
    fn transparent_draws_sort_back_to_front_after_opaque() {
        let mut world = World::new(Camera::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO));
        let near_glass = add(&mut world, 2.0, 0.35);
        let wall = add(&mut world, 0.0, 1.0);
        let far_glass = add(&mut world, -2.0, 0.35);
        let hidden = add(&mut world, 1.0, 1.0);
        world.set_visible(hidden, false);
        world.update_world_transforms();

        let frame = Frame::collect(&world, &Lighting::default(), (640, 480), 15.0);
        let order: Vec<NodeId> = frame.draws.iter().map(|d| d.node).collect();
        assert_eq!(order, vec![wall, far_glass, near_glass]);

        let mut surface = NullSurface::new(640, 480);
        surface.present(&frame);
        assert_eq!(surface.frames_presented, 1);
        assert_eq!(surface.last_draw_count, 3);
    }
}
