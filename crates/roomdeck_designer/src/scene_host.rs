use scenebud::glam::Vec3;
use scenebud::{
    Aabb, Camera, Frame, Lighting, NodeId, OrbitController, Ray, RenderSurface, World,
};
use tracing::debug;

use crate::room::RoomDimensions;

const FRAMING_PADDING: f32 = 1.1;

/// Owns the scene graph, the surface it renders into, lighting and the
/// orbit navigation. One per mounted design view.
pub struct SceneHost {
    pub world: World,
    pub lighting: Lighting,
    orbit: OrbitController,
    surface: Box<dyn RenderSurface>,
    shadow_extent: f32,
    frames: u64,
}

impl SceneHost {
    /// Create a host with the camera framing a room of the given size.
    pub fn new(surface: Box<dyn RenderSurface>, dims: &RoomDimensions) -> Self {
        let camera = Camera::new(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO);
        let mut host = Self {
            world: World::new(camera),
            lighting: Lighting::default(),
            orbit: OrbitController::default(),
            surface,
            shadow_extent: 10.0,
            frames: 0,
        };
        host.frame_room(dims);
        host
    }

    /// Point the camera at the whole room and reset navigation around it.
    pub fn frame_room(&mut self, dims: &RoomDimensions) {
        let (hw, hl) = dims.half_extents();
        let bounds = Aabb::new(Vec3::new(-hw, 0.0, -hl), Vec3::new(hw, dims.height, hl));
        let (w, h) = self.surface.size();
        let aspect = w as f32 / (h as f32).max(1.0);
        let fov_y = self.world.camera.fov_y;

        self.world.camera = Camera::fit_to_aabb(&bounds, aspect, fov_y, FRAMING_PADDING);
        let enabled = self.orbit.enabled;
        self.orbit = OrbitController::from_camera(&self.world.camera);
        self.orbit.enabled = enabled;
        self.shadow_extent = hw.max(hl).max(dims.height) * 1.5;
    }

    pub fn camera(&self) -> &Camera {
        &self.world.camera
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.surface.size()
    }

    pub fn navigation_enabled(&self) -> bool {
        self.orbit.enabled
    }

    pub fn set_navigation_enabled(&mut self, enabled: bool) {
        if self.orbit.enabled != enabled {
            debug!("navigation {}", if enabled { "enabled" } else { "disabled" });
        }
        self.orbit.enabled = enabled;
    }

    pub fn on_orbit_drag(&mut self, dx: f32, dy: f32) {
        self.orbit.on_drag(dx, dy);
        self.orbit.update_camera(&mut self.world.camera);
    }

    pub fn on_orbit_pan(&mut self, dx: f32, dy: f32) {
        self.orbit.on_pan(dx, dy);
        self.orbit.update_camera(&mut self.world.camera);
    }

    pub fn on_orbit_scroll(&mut self, delta: f32) {
        self.orbit.on_scroll(delta);
        self.orbit.update_camera(&mut self.world.camera);
    }

    /// World-space ray through a viewport pixel.
    pub fn screen_ray(&self, x: f32, y: f32) -> Ray {
        let (w, h) = self.surface.size();
        self.world.camera.screen_ray(x, y, w as f32, h as f32)
    }

    /// Pixel position of a world point, if it is in front of the camera.
    pub fn project(&self, p: Vec3) -> Option<(f32, f32)> {
        let (w, h) = self.surface.size();
        self.world.camera.world_to_screen(p, w as f32, h as f32)
    }

    /// Viewport pixel at the center of a node's bounds.
    pub fn node_screen_position(&self, node: NodeId) -> Option<(f32, f32)> {
        let bounds = self.world.subtree_bounds(node)?;
        self.project(bounds.center())
    }

    /// Draw one frame. Reads the scene; never mutates placement state.
    /// Returns the number of draws submitted.
    pub fn render(&mut self) -> usize {
        self.world.update_world_transforms();
        let frame = Frame::collect(
            &self.world,
            &self.lighting,
            self.surface.size(),
            self.shadow_extent,
        );
        self.surface.present(&frame);
        self.frames += 1;
        frame.draws.len()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }
}
