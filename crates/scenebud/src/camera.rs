use glam::{Mat4, Vec3, Vec4};

use crate::mesh::Aabb;
use crate::ray::Ray;

#[derive(Debug, Copy, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,

    pub fov_y: f32,
    pub znear: f32,
    pub zfar: f32,
}

/// Orbit navigation around a target point: drag to orbit, shift-drag
/// or right-drag to pan, scroll to zoom.
///
/// While `enabled` is false every input is ignored. The placement
/// engine turns navigation off for the duration of a drag.
#[derive(Debug, Clone)]
pub struct OrbitController {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,   // radians, around Y axis
    pub pitch: f32, // radians, up/down
    pub sensitivity: f32,
    pub zoom_sensitivity: f32,
    pub pan_sensitivity: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub enabled: bool,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 5.0,
            yaw: 0.0,
            pitch: 0.3,
            sensitivity: 0.005,
            zoom_sensitivity: 0.1,
            pan_sensitivity: 0.002,
            min_distance: 0.1,
            max_distance: 1000.0,
            enabled: true,
        }
    }
}

impl OrbitController {
    /// Initialize from an existing camera.
    pub fn from_camera(camera: &Camera) -> Self {
        let offset = camera.eye - camera.target;
        let distance = offset.length().max(1e-4);

        let yaw = offset.x.atan2(offset.z);
        let pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();

        Self {
            target: camera.target,
            distance,
            yaw,
            pitch,
            ..Default::default()
        }
    }

    /// Handle mouse drag delta (in pixels).
    pub fn on_drag(&mut self, delta_x: f32, delta_y: f32) {
        if !self.enabled {
            return;
        }

        self.yaw -= delta_x * self.sensitivity;
        self.pitch += delta_y * self.sensitivity;

        // Clamp pitch to avoid gimbal lock
        let limit = std::f32::consts::FRAC_PI_2 - 0.01;
        self.pitch = self.pitch.clamp(-limit, limit);
    }

    /// Slide the target in the camera's view plane.
    pub fn on_pan(&mut self, delta_x: f32, delta_y: f32) {
        if !self.enabled {
            return;
        }

        let forward = (self.target - self.eye()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();
        let scale = self.distance * self.pan_sensitivity;
        self.target += (-right * delta_x + up * delta_y) * scale;
    }

    /// Handle scroll for zoom (positive = zoom in).
    pub fn on_scroll(&mut self, delta: f32) {
        if !self.enabled {
            return;
        }

        self.distance *= 1.0 - delta * self.zoom_sensitivity;
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
    }

    /// Compute the camera eye position from current orbit state.
    pub fn eye(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Update a camera with the current orbit state.
    pub fn update_camera(&self, camera: &mut Camera) {
        camera.eye = self.eye();
        camera.target = self.target;
    }
}

impl Camera {
    pub fn new(eye: Vec3, target: Vec3) -> Self {
        Self {
            eye,
            target,
            up: Vec3::Y,
            fov_y: 45_f32.to_radians(),
            znear: 0.1,
            zfar: 1000.0,
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn proj(&self, width: f32, height: f32) -> Mat4 {
        let aspect = width / height.max(1.0);
        Mat4::perspective_rh(self.fov_y, aspect, self.znear, self.zfar)
    }

    pub fn view_proj(&self, width: f32, height: f32) -> Mat4 {
        self.proj(width, height) * self.view()
    }

    /// World-space ray through a viewport pixel (0,0 = top-left).
    pub fn screen_ray(&self, screen_x: f32, screen_y: f32, width: f32, height: f32) -> Ray {
        let ndc_x = (screen_x / width.max(1.0)) * 2.0 - 1.0;
        let ndc_y = 1.0 - (screen_y / height.max(1.0)) * 2.0;
        let inv_vp = self.view_proj(width, height).inverse();
        let near4 = inv_vp * Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
        let far4 = inv_vp * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let near = near4.truncate() / near4.w;
        let far = far4.truncate() / far4.w;
        Ray::new(near, far - near)
    }

    /// Project a world point to viewport pixels. None when behind the camera.
    pub fn world_to_screen(&self, p: Vec3, width: f32, height: f32) -> Option<(f32, f32)> {
        let clip = self.view_proj(width, height) * p.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some((
            (ndc.x + 1.0) * 0.5 * width,
            (1.0 - ndc.y) * 0.5 * height,
        ))
    }

    pub fn fit_to_aabb(bounds: &Aabb, aspect: f32, fov_y: f32, padding: f32) -> Self {
        let center = bounds.center();
        let radius = bounds.radius().max(1e-4);

        // horizontal fov derived from vertical fov + aspect
        let half_fov_y = fov_y * 0.5;
        let half_fov_x = (half_fov_y.tan() * aspect).atan();

        // fit in both directions
        let limiting_half_fov = half_fov_y.min(half_fov_x);
        let dist = (radius / limiting_half_fov.tan()) * padding;

        let view_dir = Vec3::new(0.0, 0.35, 1.0).normalize();
        let eye = center + view_dir * dist;

        let znear = (dist - radius * 2.0).max(0.01);
        let zfar = dist + radius * 50.0;

        Self {
            eye,
            target: center,
            up: Vec3::Y,
            fov_y,
            znear,
            zfar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_pixel_ray_points_at_target() {
        let cam = Camera::new(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO);
        let ray = cam.screen_ray(400.0, 300.0, 800.0, 600.0);
        let expected = (cam.target - cam.eye).normalize();
        assert!((ray.dir - expected).length() < 1e-3);
    }

    #[test]
    fn projection_roundtrips_through_screen_ray() {
        let cam = Camera::new(Vec3::new(3.0, 6.0, 9.0), Vec3::ZERO);
        let p = Vec3::new(1.0, 0.0, -1.0);
        let (sx, sy) = cam.world_to_screen(p, 1024.0, 768.0).unwrap();
        let ray = cam.screen_ray(sx, sy, 1024.0, 768.0);
        let hit = ray.intersect_horizontal_plane(0.0).unwrap();
        assert!((hit - p).length() < 1e-2);
    }

    #[test]
    fn disabled_controller_ignores_input() {
        let mut orbit = OrbitController {
            enabled: false,
            ..Default::default()
        };
        let before = (orbit.yaw, orbit.pitch, orbit.distance, orbit.target);
        orbit.on_drag(50.0, 20.0);
        orbit.on_scroll(3.0);
        orbit.on_pan(10.0, 10.0);
        assert_eq!(before, (orbit.yaw, orbit.pitch, orbit.distance, orbit.target));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut orbit = OrbitController::default();
        for _ in 0..200 {
            orbit.on_scroll(5.0);
        }
        assert!(orbit.distance >= orbit.min_distance);
    }

    #[test]
    fn from_camera_preserves_eye() {
        let cam = Camera::new(Vec3::new(4.0, 3.0, 8.0), Vec3::new(0.0, 1.0, 0.0));
        let orbit = OrbitController::from_camera(&cam);
        assert!((orbit.eye() - cam.eye).length() < 1e-4);
    }
}
