use glam::{Mat4, Vec3};

pub const SHADOW_MAP_SIZE: u32 = 2048;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels, not the direction towards it.
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub cast_shadow: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lighting {
    pub ambient_color: Vec3,
    pub ambient_intensity: f32,
    pub key: DirectionalLight,
    pub fill: DirectionalLight,
    pub shadow_map_size: u32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient_color: Vec3::ONE,
            ambient_intensity: 0.6,
            key: DirectionalLight {
                direction: Vec3::new(-0.5, -0.7, -0.3).normalize(),
                color: Vec3::new(1.0, 0.98, 0.92),
                intensity: 0.8,
                cast_shadow: true,
            },
            fill: DirectionalLight {
                direction: Vec3::new(-0.7, -0.3, -0.5).normalize(),
                color: Vec3::new(0.5, 0.55, 0.6),
                intensity: 0.3,
                cast_shadow: false,
            },
            shadow_map_size: SHADOW_MAP_SIZE,
        }
    }
}

impl Lighting {
    /// Orthographic light-space matrix for the key light's shadow map,
    /// sized to cover a scene of the given half extent around the origin.
    pub fn shadow_view_proj(&self, extent: f32) -> Mat4 {
        let light_dir = self.key.direction.normalize();
        let light_pos = -light_dir * (extent * 2.0);
        let light_view = Mat4::look_at_rh(light_pos, Vec3::ZERO, Vec3::Y);
        let light_proj =
            Mat4::orthographic_rh(-extent, extent, -extent, extent, 0.1, extent * 5.0);
        light_proj * light_view
    }
}
