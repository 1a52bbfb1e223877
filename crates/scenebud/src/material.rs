use std::sync::Arc;

use crate::resources::TextureId;

/// Linear RGB color with components in `0.0..=1.0`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Parse `#rrggbb` or `rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::from_rgb8(r, g, b))
    }

    pub fn to_hex(&self) -> String {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", c(self.r), c(self.g), c(self.b))
    }
}

/// Decoded RGBA8 image owned by a material.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: Color,
    pub opacity: f32,
    pub transparent: bool,
    /// `None` when the source asset did not specify one.
    pub roughness: Option<f32>,
    pub metalness: Option<f32>,
    /// Texture maps owned by this material. Disposed with it.
    pub maps: Vec<TextureId>,
}

impl Material {
    pub fn solid(name: impl Into<String>, base_color: Color) -> Self {
        Self {
            name: name.into(),
            base_color,
            opacity: 1.0,
            transparent: false,
            roughness: None,
            metalness: None,
            maps: Vec::new(),
        }
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = Some(roughness);
        self
    }

    pub fn with_metalness(mut self, metalness: f32) -> Self {
        self.metalness = Some(metalness);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self.transparent = self.opacity < 1.0;
        self
    }
}
