mod camera;
mod gltf_loader;
mod light;
mod material;
mod mesh;
mod ray;
mod resources;
mod surface;
mod template;
mod world;

pub use camera::{Camera, OrbitController};
pub use gltf_loader::decode_gltf;
pub use light::{DirectionalLight, Lighting, SHADOW_MAP_SIZE};
pub use material::{Color, Material, TextureData};
pub use mesh::{Aabb, Geometry};
pub use ray::Ray;
pub use resources::{
    DisposeReport, GeometryId, MaterialId, ResourceCounts, Resources, TextureId,
};
pub use surface::{DrawItem, Frame, NullSurface, RenderSurface};
pub use template::{
    DEFAULT_METALNESS, DEFAULT_ROUGHNESS, ModelTemplate, TemplateMesh, TemplateNode,
};
pub use world::{MeshBinding, Node, NodeId, RayHit, Transform, World};

/// Re-exported so downstream crates agree on the math types.
pub use glam;
