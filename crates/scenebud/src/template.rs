use std::sync::Arc;

use glam::Mat4;
use tracing::debug;

use crate::material::{Material, TextureData};
use crate::mesh::{Aabb, Geometry};
use crate::world::{MeshBinding, NodeId, Transform, World};

pub const DEFAULT_ROUGHNESS: f32 = 0.7;
pub const DEFAULT_METALNESS: f32 = 0.1;

/// A mesh inside a template. The geometry and texture payloads are
/// shared between every instance; materials are copied per instance.
#[derive(Debug, Clone)]
pub struct TemplateMesh {
    pub geometry: Arc<Geometry>,
    pub material: Material,
    pub maps: Vec<Arc<TextureData>>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

#[derive(Debug, Clone)]
pub struct TemplateNode {
    pub name: String,
    pub local: Transform,
    pub meshes: Vec<TemplateMesh>,
    pub children: Vec<TemplateNode>,
}

/// A decoded model that lives outside any scene. Cloning is cheap and
/// yields an independent copy whose transforms and materials can be
/// changed without touching the original.
#[derive(Debug, Clone)]
pub struct ModelTemplate {
    pub name: String,
    pub nodes: Vec<TemplateNode>,
}

fn walk<'a>(node: &'a TemplateNode, parent: Mat4, f: &mut impl FnMut(&'a TemplateMesh, Mat4)) {
    let world = parent * node.local.to_matrix();
    for mesh in &node.meshes {
        f(mesh, world);
    }
    for child in &node.children {
        walk(child, world, f);
    }
}

fn walk_mut(node: &mut TemplateNode, f: &mut impl FnMut(&mut TemplateMesh)) {
    for mesh in &mut node.meshes {
        f(mesh);
    }
    for child in &mut node.children {
        walk_mut(child, f);
    }
}

impl ModelTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    /// Bounds of the template in its own space.
    pub fn bounds(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for node in &self.nodes {
            walk(node, Mat4::IDENTITY, &mut |mesh, world| {
                bounds = bounds.union(&mesh.geometry.bounds().transformed(&world));
            });
        }
        bounds
    }

    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        for node in &self.nodes {
            walk(node, Mat4::IDENTITY, &mut |_, _| count += 1);
        }
        count
    }

    /// Prepare a freshly decoded template for display: smooth normals
    /// where the source had none, shadows on, and default
    /// roughness/metalness where unspecified.
    pub fn normalize(&mut self) {
        let mut computed = 0usize;
        for node in &mut self.nodes {
            walk_mut(node, &mut |mesh| {
                if !mesh.geometry.has_normals() {
                    Arc::make_mut(&mut mesh.geometry).compute_vertex_normals();
                    computed += 1;
                }
                mesh.cast_shadow = true;
                mesh.receive_shadow = true;
                mesh.material.roughness.get_or_insert(DEFAULT_ROUGHNESS);
                mesh.material.metalness.get_or_insert(DEFAULT_METALNESS);
            });
        }
        debug!("normalized template '{}' ({computed} meshes needed normals)", self.name);
    }

    /// Create a scene copy of this template. Every mesh gets its own
    /// geometry, material and texture handles so the copy can be
    /// disposed on its own.
    pub fn instantiate(&self, world: &mut World, local: Transform, parent: Option<NodeId>) -> NodeId {
        let root = world.create_group(self.name.clone(), local, parent);
        for node in &self.nodes {
            instantiate_node(world, node, root);
        }
        root
    }
}

fn bind_mesh(world: &mut World, mesh: &TemplateMesh) -> MeshBinding {
    let mut material = mesh.material.clone();
    material.maps = mesh
        .maps
        .iter()
        .map(|tex| world.resources.add_texture(tex.clone()))
        .collect();

    MeshBinding {
        geometry: world.resources.add_geometry(mesh.geometry.clone()),
        material: world.resources.add_material(material),
        cast_shadow: mesh.cast_shadow,
        receive_shadow: mesh.receive_shadow,
    }
}

fn instantiate_node(world: &mut World, node: &TemplateNode, parent: NodeId) {
    let id = match node.meshes.as_slice() {
        [single] => {
            let binding = bind_mesh(world, single);
            world.create_mesh(node.name.clone(), binding, node.local.clone(), Some(parent))
        }
        meshes => {
            let id = world.create_group(node.name.clone(), node.local.clone(), Some(parent));
            for (i, mesh) in meshes.iter().enumerate() {
                let binding = bind_mesh(world, mesh);
                world.create_mesh(
                    format!("{}#{i}", node.name),
                    binding,
                    Transform::default(),
                    Some(id),
                );
            }
            id
        }
    };

    for child in &node.children {
        instantiate_node(world, child, id);
    }
}
